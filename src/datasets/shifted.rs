//! Diagvib-6 shifted MNIST / Fashion-MNIST bundles.
//!
//! A bundle directory holds one image array per part:
//! `train_normal.npy`, `test_normal_main.npy`, `test_abnormal_main.npy`,
//! `test_normal_shifted.npy`, `test_abnormal_shifted.npy`.

use std::path::Path;

use ndarray::{concatenate, Axis};

use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Label, ANOMALY, NORMAL};

use super::arrays::{read_images_npy, ArrayImages};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftedSplit {
    Train,
    /// Test images from the training distribution.
    TestMain,
    /// Test images under the distribution shift.
    TestShifted,
}

impl ShiftedSplit {
    /// Test id 2 is the shifted distribution, anything else the main one.
    pub fn test(test_id: u8) -> Self {
        if test_id == 2 {
            ShiftedSplit::TestShifted
        } else {
            ShiftedSplit::TestMain
        }
    }
}

/// Training parts are all normal; test parts concatenate normal (0) then
/// abnormal (1) images.
pub fn shifted(
    bundle_dir: &Path,
    split: ShiftedSplit,
    transform: SharedTransform,
) -> Result<ArrayImages> {
    let suffix = match split {
        ShiftedSplit::Train => {
            let images = read_images_npy(&bundle_dir.join("train_normal.npy"))?;
            let labels = vec![NORMAL; images.len_of(Axis(0))];
            log::info!("{}: {} training images", bundle_dir.display(), labels.len());
            return ArrayImages::new(images, labels, transform);
        }
        ShiftedSplit::TestMain => "main",
        ShiftedSplit::TestShifted => "shifted",
    };

    let normal = read_images_npy(&bundle_dir.join(format!("test_normal_{suffix}.npy")))?;
    let abnormal = read_images_npy(&bundle_dir.join(format!("test_abnormal_{suffix}.npy")))?;

    let (n_normal, n_abnormal) = (normal.len_of(Axis(0)), abnormal.len_of(Axis(0)));
    let images = concatenate(Axis(0), &[normal.view(), abnormal.view()])?;
    let labels: Vec<Label> = std::iter::repeat(NORMAL)
        .take(n_normal)
        .chain(std::iter::repeat(ANOMALY).take(n_abnormal))
        .collect();

    log::info!(
        "{} ({suffix}): {} normal, {} abnormal",
        bundle_dir.display(),
        n_normal,
        n_abnormal
    );
    ArrayImages::new(images, labels, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::{Compose, Resize};
    use crate::dataset::Dataset;
    use ndarray::Array4;
    use ndarray_npy::write_npy;

    fn write_part(dir: &Path, name: &str, count: usize) {
        write_npy(dir.join(name), &Array4::<u8>::zeros((count, 4, 4, 3))).unwrap();
    }

    #[test]
    fn train_is_all_normal() {
        let dir = tempfile::tempdir().unwrap();
        write_part(dir.path(), "train_normal.npy", 3);

        let data = shifted(dir.path(), ShiftedSplit::Train, Compose::new().into_shared()).unwrap();
        assert_eq!(data.labels(), &[0, 0, 0]);
    }

    #[test]
    fn shifted_test_concatenates_parts() {
        let dir = tempfile::tempdir().unwrap();
        write_part(dir.path(), "test_normal_shifted.npy", 2);
        write_part(dir.path(), "test_abnormal_shifted.npy", 3);
        write_part(dir.path(), "test_normal_main.npy", 1);

        let transform = Compose::new().then(Resize::new(8, 8)).into_shared();
        let data = shifted(dir.path(), ShiftedSplit::test(2), transform).unwrap();
        assert_eq!(data.labels(), &[0, 0, 1, 1, 1]);
        assert_eq!(data.get(4).unwrap().views.primary().shape(), &[3, 8, 8]);

        assert!(shifted(dir.path(), ShiftedSplit::test(1), Compose::new().into_shared()).is_err());
    }

    #[test]
    fn only_test_id_two_is_shifted() {
        assert_eq!(ShiftedSplit::test(1), ShiftedSplit::TestMain);
        assert_eq!(ShiftedSplit::test(2), ShiftedSplit::TestShifted);
        assert_eq!(ShiftedSplit::test(3), ShiftedSplit::TestMain);
        assert_eq!(ShiftedSplit::test(0), ShiftedSplit::TestMain);
    }
}
