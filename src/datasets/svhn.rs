//! SVHN stored as `svhn/{split}_images.npy` (N x 32 x 32 x 3, `u8`) and
//! `svhn/{split}_labels.npy`. The digit zero may be stored as label 10.

use std::path::Path;

use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::Label;

use super::arrays::{read_images_npy, read_labels_npy, ArrayImages};

pub const SVHN_DIR: &str = "svhn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvhnSplit {
    Train,
    Test,
}

impl SvhnSplit {
    fn as_str(self) -> &'static str {
        match self {
            SvhnSplit::Train => "train",
            SvhnSplit::Test => "test",
        }
    }
}

pub fn svhn(data_root: &Path, split: SvhnSplit, transform: SharedTransform) -> Result<ArrayImages> {
    let dir = data_root.join(SVHN_DIR);
    let images = read_images_npy(&dir.join(format!("{}_images.npy", split.as_str())))?;
    let labels = read_labels_npy(&dir.join(format!("{}_labels.npy", split.as_str())))?;
    log::info!("SVHN {}: {} images", split.as_str(), labels.len());

    let images = ArrayImages::new(images, labels, transform)?;
    Ok(images.map_labels(|l: Label| if l == 10 { 0 } else { l }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use crate::dataset::Dataset;
    use ndarray::{Array1, Array4};
    use ndarray_npy::write_npy;

    #[test]
    fn label_ten_becomes_zero() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(SVHN_DIR);
        std::fs::create_dir(&dir).unwrap();
        write_npy(dir.join("test_images.npy"), &Array4::<u8>::zeros((3, 32, 32, 3))).unwrap();
        write_npy(dir.join("test_labels.npy"), &Array1::<u8>::from(vec![10, 1, 9])).unwrap();

        let data = svhn(root.path(), SvhnSplit::Test, Compose::new().into_shared()).unwrap();
        assert_eq!(data.labels(), &[0, 1, 9]);
        assert_eq!(data.get(0).unwrap().views.primary().shape(), &[3, 32, 32]);
    }
}
