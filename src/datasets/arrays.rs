use std::path::Path;

use ndarray::{ArrayD, Axis};
use ndarray_npy::read_npy;

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::tensor::array_to_image;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{check_index, check_lengths, Dataset, Label, Sample};

/// Images held in one `u8` array whose first axis indexes samples.
pub struct ArrayImages {
    images: ArrayD<u8>,
    labels: Vec<Label>,
    transform: SharedTransform,
}

impl ArrayImages {
    pub fn new(images: ArrayD<u8>, labels: Vec<Label>, transform: SharedTransform) -> Result<Self> {
        if images.ndim() < 3 {
            return Err(DatasetError::UnexpectedShape {
                found: images.shape().to_vec(),
                expected: "(N, H, W) or (N, H, W, C) or (N, C, H, W)".to_string(),
            });
        }
        check_lengths(images.len_of(Axis(0)), labels.len())?;
        Ok(Self {
            images,
            labels,
            transform,
        })
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Shape of one sample, without the leading sample axis.
    pub fn sample_shape(&self) -> &[usize] {
        &self.images.shape()[1..]
    }

    pub fn map_labels(mut self, f: impl Fn(Label) -> Label) -> Self {
        self.labels.iter_mut().for_each(|l| *l = f(*l));
        self
    }
}

impl Dataset for ArrayImages {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        check_index(index, self.labels.len())?;
        let img = array_to_image(self.images.index_axis(Axis(0), index))?;
        Ok(Sample {
            views: self.transform.apply(img),
            label: self.labels[index],
        })
    }

    fn label(&self, index: usize) -> Result<Label> {
        check_index(index, self.labels.len())?;
        Ok(self.labels[index])
    }
}

pub fn read_images_npy(path: &Path) -> Result<ArrayD<u8>> {
    let images: ArrayD<u8> = read_npy(path).map_err(|e| DatasetError::npy(path, e))?;
    log::debug!("Loaded {:?} from {}", images.shape(), path.display());
    Ok(images)
}

/// Read a one-dimensional label array stored as `u8`, `i64` or `i32`.
pub fn read_labels_npy(path: &Path) -> Result<Vec<Label>> {
    if let Ok(labels) = read_npy::<_, ndarray::Array1<u8>>(path) {
        return Ok(labels.iter().map(|&l| l as Label).collect());
    }
    if let Ok(labels) = read_npy::<_, ndarray::Array1<i64>>(path) {
        return Ok(labels.to_vec());
    }
    read_npy::<_, ndarray::Array1<i32>>(path)
        .map(|labels| labels.iter().map(|&l| l as Label).collect())
        .map_err(|e| DatasetError::npy(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use ndarray::{Array1, Array4, IxDyn};
    use ndarray_npy::write_npy;

    #[test]
    fn samples_index_the_first_axis() {
        let mut images = Array4::<u8>::zeros((3, 2, 2, 3));
        images[[1, 0, 0, 0]] = 255;
        let data = ArrayImages::new(images.into_dyn(), vec![7, 8, 9], Compose::new().into_shared())
            .unwrap();

        assert_eq!(data.sample_shape(), &[2, 2, 3]);
        let sample = data.get(1).unwrap();
        assert_eq!(sample.label, 8);
        assert_eq!(sample.views.primary()[[0, 0, 0]], 1.0);
        assert!(data.get(3).is_err());
    }

    #[test]
    fn label_count_must_match() {
        let images = ArrayD::<u8>::zeros(IxDyn(&[2, 4, 4]));
        assert!(matches!(
            ArrayImages::new(images, vec![0], Compose::new().into_shared()),
            Err(DatasetError::LengthMismatch { samples: 2, labels: 1 })
        ));
    }

    #[test]
    fn labels_load_from_several_dtypes() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = dir.path().join("u8.npy");
        let wide = dir.path().join("i64.npy");
        write_npy(&bytes, &Array1::<u8>::from(vec![1, 2])).unwrap();
        write_npy(&wide, &Array1::<i64>::from(vec![3, 4])).unwrap();

        assert_eq!(read_labels_npy(&bytes).unwrap(), vec![1, 2]);
        assert_eq!(read_labels_npy(&wide).unwrap(), vec![3, 4]);
        assert!(read_labels_npy(&dir.path().join("none.npy")).is_err());
    }
}
