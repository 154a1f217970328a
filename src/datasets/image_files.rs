use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::tensor::open_rgb;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{check_index, check_lengths, Dataset, Label, Sample};

/// Image files on disk with one label each, decoded as RGB on access.
pub struct ImageFiles {
    paths: Vec<PathBuf>,
    labels: Vec<Label>,
    transform: SharedTransform,
}

impl ImageFiles {
    pub fn new(
        paths: Vec<PathBuf>,
        labels: Vec<Label>,
        transform: SharedTransform,
    ) -> Result<Self> {
        check_lengths(paths.len(), labels.len())?;
        Ok(Self {
            paths,
            labels,
            transform,
        })
    }

    /// Every path gets the same label.
    pub fn uniform(paths: Vec<PathBuf>, label: Label, transform: SharedTransform) -> Self {
        let labels = vec![label; paths.len()];
        Self {
            paths,
            labels,
            transform,
        }
    }

    /// Truncate to `count` samples, or pad up to it by drawing existing
    /// `(path, label)` pairs with replacement.
    pub fn with_count(
        mut paths: Vec<PathBuf>,
        mut labels: Vec<Label>,
        transform: SharedTransform,
        count: usize,
        seed: u64,
    ) -> Result<Self> {
        check_lengths(paths.len(), labels.len())?;

        let original = paths.len();
        if count < original {
            paths.truncate(count);
            labels.truncate(count);
        } else if count > original {
            if original == 0 {
                return Err(DatasetError::NothingToPad { count });
            }
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in original..count {
                let pick = rng.gen_range(0..original);
                paths.push(paths[pick].clone());
                labels.push(labels[pick]);
            }
            log::debug!("Padded {} samples up to {}", original, count);
        }

        Ok(Self {
            paths,
            labels,
            transform,
        })
    }

    /// Concatenate two labelled path lists.
    pub fn concat(mut self, other: ImageFiles) -> Self {
        self.paths.extend(other.paths);
        self.labels.extend(other.labels);
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn transform(&self) -> SharedTransform {
        self.transform.clone()
    }

    pub fn path(&self, index: usize) -> Result<&Path> {
        check_index(index, self.paths.len())?;
        Ok(&self.paths[index])
    }
}

impl Dataset for ImageFiles {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let img = open_rgb(self.path(index)?)?;
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
