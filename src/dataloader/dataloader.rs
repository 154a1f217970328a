use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::tensor::stack;
use crate::dataset::{SharedDataset, Tensor};

use super::config::LoaderConfig;
use super::data_batch::DataBatch;
use super::error::{DatasetError, Result};

/// Batches over any [`crate::dataset::Dataset`]. Samples of a batch are
/// decoded in parallel on a dedicated rayon pool.
pub struct DataLoader {
    dataset: SharedDataset,
    indices: Vec<usize>,
    config: LoaderConfig,
    pool: rayon::ThreadPool,
}

impl DataLoader {
    pub fn new(dataset: SharedDataset, config: Option<LoaderConfig>) -> Result<Self> {
        let mut config = config.unwrap_or_default().build()?;

        config.rng = if config.shuffle {
            let seed = *config
                .shuffle_seed
                .get_or_insert_with(|| rand::thread_rng().gen());
            Some(Arc::new(Mutex::new(StdRng::seed_from_u64(seed))))
        } else {
            None
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers())
            .build()?;

        let mut loader = DataLoader {
            indices: (0..dataset.len()).collect(),
            dataset,
            config,
            pool,
        };

        if loader.config.shuffle {
            loader.shuffle()?;
        }

        Ok(loader)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn dataset(&self) -> &SharedDataset {
        &self.dataset
    }

    pub fn num_batches(&self) -> usize {
        let batch_size = self.config.batch_size;
        if self.config.drop_last {
            self.len() / batch_size
        } else {
            self.len().div_ceil(batch_size)
        }
    }

    /// Dataset indices making up batch `batch_number`, in loading order.
    pub fn batch_indices(&self, batch_number: usize) -> Option<&[usize]> {
        if batch_number >= self.num_batches() {
            return None;
        }
        let start = batch_number * self.config.batch_size;
        let end = (start + self.config.batch_size).min(self.len());
        Some(&self.indices[start..end])
    }

    pub fn load_batch(&self, batch_number: usize) -> Result<DataBatch> {
        let indices = self
            .batch_indices(batch_number)
            .ok_or(DatasetError::IndexOutOfBounds {
                index: batch_number,
                len: self.num_batches(),
            })?;

        let samples = self.pool.install(|| {
            indices
                .par_iter()
                .map(|&index| self.dataset.get(index))
                .collect::<Result<Vec<_>>>()
        })?;

        let view_count = samples.first().map_or(0, |s| s.views.len());
        let mut per_view: Vec<Vec<Tensor>> = (0..view_count)
            .map(|_| Vec::with_capacity(samples.len()))
            .collect();
        let mut labels = Vec::with_capacity(samples.len());

        for sample in samples {
            if sample.views.len() != view_count {
                return Err(DatasetError::ShapeMismatch {
                    first: vec![view_count],
                    other: vec![sample.views.len()],
                });
            }
            labels.push(sample.label);
            for (bucket, tensor) in per_view.iter_mut().zip(sample.views.into_vec()) {
                bucket.push(tensor);
            }
        }

        let views = per_view
            .iter()
            .map(|tensors| stack(tensors))
            .collect::<Result<Vec<_>>>()?;

        Ok(DataBatch {
            views,
            labels,
            batch_number,
        })
    }

    /// Reshuffle the sample order with the loader's seeded RNG.
    pub fn shuffle(&mut self) -> Result<()> {
        let mut rng = self
            .config
            .rng
            .as_ref()
            .ok_or(DatasetError::RngNotSet)?
            .lock()
            .map_err(|_| DatasetError::RngLockError)?;
        self.indices.shuffle(&mut *rng);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use crate::datasets::ArrayImages;
    use ndarray::ArrayD;

    fn dataset(n: usize) -> SharedDataset {
        let images = ArrayD::from_shape_fn(vec![n, 2, 2, 3], |idx| idx[0] as u8);
        let labels = (0..n as i64).collect();
        Arc::new(ArrayImages::new(images, labels, Compose::new().into_shared()).unwrap())
    }

    fn config(shuffle: bool, drop_last: bool) -> LoaderConfig {
        LoaderConfig {
            batch_size: 4,
            shuffle,
            shuffle_seed: Some(727),
            drop_last,
            num_workers: 2,
            ..Default::default()
        }
    }

    #[test]
    fn drop_last_controls_partial_batch() {
        let dl = DataLoader::new(dataset(10), Some(config(false, true))).unwrap();
        assert_eq!(dl.num_batches(), 2);
        assert!(dl.batch_indices(2).is_none());

        let dl = DataLoader::new(dataset(10), Some(config(false, false))).unwrap();
        assert_eq!(dl.num_batches(), 3);
        assert_eq!(dl.batch_indices(2).unwrap(), &[8, 9]);
    }

    #[test]
    fn batch_stacks_samples_in_order() {
        let dl = DataLoader::new(dataset(8), Some(config(false, true))).unwrap();
        let batch = dl.load_batch(1).unwrap();

        assert_eq!(batch.labels, vec![4, 5, 6, 7]);
        assert_eq!(batch.views.len(), 1);
        assert_eq!(batch.views[0].shape(), &[4, 3, 2, 2]);
        let expected = 5.0 / 255.0;
        assert!((batch.views[0][[1, 0, 0, 0]] - expected).abs() < 1e-6);
        assert!(matches!(
            dl.load_batch(2),
            Err(DatasetError::IndexOutOfBounds { index: 2, len: 2 })
        ));
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let a = DataLoader::new(dataset(16), Some(config(true, true))).unwrap();
        let b = DataLoader::new(dataset(16), Some(config(true, true))).unwrap();
        assert_eq!(a.batch_indices(0), b.batch_indices(0));

        let mut sorted: Vec<usize> = (0..4)
            .flat_map(|n| a.batch_indices(n).unwrap().to_vec())
            .collect();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_needs_rng() {
        let mut dl = DataLoader::new(dataset(4), Some(config(false, true))).unwrap();
        assert!(matches!(dl.shuffle(), Err(DatasetError::RngNotSet)));
    }
}
