use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;

use super::error::{DatasetError, Result};

pub struct LoaderConfig {
    pub prefetch_count: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub rng: Option<Arc<Mutex<StdRng>>>,
    pub drop_last: bool,
    /// Decoding threads; `0` uses one per logical CPU.
    pub num_workers: usize,
}

impl LoaderConfig {
    pub fn build(self) -> Result<Self> {
        check_sizes(self.batch_size, self.prefetch_count)?;

        Ok(self)
    }

    pub fn workers(&self) -> usize {
        if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            prefetch_count: 4,
            batch_size: 32,
            shuffle: true,
            shuffle_seed: None,
            rng: None,
            drop_last: true,
            num_workers: 0,
        }
    }
}

fn check_sizes(batch_size: usize, prefetch_count: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(DatasetError::InvalidConfig("batch_size must be at least 1".into()));
    }
    if prefetch_count == 0 {
        return Err(DatasetError::InvalidConfig("prefetch_count must be at least 1".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builds() {
        let config = LoaderConfig::default().build().unwrap();
        assert_eq!(config.batch_size, 32);
        assert!(config.workers() >= 1);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = LoaderConfig {
            batch_size: 0,
            ..Default::default()
        }
        .build();
        assert!(matches!(result, Err(DatasetError::InvalidConfig(_))));
    }
}
