use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};

use super::data_batch::DataBatch;
use super::dataloader::DataLoader;
use super::error::Result;

/// Batches loaded ahead of time on a background thread. At most
/// `prefetch_count` batches wait in the channel.
pub struct PrefetchIterator {
    receiver: Receiver<Result<DataBatch>>,
}

impl PrefetchIterator {
    fn new(data_loader: Arc<DataLoader>) -> Self {
        let (sender, receiver) = bounded(data_loader.config().prefetch_count);

        thread::spawn(move || {
            for batch_number in 0..data_loader.num_batches() {
                let batch = data_loader.load_batch(batch_number);
                let failed = batch.is_err();
                if sender.send(batch).is_err() || failed {
                    break;
                }
            }
        });

        PrefetchIterator { receiver }
    }
}

impl Iterator for PrefetchIterator {
    type Item = Result<DataBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

pub trait ParallelDataLoaderIterator {
    fn par_iter(self: Arc<Self>) -> PrefetchIterator;
}

impl ParallelDataLoaderIterator for DataLoader {
    fn par_iter(self: Arc<Self>) -> PrefetchIterator {
        PrefetchIterator::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::config::LoaderConfig;
    use crate::dataset::transforms::Compose;
    use crate::datasets::ArrayImages;
    use ndarray::ArrayD;

    #[test]
    fn yields_every_batch_in_order() {
        let images = ArrayD::from_elem(vec![10, 4, 4], 128u8);
        let dataset = ArrayImages::new(images, vec![0; 10], Compose::new().into_shared()).unwrap();
        let config = LoaderConfig {
            batch_size: 3,
            prefetch_count: 1,
            shuffle: false,
            drop_last: false,
            num_workers: 2,
            ..Default::default()
        };
        let dl = Arc::new(DataLoader::new(Arc::new(dataset), Some(config)).unwrap());

        let batches: Vec<DataBatch> = dl.par_iter().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[3].samples_in_batch(), 1);
        assert_eq!(batches[2].batch_number, 2);
        assert_eq!(batches[0].views[0].shape(), &[3, 1, 4, 4]);
    }
}
