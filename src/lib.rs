pub mod dataloader;
pub mod dataset;
pub mod datasets;
pub mod registry;

pub use dataloader::config::LoaderConfig;
pub use dataloader::dataloader::DataLoader;
pub use dataloader::error::{DatasetError, Result};
pub use dataset::{Dataset, Label, Sample, SharedDataset, Views};
pub use registry::{get_dataset, DatasetName, DatasetSplits, Settings};
