use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Error, Debug)]
pub enum DatasetError {
    // IO and decoding
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error in {path}: {source}")]
    ImageError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to read npy array {path}: {source}")]
    NpyReadError {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("Failed to write npy array: {0}")]
    NpyWriteError(#[from] ndarray_npy::WriteNpyError),

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Malformed IDX file {path}: {reason}")]
    IdxFormat { path: PathBuf, reason: String },

    #[error("Malformed CIFAR batch {path}: {reason}")]
    CifarFormat { path: PathBuf, reason: String },

    // Dataset construction
    #[error("Dataset not implemented: {0}")]
    NotImplemented(String),

    #[error("Dataset {0} can only be loaded as a test set")]
    TestOnly(String),

    #[error("Wrong background mode: {0}")]
    InvalidBackgroundMode(String),

    #[error("Invalid split ratio: {0}")]
    InvalidSplitRatio(f64),

    #[error("Invalid test id {0}, expected 1 or 2")]
    InvalidTestId(u8),

    #[error("Sample and label collections differ in length: {samples} samples, {labels} labels")]
    LengthMismatch { samples: usize, labels: usize },

    #[error("No samples found in {0}")]
    EmptyDataset(PathBuf),

    #[error("Cannot pad an empty sample list up to {count} samples")]
    NothingToPad { count: usize },

    #[error("Index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Requested subset of {requested} samples from dataset of length {len}")]
    SubsetTooLarge { requested: usize, len: usize },

    #[error("Array has unexpected shape {found:?}, expected {expected}")]
    UnexpectedShape { found: Vec<usize>, expected: String },

    #[error("Column {column} missing or malformed in {path}")]
    MissingColumn { column: String, path: PathBuf },

    // Batching and configuration
    #[error("Cannot stack samples with shapes {first:?} and {other:?}")]
    ShapeMismatch { first: Vec<usize>, other: Vec<usize> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse settings: {0}")]
    SettingsError(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),

    #[error("Random number generator (shuffle_seed) not set or enabled")]
    RngNotSet,

    #[error("Failed to acquire lock on RNG")]
    RngLockError,
}

impl DatasetError {
    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        DatasetError::ImageError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn npy(path: impl Into<PathBuf>, source: ndarray_npy::ReadNpyError) -> Self {
        DatasetError::NpyReadError {
            path: path.into(),
            source,
        }
    }
}
