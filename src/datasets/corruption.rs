//! Precomputed corruption benchmarks (CIFAR-10-C, CIFAR-100-C).
//!
//! Each corruption is a `<kind>.npy` array holding five severities of the
//! 10 000 test images back to back, with a shared `labels.npy`. Only the
//! highest severity block is used.

use std::ops::Range;
use std::path::Path;

use ndarray::{Axis, Slice};

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::subset::sparse2coarse;
use crate::dataset::transforms::SharedTransform;

use super::arrays::{read_images_npy, read_labels_npy, ArrayImages};

/// Rows of the highest severity level.
pub const SEVERITY_5: Range<usize> = 40_000..50_000;

pub fn corruption(
    labels_path: &Path,
    data_path: &Path,
    coarse: bool,
    transform: SharedTransform,
) -> Result<ArrayImages> {
    corruption_range(labels_path, data_path, SEVERITY_5, coarse, transform)
}

pub fn corruption_range(
    labels_path: &Path,
    data_path: &Path,
    rows: Range<usize>,
    coarse: bool,
    transform: SharedTransform,
) -> Result<ArrayImages> {
    let labels = read_labels_npy(labels_path)?;
    let data = read_images_npy(data_path)?;

    let available = labels.len().min(data.len_of(Axis(0)));
    if rows.end > available || rows.start > rows.end {
        return Err(DatasetError::UnexpectedShape {
            found: data.shape().to_vec(),
            expected: format!("at least {} rows in data and labels", rows.end),
        });
    }

    let labels = labels[rows.clone()].to_vec();
    let data = data
        .slice_axis(Axis(0), Slice::from(rows.clone()))
        .to_owned();

    log::info!(
        "Corruption {}: rows {}..{}",
        data_path.display(),
        rows.start,
        rows.end
    );

    let dataset = ArrayImages::new(data, labels, transform)?;
    Ok(if coarse {
        dataset.map_labels(sparse2coarse)
    } else {
        dataset
    })
}
