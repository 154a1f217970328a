//! CIFAR-10 and CIFAR-100 in their binary distribution.
//!
//! CIFAR-10 records are `<label byte><3072 pixel bytes>`, CIFAR-100 records
//! carry a coarse and a fine label byte before the pixels. Pixels are stored
//! channel-major (3 x 32 x 32).

use std::fs;
use std::path::Path;

use ndarray::Array4;

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::subset::sparse2coarse;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::Label;

use super::arrays::ArrayImages;

const W: usize = 32;
const H: usize = 32;
const C: usize = 3;
const PIXELS: usize = W * H * C;

pub const CIFAR10_DIR: &str = "cifar-10-batches-bin";
pub const CIFAR100_DIR: &str = "cifar-100-binary";

const CIFAR10_TRAIN: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

/// Parse one batch file; `label_bytes` is 1 for CIFAR-10 and 2 for CIFAR-100.
/// The returned label is the last label byte (the fine label for CIFAR-100).
fn read_batch(path: &Path, label_bytes: usize) -> Result<(Vec<u8>, Vec<Label>)> {
    let content = fs::read(path)?;
    let record = label_bytes + PIXELS;
    if content.is_empty() || content.len() % record != 0 {
        return Err(DatasetError::CifarFormat {
            path: path.to_path_buf(),
            reason: format!("{} bytes is not a multiple of {}", content.len(), record),
        });
    }

    let count = content.len() / record;
    let mut pixels = Vec::with_capacity(count * PIXELS);
    let mut labels = Vec::with_capacity(count);
    for chunk in content.chunks_exact(record) {
        labels.push(chunk[label_bytes - 1] as Label);
        pixels.extend_from_slice(&chunk[label_bytes..]);
    }
    Ok((pixels, labels))
}

fn read_batches(files: &[&Path], label_bytes: usize) -> Result<(Array4<u8>, Vec<Label>)> {
    let mut pixels = Vec::new();
    let mut labels = Vec::new();
    for file in files {
        let (p, l) = read_batch(file, label_bytes)?;
        pixels.extend(p);
        labels.extend(l);
    }
    let images = Array4::from_shape_vec((labels.len(), C, H, W), pixels)?;
    Ok((images, labels))
}

pub fn cifar10(data_root: &Path, train: bool, transform: SharedTransform) -> Result<ArrayImages> {
    let dir = data_root.join(CIFAR10_DIR);
    let files: Vec<_> = if train {
        CIFAR10_TRAIN.iter().map(|f| dir.join(f)).collect()
    } else {
        vec![dir.join("test_batch.bin")]
    };
    let files: Vec<&Path> = files.iter().map(|p| p.as_path()).collect();

    let (images, labels) = read_batches(&files, 1)?;
    log::info!("CIFAR-10 {}: {} images", split_name(train), labels.len());
    ArrayImages::new(images.into_dyn(), labels, transform)
}

/// CIFAR-100 with fine labels, or the 20 superclasses when `coarse`.
pub fn cifar100(
    data_root: &Path,
    train: bool,
    coarse: bool,
    transform: SharedTransform,
) -> Result<ArrayImages> {
    let file = data_root
        .join(CIFAR100_DIR)
        .join(if train { "train.bin" } else { "test.bin" });

    let (images, labels) = read_batches(&[file.as_path()], 2)?;
    log::info!("CIFAR-100 {}: {} images", split_name(train), labels.len());
    let dataset = ArrayImages::new(images.into_dyn(), labels, transform)?;
    Ok(if coarse {
        dataset.map_labels(sparse2coarse)
    } else {
        dataset
    })
}

fn split_name(train: bool) -> &'static str {
    if train {
        "train"
    } else {
        "test"
    }
}
