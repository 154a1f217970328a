//! MNIST and Fashion-MNIST from the raw IDX files.

use std::fs;
use std::path::Path;

use ndarray::Array3;

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::transforms::SharedTransform;
use crate::dataset::Label;

use super::arrays::ArrayImages;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnistKind {
    Digits,
    Fashion,
}

impl MnistKind {
    fn dir(self) -> &'static str {
        match self {
            MnistKind::Digits => "MNIST",
            MnistKind::Fashion => "FashionMNIST",
        }
    }
}

fn idx_error(path: &Path, reason: impl Into<String>) -> DatasetError {
    DatasetError::IdxFormat {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn be_u32(bytes: &[u8], offset: usize, path: &Path) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| idx_error(path, "truncated header"))
}

pub fn read_idx_images(path: &Path) -> Result<Array3<u8>> {
    let bytes = fs::read(path)?;
    let magic = be_u32(&bytes, 0, path)?;
    if magic != IMAGES_MAGIC {
        return Err(idx_error(path, format!("bad image magic {magic:#x}")));
    }

    let count = be_u32(&bytes, 4, path)? as usize;
    let rows = be_u32(&bytes, 8, path)? as usize;
    let cols = be_u32(&bytes, 12, path)? as usize;
    let expected = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| idx_error(path, format!("{count}x{rows}x{cols} images overflow")))?;
    let body = &bytes[16..];
    if body.len() != expected {
        return Err(idx_error(
            path,
            format!("expected {} pixel bytes, found {}", expected, body.len()),
        ));
    }

    Ok(Array3::from_shape_vec((count, rows, cols), body.to_vec())?)
}

pub fn read_idx_labels(path: &Path) -> Result<Vec<Label>> {
    let bytes = fs::read(path)?;
    let magic = be_u32(&bytes, 0, path)?;
    if magic != LABELS_MAGIC {
        return Err(idx_error(path, format!("bad label magic {magic:#x}")));
    }

    let count = be_u32(&bytes, 4, path)? as usize;
    let body = &bytes[8..];
    if body.len() != count {
        return Err(idx_error(
            path,
            format!("expected {} labels, found {}", count, body.len()),
        ));
    }
    Ok(body.iter().map(|&l| l as Label).collect())
}

/// Loads `<data_root>/<MNIST|FashionMNIST>/raw/{train,t10k}-*-ubyte`.
pub fn mnist(
    data_root: &Path,
    kind: MnistKind,
    train: bool,
    transform: SharedTransform,
) -> Result<ArrayImages> {
    let raw = data_root.join(kind.dir()).join("raw");
    let prefix = if train { "train" } else { "t10k" };

    let images = read_idx_images(&raw.join(format!("{prefix}-images-idx3-ubyte")))?;
    let labels = read_idx_labels(&raw.join(format!("{prefix}-labels-idx1-ubyte")))?;
    log::info!("{} {}: {} images", kind.dir(), prefix, labels.len());

    ArrayImages::new(images.into_dyn(), labels, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::{Compose, Grayscale3};
    use crate::dataset::Dataset;

    fn write_idx(raw: &Path, prefix: &str, labels: &[u8]) {
        let mut images = Vec::new();
        images.extend(IMAGES_MAGIC.to_be_bytes());
        images.extend((labels.len() as u32).to_be_bytes());
        images.extend(2u32.to_be_bytes());
        images.extend(3u32.to_be_bytes());
        images.extend(std::iter::repeat(128u8).take(labels.len() * 6));
        fs::write(raw.join(format!("{prefix}-images-idx3-ubyte")), images).unwrap();

        let mut bytes = Vec::new();
        bytes.extend(LABELS_MAGIC.to_be_bytes());
        bytes.extend((labels.len() as u32).to_be_bytes());
        bytes.extend(labels);
        fs::write(raw.join(format!("{prefix}-labels-idx1-ubyte")), bytes).unwrap();
    }

    #[test]
    fn fashion_test_split_loads() {
        let root = tempfile::tempdir().unwrap();
        let raw = root.path().join("FashionMNIST/raw");
        fs::create_dir_all(&raw).unwrap();
        write_idx(&raw, "t10k", &[4, 1, 7]);

        let transform = Compose::new().then(Grayscale3).into_shared();
        let data = mnist(root.path(), MnistKind::Fashion, false, transform).unwrap();
        assert_eq!(data.labels(), &[4, 1, 7]);
        assert_eq!(data.get(2).unwrap().views.primary().shape(), &[3, 2, 3]);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels");
        fs::write(&path, [0, 0, 8, 3, 0, 0, 0, 0]).unwrap();
        assert!(matches!(
            read_idx_labels(&path),
            Err(DatasetError::IdxFormat { .. })
        ));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images");
        let mut bytes = Vec::new();
        bytes.extend(IMAGES_MAGIC.to_be_bytes());
        for _ in 0..3 {
            bytes.extend(u32::MAX.to_be_bytes());
        }
        bytes.extend([0u8; 8]);
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            read_idx_images(&path),
            Err(DatasetError::IdxFormat { .. })
        ));
    }
}
