use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataloader::error::{DatasetError, Result};

/// Where every dataset lives on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Root of the torchvision-style datasets (CIFAR, MNIST, SVHN, test-only folders).
    pub data_root: PathBuf,
    pub imagenet: PathBuf,
    /// Directory holding `one_class_train` and `one_class_test`.
    pub imagenet30: PathBuf,
    pub cifar10_corruption_labels: PathBuf,
    pub cifar100_corruption_labels: PathBuf,
    pub mnist_shifted: PathBuf,
    pub fmnist_shifted: PathBuf,
    pub isic: PathBuf,
    pub pad_ufes: PathBuf,
    pub cityscapes: PathBuf,
    /// Parent of the `gta5-15-5-*` shards.
    pub gta: PathBuf,
    pub waterbirds: PathBuf,
    pub wbc: PathBuf,
    pub br35h: PathBuf,
    pub brats: PathBuf,
    /// Where the prepared brain MRI splits are written.
    pub brain_work_dir: PathBuf,
}

const MNIST_SHIFTED_DIR: &str =
    "/kaggle/input/diagvib-6-mnist-dataset/content/mnist_shifted_dataset";
const FMNIST_SHIFTED_DIR: &str =
    "/kaggle/input/diagvib-6-fmnist-dataset/content/fmnist_shifted_dataset";

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            data_root: "./data".into(),
            imagenet: "./data/ImageNet".into(),
            imagenet30: ".".into(),
            cifar10_corruption_labels: "CIFAR-10-C/labels.npy".into(),
            cifar100_corruption_labels: "CIFAR-100-C/labels.npy".into(),
            mnist_shifted: MNIST_SHIFTED_DIR.into(),
            fmnist_shifted: FMNIST_SHIFTED_DIR.into(),
            isic: "/kaggle/input/isic-task3-dataset/dataset".into(),
            pad_ufes: "/kaggle/input/pad-ufes-20/PAD-UFES-20".into(),
            cityscapes: "/kaggle/input/cityscapes-5-10-threshold/cityscapes".into(),
            gta: "/kaggle/input".into(),
            waterbirds: "/kaggle/input/waterbird/waterbird".into(),
            wbc: "/kaggle/working/segmentation_WBC".into(),
            br35h: "/kaggle/input/brain-tumor-detection".into(),
            brats: "/kaggle/input/brain-tumor".into(),
            brain_work_dir: ".".into(),
        }
    }
}

/// Run-level options consumed by [`super::get_dataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub image_size: u32,
    /// `1` for the main test distribution, `2` for the shifted one.
    pub test_id: u8,
    pub noise_mean: f32,
    pub noise_std: f32,
    pub noise_scale: f32,
    pub cifar_corruption_data: PathBuf,
    pub ood_samples: usize,
    pub resize_factor: f64,
    pub resize_fix: bool,
    /// Use the multi-view evaluation pipeline for ImageNet-style datasets.
    pub eval: bool,
    /// Skip copying the brain MRI sources into `paths.brain_work_dir`. Copying
    /// is also skipped when that directory already holds both prepared splits.
    pub brain_prepared: bool,
    /// Seed for random augmentations; entropy when unset.
    pub transform_seed: Option<u64>,
    pub paths: DataPaths,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_size: 32,
            test_id: 1,
            noise_mean: 0.0,
            noise_std: 1.0,
            noise_scale: 0.1,
            cifar_corruption_data: "./CIFAR-10-C/defocus_blur.npy".into(),
            ood_samples: 10,
            resize_factor: 0.08,
            resize_fix: false,
            eval: false,
            brain_prepared: false,
            transform_seed: None,
            paths: DataPaths::default(),
        }
    }
}

impl Settings {
    pub fn build(self) -> Result<Self> {
        if self.test_id != 1 && self.test_id != 2 {
            return Err(DatasetError::InvalidTestId(self.test_id));
        }
        if self.image_size == 0 {
            return Err(DatasetError::InvalidConfig("image_size must be at least 1".into()));
        }
        if !(self.resize_factor > 0.0 && self.resize_factor <= 1.0) {
            return Err(DatasetError::InvalidConfig(format!(
                "resize_factor must be in (0, 1], got {}",
                self.resize_factor
            )));
        }

        Ok(self)
    }

    /// Missing keys fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.build()
    }
}
