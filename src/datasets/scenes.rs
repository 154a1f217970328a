//! Driving scenes: Cityscapes is the main distribution and ten GTA5 shards
//! the synthetic shifted one. Each source has `ID/` (normal) and `OOD/`
//! (anomalous) image folders.

use std::path::{Path, PathBuf};

use crate::dataloader::datasource::{list_images, split_by_ratio};
use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{ANOMALY, NORMAL};

use super::image_files::ImageFiles;

pub const SCENE_SEED: u64 = 42;
pub const SCENE_TRAIN_RATIO: f64 = 0.7;
pub const GTA_SHARDS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct SceneSplit {
    pub train_normal: Vec<PathBuf>,
    pub test_normal: Vec<PathBuf>,
    pub anomaly: Vec<PathBuf>,
}

impl SceneSplit {
    fn from_lists(normal: Vec<PathBuf>, anomaly: Vec<PathBuf>) -> Result<Self> {
        let (train_normal, test_normal) = split_by_ratio(normal, SCENE_TRAIN_RATIO, SCENE_SEED)?;
        Ok(Self {
            train_normal,
            test_normal,
            anomaly,
        })
    }

    pub fn train(&self, transform: SharedTransform) -> ImageFiles {
        ImageFiles::uniform(self.train_normal.clone(), NORMAL, transform)
    }

    /// Held-out normals followed by every anomaly.
    pub fn test(&self, transform: SharedTransform) -> ImageFiles {
        ImageFiles::uniform(self.test_normal.clone(), NORMAL, transform.clone())
            .concat(ImageFiles::uniform(self.anomaly.clone(), ANOMALY, transform))
    }
}

pub fn cityscapes(root: &Path) -> Result<SceneSplit> {
    let normal = list_images(&root.join("ID"), false)?;
    let anomaly = list_images(&root.join("OOD"), false)?;
    log::info!("Cityscapes: {} ID, {} OOD", normal.len(), anomaly.len());
    SceneSplit::from_lists(normal, anomaly)
}

/// Directory of shard `index` below the shard root:
/// `gta5-15-5-<01..10>/gta5_<i>/gta5_<i>`.
pub fn gta_shard_dir(root: &Path, index: usize) -> PathBuf {
    root.join(format!("gta5-15-5-{:02}", index + 1))
        .join(format!("gta5_{index}"))
        .join(format!("gta5_{index}"))
}

pub fn gta(root: &Path) -> Result<SceneSplit> {
    let mut normal = Vec::new();
    let mut anomaly = Vec::new();
    for index in 0..GTA_SHARDS {
        let shard = gta_shard_dir(root, index);
        let id = list_images(&shard.join("ID"), false)?;
        let ood = list_images(&shard.join("OOD"), false)?;
        log::debug!("GTA shard {index}: {} ID, {} OOD", id.len(), ood.len());
        normal.extend(id);
        anomaly.extend(ood);
    }
    log::info!("GTA: {} ID, {} OOD", normal.len(), anomaly.len());
    SceneSplit::from_lists(normal, anomaly)
}
