//! White blood cell images (two acquisition sites).
//!
//! Each site has a label CSV. Class 5 is discarded, class 1 is the normal
//! class and everything else is anomalous. Site 1 provides the training set
//! and the main test set, site 2 is the shifted test set (test id 2).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dataloader::datasource::{list_with_extension, read_csv, split_by_ratio};
use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Label, ANOMALY, NORMAL};

use super::image_files::ImageFiles;

pub const WBC_SEED: u64 = 42;
const NORMAL_CLASS: i64 = 1;
const DISCARDED_CLASS: i64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Site1Record {
    #[serde(rename = "image ID")]
    pub image_id: u32,
    #[serde(rename = "class label")]
    pub class: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site2Record {
    #[serde(rename = "image ID")]
    pub image_id: u32,
    #[serde(rename = "class")]
    pub class: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WbcSplit {
    Train,
    Test { test_id: u8 },
}

pub struct WbcSource<'a> {
    pub root1: &'a Path,
    pub root2: &'a Path,
    pub labels1: &'a Path,
    pub labels2: &'a Path,
    pub ratio: f64,
}

fn image_path(root: &Path, id: u32) -> PathBuf {
    root.join(format!("{id:03}.bmp"))
}

fn image_id(path: &Path) -> Option<u32> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn anomaly_label(class: i64) -> Label {
    if class == NORMAL_CLASS {
        NORMAL
    } else {
        ANOMALY
    }
}

/// Keep the `.bmp` files of `root` whose id has a class, labelled by it.
fn labelled_images(
    root: &Path,
    classes: &HashMap<u32, i64>,
    skip: impl Fn(&Path) -> bool,
) -> Result<(Vec<PathBuf>, Vec<Label>)> {
    Ok(list_with_extension(root, "bmp")?
        .into_iter()
        .filter(|path| !skip(path))
        .filter_map(|path| {
            let class = *classes.get(&image_id(&path)?)?;
            Some((path, anomaly_label(class)))
        })
        .unzip())
}

pub fn wbc(
    source: &WbcSource<'_>,
    split: WbcSplit,
    transform: SharedTransform,
) -> Result<ImageFiles> {
    let site1: HashMap<u32, i64> = read_csv::<Site1Record>(source.labels1)?
        .into_iter()
        .filter(|r| r.class != DISCARDED_CLASS)
        .map(|r| (r.image_id, r.class))
        .collect();

    let mut normal_ids: Vec<u32> = site1
        .iter()
        .filter(|(_, &class)| class == NORMAL_CLASS)
        .map(|(&id, _)| id)
        .collect();
    normal_ids.sort_unstable();
    let normal_paths: Vec<PathBuf> = normal_ids
        .into_iter()
        .map(|id| image_path(source.root1, id))
        .collect();
    let (train_paths, _) = split_by_ratio(normal_paths, source.ratio, WBC_SEED)?;

    match split {
        WbcSplit::Train => {
            log::info!("WBC train: {} normal images", train_paths.len());
            Ok(ImageFiles::uniform(train_paths, NORMAL, transform))
        }
        WbcSplit::Test { test_id: 2 } => {
            let site2: HashMap<u32, i64> = read_csv::<Site2Record>(source.labels2)?
                .into_iter()
                .filter(|r| r.class != DISCARDED_CLASS)
                .map(|r| (r.image_id, r.class))
                .collect();
            let (paths, labels) = labelled_images(source.root2, &site2, |_| false)?;
            log::info!("WBC test (site 2): {} images", paths.len());
            ImageFiles::new(paths, labels, transform)
        }
        WbcSplit::Test { .. } => {
            let (paths, labels) =
                labelled_images(source.root1, &site1, |p| train_paths.iter().any(|t| t == p))?;
            log::info!("WBC test (site 1): {} images", paths.len());
            ImageFiles::new(paths, labels, transform)
        }
    }
}
