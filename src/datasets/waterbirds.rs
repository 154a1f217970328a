//! Waterbirds with background shift.
//!
//! Landbirds (`y == 0`) are normal, waterbirds anomalous. Training uses a
//! fixed number of landbirds photographed on land and on water backgrounds;
//! testing takes every other image of the chosen background.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::dataloader::datasource::read_csv;
use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Label, NORMAL};

use super::image_files::ImageFiles;

const LAND: i64 = 0;
const WATER: i64 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct WaterbirdRecord {
    pub img_filename: String,
    pub y: Label,
    pub place: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundMode {
    All,
    Water,
    Land,
}

impl BackgroundMode {
    fn keeps(self, place: i64) -> bool {
        match self {
            BackgroundMode::All => true,
            BackgroundMode::Water => place == WATER,
            BackgroundMode::Land => place == LAND,
        }
    }
}

impl FromStr for BackgroundMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bg_all" => Ok(BackgroundMode::All),
            "bg_water" => Ok(BackgroundMode::Water),
            "bg_land" => Ok(BackgroundMode::Land),
            other => Err(DatasetError::InvalidBackgroundMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaterbirdsOptions {
    /// Landbirds on land used for training; `None` takes all of them.
    pub count_train_landbg: Option<usize>,
    /// Landbirds on water used for training; `None` takes all of them.
    pub count_train_waterbg: Option<usize>,
    pub mode: BackgroundMode,
}

impl Default for WaterbirdsOptions {
    fn default() -> Self {
        Self {
            count_train_landbg: Some(3500),
            count_train_waterbg: Some(100),
            mode: BackgroundMode::All,
        }
    }
}

pub fn read_metadata(path: &Path) -> Result<Vec<WaterbirdRecord>> {
    read_csv(path)
}

fn landbirds_on(
    records: &[WaterbirdRecord],
    place: i64,
    count: Option<usize>,
) -> impl Iterator<Item = &WaterbirdRecord> {
    records
        .iter()
        .filter(move |r| r.y == NORMAL && r.place == place)
        .take(count.unwrap_or(usize::MAX))
}

pub fn waterbirds(
    root: &Path,
    records: &[WaterbirdRecord],
    train: bool,
    options: &WaterbirdsOptions,
    transform: SharedTransform,
) -> Result<ImageFiles> {
    let normal_paths: Vec<PathBuf> = landbirds_on(records, LAND, options.count_train_landbg)
        .chain(landbirds_on(records, WATER, options.count_train_waterbg))
        .map(|r| root.join(&r.img_filename))
        .collect();

    if train {
        log::info!("Waterbirds train: {} normal images", normal_paths.len());
        return Ok(ImageFiles::uniform(normal_paths, NORMAL, transform));
    }

    let excluded: HashSet<PathBuf> = normal_paths.into_iter().collect();
    let (paths, labels): (Vec<PathBuf>, Vec<Label>) = records
        .iter()
        .filter(|r| options.mode.keeps(r.place))
        .map(|r| (root.join(&r.img_filename), r.y))
        .filter(|(path, _)| !excluded.contains(path))
        .unzip();

    log::info!(
        "Waterbirds test ({:?}): {} images, {} anomalous",
        options.mode,
        paths.len(),
        labels.iter().filter(|&&l| l != NORMAL).count()
    );
    ImageFiles::new(paths, labels, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use crate::dataset::Dataset;

    fn metadata(dir: &Path) -> Vec<WaterbirdRecord> {
        let csv = "img_id,img_filename,y,split,place,place_filename\n\
                   1,a/1.jpg,0,0,0,x\n\
                   2,a/2.jpg,0,0,0,x\n\
                   3,a/3.jpg,0,0,1,x\n\
                   4,b/4.jpg,1,0,1,x\n\
                   5,a/5.jpg,0,0,0,x\n\
                   6,b/6.jpg,1,0,0,x\n\
                   7,a/7.jpg,0,0,1,x\n";
        let path = dir.join("metadata.csv");
        std::fs::write(&path, csv).unwrap();
        read_metadata(&path).unwrap()
    }

    fn options(mode: BackgroundMode) -> WaterbirdsOptions {
        WaterbirdsOptions {
            count_train_landbg: Some(2),
            count_train_waterbg: Some(1),
            mode,
        }
    }

    #[test]
    fn train_takes_first_landbirds_per_background() {
        let dir = tempfile::tempdir().unwrap();
        let records = metadata(dir.path());
        let train = waterbirds(
            dir.path(),
            &records,
            true,
            &options(BackgroundMode::All),
            Compose::new().into_shared(),
        )
        .unwrap();

        let names: Vec<_> = train
            .paths()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a/1.jpg", "a/2.jpg", "a/3.jpg"]);
        assert!((0..train.len()).all(|i| train.label(i).unwrap() == 0));
    }

    #[test]
    fn test_excludes_training_images_and_filters_background() {
        let dir = tempfile::tempdir().unwrap();
        let records = metadata(dir.path());

        let land = waterbirds(
            dir.path(),
            &records,
            false,
            &options(BackgroundMode::Land),
            Compose::new().into_shared(),
        )
        .unwrap();
        assert_eq!(land.len(), 2);
        assert_eq!(land.labels(), &[0, 1]);

        let water = waterbirds(
            dir.path(),
            &records,
            false,
            &options(BackgroundMode::Water),
            Compose::new().into_shared(),
        )
        .unwrap();
        assert_eq!(water.labels(), &[1, 0]);

        let all = waterbirds(
            dir.path(),
            &records,
            false,
            &options(BackgroundMode::All),
            Compose::new().into_shared(),
        )
        .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn unknown_mode_is_a_value_error() {
        assert_eq!("bg_land".parse::<BackgroundMode>().unwrap(), BackgroundMode::Land);
        assert!(matches!(
            "bg_sky".parse::<BackgroundMode>(),
            Err(DatasetError::InvalidBackgroundMode(m)) if m == "bg_sky"
        ));
    }
}
