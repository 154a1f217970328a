//! Brain MRI tumour detection: Br35H is the main distribution and BraTS2015
//! the shifted one.
//!
//! Both sources are first materialised into a working directory laid out as
//! `<name>/dataset/{train/normal,test/normal,test/anomaly}`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::dataloader::datasource::{list_images, read_csv, seeded_shuffle};
use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Dataset, ANOMALY, NORMAL};

use super::image_files::ImageFiles;

pub const BR35H_DIR: &str = "Br35H";
pub const BRATS_DIR: &str = "brats";
pub const TRAIN_RATIO: f64 = 0.7;
/// BraTS normals mixed into the training set.
pub const BRATS_TRAIN_SAMPLES: usize = 50;
pub const BRATS_TRAIN_SEED: u64 = 1;

#[derive(Debug, Clone, Deserialize)]
struct BratsRecord {
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Class")]
    class: i64,
}

fn layout(work_dir: &Path, name: &str) -> (PathBuf, PathBuf, PathBuf) {
    let base = work_dir.join(name).join("dataset");
    (
        base.join("train").join("normal"),
        base.join("test").join("normal"),
        base.join("test").join("anomaly"),
    )
}

/// Create `dir` if needed and remove any file already in it.
fn reset_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

fn copy_into(files: &[PathBuf], dir: &Path) -> Result<()> {
    for file in files {
        if let Some(name) = file.file_name() {
            fs::copy(file, dir.join(name))?;
        }
    }
    Ok(())
}

fn split_count(len: usize) -> usize {
    (len as f64 * TRAIN_RATIO).round() as usize
}

/// Split Br35H `no/` images 70/30 into train/test normals and copy every
/// `yes/` image to the anomaly test folder.
pub fn prepare_br35h(
    normal_src: &Path,
    anomaly_src: &Path,
    work_dir: &Path,
    seed: u64,
) -> Result<()> {
    let (train_normal, test_normal, test_anomaly) = layout(work_dir, BR35H_DIR);

    let anomalies = list_images(anomaly_src, false)?;
    let mut normals = list_images(normal_src, false)?;
    log::info!(
        "Br35H: {} normal, {} anomalous source images",
        normals.len(),
        anomalies.len()
    );

    reset_dir(&test_anomaly)?;
    copy_into(&anomalies, &test_anomaly)?;

    seeded_shuffle(&mut normals, seed);
    let separator = split_count(normals.len());
    reset_dir(&train_normal)?;
    reset_dir(&test_normal)?;
    copy_into(&normals[..separator], &train_normal)?;
    copy_into(&normals[separator..], &test_normal)?;
    Ok(())
}

/// Split BraTS slices listed in the label CSV (`Image`, `Class`; 1 = tumour)
/// the same way. Images live in `image_dir` as `<Image>.jpg`.
pub fn prepare_brats(
    labels_csv: &Path,
    image_dir: &Path,
    work_dir: &Path,
    seed: u64,
) -> Result<()> {
    let (train_normal, test_normal, test_anomaly) = layout(work_dir, BRATS_DIR);

    let mut seen = HashMap::new();
    let mut order = Vec::new();
    for record in read_csv::<BratsRecord>(labels_csv)? {
        if seen.insert(record.image.clone(), record.class).is_none() {
            order.push(record.image);
        }
    }

    let to_path = |name: &String| image_dir.join(format!("{name}.jpg"));
    let mut normals: Vec<PathBuf> = order
        .iter()
        .filter(|n| seen[*n] == 0)
        .map(to_path)
        .collect();
    let anomalies: Vec<PathBuf> = order
        .iter()
        .filter(|n| seen[*n] == 1)
        .map(to_path)
        .collect();
    log::info!(
        "BraTS: {} normal, {} anomalous source images",
        normals.len(),
        anomalies.len()
    );

    for dir in [&train_normal, &test_normal, &test_anomaly] {
        reset_dir(dir)?;
    }

    seeded_shuffle(&mut normals, seed);
    let separator = split_count(normals.len());
    copy_into(&anomalies, &test_anomaly)?;
    copy_into(&normals[..separator], &train_normal)?;
    copy_into(&normals[separator..], &test_normal)?;
    Ok(())
}

fn has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// True when both sources already have a populated layout under `work_dir`.
pub fn is_prepared(work_dir: &Path) -> bool {
    [BR35H_DIR, BRATS_DIR].iter().all(|name| {
        let (train_normal, test_normal, test_anomaly) = layout(work_dir, name);
        has_entries(&train_normal) && test_normal.is_dir() && has_entries(&test_anomaly)
    })
}

/// Br35H training normals plus a fixed random sample of BraTS normals.
pub fn brain_train(work_dir: &Path, transform: SharedTransform) -> Result<ImageFiles> {
    let (br35h_train, _, _) = layout(work_dir, BR35H_DIR);
    let (brats_train, _, _) = layout(work_dir, BRATS_DIR);

    let mut paths = list_images(&br35h_train, false)?;
    let brats = list_images(&brats_train, false)?;
    if brats.len() < BRATS_TRAIN_SAMPLES {
        log::warn!(
            "Only {} BraTS training normals available, wanted {}",
            brats.len(),
            BRATS_TRAIN_SAMPLES
        );
    }

    let mut rng = StdRng::seed_from_u64(BRATS_TRAIN_SEED);
    paths.extend(
        brats
            .choose_multiple(&mut rng, BRATS_TRAIN_SAMPLES)
            .cloned(),
    );

    log::info!("Brain train: {} normal images", paths.len());
    Ok(ImageFiles::uniform(paths, NORMAL, transform))
}

/// Test 2 reads the BraTS split, any other id the Br35H split.
pub fn brain_test(
    work_dir: &Path,
    test_id: u8,
    transform: SharedTransform,
) -> Result<ImageFiles> {
    let name = if test_id == 2 { BRATS_DIR } else { BR35H_DIR };
    let (_, test_normal, test_anomaly) = layout(work_dir, name);

    let normal_paths = list_images(&test_normal, false)?;
    let normal = ImageFiles::uniform(normal_paths, NORMAL, transform.clone());
    let anomaly = ImageFiles::uniform(list_images(&test_anomaly, false)?, ANOMALY, transform);
    let files = normal.concat(anomaly);

    log::info!("Brain test ({name}): {} images", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use crate::dataset::Dataset;

    fn touch(dir: &Path, names: impl IntoIterator<Item = String>) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), b"x").unwrap();
        }
    }

    #[test]
    fn br35h_is_split_and_reloaded() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        touch(&src.path().join("no"), (0..10).map(|i| format!("n{i}.jpg")));
        touch(&src.path().join("yes"), (0..4).map(|i| format!("y{i}.jpg")));

        let (no, yes) = (src.path().join("no"), src.path().join("yes"));
        prepare_br35h(&no, &yes, work.path(), 42).unwrap();
        // A second run must not leave stale files behind.
        prepare_br35h(&no, &yes, work.path(), 7).unwrap();

        let test = brain_test(work.path(), 1, Compose::new().into_shared()).unwrap();
        assert_eq!(test.len(), 3 + 4);
        assert_eq!(test.labels().iter().filter(|&&l| l == ANOMALY).count(), 4);
        assert_eq!(
            brain_test(work.path(), 3, Compose::new().into_shared()).unwrap().paths(),
            test.paths()
        );

        let (train_dir, _, _) = layout(work.path(), BR35H_DIR);
        assert_eq!(list_images(&train_dir, false).unwrap().len(), 7);
    }

    #[test]
    fn brats_split_follows_csv_classes() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let images = src.path().join("Brain Tumor");
        touch(&images, (1..=8).map(|i| format!("Image{i}.jpg")));
        let mut csv = String::from("Image,Class\n");
        for i in 1..=8 {
            csv.push_str(&format!("Image{i},{}\n", if i <= 6 { 0 } else { 1 }));
        }
        fs::write(src.path().join("labels.csv"), csv).unwrap();

        prepare_brats(&src.path().join("labels.csv"), &images, work.path(), 0).unwrap();

        let test = brain_test(work.path(), 2, Compose::new().into_shared()).unwrap();
        // round(6 * 0.7) = 4 training normals, 2 test normals.
        assert_eq!(test.labels(), &[NORMAL, NORMAL, ANOMALY, ANOMALY]);

        let (br35h_train, _, _) = layout(work.path(), BR35H_DIR);
        touch(&br35h_train, (0..3).map(|i| format!("b{i}.jpg")));
        let train = brain_train(work.path(), Compose::new().into_shared()).unwrap();
        assert_eq!(train.len(), 3 + 4);
        assert_eq!(train.label(6).unwrap(), NORMAL);
    }

    #[test]
    fn layout_counts_as_prepared_once_both_sources_are_copied() {
        let work = tempfile::tempdir().unwrap();
        assert!(!is_prepared(work.path()));

        for name in [BR35H_DIR, BRATS_DIR] {
            let (train_normal, test_normal, test_anomaly) = layout(work.path(), name);
            touch(&train_normal, ["a.jpg".to_string()]);
            fs::create_dir_all(test_normal).unwrap();
            assert!(!is_prepared(work.path()));
            touch(&test_anomaly, ["b.jpg".to_string()]);
        }
        assert!(is_prepared(work.path()));
    }
}
