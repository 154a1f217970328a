//! Skin lesions: ISIC 2018 task 3 is the main distribution, PAD-UFES-20 the
//! shifted one. Nevi (`NEV`) are normal in PAD-UFES-20.

use std::path::Path;

use serde::Deserialize;

use crate::dataloader::datasource::{list_images, read_csv};
use crate::dataloader::error::Result;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Label, ANOMALY, NORMAL};

use super::image_files::ImageFiles;

const NORMAL_DIAGNOSIS: &str = "NEV";

#[derive(Debug, Clone, Deserialize)]
struct PadUfesRecord {
    img_id: String,
    diagnostic: String,
}

/// `<root>/train/NORMAL`, all normal.
pub fn isic_train(root: &Path, transform: SharedTransform) -> Result<ImageFiles> {
    let paths = list_images(&root.join("train").join("NORMAL"), false)?;
    log::info!("ISIC train: {} images", paths.len());
    Ok(ImageFiles::uniform(paths, NORMAL, transform))
}

/// `<root>/test/ABNORMAL` followed by `<root>/test/NORMAL`.
pub fn isic_test(root: &Path, transform: SharedTransform) -> Result<ImageFiles> {
    let test = root.join("test");
    let anomaly = list_images(&test.join("ABNORMAL"), false)?;
    let normal = list_images(&test.join("NORMAL"), false)?;
    log::info!("ISIC test: {} abnormal, {} normal", anomaly.len(), normal.len());

    Ok(ImageFiles::uniform(anomaly, ANOMALY, transform.clone())
        .concat(ImageFiles::uniform(normal, NORMAL, transform)))
}

/// Every image listed in `<root>/metadata.csv`, read from `<root>/Dataset/`.
pub fn pad_ufes_test(root: &Path, transform: SharedTransform) -> Result<ImageFiles> {
    let records: Vec<PadUfesRecord> = read_csv(&root.join("metadata.csv"))?;
    let images = root.join("Dataset");

    let (paths, labels): (Vec<_>, Vec<Label>) = records
        .into_iter()
        .map(|r| {
            let label = if r.diagnostic == NORMAL_DIAGNOSIS {
                NORMAL
            } else {
                ANOMALY
            };
            (images.join(r.img_id), label)
        })
        .unzip();

    log::info!("PAD-UFES-20: {} images", paths.len());
    ImageFiles::new(paths, labels, transform)
}
