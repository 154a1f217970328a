//! Discovery of on-disk samples: directory listings, CSV metadata and seeded
//! ratio splits.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::DeserializeOwned;

use super::error::{DatasetError, Result};

/// Lowercase extensions of every format the `image` crate can decode.
pub fn valid_extensions() -> HashSet<String> {
    image::ImageFormat::all()
        .flat_map(|format| format.extensions_str())
        .map(|ext| ext.to_string())
        .collect()
}

fn has_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase()))
        .unwrap_or(false)
}

/// Every decodable image directly inside `dir`, or below it when `recursive`.
///
/// read_dir gives no ordering guarantee, so the listing is sorted to keep
/// seeded shuffles reproducible across filesystems.
pub fn list_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let extensions = valid_extensions();
    let mut paths = Vec::new();
    collect_files(dir, recursive, &extensions, &mut paths)?;
    paths.sort_unstable();
    Ok(paths)
}

/// Files inside `dir` whose extension equals `extension`, sorted.
pub fn list_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extensions = HashSet::from([extension.to_lowercase()]);
    let mut paths = Vec::new();
    collect_files(dir, false, &extensions, &mut paths)?;
    paths.sort_unstable();
    Ok(paths)
}

fn collect_files(
    dir: &Path,
    recursive: bool,
    extensions: &HashSet<String>,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    if !dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound(dir.to_path_buf()));
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, extensions, out)?;
            }
        } else if has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

/// Sorted names of the immediate subdirectories of `dir`.
pub fn list_subdirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .collect();
    names.sort_unstable();
    Ok(names)
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    log::debug!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn seeded_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

pub fn check_ratio(ratio: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(DatasetError::InvalidSplitRatio(ratio));
    }
    Ok(())
}

/// Shuffle with `seed`, then cut after `floor(ratio * len)` items.
pub fn split_by_ratio<T>(mut items: Vec<T>, ratio: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    check_ratio(ratio)?;
    seeded_shuffle(&mut items, seed);
    let separator = (ratio * items.len() as f64) as usize;
    let rest = items.split_off(separator);
    Ok((items, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "c.bmp"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/d.png"), b"").unwrap();

        let flat = list_images(dir.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.bmp"]);

        assert_eq!(list_images(dir.path(), true).unwrap().len(), 4);
        assert_eq!(list_with_extension(dir.path(), "bmp").unwrap().len(), 1);
        assert_eq!(list_subdirs(dir.path()).unwrap(), vec!["nested"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            list_images(&missing, false),
            Err(DatasetError::DirectoryNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn ratio_split_is_seeded() {
        let items: Vec<u32> = (0..10).collect();
        let (train, test) = split_by_ratio(items.clone(), 0.7, 42).unwrap();
        let (train2, test2) = split_by_ratio(items, 0.7, 42).unwrap();

        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        assert_eq!(train, train2);
        assert_eq!(test, test2);
    }

    #[test]
    fn ratio_outside_unit_interval_fails() {
        assert!(matches!(
            split_by_ratio(vec![1, 2], 1.5, 0),
            Err(DatasetError::InvalidSplitRatio(_))
        ));
    }
}
