use std::path::Path;

use crate::dataloader::datasource::{list_images, list_subdirs};
use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Dataset, Label, Sample};

use super::image_files::ImageFiles;

/// `root/<class>/**/<image>` layout; classes are indexed in sorted order.
pub struct ImageFolder {
    classes: Vec<String>,
    files: ImageFiles,
}

impl ImageFolder {
    pub fn new(root: &Path, transform: SharedTransform) -> Result<Self> {
        let classes = list_subdirs(root)?;
        if classes.is_empty() {
            return Err(DatasetError::EmptyDataset(root.to_path_buf()));
        }

        let mut paths = Vec::new();
        let mut labels = Vec::new();
        for (index, class) in classes.iter().enumerate() {
            let class_paths = list_images(&root.join(class), true)?;
            labels.extend(std::iter::repeat(index as Label).take(class_paths.len()));
            paths.extend(class_paths);
        }

        log::info!(
            "Image folder {}: {} images in {} classes",
            root.display(),
            paths.len(),
            classes.len()
        );

        Ok(Self {
            classes,
            files: ImageFiles::new(paths, labels, transform)?,
        })
    }

    /// Replace every target with `label`.
    pub fn with_label(self, label: Label) -> Self {
        let paths = self.files.paths().to_vec();
        let transform = self.files.transform();
        Self {
            classes: self.classes,
            files: ImageFiles::uniform(paths, label, transform),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl Dataset for ImageFolder {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.files.get(index)
    }

    fn label(&self, index: usize) -> Result<Label> {
        self.files.label(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::transforms::Compose;
    use image::{Rgb, RgbImage};
    use std::fs;

    fn write_image(path: &Path) {
        RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])).save(path).unwrap();
    }

    #[test]
    fn classes_are_sorted_and_indexed() {
        let dir = tempfile::tempdir().unwrap();
        for (class, count) in [("zebra", 2), ("ant", 1)] {
            fs::create_dir(dir.path().join(class)).unwrap();
            for i in 0..count {
                write_image(&dir.path().join(class).join(format!("{i}.png")));
            }
        }

        let folder = ImageFolder::new(dir.path(), Compose::new().into_shared()).unwrap();
        assert_eq!(folder.classes(), &["ant", "zebra"]);
        assert_eq!(folder.len(), 3);
        assert_eq!(folder.label(0).unwrap(), 0);
        assert_eq!(folder.label(2).unwrap(), 1);

        let relabelled = folder.with_label(1);
        assert!((0..3).all(|i| relabelled.label(i).unwrap() == 1));
        assert_eq!(relabelled.get(0).unwrap().label, 1);
    }

    #[test]
    fn empty_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageFolder::new(dir.path(), Compose::new().into_shared()),
            Err(DatasetError::EmptyDataset(_))
        ));
    }
}
