//! Adapters turning on-disk dataset layouts into [`crate::dataset::Dataset`]s.

pub mod arrays;
pub mod brain;
pub mod cifar;
pub mod corruption;
pub mod image_files;
pub mod image_folder;
pub mod isic;
pub mod mnist;
pub mod scenes;
pub mod shifted;
pub mod svhn;
pub mod waterbirds;
pub mod wbc;

pub use arrays::ArrayImages;
pub use image_files::ImageFiles;
pub use image_folder::ImageFolder;
