use std::fmt;
use std::str::FromStr;

use crate::dataloader::error::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetName {
    Cifar10,
    Cifar100,
    Cifar10Corruption,
    Cifar100Corruption,
    Mnist,
    FashionMnist,
    Svhn,
    Svhn10,
    Svhn10Corruption,
    /// Diagvib shifted MNIST.
    Mn,
    /// Diagvib shifted Fashion-MNIST.
    Fmnist,
    Isic,
    Gta,
    Waterbirds,
    Brain,
    Wbc,
    Imagenet30,
    Imagenet,
    LsunResize,
    LsunFix,
    ImagenetResize,
    ImagenetFix,
    StanfordDogs,
    Cub,
    Flowers102,
    Places365,
    Food101,
    Caltech256,
    Dtd,
    Pets,
}

impl DatasetName {
    pub const ALL: [DatasetName; 30] = [
        DatasetName::Cifar10,
        DatasetName::Cifar100,
        DatasetName::Cifar10Corruption,
        DatasetName::Cifar100Corruption,
        DatasetName::Mnist,
        DatasetName::FashionMnist,
        DatasetName::Svhn,
        DatasetName::Svhn10,
        DatasetName::Svhn10Corruption,
        DatasetName::Mn,
        DatasetName::Fmnist,
        DatasetName::Isic,
        DatasetName::Gta,
        DatasetName::Waterbirds,
        DatasetName::Brain,
        DatasetName::Wbc,
        DatasetName::Imagenet30,
        DatasetName::Imagenet,
        DatasetName::LsunResize,
        DatasetName::LsunFix,
        DatasetName::ImagenetResize,
        DatasetName::ImagenetFix,
        DatasetName::StanfordDogs,
        DatasetName::Cub,
        DatasetName::Flowers102,
        DatasetName::Places365,
        DatasetName::Food101,
        DatasetName::Caltech256,
        DatasetName::Dtd,
        DatasetName::Pets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetName::Cifar10 => "cifar10",
            DatasetName::Cifar100 => "cifar100",
            DatasetName::Cifar10Corruption => "cifar10-corruption",
            DatasetName::Cifar100Corruption => "cifar100-corruption",
            DatasetName::Mnist => "mnist",
            DatasetName::FashionMnist => "fashion-mnist",
            DatasetName::Svhn => "svhn",
            DatasetName::Svhn10 => "svhn-10",
            DatasetName::Svhn10Corruption => "svhn-10-corruption",
            DatasetName::Mn => "mn",
            DatasetName::Fmnist => "fmnist",
            DatasetName::Isic => "isic",
            DatasetName::Gta => "gta",
            DatasetName::Waterbirds => "waterbirds",
            DatasetName::Brain => "brain",
            DatasetName::Wbc => "wbc",
            DatasetName::Imagenet30 => "imagenet30",
            DatasetName::Imagenet => "imagenet",
            DatasetName::LsunResize => "lsun_resize",
            DatasetName::LsunFix => "lsun_fix",
            DatasetName::ImagenetResize => "imagenet_resize",
            DatasetName::ImagenetFix => "imagenet_fix",
            DatasetName::StanfordDogs => "stanford_dogs",
            DatasetName::Cub => "cub",
            DatasetName::Flowers102 => "flowers102",
            DatasetName::Places365 => "places365",
            DatasetName::Food101 => "food_101",
            DatasetName::Caltech256 => "caltech_256",
            DatasetName::Dtd => "dtd",
            DatasetName::Pets => "pets",
        }
    }

    /// Evaluation-only sources with no training split.
    pub fn is_test_only(self) -> bool {
        matches!(
            self,
            DatasetName::LsunResize
                | DatasetName::LsunFix
                | DatasetName::ImagenetResize
                | DatasetName::ImagenetFix
                | DatasetName::StanfordDogs
                | DatasetName::Cub
                | DatasetName::Flowers102
                | DatasetName::Places365
                | DatasetName::Food101
                | DatasetName::Caltech256
                | DatasetName::Dtd
                | DatasetName::Pets
        )
    }

    /// Sources preprocessed like ImageNet (resize 256, crop 224).
    pub fn is_imagenet_like(self) -> bool {
        matches!(
            self,
            DatasetName::Imagenet
                | DatasetName::Cub
                | DatasetName::StanfordDogs
                | DatasetName::Flowers102
                | DatasetName::Places365
                | DatasetName::Food101
                | DatasetName::Caltech256
                | DatasetName::Dtd
                | DatasetName::Pets
        )
    }
}

impl FromStr for DatasetName {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lsun_pil" => return Ok(DatasetName::LsunFix),
            "imagenet_pil" => return Ok(DatasetName::ImagenetFix),
            _ => {}
        }
        DatasetName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| DatasetError::NotImplemented(s.to_string()))
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
