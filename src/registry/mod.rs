//! Named dataset dispatch: turns a dataset identifier and [`Settings`] into
//! ready-to-index train/test splits.

pub mod name;
pub mod settings;
pub mod transforms;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::dataloader::error::{DatasetError, Result};
use crate::dataset::subset::subset_with_len;
use crate::dataset::transforms::SharedTransform;
use crate::dataset::{Dataset, SharedDataset};
use crate::datasets::brain::{brain_test, brain_train, is_prepared, prepare_br35h, prepare_brats};
use crate::datasets::cifar::{cifar10, cifar100};
use crate::datasets::corruption::corruption;
use crate::datasets::isic::{isic_test, isic_train, pad_ufes_test};
use crate::datasets::mnist::{mnist, MnistKind};
use crate::datasets::scenes::{cityscapes, gta};
use crate::datasets::shifted::{shifted, ShiftedSplit};
use crate::datasets::svhn::{svhn, SvhnSplit};
use crate::datasets::waterbirds::{
    read_metadata, waterbirds, BackgroundMode, WaterbirdsOptions,
};
use crate::datasets::wbc::{wbc, WbcSource, WbcSplit};
use crate::datasets::ImageFolder;

pub use name::DatasetName;
pub use settings::{DataPaths, Settings};
use transforms::select_transforms;

/// Samples drawn from each large test-only folder.
pub const TEST_ONLY_SAMPLES: usize = 3000;
pub const WBC_TRAIN_RATIO: f64 = 0.7;
const BRAIN_PREPARE_SEED: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
}

impl ImageSize {
    pub fn square(side: u32) -> Self {
        Self {
            height: side,
            width: side,
            channels: 3,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

pub struct DatasetSplits {
    /// `None` when only the test split was requested.
    pub train: Option<SharedDataset>,
    pub test: SharedDataset,
    pub image_size: ImageSize,
    pub n_classes: usize,
}

struct Built {
    train: Option<SharedDataset>,
    test: SharedDataset,
    image_size: Option<ImageSize>,
    n_classes: usize,
}

fn shared<D: Dataset + 'static>(dataset: D) -> SharedDataset {
    Arc::new(dataset)
}

/// Runs `load` only when the training split is wanted.
fn train_split<D: Dataset + 'static>(
    with_train: bool,
    load: impl FnOnce() -> Result<D>,
) -> Result<Option<SharedDataset>> {
    if with_train {
        load().map(|dataset| Some(shared(dataset)))
    } else {
        Ok(None)
    }
}

/// Build the splits for `name`. The training split is skipped when
/// `test_only` is set; test-only sources require it. `settings` is
/// validated first.
pub fn get_dataset(settings: &Settings, name: &str, test_only: bool) -> Result<DatasetSplits> {
    let settings = settings.clone().build()?;
    let name: DatasetName = name.parse()?;
    if name.is_test_only() && !test_only {
        return Err(DatasetError::TestOnly(name.to_string()));
    }

    let (train_transform, test_transform) = select_transforms(&settings, name);
    let built = build(&settings, name, !test_only, train_transform, test_transform)?;

    let image_size = built
        .image_size
        .unwrap_or_else(|| ImageSize::square(settings.image_size));
    log::info!(
        "{name}: test {} samples, train {}, image size {image_size}, {} classes",
        built.test.len(),
        built
            .train
            .as_ref()
            .map_or_else(|| "skipped".to_string(), |t| t.len().to_string()),
        built.n_classes
    );

    Ok(DatasetSplits {
        train: built.train,
        test: built.test,
        image_size,
        n_classes: built.n_classes,
    })
}

fn build(
    settings: &Settings,
    name: DatasetName,
    with_train: bool,
    train_transform: SharedTransform,
    test_transform: SharedTransform,
) -> Result<Built> {
    let paths = &settings.paths;
    let data_root = paths.data_root.as_path();
    let shifted_test = settings.test_id == 2;

    let built = match name {
        DatasetName::Cifar10 => Built {
            train: train_split(with_train, || cifar10(data_root, true, train_transform))?,
            test: shared(cifar10(data_root, false, test_transform)?),
            image_size: Some(ImageSize::square(32)),
            n_classes: 10,
        },
        DatasetName::Cifar100 => Built {
            train: train_split(with_train, || {
                cifar100(data_root, true, false, train_transform)
            })?,
            test: shared(cifar100(data_root, false, false, test_transform)?),
            image_size: Some(ImageSize::square(32)),
            n_classes: 100,
        },
        DatasetName::Cifar10Corruption => Built {
            train: train_split(with_train, || cifar10(data_root, true, train_transform))?,
            test: shared(corruption(
                &paths.cifar10_corruption_labels,
                &settings.cifar_corruption_data,
                false,
                test_transform,
            )?),
            image_size: None,
            n_classes: 10,
        },
        DatasetName::Cifar100Corruption => Built {
            train: train_split(with_train, || {
                cifar100(data_root, true, true, train_transform)
            })?,
            test: shared(corruption(
                &paths.cifar100_corruption_labels,
                &settings.cifar_corruption_data,
                true,
                test_transform,
            )?),
            image_size: None,
            n_classes: 100,
        },
        DatasetName::Mnist | DatasetName::FashionMnist => {
            let kind = if name == DatasetName::Mnist {
                MnistKind::Digits
            } else {
                MnistKind::Fashion
            };
            Built {
                train: train_split(with_train, || {
                    mnist(data_root, kind, true, train_transform)
                })?,
                test: shared(mnist(data_root, kind, false, test_transform)?),
                image_size: None,
                n_classes: 10,
            }
        }
        DatasetName::Svhn | DatasetName::Svhn10 | DatasetName::Svhn10Corruption => Built {
            train: train_split(with_train, || {
                svhn(data_root, SvhnSplit::Train, train_transform)
            })?,
            test: shared(svhn(data_root, SvhnSplit::Test, test_transform)?),
            image_size: Some(ImageSize::square(32)),
            n_classes: 10,
        },
        DatasetName::Mn | DatasetName::Fmnist => {
            let bundle = if name == DatasetName::Mn {
                paths.mnist_shifted.as_path()
            } else {
                paths.fmnist_shifted.as_path()
            };
            let split = ShiftedSplit::test(settings.test_id);
            Built {
                train: train_split(with_train, || {
                    shifted(bundle, ShiftedSplit::Train, train_transform)
                })?,
                test: shared(shifted(bundle, split, test_transform)?),
                image_size: Some(ImageSize::square(224)),
                n_classes: 2,
            }
        }
        DatasetName::Isic => Built {
            train: train_split(with_train, || isic_train(&paths.isic, train_transform))?,
            test: if shifted_test {
                shared(pad_ufes_test(&paths.pad_ufes, test_transform)?)
            } else {
                shared(isic_test(&paths.isic, test_transform)?)
            },
            image_size: None,
            n_classes: 2,
        },
        DatasetName::Gta => {
            let main = cityscapes(&paths.cityscapes)?;
            let test = if shifted_test {
                gta(&paths.gta)?.test(test_transform)
            } else {
                main.test(test_transform)
            };
            Built {
                train: train_split(with_train, || Ok(main.train(train_transform)))?,
                test: shared(test),
                image_size: None,
                n_classes: 2,
            }
        }
        DatasetName::Waterbirds => {
            let records = read_metadata(&paths.waterbirds.join("metadata.csv"))?;
            let test_options = WaterbirdsOptions {
                mode: if shifted_test {
                    BackgroundMode::Water
                } else {
                    BackgroundMode::Land
                },
                ..Default::default()
            };
            Built {
                train: train_split(with_train, || {
                    waterbirds(
                        &paths.waterbirds,
                        &records,
                        true,
                        &WaterbirdsOptions::default(),
                        train_transform,
                    )
                })?,
                test: shared(waterbirds(
                    &paths.waterbirds,
                    &records,
                    false,
                    &test_options,
                    test_transform,
                )?),
                image_size: None,
                n_classes: 2,
            }
        }
        DatasetName::Brain => {
            let work_dir = paths.brain_work_dir.as_path();
            if settings.brain_prepared || is_prepared(work_dir) {
                log::info!("Reusing brain MRI splits in {}", work_dir.display());
            } else {
                prepare_brain(paths, work_dir)?;
            }
            Built {
                train: train_split(with_train, || brain_train(work_dir, train_transform))?,
                test: shared(brain_test(work_dir, settings.test_id, test_transform)?),
                image_size: None,
                n_classes: 2,
            }
        }
        DatasetName::Wbc => {
            let root1 = paths.wbc.join("Dataset 1");
            let root2 = paths.wbc.join("Dataset 2");
            let labels1 = paths.wbc.join("Class Labels of Dataset 1.csv");
            let labels2 = paths.wbc.join("Class Labels of Dataset 2.csv");
            let source = WbcSource {
                root1: &root1,
                root2: &root2,
                labels1: &labels1,
                labels2: &labels2,
                ratio: WBC_TRAIN_RATIO,
            };
            let split = WbcSplit::Test {
                test_id: settings.test_id,
            };
            // The random flip only applies to the training split; both test
            // splits use the deterministic test transform.
            Built {
                train: train_split(with_train, || {
                    wbc(&source, WbcSplit::Train, train_transform)
                })?,
                test: shared(wbc(&source, split, test_transform)?),
                image_size: None,
                n_classes: 2,
            }
        }
        DatasetName::Imagenet30 => {
            let root = paths.imagenet30.as_path();
            Built {
                train: train_split(with_train, || {
                    ImageFolder::new(&root.join("one_class_train"), train_transform)
                        .map(|folder| folder.with_label(1))
                })?,
                test: shared(
                    ImageFolder::new(&root.join("one_class_test"), test_transform)?.with_label(1),
                ),
                image_size: None,
                n_classes: 2,
            }
        }
        DatasetName::Imagenet => {
            let root = paths.imagenet.as_path();
            Built {
                train: train_split(with_train, || {
                    ImageFolder::new(&root.join("one_class_train"), train_transform)
                })?,
                test: shared(ImageFolder::new(&root.join("one_class_test"), test_transform)?),
                image_size: Some(ImageSize::square(224)),
                n_classes: 30,
            }
        }
        _ => test_only_folder(data_root, name, test_transform)?,
    };

    Ok(built)
}

fn test_only_folder(
    data_root: &Path,
    name: DatasetName,
    transform: SharedTransform,
) -> Result<Built> {
    let (dir, subsample) = match name {
        DatasetName::LsunResize => (data_root.join("LSUN_resize"), false),
        DatasetName::LsunFix => (data_root.join("LSUN_fix"), false),
        DatasetName::ImagenetResize => (data_root.join("Imagenet_resize"), false),
        DatasetName::ImagenetFix => (data_root.join("Imagenet_fix"), false),
        DatasetName::StanfordDogs => (data_root.join("stanford_dogs"), true),
        DatasetName::Cub => (data_root.join("cub200"), true),
        DatasetName::Flowers102 => (data_root.join("flowers102"), true),
        DatasetName::Places365 => (data_root.join("places365"), true),
        DatasetName::Food101 => (data_root.join("food-101").join("images"), true),
        DatasetName::Caltech256 => (data_root.join("caltech-256"), true),
        DatasetName::Dtd => (data_root.join("dtd").join("images"), true),
        DatasetName::Pets => (data_root.join("pets"), true),
        other => return Err(DatasetError::NotImplemented(other.to_string())),
    };

    let folder = ImageFolder::new(&dir, transform)?;
    let n_classes = folder.classes().len();
    let test = if subsample {
        shared(subset_with_len(shared(folder), TEST_ONLY_SAMPLES, true)?)
    } else {
        shared(folder)
    };

    Ok(Built {
        train: None,
        test,
        image_size: None,
        n_classes,
    })
}

fn prepare_brain(paths: &DataPaths, work_dir: &Path) -> Result<()> {
    log::info!("Preparing brain MRI splits in {}", work_dir.display());
    prepare_br35h(
        &paths.br35h.join("no"),
        &paths.br35h.join("yes"),
        work_dir,
        BRAIN_PREPARE_SEED,
    )?;
    prepare_brats(
        &paths.brats.join("Brain Tumor.csv"),
        &paths.brats.join("Brain Tumor").join("Brain Tumor"),
        work_dir,
        BRAIN_PREPARE_SEED,
    )
}
