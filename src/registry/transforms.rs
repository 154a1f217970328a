//! Train/test transform pairs per dataset.

use crate::dataset::transforms::{
    default_pair, imagenet_pair, simclr_eval_imagenet, Compose, GaussianNoise, Grayscale3,
    RandomHorizontalFlip, Resize, ResizeShorter, SharedTransform,
};

use super::name::DatasetName;
use super::settings::Settings;

pub type TransformPair = (SharedTransform, SharedTransform);

fn same_for_both(transform: Compose) -> TransformPair {
    let shared = transform.into_shared();
    (shared.clone(), shared)
}

pub fn select_transforms(settings: &Settings, name: DatasetName) -> TransformPair {
    let size = settings.image_size;
    let seed = settings.transform_seed;

    match name {
        n if n.is_imagenet_like() => {
            if settings.eval {
                simclr_eval_imagenet(
                    settings.ood_samples,
                    settings.resize_factor,
                    settings.resize_fix,
                )
            } else {
                imagenet_pair(seed)
            }
        }
        DatasetName::Mn | DatasetName::Fmnist => default_pair(224, 224, seed),
        DatasetName::Svhn => {
            let (_, test) = default_pair(size, size, seed);
            (test.clone(), test)
        }
        DatasetName::Svhn10 => same_for_both(Compose::new().then(Resize::new(32, 32))),
        DatasetName::Svhn10Corruption => {
            let train = Compose::new().then(Resize::new(32, 32));
            let test = Compose::new().then(Resize::new(32, 32)).then_tensor(GaussianNoise::new(
                settings.noise_mean,
                settings.noise_std,
                settings.noise_scale,
                seed,
            ));
            (train.into_shared(), test.into_shared())
        }
        DatasetName::Mnist => {
            same_for_both(Compose::new().then(Resize::new(size, size)).then(Grayscale3))
        }
        DatasetName::FashionMnist => {
            let train = Compose::new()
                .then(Resize::new(size, size))
                .then(Grayscale3)
                .then(RandomHorizontalFlip::new(seed));
            let test = Compose::new().then(Resize::new(size, size)).then(Grayscale3);
            (train.into_shared(), test.into_shared())
        }
        DatasetName::Imagenet30 => same_for_both(Compose::new().then(Resize::new(32, 32))),
        DatasetName::Cifar10Corruption | DatasetName::Cifar100Corruption => {
            same_for_both(Compose::new().then(ResizeShorter(32)))
        }
        _ => default_pair(size, size, seed),
    }
}
