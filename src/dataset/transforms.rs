//! Image preprocessing pipelines.
//!
//! A [`Compose`] runs image-level ops, converts the result to a [`Tensor`]
//! and then runs tensor-level ops. Wrappers such as [`MultiView`] turn one
//! image into several tensors for contrastive evaluation.

use std::sync::{Arc, Mutex, PoisonError};

use image::imageops::{self, FilterType};
use image::DynamicImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::tensor::{to_tensor, Tensor};
use super::Views;

pub trait ImageOp: Send + Sync {
    fn apply(&self, img: DynamicImage) -> DynamicImage;

    /// Restart the op's random stream. Deterministic ops ignore this.
    fn reseed(&self, _seed: u64) {}
}

pub trait TensorOp: Send + Sync {
    fn apply(&self, tensor: Tensor) -> Tensor;

    fn reseed(&self, _seed: u64) {}
}

pub trait Transform: Send + Sync {
    fn apply(&self, img: DynamicImage) -> Views;
}

pub type SharedTransform = Arc<dyn Transform>;

struct OpRng(Mutex<StdRng>);

impl OpRng {
    fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
        OpRng(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    fn reseed(&self, seed: u64) {
        self.with(|rng| *rng = StdRng::seed_from_u64(seed));
    }
}

/// Resize to an exact `(width, height)` with bilinear filtering.
pub struct Resize {
    pub width: u32,
    pub height: u32,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ImageOp for Resize {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        if img.width() == self.width && img.height() == self.height {
            return img;
        }
        img.resize_exact(self.width, self.height, FilterType::Triangle)
    }
}

/// Resize so the shorter side equals `size`, keeping the aspect ratio.
pub struct ResizeShorter(pub u32);

impl ImageOp for ResizeShorter {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let (w, h) = (img.width(), img.height());
        let size = self.0;
        let (new_w, new_h) = if w <= h {
            (size, (size as u64 * h as u64 / w.max(1) as u64) as u32)
        } else {
            ((size as u64 * w as u64 / h.max(1) as u64) as u32, size)
        };
        if (new_w, new_h) == (w, h) {
            return img;
        }
        img.resize_exact(new_w, new_h, FilterType::Triangle)
    }
}

/// Crop a `size` square from the centre, zero padding smaller images first.
pub struct CenterCrop(pub u32);

impl ImageOp for CenterCrop {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let size = self.0;
        let img = if img.width() < size || img.height() < size {
            let (pw, ph) = (img.width().max(size), img.height().max(size));
            let mut canvas = DynamicImage::new(pw, ph, img.color());
            let x = (pw - img.width()) / 2;
            let y = (ph - img.height()) / 2;
            imageops::overlay(&mut canvas, &img, x as i64, y as i64);
            canvas
        } else {
            img
        };

        let left = ((img.width() - size) as f32 / 2.0).round() as u32;
        let top = ((img.height() - size) as f32 / 2.0).round() as u32;
        img.crop_imm(left, top, size, size)
    }
}

/// Grey conversion replicated over three channels.
pub struct Grayscale3;

impl ImageOp for Grayscale3 {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let luma = DynamicImage::ImageLuma8(img.to_luma8());
        DynamicImage::ImageRgb8(luma.to_rgb8())
    }
}

pub struct RandomHorizontalFlip {
    p: f64,
    rng: OpRng,
}

impl RandomHorizontalFlip {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_probability(0.5, seed)
    }

    pub fn with_probability(p: f64, seed: Option<u64>) -> Self {
        Self {
            p,
            rng: OpRng::new(seed),
        }
    }
}

impl ImageOp for RandomHorizontalFlip {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        if self.rng.with(|rng| rng.gen_bool(self.p)) {
            img.fliph()
        } else {
            img
        }
    }

    fn reseed(&self, seed: u64) {
        self.rng.reseed(seed);
    }
}

/// Crop a random area and aspect ratio, then resize to a `size` square.
pub struct RandomResizedCrop {
    size: u32,
    scale: (f64, f64),
    ratio: (f64, f64),
    rng: OpRng,
}

impl RandomResizedCrop {
    pub fn new(size: u32, seed: Option<u64>) -> Self {
        Self::with_scale(size, (0.08, 1.0), seed)
    }

    pub fn with_scale(size: u32, scale: (f64, f64), seed: Option<u64>) -> Self {
        Self {
            size,
            scale,
            ratio: (3.0 / 4.0, 4.0 / 3.0),
            rng: OpRng::new(seed),
        }
    }

    /// Returns `(left, top, width, height)` of the crop window.
    fn crop_window(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let area = (width as f64) * (height as f64);
        let (log_lo, log_hi) = (self.ratio.0.ln(), self.ratio.1.ln());

        let found = self.rng.with(|rng| {
            for _ in 0..10 {
                let target_area = area * rng.gen_range(self.scale.0..=self.scale.1);
                let aspect = rng.gen_range(log_lo..=log_hi).exp();
                let w = (target_area * aspect).sqrt().round() as u32;
                let h = (target_area / aspect).sqrt().round() as u32;

                if w > 0 && h > 0 && w <= width && h <= height {
                    let left = rng.gen_range(0..=width - w);
                    let top = rng.gen_range(0..=height - h);
                    return Some((left, top, w, h));
                }
            }
            None
        });

        found.unwrap_or_else(|| {
            let in_ratio = width as f64 / height.max(1) as f64;
            let (w, h) = if in_ratio < self.ratio.0 {
                (width, (width as f64 / self.ratio.0).round() as u32)
            } else if in_ratio > self.ratio.1 {
                ((height as f64 * self.ratio.1).round() as u32, height)
            } else {
                (width, height)
            };
            (
                width.saturating_sub(w) / 2,
                height.saturating_sub(h) / 2,
                w.min(width),
                h.min(height),
            )
        })
    }
}

impl ImageOp for RandomResizedCrop {
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let (left, top, w, h) = self.crop_window(img.width(), img.height());
        img.crop_imm(left, top, w, h)
            .resize_exact(self.size, self.size, FilterType::Triangle)
    }

    fn reseed(&self, seed: u64) {
        self.rng.reseed(seed);
    }
}

/// Additive noise: `x + (randn * std + mean) * scale`.
pub struct GaussianNoise {
    mean: f32,
    std: f32,
    scale: f32,
    rng: OpRng,
}

impl GaussianNoise {
    pub fn new(mean: f32, std: f32, scale: f32, seed: Option<u64>) -> Self {
        Self {
            mean,
            std,
            scale,
            rng: OpRng::new(seed),
        }
    }
}

impl TensorOp for GaussianNoise {
    fn apply(&self, mut tensor: Tensor) -> Tensor {
        self.rng.with(|rng| {
            for x in tensor.iter_mut() {
                // Box-Muller
                let u1: f32 = rng.gen::<f32>().max(f32::MIN_POSITIVE);
                let u2: f32 = rng.gen();
                let z = (-2.0_f32 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                *x += (z * self.std + self.mean) * self.scale;
            }
        });
        tensor
    }

    fn reseed(&self, seed: u64) {
        self.rng.reseed(seed);
    }
}

#[derive(Default)]
pub struct Compose {
    image_ops: Vec<Box<dyn ImageOp>>,
    tensor_ops: Vec<Box<dyn TensorOp>>,
}

impl Compose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then<T: ImageOp + 'static>(mut self, op: T) -> Self {
        self.image_ops.push(Box::new(op));
        self
    }

    pub fn then_tensor<T: TensorOp + 'static>(mut self, op: T) -> Self {
        self.tensor_ops.push(Box::new(op));
        self
    }

    pub fn run(&self, img: DynamicImage) -> Tensor {
        let img = self.image_ops.iter().fold(img, |img, op| op.apply(img));
        let tensor = to_tensor(&img);
        self.tensor_ops.iter().fold(tensor, |t, op| op.apply(t))
    }

    pub fn reseed(&self, seed: u64) {
        self.image_ops.iter().for_each(|op| op.reseed(seed));
        self.tensor_ops.iter().for_each(|op| op.reseed(seed));
    }

    pub fn into_shared(self) -> SharedTransform {
        Arc::new(self)
    }
}

impl Transform for Compose {
    fn apply(&self, img: DynamicImage) -> Views {
        Views::Single(self.run(img))
    }
}

/// Two draws of the same pipeline.
pub struct MultiView(pub Compose);

impl Transform for MultiView {
    fn apply(&self, img: DynamicImage) -> Views {
        let first = self.0.run(img.clone());
        Views::Pair(first, self.0.run(img))
    }
}

/// `sample_num` augmented views plus a clean view. The augmentation stream is
/// restarted from seed 0 for every image, so each image sees the same crops.
pub struct MultiViewList {
    transform: Compose,
    clean: Compose,
    sample_num: usize,
    guard: Mutex<()>,
}

impl MultiViewList {
    pub fn new(transform: Compose, clean: Compose, sample_num: usize) -> Self {
        Self {
            transform,
            clean,
            sample_num,
            guard: Mutex::new(()),
        }
    }
}

impl Transform for MultiViewList {
    fn apply(&self, img: DynamicImage) -> Views {
        let views = {
            let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
            self.transform.reseed(0);
            (0..self.sample_num)
                .map(|_| self.transform.run(img.clone()))
                .collect()
        };
        Views::List {
            views,
            clean: self.clean.run(img),
        }
    }
}

/// Fixed-size resize with horizontal flips for training, plain resize for test.
pub fn default_pair(
    width: u32,
    height: u32,
    seed: Option<u64>,
) -> (SharedTransform, SharedTransform) {
    let train = Compose::new()
        .then(Resize::new(width, height))
        .then(RandomHorizontalFlip::new(seed));
    let test = Compose::new().then(Resize::new(width, height));
    (train.into_shared(), test.into_shared())
}

pub fn imagenet_pair(seed: Option<u64>) -> (SharedTransform, SharedTransform) {
    let train = Compose::new()
        .then(ResizeShorter(256))
        .then(RandomResizedCrop::new(224, seed))
        .then(RandomHorizontalFlip::new(seed));
    let test = Compose::new().then(ResizeShorter(256)).then(CenterCrop(224));
    (Arc::new(MultiView(train)), test.into_shared())
}

/// Evaluation pipeline for contrastive scoring, shared by train and test.
pub fn simclr_eval_imagenet(
    sample_num: usize,
    resize_factor: f64,
    resize_fix: bool,
) -> (SharedTransform, SharedTransform) {
    let scale = if resize_fix {
        (resize_factor, resize_factor)
    } else {
        (resize_factor, 1.0)
    };

    let transform = Compose::new()
        .then(ResizeShorter(256))
        .then(RandomResizedCrop::with_scale(224, scale, Some(0)))
        .then(RandomHorizontalFlip::new(Some(0)));
    let clean = Compose::new().then(ResizeShorter(256)).then(CenterCrop(224));

    let shared: SharedTransform = Arc::new(MultiViewList::new(transform, clean, sample_num));
    (shared.clone(), shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn resize_shorter_keeps_aspect() {
        let out = ResizeShorter(32).apply(gradient(64, 128));
        assert_eq!((out.width(), out.height()), (32, 64));

        let out = ResizeShorter(32).apply(gradient(100, 50));
        assert_eq!((out.width(), out.height()), (64, 32));
    }

    #[test]
    fn center_crop_takes_middle() {
        let out = CenterCrop(2).apply(gradient(6, 4)).to_rgb8();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0).0, [2, 1, 7]);
    }

    #[test]
    fn center_crop_pads_small_images() {
        let out = CenterCrop(8).apply(gradient(4, 4));
        assert_eq!((out.width(), out.height()), (8, 8));
        assert_eq!(out.to_rgb8().get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn flip_is_deterministic_per_seed() {
        let a = RandomHorizontalFlip::new(Some(3));
        let b = RandomHorizontalFlip::new(Some(3));
        for _ in 0..16 {
            let img = gradient(4, 1);
            assert_eq!(a.apply(img.clone()).to_rgb8(), b.apply(img).to_rgb8());
        }
    }

    #[test]
    fn flip_probability_one_always_flips() {
        let flip = RandomHorizontalFlip::with_probability(1.0, None);
        let out = flip.apply(gradient(4, 1)).to_rgb8();
        assert_eq!(out.get_pixel(0, 0).0, [3, 0, 7]);
    }

    #[test]
    fn random_resized_crop_outputs_square() {
        let crop = RandomResizedCrop::new(16, Some(1));
        for _ in 0..8 {
            let out = crop.apply(gradient(40, 30));
            assert_eq!((out.width(), out.height()), (16, 16));
        }
    }

    #[test]
    fn fixed_scale_crop_covers_requested_area() {
        let crop = RandomResizedCrop::with_scale(8, (1.0, 1.0), Some(5));
        let (_, _, w, h) = crop.crop_window(20, 20);
        assert!((w * h) as f64 >= 0.8 * 400.0);
    }

    #[test]
    fn grayscale_has_three_equal_channels() {
        let out = Grayscale3.apply(gradient(3, 3));
        let tensor = to_tensor(&out);
        assert_eq!(tensor.shape()[0], 3);
        assert_eq!(tensor[[0, 2, 1]], tensor[[2, 2, 1]]);
    }

    #[test]
    fn noise_with_zero_scale_is_identity() {
        let noise = GaussianNoise::new(0.0, 1.0, 0.0, Some(9));
        let t = Tensor::from_elem((1, 2, 2), 0.5);
        assert_eq!(noise.apply(t.clone()), t);
    }

    #[test]
    fn multi_view_list_repeats_for_every_call() {
        let (transform, _) = simclr_eval_imagenet(3, 0.5, false);
        let img = gradient(300, 260);

        let Views::List { views: first, clean } = transform.apply(img.clone()) else {
            panic!("expected a list of views");
        };
        let Views::List { views: second, .. } = transform.apply(img) else {
            panic!("expected a list of views");
        };

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert_eq!(clean.shape(), &[3, 224, 224]);
    }

    #[test]
    fn default_pair_resizes_both_splits() {
        let (train, test) = default_pair(8, 6, Some(0));
        assert_eq!(train.apply(gradient(20, 20)).primary().shape(), &[3, 6, 8]);
        assert_eq!(test.apply(gradient(20, 20)).primary().shape(), &[3, 6, 8]);
    }
}
