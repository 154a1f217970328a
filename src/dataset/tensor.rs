use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{Array3, Array4, ArrayViewD, Axis};

use crate::dataloader::error::{DatasetError, Result};

/// Channel-major image tensor (channels, height, width) with values in `[0, 1]`.
pub type Tensor = Array3<f32>;

/// Grey images keep one channel, everything else becomes RGB. Alpha is dropped.
pub fn to_tensor(img: &DynamicImage) -> Tensor {
    let (width, height) = (img.width() as usize, img.height() as usize);

    match img.color().channel_count() {
        1 | 2 => {
            let gray = img.to_luma8();
            Array3::from_shape_fn((1, height, width), |(_, y, x)| {
                gray.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
            })
        }
        _ => {
            let rgb = img.to_rgb8();
            Array3::from_shape_fn((3, height, width), |(c, y, x)| {
                rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
            })
        }
    }
}

/// Decode an image file and normalise it to 8-bit RGB.
pub fn open_rgb(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).map_err(|e| DatasetError::image(path, e))?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Build an image from one in-memory sample.
///
/// Accepts `(H, W)` grey, `(H, W, C)` or `(C, H, W)` with `C` being 1 or 3.
pub fn array_to_image(sample: ArrayViewD<'_, u8>) -> Result<DynamicImage> {
    let shape = sample.shape().to_vec();
    let unexpected = || DatasetError::UnexpectedShape {
        found: shape.clone(),
        expected: "(H, W), (H, W, C) or (C, H, W) with C in {1, 3}".to_string(),
    };

    let (height, width, channels, hwc) = match shape.as_slice() {
        &[h, w] => (h, w, 1, sample.to_owned()),
        &[h, w, c] if c == 1 || c == 3 => (h, w, c, sample.to_owned()),
        &[c, h, w] if c == 1 || c == 3 => {
            (h, w, c, sample.permuted_axes(vec![1, 2, 0]).to_owned())
        }
        _ => return Err(unexpected()),
    };

    let raw: Vec<u8> = hwc.iter().copied().collect();
    let (width, height) = (width as u32, height as u32);

    let img = if channels == 1 {
        GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
    } else {
        RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8)
    };

    img.ok_or_else(unexpected)
}

/// Stack equally shaped tensors along a new leading batch axis.
pub fn stack(tensors: &[Tensor]) -> Result<Array4<f32>> {
    let Some(first) = tensors.first() else {
        return Ok(Array4::zeros((0, 0, 0, 0)));
    };

    if let Some(other) = tensors.iter().find(|t| t.shape() != first.shape()) {
        return Err(DatasetError::ShapeMismatch {
            first: first.shape().to_vec(),
            other: other.shape().to_vec(),
        });
    }

    let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::{Array2, Array3 as A3};

    #[test]
    fn rgb_image_becomes_chw_unit_range() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));

        let tensor = to_tensor(&DynamicImage::ImageRgb8(img));

        assert_eq!(tensor.shape(), &[3, 1, 2]);
        assert_eq!(tensor[[0, 0, 0]], 1.0);
        assert_eq!(tensor[[2, 0, 0]], 0.0);
        assert_eq!(tensor[[2, 0, 1]], 1.0);
    }

    #[test]
    fn grey_arrays_keep_one_channel() {
        let arr = Array2::<u8>::from_elem((4, 5), 51).into_dyn();
        let img = array_to_image(arr.view()).unwrap();
        let tensor = to_tensor(&img);

        assert_eq!(tensor.shape(), &[1, 4, 5]);
        assert!((tensor[[0, 3, 4]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn channel_first_arrays_are_transposed() {
        let mut arr = A3::<u8>::zeros((3, 2, 2));
        arr[[1, 0, 1]] = 255;
        let img = array_to_image(arr.into_dyn().view()).unwrap();
        let rgb = img.to_rgb8();

        assert_eq!(rgb.dimensions(), (2, 2));
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        let arr = A3::<u8>::zeros((4, 4, 4)).into_dyn();
        assert!(matches!(
            array_to_image(arr.view()),
            Err(DatasetError::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn stacking_requires_equal_shapes() {
        let a = Tensor::zeros((3, 2, 2));
        let b = Tensor::zeros((3, 2, 2));
        assert_eq!(stack(&[a.clone(), b]).unwrap().shape(), &[2, 3, 2, 2]);

        let c = Tensor::zeros((1, 2, 2));
        assert!(matches!(
            stack(&[a, c]),
            Err(DatasetError::ShapeMismatch { .. })
        ));
    }
}
