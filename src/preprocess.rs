//! Deterministic image-to-tensor preprocessing shared by every ensemble
//! member: decode, force RGB, resize to 224x224, scale to [0,1], apply
//! ImageNet channel statistics, add a batch dimension.

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

use crate::classifier::PredictError;

/// Square input resolution every backbone was trained at.
pub const IMAGE_SIZE: u32 = 224;

/// Per-channel ImageNet mean, RGB order.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel ImageNet standard deviation, RGB order.
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decodes raw image bytes. Malformed input is a client error, surfaced as
/// [`PredictError::ImageDecode`] rather than a silent zero tensor.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, PredictError> {
    image::load_from_memory(bytes).map_err(|e| PredictError::ImageDecode(e.to_string()))
}

/// Converts a decoded image into the fixed `[1, 3, 224, 224]` NCHW tensor
/// every classifier consumes. Resize is exact (no aspect preservation) with
/// a bilinear filter, matching the transform the models were trained with.
pub fn to_tensor(image: &DynamicImage) -> Array4<f32> {
    let resized = image.resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let size = IMAGE_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }
    tensor
}
