//! Image adaptation helpers shared by matching and calibration

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};

/// Single-channel luminance copy of a color frame.
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// Scale factor for a candidate expressed in tenths (9 -> 0.9).
pub fn scale_from_tenths(tenths: u32) -> f64 {
    f64::from(tenths) / 10.0
}

/// Target dimensions for a resize, truncated toward zero but never empty.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let new_width = (f64::from(width) * scale) as u32;
    let new_height = (f64::from(height) * scale) as u32;
    (new_width.max(1), new_height.max(1))
}

/// Resize a luminance image by `scale` using bilinear filtering.
pub fn resize_by_scale(image: &GrayImage, scale: f64) -> GrayImage {
    let (new_width, new_height) = scaled_dimensions(image.width(), image.height(), scale);
    if (new_width, new_height) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, new_width, new_height, FilterType::Triangle)
}
