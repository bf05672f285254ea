//! Pixel statistics computed directly from image data

use image::{GrayImage, Luma, RgbImage};

/// Fraction of each side kept by the central crop
pub const CENTER_CROP_RATIO: f32 = 0.5;
/// Central crop must reach this fraction of the overall brightness
pub const CENTER_BRIGHTNESS_RATIO: f64 = 0.95;

/// Convert to grayscale with BT.601 weights (0.299, 0.587, 0.114).
///
/// Uses the 14-bit fixed point form so results match common vision libraries
/// pixel for pixel.
pub fn grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868;
    ((weighted + (1 << 13)) >> 14) as u8
}

/// Mean grayscale intensity. Empty images report 0.
pub fn brightness(gray: &GrayImage) -> f32 {
    mean(gray.as_raw()).unwrap_or(0.0) as f32
}

/// Population standard deviation over every channel of every pixel
pub fn colorfulness(image: &RgbImage) -> f32 {
    let values = image.as_raw();
    let Some(mean) = mean(values) else {
        return 0.0;
    };

    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;

    variance.sqrt() as f32
}

/// Whether the central crop is at least `CENTER_BRIGHTNESS_RATIO` as bright
/// as the whole frame. An empty crop (images under 2px on a side) is never
/// centered. Both means stay in f64.
pub fn is_centered(gray: &GrayImage) -> bool {
    let (width, height) = gray.dimensions();
    let crop_w = (width as f32 * CENTER_CROP_RATIO) as u32;
    let crop_h = (height as f32 * CENTER_CROP_RATIO) as u32;
    if crop_w == 0 || crop_h == 0 {
        return false;
    }

    let x0 = (width - crop_w) / 2;
    let y0 = (height - crop_h) / 2;

    let mut sum = 0u64;
    for y in y0..y0 + crop_h {
        for x in x0..x0 + crop_w {
            sum += gray.get_pixel(x, y).0[0] as u64;
        }
    }
    let crop_mean = sum as f64 / (crop_w as u64 * crop_h as u64) as f64;
    let frame_mean = mean(gray.as_raw()).unwrap_or(0.0);

    crop_mean >= frame_mean * CENTER_BRIGHTNESS_RATIO
}

fn mean(values: &[u8]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|&v| v as u64).sum();
    Some(sum as f64 / values.len() as f64)
}
