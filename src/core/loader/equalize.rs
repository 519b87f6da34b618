//! Global histogram equalization.

use image::GrayImage;

/// Spread intensities over the full 0-255 range using the cumulative histogram.
///
/// The lookup table starts after the first occupied bin, so the darkest level
/// always maps to 0. An image with a single intensity is returned unchanged.
pub fn equalize(image: &GrayImage) -> GrayImage {
    let total = image.as_raw().len() as u64;
    if total == 0 {
        return image.clone();
    }

    let mut histogram = [0u64; 256];
    for &value in image.as_raw() {
        histogram[value as usize] += 1;
    }

    let Some(first) = histogram.iter().position(|&count| count > 0) else {
        return image.clone();
    };

    if histogram[first] == total {
        return image.clone();
    }

    let scale = 255.0 / (total - histogram[first]) as f64;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u64;
    for level in (first + 1)..256 {
        cumulative += histogram[level];
        lut[level] = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }

    let mut output = image.clone();
    for value in output.iter_mut() {
        *value = lut[*value as usize];
    }
    output
}
