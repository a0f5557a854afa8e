use image::{Rgb, RgbImage};
use crate::{traits::ColorSpaceConverter, types::HsvImage};

/// RGB to HSV conversion following OpenCV's 8-bit convention
#[derive(Debug, Clone, Default)]
pub struct OpenCvHsvConverter;

impl ColorSpaceConverter for OpenCvHsvConverter {
    fn convert(&self, image: &RgbImage) -> HsvImage {
        imageproc::map::map_colors(image, rgb_to_hsv)
    }
}

/// Convert one RGB pixel to (H, S, V) with H halved into 0..=179.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = pixel.0.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { (255.0 * delta / max).round() } else { 0.0 };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 { hue_degrees + 360.0 } else { hue_degrees };

    // 359.x degrees rounds up to 180, which wraps back to red
    let hue = (hue_degrees / 2.0).round() % 180.0;

    Rgb([hue as u8, saturation as u8, max as u8])
}
