use crate::{traits::PixelClassifier, types::IntensityBand};

/// Classifies pixels against an ordered list of HSV intensity bands.
/// Bands may overlap; a pixel matching several bands yields all of them.
#[derive(Debug, Clone)]
pub struct ColorBandClassifier {
    bands: Vec<IntensityBand>,
}

impl ColorBandClassifier {
    pub fn new(bands: Vec<IntensityBand>) -> Self {
        Self { bands }
    }
}

impl Default for ColorBandClassifier {
    fn default() -> Self {
        Self::new(IntensityBand::default_bands())
    }
}

impl PixelClassifier for ColorBandClassifier {
    fn bands(&self) -> &[IntensityBand] {
        &self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn names(bands: Vec<&IntensityBand>) -> Vec<&str> {
        bands.into_iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let classifier = ColorBandClassifier::new(vec![
            IntensityBand::new("band", [10, 20, 30], [40, 50, 60]),
        ]);
        assert_eq!(names(classifier.classify([10, 20, 30])), vec!["band"]);
        assert_eq!(names(classifier.classify([40, 50, 60])), vec!["band"]);
        assert!(classifier.classify([9, 20, 30]).is_empty());
        assert!(classifier.classify([40, 50, 61]).is_empty());
    }

    #[test]
    fn test_every_channel_must_match() {
        let classifier = ColorBandClassifier::default();
        // Green hue, but saturation below every band
        assert!(classifier.classify([60, 50, 200]).is_empty());
    }

    #[test]
    fn test_overlapping_bands_fan_out_in_declared_order() {
        let classifier = ColorBandClassifier::default();
        assert_eq!(names(classifier.classify([60, 200, 200])), vec!["weak", "light"]);
        assert_eq!(names(classifier.classify([60, 120, 120])), vec!["weak"]);
        // Hue 35 sits on the shared edge of the green and yellow bands
        assert_eq!(
            names(classifier.classify([35, 200, 200])),
            vec!["weak", "light", "moderate-to-strong"]
        );
        assert_eq!(
            names(classifier.classify([90, 200, 200])),
            vec!["moderate-to-strong (alt hue)"]
        );
    }

    #[test]
    fn test_masks_match_per_pixel_classification() {
        let classifier = ColorBandClassifier::default();
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([60, 200, 200]));
        image.put_pixel(1, 0, Rgb([0, 0, 0]));
        image.put_pixel(2, 0, Rgb([30, 200, 200]));

        let masks = classifier.masks(&image);
        assert_eq!(masks.len(), 4);
        for (band, mask) in classifier.bands().iter().zip(&masks) {
            for (x, _, pixel) in image.enumerate_pixels() {
                let expected = band.contains(pixel.0);
                assert_eq!(mask.get_pixel(x, 0)[0] > 0, expected, "band {} at x={}", band.name, x);
            }
        }
    }
}
