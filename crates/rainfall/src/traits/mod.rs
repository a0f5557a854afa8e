use geo_types::{Coord, Polygon};
use image::{GrayImage, Luma, RgbImage};
use crate::{
    error::Result,
    types::{HsvImage, IntensityBand},
};

/// Trait for color space conversion ahead of classification
pub trait ColorSpaceConverter: Send + Sync {
    /// Convert an RGB image into the color space the bands are defined in
    fn convert(&self, image: &RgbImage) -> HsvImage;
}

/// Trait for pixel classification against intensity bands
pub trait PixelClassifier: Send + Sync {
    /// Bands in their declared order
    fn bands(&self) -> &[IntensityBand];

    /// Every band whose range contains the color, in declared order
    fn classify(&self, hsv: [u8; 3]) -> Vec<&IntensityBand> {
        self.bands().iter().filter(|band| band.contains(hsv)).collect()
    }

    /// One mask per band (255 where the band matches, 0 elsewhere)
    fn masks(&self, image: &HsvImage) -> Vec<GrayImage> {
        self.bands()
            .iter()
            .map(|band| {
                imageproc::map::map_colors(image, |pixel| {
                    Luma([if band.contains(pixel.0) { 255u8 } else { 0u8 }])
                })
            })
            .collect()
    }
}

/// Trait for mapping pixel positions to geographic coordinates
pub trait PixelProjector: Send + Sync {
    /// Project column `x` and row `y` of a `width` x `height` image to (lon, lat)
    fn project(&self, x: f64, y: f64, width: u32, height: u32) -> Coord<f64>;
}

/// Trait for building an area polygon around a geographic point
pub trait AreaSynthesizer: Send + Sync {
    fn synthesize(&self, center: Coord<f64>) -> Polygon<f64>;
}

/// Trait for the archive the lifecycle manager copies superseded artifacts into
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, overwriting any previous entry
    fn put(&self, bytes: &[u8], key: &str) -> Result<crate::lifecycle::BlobId>;

    fn exists(&self, key: &str) -> Result<bool>;

    /// Read a blob back; `BlobNotFound` when the key is absent
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// All stored keys, sorted
    fn keys(&self) -> Result<Vec<String>>;
}
