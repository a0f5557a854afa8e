use geo_types::Coord;
use crate::{traits::PixelProjector, types::GeoBoundingBox};

/// Linear pixel-to-degree interpolation inside a fixed bounding box.
/// Row 0 maps to `north`, column 0 maps to `west`. No geodesic correction.
#[derive(Debug, Clone, Copy)]
pub struct LinearGeoProjector {
    pub bounding_box: GeoBoundingBox,
}

impl LinearGeoProjector {
    pub fn new(bounding_box: GeoBoundingBox) -> Self {
        Self { bounding_box }
    }
}

impl Default for LinearGeoProjector {
    fn default() -> Self {
        Self::new(GeoBoundingBox::default())
    }
}

impl PixelProjector for LinearGeoProjector {
    fn project(&self, x: f64, y: f64, width: u32, height: u32) -> Coord<f64> {
        let bbox = &self.bounding_box;
        Coord {
            x: bbox.west + (x / f64::from(width)) * bbox.lon_span(),
            y: bbox.north - (y / f64::from(height)) * bbox.lat_span(),
        }
    }
}
