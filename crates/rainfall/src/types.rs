use std::path::PathBuf;

use geo::BoundingRect;
use geo_types::{MultiPolygon, Polygon, Rect};
use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An image whose three channels hold hue, saturation and value
/// (OpenCV 8-bit convention: H in 0..=179, S and V in 0..=255).
pub type HsvImage = RgbImage;

/// Fixed geographic window an image covers, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoBoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self { north, south, east, west }
    }

    /// Longitudinal span (east - west)
    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal span (north - south)
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }
}

impl Default for GeoBoundingBox {
    fn default() -> Self {
        Self {
            north: 22.03030437021881,
            south: 19.32059531316582,
            east: -101.9462411978663,
            west: -104.8254262826025,
        }
    }
}

/// A named rain-intensity class defined by a closed HSV range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntensityBand {
    pub name: String,
    /// Inclusive lower bound per channel (H, S, V)
    pub lower_bound: [u8; 3],
    /// Inclusive upper bound per channel (H, S, V)
    pub upper_bound: [u8; 3],
}

impl IntensityBand {
    pub fn new(name: impl Into<String>, lower_bound: [u8; 3], upper_bound: [u8; 3]) -> Self {
        Self {
            name: name.into(),
            lower_bound,
            upper_bound,
        }
    }

    /// True when every channel of `hsv` lies within the band's bounds.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        hsv.iter()
            .zip(self.lower_bound.iter().zip(self.upper_bound.iter()))
            .all(|(value, (lower, upper))| lower <= value && value <= upper)
    }

    /// The band set used by the radar overlay deployment.
    pub fn default_bands() -> Vec<IntensityBand> {
        vec![
            IntensityBand::new("weak", [35, 100, 100], [85, 255, 255]),
            IntensityBand::new("light", [35, 150, 150], [85, 255, 255]),
            IntensityBand::new("moderate-to-strong", [25, 170, 170], [35, 255, 255]),
            IntensityBand::new("moderate-to-strong (alt hue)", [85, 170, 170], [95, 255, 255]),
        ]
    }
}

/// One circle polygon tagged with the band that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RainAreaFeature {
    pub geometry: Polygon<f64>,
    pub intensity: String,
}

/// Features produced by a single extraction run, in scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct RainAreaCollection {
    pub features: Vec<RainAreaFeature>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
    /// File name of the source image, when extracted from a file
    pub source_image: Option<String>,
}

impl RainAreaCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding rectangle of every polygon, `None` for an empty collection
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let polygons: MultiPolygon<f64> = self
            .features
            .iter()
            .map(|f| f.geometry.clone())
            .collect();
        polygons.bounding_rect()
    }
}

/// Outcome of a successful extraction. An empty scan is not an error,
/// but callers have to branch on it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Features(RainAreaCollection),
    NoFeatures(RainAreaCollection),
}

impl Extraction {
    pub fn from_collection(collection: RainAreaCollection) -> Self {
        if collection.is_empty() {
            Self::NoFeatures(collection)
        } else {
            Self::Features(collection)
        }
    }

    pub fn collection(&self) -> &RainAreaCollection {
        match self {
            Self::Features(c) | Self::NoFeatures(c) => c,
        }
    }

    pub fn into_collection(self) -> RainAreaCollection {
        match self {
            Self::Features(c) | Self::NoFeatures(c) => c,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoFeatures(_))
    }
}

/// A serialized artifact waiting in a run-scoped staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingArtifact {
    pub path: PathBuf,
    pub feature_count: usize,
}
