//! Deployment configuration.
//!
//! The bounding box, circle radius and band table are fixed per deployment;
//! they are loaded once (TOML or JSON) and handed to the pipeline and the
//! lifecycle manager as explicit values.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{DEFAULT_CIRCLE_POINTS, DEFAULT_RADIUS_DEGREES},
    error::{RainfallError, Result},
    types::{GeoBoundingBox, IntensityBand},
};

/// Largest hue value in the 8-bit HSV convention
pub const MAX_HUE: u8 = 179;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DeploymentConfig {
    pub bounding_box: GeoBoundingBox,
    #[schemars(description = "Circle radius in degrees")]
    pub radius_degrees: f64,
    #[schemars(description = "Vertices per circle polygon")]
    pub circle_points: usize,
    #[schemars(description = "Ordered HSV bands (H 0-179, S/V 0-255)")]
    pub band_definitions: Vec<IntensityBand>,
    pub artifacts: ArtifactConfig,
    #[schemars(description = "Maximum number of concurrent extraction runs")]
    pub workers: usize,
}

/// Where artifacts live during and after a run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Parent of the run-scoped temporary directories
    pub staging_dir: PathBuf,
    /// Slot directory holding the single current artifact
    pub current_dir: PathBuf,
    /// Root of the filesystem blob store
    pub archive_dir: PathBuf,
    /// Appended to the image stem, e.g. `radar_areas.geojson`
    pub suffix: String,
    pub extension: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            bounding_box: GeoBoundingBox::default(),
            radius_degrees: DEFAULT_RADIUS_DEGREES,
            circle_points: DEFAULT_CIRCLE_POINTS,
            band_definitions: IntensityBand::default_bands(),
            artifacts: ArtifactConfig::default(),
            workers: 4,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("data/staging"),
            current_dir: PathBuf::from("data/current"),
            archive_dir: PathBuf::from("data/archive"),
            suffix: "_areas".to_string(),
            extension: "geojson".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// `<image-stem><suffix>.<extension>`
    pub fn artifact_name(&self, image_path: &Path) -> Result<String> {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                RainfallError::InvalidImage(format!("no usable file name in {}", image_path.display()))
            })?;
        Ok(format!("{}{}.{}", stem, self.suffix, self.extension))
    }
}

impl DeploymentConfig {
    /// Load from a `.toml` or `.json` file, then validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| RainfallError::Config(format!("{}: {}", path.display(), e)))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => {
                return Err(RainfallError::Config(format!(
                    "unsupported config format for {}, use .toml or .json",
                    path.display()
                )));
            }
        };
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DeploymentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: DeploymentConfig =
            serde_json::from_str(content).map_err(|e| RainfallError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RainfallError::Config(e.to_string()))
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DeploymentConfig)
    }

    pub fn validate(&self) -> Result<()> {
        let bbox = &self.bounding_box;
        let bounds = [bbox.north, bbox.south, bbox.east, bbox.west];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(RainfallError::Config("bounding box values must be finite".into()));
        }
        if bbox.lat_span() == 0.0 || bbox.lon_span() == 0.0 {
            return Err(RainfallError::Config("bounding box must not be degenerate".into()));
        }
        if !self.radius_degrees.is_finite() || self.radius_degrees <= 0.0 {
            return Err(RainfallError::Config(format!(
                "radius_degrees must be positive, got {}",
                self.radius_degrees
            )));
        }
        if self.circle_points < 3 {
            return Err(RainfallError::Config(format!(
                "circle_points must be at least 3, got {}",
                self.circle_points
            )));
        }
        if self.band_definitions.is_empty() {
            return Err(RainfallError::Config("at least one band definition is required".into()));
        }
        for band in &self.band_definitions {
            if band.name.trim().is_empty() {
                return Err(RainfallError::Config("band names must not be empty".into()));
            }
            if band.lower_bound.iter().zip(&band.upper_bound).any(|(lo, hi)| lo > hi) {
                return Err(RainfallError::Config(format!(
                    "band '{}' has a lower bound above its upper bound",
                    band.name
                )));
            }
            if band.upper_bound[0] > MAX_HUE {
                return Err(RainfallError::Config(format!(
                    "band '{}' hue exceeds {}",
                    band.name, MAX_HUE
                )));
            }
        }
        if self.workers == 0 {
            return Err(RainfallError::Config("workers must be at least 1".into()));
        }
        if self.artifacts.suffix.is_empty() || self.artifacts.extension.is_empty() {
            return Err(RainfallError::Config("artifact suffix and extension must be set".into()));
        }
        Ok(())
    }
}
