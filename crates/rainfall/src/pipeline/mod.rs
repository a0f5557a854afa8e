pub mod builder;

use std::fs;
use std::path::Path;

use image::{GrayImage, RgbImage};
use tracing::{debug, info};
use crate::{
    config::{ArtifactConfig, DeploymentConfig},
    error::{RainfallError, Result},
    traits::{AreaSynthesizer, ColorSpaceConverter, PixelClassifier, PixelProjector},
    types::{Extraction, HsvImage, IntensityBand, PendingArtifact, RainAreaCollection, RainAreaFeature},
};

/// Image-to-feature extraction: color conversion, per-band masks, then one
/// projected circle per (pixel, matching band) in row-major scan order.
pub struct Pipeline {
    converter: Box<dyn ColorSpaceConverter>,
    classifier: Box<dyn PixelClassifier>,
    projector: Box<dyn PixelProjector>,
    synthesizer: Box<dyn AreaSynthesizer>,
    artifacts: ArtifactConfig,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        converter: Box<dyn ColorSpaceConverter>,
        classifier: Box<dyn PixelClassifier>,
        projector: Box<dyn PixelProjector>,
        synthesizer: Box<dyn AreaSynthesizer>,
        artifacts: ArtifactConfig,
    ) -> Self {
        Self {
            converter,
            classifier,
            projector,
            synthesizer,
            artifacts,
        }
    }

    /// Validate the configuration and build a pipeline from it
    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        config.validate()?;
        Ok(builder::PipelineBuilder::from_config(config).build())
    }

    pub fn bands(&self) -> &[IntensityBand] {
        self.classifier.bands()
    }

    /// One mask per band, in declared order (255 where the band matches)
    pub fn band_masks(&self, hsv: &HsvImage) -> Vec<GrayImage> {
        self.classifier.masks(hsv)
    }

    /// Scan an in-memory image
    pub fn extract(&self, image: &RgbImage) -> Result<Extraction> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RainfallError::InvalidImage(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        // Step 1: Convert to the band color space
        let hsv = self.converter.convert(image);

        // Step 2: One boolean mask per band
        let masks = self.band_masks(&hsv);
        let bands = self.classifier.bands();
        for (band, mask) in bands.iter().zip(&masks) {
            debug!(
                band = %band.name,
                matches = mask.pixels().filter(|p| p.0[0] > 0).count(),
                "band mask computed"
            );
        }

        // Step 3: Fan out, rows first, bands in declared order per pixel
        let mut features = Vec::new();
        for y in 0..height {
            for x in 0..width {
                for (band, mask) in bands.iter().zip(&masks) {
                    if mask.get_pixel(x, y).0[0] == 0 {
                        continue;
                    }
                    let center = self.projector.project(f64::from(x), f64::from(y), width, height);
                    features.push(RainAreaFeature {
                        geometry: self.synthesizer.synthesize(center),
                        intensity: band.name.clone(),
                    });
                }
            }
        }

        Ok(Extraction::from_collection(RainAreaCollection {
            features,
            image_width: width,
            image_height: height,
            source_image: None,
        }))
    }

    /// Load an image file and scan it
    pub fn extract_file(&self, image_path: &Path) -> Result<Extraction> {
        let image = load_image(image_path)?;
        let extraction = self.extract(&image)?;
        let source = image_path.file_name().and_then(|n| n.to_str()).map(str::to_string);

        let extraction = match extraction {
            Extraction::Features(mut c) => {
                c.source_image = source;
                Extraction::Features(c)
            }
            Extraction::NoFeatures(mut c) => {
                c.source_image = source;
                Extraction::NoFeatures(c)
            }
        };

        match &extraction {
            Extraction::Features(c) => info!(image = %image_path.display(), features = c.len(), "rain areas extracted"),
            Extraction::NoFeatures(_) => info!(image = %image_path.display(), "no rain areas found"),
        }
        Ok(extraction)
    }

    /// Serialize an extraction as `<image-stem><suffix>.<ext>` inside `staging_dir`
    pub fn write_artifact(
        &self,
        extraction: &Extraction,
        image_path: &Path,
        staging_dir: &Path,
    ) -> Result<PendingArtifact> {
        let name = self.artifacts.artifact_name(image_path)?;
        let path = staging_dir.join(name);
        let collection = extraction.collection();
        collection.save_geojson(&path)?;
        debug!(artifact = %path.display(), "artifact staged");
        Ok(PendingArtifact {
            path,
            feature_count: collection.len(),
        })
    }

    /// Extract from a file and stage the artifact in `staging_dir`
    pub fn run(&self, image_path: &Path, staging_dir: &Path) -> Result<(Extraction, PendingArtifact)> {
        let extraction = self.extract_file(image_path)?;
        let pending = self.write_artifact(&extraction, image_path, staging_dir)?;
        Ok((extraction, pending))
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} bands, output *{}.{}",
            self.classifier.bands().len(),
            self.artifacts.suffix,
            self.artifacts.extension
        )
    }
}

/// Read an image file as RGB8; missing, empty or undecodable files are invalid input
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let metadata = fs::metadata(path)
        .map_err(|e| RainfallError::InvalidImage(format!("{}: {}", path.display(), e)))?;
    if !metadata.is_file() || metadata.len() == 0 {
        return Err(RainfallError::InvalidImage(format!(
            "{} is not a non-empty file",
            path.display()
        )));
    }
    Ok(image::open(path)?.to_rgb8())
}
