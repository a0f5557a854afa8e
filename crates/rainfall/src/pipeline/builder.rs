use crate::{
    algorithms::{CircleSynthesizer, ColorBandClassifier, LinearGeoProjector, OpenCvHsvConverter},
    config::{ArtifactConfig, DeploymentConfig},
    pipeline::Pipeline,
    traits::{AreaSynthesizer, ColorSpaceConverter, PixelClassifier, PixelProjector},
    types::{GeoBoundingBox, IntensityBand},
};

/// Builder for creating extraction pipelines with a fluent API.
/// Unset values fall back to `DeploymentConfig::default()`.
pub struct PipelineBuilder {
    bounding_box: GeoBoundingBox,
    bands: Vec<IntensityBand>,
    radius_degrees: f64,
    circle_points: usize,
    artifacts: ArtifactConfig,
    converter: Option<Box<dyn ColorSpaceConverter>>,
    classifier: Option<Box<dyn PixelClassifier>>,
    projector: Option<Box<dyn PixelProjector>>,
    synthesizer: Option<Box<dyn AreaSynthesizer>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::from_config(&DeploymentConfig::default())
    }

    /// Start from the values of a deployment config (not validated here)
    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self {
            bounding_box: config.bounding_box,
            bands: config.band_definitions.clone(),
            radius_degrees: config.radius_degrees,
            circle_points: config.circle_points,
            artifacts: config.artifacts.clone(),
            converter: None,
            classifier: None,
            projector: None,
            synthesizer: None,
        }
    }

    pub fn bounding_box(mut self, bounding_box: GeoBoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    /// Replace the band table
    pub fn bands(mut self, bands: Vec<IntensityBand>) -> Self {
        self.bands = bands;
        self
    }

    /// Append a band after the existing ones
    pub fn add_band(mut self, band: IntensityBand) -> Self {
        self.bands.push(band);
        self
    }

    pub fn radius(mut self, radius_degrees: f64) -> Self {
        self.radius_degrees = radius_degrees;
        self
    }

    pub fn circle_points(mut self, points: usize) -> Self {
        self.circle_points = points;
        self
    }

    pub fn artifacts(mut self, artifacts: ArtifactConfig) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Set the color converter (replaces the OpenCV-style HSV default)
    pub fn set_converter<C>(mut self, converter: C) -> Self
    where
        C: ColorSpaceConverter + 'static,
    {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Set the classifier (takes precedence over `bands`)
    pub fn set_classifier<C>(mut self, classifier: C) -> Self
    where
        C: PixelClassifier + 'static,
    {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Set the projector (takes precedence over `bounding_box`)
    pub fn set_projector<P>(mut self, projector: P) -> Self
    where
        P: PixelProjector + 'static,
    {
        self.projector = Some(Box::new(projector));
        self
    }

    /// Set the area synthesizer (takes precedence over `radius` and `circle_points`)
    pub fn set_synthesizer<S>(mut self, synthesizer: S) -> Self
    where
        S: AreaSynthesizer + 'static,
    {
        self.synthesizer = Some(Box::new(synthesizer));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let converter = self.converter
            .unwrap_or_else(|| Box::new(OpenCvHsvConverter));

        let classifier = self.classifier
            .unwrap_or_else(|| Box::new(ColorBandClassifier::new(self.bands)));

        let projector = self.projector
            .unwrap_or_else(|| Box::new(LinearGeoProjector::new(self.bounding_box)));

        let synthesizer = self.synthesizer
            .unwrap_or_else(|| Box::new(CircleSynthesizer::new(self.radius_degrees, self.circle_points)));

        Pipeline::new(converter, classifier, projector, synthesizer, self.artifacts)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
