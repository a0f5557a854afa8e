use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    config::DeploymentConfig,
    error::Result,
    lifecycle::ArtifactLifecycleManager,
    pipeline::Pipeline,
    run::{RunReport, process_image},
    types::IntensityBand,
};
use serde::{Serialize, Deserialize};
use schemars::JsonSchema;
use strum::{Display, EnumString, EnumIter, IntoStaticStr, VariantNames};

#[derive(
    Debug, Clone,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq
)]
#[serde(tag = "type", content = "params")]
#[strum(serialize_all = "snake_case")]
pub enum RainfallCommand {
    /// Extract rain areas from an image and install the artifact
    #[serde(rename = "process_image")]
    ProcessImage {
        #[schemars(length(min = 1))]
        path: String,
    },

    /// Extract rain areas without touching the artifact slot
    #[serde(rename = "extract_only")]
    ExtractOnly {
        #[schemars(length(min = 1))]
        path: String,
    },

    /// Report the currently installed artifact
    #[serde(rename = "current_artifact")]
    CurrentArtifact,

    /// List the configured intensity bands
    #[serde(rename = "list_bands")]
    ListBands,
}

impl RainfallCommand {
    /// Get the JSON schema for all commands
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RainfallCommand)
    }

    /// Get a list of all available command names
    pub fn command_names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ProcessImage { .. } => "Extract rain areas from a radar image, archive the previous artifact and install the new one",
            Self::ExtractOnly { .. } => "Extract rain areas from a radar image and return them as GeoJSON without installing",
            Self::CurrentArtifact => "Path of the artifact currently installed in the slot, if any",
            Self::ListBands => "Intensity bands used to classify pixels, in evaluation order",
        }
    }

    /// Parameter name, description and whether it is required
    pub fn parameters_info(&self) -> Vec<(&'static str, &'static str, bool)> {
        match self {
            Self::ProcessImage { .. } | Self::ExtractOnly { .. } => vec![
                ("path", "Path to the radar image file", true)
            ],
            Self::CurrentArtifact | Self::ListBands => vec![],
        }
    }
}

/// Result of executing a `RainfallCommand`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Processed(RunReport),
    Extracted {
        feature_count: usize,
        image_width: u32,
        image_height: u32,
        intensity_counts: BTreeMap<String, usize>,
        geojson: serde_json::Value,
    },
    Current { artifact: Option<PathBuf> },
    Bands { bands: Vec<IntensityBand> },
}

/// Executes commands against one pipeline and one artifact slot
#[derive(Clone)]
pub struct RainfallManager {
    pipeline: Arc<Pipeline>,
    lifecycle: Arc<ArtifactLifecycleManager>,
    staging_root: PathBuf,
}

impl RainfallManager {
    pub fn new(
        pipeline: Arc<Pipeline>,
        lifecycle: Arc<ArtifactLifecycleManager>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            lifecycle,
            staging_root: staging_root.into(),
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(config)?;
        let lifecycle = ArtifactLifecycleManager::from_config(&config.artifacts);
        Ok(Self::new(
            Arc::new(pipeline),
            Arc::new(lifecycle),
            &config.artifacts.staging_dir,
        ))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn lifecycle(&self) -> &ArtifactLifecycleManager {
        &self.lifecycle
    }

    pub fn execute(&self, command: RainfallCommand) -> Result<CommandOutput> {
        match command {
            RainfallCommand::ProcessImage { path } => {
                let report = process_image(&self.pipeline, &self.lifecycle, &self.staging_root, Path::new(&path))?;
                Ok(CommandOutput::Processed(report))
            }
            RainfallCommand::ExtractOnly { path } => {
                let collection = self.pipeline.extract_file(Path::new(&path))?.into_collection();
                let typed = collection.to_typed_geojson()?;
                Ok(CommandOutput::Extracted {
                    feature_count: collection.len(),
                    image_width: collection.image_width,
                    image_height: collection.image_height,
                    intensity_counts: typed.intensity_counts(),
                    geojson: serde_json::to_value(collection.to_geojson())?,
                })
            }
            RainfallCommand::CurrentArtifact => Ok(CommandOutput::Current {
                artifact: self.lifecycle.current()?,
            }),
            RainfallCommand::ListBands => Ok(CommandOutput::Bands {
                bands: self.pipeline.bands().to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ArtifactConfig, lifecycle::MemoryBlobStore};
    use image::{Rgb, RgbImage};
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn manager(root: &Path) -> RainfallManager {
        let artifacts = ArtifactConfig {
            staging_dir: root.join("staging"),
            current_dir: root.join("current"),
            archive_dir: root.join("archive"),
            ..ArtifactConfig::default()
        };
        let pipeline = Pipeline::builder().artifacts(artifacts.clone()).build();
        let lifecycle = ArtifactLifecycleManager::new(&artifacts.current_dir, Arc::new(MemoryBlobStore::new()));
        RainfallManager::new(Arc::new(pipeline), Arc::new(lifecycle), &artifacts.staging_dir)
    }

    #[test]
    fn test_command_names_and_parsing() {
        assert_eq!(
            RainfallCommand::command_names(),
            &["process_image", "extract_only", "current_artifact", "list_bands"]
        );
        assert_eq!(RainfallCommand::from_str("list_bands").unwrap(), RainfallCommand::ListBands);
        assert_eq!(RainfallCommand::iter().count(), 4);
    }

    #[test]
    fn test_command_json_shape() {
        let command: RainfallCommand =
            serde_json::from_str(r#"{"type":"process_image","params":{"path":"radar.png"}}"#).unwrap();
        assert_eq!(command, RainfallCommand::ProcessImage { path: "radar.png".to_string() });

        let json = serde_json::to_value(RainfallCommand::CurrentArtifact).unwrap();
        assert_eq!(json["type"], "current_artifact");
    }

    #[test]
    fn test_execute_process_then_current() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        let image = dir.path().join("radar.png");
        RgbImage::from_pixel(2, 2, Rgb([0, 200, 0])).save(&image).expect("save png");

        let before = manager.execute(RainfallCommand::CurrentArtifact).unwrap();
        assert!(matches!(before, CommandOutput::Current { artifact: None }));

        let output = manager
            .execute(RainfallCommand::ProcessImage { path: image.display().to_string() })
            .expect("processes");
        let CommandOutput::Processed(report) = output else {
            panic!("expected a run report");
        };
        assert_eq!(report.feature_count, 8);

        let after = manager.execute(RainfallCommand::CurrentArtifact).unwrap();
        let CommandOutput::Current { artifact } = after else {
            panic!("expected current artifact");
        };
        assert_eq!(artifact, Some(report.artifact));
    }

    #[test]
    fn test_extract_only_leaves_slot_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(dir.path());
        let image = dir.path().join("radar.png");
        RgbImage::from_pixel(1, 2, Rgb([230, 230, 0])).save(&image).expect("save png");

        let output = manager
            .execute(RainfallCommand::ExtractOnly { path: image.display().to_string() })
            .expect("extracts");
        let CommandOutput::Extracted { feature_count, intensity_counts, .. } = output else {
            panic!("expected extraction output");
        };
        assert_eq!(feature_count, 2);
        assert_eq!(intensity_counts.get("moderate-to-strong"), Some(&2));
        assert_eq!(manager.lifecycle().current().unwrap(), None);
    }

    #[test]
    fn test_list_bands_in_declared_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = manager(dir.path()).execute(RainfallCommand::ListBands).unwrap();
        let CommandOutput::Bands { bands } = output else {
            panic!("expected bands");
        };
        let names: Vec<&str> = bands.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names[0], "weak");
        assert_eq!(names.len(), 4);
    }
}
