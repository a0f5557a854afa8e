//! # Radar Rainfall Library
//!
//! Turns radar overlay images into GeoJSON rain areas and keeps a single
//! "current" artifact up to date, archiving every artifact it replaces.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: color conversion, classification, projection
//!   and area synthesis are swappable traits
//! - **Band Classification**: named HSV ranges, a pixel may match several bands
//! - **Geographic Projection**: linear pixel-to-lon/lat mapping over a fixed bounding box
//! - **GeoJSON Support**: export/import of rain-area feature collections
//! - **Artifact Lifecycle**: archive-then-replace installs into a one-artifact slot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rainfall::Pipeline;
//! use std::path::Path;
//!
//! // Default bands and bounding box
//! let pipeline = Pipeline::builder().build();
//!
//! let extraction = pipeline.extract_file(Path::new("radar.png"))?;
//! extraction.collection().save_geojson(Path::new("radar_areas.geojson"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Replace and archive
//!
//! ```rust,no_run
//! use rainfall::{config::DeploymentConfig, lifecycle::ArtifactLifecycleManager, process_image, Pipeline};
//! use std::path::Path;
//!
//! let config = DeploymentConfig::from_file("rainfall.toml")?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let lifecycle = ArtifactLifecycleManager::from_config(&config.artifacts);
//!
//! let report = process_image(&pipeline, &lifecycle, &config.artifacts.staging_dir, Path::new("radar.png"))?;
//! println!("{} features installed at {}", report.feature_count, report.artifact.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod io;
pub mod typed_geojson;
pub mod config;
pub mod lifecycle;
pub mod run;
pub mod pool;
pub mod supervisor;
pub mod manager;
pub mod mcp;

// Re-exports for convenience
pub use error::{ErrorCategory, RainfallError, Result};
pub use types::{Extraction, GeoBoundingBox, IntensityBand, PendingArtifact, RainAreaCollection, RainAreaFeature};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder, load_image};
pub use io::{move_file, write_atomically};
pub use config::{ArtifactConfig, DeploymentConfig};
pub use lifecycle::{ArtifactLifecycleManager, BlobId, FsBlobStore, MemoryBlobStore};
pub use run::{RunReport, RunStatus, StagedRun, process_image};
pub use pool::ProcessingPool;
pub use supervisor::{RestartPolicy, Supervisor};
pub use manager::{CommandOutput, RainfallCommand, RainfallManager};
