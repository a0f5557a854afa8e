use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::{
    error::Result,
    io::run_directory,
    lifecycle::ArtifactLifecycleManager,
    pipeline::Pipeline,
    types::{Extraction, PendingArtifact},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    FeaturesFound,
    NoFeaturesFound,
}

/// What one upload produced and where its artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub image: PathBuf,
    pub artifact: PathBuf,
    pub feature_count: usize,
    pub status: RunStatus,
}

/// An extraction whose artifact sits in its own run directory, not yet installed.
/// Dropping it mutates nothing shared.
#[derive(Debug, Clone)]
pub struct StagedRun {
    pub image: PathBuf,
    pub run_dir: PathBuf,
    pub pending: PendingArtifact,
    pub status: RunStatus,
}

impl StagedRun {
    pub fn stage(pipeline: &Pipeline, staging_root: &Path, image: &Path) -> Result<Self> {
        let run_dir = run_directory(staging_root)?;
        match pipeline.run(image, &run_dir) {
            Ok((extraction, pending)) => Ok(Self {
                image: image.to_path_buf(),
                run_dir,
                pending,
                status: match extraction {
                    Extraction::Features(_) => RunStatus::FeaturesFound,
                    Extraction::NoFeatures(_) => RunStatus::NoFeaturesFound,
                },
            }),
            Err(e) => {
                let _ = fs::remove_dir_all(&run_dir);
                Err(e)
            }
        }
    }

    /// Delete the run directory and the artifact staged in it
    pub fn discard(self) {
        match fs::remove_dir_all(&self.run_dir) {
            Ok(()) => debug!(run_dir = %self.run_dir.display(), "staged run discarded"),
            Err(e) => warn!(run_dir = %self.run_dir.display(), error = %e, "failed to discard staged run"),
        }
    }

    /// Install the staged artifact. On failure the artifact stays in the
    /// run directory and the call can be retried.
    pub fn install(&self, lifecycle: &ArtifactLifecycleManager) -> Result<RunReport> {
        let artifact = lifecycle.install(&self.pending.path)?;
        let _ = fs::remove_dir(&self.run_dir);
        Ok(RunReport {
            image: self.image.clone(),
            artifact,
            feature_count: self.pending.feature_count,
            status: self.status,
        })
    }
}

/// Extract, stage and install one image synchronously
pub fn process_image(
    pipeline: &Pipeline,
    lifecycle: &ArtifactLifecycleManager,
    staging_root: &Path,
    image: &Path,
) -> Result<RunReport> {
    let staged = StagedRun::stage(pipeline, staging_root, image)?;
    staged.install(lifecycle).inspect_err(|e| {
        warn!(
            run_dir = %staged.run_dir.display(),
            error = %e,
            "install failed, staged artifact kept for retry"
        );
    })
}
