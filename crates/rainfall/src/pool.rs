use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};
use crate::{
    config::DeploymentConfig,
    error::{RainfallError, Result},
    lifecycle::ArtifactLifecycleManager,
    pipeline::Pipeline,
    run::{RunReport, StagedRun},
};

/// Bounded pool of extraction runs. Pixel scans run on blocking threads,
/// at most `workers` at a time; installs go through the shared lifecycle
/// manager, which serialises them.
#[derive(Clone)]
pub struct ProcessingPool {
    pipeline: Arc<Pipeline>,
    lifecycle: Arc<ArtifactLifecycleManager>,
    staging_root: PathBuf,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ProcessingPool {
    pub fn new(
        pipeline: Arc<Pipeline>,
        lifecycle: Arc<ArtifactLifecycleManager>,
        staging_root: impl Into<PathBuf>,
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            pipeline,
            lifecycle,
            staging_root: staging_root.into(),
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Result<Self> {
        let pipeline = Pipeline::from_config(config)?;
        let lifecycle = ArtifactLifecycleManager::from_config(&config.artifacts);
        Ok(Self::new(
            Arc::new(pipeline),
            Arc::new(lifecycle),
            &config.artifacts.staging_dir,
            config.workers,
        ))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn lifecycle(&self) -> &Arc<ArtifactLifecycleManager> {
        &self.lifecycle
    }

    pub async fn process(&self, image: PathBuf) -> Result<RunReport> {
        self.process_inner(image, None).await
    }

    /// Like `process`, but gives up if extraction has not finished within
    /// `limit`. An abandoned run never reaches `install`.
    pub async fn process_with_timeout(&self, image: PathBuf, limit: Duration) -> Result<RunReport> {
        self.process_inner(image, Some(limit)).await
    }

    /// Process every image concurrently (bounded by the pool), results in input order
    pub async fn process_all(&self, images: Vec<PathBuf>) -> Vec<Result<RunReport>> {
        let handles: Vec<_> = images
            .into_iter()
            .map(|image| {
                let pool = self.clone();
                tokio::spawn(async move { pool.process(image).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.map_err(worker_error).and_then(|r| r));
        }
        results
    }

    async fn process_inner(&self, image: PathBuf, limit: Option<Duration>) -> Result<RunReport> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(worker_error)?;

        // The permit lives on the blocking thread, so an abandoned scan
        // still counts against `workers` until it returns
        let pipeline = Arc::clone(&self.pipeline);
        let staging_root = self.staging_root.clone();
        let stage_image = image.clone();
        let mut staging = tokio::task::spawn_blocking(move || {
            let staged = StagedRun::stage(&pipeline, &staging_root, &stage_image);
            drop(permit);
            staged
        });

        let joined = match limit {
            Some(limit) => match tokio::time::timeout(limit, &mut staging).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(image = %image.display(), ?limit, "extraction abandoned");
                    tokio::spawn(async move {
                        if let Ok(Ok(staged)) = staging.await {
                            staged.discard();
                        }
                    });
                    return Err(RainfallError::Timeout(limit));
                }
            },
            None => staging.await,
        };
        let staged = joined.map_err(worker_error)??;

        let lifecycle = Arc::clone(&self.lifecycle);
        let report = tokio::task::spawn_blocking(move || staged.install(&lifecycle))
            .await
            .map_err(worker_error)??;

        info!(
            image = %report.image.display(),
            features = report.feature_count,
            "run complete"
        );
        Ok(report)
    }
}

fn worker_error(err: impl std::fmt::Display) -> RainfallError {
    RainfallError::Worker(err.to_string())
}
