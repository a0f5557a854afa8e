use rainfall::{DeploymentConfig, RainfallError, RunReport, RunStatus};

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions picked up when a directory is passed to `batch`
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Rainfall(#[from] RainfallError),
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Path does not exist: {0}")]
    MissingPath(PathBuf),
    #[error("No images found in the given paths")]
    NoImages,
    #[error("Refusing to overwrite existing file {0}, pass --force to replace it")]
    FileExists(PathBuf),
}

/// Config from `path`, or the built-in deployment defaults
pub fn load_config(path: Option<&Path>) -> Result<DeploymentConfig, CliError> {
    match path {
        Some(path) => Ok(DeploymentConfig::from_file(path)?),
        None => Ok(DeploymentConfig::default()),
    }
}

/// Write the default config as TOML
pub fn write_config_template(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::FileExists(path.to_path_buf()));
    }
    let content = DeploymentConfig::default().to_toml_string()?;
    fs::write(path, content)?;
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand directories (one level) into their image files, keep files as given.
/// Directory contents are sorted by name.
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<PathBuf>, CliError> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            found.sort();
            images.extend(found);
        } else if path.is_file() {
            images.push(path.clone());
        } else {
            return Err(CliError::MissingPath(path.clone()));
        }
    }
    if images.is_empty() {
        return Err(CliError::NoImages);
    }
    Ok(images)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedRun {
    pub image: PathBuf,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatchSummary {
    pub with_features: usize,
    pub without_features: usize,
    pub total_features: usize,
    pub installed: Vec<PathBuf>,
    pub failed: Vec<FailedRun>,
}

impl BatchSummary {
    pub fn from_results(images: &[PathBuf], results: Vec<rainfall::Result<RunReport>>) -> Self {
        let mut summary = Self::default();
        for (image, result) in images.iter().zip(results) {
            match result {
                Ok(report) => {
                    match report.status {
                        RunStatus::FeaturesFound => summary.with_features += 1,
                        RunStatus::NoFeaturesFound => summary.without_features += 1,
                    }
                    summary.total_features += report.feature_count;
                    summary.installed.push(report.artifact);
                }
                Err(e) => summary.failed.push(FailedRun {
                    image: image.clone(),
                    error: e.to_string(),
                }),
            }
        }
        summary
    }

    pub fn succeeded(&self) -> usize {
        self.with_features + self.without_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_images_expands_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.png", "a.PNG", "notes.txt", "c.tif"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        let single = dir.path().join("single.jpg");
        fs::write(&single, b"x").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png", "c.tif", "single.jpg"]);

        let explicit = collect_images(&[single.clone()]).unwrap();
        assert_eq!(explicit, vec![single]);
    }

    #[test]
    fn test_collect_images_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(collect_images(&[dir.path().to_path_buf()]), Err(CliError::NoImages)));
        assert!(matches!(
            collect_images(&[dir.path().join("missing.png")]),
            Err(CliError::MissingPath(_))
        ));
    }

    #[test]
    fn test_config_template_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rainfall.toml");
        write_config_template(&path, false).unwrap();
        assert!(matches!(write_config_template(&path, false), Err(CliError::FileExists(_))));
        write_config_template(&path, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, DeploymentConfig::default());
        assert_eq!(load_config(None).unwrap(), DeploymentConfig::default());
    }

    #[test]
    fn test_batch_summary_counts() {
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png"), PathBuf::from("c.png")];
        let results = vec![
            Ok(RunReport {
                image: images[0].clone(),
                artifact: PathBuf::from("current/a_areas.geojson"),
                feature_count: 5,
                status: RunStatus::FeaturesFound,
            }),
            Err(RainfallError::InvalidImage("b.png is not a non-empty file".into())),
            Ok(RunReport {
                image: images[2].clone(),
                artifact: PathBuf::from("current/c_areas.geojson"),
                feature_count: 0,
                status: RunStatus::NoFeaturesFound,
            }),
        ];

        let summary = BatchSummary::from_results(&images, results);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.total_features, 5);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].image, PathBuf::from("b.png"));
    }
}
