use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RainfallError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Archival error: {0}")]
    Archival(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Coarse error taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidImage,
    Persistence,
    Archival,
    NotFound,
    Configuration,
    Internal,
}

impl RainfallError {
    pub(crate) fn persistence(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{}: {}", path.display(), err))
    }

    pub(crate) fn archival(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Archival(format!("{}: {}", key, err))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidImage(_) | Self::ImageLoad(_) => ErrorCategory::InvalidImage,
            Self::Persistence(_)
            | Self::InvalidArtifact(_)
            | Self::Serialization(_)
            | Self::GeoJson(_)
            | Self::Io(_) => {
                ErrorCategory::Persistence
            }
            Self::Archival(_) => ErrorCategory::Archival,
            Self::BlobNotFound(_) => ErrorCategory::NotFound,
            Self::Config(_) | Self::TomlParse(_) => ErrorCategory::Configuration,
            Self::Worker(_) | Self::Timeout(_) => ErrorCategory::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RainfallError>;
