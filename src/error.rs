// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a whole run. Anything scoped to a single tag is
/// reported through the stage outcome enums instead.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("failed to clone {url} into {path}: {source}")]
    Clone {
        url: String,
        path: PathBuf,
        source: git2::Error,
    },

    #[error("failed to open repository at {path}: {source}")]
    OpenRepository { path: PathBuf, source: git2::Error },

    #[error("repository at {0} is bare, a working tree is required")]
    BareRepository(PathBuf),

    #[error("no repository at {0} and no repo_url configured to clone from")]
    MissingRepository(PathBuf),

    #[error("failed to enumerate tags: {0}")]
    TagEnumeration(#[source] git2::Error),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write chart {path}: {source}")]
    Chart {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, MinerError>;

impl MinerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MinerError::Io {
            source,
            path: path.into(),
        }
    }
}
