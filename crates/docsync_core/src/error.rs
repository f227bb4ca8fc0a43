use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Every failure is fatal to the run; pages published before the failure stay published.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing or invalid configuration for {key}: {detail}")]
    Configuration { key: String, detail: String },
    #[error("failed to load config file {}: {detail}", path.display())]
    ConfigFile { path: PathBuf, detail: String },
    #[error("failed to access {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to publish page {title:?}: {detail}")]
    Publish { title: String, detail: String },
}

impl SyncError {
    pub fn configuration(key: &str, detail: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.to_string(),
            detail: detail.into(),
        }
    }

    pub fn filesystem(path: &Path, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn publish(title: &str, detail: impl Into<String>) -> Self {
        Self::Publish {
            title: title.to_string(),
            detail: detail.into(),
        }
    }

    pub fn from_walk(root: &Path, error: walkdir::Error) -> Self {
        let path = error
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        let source = error
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Self::Filesystem { path, source }
    }
}
