use std::path::PathBuf;

use thiserror::Error;

/// Configuration faults. These abort the run instead of becoming a failed
/// outcome.
#[derive(Error, Debug)]
pub enum ConformError {
    #[error("failed to read rule manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule manifest is not valid JSON: {0}")]
    ManifestParse(#[from] serde_json::Error),

    #[error("invalid rule `{name}`: {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("unknown category for validator: {0}")]
    UnknownCatalog(String),

    #[error("the path {} is not a valid directory", .0.display())]
    InvalidRepoPath(PathBuf),
}
