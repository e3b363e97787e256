//! Cache error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;

/// Errors from attachment cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The durable index rejected an operation.
    #[error("Cache index error: {0}")]
    Index(#[from] DatabaseError),

    /// Creating the cache directory failed.
    #[error("Failed to create cache directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a content file failed. The partial file is removed and no
    /// index row exists for it.
    #[error("Failed to write cache file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The naming scheme ran out of candidate filenames.
    #[error("No free cache filename for '{filename}'")]
    FilenameExhausted { filename: String },

    /// Measuring disk capacity for the eviction check failed.
    #[error("Failed to measure disk capacity at '{path}': {source}")]
    DiskCapacity {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
