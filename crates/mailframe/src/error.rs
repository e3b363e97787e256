use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] crate::mailbox::MailboxError),

    #[error("Transform error: {0}")]
    Transform(#[from] crate::transform::TransformError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Missing required key '{key}' in config file '{path}'")]
    MissingKey { key: String, path: PathBuf },

    #[error("Invalid value for '{key}' in config file '{path}': {reason}")]
    InvalidValue {
        key: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Could not determine the home directory for the default config path")]
    NoHomeDirectory,
}

pub type Result<T> = std::result::Result<T, FrameError>;
