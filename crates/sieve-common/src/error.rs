use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieveError {
    /// A required directory or file is absent; aborts the stage.
    #[error("Missing input: {0}")]
    MissingInput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Score table error: {0}")]
    Table(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SieveError {
    pub fn missing<P: Into<PathBuf>>(path: P) -> Self {
        SieveError::MissingInput(path.into())
    }
}

pub type Result<T> = std::result::Result<T, SieveError>;
