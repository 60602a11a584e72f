use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing reference data: stage '{stage}' found no rows in '{table}'")]
    MissingReferenceData {
        stage: &'static str,
        table: &'static str,
    },

    #[error("Load of '{table}' failed for rows [{start}, {end}): {source}")]
    Load {
        table: &'static str,
        start: usize,
        end: usize,
        #[source]
        source: Box<SeedError>,
    },

    #[error("Store unreachable: {0}")]
    Connectivity(#[from] r2d2::Error),

    #[error("Invalid pipeline transition: '{stage}' requires state {expected:?}, found {actual:?}")]
    InvalidTransition {
        stage: &'static str,
        expected: crate::pipeline::PipelineState,
        actual: crate::pipeline::PipelineState,
    },

    #[error("Worker for stage '{stage}' batch {batch} panicked: {message}")]
    Worker {
        stage: &'static str,
        batch: usize,
        message: String,
    },

    #[error("Malformed copy buffer at line {line}: {reason}")]
    CopyFormat { line: usize, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SeedError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type SeedResult<T> = Result<T, SeedError>;
