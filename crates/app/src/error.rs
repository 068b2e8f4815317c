//! Error types for the command-line front end.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Sim(#[from] simcore::SimError),

    #[error("Logger setup failed: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type AppResult<T> = Result<T, AppError>;
