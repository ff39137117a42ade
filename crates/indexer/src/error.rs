use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Reference error: {0}")]
    ReferenceError(#[from] assetpack_reference::ReferenceError),

    #[error("Missing sidecar for {}", .0.display())]
    MissingSidecar(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid project path: {0}")]
    InvalidPath(String),
}
