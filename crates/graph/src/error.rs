use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Missing sidecar for {}", .0.display())]
    MissingSidecar(PathBuf),

    #[error("Reference error: {0}")]
    Reference(#[from] assetpack_reference::ReferenceError),

    #[error("Script reference oracle failed: {0}")]
    Oracle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
