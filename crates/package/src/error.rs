use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackageError>;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Sidecar {} has no readable guid", .0.display())]
    MalformedSidecar(PathBuf),

    #[error("{} is outside the project root", .0.display())]
    OutsideProject(PathBuf),

    #[error("Package writer is unusable after an earlier failure")]
    WriterPoisoned,
}
