use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FatError {
    #[error("Allocation failed: {0}")]
    AllocationFailure(String),

    #[error("Cannot open image {}: {source}", path.display())]
    StorageOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Not a directory: {0}")]
    NotDirectory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not a file: {0}")]
    NotFile(String),

    #[error("Stale handle: {0}")]
    StaleHandle(String),
}

pub type FatResult<T> = Result<T, FatError>;

impl From<FatError> for std::io::Error {
    fn from(err: FatError) -> Self {
        match err {
            FatError::StorageIo(e) => e,
            FatError::StorageOpen { source, .. } => source,
            FatError::NotFound(_) => std::io::Error::new(std::io::ErrorKind::NotFound, err),
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
