use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneSourceError>;

#[derive(Debug, Error)]
pub enum SceneSourceError {
    #[error("Input path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("File IO error")]
    File(#[from] std::io::Error),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Video input is not supported, extract frames first: {0}")]
    UnsupportedVideo(PathBuf),

    #[error("Unknown source: {0}")]
    UnknownSource(PathBuf),

    #[error("Duplicate path found: {0}. Paths must be unique (case non-sensitive)")]
    DuplicatePath(PathBuf),
}
