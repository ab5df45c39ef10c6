use std::path::PathBuf;
use thiserror::Error;
use dataset::DatasetError;
use scene_source::SceneSourceError;
use crate::reconstruct::ReconstructionError;

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Every variant aborts the run; nothing is retried and no partial manifest is written.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Conflicting configuration: {0}")]
    ConfigurationConflict(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Could not find existing COLMAP results ({})", .0.display())]
    ReconstructionOutputMissing(PathBuf),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Image '{0}' from the reconstruction has no copied counterpart")]
    UnknownImage(String),

    #[error("Image file for frame {index} not found: {}", .path.display())]
    MissingImage { index: usize, path: PathBuf },

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to load dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),
}

impl From<SceneSourceError> for ProcessError {
    fn from(err: SceneSourceError) -> Self {
        match err {
            SceneSourceError::NotFound(path) => {
                ProcessError::MissingInput(format!("{} does not exist", path.display()))
            }
            SceneSourceError::UnsupportedVideo(_) | SceneSourceError::UnknownSource(_) => {
                ProcessError::UnsupportedInput(err.to_string())
            }
            err => ProcessError::Dataset(DatasetError::SceneSource(err)),
        }
    }
}
