use std::path::PathBuf;
use thiserror::Error;
use crate::colmap::camera::CameraModel;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File IO error: {0}")]
    File(#[from] std::io::Error),

    #[error("No COLMAP model found in {0}")]
    ModelNotFound(PathBuf),

    #[error("Error decoding camera parameters: {0}")]
    InvalidCamera(&'static str),

    #[error("Camera model {0:?} is not supported, only pinhole, radial, OpenCV and fisheye models are")]
    UnsupportedCamera(CameraModel),

    #[error("Image {image} references unknown camera {camera}")]
    UnknownCamera { image: i32, camera: i32 },

    #[error("Image error: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scene source error")]
    SceneSource(#[from] scene_source::SceneSourceError),
}
