use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::filesystem::{is_image, list_images};
use crate::SceneSourceError;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Where the raw captures are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Source {
    Dir { path: PathBuf },
    Image { path: PathBuf },
}

impl Source {
    pub fn detect(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(Source::Dir { path: path.to_path_buf() });
        }
        if !path.exists() {
            return Err(SceneSourceError::NotFound(path.to_path_buf()));
        }
        if is_image(path) {
            return Ok(Source::Image { path: path.to_path_buf() });
        }

        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if is_video {
            Err(SceneSourceError::UnsupportedVideo(path.to_path_buf()))
        } else {
            Err(SceneSourceError::UnknownSource(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Source::Dir { path } | Source::Image { path } => path,
        }
    }

    /// Images of this source in processing order.
    pub fn images(&self) -> Result<Vec<PathBuf>> {
        match self {
            Source::Dir { path } => list_images(path),
            Source::Image { path } => Ok(vec![path.clone()]),
        }
    }
}
