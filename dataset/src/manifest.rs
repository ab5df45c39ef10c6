//! The `transforms.json` manifest consumed by training.
//!
//! Paths stored in the manifest are relative to the dataset directory and are
//! always written with forward slashes.

use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::colmap::image::APPLIED_TRANSFORM;
use crate::error::Result;

/// Projection model tag, as understood by the training side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionModel {
    Opencv,
    OpencvFisheye,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intrinsics {
    pub w: u32,
    pub h: u32,
    pub fl_x: f64,
    pub fl_y: f64,
    pub cx: f64,
    pub cy: f64,
    pub k1: f64,
    pub k2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k3: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k4: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p2: Option<f64>,
    pub camera_model: ProjectionModel,
}

impl Intrinsics {
    /// `focal` is `[fx, fy, cx, cy]`, `dist` is `[k1, k2, p1, p2]`.
    pub fn opencv(w: u32, h: u32, focal: [f64; 4], dist: [f64; 4]) -> Self {
        Self {
            w,
            h,
            fl_x: focal[0],
            fl_y: focal[1],
            cx: focal[2],
            cy: focal[3],
            k1: dist[0],
            k2: dist[1],
            k3: None,
            k4: None,
            p1: Some(dist[2]),
            p2: Some(dist[3]),
            camera_model: ProjectionModel::Opencv,
        }
    }

    /// `focal` is `[fx, fy, cx, cy]`, `dist` is `[k1, k2, k3, k4]`.
    pub fn fisheye(w: u32, h: u32, focal: [f64; 4], dist: [f64; 4]) -> Self {
        Self {
            w,
            h,
            fl_x: focal[0],
            fl_y: focal[1],
            cx: focal[2],
            cy: focal[3],
            k1: dist[0],
            k2: dist[1],
            k3: Some(dist[2]),
            k4: Some(dist[3]),
            p1: None,
            p2: None,
            camera_model: ProjectionModel::OpencvFisheye,
        }
    }
}

/// One training sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 1-based position in the manifest.
    pub index: usize,
    /// Identifier the reconstruction assigned to this image.
    pub colmap_im_id: i32,
    pub file_path: PathBuf,
    /// Camera to world, row-major, OpenGL convention.
    pub transform_matrix: [[f64; 4]; 4],
    pub intrinsics: Intrinsics,
    pub mask_path: Option<PathBuf>,
    pub depth_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub frames: Vec<Frame>,
    /// Set when one mask applies to every frame.
    pub shared_mask_path: Option<PathBuf>,
    pub ply_file_path: Option<PathBuf>,
}

impl Manifest {
    /// Intrinsics shared by all frames, if there is exactly one set.
    pub fn shared_intrinsics(&self) -> Option<&Intrinsics> {
        let first = &self.frames.first()?.intrinsics;
        self.frames
            .iter()
            .all(|frame| &frame.intrinsics == first)
            .then_some(first)
    }

    pub fn to_json(&self) -> Result<String> {
        let shared = self.shared_intrinsics();
        let frames = self
            .frames
            .iter()
            .map(|frame| FrameRecord {
                file_path: posix(&frame.file_path),
                transform_matrix: frame.transform_matrix,
                colmap_im_id: frame.colmap_im_id,
                intrinsics: shared.is_none().then_some(&frame.intrinsics),
                mask_path: frame.mask_path.as_deref().map(posix),
                depth_file_path: frame.depth_file_path.as_deref().map(posix),
            })
            .collect();

        let record = ManifestRecord {
            intrinsics: shared,
            mask_path: self.shared_mask_path.as_deref().map(posix),
            frames,
            applied_transform: APPLIED_TRANSFORM,
            ply_file_path: self.ply_file_path.as_deref().map(posix),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Writes the manifest next to a temporary file and renames it into place, so a
    /// reader never sees a partial manifest.
    pub async fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        log::info!("Wrote manifest with {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    file_path: String,
    transform_matrix: [[f64; 4]; 4],
    colmap_im_id: i32,
    #[serde(flatten)]
    intrinsics: Option<&'a Intrinsics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth_file_path: Option<String>,
}

#[derive(Serialize)]
struct ManifestRecord<'a> {
    #[serde(flatten)]
    intrinsics: Option<&'a Intrinsics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask_path: Option<String>,
    frames: Vec<FrameRecord<'a>>,
    applied_transform: [[f64; 4]; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    ply_file_path: Option<String>,
}

fn posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
