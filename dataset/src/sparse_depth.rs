//! Sparse depth maps rendered from the reconstruction's own 3D points.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use image::{ImageBuffer, Luma};
use crate::colmap::ColmapModel;
use crate::error::Result;

/// Depth maps are stored as 16-bit PNGs in this many units per scene unit.
pub const DEPTH_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseDepthParams {
    pub min_depth: f64,
    pub max_depth: f64,
    /// Points with a larger mean reprojection error are dropped.
    pub max_reproj_error: f64,
    /// Points seen by fewer images are dropped.
    pub min_track_len: usize,
}

impl Default for SparseDepthParams {
    fn default() -> Self {
        Self {
            min_depth: 0.001,
            max_depth: 10000.0,
            max_reproj_error: 2.5,
            min_track_len: 2,
        }
    }
}

/// Writes one depth map per registered image into `depth_dir`, named after the image
/// stem. Returns the written paths keyed by reconstruction image id.
pub async fn export_sparse_depth(
    model: &ColmapModel,
    depth_dir: &Path,
    params: SparseDepthParams,
) -> Result<BTreeMap<i32, PathBuf>> {
    tokio::fs::create_dir_all(depth_dir).await?;

    let mut written = BTreeMap::new();
    for (id, image) in &model.images {
        let Some(camera) = model.camera(image) else {
            continue;
        };
        let (width, height) = (camera.width as u32, camera.height as u32);
        let mut depth = ImageBuffer::<Luma<u16>, Vec<u16>>::new(width, height);

        for (xy, point_id) in image.xys.iter().zip(&image.point3d_ids) {
            let Some(point) = model.points.get(point_id) else {
                continue;
            };
            if point.error > params.max_reproj_error || point.track_len() < params.min_track_len {
                continue;
            }

            let z = image.depth_of(point.xyz);
            if z < params.min_depth || z > params.max_depth {
                continue;
            }
            if xy.x < 0.0 || xy.y < 0.0 || xy.x >= width as f64 || xy.y >= height as f64 {
                continue;
            }

            let value = (z * DEPTH_SCALE).round().min(u16::MAX as f64) as u16;
            let pixel = depth.get_pixel_mut(xy.x as u32, xy.y as u32);
            // Keep the closest point when several land on one pixel.
            if pixel[0] == 0 || value < pixel[0] {
                pixel[0] = value;
            }
        }

        let stem = Path::new(&image.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{id}"));
        let path = depth_dir.join(format!("{stem}.png"));
        depth.save(&path)?;
        written.insert(*id, path);
    }

    log::info!("Wrote {} sparse depth maps to {}", written.len(), depth_dir.display());
    Ok(written)
}
