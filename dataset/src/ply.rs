//! Binary PLY export of the sparse point cloud.

use std::path::Path;
use crate::colmap::image::APPLIED_TRANSFORM;
use crate::colmap::point::Point3D;
use crate::error::Result;

/// Writes `points` (sorted by id) in the manifest's world frame. Returns the number
/// of points written.
pub async fn write_sparse_ply<'a>(
    points: impl IntoIterator<Item = (&'a i64, &'a Point3D)>,
    path: &Path,
) -> Result<usize> {
    let mut points: Vec<_> = points.into_iter().collect();
    points.sort_unstable_by_key(|(id, _)| **id);

    let header = format!(
        "ply\n\
         format binary_little_endian 1.0\n\
         element vertex {}\n\
         property float x\n\
         property float y\n\
         property float z\n\
         property uchar red\n\
         property uchar green\n\
         property uchar blue\n\
         end_header\n",
        points.len()
    );

    let mut buf = header.into_bytes();
    for (_, point) in &points {
        let xyz = point.xyz.to_array();
        for row in &APPLIED_TRANSFORM {
            let v = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2] + row[3];
            buf.extend((v as f32).to_le_bytes());
        }
        buf.extend(point.rgb);
    }

    tokio::fs::write(path, buf).await?;
    Ok(points.len())
}
