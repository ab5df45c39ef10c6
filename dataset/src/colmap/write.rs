use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use crate::colmap::camera::Camera;
use crate::colmap::image::Image;
use crate::colmap::point::Point3D;

// Binary layouts mirror what `parse.rs` reads back.

pub(crate) fn cameras_bin(cameras: &HashMap<i32, Camera>) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend((cameras.len() as u64).to_le_bytes());

    let mut ids: Vec<_> = cameras.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let cam = &cameras[&id];
        buf.extend(cam.id.to_le_bytes());
        buf.extend(cam.model.id().to_le_bytes());
        buf.extend(cam.width.to_le_bytes());
        buf.extend(cam.height.to_le_bytes());
        for param in &cam.params {
            buf.extend(param.to_le_bytes());
        }
    }
    buf
}

pub(crate) fn images_bin(images: &BTreeMap<i32, Image>) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend((images.len() as u64).to_le_bytes());

    for (id, img) in images {
        buf.extend(id.to_le_bytes());
        for v in [img.quat.w, img.quat.x, img.quat.y, img.quat.z] {
            buf.extend(v.to_le_bytes());
        }
        for v in img.tvec.to_array() {
            buf.extend(v.to_le_bytes());
        }
        buf.extend(img.camera_id.to_le_bytes());
        buf.extend(img.name.as_bytes());
        buf.push(0);
        buf.extend((img.xys.len() as u64).to_le_bytes());
        for (xy, point_id) in img.xys.iter().zip(&img.point3d_ids) {
            buf.extend(xy.x.to_le_bytes());
            buf.extend(xy.y.to_le_bytes());
            buf.extend(point_id.to_le_bytes());
        }
    }
    buf
}

pub(crate) fn points_bin(points: &HashMap<i64, Point3D>) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend((points.len() as u64).to_le_bytes());

    let mut ids: Vec<_> = points.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let point = &points[&id];
        buf.extend(id.to_le_bytes());
        for v in point.xyz.to_array() {
            buf.extend(v.to_le_bytes());
        }
        buf.extend(point.rgb);
        buf.extend(point.error.to_le_bytes());
        buf.extend((point.track_len() as u64).to_le_bytes());
        for (image_id, idx) in point.image_ids.iter().zip(&point.point2d_idxs) {
            buf.extend(image_id.to_le_bytes());
            buf.extend(idx.to_le_bytes());
        }
    }
    buf
}

pub(crate) async fn write_file(path: &Path, data: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, data).await
}
