//! Perspective views cut out of equirectangular panoramas.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use glam::{DQuat, DVec3};
use image::{Rgb, RgbImage};
use crate::error::{ProcessError, Result};
use crate::images::{CropFactor, reset_dir};
use crate::translation::suffix_of;

/// Field of view and `(yaw, pitch)` in degrees of every view cut from one panorama.
pub fn view_directions(images_per_equirect: u32) -> Result<(f64, Vec<(f64, f64)>)> {
    match images_per_equirect {
        8 => {
            let mut views: Vec<_> = [0.0, 90.0, 180.0, 270.0].map(|yaw| (yaw, 0.0)).to_vec();
            views.extend([(0.0, 60.0), (180.0, 60.0), (90.0, -60.0), (270.0, -60.0)]);
            Ok((120.0, views))
        }
        14 => {
            let mut views: Vec<_> = (0..6).map(|i| (i as f64 * 60.0, 0.0)).collect();
            views.extend([0.0, 90.0, 180.0, 270.0].map(|yaw| (yaw, 50.0)));
            views.extend([45.0, 135.0, 225.0, 315.0].map(|yaw| (yaw, -50.0)));
            Ok((90.0, views))
        }
        n => Err(ProcessError::ConfigurationConflict(format!(
            "images per equirect must be 8 or 14, got {n}"
        ))),
    }
}

/// Square view size whose centre matches the angular resolution of the first panorama.
pub fn compute_resolution(images: &[PathBuf], images_per_equirect: u32) -> Result<(u32, u32)> {
    let first = images
        .first()
        .ok_or_else(|| ProcessError::MissingInput("no equirectangular images found".to_owned()))?;
    let (width, _) = image::image_dimensions(first)?;
    let (fov, _) = view_directions(images_per_equirect)?;

    let side = ((fov.to_radians() / 2.0).tan() * width as f64 / PI).round().max(1.0) as u32;
    log::info!("Generating {side}x{side} projections from {width} px wide panoramas");
    Ok((side, side))
}

/// Writes `images_per_equirect` views of every panorama into `dest_dir` as
/// `<stem>_<view><suffix>` and returns them in panorama then view order.
///
/// The crop's top and bottom bands are blanked before sampling.
pub async fn generate_projections(
    images: &[PathBuf],
    resolution: (u32, u32),
    images_per_equirect: u32,
    crop: CropFactor,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let (fov, views) = view_directions(images_per_equirect)?;
    reset_dir(dest_dir).await?;

    let mut written = Vec::with_capacity(images.len() * views.len());
    for pano_path in images {
        let pano = image::open(pano_path)?.into_rgb8();
        let stem = pano_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = suffix_of(pano_path);

        for (view, &(yaw, pitch)) in views.iter().enumerate() {
            let out = project(&pano, resolution, fov, yaw, pitch, crop);
            let path = dest_dir.join(format!("{stem}_{view:02}{suffix}"));
            out.save(&path)?;
            written.push(path);
        }
        log::debug!("Projected {} into {} views", pano_path.display(), views.len());
    }

    log::info!("Generated {} planar projections in {}", written.len(), dest_dir.display());
    Ok(written)
}

fn project(pano: &RgbImage, (width, height): (u32, u32), fov: f64, yaw: f64, pitch: f64, crop: CropFactor) -> RgbImage {
    let focal = (width as f64 / 2.0) / (fov.to_radians() / 2.0).tan();
    // y up, looking down +z; positive pitch looks up.
    let rotation = DQuat::from_rotation_y(yaw.to_radians()) * DQuat::from_rotation_x(-pitch.to_radians());

    let (pw, ph) = (pano.width() as f64, pano.height() as f64);
    let (top, bottom) = (crop.top * ph, (1.0 - crop.bottom) * ph);

    RgbImage::from_fn(width, height, |x, y| {
        let ray = DVec3::new(
            (x as f64 + 0.5 - width as f64 / 2.0) / focal,
            -(y as f64 + 0.5 - height as f64 / 2.0) / focal,
            1.0,
        );
        let dir = (rotation * ray).normalize();
        let lon = dir.x.atan2(dir.z);
        let lat = dir.y.clamp(-1.0, 1.0).asin();

        let u = (lon / (2.0 * PI) + 0.5) * pw;
        let v = (0.5 - lat / PI) * ph;
        if v < top || v > bottom {
            return Rgb([0, 0, 0]);
        }
        sample(pano, u, v)
    })
}

/// Bilinear lookup at continuous pixel coordinates, wrapping around in longitude.
fn sample(pano: &RgbImage, u: f64, v: f64) -> Rgb<u8> {
    let (w, h) = (pano.width() as i64, pano.height() as i64);
    let x = u - 0.5;
    let y = (v - 0.5).clamp(0.0, (h - 1) as f64);
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);

    let xa = (x0 as i64).rem_euclid(w) as u32;
    let xb = (x0 as i64 + 1).rem_euclid(w) as u32;
    let ya = y0 as u32;
    let yb = (y0 as i64 + 1).min(h - 1) as u32;

    let (p00, p10) = (pano.get_pixel(xa, ya), pano.get_pixel(xb, ya));
    let (p01, p11) = (pano.get_pixel(xa, yb), pano.get_pixel(xb, yb));
    Rgb(std::array::from_fn(|c| {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    }))
}
