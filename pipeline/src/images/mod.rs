//! Image collaborators of the preprocessing stage: copying with a crop and a
//! downscale pyramid, mask generation and equirectangular re-projection.

mod copy;
mod equirect;
mod mask;

use std::path::{Path, PathBuf};
use image::DynamicImage;
use image::imageops::FilterType;
use crate::error::{ProcessError, Result};

pub use copy::{CopiedImage, copy_and_downscale};
pub use equirect::{compute_resolution, generate_projections, view_directions};
pub use mask::{MaskOutput, generate_mask};

/// Fractions of an image cropped away on each side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CropFactor {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl From<[f64; 4]> for CropFactor {
    fn from([top, bottom, left, right]: [f64; 4]) -> Self {
        Self { top, bottom, left, right }
    }
}

impl CropFactor {
    pub const NONE: CropFactor = CropFactor { top: 0.0, bottom: 0.0, left: 0.0, right: 0.0 };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn validate(&self) -> Result<()> {
        let sides = [self.top, self.bottom, self.left, self.right];
        if sides.iter().any(|v| !(0.0..1.0).contains(v))
            || self.top + self.bottom >= 1.0
            || self.left + self.right >= 1.0
        {
            return Err(ProcessError::ConfigurationConflict(format!(
                "crop factor must leave part of the image, got {sides:?}"
            )));
        }
        Ok(())
    }

    /// The kept region of a `width` x `height` image as `(x, y, w, h)`, never empty.
    pub fn region(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let span = |len: u32, start: f64, end: f64| {
            let lo = ((len as f64 * start).round() as u32).min(len.saturating_sub(1));
            let hi = len - ((len as f64 * end).round() as u32).min(len);
            (lo, hi.max(lo + 1) - lo)
        };
        let (x, w) = span(width, self.left, self.right);
        let (y, h) = span(height, self.top, self.bottom);
        (x, y, w, h)
    }

    pub fn apply(&self, img: DynamicImage) -> DynamicImage {
        if self.is_none() {
            return img;
        }
        let (x, y, w, h) = self.region(img.width(), img.height());
        img.crop_imm(x, y, w, h)
    }
}

/// `images` with factor 2 becomes `images_2`.
pub fn downscale_dir(dir: &Path, factor: u32) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.with_file_name(format!("{name}_{factor}"))
}

pub fn downscale_factors(num_downscales: u32) -> impl Iterator<Item = u32> {
    (1..=num_downscales).map(|level| 1 << level)
}

/// Writes the halved copies of `img` as `<dir>_<factor>/<file_name>`.
pub(crate) async fn write_pyramid(
    img: &DynamicImage,
    dir: &Path,
    file_name: &str,
    num_downscales: u32,
    filter: FilterType,
) -> Result<()> {
    for factor in downscale_factors(num_downscales) {
        let level_dir = downscale_dir(dir, factor);
        tokio::fs::create_dir_all(&level_dir).await?;
        let (w, h) = ((img.width() / factor).max(1), (img.height() / factor).max(1));
        img.resize_exact(w, h, filter).save(level_dir.join(file_name))?;
    }
    Ok(())
}

/// Empties `dir` and any `<dir>_<n>` pyramid levels next to it.
pub(crate) async fn reset_dir(dir: &Path) -> Result<()> {
    if let (Some(parent), Some(name)) = (dir.parent(), dir.file_name()) {
        let prefix = format!("{}_", name.to_string_lossy());
        if let Ok(mut entries) = tokio::fs::read_dir(parent).await {
            while let Some(entry) = entries.next_entry().await? {
                let entry_name = entry.file_name().to_string_lossy().into_owned();
                let is_level = entry_name
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
                if is_level && entry.file_type().await?.is_dir() {
                    tokio::fs::remove_dir_all(entry.path()).await?;
                }
            }
        }
    }
    if tokio::fs::try_exists(dir).await? {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
