use std::path::{Path, PathBuf};
use image::imageops::FilterType;
use crate::error::Result;
use crate::images::{CropFactor, reset_dir, write_pyramid};
use crate::translation::{frame_name, suffix_of};

/// One source image and the name it was copied under.
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedImage {
    pub original: PathBuf,
    pub copied: PathBuf,
}

impl CopiedImage {
    pub fn original_name(&self) -> String {
        file_name(&self.original)
    }

    pub fn copied_name(&self) -> String {
        file_name(&self.copied)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copies `images` in order into `dest_dir` as `frame_00001.<ext>`, ... and writes
/// `num_downscales` halved levels next to it.
///
/// Depth images should be copied with `nearest_neighbor` so no interpolated depth
/// values appear in the pyramid.
pub async fn copy_and_downscale(
    images: &[PathBuf],
    dest_dir: &Path,
    crop: CropFactor,
    num_downscales: u32,
    nearest_neighbor: bool,
) -> Result<Vec<CopiedImage>> {
    if images.is_empty() {
        return Ok(vec![]);
    }
    reset_dir(dest_dir).await?;

    let filter = if nearest_neighbor {
        FilterType::Nearest
    } else {
        FilterType::Triangle
    };

    let mut copied = Vec::with_capacity(images.len());
    for (i, original) in images.iter().enumerate() {
        let name = frame_name(i + 1, &suffix_of(original));
        let dest = dest_dir.join(&name);

        if crop.is_none() {
            // Keep the original bytes, re-encoding only the pyramid.
            tokio::fs::copy(original, &dest).await?;
            if num_downscales > 0 {
                let img = image::open(original)?;
                write_pyramid(&img, dest_dir, &name, num_downscales, filter).await?;
            }
        } else {
            let img = crop.apply(image::open(original)?);
            img.save(&dest)?;
            write_pyramid(&img, dest_dir, &name, num_downscales, filter).await?;
        }

        log::debug!("Copied {} to {}", original.display(), dest.display());
        copied.push(CopiedImage {
            original: original.clone(),
            copied: dest,
        });
    }

    log::info!("Copied {} images to {}", copied.len(), dest_dir.display());
    Ok(copied)
}
