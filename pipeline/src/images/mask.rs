use std::path::{Path, PathBuf};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use scene_source::list_images;
use crate::error::{ProcessError, Result};
use crate::images::{CropFactor, reset_dir, write_pyramid};
use crate::translation::frame_name;

const SHARED_MASK_FILE: &str = "mask.png";

/// What [`generate_mask`] wrote into the masks directory.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskOutput {
    /// One mask for every frame.
    Shared(PathBuf),
    /// `frame_00001.png`, ... in image order.
    PerFrame(Vec<PathBuf>),
}

impl MaskOutput {
    pub fn is_per_frame(&self) -> bool {
        matches!(self, MaskOutput::PerFrame(_))
    }
}

/// Writes masks for the images in `image_dir` into the sibling `masks` directory,
/// with a nearest-neighbour pyramid matching the image pyramid.
///
/// A `percent_radius` below 1 keeps only a centred circle of that fraction of half the
/// image diagonal. `frame_mask_path` holds one mask per image, in image order; those
/// are intersected with the circle. Returns `None` when there is nothing to mask.
pub async fn generate_mask(
    image_dir: &Path,
    num_downscales: u32,
    crop: CropFactor,
    percent_radius: f64,
    frame_mask_path: Option<&Path>,
) -> Result<Option<MaskOutput>> {
    if percent_radius >= 1.0 && frame_mask_path.is_none() && crop.is_none() {
        return Ok(None);
    }

    let images = list_images(image_dir)?;
    let Some(first) = images.first() else {
        return Ok(None);
    };
    let (width, height) = image::image_dimensions(first)?;
    let base = circle_mask(width, height, crop, percent_radius);

    let masks_dir = image_dir.with_file_name("masks");
    reset_dir(&masks_dir).await?;

    match frame_mask_path {
        None => {
            let path = masks_dir.join(SHARED_MASK_FILE);
            save_with_pyramid(base, &masks_dir, SHARED_MASK_FILE, num_downscales).await?;
            log::info!("Saved shared mask to {}", path.display());
            Ok(Some(MaskOutput::Shared(path)))
        }
        Some(dir) => {
            let frame_masks = list_images(dir)?;
            if frame_masks.len() != images.len() {
                return Err(ProcessError::MissingInput(format!(
                    "{} has {} masks for {} images",
                    dir.display(),
                    frame_masks.len(),
                    images.len()
                )));
            }

            let mut written = Vec::with_capacity(frame_masks.len());
            for (i, source) in frame_masks.iter().enumerate() {
                let mut mask = image::open(source)?.into_luma8();
                if mask.dimensions() != (width, height) {
                    mask = image::imageops::resize(&mask, width, height, FilterType::Nearest);
                }
                for (pixel, keep) in mask.pixels_mut().zip(base.pixels()) {
                    pixel[0] = pixel[0].min(keep[0]);
                }

                let name = frame_name(i + 1, ".png");
                save_with_pyramid(mask, &masks_dir, &name, num_downscales).await?;
                written.push(masks_dir.join(name));
            }
            log::info!("Saved {} frame masks to {}", written.len(), masks_dir.display());
            Ok(Some(MaskOutput::PerFrame(written)))
        }
    }
}

/// White where pixels are kept: inside the crop and inside the circle.
fn circle_mask(width: u32, height: u32, crop: CropFactor, percent_radius: f64) -> GrayImage {
    let (x0, y0, w, h) = crop.region(width, height);
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = percent_radius * ((width as f64).powi(2) + (height as f64).powi(2)).sqrt() / 2.0;

    GrayImage::from_fn(width, height, |x, y| {
        let in_crop = x >= x0 && x < x0 + w && y >= y0 && y < y0 + h;
        let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
        let in_circle = percent_radius >= 1.0 || dx.hypot(dy) <= radius;
        Luma([if in_crop && in_circle { 255 } else { 0 }])
    })
}

async fn save_with_pyramid(mask: GrayImage, dir: &Path, name: &str, num_downscales: u32) -> Result<()> {
    let mask = DynamicImage::ImageLuma8(mask);
    mask.save(dir.join(name))?;
    write_pyramid(&mask, dir, name, num_downscales, FilterType::Nearest).await
}
