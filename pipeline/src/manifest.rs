use std::path::{Path, PathBuf};
use dataset::ply::write_sparse_ply;
use dataset::{DatasetError, Frame, Manifest};
use crate::depth::DepthResolved;
use crate::error::{ProcessError, Result};
use crate::images::MaskOutput;
use crate::layout::{OutputLayout, SPARSE_PLY_FILE};
use crate::summary::Summary;

/// Below this share of posed images the run is reported as poor.
const LOW_COVERAGE: f64 = 0.4;

/// How frames point at their mask.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskReference {
    /// `masks/mask.png` for every frame.
    Shared(PathBuf),
    /// `masks/<image stem>.png` for each frame.
    PerFrame(PathBuf),
}

impl MaskReference {
    /// Frames get a mask only when the masks directory exists.
    pub fn resolve(layout: &OutputLayout, per_frame: bool) -> Option<Self> {
        if !layout.masks_dir().is_dir() {
            return None;
        }
        let masks = layout.relative(&layout.masks_dir());
        Some(if per_frame {
            MaskReference::PerFrame(masks)
        } else {
            MaskReference::Shared(masks.join("mask.png"))
        })
    }

    pub fn for_image(&self, image_name: &str) -> PathBuf {
        match self {
            MaskReference::Shared(path) => path.clone(),
            MaskReference::PerFrame(dir) => {
                let stem = Path::new(image_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                dir.join(format!("{stem}.png"))
            }
        }
    }

    fn shared(&self) -> Option<&Path> {
        match self {
            MaskReference::Shared(path) => Some(path),
            MaskReference::PerFrame(_) => None,
        }
    }
}

/// Final state: the manifest is on disk.
#[derive(Debug, Clone)]
pub struct ManifestBuilt {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub summary: Summary,
}

impl DepthResolved {
    /// Joins poses, images, masks and depth into the manifest and writes it.
    ///
    /// Nothing is written when any frame can not be resolved.
    pub async fn build_manifest(self, layout: &OutputLayout) -> Result<ManifestBuilt> {
        let mut summary = self.summary;
        let per_frame_masks = self.mask.as_ref().is_some_and(MaskOutput::is_per_frame);
        let mask = MaskReference::resolve(layout, per_frame_masks);
        let image_dir = layout.image_dir();

        let mut frames = Vec::with_capacity(self.model.images.len());
        for (index, (id, image)) in (1..).zip(&self.model.images) {
            let name = self
                .translation
                .resolve(&image.name)
                .ok_or_else(|| ProcessError::UnknownImage(image.name.clone()))?;

            let path = image_dir.join(name);
            if !path.is_file() {
                return Err(ProcessError::MissingImage { index, path });
            }

            let camera = self.model.camera(image).ok_or(DatasetError::UnknownCamera {
                image: *id,
                camera: image.camera_id,
            })?;

            frames.push(Frame {
                index,
                colmap_im_id: *id,
                file_path: layout.relative(&path),
                transform_matrix: image.camera_to_world_gl(),
                intrinsics: camera.intrinsics()?,
                mask_path: mask.as_ref().map(|m| m.for_image(name)),
                depth_file_path: self.depth.lookup(name, *id).map(|p| layout.relative(p)),
            });
        }

        summary.extend(coverage(frames.len(), self.num_frames));

        let has_points = !self.model.points.is_empty();
        let manifest = Manifest {
            frames,
            shared_mask_path: mask.as_ref().and_then(MaskReference::shared).map(Path::to_path_buf),
            ply_file_path: has_points.then(|| PathBuf::from(SPARSE_PLY_FILE)),
        };
        let manifest_path = layout.manifest_path();
        manifest.write(&manifest_path).await?;

        // Written last so a failed manifest leaves no point cloud behind.
        if has_points {
            let count = write_sparse_ply(&self.model.points, &layout.ply_path()).await?;
            log::info!("Wrote {count} points to {}", layout.ply_path().display());
        }

        Ok(ManifestBuilt {
            manifest,
            manifest_path,
            summary,
        })
    }
}

fn coverage(matched: usize, num_frames: usize) -> Summary {
    let mut summary = Summary::new();
    summary.push(format!("Colmap matched {matched} images"));
    if num_frames == 0 {
        return summary;
    }

    let ratio = matched as f64 / num_frames as f64;
    if matched >= num_frames {
        summary.push("COLMAP found poses for all images, CONGRATS!");
    } else if ratio < LOW_COVERAGE {
        summary.push(format!(
            "COLMAP only found poses for {:.2}% of the images. This is low.",
            ratio * 100.0
        ));
        summary.push(
            "This can be caused by a variety of reasons, such as poor scene coverage, blurry images, \
             or large exposure changes.",
        );
        log::warn!("Only {matched} of {num_frames} images were posed");
    } else {
        summary.push(format!("COLMAP found poses for {:.2}% of the images.", ratio * 100.0));
    }
    summary
}
