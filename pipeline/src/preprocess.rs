use std::collections::BTreeMap;
use scene_source::{Source, list_images};
use crate::config::{CameraType, DepthInput, ProcessConfig};
use crate::depth::DepthSource;
use crate::error::{ProcessError, Result};
use crate::images::{self, CropFactor, MaskOutput};
use crate::layout::OutputLayout;
use crate::summary::Summary;
use crate::translation::NameTranslation;

/// State after the working images, masks and external depth are on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Perspective once equirectangular input has been projected.
    pub camera_type: CameraType,
    pub num_frames: usize,
    pub translation: NameTranslation,
    pub depth_source: DepthSource,
    pub mask: Option<MaskOutput>,
    pub summary: Summary,
}

impl Preprocessed {
    pub async fn run(config: &ProcessConfig, layout: &OutputLayout) -> Result<Self> {
        let mut summary = Summary::new();
        let mut camera_type = config.camera_type;
        let mut crop = config.crop();

        let mut images = Source::detect(&config.data)?.images()?;

        if camera_type == CameraType::Equirectangular {
            let resolution = images::compute_resolution(&images, config.images_per_equirect)?;
            images = images::generate_projections(
                &images,
                resolution,
                config.images_per_equirect,
                crop,
                &layout.projections_dir(),
            )
            .await?;
            // The crop was applied to the panoramas already.
            crop = CropFactor::NONE;
            camera_type = CameraType::Perspective;
        }

        if images.is_empty() {
            return Err(ProcessError::MissingInput(format!(
                "no images found in {}",
                config.data.display()
            )));
        }

        let (num_frames, translation) = if config.skip_image_processing {
            (images.len(), NameTranslation::Unavailable)
        } else {
            let copied = images::copy_and_downscale(
                &images,
                &layout.image_dir(),
                crop,
                config.num_downscales,
                false,
            )
            .await?;
            let table: BTreeMap<_, _> = copied
                .iter()
                .map(|image| (image.original_name(), image.copied_name()))
                .collect();
            (copied.len(), NameTranslation::Valid(table))
        };
        summary.push(format!("Starting with {num_frames} images"));

        let mask = if config.percent_radius_crop != 1.0 || config.frame_mask_path.is_some() {
            images::generate_mask(
                &layout.image_dir(),
                config.num_downscales,
                CropFactor::NONE,
                config.percent_radius_crop,
                config.frame_mask_path.as_deref(),
            )
            .await?
        } else {
            None
        };
        if mask.is_some() {
            summary.push("Saved mask(s)");
        }

        let depth_source = match config.depth_input() {
            DepthInput::Reconstruction { sparse } => DepthSource::FromReconstruction { sparse },
            DepthInput::External(dir) => {
                let depth_images = list_images(&dir)?;
                let copied = images::copy_and_downscale(
                    &depth_images,
                    &layout.depth_dir(),
                    crop,
                    config.num_downscales,
                    true,
                )
                .await?;
                if copied.len() != num_frames {
                    log::warn!(
                        "{} has {} depth images for {} frames",
                        dir.display(),
                        copied.len(),
                        num_frames
                    );
                }
                DepthSource::FromExternalDirectory(copied.into_iter().map(|c| c.copied).collect())
            }
        };

        Ok(Self {
            camera_type,
            num_frames,
            translation,
            depth_source,
            mask,
            summary,
        })
    }
}
