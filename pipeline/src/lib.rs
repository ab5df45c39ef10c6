//! Turns a set of captures into a training dataset: images with a downscale
//! pyramid, optional masks and depth, camera poses from COLMAP and a
//! `transforms.json` manifest.
//!
//! The stages run strictly in order, each consuming the state the previous one
//! produced: [`Preprocessed`] → [`Reconstructed`] → [`DepthResolved`] → [`ManifestBuilt`].

use burn::prelude::Config;

pub use crate::config::{CameraType, DepthInput, MatchingMethod, ProcessConfig};
pub use crate::depth::{DepthResolved, DepthSource, DepthTable};
pub use crate::error::{ProcessError, Result};
pub use crate::layout::OutputLayout;
pub use crate::manifest::{ManifestBuilt, MaskReference};
pub use crate::preprocess::Preprocessed;
pub use crate::reconstruct::{ColmapCli, Reconstructed, ReconstructionError, ReconstructionRequest, Reconstructor};
pub use crate::summary::Summary;
pub use crate::translation::NameTranslation;

pub mod images;
mod config;
mod depth;
mod error;
mod layout;
mod manifest;
mod preprocess;
mod reconstruct;
mod summary;
mod translation;
#[cfg(test)]
mod testing;

pub struct Pipeline {
    config: ProcessConfig,
    layout: OutputLayout,
}

impl Pipeline {
    pub fn new(config: ProcessConfig) -> Result<Self> {
        config.validate()?;
        let layout = OutputLayout::new(&config.output_dir, config.colmap_model_path.as_deref());
        Ok(Self { config, layout })
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs every stage to completion. The manifest is only written when all of
    /// them succeed.
    pub async fn run(&self, reconstructor: &dyn Reconstructor) -> Result<ManifestBuilt> {
        reconstruct::check_preconditions(&self.config, &self.layout)?;

        tokio::fs::create_dir_all(self.layout.root()).await?;
        self.config.save(self.layout.config_path())?;
        log::info!("Processing {} into {}", self.config.data.display(), self.layout.root().display());

        let preprocessed = Preprocessed::run(&self.config, &self.layout).await?;
        let reconstructed = preprocessed
            .reconstruct(&self.config, &self.layout, reconstructor)
            .await?;
        let resolved = reconstructed.resolve_depth(&self.layout).await?;
        resolved.build_manifest(&self.layout).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use image::{ImageBuffer, Luma, Rgb, RgbImage};
    use dataset::ProjectionModel;
    use super::*;
    use crate::testing::{FakeReconstructor, model_with_names, write_jpegs};

    fn names(prefix: &str, count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("{prefix}{i:05}.jpg")).collect()
    }

    fn as_refs(names: &[String]) -> Vec<&str> {
        names.iter().map(String::as_str).collect()
    }

    fn inputs(root: &Path, count: usize) -> (PathBuf, Vec<String>) {
        let data = root.join("captures");
        let originals = names("IMG_", count);
        write_jpegs(&data, &as_refs(&originals));
        (data, originals)
    }

    #[tokio::test]
    async fn existing_reconstruction_with_ten_images() {
        let root = tempfile::tempdir().unwrap();
        let (data, originals) = inputs(root.path(), 10);
        let output = root.path().join("dataset");

        let config = ProcessConfig::new(data, output.clone()).with_skip_colmap(true);
        let pipeline = Pipeline::new(config).unwrap();
        model_with_names(&as_refs(&originals))
            .save_binary(pipeline.layout().model_dir())
            .await
            .unwrap();

        let reconstructor = FakeReconstructor::failing();
        let built = pipeline.run(&reconstructor).await.unwrap();

        assert!(!reconstructor.was_called());
        let frames = &built.manifest.frames;
        assert_eq!(frames.len(), 10);
        assert_eq!(frames.iter().map(|f| f.index).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
        assert_eq!(frames[0].file_path, PathBuf::from("images/frame_00001.jpg"));
        assert!(frames.iter().all(|f| f.mask_path.is_none() && f.depth_file_path.is_none()));
        assert_eq!(built.manifest.shared_mask_path, None);
        assert!(built.summary.contains("Starting with 10 images"));
        assert!(built.summary.contains("COLMAP found poses for all images, CONGRATS!"));

        assert!(output.join("images_8/frame_00010.jpg").is_file());
        assert!(output.join("transforms.json").is_file());
        let saved = ProcessConfig::load(output.join("process_config.json")).unwrap();
        assert!(saved.skip_colmap);
    }

    #[tokio::test]
    async fn shared_mask_is_referenced_by_every_frame() {
        let root = tempfile::tempdir().unwrap();
        let (data, originals) = inputs(root.path(), 10);
        let output = root.path().join("dataset");

        let config = ProcessConfig::new(data, output.clone())
            .with_skip_colmap(true)
            .with_percent_radius_crop(0.8);
        let pipeline = Pipeline::new(config).unwrap();
        model_with_names(&as_refs(&originals))
            .save_binary(pipeline.layout().model_dir())
            .await
            .unwrap();

        let built = pipeline.run(&FakeReconstructor::failing()).await.unwrap();

        assert!(output.join("masks/mask.png").is_file());
        assert!(output.join("masks_2/mask.png").is_file());
        let mask = Some(PathBuf::from("masks/mask.png"));
        assert_eq!(built.manifest.shared_mask_path, mask);
        assert!(built.manifest.frames.iter().all(|f| f.mask_path == mask));
        assert!(built.summary.contains("Saved mask(s)"));
    }

    #[tokio::test]
    async fn per_frame_masks() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 3);
        let output = root.path().join("dataset");
        let masks = root.path().join("raw_masks");
        std::fs::create_dir_all(&masks).unwrap();
        for i in 0..3 {
            ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(32, 24, Luma([255]))
                .save(masks.join(format!("m{i}.png")))
                .unwrap();
        }

        let config = ProcessConfig::new(data, output.clone()).with_frame_mask_path(Some(masks));
        let reconstructor = FakeReconstructor::new(model_with_names(&as_refs(&names("frame_", 3))));
        let built = Pipeline::new(config).unwrap().run(&reconstructor).await.unwrap();

        assert_eq!(built.manifest.shared_mask_path, None);
        assert_eq!(built.manifest.frames[2].mask_path, Some(PathBuf::from("masks/frame_00003.png")));
        assert!(output.join("masks/frame_00003.png").is_file());
    }

    #[tokio::test]
    async fn no_images_stops_before_reconstruction() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("captures");
        std::fs::create_dir_all(&data).unwrap();
        let output = root.path().join("dataset");

        let reconstructor = FakeReconstructor::new(model_with_names(&["frame_00001.jpg"]));
        let err = Pipeline::new(ProcessConfig::new(data, output.clone()))
            .unwrap()
            .run(&reconstructor)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::MissingInput(_)));
        assert!(!reconstructor.was_called());
        assert!(!output.join("transforms.json").exists());
        assert!(!output.join("colmap").exists());
    }

    #[tokio::test]
    async fn reconstruction_names_are_authoritative() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 4);
        let output = root.path().join("dataset");

        // The model names the copied files, not the originals the table knows.
        let reconstructor = FakeReconstructor::new(model_with_names(&as_refs(&names("frame_", 4))));
        let built = Pipeline::new(ProcessConfig::new(data, output))
            .unwrap()
            .run(&reconstructor)
            .await
            .unwrap();

        assert!(reconstructor.was_called());
        assert_eq!(built.manifest.frames.len(), 4);
        assert_eq!(built.manifest.frames[3].file_path, PathBuf::from("images/frame_00004.jpg"));
        assert_eq!(built.manifest.ply_file_path, Some(PathBuf::from("sparse_pc.ply")));
    }

    #[tokio::test]
    async fn equirect_views_are_perspective_frames() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("panoramas");
        std::fs::create_dir_all(&data).unwrap();
        for name in ["a.png", "b.png"] {
            RgbImage::from_pixel(64, 32, Rgb([120, 130, 140])).save(data.join(name)).unwrap();
        }
        let output = root.path().join("dataset");

        let copied: Vec<_> = (1..=16).map(|i| format!("frame_{i:05}.png")).collect();
        let reconstructor = FakeReconstructor::new(model_with_names(&as_refs(&copied)));
        let config = ProcessConfig::new(data, output.clone())
            .with_camera_type(CameraType::Equirectangular)
            .with_num_downscales(1);
        let built = Pipeline::new(config).unwrap().run(&reconstructor).await.unwrap();

        assert!(built.summary.contains("Starting with 16 images"));
        assert_eq!(std::fs::read_dir(output.join("planar_projections")).unwrap().count(), 16);
        assert_eq!(image::image_dimensions(output.join("images/frame_00016.png")).unwrap(), (35, 35));
        assert_eq!(built.manifest.frames.len(), 16);
        assert!(built
            .manifest
            .frames
            .iter()
            .all(|f| f.intrinsics.camera_model == ProjectionModel::Opencv));
    }

    #[tokio::test]
    async fn external_depth_follows_frame_order() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 3);
        let output = root.path().join("dataset");
        let depth = root.path().join("raw_depth");
        std::fs::create_dir_all(&depth).unwrap();
        for name in ["d_a.png", "d_b.png", "d_c.png"] {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(32, 24, Luma([1500]))
                .save(depth.join(name))
                .unwrap();
        }

        let reconstructor = FakeReconstructor::new(model_with_names(&as_refs(&names("frame_", 3))));
        let config = ProcessConfig::new(data, output.clone()).with_depth_path(Some(depth));
        let built = Pipeline::new(config).unwrap().run(&reconstructor).await.unwrap();

        let depths: Vec<_> = built
            .manifest
            .frames
            .iter()
            .map(|f| f.depth_file_path.clone())
            .collect();
        assert_eq!(depths, vec![
            Some(PathBuf::from("depth/frame_00001.png")),
            Some(PathBuf::from("depth/frame_00002.png")),
            Some(PathBuf::from("depth/frame_00003.png")),
        ]);
        assert!(output.join("depth/frame_00003.png").is_file());
        assert!(output.join("depth_2/frame_00003.png").is_file());
    }

    #[tokio::test]
    async fn unposed_image_keeps_later_frames_paired() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 3);
        let output = root.path().join("dataset");
        let depth = root.path().join("raw_depth");
        let masks = root.path().join("raw_masks");
        std::fs::create_dir_all(&depth).unwrap();
        std::fs::create_dir_all(&masks).unwrap();
        for i in 0..3 {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(32, 24, Luma([1000 + i]))
                .save(depth.join(format!("d{i}.png")))
                .unwrap();
            ImageBuffer::<Luma<u8>, Vec<u8>>::from_pixel(32, 24, Luma([255]))
                .save(masks.join(format!("m{i}.png")))
                .unwrap();
        }

        // COLMAP registers the first and last image only.
        let reconstructor = FakeReconstructor::new(model_with_names(&["frame_00001.jpg", "frame_00003.jpg"]));
        let config = ProcessConfig::new(data, output.clone())
            .with_depth_path(Some(depth))
            .with_frame_mask_path(Some(masks));
        let built = Pipeline::new(config).unwrap().run(&reconstructor).await.unwrap();

        let frames = &built.manifest.frames;
        assert_eq!(frames.len(), 2);
        let last = &frames[1];
        assert_eq!(last.file_path, PathBuf::from("images/frame_00003.jpg"));
        assert_eq!(last.depth_file_path, Some(PathBuf::from("depth/frame_00003.png")));
        assert_eq!(last.mask_path, Some(PathBuf::from("masks/frame_00003.png")));
        assert_eq!(frames[0].depth_file_path, Some(PathBuf::from("depth/frame_00001.png")));
        assert!(built.summary.contains("Colmap matched 2 images"));
    }

    #[tokio::test]
    async fn missing_reconstruction_output() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 2);
        let output = root.path().join("dataset");

        let reconstructor = FakeReconstructor::failing();
        let err = Pipeline::new(ProcessConfig::new(data, output.clone()))
            .unwrap()
            .run(&reconstructor)
            .await
            .unwrap_err();

        assert!(reconstructor.was_called());
        let ProcessError::ReconstructionOutputMissing(path) = err else {
            panic!("expected missing reconstruction output, got {err}");
        };
        assert_eq!(path, output.join("colmap/sparse/0/cameras.bin"));
        assert!(!output.join("transforms.json").exists());
    }

    #[tokio::test]
    async fn explicit_model_path_must_exist() {
        let root = tempfile::tempdir().unwrap();
        let (data, _) = inputs(root.path(), 2);
        let config = ProcessConfig::new(data, root.path().join("dataset"))
            .with_skip_colmap(true)
            .with_colmap_model_path(Some(PathBuf::from("elsewhere/0")));

        let err = Pipeline::new(config)
            .unwrap()
            .run(&FakeReconstructor::failing())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::MissingInput(_)));
    }

    #[test]
    fn conflicting_config_is_rejected() {
        let config = ProcessConfig::new(PathBuf::from("in"), PathBuf::from("out"))
            .with_colmap_model_path(Some(PathBuf::from("colmap/sparse/0")));
        assert!(matches!(Pipeline::new(config), Err(ProcessError::ConfigurationConflict(_))));
    }
}
