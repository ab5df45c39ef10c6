use std::path::PathBuf;
use anyhow::{Context, anyhow};
use burn::prelude::Config;
use clap::Parser;
use pipeline::{CameraType, ColmapCli, MatchingMethod, Pipeline, ProcessConfig};
use tracing_subscriber::EnvFilter;

/// Turn a folder of images (or equirectangular panoramas) into a dataset with
/// COLMAP poses and a transforms.json manifest.
#[derive(Parser, Debug)]
struct Args {
    /// Directory of images, or a single equirectangular image
    data: PathBuf,

    /// Directory the dataset is written to
    output_dir: PathBuf,

    /// Start from a saved process_config.json; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// perspective, fisheye or equirectangular
    #[arg(long)]
    camera_type: Option<CameraType>,

    /// Fraction cropped from the top, bottom, left and right
    #[arg(long, num_args = 4, value_names = ["TOP", "BOTTOM", "LEFT", "RIGHT"])]
    crop_factor: Option<Vec<f64>>,

    /// Number of halved image copies to write
    #[arg(long)]
    num_downscales: Option<u32>,

    /// Radius of the circular mask as a fraction of half the image diagonal
    #[arg(long)]
    percent_radius_crop: Option<f64>,

    /// Directory with one mask per input image
    #[arg(long)]
    frame_mask_path: Option<PathBuf>,

    /// Directory with one depth image per input image
    #[arg(long)]
    depth_path: Option<PathBuf>,

    /// Images are already in <output_dir>/images
    #[arg(long)]
    skip_image_processing: bool,

    /// Reuse an existing COLMAP model
    #[arg(long)]
    skip_colmap: bool,

    /// Existing model relative to the output dir (with --skip-colmap)
    #[arg(long)]
    colmap_model_path: Option<PathBuf>,

    /// Views per panorama, 8 or 14
    #[arg(long)]
    images_per_equirect: Option<u32>,

    /// exhaustive or sequential
    #[arg(long)]
    matching_method: Option<MatchingMethod>,

    /// Skip the final bundle adjustment of the intrinsics
    #[arg(long)]
    no_refine_intrinsics: bool,

    /// Render sparse depth maps from the reconstructed points
    #[arg(long)]
    use_sfm_depth: bool,

    /// COLMAP executable
    #[arg(long)]
    colmap_cmd: Option<String>,

    /// Run COLMAP feature extraction and matching on the CPU
    #[arg(long)]
    no_gpu: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ProcessConfig> {
        let mut config = match &self.config {
            Some(path) => ProcessConfig::load(path)
                .map_err(|err| anyhow!("{err}"))
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ProcessConfig::new(self.data.clone(), self.output_dir.clone()),
        };
        config.data = self.data;
        config.output_dir = self.output_dir;

        if let Some(camera_type) = self.camera_type {
            config.camera_type = camera_type;
        }
        if let Some(crop) = self.crop_factor {
            config.crop_factor = crop
                .try_into()
                .map_err(|_| anyhow!("--crop-factor takes exactly four values"))?;
        }
        if let Some(n) = self.num_downscales {
            config.num_downscales = n;
        }
        if let Some(percent) = self.percent_radius_crop {
            config.percent_radius_crop = percent;
        }
        if self.frame_mask_path.is_some() {
            config.frame_mask_path = self.frame_mask_path;
        }
        if self.depth_path.is_some() {
            config.depth_path = self.depth_path;
        }
        if self.colmap_model_path.is_some() {
            config.colmap_model_path = self.colmap_model_path;
        }
        if let Some(n) = self.images_per_equirect {
            config.images_per_equirect = n;
        }
        if let Some(method) = self.matching_method {
            config.matching_method = method;
        }
        if let Some(cmd) = self.colmap_cmd {
            config.colmap_cmd = cmd;
        }
        config.skip_image_processing |= self.skip_image_processing;
        config.skip_colmap |= self.skip_colmap;
        config.use_sfm_depth |= self.use_sfm_depth;
        config.refine_intrinsics &= !self.no_refine_intrinsics;
        config.gpu &= !self.no_gpu;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = args.into_config()?;
    let reconstructor = ColmapCli::new(config.colmap_cmd.clone());
    let pipeline = Pipeline::new(config)?;
    let built = pipeline.run(&reconstructor).await?;

    for line in built.summary.lines() {
        tracing::info!("{line}");
    }
    tracing::info!("Dataset ready: {}", built.manifest_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let args = Args::try_parse_from([
            "process-images",
            "captures",
            "out",
            "--camera-type",
            "equirectangular",
            "--crop-factor",
            "0.1",
            "0.2",
            "0",
            "0",
            "--matching-method",
            "sequential",
            "--no-gpu",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.data, PathBuf::from("captures"));
        assert_eq!(config.camera_type, CameraType::Equirectangular);
        assert_eq!(config.crop_factor, [0.1, 0.2, 0.0, 0.0]);
        assert_eq!(config.matching_method, MatchingMethod::Sequential);
        assert!(!config.gpu);
        assert!(config.refine_intrinsics);
        assert_eq!(config.num_downscales, 3);
    }

    #[test]
    fn bad_camera_type() {
        assert!(Args::try_parse_from(["process-images", "a", "b", "--camera-type", "sphere"]).is_err());
    }
}
