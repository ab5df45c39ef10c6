use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use burn::prelude::Config;
use serde::{Deserialize, Serialize};
use crate::error::ProcessError;
use crate::images::CropFactor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Perspective,
    Fisheye,
    Equirectangular,
}

impl FromStr for CameraType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "perspective" => Ok(Self::Perspective),
            "fisheye" => Ok(Self::Fisheye),
            "equirectangular" => Ok(Self::Equirectangular),
            _ => Err(format!("unknown camera type '{s}', expected perspective, fisheye or equirectangular")),
        }
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Perspective => "perspective",
            Self::Fisheye => "fisheye",
            Self::Equirectangular => "equirectangular",
        })
    }
}

/// How feature matches between images are searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingMethod {
    /// Every pair of images. Slow, best for unordered captures.
    Exhaustive,
    /// Neighbouring images only. Good for video-like captures.
    Sequential,
}

impl FromStr for MatchingMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exhaustive" => Ok(Self::Exhaustive),
            "sequential" => Ok(Self::Sequential),
            _ => Err(format!("unknown matching method '{s}', expected exhaustive or sequential")),
        }
    }
}

impl fmt::Display for MatchingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exhaustive => "exhaustive",
            Self::Sequential => "sequential",
        })
    }
}

/// Where depth maps for the manifest come from. Exactly one per run.
#[derive(Debug, Clone, PartialEq)]
pub enum DepthInput {
    /// Depth derived from the reconstruction; `sparse` renders its 3D points.
    Reconstruction { sparse: bool },
    /// A directory of depth images, one per input image in the same order.
    External(PathBuf),
}

#[derive(Config, Debug)]
pub struct ProcessConfig {
    /// Raw captures: a directory of images or a single equirectangular image.
    pub data: PathBuf,

    /// Directory the dataset is written to.
    pub output_dir: PathBuf,

    #[config(default = "CameraType::Perspective")]
    pub camera_type: CameraType,

    /// Fraction of the image to crop away as (top, bottom, left, right).
    #[config(default = "[0.0, 0.0, 0.0, 0.0]")]
    pub crop_factor: [f64; 4],

    /// Number of halved copies written next to the full resolution images.
    #[config(default = 3)]
    pub num_downscales: u32,

    /// Radius of the circular mask, as a fraction of half the image diagonal.
    /// 1.0 disables the mask.
    #[config(default = 1.0)]
    pub percent_radius_crop: f64,

    /// Directory with one mask image per input image.
    pub frame_mask_path: Option<PathBuf>,

    /// Directory with one depth image per input image.
    pub depth_path: Option<PathBuf>,

    /// Images are already in the output image directory; only count them.
    #[config(default = false)]
    pub skip_image_processing: bool,

    /// Reuse an existing reconstruction instead of running COLMAP.
    #[config(default = false)]
    pub skip_colmap: bool,

    /// Existing model, relative to the output dir. Requires `skip_colmap`.
    pub colmap_model_path: Option<PathBuf>,

    /// Perspective views generated per equirectangular image (8 or 14).
    #[config(default = 8)]
    pub images_per_equirect: u32,

    #[config(default = "MatchingMethod::Exhaustive")]
    pub matching_method: MatchingMethod,

    /// Run a final bundle adjustment that also refines the principal point.
    #[config(default = true)]
    pub refine_intrinsics: bool,

    /// Render sparse depth maps from the reconstructed points.
    #[config(default = false)]
    pub use_sfm_depth: bool,

    /// COLMAP executable.
    #[config(default = "String::from(\"colmap\")")]
    pub colmap_cmd: String,

    #[config(default = true)]
    pub gpu: bool,
}

impl ProcessConfig {
    /// Rejects contradictory or out of range settings before anything touches disk.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.colmap_model_path.is_some() && !self.skip_colmap {
            return Err(conflict("--colmap-model-path can only be used together with --skip-colmap"));
        }
        if self.depth_path.is_some() && self.use_sfm_depth {
            return Err(conflict("--depth-path and --use-sfm-depth are mutually exclusive"));
        }
        if self.skip_image_processing {
            if self.depth_path.is_some() {
                return Err(conflict("--depth-path requires image processing"));
            }
            if self.frame_mask_path.is_some() {
                return Err(conflict("--frame-mask-path requires image processing"));
            }
            if self.camera_type == CameraType::Equirectangular {
                return Err(conflict("equirectangular input requires image processing"));
            }
        }
        if !matches!(self.images_per_equirect, 8 | 14) {
            return Err(conflict(format!(
                "images per equirect must be 8 or 14, got {}",
                self.images_per_equirect
            )));
        }
        if !(self.percent_radius_crop > 0.0 && self.percent_radius_crop <= 1.0) {
            return Err(conflict(format!(
                "percent radius crop must be in (0, 1], got {}",
                self.percent_radius_crop
            )));
        }
        self.crop().validate()?;
        Ok(())
    }

    pub fn crop(&self) -> CropFactor {
        CropFactor::from(self.crop_factor)
    }

    /// Selects the depth source once, from configuration alone.
    pub fn depth_input(&self) -> DepthInput {
        match &self.depth_path {
            Some(path) => DepthInput::External(path.clone()),
            None => DepthInput::Reconstruction { sparse: self.use_sfm_depth },
        }
    }
}

fn conflict(msg: impl Into<String>) -> ProcessError {
    ProcessError::ConfigurationConflict(msg.into())
}
