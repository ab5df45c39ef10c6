use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use dataset::ColmapModel;
use dataset::colmap::{CAMERAS_BIN, ModelFiles};
use crate::config::{CameraType, MatchingMethod, ProcessConfig};
use crate::depth::DepthSource;
use crate::error::{ProcessError, Result};
use crate::images::MaskOutput;
use crate::layout::OutputLayout;
use crate::preprocess::Preprocessed;
use crate::summary::Summary;
use crate::translation::NameTranslation;

#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("Failed to start COLMAP {step}: {source}")]
    Spawn {
        step: &'static str,
        source: std::io::Error,
    },

    #[error("COLMAP {step} exited with {status}")]
    Failed { step: &'static str, status: ExitStatus },

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the reconstruction tool needs to know about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionRequest {
    pub image_dir: PathBuf,
    /// Receives `database.db` and `sparse/0`.
    pub colmap_dir: PathBuf,
    pub camera_type: CameraType,
    pub matching_method: MatchingMethod,
    pub refine_intrinsics: bool,
    pub gpu: bool,
}

impl ReconstructionRequest {
    pub fn model_dir(&self) -> PathBuf {
        self.colmap_dir.join("sparse").join("0")
    }
}

/// Structure from motion over a directory of images.
///
/// Implementations leave a model in [`ReconstructionRequest::model_dir`]; whether
/// one was produced is checked by the caller.
#[async_trait]
pub trait Reconstructor: Send + Sync {
    async fn reconstruct(&self, request: &ReconstructionRequest) -> std::result::Result<(), ReconstructionError>;
}

/// Drives the `colmap` command line tool.
#[derive(Debug, Clone)]
pub struct ColmapCli {
    command: String,
}

impl ColmapCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    async fn run_step(&self, step: &'static str, args: Vec<String>) -> std::result::Result<(), ReconstructionError> {
        log::info!("Running COLMAP {step}");
        log::debug!("{} {step} {}", self.command, args.join(" "));

        let status = Command::new(&self.command)
            .arg(step)
            .args(&args)
            .status()
            .await
            .map_err(|source| ReconstructionError::Spawn { step, source })?;
        if !status.success() {
            return Err(ReconstructionError::Failed { step, status });
        }
        Ok(())
    }
}

fn arg(key: &str, value: impl ToString) -> [String; 2] {
    [format!("--{key}"), value.to_string()]
}

fn path_arg(key: &str, value: &Path) -> [String; 2] {
    arg(key, value.display())
}

#[async_trait]
impl Reconstructor for ColmapCli {
    async fn reconstruct(&self, request: &ReconstructionRequest) -> std::result::Result<(), ReconstructionError> {
        let database = request.colmap_dir.join("database.db");
        let sparse_dir = request.colmap_dir.join("sparse");
        tokio::fs::create_dir_all(&sparse_dir).await?;
        if tokio::fs::try_exists(&database).await? {
            tokio::fs::remove_file(&database).await?;
        }

        let camera_model = match request.camera_type {
            CameraType::Fisheye => "OPENCV_FISHEYE",
            CameraType::Perspective | CameraType::Equirectangular => "OPENCV",
        };
        let gpu = u8::from(request.gpu);

        let extract: Vec<String> = [
            path_arg("database_path", &database),
            path_arg("image_path", &request.image_dir),
            arg("ImageReader.single_camera", 1),
            arg("ImageReader.camera_model", camera_model),
            arg("SiftExtraction.use_gpu", gpu),
        ]
        .concat();
        self.run_step("feature_extractor", extract).await?;

        let matcher = match request.matching_method {
            MatchingMethod::Exhaustive => "exhaustive_matcher",
            MatchingMethod::Sequential => "sequential_matcher",
        };
        let matching = [path_arg("database_path", &database), arg("SiftMatching.use_gpu", gpu)].concat();
        self.run_step(matcher, matching).await?;

        let mapping = [
            path_arg("database_path", &database),
            path_arg("image_path", &request.image_dir),
            path_arg("output_path", &sparse_dir),
            arg("Mapper.ba_global_function_tolerance", 1e-6),
        ]
        .concat();
        self.run_step("mapper", mapping).await?;

        if request.refine_intrinsics {
            let model_dir = request.model_dir();
            let adjust = [
                path_arg("input_path", &model_dir),
                path_arg("output_path", &model_dir),
                arg("BundleAdjustment.refine_principal_point", 1),
            ]
            .concat();
            self.run_step("bundle_adjuster", adjust).await?;
        }
        Ok(())
    }
}

/// Checks made before any stage runs: an explicit model must already be on disk.
pub fn check_preconditions(config: &ProcessConfig, layout: &OutputLayout) -> Result<()> {
    if config.colmap_model_path.is_some() && !layout.model_dir().exists() {
        return Err(ProcessError::MissingInput(format!(
            "COLMAP model path {} does not exist",
            layout.model_dir().display()
        )));
    }
    Ok(())
}

/// State once camera poses are available.
#[derive(Debug, Clone)]
pub struct Reconstructed {
    pub model: ColmapModel,
    pub num_frames: usize,
    pub translation: NameTranslation,
    pub depth_source: DepthSource,
    pub mask: Option<MaskOutput>,
    pub summary: Summary,
}

impl Preprocessed {
    /// Runs the reconstruction unless it is skipped, then loads the model.
    ///
    /// The model must exist afterwards either way.
    pub async fn reconstruct(
        self,
        config: &ProcessConfig,
        layout: &OutputLayout,
        reconstructor: &dyn Reconstructor,
    ) -> Result<Reconstructed> {
        let mut translation = self.translation;

        if !config.skip_colmap {
            let request = ReconstructionRequest {
                image_dir: layout.image_dir(),
                colmap_dir: layout.colmap_dir(),
                camera_type: self.camera_type,
                matching_method: config.matching_method,
                refine_intrinsics: config.refine_intrinsics,
                gpu: config.gpu,
            };
            reconstructor.reconstruct(&request).await?;
            // The model names images as the tool saw them.
            translation = translation.invalidate();
        }

        let model_dir = layout.model_dir();
        if ModelFiles::locate(model_dir).is_none() {
            return Err(ProcessError::ReconstructionOutputMissing(model_dir.join(CAMERAS_BIN)));
        }
        let model = ColmapModel::load(model_dir).await?;

        Ok(Reconstructed {
            model,
            num_frames: self.num_frames,
            translation,
            depth_source: self.depth_source,
            mask: self.mask,
            summary: self.summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_model_dir() {
        let request = ReconstructionRequest {
            image_dir: PathBuf::from("out/images"),
            colmap_dir: PathBuf::from("out/colmap"),
            camera_type: CameraType::Perspective,
            matching_method: MatchingMethod::Sequential,
            refine_intrinsics: false,
            gpu: false,
        };
        assert_eq!(request.model_dir(), PathBuf::from("out/colmap/sparse/0"));
        assert_eq!(arg("SiftExtraction.use_gpu", 0), ["--SiftExtraction.use_gpu".to_owned(), "0".to_owned()]);
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let request = ReconstructionRequest {
            image_dir: dir.path().join("images"),
            colmap_dir: dir.path().join("colmap"),
            camera_type: CameraType::Fisheye,
            matching_method: MatchingMethod::Exhaustive,
            refine_intrinsics: true,
            gpu: false,
        };
        let cli = ColmapCli::new("definitely-not-a-colmap-binary");
        let err = cli.reconstruct(&request).await.unwrap_err();
        assert!(matches!(err, ReconstructionError::Spawn { step: "feature_extractor", .. }));
    }
}
