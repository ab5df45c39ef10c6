pub mod camera;
pub mod image;
pub mod point;
mod input;
mod parse;
mod write;

pub use input::InputFormat;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use scene_source::Filesystem;
use crate::colmap::camera::Camera;
use crate::colmap::image::Image;
use crate::colmap::input::{InputFile, InputType};
use crate::colmap::point::Point3D;
use crate::error::{DatasetError, Result};

/// Name of the file whose presence marks a finished reconstruction.
pub const CAMERAS_BIN: &str = "cameras.bin";

/// The files making up one sparse model, all in the same format.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub cameras: PathBuf,
    pub images: PathBuf,
    pub points: Option<PathBuf>,
    pub format: InputFormat,
}

impl ModelFiles {
    /// Finds a model directly inside `dir`. Binary files win over text files.
    pub fn locate(dir: &Path) -> Option<Self> {
        let fs = Filesystem::from_dir(dir).ok()?;

        [InputFormat::Binary, InputFormat::Text]
            .into_iter()
            .find_map(|format| {
                let file = |input_type: InputType| {
                    let name = format!("{}.{}", input_type.file_stem(), format.extension());
                    // Only accept files at the top of the model dir, not in nested models.
                    fs.files_ending_in(&name)
                        .find(|path| path.parent() == Some(dir))
                };

                Some(Self {
                    cameras: file(InputType::Cameras)?,
                    images: file(InputType::Images)?,
                    points: file(InputType::Points3D),
                    format,
                })
            })
    }
}

/// A COLMAP sparse reconstruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColmapModel {
    pub cameras: HashMap<i32, Camera>,
    /// Keyed by image id; iteration order is the final frame order.
    pub images: BTreeMap<i32, Image>,
    pub points: HashMap<i64, Point3D>,
}

impl ColmapModel {
    pub async fn load(dir: &Path) -> Result<Self> {
        let files = ModelFiles::locate(dir)
            .ok_or_else(|| DatasetError::ModelNotFound(dir.to_path_buf()))?;
        log::info!("Located cameras file at: {}", files.cameras.display());
        log::info!("Located images file at: {}", files.images.display());

        let cameras = InputFile::new(files.cameras.clone(), InputType::Cameras, files.format)
            .parse()
            .await?
            .as_cameras()
            .ok_or(DatasetError::InvalidCamera("Cameras file did not contain cameras"))?;
        let images = InputFile::new(files.images.clone(), InputType::Images, files.format)
            .parse()
            .await?
            .as_images()
            .unwrap_or_default();

        let points = match &files.points {
            Some(path) => InputFile::new(path.clone(), InputType::Points3D, files.format)
                .parse()
                .await?
                .as_points()
                .unwrap_or_default(),
            None => {
                log::warn!("No points3D file in {}, continuing without points", dir.display());
                HashMap::new()
            }
        };

        for (id, image) in &images {
            if !cameras.contains_key(&image.camera_id) {
                return Err(DatasetError::UnknownCamera { image: *id, camera: image.camera_id });
            }
        }

        log::info!(
            "Loaded COLMAP model with {} cameras, {} images and {} points",
            cameras.len(),
            images.len(),
            points.len()
        );
        Ok(Self { cameras, images, points })
    }

    /// Writes the model as `cameras.bin`, `images.bin` and `points3D.bin` into `dir`.
    pub async fn save_binary(&self, dir: &Path) -> Result<()> {
        write::write_file(&dir.join(CAMERAS_BIN), write::cameras_bin(&self.cameras)).await?;
        write::write_file(&dir.join("images.bin"), write::images_bin(&self.images)).await?;
        write::write_file(&dir.join("points3D.bin"), write::points_bin(&self.points)).await?;
        Ok(())
    }

    pub fn camera(&self, image: &Image) -> Option<&Camera> {
        self.cameras.get(&image.camera_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use glam::{DQuat, DVec2, DVec3};
    use super::*;
    use crate::colmap::camera::CameraModel;

    pub(crate) fn sample_model() -> ColmapModel {
        let camera = Camera {
            id: 1,
            model: CameraModel::Pinhole,
            width: 64,
            height: 48,
            params: vec![50.0, 50.0, 32.0, 24.0],
        };
        let mut images = BTreeMap::new();
        for id in 1..=3 {
            images.insert(
                id,
                Image {
                    quat: DQuat::from_rotation_y(0.1 * id as f64),
                    tvec: DVec3::new(0.0, 0.0, 1.0),
                    camera_id: 1,
                    name: format!("frame_{id:05}.jpg"),
                    xys: vec![DVec2::new(10.5, 20.5), DVec2::new(1.0, 1.0)],
                    point3d_ids: vec![7, -1],
                },
            );
        }
        let mut points = HashMap::new();
        points.insert(
            7,
            Point3D {
                xyz: DVec3::new(0.0, 0.0, 2.0),
                rgb: [255, 128, 0],
                error: 0.5,
                image_ids: vec![1, 2, 3],
                point2d_idxs: vec![0, 0, 0],
            },
        );
        ColmapModel {
            cameras: HashMap::from([(1, camera)]),
            images,
            points,
        }
    }

    #[tokio::test]
    async fn binary_model_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let model = sample_model();
        model.save_binary(dir.path()).await.unwrap();

        let loaded = ColmapModel::load(dir.path()).await.unwrap();
        assert_eq!(loaded, model);
    }

    #[tokio::test]
    async fn text_model_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cameras.txt"),
            "# Camera list\n1 SIMPLE_RADIAL 640 480 500 320 240 0.01\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("images.txt"),
            "# Image list\n\
             2 1 0 0 0 0.5 0 0 1 b.jpg\n\
             \n\
             1 1 0 0 0 0 0 0 1 a.jpg\n\
             100.0 200.0 3\n",
        )
        .unwrap();

        let model = ColmapModel::load(dir.path()).await.unwrap();
        assert_eq!(model.cameras[&1].model, CameraModel::SimpleRadial);
        let names: Vec<_> = model.images.values().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
        assert_eq!(model.images[&1].point3d_ids, vec![3]);
        assert!(model.images[&2].xys.is_empty());
        assert!(model.points.is_empty());
    }

    #[tokio::test]
    async fn truncated_images_file() {
        let dir = tempfile::tempdir().unwrap();
        sample_model().save_binary(dir.path()).await.unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        for v in [1.0f64, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(b"a.jpg\0");
        // Claims far more observations than the file holds.
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(dir.path().join("images.bin"), bytes).unwrap();

        assert!(matches!(
            ColmapModel::load(dir.path()).await,
            Err(DatasetError::File(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof
        ));
    }

    #[tokio::test]
    async fn missing_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("images.bin"), b"").unwrap();
        assert!(ModelFiles::locate(dir.path()).is_none());
        assert!(matches!(
            ColmapModel::load(dir.path()).await,
            Err(DatasetError::ModelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn image_with_unknown_camera() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = sample_model();
        model.images.get_mut(&2).unwrap().camera_id = 9;
        model.save_binary(dir.path()).await.unwrap();

        assert!(matches!(
            ColmapModel::load(dir.path()).await,
            Err(DatasetError::UnknownCamera { image: 2, camera: 9 })
        ));
    }
}
