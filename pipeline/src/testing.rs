use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use dataset::ColmapModel;
use dataset::colmap::camera::{Camera, CameraModel};
use dataset::colmap::image::Image;
use dataset::colmap::point::Point3D;
use glam::{DQuat, DVec2, DVec3};
use image::{Rgb, RgbImage};
use crate::reconstruct::{ReconstructionError, ReconstructionRequest, Reconstructor};

pub(crate) fn write_jpegs(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        RgbImage::from_fn(32, 24, |x, y| Rgb([x as u8 * 8, y as u8 * 10, 60]))
            .save(dir.join(name))
            .unwrap();
    }
}

/// One pinhole camera, images with ids `1..` named `names`, all seeing one point.
pub(crate) fn model_with_names(names: &[&str]) -> ColmapModel {
    let camera = Camera {
        id: 1,
        model: CameraModel::Pinhole,
        width: 32,
        height: 24,
        params: vec![30.0, 30.0, 16.0, 12.0],
    };

    let images: BTreeMap<i32, Image> = (1..)
        .zip(names)
        .map(|(id, name)| {
            let image = Image {
                quat: DQuat::from_rotation_y(0.05 * id as f64),
                tvec: DVec3::new(0.0, 0.0, 1.0),
                camera_id: 1,
                name: (*name).to_owned(),
                xys: vec![DVec2::new(16.5, 12.5)],
                point3d_ids: vec![1],
            };
            (id, image)
        })
        .collect();

    let point = Point3D {
        xyz: DVec3::new(0.0, 0.0, 2.0),
        rgb: [20, 40, 60],
        error: 0.3,
        image_ids: images.keys().copied().collect(),
        point2d_idxs: vec![0; images.len()],
    };

    ColmapModel {
        cameras: HashMap::from([(1, camera)]),
        images,
        points: HashMap::from([(1, point)]),
    }
}

/// Stands in for COLMAP: writes a fixed model, or nothing at all.
pub(crate) struct FakeReconstructor {
    model: Option<ColmapModel>,
    called: AtomicBool,
}

impl FakeReconstructor {
    pub(crate) fn new(model: ColmapModel) -> Self {
        Self {
            model: Some(model),
            called: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            model: None,
            called: AtomicBool::new(false),
        }
    }

    pub(crate) fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reconstructor for FakeReconstructor {
    async fn reconstruct(&self, request: &ReconstructionRequest) -> Result<(), ReconstructionError> {
        self.called.store(true, Ordering::SeqCst);
        if let Some(model) = &self.model {
            model.save_binary(&request.model_dir()).await.expect("write fake model");
        }
        Ok(())
    }
}
