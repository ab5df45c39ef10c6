use glam::DVec3;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point3D {
    pub xyz: DVec3,
    pub rgb: [u8; 3],
    pub error: f64,
    pub image_ids: Vec<i32>,
    pub point2d_idxs: Vec<i32>,
}

impl Point3D {
    pub fn track_len(&self) -> usize {
        self.image_ids.len()
    }
}
