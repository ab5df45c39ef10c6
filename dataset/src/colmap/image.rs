use glam::{DMat4, DQuat, DVec2, DVec3};
use serde::Serialize;

/// Rows of the axis permutation applied on top of COLMAP's world frame.
pub const APPLIED_TRANSFORM: [[f64; 4]; 3] = [
    [0.0, 1.0, 0.0, 0.0],
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, -1.0, 0.0],
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    /// World to camera rotation.
    pub quat: DQuat,
    /// World to camera translation.
    pub tvec: DVec3,
    pub camera_id: i32,
    pub name: String,
    pub xys: Vec<DVec2>,
    pub point3d_ids: Vec<i64>,
}

impl Image {
    pub fn world_to_camera(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.quat, self.tvec)
    }

    /// Depth of a world point along this camera's optical axis.
    pub fn depth_of(&self, point: DVec3) -> f64 {
        (self.quat * point + self.tvec).z
    }

    /// Camera to world transform in the OpenGL convention (y up, looking down -z),
    /// with [`APPLIED_TRANSFORM`] applied. Returned row-major.
    pub fn camera_to_world_gl(&self) -> [[f64; 4]; 4] {
        let mut c2w = self.world_to_camera().inverse();

        // OpenCV camera axes to OpenGL: flip the y and z camera axes.
        c2w.y_axis = -c2w.y_axis;
        c2w.z_axis = -c2w.z_axis;

        // Transposing turns glam's columns into rows.
        let mut rows = c2w.transpose().to_cols_array_2d();
        rows.swap(0, 1);
        rows[2] = rows[2].map(|v| -v);
        rows
    }
}
