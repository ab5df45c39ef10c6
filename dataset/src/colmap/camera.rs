use serde::Serialize;
use crate::error::{DatasetError, Result};
use crate::manifest::Intrinsics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CameraModel {
    SimplePinhole,
    Pinhole,
    SimpleRadial,
    Radial,
    OpenCV,
    OpenCvFishEye,
    FullOpenCV,
    Fov,
    SimpleRadialFisheye,
    RadialFisheye,
    ThinPrismFisheye,
}

impl CameraModel {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::SimplePinhole),
            1 => Some(Self::Pinhole),
            2 => Some(Self::SimpleRadial),
            3 => Some(Self::Radial),
            4 => Some(Self::OpenCV),
            5 => Some(Self::OpenCvFishEye),
            6 => Some(Self::FullOpenCV),
            7 => Some(Self::Fov),
            8 => Some(Self::SimpleRadialFisheye),
            9 => Some(Self::RadialFisheye),
            10 => Some(Self::ThinPrismFisheye),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::SimplePinhole => 0,
            Self::Pinhole => 1,
            Self::SimpleRadial => 2,
            Self::Radial => 3,
            Self::OpenCV => 4,
            Self::OpenCvFishEye => 5,
            Self::FullOpenCV => 6,
            Self::Fov => 7,
            Self::SimpleRadialFisheye => 8,
            Self::RadialFisheye => 9,
            Self::ThinPrismFisheye => 10,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SIMPLE_PINHOLE" => Some(Self::SimplePinhole),
            "PINHOLE" => Some(Self::Pinhole),
            "SIMPLE_RADIAL" => Some(Self::SimpleRadial),
            "RADIAL" => Some(Self::Radial),
            "OPENCV" => Some(Self::OpenCV),
            "OPENCV_FISHEYE" => Some(Self::OpenCvFishEye),
            "FULL_OPENCV" => Some(Self::FullOpenCV),
            "FOV" => Some(Self::Fov),
            "SIMPLE_RADIAL_FISHEYE" => Some(Self::SimpleRadialFisheye),
            "RADIAL_FISHEYE" => Some(Self::RadialFisheye),
            "THIN_PRISM_FISHEYE" => Some(Self::ThinPrismFisheye),
            _ => None,
        }
    }

    pub fn num_params(&self) -> usize {
        match self {
            Self::SimplePinhole => 3,
            Self::Pinhole => 4,
            Self::SimpleRadial => 4,
            Self::Radial => 5,
            Self::OpenCV => 8,
            Self::OpenCvFishEye => 8,
            Self::FullOpenCV => 12,
            Self::Fov => 5,
            Self::SimpleRadialFisheye => 4,
            Self::RadialFisheye => 5,
            Self::ThinPrismFisheye => 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    pub id: i32,
    pub model: CameraModel,
    pub width: u64,
    pub height: u64,
    pub params: Vec<f64>,
}

impl Camera {
    /// Converts COLMAP parameters into the manifest's OpenCV style intrinsics.
    ///
    /// Pinhole and radial models become `OPENCV` with the missing distortion terms
    /// zeroed, the radial fisheye models become `OPENCV_FISHEYE`.
    pub fn intrinsics(&self) -> Result<Intrinsics> {
        if self.params.len() != self.model.num_params() {
            return Err(DatasetError::InvalidCamera("Invalid number of camera parameters"));
        }

        let (w, h) = (self.width as u32, self.height as u32);
        let p = &self.params;
        let intrinsics = match self.model {
            CameraModel::SimplePinhole => Intrinsics::opencv(w, h, [p[0], p[0], p[1], p[2]], [0.0; 4]),
            CameraModel::Pinhole => Intrinsics::opencv(w, h, [p[0], p[1], p[2], p[3]], [0.0; 4]),
            CameraModel::SimpleRadial => {
                Intrinsics::opencv(w, h, [p[0], p[0], p[1], p[2]], [p[3], 0.0, 0.0, 0.0])
            }
            CameraModel::Radial => {
                Intrinsics::opencv(w, h, [p[0], p[0], p[1], p[2]], [p[3], p[4], 0.0, 0.0])
            }
            CameraModel::OpenCV => {
                Intrinsics::opencv(w, h, [p[0], p[1], p[2], p[3]], [p[4], p[5], p[6], p[7]])
            }
            CameraModel::OpenCvFishEye => {
                Intrinsics::fisheye(w, h, [p[0], p[1], p[2], p[3]], [p[4], p[5], p[6], p[7]])
            }
            CameraModel::SimpleRadialFisheye => {
                Intrinsics::fisheye(w, h, [p[0], p[0], p[1], p[2]], [p[3], 0.0, 0.0, 0.0])
            }
            CameraModel::RadialFisheye => {
                Intrinsics::fisheye(w, h, [p[0], p[0], p[1], p[2]], [p[3], p[4], 0.0, 0.0])
            }
            model => return Err(DatasetError::UnsupportedCamera(model)),
        };
        Ok(intrinsics)
    }
}
