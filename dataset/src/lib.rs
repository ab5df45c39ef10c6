pub mod colmap;
pub mod manifest;
pub mod ply;
pub mod sparse_depth;
mod error;

pub use colmap::ColmapModel;
pub use error::{DatasetError, Result};
pub use manifest::{Frame, Intrinsics, Manifest, ProjectionModel};
