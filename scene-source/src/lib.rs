mod filesystem;
mod source;
mod error;

pub use source::*;
pub use error::SceneSourceError;
pub use filesystem::{Filesystem, IMAGE_EXTENSIONS, is_image, list_images};
