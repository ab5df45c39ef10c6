use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "transforms.json";
pub const CONFIG_FILE: &str = "process_config.json";
pub const SPARSE_PLY_FILE: &str = "sparse_pc.ply";

/// Where each stage reads and writes inside the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    root: PathBuf,
    model_dir: PathBuf,
}

impl OutputLayout {
    /// `model_path` is relative to `root`; defaults to `colmap/sparse/0`.
    pub fn new(root: &Path, model_path: Option<&Path>) -> Self {
        let model_dir = match model_path {
            Some(path) => root.join(path),
            None => root.join("colmap").join("sparse").join("0"),
        };
        Self {
            root: root.to_path_buf(),
            model_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn masks_dir(&self) -> PathBuf {
        self.root.join("masks")
    }

    pub fn depth_dir(&self) -> PathBuf {
        self.root.join("depth")
    }

    pub fn projections_dir(&self) -> PathBuf {
        self.root.join("planar_projections")
    }

    pub fn colmap_dir(&self) -> PathBuf {
        self.root.join("colmap")
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn ply_path(&self) -> PathBuf {
        self.root.join(SPARSE_PLY_FILE)
    }

    /// `path` relative to the output root, as stored in the manifest.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
