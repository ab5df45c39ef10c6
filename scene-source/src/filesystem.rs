use std::collections::HashMap;
use std::path::{Path, PathBuf};
use path_clean::PathClean;
use walkdir::WalkDir;
use crate::error::Result;
use crate::SceneSourceError;

/// Extensions (lowercase) accepted as input images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lists the images directly inside `dir`, sorted by file name.
///
/// Hidden files and subdirectories are ignored. The order returned here is the
/// order every later stage numbers frames in.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SceneSourceError::NotFound(dir.to_path_buf()));
    }

    let mut images = vec![];
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let hidden = entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
        if entry.file_type().is_file() && !hidden && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }

    log::debug!("Found {} images in {}", images.len(), dir.display());
    Ok(images)
}

/// Case-insensitive index over every file below a root directory.
pub struct Filesystem {
    root: PathBuf,
    lookup: HashMap<PathKey, PathBuf>,
}

impl Filesystem {
    pub fn from_dir(root: &Path) -> Result<Filesystem> {
        if !root.is_dir() {
            return Err(SceneSourceError::NotFound(root.to_path_buf()));
        }

        let mut paths = vec![];
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() {
                // Store paths relative to the root so keys don't depend on where the dir lives.
                if let Ok(relative) = entry.path().strip_prefix(root) {
                    paths.push(relative.to_path_buf());
                }
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            lookup: lookup_from_paths(&paths)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn files_ending_in<'a>(&'a self, end_path: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        let end_keyed = PathKey::from_path(Path::new(end_path)).0;

        self.lookup
            .iter()
            .filter(move |kv| kv.0.0.ends_with(&end_keyed))
            .map(|kv| self.root.join(kv.1))
    }
}

#[derive(Debug, Eq, PartialEq, Hash)]
struct PathKey(String);

impl PathKey {
    fn from_path(path: &Path) -> Self {
        let key = path
            .clean()
            .to_string_lossy()
            .to_lowercase()
            .replace('\\', "/");
        let key = if key.starts_with('/') {
            key
        } else {
            '/'.to_string() + &key
        };
        Self(key)
    }
}

fn lookup_from_paths(paths: &[PathBuf]) -> Result<HashMap<PathKey, PathBuf>> {
    let mut result = HashMap::new();
    for path in paths {
        let path = path.clean();

        // Extensionless files are never inputs or model files.
        if path.extension().is_some() && !path.components().any(|c| c.as_os_str() == "__MACOSX") {
            let key = PathKey::from_path(&path);
            if result.insert(key, path.clone()).is_some() {
                return Err(SceneSourceError::DuplicatePath(path));
            }
        }
    }
    Ok(result)
}
