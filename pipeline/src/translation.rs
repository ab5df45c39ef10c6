use std::collections::BTreeMap;
use std::path::Path;

/// Name a copied file gets: `frame_00001.jpg` for index 1 and suffix `.jpg`.
pub fn frame_name(index: usize, suffix: &str) -> String {
    format!("frame_{index:05}{suffix}")
}

/// Copy index of a name produced by [`frame_name`]: 3 for `frame_00003.png`.
pub fn frame_index(name: &str) -> Option<usize> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let digits = stem.strip_prefix("frame_")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `.jpg` for `a/b.jpg`, empty when there is no extension.
pub fn suffix_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Mapping from an original image name to the name it was copied under.
///
/// Only meaningful while the images still carry the names the copy stage gave them.
#[derive(Debug, Clone, PartialEq)]
pub enum NameTranslation {
    Valid(BTreeMap<String, String>),
    /// No copy stage ran, names are used as they are.
    Unavailable,
    /// The reconstruction ran on the copied images and its names are authoritative.
    Invalidated,
}

impl NameTranslation {
    /// The copied name for `original`. `None` means the name has no entry in a valid
    /// table; callers without a valid table get the name back unchanged.
    pub fn resolve<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self {
            NameTranslation::Valid(map) => map.get(original).map(String::as_str),
            NameTranslation::Unavailable | NameTranslation::Invalidated => Some(original),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, NameTranslation::Valid(_))
    }

    /// What is left after a reconstruction actually ran.
    pub fn invalidate(self) -> Self {
        NameTranslation::Invalidated
    }
}
