use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use dataset::ColmapModel;
use dataset::sparse_depth::{SparseDepthParams, export_sparse_depth};
use crate::error::Result;
use crate::images::MaskOutput;
use crate::layout::OutputLayout;
use crate::reconstruct::Reconstructed;
use crate::summary::Summary;
use crate::translation::{NameTranslation, frame_index, frame_name, suffix_of};

/// Where depth comes from, decided once from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum DepthSource {
    /// Derived from the reconstruction; `sparse` renders its 3D points.
    FromReconstruction { sparse: bool },
    /// Depth images copied during preprocessing, in copy order.
    FromExternalDirectory(Vec<PathBuf>),
}

/// Depth file per frame. Frames without an entry have no depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DepthTable {
    #[default]
    Empty,
    /// Keyed by reconstruction image id.
    ByImageId(BTreeMap<i32, PathBuf>),
    /// Keyed by the 1-based copy index, so depth `i` pairs with image `frame_{i:05}`.
    ByFrameIndex(BTreeMap<usize, PathBuf>),
}

impl DepthTable {
    /// Depth for the reconstructed image `image_id`, stored as `image_name` in the
    /// image directory. Unposed images leave gaps, so the copy index comes from the
    /// name and never from the frame's position in the manifest.
    pub fn lookup(&self, image_name: &str, image_id: i32) -> Option<&Path> {
        let path = match self {
            DepthTable::Empty => None,
            DepthTable::ByImageId(table) => table.get(&image_id),
            DepthTable::ByFrameIndex(table) => frame_index(image_name).and_then(|i| table.get(&i)),
        };
        path.map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        match self {
            DepthTable::Empty => 0,
            DepthTable::ByImageId(table) => table.len(),
            DepthTable::ByFrameIndex(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State once every frame's depth file, if any, is known.
#[derive(Debug, Clone)]
pub struct DepthResolved {
    pub model: ColmapModel,
    pub num_frames: usize,
    pub translation: NameTranslation,
    pub depth: DepthTable,
    pub mask: Option<MaskOutput>,
    pub summary: Summary,
}

impl Reconstructed {
    pub async fn resolve_depth(self, layout: &OutputLayout) -> Result<DepthResolved> {
        let mut summary = self.summary;

        let depth = match &self.depth_source {
            DepthSource::FromReconstruction { sparse: false } => DepthTable::Empty,
            DepthSource::FromReconstruction { sparse: true } => {
                let written =
                    export_sparse_depth(&self.model, &layout.depth_dir(), SparseDepthParams::default()).await?;
                summary.push(format!("Created sparse depth maps for {} images", written.len()));
                DepthTable::ByImageId(written)
            }
            DepthSource::FromExternalDirectory(copied) => {
                let depth_dir = layout.depth_dir();
                let table = copied
                    .iter()
                    .enumerate()
                    .map(|(i, path)| (i + 1, depth_dir.join(frame_name(i + 1, &suffix_of(path)))))
                    .collect();
                DepthTable::ByFrameIndex(table)
            }
        };
        log::debug!("Resolved depth for {} frames", depth.len());

        Ok(DepthResolved {
            model: self.model,
            num_frames: self.num_frames,
            translation: self.translation,
            depth,
            mask: self.mask,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::model_with_names;

    fn reconstructed(depth_source: DepthSource) -> Reconstructed {
        Reconstructed {
            model: model_with_names(&["frame_00001.jpg", "frame_00002.jpg"]),
            num_frames: 2,
            translation: NameTranslation::Invalidated,
            depth_source,
            mask: None,
            summary: Summary::new(),
        }
    }

    #[tokio::test]
    async fn external_depth_by_frame_index() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), None);
        let copied = vec![
            layout.depth_dir().join("frame_00001.png"),
            layout.depth_dir().join("frame_00002.png"),
            layout.depth_dir().join("frame_00003.tif"),
        ];

        let resolved = reconstructed(DepthSource::FromExternalDirectory(copied))
            .resolve_depth(&layout)
            .await
            .unwrap();

        let DepthTable::ByFrameIndex(table) = &resolved.depth else {
            panic!("expected a frame index table");
        };
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(table[&3], layout.depth_dir().join("frame_00003.tif"));
        assert_eq!(
            resolved.depth.lookup("frame_00002.jpg", 99),
            Some(layout.depth_dir().join("frame_00002.png").as_path())
        );
        assert_eq!(resolved.depth.lookup("IMG_0002.jpg", 2), None);
        assert!(resolved.summary.is_empty());
    }

    #[tokio::test]
    async fn no_depth() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), None);
        let resolved = reconstructed(DepthSource::FromReconstruction { sparse: false })
            .resolve_depth(&layout)
            .await
            .unwrap();
        assert_eq!(resolved.depth, DepthTable::Empty);
        assert_eq!(resolved.depth.lookup("frame_00001.jpg", 1), None);
        assert!(!layout.depth_dir().exists());
    }

    #[tokio::test]
    async fn sparse_depth_by_image_id() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), None);
        let resolved = reconstructed(DepthSource::FromReconstruction { sparse: true })
            .resolve_depth(&layout)
            .await
            .unwrap();

        assert_eq!(resolved.depth.len(), 2);
        assert_eq!(resolved.depth.lookup("frame_00007.jpg", 2), Some(layout.depth_dir().join("frame_00002.png").as_path()));
        assert!(resolved.summary.contains("Created sparse depth maps for 2 images"));
    }
}
