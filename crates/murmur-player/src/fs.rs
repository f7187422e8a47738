//! Filesystem access for asset discovery.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Where sound files are enumerated from.
pub trait AssetSource {
    fn exists(&self, path: &Path) -> bool;

    /// Entries directly inside `path`, in whatever order the source yields.
    fn entries(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl AssetSource for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Symlinks are followed, so a link to a directory counts as one.
    fn entries(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .map(|entry| {
                let entry = entry.map_err(io::Error::from)?;
                Ok(DirEntryInfo {
                    is_dir: entry.file_type().is_dir(),
                    path: entry.into_path(),
                })
            })
            .collect()
    }
}
