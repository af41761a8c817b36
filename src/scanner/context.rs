use crate::error::DetectionError;
use crate::fs::{list_paths_sorted_by_components, FileSystem};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// How deep the source tree is listed below the search directory
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Everything a detector may look at during one scan.
///
/// The source-tree listing is computed on first use and shared by every
/// detector of the scan.
pub struct ScanContext<'a> {
    fs: &'a dyn FileSystem,
    search_dir: PathBuf,
    max_depth: usize,
    file_list: OnceCell<Vec<PathBuf>>,
}

impl<'a> ScanContext<'a> {
    pub fn new(fs: &'a dyn FileSystem, search_dir: &Path) -> Self {
        Self {
            fs,
            search_dir: search_dir.to_path_buf(),
            max_depth: DEFAULT_MAX_DEPTH,
            file_list: OnceCell::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs
    }

    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Absolute path of `relative` inside the search directory
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.search_dir.join(relative)
    }

    /// Paths relative to the search directory, root-most first
    pub fn file_list(&self, detector: &str) -> Result<&[PathBuf], DetectionError> {
        if let Some(list) = self.file_list.get() {
            return Ok(list);
        }
        let list = list_paths_sorted_by_components(self.fs, &self.search_dir, self.max_depth)
            .map_err(|e| DetectionError::Io {
                detector: detector.to_string(),
                path: self.search_dir.clone(),
                message: format!("{:#}", e),
            })?;
        Ok(self.file_list.get_or_init(|| list))
    }

    pub fn exists(&self, relative: &Path) -> bool {
        self.fs.exists(&self.absolute(relative))
    }

    pub fn is_file(&self, relative: &Path) -> bool {
        self.fs.is_file(&self.absolute(relative))
    }

    pub fn read_to_string(&self, detector: &str, relative: &Path) -> Result<String, DetectionError> {
        self.fs
            .read_to_string(&self.absolute(relative))
            .map_err(|e| DetectionError::Io {
                detector: detector.to_string(),
                path: relative.to_path_buf(),
                message: format!("{:#}", e),
            })
    }
}
