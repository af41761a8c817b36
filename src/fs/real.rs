use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Symlinks are reported as such and never followed, so the source
    /// listing cannot loop through a linked directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .map(|entry| -> Result<DirEntry> {
                let entry = entry.with_context(|| format!("Failed to list {}", path.display()))?;
                let kind = entry.file_type()?;
                let file_type = if kind.is_symlink() {
                    FileType::Symlink
                } else if kind.is_dir() {
                    FileType::Directory
                } else {
                    FileType::File
                };
                Ok(DirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    path: entry.path(),
                    file_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        path.canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()))
    }
}
