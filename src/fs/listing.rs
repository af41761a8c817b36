//! Source-tree listing and path filters shared by the detectors

use super::FileSystem;
use anyhow::Result;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::trace;

/// Directories never descended into while listing
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Lists every file and directory under `root`, relative to it, ordered by
/// component count and then lexically, so root-most matches come first.
pub fn list_paths_sorted_by_components(
    fs: &dyn FileSystem,
    root: &Path,
    max_depth: usize,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    walk(fs, root, Path::new(""), 1, max_depth, &mut paths)?;

    paths.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });

    trace!(root = %root.display(), count = paths.len(), "Listed source tree");
    Ok(paths)
}

fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    relative: &Path,
    depth: usize,
    max_depth: usize,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    if depth > max_depth {
        return Ok(());
    }

    for entry in fs.read_dir(&root.join(relative))? {
        let rel = relative.join(entry.file_name());
        let descend = entry.is_dir() && !SKIPPED_DIRS.contains(&entry.file_name());
        out.push(rel.clone());
        if descend {
            walk(fs, root, &rel, depth + 1, max_depth, out)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFilter {
    /// Keep paths whose file name equals the given name
    AllowBase(&'static str),
    /// Keep paths with the given extension (without the dot)
    AllowExtension(&'static str),
    /// Drop paths with any component equal to the given name
    ForbidComponent(&'static str),
    /// Drop paths with any component carrying the given extension
    ForbidComponentExtension(&'static str),
    /// Drop workspaces embedded inside an `.xcodeproj` bundle
    ForbidEmbeddedWorkspace,
}

impl PathFilter {
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            PathFilter::AllowBase(base) => path.file_name().and_then(|n| n.to_str()) == Some(base),
            PathFilter::AllowExtension(ext) => {
                path.extension().and_then(|e| e.to_str()) == Some(ext)
            }
            PathFilter::ForbidComponent(name) => !normal_components(path).any(|c| c == *name),
            PathFilter::ForbidComponentExtension(ext) => !normal_components(path)
                .any(|c| Path::new(c).extension().and_then(|e| e.to_str()) == Some(ext)),
            PathFilter::ForbidEmbeddedWorkspace => {
                !embedded_workspace_regex().is_match(&path.to_string_lossy())
            }
        }
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = &str> {
    path.components().filter_map(|c| match c {
        Component::Normal(name) => name.to_str(),
        _ => None,
    })
}

fn embedded_workspace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r".+\.xcodeproj/.+\.xcworkspace").expect("valid regex"))
}

/// Keeps the paths every filter accepts, preserving order
pub fn filter_paths(paths: &[PathBuf], filters: &[PathFilter]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| filters.iter().all(|f| f.matches(p)))
        .cloned()
        .collect()
}

/// Filters excluding dependency checkouts and vendored frameworks
pub fn dependency_dir_filters() -> Vec<PathFilter> {
    vec![
        PathFilter::ForbidComponent(".git"),
        PathFilter::ForbidComponent("Pods"),
        PathFilter::ForbidComponent("Carthage"),
        PathFilter::ForbidComponent("node_modules"),
        PathFilter::ForbidComponentExtension("framework"),
    ]
}
