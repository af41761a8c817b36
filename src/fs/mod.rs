//! FileSystem abstraction for testable source-tree inspection

mod listing;
mod mock;
mod real;
mod r#trait;

pub use listing::{
    dependency_dir_filters, filter_paths, list_paths_sorted_by_components, PathFilter,
};
pub use mock::MockFileSystem;
pub use r#trait::{DirEntry, FileSystem, FileType};
pub use real::RealFileSystem;
