//! 数据模型层

pub mod hierarchy;
pub mod id;
pub mod naming;
pub mod record;

pub use hierarchy::{descendant_closure, join_path, PathResolver};
pub use id::{ItemId, Timestamp};
pub use naming::{split_extension, unique_name, with_extension};
pub use record::{
    ExportDocument, FilePatch, FileRecord, FolderPatch, FolderRecord, NewFile, WorkspaceState,
    DEFAULT_THEME, EXPORT_FORMAT_VERSION,
};
