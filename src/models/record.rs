//! 持久化记录：文件、文件夹、工作区状态

use super::id::{ItemId, Timestamp};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THEME: &str = "vs-dark";
pub const EXPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: ItemId,
    pub name: String,
    /// Resolved from the parent chain on read; never written to the engine.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_user_modified: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_expanded: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Metadata for a file that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub name: String,
    pub language: String,
    pub version: String,
    pub content: String,
    pub is_user_modified: bool,
}

impl NewFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>, version: impl Into<String>) -> Self {
        self.language = language.into();
        self.version = version.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// Partial update for a file. `None` leaves the field untouched; `parent_id`
/// uses `Some(None)` to move the file to root.
#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<ItemId>>,
    pub language: Option<String>,
    pub version: Option<String>,
    pub content: Option<String>,
    pub order: Option<i64>,
    pub is_user_modified: Option<bool>,
}

impl FilePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, file: &mut FileRecord) {
        if let Some(name) = self.name {
            file.name = name;
        }
        if let Some(parent_id) = self.parent_id {
            file.parent_id = parent_id;
        }
        if let Some(language) = self.language {
            file.language = language;
        }
        if let Some(version) = self.version {
            file.version = version;
        }
        if let Some(content) = self.content {
            file.content = content;
        }
        if let Some(order) = self.order {
            file.order = order;
        }
        if let Some(flag) = self.is_user_modified {
            file.is_user_modified = flag;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<ItemId>>,
    pub order: Option<i64>,
    pub is_expanded: Option<bool>,
}

impl FolderPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, folder: &mut FolderRecord) {
        if let Some(name) = self.name {
            folder.name = name;
        }
        if let Some(parent_id) = self.parent_id {
            folder.parent_id = parent_id;
        }
        if let Some(order) = self.order {
            folder.order = order;
        }
        if let Some(expanded) = self.is_expanded {
            folder.is_expanded = expanded;
        }
    }
}

/// "Where the user left off."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default)]
    pub active_file_id: Option<ItemId>,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self {
            active_file_id: None,
            theme: default_theme(),
        }
    }
}

/// Backup document produced by `export_all` and consumed by `import_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default = "default_export_version")]
    pub version: u32,
    #[serde(default)]
    pub exported_at: Option<Timestamp>,
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
    #[serde(default)]
    pub workspace_state: WorkspaceState,
}

fn default_export_version() -> u32 {
    EXPORT_FORMAT_VERSION
}
