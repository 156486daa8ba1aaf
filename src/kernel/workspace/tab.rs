use crate::models::{FileRecord, ItemId};

/// An open editing session over one stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    pub file: FileRecord,
    /// In-memory content differs from what was last persisted.
    pub is_dirty: bool,
}

impl Tab {
    pub fn new(file: FileRecord) -> Self {
        Self {
            file,
            is_dirty: false,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.file.id
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    pub fn content(&self) -> &str {
        &self.file.content
    }

    pub fn parent_id(&self) -> Option<&ItemId> {
        self.file.parent_id.as_ref()
    }
}
