//! Editor buffer contract. The workspace never looks inside a buffer.

use crate::models::{FileRecord, ItemId};

pub trait BufferHost: Send + Sync {
    fn get_or_create(&self, file: &FileRecord);

    fn set_content(&self, file_id: &ItemId, content: &str);

    fn dispose(&self, file_id: &ItemId);
}
