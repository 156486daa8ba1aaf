//! 内存编辑缓冲区（无界面环境）

use crate::kernel::services::ports::buffer::BufferHost;
use crate::models::{FileRecord, ItemId};
use rustc_hash::FxHashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryBufferHost {
    buffers: Mutex<FxHashMap<ItemId, String>>,
}

impl MemoryBufferHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self, file_id: &ItemId) -> Option<String> {
        self.buffers
            .lock()
            .ok()
            .and_then(|buffers| buffers.get(file_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.buffers.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BufferHost for MemoryBufferHost {
    fn get_or_create(&self, file: &FileRecord) {
        if let Ok(mut buffers) = self.buffers.lock() {
            buffers
                .entry(file.id.clone())
                .or_insert_with(|| file.content.clone());
        }
    }

    fn set_content(&self, file_id: &ItemId, content: &str) {
        if let Ok(mut buffers) = self.buffers.lock() {
            buffers.insert(file_id.clone(), content.to_string());
        }
    }

    fn dispose(&self, file_id: &ItemId) {
        if let Ok(mut buffers) = self.buffers.lock() {
            buffers.remove(file_id);
        }
    }
}
