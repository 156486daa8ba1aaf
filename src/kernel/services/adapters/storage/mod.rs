//! 存储引擎实现
//!
//! - MemoryEngine: 进程内存，测试与临时工作区
//! - JsonFileEngine: 单个 JSON 文档落盘，临时文件 + rename 保证原子写入

mod json_file;
mod memory;

use crate::kernel::services::ports::storage::{BatchOp, Collection};
use serde_json::Value;
use std::collections::BTreeMap;

pub use json_file::JsonFileEngine;
pub use memory::MemoryEngine;

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) type Tables = BTreeMap<Collection, BTreeMap<String, Value>>;

pub(crate) fn empty_tables() -> Tables {
    Collection::ALL
        .into_iter()
        .map(|c| (c, BTreeMap::new()))
        .collect()
}

pub(crate) fn apply_ops(tables: &mut Tables, batch: Vec<BatchOp>) {
    for op in batch {
        match op {
            BatchOp::Put {
                collection,
                key,
                value,
            } => {
                tables.entry(collection).or_default().insert(key, value);
            }
            BatchOp::Delete { collection, key } => {
                if let Some(table) = tables.get_mut(&collection) {
                    table.remove(&key);
                }
            }
        }
    }
}
