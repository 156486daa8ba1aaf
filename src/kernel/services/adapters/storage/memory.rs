use super::{apply_ops, empty_tables, Tables, SCHEMA_VERSION};
use crate::kernel::services::ports::storage::{
    BatchOp, Collection, Result, StorageEngine, StoreError,
};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

pub struct MemoryEngine {
    tables: Mutex<Tables>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(empty_tables()),
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("memory engine lock poisoned".into()))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    fn schema_version(&self) -> u32 {
        SCHEMA_VERSION
    }

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        Ok(self
            .tables()?
            .get(&collection)
            .and_then(|table| table.get(key))
            .cloned())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self
            .tables()?
            .get(&collection)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    fn apply(&self, batch: Vec<BatchOp>) -> Result<()> {
        apply_ops(&mut *self.tables()?, batch);
        Ok(())
    }

    fn clear(&self, collections: &[Collection]) -> Result<()> {
        let mut tables = self.tables()?;
        for collection in collections {
            if let Some(table) = tables.get_mut(collection) {
                table.clear();
            }
        }
        Ok(())
    }
}
