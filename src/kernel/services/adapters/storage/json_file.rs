use super::{apply_ops, empty_tables, Tables, SCHEMA_VERSION};
use crate::kernel::services::ports::storage::{
    BatchOp, Collection, Result, StorageEngine, StoreError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Serialize, Deserialize)]
struct Document {
    schema_version: u32,
    #[serde(default)]
    collections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Whole workspace in one JSON document; every batch rewrites the file.
pub struct JsonFileEngine {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonFileEngine {
    /// Opens (or creates) the document at `path`.
    ///
    /// Unreadable, unparsable or newer-schema documents are reported as
    /// `StorageUnavailable`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let tables = if path.exists() {
            load_tables(&path)?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::StorageUnavailable(format!("{}: {e}", parent.display()))
                    })?;
                }
            }
            let tables = empty_tables();
            write_tables(&path, &tables)
                .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", path.display())))?;
            tables
        };

        tracing::debug!(path = %path.display(), "json store opened");
        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("json engine lock poisoned".into()))
    }

    /// 先写入副本，落盘成功后再替换内存状态
    fn commit(&self, mutate: impl FnOnce(&mut Tables)) -> Result<()> {
        let mut tables = self.tables()?;
        let mut next = tables.clone();
        mutate(&mut next);
        write_tables(&self.path, &next)?;
        *tables = next;
        Ok(())
    }
}

fn load_tables(path: &Path) -> Result<Tables> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", path.display())))?;
    let doc: Document = serde_json::from_str(&data)
        .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", path.display())))?;

    if doc.schema_version > SCHEMA_VERSION {
        return Err(StoreError::StorageUnavailable(format!(
            "{}: schema version {} is newer than supported version {}",
            path.display(),
            doc.schema_version,
            SCHEMA_VERSION
        )));
    }

    let mut tables = empty_tables();
    for (name, records) in doc.collections {
        match Collection::from_name(&name) {
            Some(collection) => {
                tables.insert(collection, records);
            }
            None => tracing::warn!(collection = %name, "ignoring unknown collection"),
        }
    }
    Ok(tables)
}

fn write_tables(path: &Path, tables: &Tables) -> Result<()> {
    let doc = Document {
        schema_version: SCHEMA_VERSION,
        collections: tables
            .iter()
            .map(|(collection, records)| (collection.name().to_string(), records.clone()))
            .collect(),
    };
    let data = serde_json::to_vec_pretty(&doc)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl StorageEngine for JsonFileEngine {
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
        if batch.is_empty() {
            return Ok(());
        }
        self.commit(|tables| apply_ops(tables, batch))
    }

    fn clear(&self, collections: &[Collection]) -> Result<()> {
        self.commit(|tables| {
            for collection in collections {
                if let Some(table) = tables.get_mut(collection) {
                    table.clear();
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/storage/json_file.rs"]
mod tests;
