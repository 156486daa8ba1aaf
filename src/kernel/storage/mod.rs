//! 持久化存储：文件 / 文件夹 / 工作区状态
//!
//! - 记录只保存 `parent_id` + `name`，路径读取时解析，重命名无需级联写入
//! - 删除文件夹时在同一个引擎批次中删除整棵子树
//! - 排序值不做原子检查：并发创建可能得到相同的 `order`

use crate::kernel::services::ports::storage::{
    BatchOp, Collection, Result, StorageEngine, StoreError,
};
use crate::models::id::now as current_time;
use crate::models::{
    descendant_closure, ExportDocument, FilePatch, FileRecord, FolderPatch, FolderRecord,
    ItemId, NewFile, PathResolver, WorkspaceState, EXPORT_FORMAT_VERSION,
};
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const WORKSPACE_STATE_KEY: &str = "workspace_state";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: usize,
    pub folders: usize,
}

pub struct PersistentStore {
    engine: Arc<dyn StorageEngine>,
}

impl PersistentStore {
    /// Checks the engine once; any failure is `StorageUnavailable`.
    pub fn open(engine: Arc<dyn StorageEngine>) -> Result<Self> {
        engine
            .get(Collection::Meta, WORKSPACE_STATE_KEY)
            .map_err(|e| match e {
                StoreError::StorageUnavailable(msg) => StoreError::StorageUnavailable(msg),
                other => StoreError::StorageUnavailable(other.to_string()),
            })?;
        tracing::debug!(schema = engine.schema_version(), "persistent store ready");
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }

    // ---------------------------------------------------------------
    // folders
    // ---------------------------------------------------------------

    pub fn create_folder(&self, name: &str, parent_id: Option<&ItemId>) -> Result<FolderRecord> {
        let folders = self.load_folders()?;
        let parent_id = existing_parent(&folders, parent_id);
        let order = next_order(
            folders
                .iter()
                .filter(|f| f.parent_id.as_ref() == parent_id.as_ref())
                .map(|f| f.order),
        );

        let now = current_time();
        let mut folder = FolderRecord {
            id: ItemId::generate(),
            name: name.to_string(),
            path: String::new(),
            parent_id,
            order,
            is_expanded: false,
            created_at: now,
            updated_at: now,
        };
        self.engine.put(
            Collection::Folders,
            folder.id.as_str(),
            encode(&strip_folder_path(&folder))?,
        )?;

        folder.path = resolver_for(&folders).child_path(folder.parent_id.as_ref(), &folder.name);
        tracing::info!(id = %folder.id, path = %folder.path, "folder created");
        Ok(folder)
    }

    pub fn get_folder(&self, id: &ItemId) -> Result<Option<FolderRecord>> {
        let folders = self.load_folders()?;
        let mut resolver = resolver_for(&folders);
        Ok(folders.into_iter().find(|f| &f.id == id).map(|mut f| {
            f.path = resolver.folder_path(&f.id);
            f
        }))
    }

    /// Applies `patch`; descendants follow a rename or move through path
    /// resolution. `None` when the folder does not exist.
    pub fn update_folder(&self, id: &ItemId, patch: FolderPatch) -> Result<Option<FolderRecord>> {
        let mut folders = self.load_folders()?;
        let Some(index) = folders.iter().position(|f| &f.id == id) else {
            return Ok(None);
        };

        if let Some(Some(parent)) = &patch.parent_id {
            let subtree = descendant_closure(
                id,
                folders.iter().map(|f| (&f.id, f.parent_id.as_ref())),
            );
            let parent_exists = folders.iter().any(|f| &f.id == parent);
            if subtree.contains(parent) || !parent_exists {
                return Err(StoreError::InvalidParent {
                    id: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        let old_path = resolver_for(&folders).folder_path(id);
        let folder = &mut folders[index];
        patch.apply(folder);
        folder.updated_at = current_time();
        let mut updated = folder.clone();
        self.engine.put(
            Collection::Folders,
            updated.id.as_str(),
            encode(&strip_folder_path(&updated))?,
        )?;

        updated.path = resolver_for(&folders).folder_path(id);
        if updated.path != old_path {
            tracing::debug!(id = %id, from = %old_path, to = %updated.path, "folder path changed");
        }
        Ok(Some(updated))
    }

    /// Deletes the folder, every folder beneath it and every file parented
    /// anywhere in that subtree, in one batch. `false` when missing.
    pub fn delete_folder(&self, id: &ItemId) -> Result<bool> {
        let folders = self.load_folders()?;
        if !folders.iter().any(|f| &f.id == id) {
            return Ok(false);
        }

        let closure = descendant_closure(
            id,
            folders.iter().map(|f| (&f.id, f.parent_id.as_ref())),
        );
        let files: Vec<FileRecord> = self.load(Collection::Files)?;

        let mut batch = Vec::new();
        let mut removed_files = 0usize;
        for file in &files {
            if file.parent_id.as_ref().is_some_and(|p| closure.contains(p)) {
                batch.push(BatchOp::delete(Collection::Files, file.id.as_str()));
                removed_files += 1;
            }
        }
        for folder_id in &closure {
            batch.push(BatchOp::delete(Collection::Folders, folder_id.as_str()));
        }
        self.engine.apply(batch)?;

        tracing::info!(
            id = %id,
            folders = closure.len(),
            files = removed_files,
            "folder subtree deleted"
        );
        Ok(true)
    }

    pub fn get_all_folders(&self) -> Result<Vec<FolderRecord>> {
        let mut folders = self.load_folders()?;
        let mut resolver = resolver_for(&folders);
        for folder in &mut folders {
            folder.path = resolver.folder_path(&folder.id);
        }
        folders.sort_by_key(|f| f.order);
        Ok(folders)
    }

    // ---------------------------------------------------------------
    // files
    // ---------------------------------------------------------------

    pub fn create_file(&self, meta: NewFile, parent_id: Option<&ItemId>) -> Result<FileRecord> {
        let folders = self.load_folders()?;
        let files: Vec<FileRecord> = self.load(Collection::Files)?;
        let parent_id = existing_parent(&folders, parent_id);
        let order = next_order(
            files
                .iter()
                .filter(|f| f.parent_id.as_ref() == parent_id.as_ref())
                .map(|f| f.order),
        );

        let now = current_time();
        let mut file = FileRecord {
            id: ItemId::generate(),
            name: meta.name,
            path: String::new(),
            parent_id,
            language: meta.language,
            version: meta.version,
            content: meta.content,
            order,
            is_user_modified: meta.is_user_modified,
            created_at: now,
            updated_at: now,
        };
        self.engine.put(
            Collection::Files,
            file.id.as_str(),
            encode(&strip_file_path(&file))?,
        )?;

        file.path = resolver_for(&folders).child_path(file.parent_id.as_ref(), &file.name);
        tracing::info!(id = %file.id, path = %file.path, order, "file created");
        Ok(file)
    }

    pub fn get_file(&self, id: &ItemId) -> Result<Option<FileRecord>> {
        let Some(value) = self.engine.get(Collection::Files, id.as_str())? else {
            return Ok(None);
        };
        let mut file: FileRecord = decode(value)?;
        let folders = self.load_folders()?;
        file.path = resolver_for(&folders).child_path(file.parent_id.as_ref(), &file.name);
        Ok(Some(file))
    }

    /// Applies `patch` and bumps `updated_at`. `None` when the file does not
    /// exist.
    pub fn update_file(&self, id: &ItemId, patch: FilePatch) -> Result<Option<FileRecord>> {
        let Some(value) = self.engine.get(Collection::Files, id.as_str())? else {
            return Ok(None);
        };
        let mut file: FileRecord = decode(value)?;
        let folders = self.load_folders()?;

        if let Some(Some(parent)) = &patch.parent_id {
            if !folders.iter().any(|f| &f.id == parent) {
                return Err(StoreError::InvalidParent {
                    id: id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }

        patch.apply(&mut file);
        file.updated_at = current_time();
        self.engine.put(
            Collection::Files,
            file.id.as_str(),
            encode(&strip_file_path(&file))?,
        )?;

        file.path = resolver_for(&folders).child_path(file.parent_id.as_ref(), &file.name);
        tracing::debug!(id = %id, path = %file.path, "file updated");
        Ok(Some(file))
    }

    pub fn delete_file(&self, id: &ItemId) -> Result<bool> {
        if self.engine.get(Collection::Files, id.as_str())?.is_none() {
            return Ok(false);
        }
        self.engine.delete(Collection::Files, id.as_str())?;
        tracing::info!(id = %id, "file deleted");
        Ok(true)
    }

    pub fn get_all_files(&self) -> Result<Vec<FileRecord>> {
        let folders = self.load_folders()?;
        let mut files: Vec<FileRecord> = self.load(Collection::Files)?;
        let mut resolver = resolver_for(&folders);
        for file in &mut files {
            file.path = resolver.child_path(file.parent_id.as_ref(), &file.name);
        }
        files.sort_by_key(|f| f.order);
        Ok(files)
    }

    // ---------------------------------------------------------------
    // workspace state / maintenance
    // ---------------------------------------------------------------

    pub fn get_workspace_state(&self) -> Result<WorkspaceState> {
        match self.engine.get(Collection::Meta, WORKSPACE_STATE_KEY)? {
            Some(value) => decode(value),
            None => Ok(WorkspaceState::default()),
        }
    }

    /// Stored state, or a fresh one with `theme` persisted when none exists.
    pub fn ensure_workspace_state(&self, theme: &str) -> Result<WorkspaceState> {
        if let Some(value) = self.engine.get(Collection::Meta, WORKSPACE_STATE_KEY)? {
            return decode(value);
        }
        let state = WorkspaceState {
            theme: theme.to_string(),
            ..WorkspaceState::default()
        };
        self.save_workspace_state(&state)?;
        tracing::debug!(theme, "workspace state seeded");
        Ok(state)
    }

    pub fn save_workspace_state(&self, state: &WorkspaceState) -> Result<()> {
        self.engine
            .put(Collection::Meta, WORKSPACE_STATE_KEY, encode(state)?)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.engine.clear(&Collection::ALL)?;
        tracing::info!("store cleared");
        Ok(())
    }

    pub fn export_all(&self) -> Result<ExportDocument> {
        Ok(ExportDocument {
            version: EXPORT_FORMAT_VERSION,
            exported_at: Some(current_time()),
            files: self.get_all_files()?,
            folders: self.get_all_folders()?,
            workspace_state: self.get_workspace_state()?,
        })
    }

    /// Replaces the whole workspace with `doc` in one batch.
    ///
    /// Parents that the document does not contain are dropped, so files
    /// from folder-less exports land at root.
    pub fn import_all(&self, doc: ExportDocument) -> Result<ImportSummary> {
        let folder_ids: FxHashSet<ItemId> = doc.folders.iter().map(|f| f.id.clone()).collect();
        let mut batch = Vec::new();

        for collection in [Collection::Files, Collection::Folders] {
            for value in self.engine.get_all(collection)? {
                if let Some(key) = value.get("id").and_then(Value::as_str) {
                    batch.push(BatchOp::delete(collection, key));
                }
            }
        }

        for mut folder in doc.folders {
            if folder.parent_id.as_ref().is_some_and(|p| !folder_ids.contains(p)) {
                folder.parent_id = None;
            }
            batch.push(BatchOp::put(
                Collection::Folders,
                folder.id.as_str(),
                encode(&strip_folder_path(&folder))?,
            ));
        }
        let folders = folder_ids.len();

        let mut files = 0usize;
        for mut file in doc.files {
            if file.parent_id.as_ref().is_some_and(|p| !folder_ids.contains(p)) {
                tracing::warn!(id = %file.id, "imported file references missing folder");
                file.parent_id = None;
            }
            batch.push(BatchOp::put(
                Collection::Files,
                file.id.as_str(),
                encode(&strip_file_path(&file))?,
            ));
            files += 1;
        }

        batch.push(BatchOp::put(
            Collection::Meta,
            WORKSPACE_STATE_KEY,
            encode(&doc.workspace_state)?,
        ));
        self.engine.apply(batch)?;

        tracing::info!(files, folders, "workspace imported");
        Ok(ImportSummary { files, folders })
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        self.engine
            .get_all(collection)?
            .into_iter()
            .map(decode)
            .collect()
    }

    fn load_folders(&self) -> Result<Vec<FolderRecord>> {
        self.load(Collection::Folders)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

fn strip_file_path(file: &FileRecord) -> FileRecord {
    FileRecord {
        path: String::new(),
        ..file.clone()
    }
}

fn strip_folder_path(folder: &FolderRecord) -> FolderRecord {
    FolderRecord {
        path: String::new(),
        ..folder.clone()
    }
}

fn resolver_for(folders: &[FolderRecord]) -> PathResolver {
    PathResolver::new(
        folders
            .iter()
            .map(|f| (&f.id, f.parent_id.as_ref(), f.name.as_str())),
    )
}

fn next_order(orders: impl Iterator<Item = i64>) -> i64 {
    orders.max().map_or(0, |max| max + 1)
}

/// 父文件夹不存在时落到根目录，避免产生孤儿记录
fn existing_parent(folders: &[FolderRecord], parent_id: Option<&ItemId>) -> Option<ItemId> {
    let parent = parent_id?;
    if folders.iter().any(|f| &f.id == parent) {
        Some(parent.clone())
    } else {
        tracing::warn!(parent = %parent, "parent folder missing, using root");
        None
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/storage.rs"]
mod tests;
