use super::*;
use crate::kernel::services::adapters::storage::MemoryEngine;
use crate::models::DEFAULT_THEME;
use serde_json::json;
use std::sync::Mutex;

fn memory_store() -> PersistentStore {
    PersistentStore::open(Arc::new(MemoryEngine::new())).unwrap()
}

fn file_named(name: &str) -> NewFile {
    NewFile::new(name).with_language("javascript", "es2022")
}

fn paths_of_files(store: &PersistentStore) -> Vec<String> {
    let mut paths: Vec<String> = store
        .get_all_files()
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_create_paths_follow_parent() {
    let store = memory_store();
    let src = store.create_folder("src", None).unwrap();
    let utils = store.create_folder("utils", Some(&src.id)).unwrap();
    let helper = store.create_file(file_named("helper.js"), Some(&utils.id)).unwrap();
    let top = store.create_file(file_named("index.js"), None).unwrap();

    assert_eq!(src.path, "/src");
    assert_eq!(utils.path, "/src/utils");
    assert_eq!(helper.path, "/src/utils/helper.js");
    assert_eq!(top.path, "/index.js");
}

#[test]
fn test_rename_folder_moves_descendant_paths() {
    let store = memory_store();
    let src = store.create_folder("src", None).unwrap();
    let utils = store.create_folder("utils", Some(&src.id)).unwrap();
    store.create_file(file_named("helper.js"), Some(&utils.id)).unwrap();
    store.create_file(file_named("main.js"), Some(&src.id)).unwrap();
    store.create_file(file_named("srcfile.js"), None).unwrap();

    let renamed = store
        .update_folder(&src.id, FolderPatch::rename("lib"))
        .unwrap()
        .unwrap();
    assert_eq!(renamed.path, "/lib");

    assert_eq!(
        paths_of_files(&store),
        vec!["/lib/main.js", "/lib/utils/helper.js", "/srcfile.js"]
    );
    let mut folders: Vec<String> = store
        .get_all_folders()
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    folders.sort();
    assert_eq!(folders, vec!["/lib", "/lib/utils"]);
}

#[test]
fn test_update_missing_returns_none() {
    let store = memory_store();
    let ghost = ItemId::from("ghost");

    assert!(store
        .update_folder(&ghost, FolderPatch::rename("x"))
        .unwrap()
        .is_none());
    assert!(store
        .update_file(&ghost, FilePatch::content("x"))
        .unwrap()
        .is_none());
    assert!(!store.delete_folder(&ghost).unwrap());
    assert!(!store.delete_file(&ghost).unwrap());
    assert!(store.get_file(&ghost).unwrap().is_none());
}

#[test]
fn test_delete_folder_cascades() {
    let store = memory_store();
    let a = store.create_folder("a", None).unwrap();
    let b = store.create_folder("b", Some(&a.id)).unwrap();
    let c = store.create_folder("c", Some(&b.id)).unwrap();
    let keep = store.create_folder("keep", None).unwrap();
    store.create_file(file_named("1.js"), Some(&a.id)).unwrap();
    store.create_file(file_named("2.js"), Some(&c.id)).unwrap();
    let survivor = store.create_file(file_named("3.js"), Some(&keep.id)).unwrap();
    let root_file = store.create_file(file_named("4.js"), None).unwrap();

    assert!(store.delete_folder(&a.id).unwrap());

    let files = store.get_all_files().unwrap();
    let ids: Vec<&ItemId> = files.iter().map(|f| &f.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&&survivor.id));
    assert!(ids.contains(&&root_file.id));

    let folders = store.get_all_folders().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].id, keep.id);
}

#[test]
fn test_delete_folder_with_cyclic_parents_terminates() {
    let engine = Arc::new(MemoryEngine::new());
    let store = PersistentStore::open(engine.clone()).unwrap();
    let a = store.create_folder("a", None).unwrap();
    let b = store.create_folder("b", Some(&a.id)).unwrap();

    // 直接写引擎制造环：a -> b -> a
    let mut raw = engine.get(Collection::Folders, a.id.as_str()).unwrap().unwrap();
    raw["parent_id"] = json!(b.id.as_str());
    engine.put(Collection::Folders, a.id.as_str(), raw).unwrap();

    assert!(!store.get_all_folders().unwrap().is_empty());
    assert!(store.delete_folder(&a.id).unwrap());
    assert!(store.get_all_folders().unwrap().is_empty());
}

#[test]
fn test_sibling_order_is_monotone() {
    let store = memory_store();
    let dir = store.create_folder("dir", None).unwrap();

    let orders: Vec<i64> = (0..5)
        .map(|i| {
            store
                .create_file(file_named(&format!("f{i}.js")), Some(&dir.id))
                .unwrap()
                .order
        })
        .collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4]);

    // 不同父目录各自计数
    let other = store.create_file(file_named("root.js"), None).unwrap();
    assert_eq!(other.order, 0);

    let sorted: Vec<i64> = store
        .get_all_files()
        .unwrap()
        .into_iter()
        .filter(|f| f.parent_id.as_ref() == Some(&dir.id))
        .map(|f| f.order)
        .collect();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
}

/// Serves the first `get_all(Files)` snapshot forever, like two creates that
/// both read before either writes.
struct StaleFilesEngine {
    inner: MemoryEngine,
    snapshot: Mutex<Option<Vec<Value>>>,
}

impl StorageEngine for StaleFilesEngine {
    fn schema_version(&self) -> u32 {
        self.inner.schema_version()
    }

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.inner.get(collection, key)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        if collection != Collection::Files {
            return self.inner.get_all(collection);
        }
        let mut snapshot = self.snapshot.lock().unwrap();
        if snapshot.is_none() {
            *snapshot = Some(self.inner.get_all(collection)?);
        }
        Ok(snapshot.clone().unwrap_or_default())
    }

    fn apply(&self, batch: Vec<BatchOp>) -> Result<()> {
        self.inner.apply(batch)
    }

    fn clear(&self, collections: &[Collection]) -> Result<()> {
        self.inner.clear(collections)
    }
}

#[test]
fn test_racing_creates_may_share_order() {
    let store = PersistentStore::open(Arc::new(StaleFilesEngine {
        inner: MemoryEngine::new(),
        snapshot: Mutex::new(None),
    }))
    .unwrap();

    let first = store.create_file(file_named("a.js"), None).unwrap();
    let second = store.create_file(file_named("b.js"), None).unwrap();

    // 排序值不是原子分配的：同一父目录下出现重复值
    assert_eq!(first.order, second.order);
}

#[test]
fn test_update_file_content_roundtrip() {
    let store = memory_store();
    let file = store.create_file(file_named("main.js"), None).unwrap();
    let content = "line one\n\tline two\r\n\u{1F600} emoji\n";

    let updated = store
        .update_file(&file.id, FilePatch::content(content))
        .unwrap()
        .unwrap();
    assert!(updated.updated_at >= file.updated_at);

    let loaded = store.get_file(&file.id).unwrap().unwrap();
    assert_eq!(loaded.content, content);
    assert_eq!(loaded.created_at, file.created_at);
}

#[test]
fn test_rename_file_recomputes_path() {
    let store = memory_store();
    let dir = store.create_folder("dir", None).unwrap();
    let file = store.create_file(file_named("a.js"), Some(&dir.id)).unwrap();

    let renamed = store
        .update_file(&file.id, FilePatch::rename("b.js"))
        .unwrap()
        .unwrap();
    assert_eq!(renamed.path, "/dir/b.js");
}

#[test]
fn test_move_folder_into_descendant_is_rejected() {
    let store = memory_store();
    let a = store.create_folder("a", None).unwrap();
    let b = store.create_folder("b", Some(&a.id)).unwrap();

    let patch = FolderPatch {
        parent_id: Some(Some(b.id.clone())),
        ..FolderPatch::default()
    };
    let result = store.update_folder(&a.id, patch);
    assert!(matches!(result, Err(StoreError::InvalidParent { .. })));

    let moved = store
        .update_folder(
            &b.id,
            FolderPatch {
                parent_id: Some(None),
                ..FolderPatch::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(moved.path, "/b");
}

#[test]
fn test_create_under_missing_parent_lands_at_root() {
    let store = memory_store();
    let file = store
        .create_file(file_named("a.js"), Some(&ItemId::from("missing")))
        .unwrap();

    assert!(file.parent_id.is_none());
    assert_eq!(file.path, "/a.js");
}

#[test]
fn test_paths_are_not_persisted() {
    let engine = Arc::new(MemoryEngine::new());
    let store = PersistentStore::open(engine.clone()).unwrap();
    let file = store.create_file(file_named("a.js"), None).unwrap();

    let raw = engine.get(Collection::Files, file.id.as_str()).unwrap().unwrap();
    assert!(raw.get("path").is_none());
}

#[test]
fn test_workspace_state_defaults_and_saves() {
    let store = memory_store();
    let state = store.get_workspace_state().unwrap();
    assert_eq!(state.active_file_id, None);
    assert_eq!(state.theme, DEFAULT_THEME);

    let saved = WorkspaceState {
        active_file_id: Some(ItemId::from("f1")),
        theme: "light".to_string(),
    };
    store.save_workspace_state(&saved).unwrap();
    assert_eq!(store.get_workspace_state().unwrap(), saved);
}

#[test]
fn test_ensure_workspace_state_seeds_theme_once() {
    let store = memory_store();

    let seeded = store.ensure_workspace_state("light").unwrap();
    assert_eq!(seeded.theme, "light");
    assert_eq!(store.get_workspace_state().unwrap().theme, "light");

    let kept = store.ensure_workspace_state("hc-black").unwrap();
    assert_eq!(kept.theme, "light");
}

#[test]
fn test_clear_all() {
    let store = memory_store();
    let dir = store.create_folder("dir", None).unwrap();
    store.create_file(file_named("a.js"), Some(&dir.id)).unwrap();
    store
        .save_workspace_state(&WorkspaceState {
            active_file_id: None,
            theme: "light".into(),
        })
        .unwrap();

    store.clear_all().unwrap();

    assert!(store.get_all_files().unwrap().is_empty());
    assert!(store.get_all_folders().unwrap().is_empty());
    assert_eq!(store.get_workspace_state().unwrap(), WorkspaceState::default());
}

#[test]
fn test_export_import_restores_workspace() {
    let source = memory_store();
    let dir = source.create_folder("src", None).unwrap();
    let file = source
        .create_file(file_named("a.js").with_content("let a = 1;"), Some(&dir.id))
        .unwrap();
    source
        .save_workspace_state(&WorkspaceState {
            active_file_id: Some(file.id.clone()),
            theme: "light".into(),
        })
        .unwrap();

    let doc = source.export_all().unwrap();
    assert_eq!(doc.files[0].path, "/src/a.js");
    let json = serde_json::to_string(&doc).unwrap();

    let target = memory_store();
    target.create_file(file_named("stale.js"), None).unwrap();
    let summary = target
        .import_all(serde_json::from_str(&json).unwrap())
        .unwrap();

    assert_eq!(summary, ImportSummary { files: 1, folders: 1 });
    let files = target.get_all_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, file.id);
    assert_eq!(files[0].path, "/src/a.js");
    assert_eq!(files[0].content, "let a = 1;");
    assert_eq!(
        target.get_workspace_state().unwrap().active_file_id,
        Some(file.id)
    );
}

#[test]
fn test_import_without_folders_reparents_to_root() {
    let source = memory_store();
    let dir = source.create_folder("src", None).unwrap();
    source.create_file(file_named("a.js"), Some(&dir.id)).unwrap();

    let mut doc = source.export_all().unwrap();
    doc.folders.clear();

    let target = memory_store();
    target.import_all(doc).unwrap();

    let files = target.get_all_files().unwrap();
    assert!(files[0].parent_id.is_none());
    assert_eq!(files[0].path, "/a.js");
}

struct BrokenEngine;

impl StorageEngine for BrokenEngine {
    fn schema_version(&self) -> u32 {
        1
    }

    fn get(&self, _collection: Collection, _key: &str) -> Result<Option<Value>> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }

    fn get_all(&self, _collection: Collection) -> Result<Vec<Value>> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }

    fn apply(&self, _batch: Vec<BatchOp>) -> Result<()> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }

    fn clear(&self, _collections: &[Collection]) -> Result<()> {
        Err(StoreError::Io(std::io::Error::other("disk gone")))
    }
}

#[test]
fn test_open_broken_engine_is_unavailable() {
    let result = PersistentStore::open(Arc::new(BrokenEngine));
    assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
}
