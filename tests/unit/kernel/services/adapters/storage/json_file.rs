use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_open_creates_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("workspace.json");

    let engine = JsonFileEngine::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(engine.schema_version(), SCHEMA_VERSION);
    assert!(engine.get_all(Collection::Files).unwrap().is_empty());
}

#[test]
fn test_batch_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("workspace.json");

    {
        let engine = JsonFileEngine::open(&path).unwrap();
        engine
            .apply(vec![
                BatchOp::put(Collection::Files, "a", json!({ "name": "a.js" })),
                BatchOp::put(Collection::Folders, "f", json!({ "name": "src" })),
            ])
            .unwrap();
        engine.delete(Collection::Folders, "f").unwrap();
    }

    let engine = JsonFileEngine::open(&path).unwrap();
    let file = engine.get(Collection::Files, "a").unwrap().unwrap();
    assert_eq!(file["name"], "a.js");
    assert!(engine.get(Collection::Folders, "f").unwrap().is_none());
}

#[test]
fn test_clear_selected_collections() {
    let dir = tempdir().unwrap();
    let engine = JsonFileEngine::open(dir.path().join("ws.json")).unwrap();
    engine.put(Collection::Files, "a", json!(1)).unwrap();
    engine.put(Collection::Meta, "m", json!(2)).unwrap();

    engine.clear(&[Collection::Files]).unwrap();

    assert!(engine.get_all(Collection::Files).unwrap().is_empty());
    assert_eq!(engine.get_all(Collection::Meta).unwrap().len(), 1);
}

#[test]
fn test_corrupt_document_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = JsonFileEngine::open(&path);
    assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
}

#[test]
fn test_newer_schema_is_unavailable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    std::fs::write(&path, r#"{ "schema_version": 99, "collections": {} }"#).unwrap();

    let result = JsonFileEngine::open(&path);
    assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
}
