use super::*;
use crate::kernel::services::adapters::storage::MemoryEngine;
use crate::kernel::services::adapters::buffers::MemoryBufferHost;
use crate::kernel::services::adapters::languages::BuiltinLanguages;
use crate::kernel::workspace::WorkspaceManager;
use crate::models::NewFile;
use std::sync::Mutex;

fn store_with(files: &[(&str, &str)]) -> (Arc<PersistentStore>, Vec<ItemId>) {
    let store = PersistentStore::open(Arc::new(MemoryEngine::new())).unwrap();
    let ids = files
        .iter()
        .map(|(name, content)| {
            store
                .create_file(
                    NewFile::new(*name)
                        .with_language("javascript", "es2022")
                        .with_content(*content),
                    None,
                )
                .unwrap()
                .id
        })
        .collect();
    (Arc::new(store), ids)
}

fn content_of(store: &PersistentStore, id: &ItemId) -> String {
    store.get_file(id).unwrap().unwrap().content
}

/// Records every tab sync it receives.
#[derive(Default)]
struct RecordingTabs {
    synced: Mutex<Vec<(ItemId, String)>>,
}

impl OpenTabSync for RecordingTabs {
    fn flush_if_dirty(&self, _file_id: &ItemId) -> Result<bool> {
        Ok(false)
    }

    fn flush_all_dirty(&self) -> Result<usize> {
        Ok(0)
    }

    fn sync_external_content(&self, file_id: &ItemId, content: &str) -> bool {
        self.synced
            .lock()
            .unwrap()
            .push((file_id.clone(), content.to_string()));
        true
    }
}

#[test]
fn test_literal_search_does_not_treat_dot_as_wildcard() {
    let (store, ids) = store_with(&[("a.js", "a.b\naxb\n")]);
    let engine = SearchEngine::new(store);

    let results = engine.search("a.b", SearchOptions::literal()).unwrap();
    assert_eq!(results.files.len(), 1);
    assert_eq!(results.files[0].file_id, ids[0]);
    assert_eq!(results.files[0].matches.len(), 1);
    assert_eq!(results.files[0].matches[0].line, 1);
}

#[test]
fn test_match_position_is_one_based() {
    let (store, _) = store_with(&[("a.js", "first\nfoo bar")]);
    let engine = SearchEngine::new(store);

    let results = engine.search("bar", SearchOptions::literal()).unwrap();
    let m = &results.files[0].matches[0];
    assert_eq!(m.line, 2);
    assert_eq!(m.column, 5);
    assert_eq!(m.matched_text, "bar");
    assert_eq!(m.line_text, "foo bar");
}

#[test]
fn test_column_counts_characters() {
    let (store, _) = store_with(&[("a.js", "héllo wörld")]);
    let engine = SearchEngine::new(store);

    let results = engine.search("wörld", SearchOptions::literal()).unwrap();
    assert_eq!(results.files[0].matches[0].column, 7);
}

#[test]
fn test_multiple_matches_per_line_and_file_metadata() {
    let (store, ids) = store_with(&[("a.js", "x x x"), ("b.js", "nothing")]);
    let engine = SearchEngine::new(store);

    let results = engine.search("x", SearchOptions::literal()).unwrap();
    assert_eq!(results.files.len(), 1);
    let file = &results.files[0];
    assert_eq!(file.file_id, ids[0]);
    assert_eq!(file.file_name, "a.js");
    assert_eq!(file.language, "javascript");
    let columns: Vec<usize> = file.matches.iter().map(|m| m.column).collect();
    assert_eq!(columns, vec![1, 3, 5]);
    assert_eq!(results.total_matches(), 3);
}

#[test]
fn test_empty_and_invalid_queries_yield_nothing() {
    let (store, _) = store_with(&[("a.js", "anything")]);
    let engine = SearchEngine::new(store);

    assert!(engine.search("", SearchOptions::literal()).unwrap().is_empty());
    let results = engine.search("([", SearchOptions::regex()).unwrap();
    assert!(results.is_empty());
    assert_eq!(results.query, "([");
}

#[test]
fn test_zero_width_matches_terminate() {
    let (store, _) = store_with(&[("a.js", "ab\n\ncd")]);
    let engine = SearchEngine::new(store);

    let results = engine.search("^", SearchOptions::regex()).unwrap();
    let matches = &results.files[0].matches;
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.matched_text.is_empty() && m.column == 1));

    let results = engine.search("x*", SearchOptions::regex()).unwrap();
    // "ab" 有 3 个空匹配位置，空行 1 个，"cd" 3 个
    assert_eq!(results.total_matches(), 7);
}

#[test]
fn test_whole_word_search() {
    let (store, _) = store_with(&[("a.js", "let item = items[0];")]);
    let engine = SearchEngine::new(store);

    let results = engine
        .search("item", SearchOptions::literal().whole_word(true))
        .unwrap();
    assert_eq!(results.total_matches(), 1);
    assert_eq!(results.files[0].matches[0].column, 5);
}

#[test]
fn test_case_insensitive_todo_across_files() {
    let (store, ids) = store_with(&[
        ("a.js", "// TODO: first\nok\n// todo again"),
        ("b.js", "clean"),
        ("c.js", "x\n// Todo last"),
    ]);
    let engine = SearchEngine::new(store);

    let results = engine.search("TODO", SearchOptions::literal()).unwrap();
    assert_eq!(results.files.len(), 2);

    let a = results.files.iter().find(|f| f.file_id == ids[0]).unwrap();
    let lines: Vec<usize> = a.matches.iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![1, 3]);

    let c = results.files.iter().find(|f| f.file_id == ids[2]).unwrap();
    assert_eq!(c.matches.len(), 1);
    assert_eq!(c.matches[0].line, 2);
    assert_eq!(c.matches[0].matched_text, "Todo");
}

#[test]
fn test_replace_one_splices_single_match() {
    let (store, ids) = store_with(&[("a.js", "foo foo\nfoo")]);
    let tabs = Arc::new(RecordingTabs::default());
    let engine = SearchEngine::new(store.clone()).with_tabs(tabs.clone());

    let outcome = engine
        .replace_one(&ids[0], 1, 5, "foo", "bar", SearchOptions::literal())
        .unwrap();

    assert_eq!(outcome, ReplaceOutcome::Replaced);
    assert_eq!(content_of(&store, &ids[0]), "foo bar\nfoo");
    assert!(store.get_file(&ids[0]).unwrap().unwrap().is_user_modified);
    let synced = tabs.synced.lock().unwrap();
    assert_eq!(synced.as_slice(), &[(ids[0].clone(), "foo bar\nfoo".to_string())]);
}

#[test]
fn test_replace_one_reports_stale_location() {
    let (store, ids) = store_with(&[("a.js", "xx foo")]);
    let engine = SearchEngine::new(store.clone());

    // 匹配已经移动到第 4 列
    let outcome = engine
        .replace_one(&ids[0], 1, 1, "foo", "bar", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Stale);
    assert_eq!(content_of(&store, &ids[0]), "xx foo");

    let outcome = engine
        .replace_one(&ids[0], 9, 1, "foo", "bar", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Stale);

    let outcome = engine
        .replace_one(&ids[0], 1, 40, "foo", "bar", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Stale);
}

#[test]
fn test_replace_one_missing_file_and_bad_pattern() {
    let (store, ids) = store_with(&[("a.js", "foo")]);
    let engine = SearchEngine::new(store);

    let outcome = engine
        .replace_one(&ItemId::from("nope"), 1, 1, "foo", "bar", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::NotFound);

    let outcome = engine
        .replace_one(&ids[0], 1, 1, "(", "bar", SearchOptions::regex())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::InvalidPattern);
}

#[test]
fn test_replace_one_expands_captures_in_regex_mode() {
    let (store, ids) = store_with(&[("a.js", "let alpha = beta;")]);
    let engine = SearchEngine::new(store.clone());

    let outcome = engine
        .replace_one(&ids[0], 1, 5, r"(\w+) = (\w+)", "$2 = $1", SearchOptions::regex())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Replaced);
    assert_eq!(content_of(&store, &ids[0]), "let beta = alpha;");
}

#[test]
fn test_literal_replacement_is_verbatim() {
    let (store, ids) = store_with(&[("a.js", "price")]);
    let engine = SearchEngine::new(store.clone());

    let count = engine
        .replace_all_in_file(&ids[0], "price", "$1.00", SearchOptions::literal())
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(content_of(&store, &ids[0]), "$1.00");
}

#[test]
fn test_replace_all_in_file_counts_matches() {
    let (store, ids) = store_with(&[("a.js", "a a\nb a\r\nend")]);
    let tabs = Arc::new(RecordingTabs::default());
    let engine = SearchEngine::new(store.clone()).with_tabs(tabs.clone());

    let count = engine
        .replace_all_in_file(&ids[0], "a", "z", SearchOptions::literal().case_sensitive(true))
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(content_of(&store, &ids[0]), "z z\nb z\r\nend");
    assert_eq!(tabs.synced.lock().unwrap().len(), 1);

    let none = engine
        .replace_all_in_file(&ids[0], "missing", "z", SearchOptions::literal())
        .unwrap();
    assert_eq!(none, 0);
    assert_eq!(tabs.synced.lock().unwrap().len(), 1);
}

#[test]
fn test_replace_all_across_files_then_search_is_empty() {
    let (store, ids) = store_with(&[
        ("a.js", "// TODO one\n// TODO two"),
        ("b.js", "nothing here"),
        ("c.js", "// todo three"),
    ]);
    let engine = SearchEngine::new(store.clone());

    let results = engine.search("todo", SearchOptions::literal()).unwrap();
    let summary = engine.replace_all_across_files(&results, "DONE").unwrap();

    assert_eq!(summary, ReplaceSummary { files: 2, replacements: 3 });
    assert_eq!(content_of(&store, &ids[0]), "// DONE one\n// DONE two");
    assert_eq!(content_of(&store, &ids[1]), "nothing here");
    assert_eq!(content_of(&store, &ids[2]), "// DONE three");
    assert!(engine.search("todo", SearchOptions::literal()).unwrap().is_empty());
}

#[test]
fn test_replace_one_skips_overlapping_match_search_never_reported() {
    let (store, ids) = store_with(&[("a.js", "aaa")]);
    let engine = SearchEngine::new(store.clone());

    let results = engine.search("aa", SearchOptions::literal()).unwrap();
    let columns: Vec<usize> = results.files[0].matches.iter().map(|m| m.column).collect();
    assert_eq!(columns, vec![1]);

    let outcome = engine
        .replace_one(&ids[0], 1, 2, "aa", "X", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Stale);
    assert_eq!(content_of(&store, &ids[0]), "aaa");

    let outcome = engine
        .replace_one(&ids[0], 1, 1, "aa", "X", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Replaced);
    assert_eq!(content_of(&store, &ids[0]), "Xa");
}

fn open_workspace(store: &Arc<PersistentStore>) -> (Arc<Mutex<WorkspaceManager>>, ItemId) {
    let mut ws = WorkspaceManager::new(
        store.clone(),
        Arc::new(BuiltinLanguages::new()),
        Arc::new(MemoryBufferHost::new()),
    );
    let tab = ws
        .create_new_file("javascript", "es2022", Some("open.js"), None)
        .unwrap();
    ws.mark_dirty(tab.id(), "foo\nunsaved user work");
    let id = tab.id().clone();
    (Arc::new(Mutex::new(ws)), id)
}

#[test]
fn test_replace_in_file_builds_on_unsaved_tab_edits() {
    let (store, _) = store_with(&[]);
    let (ws, id) = open_workspace(&store);
    store
        .update_file(
            &id,
            FilePatch {
                content: Some("foo".into()),
                ..FilePatch::default()
            },
        )
        .unwrap();
    let engine = SearchEngine::new(store.clone()).with_tabs(ws.clone());

    let count = engine
        .replace_all_in_file(&id, "foo", "bar", SearchOptions::literal())
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(content_of(&store, &id), "bar\nunsaved user work");
    let ws = ws.lock().unwrap();
    let tab = ws.tab(&id).unwrap();
    assert_eq!(tab.content(), "bar\nunsaved user work");
    assert!(!tab.is_dirty);
}

#[test]
fn test_search_and_replace_one_see_dirty_tab_content() {
    let (store, _) = store_with(&[]);
    let (ws, id) = open_workspace(&store);
    let engine = SearchEngine::new(store.clone()).with_tabs(ws.clone());

    let results = engine.search("unsaved", SearchOptions::literal()).unwrap();
    assert_eq!(results.total_matches(), 1);
    assert_eq!(results.files[0].matches[0].line, 2);

    ws.lock().unwrap().mark_dirty(&id, "foo\nnewer edit");
    let outcome = engine
        .replace_one(&id, 2, 1, "newer", "latest", SearchOptions::literal())
        .unwrap();
    assert_eq!(outcome, ReplaceOutcome::Replaced);
    assert_eq!(content_of(&store, &id), "foo\nlatest edit");
    assert_eq!(ws.lock().unwrap().tab(&id).unwrap().content(), "foo\nlatest edit");
}
