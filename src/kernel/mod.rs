//! Headless workspace core: store, tab sessions, search.

pub mod language;
pub mod search;
pub mod services;
pub mod storage;
pub mod workspace;

pub use language::LanguageId;
pub use search::{
    FileSearchResult, LineMatch, ReplaceOutcome, ReplaceSummary, SearchDebouncer, SearchEngine,
    SearchOptions, SearchResults,
};
pub use storage::{ImportSummary, PersistentStore};
pub use workspace::{Tab, WorkspaceEvent, WorkspaceManager};
