//! Service ports: traits + data contracts.

pub mod buffer;
pub mod language;
pub mod settings;
pub mod storage;
pub mod tabs;

pub use buffer::BufferHost;
pub use language::TemplateProvider;
pub use settings::Settings;
pub use storage::{BatchOp, Collection, Result as StoreResult, StorageEngine, StoreError};
pub use tabs::OpenTabSync;
