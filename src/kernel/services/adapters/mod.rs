//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod buffers;
pub mod languages;
pub mod runtime;
pub mod settings;
pub mod storage;

pub use buffers::MemoryBufferHost;
pub use languages::BuiltinLanguages;
pub use runtime::{AsyncRuntime, AutosaveHandle};
pub use settings::{
    ensure_log_dir, ensure_settings_file, get_app_data_dir, get_log_dir, get_settings_path,
    get_store_path, load_settings, SettingsError,
};
pub use storage::{JsonFileEngine, MemoryEngine, SCHEMA_VERSION};
