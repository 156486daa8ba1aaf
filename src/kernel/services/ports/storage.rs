//! Durable engine contract used by the persistent store.

use serde_json::Value;
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid stored payload: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("cannot place {id} under {parent}")]
    InvalidParent { id: String, parent: String },
}

/// Object collections the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Files,
    Folders,
    Meta,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Files, Collection::Folders, Collection::Meta];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Files => "files",
            Collection::Folders => "folders",
            Collection::Meta => "meta",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum BatchOp {
    Put {
        collection: Collection,
        key: String,
        value: Value,
    },
    Delete {
        collection: Collection,
        key: String,
    },
}

impl BatchOp {
    pub fn put(collection: Collection, key: impl Into<String>, value: Value) -> Self {
        Self::Put {
            collection,
            key: key.into(),
            value,
        }
    }

    pub fn delete(collection: Collection, key: impl Into<String>) -> Self {
        Self::Delete {
            collection,
            key: key.into(),
        }
    }
}

/// Key-addressed storage with per-collection records and atomic batches.
///
/// Implementations must apply a batch entirely or not at all.
pub trait StorageEngine: Send + Sync {
    fn schema_version(&self) -> u32;

    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>>;

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>>;

    fn apply(&self, batch: Vec<BatchOp>) -> Result<()>;

    fn clear(&self, collections: &[Collection]) -> Result<()>;

    fn put(&self, collection: Collection, key: &str, value: Value) -> Result<()> {
        self.apply(vec![BatchOp::put(collection, key, value)])
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<()> {
        self.apply(vec![BatchOp::delete(collection, key)])
    }
}
