//! Durable key/value preference storage
//!
//! The engine keeps a small amount of state (the action-store salt) in a
//! host-provided key/value store. Hosts with their own settings surface can
//! implement [`Preferences`] directly; [`FilePreferences`] is a ready-made
//! file-backed implementation and [`MemoryPreferences`] a volatile one.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::store::SimpleDataStore;

/// Durable string key/value storage.
pub trait Preferences: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
}

/// Preferences persisted to a line-oriented file.
pub struct FilePreferences {
    store: SimpleDataStore<String, String>,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: SimpleDataStore::open(path, ' '),
        }
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.store.get(&key.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        self.store.put(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.store.remove(&key.to_string());
    }
}

/// In-memory preferences, mainly for tests
#[derive(Default)]
pub struct MemoryPreferences {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.data.lock().insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.data.lock().remove(key);
    }
}
