//! Line-oriented durable key/value file store
//!
//! Each entry is persisted as a single `"key<separator>value"` line. The
//! whole store is kept in memory and rewritten on every change; entry
//! volume is tiny (per-variant counters, a handful of preference keys).

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;

/// A durable mapping persisted as newline-delimited key/value records.
pub struct SimpleDataStore<K, V> {
    path: PathBuf,
    separator: char,
    data: Mutex<HashMap<K, V>>,
}

impl<K, V> SimpleDataStore<K, V>
where
    K: Eq + Hash + Display + FromStr,
    V: Display + FromStr + Clone,
{
    /// Open the store at `path`, loading any existing records.
    ///
    /// Unparsable lines are dropped with a warning; a missing file is an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>, separator: char) -> Self {
        let path = path.into();
        let data = Self::load(&path, separator);
        Self {
            path,
            separator,
            data: Mutex::new(data),
        }
    }

    fn load(path: &Path, separator: char) -> HashMap<K, V> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                log::error!("Failed to read data store {}: {}", path.display(), err);
                return HashMap::new();
            }
        };

        let mut data = HashMap::new();
        for line in contents.lines() {
            if line.is_empty() {
                continue;
            }
            let parsed = line
                .split_once(separator)
                .and_then(|(key, value)| Some((key.parse().ok()?, value.parse().ok()?)));
            match parsed {
                Some((key, value)) => {
                    data.insert(key, value);
                }
                None => log::warn!(
                    "Dropping unparsable line in data store {}: {:?}",
                    path.display(),
                    line
                ),
            }
        }
        data
    }

    /// Insert or replace a value and persist the store
    pub fn put(&self, key: K, value: V) {
        let mut data = self.data.lock();
        data.insert(key, value);
        self.save(&data);
    }

    /// Remove a key, persisting the store if it was present
    pub fn remove(&self, key: &K) {
        let mut data = self.data.lock();
        if data.remove(key).is_some() {
            self.save(&data);
        }
    }

    /// Look up a value, falling back to `default` when absent
    pub fn get_or_default(&self, key: &K, default: V) -> V {
        self.data.lock().get(key).cloned().unwrap_or(default)
    }

    /// Look up a value
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    /// Drop every record and persist the now-empty store
    pub fn clear(&self) {
        let mut data = self.data.lock();
        data.clear();
        self.save(&data);
    }

    fn save(&self, data: &HashMap<K, V>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log::error!("Failed to create {}: {}", parent.display(), err);
                return;
            }
        }

        let mut contents = String::new();
        for (key, value) in data {
            contents.push_str(&format!("{}{}{}\n", key, self.separator, value));
        }

        // Disk failures degrade to in-memory state until the condition clears
        if let Err(err) = fs::write(&self.path, contents) {
            log::error!("Failed to write data store {}: {}", self.path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts");

        let store: SimpleDataStore<i64, i64> = SimpleDataStore::open(&path, ' ');
        store.put(1, 10);
        store.put(2, 20);

        let reopened: SimpleDataStore<i64, i64> = SimpleDataStore::open(&path, ' ');
        assert_eq!(reopened.get_or_default(&1, 0), 10);
        assert_eq!(reopened.get_or_default(&2, 0), 20);
        assert_eq!(reopened.get_or_default(&3, 0), 0);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store: SimpleDataStore<String, String> =
            SimpleDataStore::open(dir.path().join("absent"), ' ');
        assert!(store.get(&"anything".to_string()).is_none());
    }

    #[test]
    fn test_unparsable_lines_are_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts");
        fs::write(&path, "1 10\nnot-a-number 5\n2 20\n").unwrap();

        let store: SimpleDataStore<i64, i64> = SimpleDataStore::open(&path, ' ');
        assert_eq!(store.get(&1), Some(10));
        assert_eq!(store.get(&2), Some(20));
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv");

        let store: SimpleDataStore<String, String> = SimpleDataStore::open(&path, ' ');
        store.put("a".to_string(), "1".to_string());
        store.remove(&"a".to_string());

        let reopened: SimpleDataStore<String, String> = SimpleDataStore::open(&path, ' ');
        assert!(reopened.get(&"a".to_string()).is_none());
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv");

        let store: SimpleDataStore<i64, i64> = SimpleDataStore::open(&path, ' ');
        store.put(1, 1);
        store.clear();

        let reopened: SimpleDataStore<i64, i64> = SimpleDataStore::open(&path, ' ');
        assert!(reopened.get(&1).is_none());
    }
}
