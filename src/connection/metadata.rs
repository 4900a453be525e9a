// src/connection/metadata.rs

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// The key/value store attached to a connection.
///
/// Individual operations are atomic; sequences of operations are not, so
/// callers that read-modify-write a key must coordinate among themselves.
#[derive(Debug, Default)]
pub struct Metadata {
    entries: Mutex<HashMap<String, Value>>,
}

impl Metadata {
    pub fn from_map(entries: HashMap<String, Value>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.lock().clone()
    }

    pub fn insert(&self, key: String, value: Value) {
        let _ = self.entries.lock().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        let _ = self.entries.lock().remove(key);
    }
}
