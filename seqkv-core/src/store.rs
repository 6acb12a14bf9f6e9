use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type Key = String;
pub type Value = String;

/// Per-key state at a replica: the latest value and the order index at
/// which it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: Value,
    pub order_index: u64,
}

/// The applied key-value map. Absent keys read as `(None, None)`.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<Key, StoreEntry>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&StoreEntry> {
        self.entries.get(key)
    }

    /// Applies a write at `order_index`. Callers are responsible for only
    /// calling this once per key per order index, in increasing order
    /// (`Replica::drain_order_buffer` upholds that).
    pub fn set(&mut self, key: Key, value: Value, order_index: u64) {
        self.entries.insert(key, StoreEntry { value, order_index });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
