//! Bounded name→id lookup cache shared by the People/Places/Projects
//! services. Insertion-order eviction: evicts the oldest half when full.

use std::collections::HashMap;
use std::sync::Mutex;

const CACHE_MAX: usize = 256;

pub struct NameCache {
    entries: Mutex<HashMap<String, String>>,
    order: Mutex<Vec<String>>,
}

impl Default for NameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NameCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: String, id: String) {
        let mut entries = self.entries.lock().unwrap();
        let mut order = self.order.lock().unwrap();

        if entries.contains_key(&key) {
            entries.insert(key, id);
            return;
        }

        if entries.len() >= CACHE_MAX {
            let evict_count = CACHE_MAX / 2;
            for k in order.drain(..evict_count) {
                entries.remove(&k);
            }
        }

        order.push(key.clone());
        entries.insert(key, id);
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        let mut order = self.order.lock().unwrap();
        entries.remove(key);
        order.retain(|k| k != key);
    }
}
