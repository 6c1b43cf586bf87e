use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// Keyed lookup table for values derived from immutable inputs.
///
/// Hits are decided by key equality, so equal keys built on different calls
/// share an entry.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Memo {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = entries.get(&key) {
            return value.clone();
        }
        let value = compute(&key);
        entries.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
