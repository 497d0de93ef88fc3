

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Per-record memo for expensive inference outputs.
///
/// Entries are keyed by record id and remember a digest of the input they were
/// computed from, so a refreshed record with changed text misses.
pub struct RecordMemo<T> {
    entries: RwLock<HashMap<String, MemoEntry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct MemoEntry<T> {
    digest: String,
    value: T,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl MemoStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl<T: Clone> RecordMemo<T> {

    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }


    pub fn digest(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    }


    pub fn get(&self, record_id: &str, digest: &str) -> Option<T> {
        let entries = self.entries.read();
        match entries.get(record_id) {
            Some(entry) if entry.digest == digest => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Memo HIT for {}", record_id);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }


    pub fn set(&self, record_id: &str, digest: String, value: T) {
        self.entries
            .write()
            .insert(record_id.to_string(), MemoEntry { digest, value });
    }

    /// Drops entries for records that are no longer part of the loaded set.
    pub fn retain_ids(&self, live: &HashSet<&str>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|id, _| live.contains(id.as_str()));
        before - entries.len()
    }


    pub fn stats(&self) -> MemoStats {
        MemoStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.read().len(),
        }
    }


    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl<T: Clone> Default for RecordMemo<T> {
    fn default() -> Self {
        Self::new()
    }
}
