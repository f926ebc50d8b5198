//! In-memory ordered store
//!
//! A `BTreeMap` with the same ordering as the on-disk stores. Used by
//! tests, benchmarks and embedders that build a snapshot in process.

use crate::storage::error::StorageResult;
use crate::storage::store::{OrderedStore, ScanControl};
use std::collections::BTreeMap;

/// Ordered store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    label: String,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build a store from (key, value) pairs
    pub fn from_entries<K, V>(label: impl Into<String>, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let mut store = Self::new(label);
        for (key, value) in entries {
            store.insert(key, value);
        }
        store
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OrderedStore for MemoryStore {
    fn location(&self) -> &str {
        &self.label
    }

    fn first_key(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.keys().next().cloned())
    }

    fn last_key(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.entries.keys().next_back().cloned())
    }

    fn scan_from(
        &self,
        start: &[u8],
        visitor: &mut dyn FnMut(&[u8], &[u8]) -> ScanControl,
    ) -> StorageResult<()> {
        for (key, value) in self.entries.range(start.to_vec()..) {
            if visitor(key, value) == ScanControl::Stop {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        MemoryStore::from_entries(
            "mem",
            vec![
                ("b key", "2"),
                ("a key", "1"),
                ("c key", "3"),
            ],
        )
    }

    #[test]
    fn test_first_and_last_key() {
        let store = sample();
        assert_eq!(store.first_key().unwrap(), Some(b"a key".to_vec()));
        assert_eq!(store.last_key().unwrap(), Some(b"c key".to_vec()));
        assert_eq!(MemoryStore::new("empty").first_key().unwrap(), None);
    }

    #[test]
    fn test_scan_from_seek_position() {
        let store = sample();
        let mut seen = Vec::new();
        store
            .scan_from(b"b", &mut |key, value| {
                seen.push((key.to_vec(), value.to_vec()));
                ScanControl::Continue
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (b"b key".to_vec(), b"2".to_vec()),
                (b"c key".to_vec(), b"3".to_vec()),
            ]
        );
    }

    #[test]
    fn test_scan_stops_on_request() {
        let store = sample();
        let mut visits = 0;
        store
            .scan_from(b"", &mut |_, _| {
                visits += 1;
                ScanControl::Stop
            })
            .unwrap();
        assert_eq!(visits, 1);
    }
}
