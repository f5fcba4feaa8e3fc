//! In-memory key-value store.
//!
//! Used by tests and by previews that must not touch the device database.
//! Writes can be made to fail on demand to exercise the "storage write
//! failed" paths.

use super::{KeyValueStore, Result};
use crate::client::error::StorageError;
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` / `multi_remove` fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("writes disabled"));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        async move { Ok(self.entries.read().await.get(key).cloned()) }.boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            self.check_writable()?;
            self.entries
                .write()
                .await
                .insert(key.to_string(), value.to_string());
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }

    fn multi_get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<(String, Option<String>)>>> {
        async move {
            let entries = self.entries.read().await;
            Ok(keys
                .iter()
                .map(|key| (key.clone(), entries.get(key).cloned()))
                .collect())
        }
        .boxed()
    }

    fn multi_remove<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<()>> {
        async move {
            self.check_writable()?;
            let mut entries = self.entries.write().await;
            for key in keys {
                entries.remove(key);
            }
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }
}
