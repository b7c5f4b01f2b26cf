//! In-memory document store, for `--dry-run` and tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::DocumentSink;
use crate::error::{LoadError, LoadResult};

#[derive(Debug, Default)]
struct DocumentState {
    collections: BTreeMap<String, Vec<Value>>,
    next_id: u64,
    pings: usize,
    unreachable: Option<String>,
    write_failure: Option<String>,
}

/// Shared handle to an in-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<DocumentState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the connectivity probe fail with `reason`
    pub fn set_unreachable(&self, reason: impl Into<String>) {
        self.state.lock().unreachable = Some(reason.into());
    }

    /// Make every insert fail with `reason`
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.state.lock().write_failure = Some(reason.into());
    }

    /// Documents stored in `collection`, in insertion order
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Document count per collection
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.state
            .lock()
            .collections
            .iter()
            .map(|(name, docs)| (name.clone(), docs.len()))
            .collect()
    }

    pub fn ping_count(&self) -> usize {
        self.state.lock().pings
    }

    fn insert(&self, collection: &str, documents: Vec<Value>) -> LoadResult<Vec<String>> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.write_failure {
            return Err(LoadError::Unavailable(reason.clone()));
        }

        let first_id = state.next_id;
        state.next_id += documents.len() as u64;
        let ids = (first_id..state.next_id).map(|n| format!("{:024x}", n + 1)).collect();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(ids)
    }
}

#[async_trait]
impl DocumentSink for MemoryDocumentStore {
    async fn ping(&self) -> LoadResult<()> {
        let mut state = self.state.lock();
        state.pings += 1;
        match &state.unreachable {
            Some(reason) => Err(LoadError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> LoadResult<usize> {
        if documents.is_empty() {
            return Err(LoadError::Unavailable(
                "cannot insert an empty batch".to_string(),
            ));
        }
        self.insert(collection, documents).map(|ids| ids.len())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> LoadResult<String> {
        self.insert(collection, vec![document])?
            .pop()
            .ok_or_else(|| LoadError::Unavailable("no id assigned".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = MemoryDocumentStore::new();
        let id = store.insert_one("relatorios", json!({"a": 1})).await.unwrap();
        assert_eq!(id.len(), 24);

        let inserted = store
            .insert_many("relatorios", vec![json!({"b": 2}), json!({"c": 3})])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.documents("relatorios").len(), 3);
        assert_eq!(store.counts().get("relatorios"), Some(&3));
    }

    #[tokio::test]
    async fn test_unreachable_ping() {
        let store = MemoryDocumentStore::new();
        assert!(store.ping().await.is_ok());

        store.set_unreachable("server selection timeout");
        assert!(store.ping().await.is_err());
        assert_eq!(store.ping_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let store = MemoryDocumentStore::new();
        assert!(store.insert_many("relatorios", Vec::new()).await.is_err());
    }
}
