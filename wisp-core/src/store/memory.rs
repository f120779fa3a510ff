use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Document, DocumentStore, StoredDocument};
use crate::error::StoreError;

/// In-process document store. Collections are plain vectors, so insertion
/// order is natural order.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
    inserts: AtomicUsize,
    listing_error: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total successful inserts across all collections.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of documents currently held by `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock()
            .map(|c| c.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Make `collection_names` fail with `message`, simulating a store that
    /// accepts the connection but errors on use.
    pub fn fail_collection_listing(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.listing_error.lock() {
            *slot = Some(message.into());
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<StoredDocument>>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn matches(body: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| body.get(key) == Some(expected))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, body: Document) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument { id, body });
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        limit: Option<i64>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let cap = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(&d.body, filter))
                    .take(cap)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let injected = self
            .listing_error
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?
            .clone();
        if let Some(message) = injected {
            return Err(StoreError::Backend(message));
        }

        let mut names: Vec<String> = self
            .lock()?
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_find_filters_by_equality_in_insertion_order() {
        let store = MemoryStore::new();
        let a = store
            .insert("message", doc(json!({"user_id": "u1", "content": "a"})))
            .await
            .unwrap();
        store
            .insert("message", doc(json!({"user_id": "u2", "content": "b"})))
            .await
            .unwrap();
        let c = store
            .insert("message", doc(json!({"user_id": "u1", "content": "c"})))
            .await
            .unwrap();

        let found = store
            .find("message", &doc(json!({"user_id": "u1"})), Some(100))
            .await
            .unwrap();
        let ids: Vec<Uuid> = found.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(store.insert_count(), 3);
        assert_eq!(store.len("message"), 3);
    }

    #[tokio::test]
    async fn test_find_missing_collection_returns_empty() {
        let store = MemoryStore::new();
        let found = store.find("session", &Document::new(), Some(50)).await.unwrap();
        assert!(found.is_empty());
        assert!(store.is_empty("session"));
    }

    #[tokio::test]
    async fn test_emptiness_is_per_collection() {
        let store = MemoryStore::new();
        store.insert("user", Document::new()).await.unwrap();
        assert!(!store.is_empty("user"));
        assert!(store.is_empty("plan"));
        assert_eq!(store.len("plan"), 0);
    }

    #[tokio::test]
    async fn test_find_applies_limit() {
        let store = MemoryStore::new();
        for i in 0..10 {
            store
                .insert("testresult", doc(json!({"user_id": "u1", "n": i})))
                .await
                .unwrap();
        }
        let found = store
            .find("testresult", &doc(json!({"user_id": "u1"})), Some(4))
            .await
            .unwrap();
        assert_eq!(found.len(), 4);
        assert_eq!(found[3].body["n"], 3);

        let all = store.find("testresult", &Document::new(), None).await.unwrap();
        assert_eq!(all.len(), 10);
    }

    #[tokio::test]
    async fn test_collection_names_sorted_and_injectable_failure() {
        let store = MemoryStore::new();
        store.insert("user", Document::new()).await.unwrap();
        store.insert("plan", Document::new()).await.unwrap();
        assert_eq!(store.collection_names().await.unwrap(), vec!["plan", "user"]);

        store.fail_collection_listing("connection reset by peer");
        let err = store.collection_names().await.unwrap_err();
        assert!(err.to_string().contains("connection reset by peer"));
    }
}
