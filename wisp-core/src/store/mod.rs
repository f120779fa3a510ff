//! Document store abstraction.
//!
//! A store keeps schema-free JSON documents grouped into named collections
//! and answers field-equality queries in insertion order. The production
//! backend is PostgreSQL (one JSONB table); the in-memory backend backs tests
//! and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// A JSON object as stored in a collection.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A document as read back from the store, with its native identifier kept
/// apart from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub body: Document,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one document and return the identifier the store assigned.
    async fn insert(&self, collection: &str, body: Document) -> Result<Uuid, StoreError>;

    /// Documents whose fields equal every entry of `filter`, oldest first.
    /// A missing collection yields an empty list. `None` means no cap.
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        limit: Option<i64>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    /// Names of collections holding at least one document.
    async fn collection_names(&self) -> Result<Vec<String>, StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
