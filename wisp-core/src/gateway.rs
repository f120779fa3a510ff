//! Record store gateway
//!
//! Wraps the document store behind an explicit connection state. A gateway
//! that never connected stays degraded for the life of the process: every
//! insert and query fails with [`StoreError::Unavailable`] and nothing tries
//! to reconnect.
//!
//! Callers only ever see opaque string identifiers. The store's native id is
//! lifted out of the document body into [`Record::id`].

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::store::{Document, DocumentStore, PgDocumentStore};

/// Maximum number of collection names reported by a health check.
pub const COLLECTION_SAMPLE: usize = 10;

/// Reserved field name for the store's native identifier.
const NATIVE_ID_FIELD: &str = "_id";

/// Field holding the normalized identifier in records handed to clients.
const ID_FIELD: &str = "id";

#[derive(Clone)]
enum ConnectionState {
    Uninitialized,
    Connected(Arc<dyn DocumentStore>),
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Uninitialized => f.write_str("Uninitialized"),
            ConnectionState::Connected(store) => write!(f, "Connected({})", store.name()),
        }
    }
}

/// Which pieces of store configuration were supplied at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigPresence {
    pub database_url: bool,
    pub database_name: bool,
}

impl From<&DatabaseConfig> for ConfigPresence {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            database_url: config.url.is_some(),
            database_name: config.name.is_some(),
        }
    }
}

/// Usability of the live connection, as observed by a health check.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionHealth {
    Uninitialized,
    Connected { collections: Vec<String> },
    Erroring(String),
}

/// The three independent diagnostic facts.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub reachable: bool,
    pub config: ConfigPresence,
    pub connection: ConnectionHealth,
}

/// A stored record with its identifier normalized to an opaque string.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Document,
}

impl Record {
    /// The record body with `id` set to the store identifier.
    pub fn into_item(self) -> Value {
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(self.id));
        Value::Object(fields)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Equality filter on the owning user identifier.
pub fn owner_filter(user_id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert("user_id".to_string(), Value::String(user_id.to_string()));
    filter
}

#[derive(Clone, Debug)]
pub struct Gateway {
    state: ConnectionState,
    config: ConfigPresence,
}

impl Gateway {
    pub fn new(store: Arc<dyn DocumentStore>, config: ConfigPresence) -> Self {
        Self {
            state: ConnectionState::Connected(store),
            config,
        }
    }

    pub fn uninitialized(config: ConfigPresence) -> Self {
        Self {
            state: ConnectionState::Uninitialized,
            config,
        }
    }

    /// Connect to PostgreSQL. Missing configuration or a failed connection
    /// yields a degraded gateway rather than an error.
    pub async fn connect(config: &DatabaseConfig) -> Self {
        let presence = ConfigPresence::from(config);
        if !config.is_configured() {
            tracing::warn!(
                database_url = presence.database_url,
                database_name = presence.database_name,
                "Database not configured; storage is unavailable"
            );
            return Self::uninitialized(presence);
        }

        let pool = match crate::db::create_pool(config).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to database; storage is unavailable");
                return Self::uninitialized(presence);
            }
        };

        if let Err(e) = crate::db::ensure_schema(&pool).await {
            tracing::error!(error = %e, "Failed to prepare documents table; storage is unavailable");
            return Self::uninitialized(presence);
        }

        tracing::info!(database = config.name.as_deref().unwrap_or_default(), "Connected to document store");
        Self::new(Arc::new(PgDocumentStore::new(pool)), presence)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn config_presence(&self) -> ConfigPresence {
        self.config
    }

    fn store(&self) -> Result<&Arc<dyn DocumentStore>, StoreError> {
        match &self.state {
            ConnectionState::Connected(store) => Ok(store),
            ConnectionState::Uninitialized => Err(StoreError::Unavailable),
        }
    }

    /// Serialize `record` into a document and insert it. Returns the new
    /// identifier as an opaque string.
    pub async fn insert<T>(&self, collection: &str, record: &T) -> Result<String, StoreError>
    where
        T: Serialize + ?Sized,
    {
        let store = self.store()?;
        let mut body = match serde_json::to_value(record)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };
        body.remove(NATIVE_ID_FIELD);

        let id = store.insert(collection, body).await?;
        Ok(id.to_string())
    }

    /// Up to `limit` records matching `filter`, in insertion order.
    pub async fn query(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Record>, StoreError> {
        let store = self.store()?;
        let docs = store.find(collection, &filter, limit).await?;
        Ok(docs
            .into_iter()
            .map(|d| {
                let mut fields = d.body;
                fields.remove(NATIVE_ID_FIELD);
                Record {
                    id: d.id.to_string(),
                    fields,
                }
            })
            .collect())
    }

    /// Report reachability, configuration presence and connection
    /// usability. Never fails; store errors become [`ConnectionHealth::Erroring`].
    pub async fn health_check(&self) -> HealthReport {
        let connection = match &self.state {
            ConnectionState::Uninitialized => ConnectionHealth::Uninitialized,
            ConnectionState::Connected(store) => match store.collection_names().await {
                Ok(mut names) => {
                    names.truncate(COLLECTION_SAMPLE);
                    ConnectionHealth::Connected { collections: names }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Health check could not list collections");
                    ConnectionHealth::Erroring(e.to_string())
                }
            },
        };

        HealthReport {
            reachable: true,
            config: self.config,
            connection,
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
