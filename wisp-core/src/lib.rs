pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod seed;
pub mod store;

pub use config::WispConfig;
pub use error::{StoreError, WispError};
pub use gateway::{
    owner_filter, ConfigPresence, ConnectionHealth, Gateway, HealthReport, Record,
};
pub use store::{Document, DocumentStore, MemoryStore, PgDocumentStore};
