use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Entity;
use crate::store::Document;

/// Fields read back when rebuilding a plan from a stored document.
pub const PLAN_FIELDS: [&str; 5] = ["id", "name", "price", "interval", "features"];

fn default_interval() -> String {
    "month".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    pub fn new(id: &str, name: &str, price: f64, features: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            interval: default_interval(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Rebuild a plan from exactly [`PLAN_FIELDS`]. Returns `None` when any
    /// of them is absent or mistyped; callers skip such documents.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let mut selected = Document::new();
        for field in PLAN_FIELDS {
            selected.insert(field.to_string(), doc.get(field)?.clone());
        }
        serde_json::from_value(Value::Object(selected)).ok()
    }
}

impl Entity for Plan {
    const COLLECTION: &'static str = "plan";
    const REQUIRED: &'static [&'static str] = &["id", "name", "price"];
}
