//! Record shapes accepted and stored by the API.
//!
//! Every entity maps to one collection, named after the lowercase type name.
//! Request bodies go through [`parse_entity`], which reports every missing
//! required field before attempting a typed decode, then runs the entity's
//! own range checks.

mod message;
mod plan;
mod professional;
mod session;
mod test_result;
mod user;

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use message::Message;
pub use plan::{Plan, PLAN_FIELDS};
pub use professional::{Professional, DEFAULT_RATING};
pub use session::Session;
pub use test_result::TestResult;
pub use user::User;

/// A validated record type bound to a collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    /// Fields that must be present in a create request.
    const REQUIRED: &'static [&'static str];

    /// Checks beyond what the type system expresses.
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Ok(())
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map a path-tracked serde error onto the field it failed at. Errors
    /// raised at the root name their field in the message, if at all.
    fn from_serde(err: &serde_path_to_error::Error<serde_json::Error>) -> Self {
        let message = err.inner().to_string();
        let path = err.path().to_string();
        let field = if path != "." {
            path
        } else {
            message
                .split('`')
                .nth(1)
                .filter(|_| message.starts_with("missing field") || message.starts_with("unknown field"))
                .unwrap_or("body")
                .to_string()
        };
        Self { field, message }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Decode and validate a request body into `T`.
pub fn parse_entity<T: Entity>(body: Value) -> Result<T, Vec<FieldError>> {
    let object = match body {
        Value::Object(map) => map,
        other => {
            return Err(vec![FieldError::new(
                "body",
                format!("expected a JSON object, got {}", crate::gateway::json_kind(&other)),
            )])
        }
    };

    let missing: Vec<FieldError> = T::REQUIRED
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| FieldError::new(*field, "field required"))
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let entity: T = serde_path_to_error::deserialize(Value::Object(object))
        .map_err(|e| vec![FieldError::from_serde(&e)])?;
    entity.validate()?;
    Ok(entity)
}

/// An ISO 8601 datetime kept in the exact form the client sent it.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM[:SS[.f]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(String);

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

impl Timestamp {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let valid = DateTime::parse_from_rfc3339(raw).is_ok()
            || NAIVE_FORMATS
                .iter()
                .any(|fmt| NaiveDateTime::parse_from_str(raw, fmt).is_ok());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(format!("invalid datetime `{}`", raw))
        }
    }

    /// Current UTC time, naive ISO form with microseconds.
    pub fn now() -> Self {
        Self(Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(de::Error::custom)
    }
}
