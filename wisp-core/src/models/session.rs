use serde::{Deserialize, Serialize};

use super::Entity;

fn default_status() -> String {
    "scheduled".to_string()
}

/// A booked session between a user and a professional.
///
/// `status` is free text; no transitions are enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub professional_id: String,
    pub datetime_iso: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Entity for Session {
    const COLLECTION: &'static str = "session";
    const REQUIRED: &'static [&'static str] = &["user_id", "professional_id", "datetime_iso"];
}
