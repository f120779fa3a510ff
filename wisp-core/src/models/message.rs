use serde::{Deserialize, Serialize};

use super::Entity;

/// One chat turn. `role` is conventionally "user" or "assistant".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: String,
    pub role: String,
    pub content: String,
}

impl Entity for Message {
    const COLLECTION: &'static str = "message";
    const REQUIRED: &'static [&'static str] = &["user_id", "role", "content"];
}
