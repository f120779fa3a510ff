use serde::{Deserialize, Serialize};

use super::Entity;

fn default_plan() -> String {
    "free".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Plan identifier. Not checked against the plan collection.
    #[serde(default = "default_plan")]
    pub plan: String,
}

impl Entity for User {
    const COLLECTION: &'static str = "user";
    const REQUIRED: &'static [&'static str] = &["name", "email"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_entity;
    use serde_json::json;

    #[test]
    fn test_user_defaults_to_free_plan() {
        let user: User = parse_entity(json!({"name": "Ada", "email": "ada@example.com"})).unwrap();
        assert_eq!(user.plan, "free");
        assert!(user.avatar_url.is_none());
    }

    #[test]
    fn test_user_without_email_is_rejected() {
        let errors = parse_entity::<User>(json!({"name": "Ada"})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
    }
}
