use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Entity, Timestamp};

/// Outcome of one personality test. The archetype is computed by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub user_id: String,
    /// Color choices, in the order they were picked.
    pub answers: Vec<String>,
    pub archetype: String,
    pub summary: String,
    /// Raw score per trait.
    pub score_map: Map<String, Value>,
    #[serde(default)]
    pub taken_at: Option<Timestamp>,
}

impl TestResult {
    /// Fill `taken_at` when the client left it out. An explicit value wins.
    pub fn stamp_if_missing(&mut self, now: Timestamp) {
        if self.taken_at.is_none() {
            self.taken_at = Some(now);
        }
    }
}

impl Entity for TestResult {
    const COLLECTION: &'static str = "testresult";
    const REQUIRED: &'static [&'static str] =
        &["user_id", "answers", "archetype", "summary", "score_map"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_entity;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "user_id": "u1",
            "answers": ["red", "blue", "green"],
            "archetype": "Explorer",
            "summary": "Curious and open",
            "score_map": {"openness": 0.9, "calm": 2}
        })
    }

    #[test]
    fn test_stamp_fills_missing_taken_at() {
        let mut result: TestResult = parse_entity(body()).unwrap();
        assert!(result.taken_at.is_none());
        result.stamp_if_missing(Timestamp::now());
        assert!(!result.taken_at.unwrap().as_str().is_empty());
    }

    #[test]
    fn test_stamp_keeps_explicit_taken_at() {
        let mut raw = body();
        raw["taken_at"] = json!("2024-12-31T23:59:59Z");
        let mut result: TestResult = parse_entity(raw).unwrap();
        result.stamp_if_missing(Timestamp::now());
        assert_eq!(result.taken_at.unwrap().as_str(), "2024-12-31T23:59:59Z");
    }

    #[test]
    fn test_invalid_taken_at_is_rejected() {
        let mut raw = body();
        raw["taken_at"] = json!("not a date");
        let errors = parse_entity::<TestResult>(raw).unwrap_err();
        assert!(errors[0].message.contains("invalid datetime"));
    }

    #[test]
    fn test_score_map_must_be_an_object() {
        let mut raw = body();
        raw["score_map"] = json!([1, 2]);
        assert!(parse_entity::<TestResult>(raw).is_err());
    }
}
