use serde::{Deserialize, Serialize};

use super::{Entity, FieldError};

pub const DEFAULT_RATING: f64 = 4.8;

fn default_rating() -> Option<f64> {
    Some(DEFAULT_RATING)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub name: String,
    pub specialty: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// ISO 8601 datetime strings.
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(default = "default_rating")]
    pub rating: Option<f64>,
}

impl Professional {
    pub fn new(name: &str, specialty: &str, bio: &str) -> Self {
        Self {
            name: name.to_string(),
            specialty: specialty.to_string(),
            bio: Some(bio.to_string()),
            availability: Vec::new(),
            rating: default_rating(),
        }
    }
}

impl Entity for Professional {
    const COLLECTION: &'static str = "professional";
    const REQUIRED: &'static [&'static str] = &["name", "specialty"];

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        match self.rating {
            Some(r) if !(0.0..=5.0).contains(&r) => Err(vec![FieldError::new(
                "rating",
                format!("rating must be between 0 and 5, got {}", r),
            )]),
            _ => Ok(()),
        }
    }
}
