//! Default records written the first time a public listing finds its
//! collection empty.

use crate::models::{Plan, Professional};

pub fn default_plans() -> Vec<Plan> {
    vec![
        Plan::new("free", "Free", 0.0, &["Color test", "Basic insights"]),
        Plan::new(
            "plus",
            "Plus",
            9.0,
            &["Deeper insights", "Chatbot guidance", "History"],
        ),
        Plan::new(
            "pro",
            "Pro",
            29.0,
            &["All Plus", "Sessions with professionals", "Advanced analytics"],
        ),
    ]
}

pub fn default_professionals() -> Vec<Professional> {
    vec![
        Professional::new("Dr. Riley Shaw", "Therapist", "CBT, mindfulness"),
        Professional::new("Avery Chen", "Life Coach", "Habits, goals"),
        Professional::new("Samir Patel", "Counselor", "Stress, burnout"),
    ]
}
