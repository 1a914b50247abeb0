//! Clinic models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A veterinary clinic that links donors to requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    /// City used for donor locality
    #[serde(default)]
    pub city: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Clinic {
    pub fn new(name: String, city: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            city,
            created_at: Utc::now(),
        }
    }
}
