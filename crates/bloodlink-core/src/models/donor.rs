//! Donor models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A dog registered to give blood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Donor {
    /// Donor user ID, also the target of donor notifications
    pub id: String,
    /// Dog's name
    pub dog_name: String,
    /// City the donor lives in
    pub city: String,
    /// Canine blood type (e.g., "DEA 1.1 negative")
    pub blood_type: String,
    /// Weight in kg
    pub weight_kg: f64,
    /// Date of the most recent donation
    #[serde(default)]
    pub last_donation: Option<NaiveDate>,
    /// Owner reported an ongoing medical condition
    #[serde(default)]
    pub is_medical_condition: bool,
    /// Lifetime completed donations
    #[serde(default)]
    pub donation_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    /// Create a new donor with required fields.
    pub fn new(dog_name: String, city: String, blood_type: String, weight_kg: f64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            dog_name,
            city,
            blood_type,
            weight_kg,
            last_donation: None,
            is_medical_condition: false,
            donation_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check record invariants before persisting.
    pub fn validate(&self) -> Result<(), String> {
        if !self.weight_kg.is_finite() || self.weight_kg < 0.0 {
            return Err(format!("Donor {} has invalid weight {}", self.id, self.weight_kg));
        }
        if self.blood_type.trim().is_empty() {
            return Err(format!("Donor {} has no blood type", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_donor() {
        let donor = Donor::new("Rex".into(), "Austin".into(), "DEA 1.1 negative".into(), 32.0);
        assert_eq!(donor.id.len(), 36);
        assert_eq!(donor.donation_count, 0);
        assert!(donor.last_donation.is_none());
        assert!(donor.validate().is_ok());
    }

    #[test]
    fn test_validate_weight() {
        let mut donor = Donor::new("Rex".into(), "Austin".into(), "A".into(), -1.0);
        assert!(donor.validate().is_err());

        donor.weight_kg = f64::NAN;
        assert!(donor.validate().is_err());

        donor.weight_kg = 0.0;
        assert!(donor.validate().is_ok());
    }

    #[test]
    fn test_missing_optional_fields_deserialize() {
        let json = r#"{
            "id": "d1", "dog_name": "Rex", "city": "Austin",
            "blood_type": "A", "weight_kg": 30.0,
            "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let donor: Donor = serde_json::from_str(json).unwrap();
        assert!(!donor.is_medical_condition);
        assert_eq!(donor.donation_count, 0);
    }
}
