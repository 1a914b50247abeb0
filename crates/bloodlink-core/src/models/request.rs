//! Patient blood request models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How soon the patient needs blood.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    #[serde(rename = "within_24_hours")]
    Within24Hours,
    #[serde(rename = "within_3_days")]
    Within3Days,
    NoRush,
}

impl Urgency {
    /// Urgent requests earn the same-city bonus when scoring.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Urgency::Immediate | Urgency::Within24Hours)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Immediate => "immediate",
            Urgency::Within24Hours => "within_24_hours",
            Urgency::Within3Days => "within_3_days",
            Urgency::NoRush => "no_rush",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "immediate" => Some(Urgency::Immediate),
            "within_24_hours" => Some(Urgency::Within24Hours),
            "within_3_days" => Some(Urgency::Within3Days),
            "no_rush" => Some(Urgency::NoRush),
            _ => None,
        }
    }
}

/// Request status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a clinic to link a donor
    Pending,
    /// A clinic has taken the case
    Accepted,
    /// Closed without a donation
    Rejected,
    /// Case closed after donation
    Completed,
}

impl RequestStatus {
    /// Open requests can still receive matches.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// Statuses a match or response may start from.
    pub fn open_statuses() -> [RequestStatus; 2] {
        [RequestStatus::Pending, RequestStatus::Accepted]
    }
}

/// A patient's request for blood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRequest {
    /// Request ID
    pub id: String,
    /// Patient (owner) user ID, target of patient notifications
    pub patient_id: String,
    /// Sick dog's name
    pub dog_name: String,
    /// Blood type needed
    pub blood_type: String,
    pub urgency: Urgency,
    /// Quantity needed in mL
    pub quantity_ml: u32,
    pub city: String,
    pub request_status: RequestStatus,
    /// Reservations awaiting donor response
    #[serde(default)]
    pub pending_matches: u32,
    /// Donors who confirmed (confirmed or completed appointments)
    #[serde(default)]
    pub confirmed_matches: u32,
    #[serde(default)]
    pub assigned_clinic_id: Option<String>,
    /// Advisory expiry shown to users; nothing enforces it
    #[serde(default)]
    pub request_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRequest {
    /// Create a new pending request.
    pub fn new(
        patient_id: String,
        dog_name: String,
        blood_type: String,
        urgency: Urgency,
        quantity_ml: u32,
        city: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            dog_name,
            blood_type,
            urgency,
            quantity_ml,
            city,
            request_status: RequestStatus::Pending,
            pending_matches: 0,
            confirmed_matches: 0,
            assigned_clinic_id: None,
            request_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display-only expiry check.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.request_expires.map_or(false, |expires| now >= expires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_request(urgency: Urgency) -> PatientRequest {
        PatientRequest::new(
            "owner-1".into(),
            "Bella".into(),
            "DEA 1.1 negative".into(),
            urgency,
            450,
            "Austin".into(),
        )
    }

    #[test]
    fn test_new_request_is_pending() {
        let request = make_request(Urgency::NoRush);
        assert_eq!(request.request_status, RequestStatus::Pending);
        assert_eq!(request.pending_matches, 0);
        assert!(request.request_status.is_open());
    }

    #[test]
    fn test_urgency() {
        assert!(Urgency::Immediate.is_urgent());
        assert!(Urgency::Within24Hours.is_urgent());
        assert!(!Urgency::Within3Days.is_urgent());
        assert!(!Urgency::NoRush.is_urgent());

        for urgency in [Urgency::Immediate, Urgency::Within24Hours, Urgency::Within3Days, Urgency::NoRush] {
            assert_eq!(Urgency::parse(urgency.as_str()), Some(urgency));
        }
        assert_eq!(Urgency::parse("yesterday"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_value(Urgency::Within24Hours).unwrap();
        assert_eq!(json, "within_24_hours");
        let json = serde_json::to_value(RequestStatus::Completed).unwrap();
        assert_eq!(json, "completed");
        assert_eq!(RequestStatus::parse("rejected"), Some(RequestStatus::Rejected));
        assert_eq!(RequestStatus::parse("open"), None);
    }

    #[test]
    fn test_expiry_is_advisory() {
        let mut request = make_request(Urgency::Immediate);
        let now = Utc::now();
        assert!(!request.is_expired(now));

        request.request_expires = Some(now - Duration::hours(1));
        assert!(request.is_expired(now));
        // Still open: expiry never changes status
        assert!(request.request_status.is_open());
    }
}
