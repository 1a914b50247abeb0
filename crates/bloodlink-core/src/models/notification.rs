//! Notification models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of the notification recipient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Donor,
    Patient,
    Clinic,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Donor => "donor",
            UserRole::Patient => "patient",
            UserRole::Clinic => "clinic",
        }
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Donor: a clinic linked you to a request
    MatchFound,
    /// Patient: a donor was linked to your request
    DonorMatched,
    /// Patient: the donor confirmed an appointment
    AppointmentConfirmed,
    /// Clinic: the donor confirmed an appointment
    DonorAccepted,
    /// Patient: the donor declined
    DonorDeclined,
    AppointmentCancelled,
    DonationCompleted,
    RequestClosed,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::MatchFound => "match_found",
            NotificationType::DonorMatched => "donor_matched",
            NotificationType::AppointmentConfirmed => "appointment_confirmed",
            NotificationType::DonorAccepted => "donor_accepted",
            NotificationType::DonorDeclined => "donor_declined",
            NotificationType::AppointmentCancelled => "appointment_cancelled",
            NotificationType::DonationCompleted => "donation_completed",
            NotificationType::RequestClosed => "request_closed",
        }
    }
}

/// An in-app notification addressed to one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub user_role: UserRole,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    /// Payload mirroring the triggering event
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Create an unread notification.
    pub fn new(
        user_id: &str,
        user_role: UserRole,
        kind: NotificationType,
        title: &str,
        message: &str,
        data: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_role,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            data,
            read: false,
            created_at: now,
            read_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_notification_unread() {
        let n = Notification::new(
            "user-1",
            UserRole::Donor,
            NotificationType::MatchFound,
            "Match found",
            "A clinic needs your help",
            json!({"appointment_id": "a1"}),
            Utc::now(),
        );
        assert!(!n.read);
        assert!(n.read_at.is_none());
        assert_eq!(n.data["appointment_id"], "a1");
    }

    #[test]
    fn test_type_field_name() {
        let n = Notification::new(
            "user-1",
            UserRole::Patient,
            NotificationType::DonorDeclined,
            "t",
            "m",
            Value::Null,
            Utc::now(),
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "donor_declined");
        assert_eq!(json["user_role"], "patient");
    }
}
