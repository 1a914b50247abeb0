//! Appointment (match) models and the reservation state machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Appointment status.
///
/// ```text
/// pending_donor_acceptance ──► confirmed ──► completed
///          │                       │
///          ├──► rejected_by_donor  │
///          └──────────► cancelled ◄┘
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Reservation awaiting the donor's answer
    PendingDonorAcceptance,
    /// Donor accepted and picked a slot
    Confirmed,
    /// Donor declined
    RejectedByDonor,
    /// Donation took place
    Completed,
    /// Clinic cancelled
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::PendingDonorAcceptance => "pending_donor_acceptance",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::RejectedByDonor => "rejected_by_donor",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Valid next states.
    pub fn next_states(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::PendingDonorAcceptance => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::RejectedByDonor,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => {
                &[AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::RejectedByDonor
            | AppointmentStatus::Completed
            | AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Statuses that count as an existing link between a donor and a request.
    pub fn linked_statuses() -> [AppointmentStatus; 3] {
        [
            AppointmentStatus::PendingDonorAcceptance,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
        ]
    }
}

/// A reservation linking one donor to one patient request at a clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub donor_id: String,
    /// Request this donor is linked to
    pub linked_patient_id: String,
    /// Patient (owner) user ID, copied for notification fan-out
    pub patient_user_id: String,
    pub clinic_id: String,
    pub status: AppointmentStatus,
    /// Clinic-proposed at link time, donor-chosen at accept
    #[serde(default)]
    pub appointment_date: Option<NaiveDate>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    /// Score shown to the clinic when the link was made
    #[serde(default)]
    pub match_score: u32,
    pub matched_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_by: Option<String>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Create a fresh reservation in `pending_donor_acceptance`.
    pub fn reservation(
        donor_id: String,
        request_id: String,
        patient_user_id: String,
        clinic_id: String,
        match_score: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            donor_id,
            linked_patient_id: request_id,
            patient_user_id,
            clinic_id,
            status: AppointmentStatus::PendingDonorAcceptance,
            appointment_date: None,
            appointment_time: None,
            match_score,
            matched_at: now,
            accepted_by: None,
            accepted_at: None,
            rejected_by: None,
            rejected_at: None,
            cancelled_at: None,
            cancel_reason: None,
            completed_at: None,
        }
    }

    /// Check if the donor still has to answer.
    pub fn is_reservation(&self) -> bool {
        self.status == AppointmentStatus::PendingDonorAcceptance
    }
}
