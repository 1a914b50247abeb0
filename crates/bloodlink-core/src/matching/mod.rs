//! Donor matching for patient blood requests.
//!
//! Pipeline: Blood-type lookup → Eligibility → Scoring → Ranked candidates

mod eligibility;
mod scorer;
mod finder;

pub use eligibility::*;
pub use scorer::*;
pub use finder::*;

use crate::db::DbError;
use crate::models::AppointmentStatus;
use thiserror::Error;

/// Matching and lifecycle errors.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The appointment left the expected state, usually because another
    /// response won the race.
    #[error("Appointment {appointment_id} already resolved ({})", .status.as_str())]
    AlreadyResolved {
        appointment_id: String,
        status: AppointmentStatus,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Request is closed: {0}")]
    RequestClosed(String),

    #[error("Not allowed for this user: {0}")]
    WrongActor(String),

    /// A batch failed and was rolled back as a whole.
    #[error("Batch write failed, nothing applied: {0}")]
    PartialWriteFailure(DbError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_resolved_message() {
        let err = MatchError::AlreadyResolved {
            appointment_id: "a1".into(),
            status: AppointmentStatus::RejectedByDonor,
        };
        assert_eq!(
            err.to_string(),
            "Appointment a1 already resolved (rejected_by_donor)"
        );
    }

    #[test]
    fn test_read_errors_convert() {
        let err: MatchError = DbError::NotFound("donors/x".into()).into();
        assert!(matches!(err, MatchError::Database(DbError::NotFound(_))));
    }
}
