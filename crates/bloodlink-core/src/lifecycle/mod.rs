//! Appointment lifecycle transactions.
//!
//! Each transition is one [`Database::batch_write`]: the appointment status
//! change (guarded by a compare-and-swap on `status`), the notifications it
//! fans out to, and the request counters it moves all commit together or not
//! at all.
//!
//! ```text
//! create_match ──► pending_donor_acceptance ──► accept_match ──► confirmed ──► complete_appointment
//!                          │                                        │
//!                          ├──► decline_match (rejected_by_donor)   │
//!                          └──────────► cancel_appointment ◄────────┘
//! ```

mod link;
mod response;
mod followup;
mod audit;

pub use link::*;
#[allow(unused_imports)]
pub use response::*;
#[allow(unused_imports)]
pub use followup::*;
pub use audit::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::clock::Clock;
use crate::config::EligibilityPolicy;
use crate::db::collections::{APPOINTMENTS, NOTIFICATIONS, REQUESTS};
use crate::db::{BatchReceipt, Database, DbError, WriteOp};
use crate::matching::{MatchError, MatchResult};
use crate::models::{Appointment, Notification, NotificationType};

/// Runs lifecycle transactions against one database handle.
pub struct Lifecycle<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    policy: &'a EligibilityPolicy,
}

impl<'a> Lifecycle<'a> {
    /// Create a new lifecycle runner.
    pub fn new(db: &'a Database, clock: &'a dyn Clock, policy: &'a EligibilityPolicy) -> Self {
        Self { db, clock, policy }
    }

    fn load_appointment(&self, appointment_id: &str) -> MatchResult<Appointment> {
        self.db
            .get_appointment(appointment_id)?
            .ok_or_else(|| MatchError::NotFound(format!("appointment {}", appointment_id)))
    }

    /// Mark a user's unread notifications of one kind for an appointment as read.
    fn mark_read_ops(
        &self,
        user_id: &str,
        kind: NotificationType,
        appointment_id: &str,
        now: DateTime<Utc>,
    ) -> MatchResult<Vec<WriteOp>> {
        let unread = self
            .db
            .unread_notifications_for_appointment(user_id, kind, appointment_id)?;
        Ok(unread
            .iter()
            .map(|n| {
                WriteOp::update(
                    NOTIFICATIONS,
                    &n.id,
                    json!({ "read": true, "read_at": now }),
                )
            })
            .collect())
    }

    /// Commit a batch, translating store failures into lifecycle errors.
    ///
    /// A lost compare-and-swap on an appointment reports the status that won.
    /// A lost compare-and-swap on a request means it was closed or claimed
    /// by another clinic meanwhile.
    fn commit(&self, label: &str, ops: &[WriteOp]) -> MatchResult<BatchReceipt> {
        match self.db.batch_write(label, ops) {
            Ok(receipt) => Ok(receipt),
            Err(DbError::PreconditionFailed { collection, id, .. }) if collection == APPOINTMENTS => {
                let current = self.load_appointment(&id)?;
                tracing::info!(
                    label,
                    appointment_id = %id,
                    status = current.status.as_str(),
                    "lost status race"
                );
                Err(MatchError::AlreadyResolved {
                    appointment_id: id,
                    status: current.status,
                })
            }
            Err(DbError::PreconditionFailed { collection, id, field })
                if collection == REQUESTS && field == "assigned_clinic_id" =>
            {
                tracing::info!(label, request_id = %id, "request claimed by another clinic");
                Err(MatchError::WrongActor(format!(
                    "request {} is assigned to another clinic",
                    id
                )))
            }
            Err(DbError::PreconditionFailed { collection, id, .. }) if collection == REQUESTS => {
                tracing::info!(label, request_id = %id, "request closed during transaction");
                Err(MatchError::RequestClosed(id))
            }
            Err(e) => {
                tracing::warn!(label, error = %e, "lifecycle batch failed");
                Err(MatchError::PartialWriteFailure(e))
            }
        }
    }
}

/// Serialize a record into a document body.
fn to_body<T: Serialize>(record: &T) -> MatchResult<Value> {
    serde_json::to_value(record).map_err(|e| MatchError::Database(DbError::Json(e)))
}

/// A `Set` op writing one notification.
fn notify(notification: &Notification) -> MatchResult<WriteOp> {
    Ok(WriteOp::set(
        NOTIFICATIONS,
        &notification.id,
        to_body(notification)?,
    ))
}

/// Open request statuses as CAS expectations.
fn open_request_statuses() -> Vec<Value> {
    crate::models::RequestStatus::open_statuses()
        .iter()
        .map(|s| Value::from(s.as_str()))
        .collect()
}
