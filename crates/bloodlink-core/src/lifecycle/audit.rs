//! Request counter audit.

use serde::{Deserialize, Serialize};

use super::Lifecycle;
use crate::matching::{MatchError, MatchResult};
use crate::models::AppointmentStatus;

/// Recorded request counters next to the ones recomputed from appointments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterAudit {
    pub recorded_pending: u32,
    pub recorded_confirmed: u32,
    pub actual_pending: u32,
    pub actual_confirmed: u32,
}

impl CounterAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded_pending == self.actual_pending
            && self.recorded_confirmed == self.actual_confirmed
    }
}

impl<'a> Lifecycle<'a> {
    /// Recount a request's reservations and compare with its counters.
    pub fn audit_request_counters(&self, request_id: &str) -> MatchResult<CounterAudit> {
        let request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| MatchError::NotFound(format!("request {}", request_id)))?;

        let mut actual_pending = 0;
        let mut actual_confirmed = 0;
        for appointment in self.db.appointments_for_request(request_id)? {
            match appointment.status {
                AppointmentStatus::PendingDonorAcceptance => actual_pending += 1,
                AppointmentStatus::Confirmed | AppointmentStatus::Completed => {
                    actual_confirmed += 1
                }
                _ => {}
            }
        }

        let audit = CounterAudit {
            recorded_pending: request.pending_matches,
            recorded_confirmed: request.confirmed_matches,
            actual_pending,
            actual_confirmed,
        };
        if !audit.is_consistent() {
            tracing::warn!(request_id, ?audit, "request counters out of sync");
        }
        Ok(audit)
    }
}
