//! Clinic links a donor to a request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{notify, open_request_statuses, to_body, Lifecycle};
use crate::db::collections::{APPOINTMENTS, REQUESTS};
use crate::db::WriteOp;
use crate::matching::{CandidateFinder, MatchError, MatchResult};
use crate::models::{Appointment, Notification, NotificationType, UserRole};

/// A clinic's choice of donor for a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkRequest {
    pub donor_id: String,
    pub request_id: String,
    pub clinic_id: String,
    /// Slot the clinic suggests; the donor may pick another on accept
    #[serde(default)]
    pub proposed_date: Option<NaiveDate>,
    #[serde(default)]
    pub proposed_time: Option<String>,
}

impl<'a> Lifecycle<'a> {
    /// Reserve a donor for a request.
    ///
    /// Creates the appointment in `pending_donor_acceptance`, notifies the
    /// donor and the patient, bumps `pending_matches` and moves the request to
    /// `accepted` under the linking clinic. Eligibility is not enforced.
    pub fn create_match(&self, link: &LinkRequest) -> MatchResult<Appointment> {
        if link.clinic_id.trim().is_empty() {
            return Err(MatchError::Validation("clinic_id is required".into()));
        }

        let request = self
            .db
            .get_request(&link.request_id)?
            .ok_or_else(|| MatchError::NotFound(format!("request {}", link.request_id)))?;
        if !request.request_status.is_open() {
            return Err(MatchError::RequestClosed(format!(
                "{} is {}",
                request.id,
                request.request_status.as_str()
            )));
        }

        let donor = self
            .db
            .get_donor(&link.donor_id)?
            .ok_or_else(|| MatchError::NotFound(format!("donor {}", link.donor_id)))?;
        if donor.blood_type != request.blood_type {
            return Err(MatchError::Validation(format!(
                "donor blood type {} does not match request blood type {}",
                donor.blood_type, request.blood_type
            )));
        }

        let clinic_city = self.db.get_clinic(&link.clinic_id)?.and_then(|c| c.city);
        let locality_city = clinic_city.as_deref().unwrap_or(&request.city);
        let linked = self.db.linked_donor_ids(&request.id)?;

        let now = self.clock.now();
        let candidate = CandidateFinder::new(self.db, self.policy).evaluate(
            donor,
            &request,
            locality_city,
            &linked,
            self.clock.today(),
        );
        if candidate.already_linked {
            tracing::debug!(
                donor_id = %candidate.donor.id,
                request_id = %request.id,
                "donor already linked to request, creating parallel reservation"
            );
        }
        if !candidate.eligibility.is_eligible {
            tracing::debug!(
                donor_id = %candidate.donor.id,
                reasons = ?candidate.eligibility.reasons,
                "linking ineligible donor"
            );
        }

        let mut appointment = Appointment::reservation(
            candidate.donor.id.clone(),
            request.id.clone(),
            request.patient_id.clone(),
            link.clinic_id.clone(),
            candidate.match_score,
            now,
        );
        appointment.appointment_date = link.proposed_date;
        appointment.appointment_time = link.proposed_time.clone();

        let donor_notice = Notification::new(
            &candidate.donor.id,
            UserRole::Donor,
            NotificationType::MatchFound,
            "New donation match",
            &format!(
                "{} needs {} blood. A clinic has asked {} to donate.",
                request.dog_name, request.blood_type, candidate.donor.dog_name
            ),
            json!({
                "appointment_id": appointment.id,
                "request_id": request.id,
                "clinic_id": link.clinic_id,
                "urgency": request.urgency,
                "proposed_date": link.proposed_date,
                "proposed_time": link.proposed_time,
            }),
            now,
        );
        let patient_notice = Notification::new(
            &request.patient_id,
            UserRole::Patient,
            NotificationType::DonorMatched,
            "Donor found",
            &format!(
                "A donor has been matched to {}'s request and has been asked to confirm.",
                request.dog_name
            ),
            json!({
                "appointment_id": appointment.id,
                "request_id": request.id,
            }),
            now,
        );

        let ops = vec![
            WriteOp::set(APPOINTMENTS, &appointment.id, to_body(&appointment)?),
            notify(&donor_notice)?,
            notify(&patient_notice)?,
            WriteOp::increment(REQUESTS, &request.id, "pending_matches", 1),
            WriteOp::update_if(
                REQUESTS,
                &request.id,
                "request_status",
                open_request_statuses(),
                json!({
                    "request_status": "accepted",
                    "assigned_clinic_id": link.clinic_id,
                    "updated_at": now,
                }),
            ),
        ];
        self.commit("create_match", &ops)?;

        tracing::info!(
            appointment_id = %appointment.id,
            request_id = %request.id,
            match_score = appointment.match_score,
            "donor linked to request"
        );
        Ok(appointment)
    }
}
