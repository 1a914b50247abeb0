//! Clinic follow-up: cancel, complete, close.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{notify, open_request_statuses, Lifecycle};
use crate::db::collections::{APPOINTMENTS, DONORS, REQUESTS};
use crate::db::WriteOp;
use crate::matching::{MatchError, MatchResult};
use crate::models::{
    Appointment, AppointmentStatus, Notification, NotificationType, PatientRequest,
    RequestStatus, UserRole,
};

impl<'a> Lifecycle<'a> {
    /// Load an appointment the acting clinic owns.
    fn owned_by_clinic(
        &self,
        appointment_id: &str,
        acting_clinic_id: &str,
    ) -> MatchResult<Appointment> {
        let appointment = self.load_appointment(appointment_id)?;
        if appointment.clinic_id != acting_clinic_id {
            return Err(MatchError::WrongActor(format!(
                "appointment {} belongs to another clinic",
                appointment_id
            )));
        }
        Ok(appointment)
    }

    /// Clinic cancels a pending or confirmed appointment.
    pub fn cancel_appointment(
        &self,
        appointment_id: &str,
        acting_clinic_id: &str,
        reason: Option<&str>,
    ) -> MatchResult<Appointment> {
        let mut appointment = self.owned_by_clinic(appointment_id, acting_clinic_id)?;
        let observed = appointment.status;
        if !observed.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(MatchError::AlreadyResolved {
                appointment_id: appointment.id,
                status: observed,
            });
        }
        let counter = match observed {
            AppointmentStatus::Confirmed => "confirmed_matches",
            _ => "pending_matches",
        };

        let now = self.clock.now();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let message = match reason {
            Some(reason) => format!("The clinic cancelled this appointment: {}", reason),
            None => "The clinic cancelled this appointment.".to_string(),
        };
        let data = json!({
            "appointment_id": appointment.id,
            "request_id": appointment.linked_patient_id,
            "reason": reason,
        });

        let mut ops = vec![WriteOp::update_if(
            APPOINTMENTS,
            &appointment.id,
            "status",
            vec![json!(observed.as_str())],
            json!({
                "status": AppointmentStatus::Cancelled.as_str(),
                "cancelled_at": now,
                "cancel_reason": reason,
            }),
        )];
        ops.extend(self.mark_read_ops(
            &appointment.donor_id,
            NotificationType::MatchFound,
            &appointment.id,
            now,
        )?);
        ops.push(notify(&Notification::new(
            &appointment.donor_id,
            UserRole::Donor,
            NotificationType::AppointmentCancelled,
            "Appointment cancelled",
            &message,
            data.clone(),
            now,
        ))?);
        ops.push(notify(&Notification::new(
            &appointment.patient_user_id,
            UserRole::Patient,
            NotificationType::AppointmentCancelled,
            "Appointment cancelled",
            &message,
            data,
            now,
        ))?);
        ops.push(WriteOp::increment(
            REQUESTS,
            &appointment.linked_patient_id,
            counter,
            -1,
        ));
        self.commit("cancel_appointment", &ops)?;

        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(now);
        appointment.cancel_reason = reason.map(str::to_string);

        tracing::info!(
            appointment_id = %appointment.id,
            from = observed.as_str(),
            "appointment cancelled"
        );
        Ok(appointment)
    }

    /// Clinic records that a confirmed donation took place.
    ///
    /// The donor's `last_donation` becomes the appointment date (today when
    /// none was set) and `donation_count` goes up by one.
    pub fn complete_appointment(
        &self,
        appointment_id: &str,
        acting_clinic_id: &str,
    ) -> MatchResult<Appointment> {
        let mut appointment = self.owned_by_clinic(appointment_id, acting_clinic_id)?;
        match appointment.status {
            status if status.can_transition_to(AppointmentStatus::Completed) => {}
            AppointmentStatus::PendingDonorAcceptance => {
                return Err(MatchError::Validation(format!(
                    "appointment {} has not been accepted by the donor",
                    appointment.id
                )))
            }
            status => {
                return Err(MatchError::AlreadyResolved {
                    appointment_id: appointment.id,
                    status,
                })
            }
        }

        let donor = self
            .db
            .get_donor(&appointment.donor_id)?
            .ok_or_else(|| MatchError::NotFound(format!("donor {}", appointment.donor_id)))?;

        let now = self.clock.now();
        let donated_on = appointment.appointment_date.unwrap_or_else(|| self.clock.today());
        let data = json!({
            "appointment_id": appointment.id,
            "request_id": appointment.linked_patient_id,
            "donation_date": donated_on,
        });

        let ops = vec![
            WriteOp::update_if(
                APPOINTMENTS,
                &appointment.id,
                "status",
                vec![json!(AppointmentStatus::Confirmed.as_str())],
                json!({
                    "status": AppointmentStatus::Completed.as_str(),
                    "completed_at": now,
                }),
            ),
            WriteOp::update(
                DONORS,
                &donor.id,
                json!({ "last_donation": donated_on, "updated_at": now }),
            ),
            WriteOp::increment(DONORS, &donor.id, "donation_count", 1),
            notify(&Notification::new(
                &donor.id,
                UserRole::Donor,
                NotificationType::DonationCompleted,
                "Thank you",
                &format!("{}'s donation has been recorded. Thank you!", donor.dog_name),
                data.clone(),
                now,
            ))?,
            notify(&Notification::new(
                &appointment.patient_user_id,
                UserRole::Patient,
                NotificationType::DonationCompleted,
                "Donation completed",
                "The donation for your request has been completed.",
                data,
                now,
            ))?,
        ];
        self.commit("complete_appointment", &ops)?;

        appointment.status = AppointmentStatus::Completed;
        appointment.completed_at = Some(now);

        tracing::info!(
            appointment_id = %appointment.id,
            donor_id = %donor.id,
            "donation completed"
        );
        Ok(appointment)
    }

    /// Clinic closes a request as `completed` or `rejected`.
    ///
    /// Outstanding reservations are not touched.
    pub fn close_request(
        &self,
        request_id: &str,
        acting_clinic_id: &str,
        outcome: RequestStatus,
    ) -> MatchResult<PatientRequest> {
        if outcome.is_open() {
            return Err(MatchError::Validation(format!(
                "cannot close a request as {}",
                outcome.as_str()
            )));
        }

        let mut request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| MatchError::NotFound(format!("request {}", request_id)))?;
        if !request.request_status.is_open() {
            return Err(MatchError::RequestClosed(format!(
                "{} is {}",
                request.id,
                request.request_status.as_str()
            )));
        }
        if let Some(assigned) = &request.assigned_clinic_id {
            if assigned != acting_clinic_id {
                return Err(MatchError::WrongActor(format!(
                    "request {} is assigned to another clinic",
                    request.id
                )));
            }
        }

        let now = self.clock.now();
        let ops = self.close_request_ops(&request, acting_clinic_id, outcome, now)?;
        self.commit("close_request", &ops)?;

        request.request_status = outcome;
        request.assigned_clinic_id = Some(acting_clinic_id.to_string());
        request.updated_at = now;

        tracing::info!(request_id = %request.id, outcome = outcome.as_str(), "request closed");
        Ok(request)
    }

    /// The close batch. The clinic assignment is re-checked inside it so a
    /// concurrent claim by another clinic makes the whole batch fail.
    fn close_request_ops(
        &self,
        request: &PatientRequest,
        acting_clinic_id: &str,
        outcome: RequestStatus,
        now: DateTime<Utc>,
    ) -> MatchResult<Vec<WriteOp>> {
        let message = match outcome {
            RequestStatus::Completed => format!("The request for {} has been fulfilled.", request.dog_name),
            _ => format!("The request for {} has been closed.", request.dog_name),
        };

        Ok(vec![
            WriteOp::update_if(
                REQUESTS,
                &request.id,
                "assigned_clinic_id",
                vec![Value::Null, json!(acting_clinic_id)],
                json!({ "updated_at": now }),
            ),
            WriteOp::update_if(
                REQUESTS,
                &request.id,
                "request_status",
                open_request_statuses(),
                json!({
                    "request_status": outcome.as_str(),
                    "assigned_clinic_id": acting_clinic_id,
                    "updated_at": now,
                }),
            ),
            notify(&Notification::new(
                &request.patient_id,
                UserRole::Patient,
                NotificationType::RequestClosed,
                "Request closed",
                &message,
                json!({ "request_id": request.id, "outcome": outcome.as_str() }),
                now,
            ))?,
        ])
    }
}
