//! Donor answers a reservation: first response wins.

use chrono::NaiveDate;
use serde_json::json;

use super::{notify, open_request_statuses, Lifecycle};
use crate::db::collections::{APPOINTMENTS, REQUESTS};
use crate::db::WriteOp;
use crate::matching::{MatchError, MatchResult};
use crate::models::{Appointment, AppointmentStatus, Notification, NotificationType, UserRole};

impl<'a> Lifecycle<'a> {
    /// Check the acting donor may still answer this appointment.
    fn pending_for_donor(
        &self,
        appointment_id: &str,
        acting_donor_id: &str,
    ) -> MatchResult<Appointment> {
        let appointment = self.load_appointment(appointment_id)?;
        if appointment.donor_id != acting_donor_id {
            return Err(MatchError::WrongActor(format!(
                "appointment {} belongs to another donor",
                appointment_id
            )));
        }
        if appointment.status != AppointmentStatus::PendingDonorAcceptance {
            return Err(MatchError::AlreadyResolved {
                appointment_id: appointment.id,
                status: appointment.status,
            });
        }
        Ok(appointment)
    }

    /// Donor accepts a reservation and picks a slot.
    ///
    /// Fails with `AlreadyResolved` when another response got there first.
    /// Other reservations on the same request are left alone.
    pub fn accept_match(
        &self,
        appointment_id: &str,
        chosen_date: Option<NaiveDate>,
        chosen_time: &str,
        acting_donor_id: &str,
    ) -> MatchResult<Appointment> {
        let date = chosen_date
            .ok_or_else(|| MatchError::Validation("appointment date is required".into()))?;
        let time = chosen_time.trim();
        if time.is_empty() {
            return Err(MatchError::Validation("appointment time is required".into()));
        }

        let mut appointment = self.pending_for_donor(appointment_id, acting_donor_id)?;
        let request = self
            .db
            .get_request(&appointment.linked_patient_id)?
            .ok_or_else(|| {
                MatchError::NotFound(format!("request {}", appointment.linked_patient_id))
            })?;
        if !request.request_status.is_open() {
            return Err(MatchError::RequestClosed(format!(
                "{} is {}",
                request.id,
                request.request_status.as_str()
            )));
        }

        let now = self.clock.now();
        let when = format!("{} at {}", date.format("%Y-%m-%d"), time);

        let patient_notice = Notification::new(
            &appointment.patient_user_id,
            UserRole::Patient,
            NotificationType::AppointmentConfirmed,
            "Donation confirmed",
            &format!("A donor confirmed a donation for {} on {}.", request.dog_name, when),
            json!({
                "appointment_id": appointment.id,
                "request_id": request.id,
                "appointment_date": date,
                "appointment_time": time,
            }),
            now,
        );
        let clinic_notice = Notification::new(
            &appointment.clinic_id,
            UserRole::Clinic,
            NotificationType::DonorAccepted,
            "Donor accepted",
            &format!("The donor for {} accepted. Appointment on {}.", request.dog_name, when),
            json!({
                "appointment_id": appointment.id,
                "request_id": request.id,
                "donor_id": appointment.donor_id,
                "appointment_date": date,
                "appointment_time": time,
            }),
            now,
        );

        let mut ops = vec![WriteOp::update_if(
            APPOINTMENTS,
            &appointment.id,
            "status",
            vec![json!(AppointmentStatus::PendingDonorAcceptance.as_str())],
            json!({
                "status": AppointmentStatus::Confirmed.as_str(),
                "appointment_date": date,
                "appointment_time": time,
                "accepted_by": acting_donor_id,
                "accepted_at": now,
            }),
        )];
        ops.extend(self.mark_read_ops(
            acting_donor_id,
            NotificationType::MatchFound,
            &appointment.id,
            now,
        )?);
        ops.push(notify(&patient_notice)?);
        ops.push(notify(&clinic_notice)?);
        ops.push(WriteOp::increment(REQUESTS, &request.id, "pending_matches", -1));
        ops.push(WriteOp::increment(REQUESTS, &request.id, "confirmed_matches", 1));
        ops.push(WriteOp::update_if(
            REQUESTS,
            &request.id,
            "request_status",
            open_request_statuses(),
            json!({ "request_status": "accepted", "updated_at": now }),
        ));
        self.commit("accept_match", &ops)?;

        appointment.status = AppointmentStatus::Confirmed;
        appointment.appointment_date = Some(date);
        appointment.appointment_time = Some(time.to_string());
        appointment.accepted_by = Some(acting_donor_id.to_string());
        appointment.accepted_at = Some(now);

        tracing::info!(appointment_id = %appointment.id, "donor accepted match");
        Ok(appointment)
    }

    /// Donor declines a reservation.
    ///
    /// The patient is told the search continues; the notice carries no donor
    /// identity.
    pub fn decline_match(
        &self,
        appointment_id: &str,
        acting_donor_id: &str,
    ) -> MatchResult<Appointment> {
        let mut appointment = self.pending_for_donor(appointment_id, acting_donor_id)?;
        let now = self.clock.now();

        let patient_notice = Notification::new(
            &appointment.patient_user_id,
            UserRole::Patient,
            NotificationType::DonorDeclined,
            "Still searching",
            "A matched donor is not available. We are still searching for a donor for your request.",
            json!({
                "appointment_id": appointment.id,
                "request_id": appointment.linked_patient_id,
            }),
            now,
        );

        let mut ops = vec![WriteOp::update_if(
            APPOINTMENTS,
            &appointment.id,
            "status",
            vec![json!(AppointmentStatus::PendingDonorAcceptance.as_str())],
            json!({
                "status": AppointmentStatus::RejectedByDonor.as_str(),
                "rejected_by": acting_donor_id,
                "rejected_at": now,
            }),
        )];
        ops.extend(self.mark_read_ops(
            acting_donor_id,
            NotificationType::MatchFound,
            &appointment.id,
            now,
        )?);
        ops.push(notify(&patient_notice)?);
        ops.push(WriteOp::increment(
            REQUESTS,
            &appointment.linked_patient_id,
            "pending_matches",
            -1,
        ));
        self.commit("decline_match", &ops)?;

        appointment.status = AppointmentStatus::RejectedByDonor;
        appointment.rejected_by = Some(acting_donor_id.to_string());
        appointment.rejected_at = Some(now);

        tracing::info!(appointment_id = %appointment.id, "donor declined match");
        Ok(appointment)
    }
}
