//! Appointment database operations.

use std::collections::HashSet;

use serde_json::json;

use super::collections::APPOINTMENTS;
use super::{Database, DbResult, Direction, Filter, Query};
use crate::models::{Appointment, AppointmentStatus};

impl Database {
    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.get_document(APPOINTMENTS, id)?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// List every appointment linked to a request, oldest first.
    pub fn appointments_for_request(&self, request_id: &str) -> DbResult<Vec<Appointment>> {
        let query = Query::new(APPOINTMENTS)
            .filter(Filter::eq("linked_patient_id", request_id))
            .order_by_time("matched_at", Direction::Asc);

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// List a donor's appointments, newest first.
    pub fn appointments_for_donor(&self, donor_id: &str) -> DbResult<Vec<Appointment>> {
        let query = Query::new(APPOINTMENTS)
            .filter(Filter::eq("donor_id", donor_id))
            .order_by_time("matched_at", Direction::Desc);

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// Donor IDs already linked to a request (pending, confirmed or completed).
    pub fn linked_donor_ids(&self, request_id: &str) -> DbResult<HashSet<String>> {
        let statuses = AppointmentStatus::linked_statuses()
            .iter()
            .map(|s| json!(s.as_str()))
            .collect();
        let query = Query::new(APPOINTMENTS)
            .filter(Filter::eq("linked_patient_id", request_id))
            .filter(Filter::any_of("status", statuses));

        let mut ids = HashSet::new();
        for doc in self.query_documents(&query)? {
            let appointment: Appointment = doc.decode()?;
            ids.insert(appointment.donor_id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store(db: &Database, appointment: &Appointment) {
        db.set_document(APPOINTMENTS, &appointment.id, &serde_json::to_value(appointment).unwrap())
            .unwrap();
    }

    fn make(donor: &str, request: &str, status: AppointmentStatus) -> Appointment {
        let mut appt = Appointment::reservation(
            donor.into(),
            request.into(),
            "owner-1".into(),
            "clinic-1".into(),
            50,
            Utc::now(),
        );
        appt.status = status;
        appt
    }

    #[test]
    fn test_get_appointment() {
        let db = Database::open_in_memory().unwrap();
        let appt = make("d1", "r1", AppointmentStatus::PendingDonorAcceptance);
        store(&db, &appt);

        assert_eq!(db.get_appointment(&appt.id).unwrap().unwrap(), appt);
        assert!(db.get_appointment("missing").unwrap().is_none());
    }

    #[test]
    fn test_linked_donor_ids_ignore_negative_outcomes() {
        let db = Database::open_in_memory().unwrap();
        store(&db, &make("d1", "r1", AppointmentStatus::PendingDonorAcceptance));
        store(&db, &make("d2", "r1", AppointmentStatus::Confirmed));
        store(&db, &make("d3", "r1", AppointmentStatus::Completed));
        store(&db, &make("d4", "r1", AppointmentStatus::RejectedByDonor));
        store(&db, &make("d5", "r1", AppointmentStatus::Cancelled));
        store(&db, &make("d6", "r2", AppointmentStatus::Confirmed));

        let linked = db.linked_donor_ids("r1").unwrap();
        assert_eq!(linked.len(), 3);
        assert!(linked.contains("d1"));
        assert!(linked.contains("d2"));
        assert!(linked.contains("d3"));
        assert!(!linked.contains("d4"));
    }

    #[test]
    fn test_appointments_for_request_and_donor() {
        let db = Database::open_in_memory().unwrap();
        store(&db, &make("d1", "r1", AppointmentStatus::PendingDonorAcceptance));
        store(&db, &make("d2", "r1", AppointmentStatus::Cancelled));
        store(&db, &make("d1", "r2", AppointmentStatus::Confirmed));

        assert_eq!(db.appointments_for_request("r1").unwrap().len(), 2);
        assert_eq!(db.appointments_for_donor("d1").unwrap().len(), 2);
        assert!(db.appointments_for_donor("d9").unwrap().is_empty());
    }
}
