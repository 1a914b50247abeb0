//! Patient request database operations.

use serde_json::json;

use super::collections::REQUESTS;
use super::{Database, DbResult, Direction, Filter, Query};
use crate::models::{PatientRequest, RequestStatus};

impl Database {
    /// Insert or replace a request.
    pub fn put_request(&self, request: &PatientRequest) -> DbResult<()> {
        self.set_document(REQUESTS, &request.id, &serde_json::to_value(request)?)
    }

    /// Get a request by ID.
    pub fn get_request(&self, id: &str) -> DbResult<Option<PatientRequest>> {
        self.get_document(REQUESTS, id)?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// List all requests created by a patient, newest first.
    pub fn requests_for_patient(&self, patient_id: &str) -> DbResult<Vec<PatientRequest>> {
        let query = Query::new(REQUESTS)
            .filter(Filter::eq("patient_id", patient_id))
            .order_by_time("created_at", Direction::Desc);

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }

    /// List requests that can still receive matches, optionally for one blood type.
    pub fn open_requests(&self, blood_type: Option<&str>) -> DbResult<Vec<PatientRequest>> {
        let statuses = RequestStatus::open_statuses()
            .iter()
            .map(|s| json!(s.as_str()))
            .collect();
        let mut query = Query::new(REQUESTS)
            .filter(Filter::any_of("request_status", statuses))
            .order_by_time("created_at", Direction::Asc);
        if let Some(blood_type) = blood_type {
            query = query.filter(Filter::eq("blood_type", blood_type));
        }

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Urgency;

    fn make_request(patient: &str, blood_type: &str) -> PatientRequest {
        PatientRequest::new(
            patient.into(),
            "Bella".into(),
            blood_type.into(),
            Urgency::Within3Days,
            450,
            "Austin".into(),
        )
    }

    #[test]
    fn test_put_and_get() {
        let db = Database::open_in_memory().unwrap();
        let request = make_request("owner-1", "DEA 1.1 negative");
        db.put_request(&request).unwrap();

        let retrieved = db.get_request(&request.id).unwrap().unwrap();
        assert_eq!(retrieved, request);
    }

    #[test]
    fn test_requests_for_patient() {
        let db = Database::open_in_memory().unwrap();
        db.put_request(&make_request("owner-1", "A")).unwrap();
        db.put_request(&make_request("owner-1", "B")).unwrap();
        db.put_request(&make_request("owner-2", "A")).unwrap();

        assert_eq!(db.requests_for_patient("owner-1").unwrap().len(), 2);
        assert_eq!(db.requests_for_patient("owner-3").unwrap().len(), 0);
    }

    #[test]
    fn test_open_requests() {
        let db = Database::open_in_memory().unwrap();
        let open = make_request("owner-1", "A");
        let mut closed = make_request("owner-2", "A");
        closed.request_status = RequestStatus::Completed;
        let other = make_request("owner-3", "B");
        db.put_request(&open).unwrap();
        db.put_request(&closed).unwrap();
        db.put_request(&other).unwrap();

        assert_eq!(db.open_requests(None).unwrap().len(), 2);

        let a_only = db.open_requests(Some("A")).unwrap();
        assert_eq!(a_only.len(), 1);
        assert_eq!(a_only[0].id, open.id);
    }
}
