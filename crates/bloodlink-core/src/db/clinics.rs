//! Clinic database operations.

use super::collections::CLINICS;
use super::{Database, DbResult};
use crate::models::Clinic;

impl Database {
    /// Insert or replace a clinic.
    pub fn put_clinic(&self, clinic: &Clinic) -> DbResult<()> {
        self.set_document(CLINICS, &clinic.id, &serde_json::to_value(clinic)?)
    }

    /// Get a clinic by ID.
    pub fn get_clinic(&self, id: &str) -> DbResult<Option<Clinic>> {
        self.get_document(CLINICS, id)?
            .map(|doc| doc.decode())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let db = Database::open_in_memory().unwrap();
        let clinic = Clinic::new("Northside Vet".into(), Some("Austin".into()));
        db.put_clinic(&clinic).unwrap();

        let retrieved = db.get_clinic(&clinic.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Northside Vet");
        assert_eq!(retrieved.city.as_deref(), Some("Austin"));
        assert!(db.get_clinic("missing").unwrap().is_none());
    }
}
