//! Donor database operations.

use super::collections::DONORS;
use super::{Database, DbError, DbResult, Direction, Filter, Query};
use crate::models::Donor;

impl Database {
    /// Insert or replace a donor.
    pub fn put_donor(&self, donor: &Donor) -> DbResult<()> {
        donor.validate().map_err(DbError::Constraint)?;
        self.set_document(DONORS, &donor.id, &serde_json::to_value(donor)?)
    }

    /// Get a donor by ID.
    pub fn get_donor(&self, id: &str) -> DbResult<Option<Donor>> {
        self.get_document(DONORS, id)?
            .map(|doc| doc.decode())
            .transpose()
    }

    /// List donors with exactly this blood type.
    pub fn donors_by_blood_type(&self, blood_type: &str) -> DbResult<Vec<Donor>> {
        let query = Query::new(DONORS)
            .filter(Filter::eq("blood_type", blood_type))
            .order_by("dog_name", Direction::Asc);

        self.query_documents(&query)?
            .iter()
            .map(|doc| doc.decode())
            .collect()
    }
}
