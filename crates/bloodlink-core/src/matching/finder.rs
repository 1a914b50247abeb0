//! Donor candidate search for an open request.
//!
//! Donors are filtered by exact blood type only. Eligibility and fitness are
//! reported and scored but never exclude a donor, so a clinic can still reach
//! an ineligible donor during a shortage.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EligibilityPolicy;
use crate::db::Database;
use crate::models::{Donor, PatientRequest};

use super::eligibility::{self, Eligibility};
use super::scorer::{self, ScoreBreakdown, ScoreInput};
use super::{MatchError, MatchResult};

/// Candidate list ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Same city first, score as tiebreak
    #[default]
    Distance,
    /// Highest score first
    BestMatch,
    /// Most past donations first
    Experience,
}

/// A donor annotated for the clinic's picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DonorCandidate {
    pub donor: Donor,
    pub eligibility: Eligibility,
    pub is_fit: bool,
    pub is_same_city: bool,
    /// 0 same city, 1 otherwise (no geodistance)
    pub distance: u8,
    /// An appointment already ties this donor to the request
    pub already_linked: bool,
    pub match_score: u32,
    pub score_breakdown: ScoreBreakdown,
}

/// Finds and ranks donors for a request.
pub struct CandidateFinder<'a> {
    db: &'a Database,
    policy: &'a EligibilityPolicy,
}

impl<'a> CandidateFinder<'a> {
    /// Create a new candidate finder.
    pub fn new(db: &'a Database, policy: &'a EligibilityPolicy) -> Self {
        Self { db, policy }
    }

    /// List candidates for a request, evaluated on `today`.
    ///
    /// Locality is judged against the clinic's city when a clinic with a city
    /// is given, otherwise against the request's city.
    pub fn find(
        &self,
        request_id: &str,
        clinic_id: Option<&str>,
        today: NaiveDate,
        sort: SortOrder,
    ) -> MatchResult<Vec<DonorCandidate>> {
        let request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| MatchError::NotFound(format!("request {}", request_id)))?;

        let clinic_city = match clinic_id {
            Some(id) => {
                let clinic = self
                    .db
                    .get_clinic(id)?
                    .ok_or_else(|| MatchError::NotFound(format!("clinic {}", id)))?;
                clinic.city
            }
            None => None,
        };
        let locality_city = clinic_city.as_deref().unwrap_or(&request.city);

        let donors = self.db.donors_by_blood_type(&request.blood_type)?;
        let linked = self.db.linked_donor_ids(&request.id)?;

        let mut candidates: Vec<DonorCandidate> = donors
            .into_iter()
            .map(|donor| self.evaluate(donor, &request, locality_city, &linked, today))
            .collect();
        sort_candidates(&mut candidates, sort);

        tracing::debug!(
            request_id,
            candidates = candidates.len(),
            linked = linked.len(),
            "candidate search complete"
        );
        Ok(candidates)
    }

    /// Annotate and score one donor.
    pub fn evaluate(
        &self,
        donor: Donor,
        request: &PatientRequest,
        locality_city: &str,
        linked: &HashSet<String>,
        today: NaiveDate,
    ) -> DonorCandidate {
        let eligibility = eligibility::evaluate(&donor, today, self.policy);
        let is_same_city = same_city(&donor.city, locality_city);
        let breakdown = scorer::score(&ScoreInput {
            is_eligible: eligibility.is_eligible,
            is_fit: eligibility.is_fit,
            is_same_city,
            is_urgent: request.urgency.is_urgent(),
            donation_count: donor.donation_count,
        });

        DonorCandidate {
            already_linked: linked.contains(&donor.id),
            is_fit: eligibility.is_fit,
            is_same_city,
            distance: if is_same_city { 0 } else { 1 },
            match_score: breakdown.total(),
            score_breakdown: breakdown,
            eligibility,
            donor,
        }
    }
}

/// Case-insensitive city comparison, ignoring surrounding whitespace.
pub fn same_city(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
}

/// Sort candidates in place. Ties break on donor ID.
pub fn sort_candidates(candidates: &mut [DonorCandidate], sort: SortOrder) {
    candidates.sort_by(|a, b| {
        let primary = match sort {
            SortOrder::Distance => a
                .distance
                .cmp(&b.distance)
                .then_with(|| b.match_score.cmp(&a.match_score)),
            SortOrder::BestMatch => b.match_score.cmp(&a.match_score),
            SortOrder::Experience => b.donor.donation_count.cmp(&a.donor.donation_count),
        };
        match primary {
            Ordering::Equal => a.donor.id.cmp(&b.donor.id),
            other => other,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Clinic, Urgency};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn donor(id: &str, city: &str, blood: &str, count: u32) -> Donor {
        let mut d = Donor::new(id.into(), city.into(), blood.into(), 30.0);
        d.id = id.into();
        d.donation_count = count;
        d
    }

    fn setup() -> (Database, PatientRequest) {
        let db = Database::open_in_memory().unwrap();
        let request = PatientRequest::new(
            "owner-1".into(),
            "Bella".into(),
            "DEA 1.1 negative".into(),
            Urgency::Immediate,
            450,
            "Austin".into(),
        );
        db.put_request(&request).unwrap();
        (db, request)
    }

    #[test]
    fn test_same_city() {
        assert!(same_city("Austin", "austin "));
        assert!(!same_city("Austin", "Dallas"));
        assert!(!same_city("", ""));
    }

    #[test]
    fn test_blood_type_is_only_filter() {
        let (db, request) = setup();
        let mut sick = donor("sick", "Austin", "DEA 1.1 negative", 0);
        sick.is_medical_condition = true;
        db.put_donor(&sick).unwrap();
        db.put_donor(&donor("ok", "Dallas", "DEA 1.1 negative", 1)).unwrap();
        db.put_donor(&donor("wrong", "Austin", "DEA 1.1 positive", 9)).unwrap();

        let policy = EligibilityPolicy::default();
        let finder = CandidateFinder::new(&db, &policy);
        let candidates = finder
            .find(&request.id, None, today(), SortOrder::BestMatch)
            .unwrap();

        let ids: Vec<&str> = candidates.iter().map(|c| c.donor.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"sick"));
        assert!(!ids.contains(&"wrong"));

        let sick = candidates.iter().find(|c| c.donor.id == "sick").unwrap();
        assert!(!sick.eligibility.is_eligible);
        assert!(!sick.is_fit);
        // Same city + urgent still count for an unfit donor
        assert_eq!(sick.match_score, 30);
    }

    #[test]
    fn test_clinic_city_drives_locality() {
        let (db, request) = setup();
        db.put_donor(&donor("austin", "Austin", "DEA 1.1 negative", 0)).unwrap();
        db.put_donor(&donor("dallas", "Dallas", "DEA 1.1 negative", 0)).unwrap();
        let clinic = Clinic::new("Dallas Vet".into(), Some("Dallas".into()));
        db.put_clinic(&clinic).unwrap();

        let policy = EligibilityPolicy::default();
        let finder = CandidateFinder::new(&db, &policy);

        let by_request = finder
            .find(&request.id, None, today(), SortOrder::Distance)
            .unwrap();
        assert_eq!(by_request[0].donor.id, "austin");
        assert_eq!(by_request[0].distance, 0);

        let by_clinic = finder
            .find(&request.id, Some(&clinic.id), today(), SortOrder::Distance)
            .unwrap();
        assert_eq!(by_clinic[0].donor.id, "dallas");
        assert_eq!(by_clinic[0].match_score, 100);
        assert_eq!(by_clinic[1].distance, 1);
    }

    #[test]
    fn test_sort_orders() {
        let (db, request) = setup();
        let mut resting = donor("resting", "Austin", "DEA 1.1 negative", 5);
        resting.last_donation = Some(today() - Duration::days(10));
        db.put_donor(&resting).unwrap();
        db.put_donor(&donor("fresh", "Austin", "DEA 1.1 negative", 0)).unwrap();
        db.put_donor(&donor("far", "Houston", "DEA 1.1 negative", 2)).unwrap();

        let policy = EligibilityPolicy::default();
        let finder = CandidateFinder::new(&db, &policy);

        let ids = |sort| -> Vec<String> {
            finder
                .find(&request.id, None, today(), sort)
                .unwrap()
                .into_iter()
                .map(|c| c.donor.id)
                .collect()
        };

        // fresh: 40+30+20+10+0 = 100, resting: 0+30+20+10+5 = 65, far: 40+30+0+0+2 = 72
        assert_eq!(ids(SortOrder::BestMatch), vec!["fresh", "far", "resting"]);
        assert_eq!(ids(SortOrder::Distance), vec!["fresh", "resting", "far"]);
        assert_eq!(ids(SortOrder::Experience), vec!["resting", "far", "fresh"]);
    }

    #[test]
    fn test_missing_request_or_clinic() {
        let (db, request) = setup();
        let policy = EligibilityPolicy::default();
        let finder = CandidateFinder::new(&db, &policy);

        let result = finder.find("missing", None, today(), SortOrder::Distance);
        assert!(matches!(result, Err(MatchError::NotFound(_))));

        let result = finder.find(&request.id, Some("nope"), today(), SortOrder::Distance);
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }
}
