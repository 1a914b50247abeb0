//! Donation eligibility rules.
//!
//! A donor is eligible when all of these hold:
//! - at least `min_interval_days` (56) since the last donation
//! - no reported medical condition
//! - weight at least `min_weight_kg` (25 kg)
//!
//! "Fitness" is the medical-only subset: condition and weight, ignoring the wait.

use chrono::{NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::config::EligibilityPolicy;
use crate::models::Donor;

/// Why a donor cannot give blood right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// Inside the wait window after the last donation
    RecentDonation,
    /// Owner reported a medical condition
    MedicalCondition,
    /// Below the minimum weight
    Underweight,
}

/// Result of evaluating one donor on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Eligibility {
    pub is_eligible: bool,
    /// Medical-only subset of eligibility
    pub is_fit: bool,
    /// Set only when the wait window is the sole blocker
    pub next_eligible_date: Option<NaiveDate>,
    pub reasons: Vec<IneligibilityReason>,
}

impl Eligibility {
    /// Ineligible for a reason no date will fix (see profile / manual review).
    pub fn needs_manual_review(&self) -> bool {
        !self.is_eligible && self.next_eligible_date.is_none()
    }
}

/// Check the medical-only rules.
pub fn is_fit(donor: &Donor, policy: &EligibilityPolicy) -> bool {
    !donor.is_medical_condition && donor.weight_kg >= policy.min_weight_kg
}

/// Evaluate a donor's eligibility on `today`.
pub fn evaluate(donor: &Donor, today: NaiveDate, policy: &EligibilityPolicy) -> Eligibility {
    let mut reasons = Vec::new();
    let mut wait_until = None;

    if let Some(last) = donor.last_donation {
        let days_since = (today - last).num_days();
        if days_since < policy.min_interval_days {
            reasons.push(IneligibilityReason::RecentDonation);
            wait_until = TimeDelta::try_days(policy.min_interval_days)
                .and_then(|wait| last.checked_add_signed(wait));
        }
    }
    if donor.is_medical_condition {
        reasons.push(IneligibilityReason::MedicalCondition);
    }
    if donor.weight_kg < policy.min_weight_kg {
        reasons.push(IneligibilityReason::Underweight);
    }

    let is_fit = is_fit(donor, policy);
    Eligibility {
        is_eligible: reasons.is_empty(),
        is_fit,
        // A wait date means nothing while a medical blocker remains
        next_eligible_date: if is_fit { wait_until } else { None },
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_donor(last: Option<NaiveDate>, weight: f64, condition: bool) -> Donor {
        let mut donor = Donor::new("Rex".into(), "Austin".into(), "A".into(), weight);
        donor.last_donation = last;
        donor.is_medical_condition = condition;
        donor
    }

    #[test]
    fn test_never_donated_is_eligible() {
        let donor = make_donor(None, 30.0, false);
        let result = evaluate(&donor, date(2024, 6, 1), &EligibilityPolicy::default());
        assert!(result.is_eligible);
        assert!(result.is_fit);
        assert!(result.reasons.is_empty());
        assert!(result.next_eligible_date.is_none());
    }

    #[test]
    fn test_wait_window_boundary() {
        let last = date(2024, 1, 1);
        let donor = make_donor(Some(last), 30.0, false);
        let policy = EligibilityPolicy::default();

        let day_55 = evaluate(&donor, last + Duration::days(55), &policy);
        assert!(!day_55.is_eligible);
        assert!(day_55.is_fit);
        assert_eq!(day_55.reasons, vec![IneligibilityReason::RecentDonation]);
        assert_eq!(day_55.next_eligible_date, Some(date(2024, 2, 26)));

        let day_56 = evaluate(&donor, last + Duration::days(56), &policy);
        assert!(day_56.is_eligible);
    }

    #[test]
    fn test_medical_condition_has_no_next_date() {
        let donor = make_donor(Some(date(2024, 5, 1)), 30.0, true);
        let result = evaluate(&donor, date(2024, 5, 10), &EligibilityPolicy::default());
        assert!(!result.is_eligible);
        assert!(!result.is_fit);
        assert!(result.next_eligible_date.is_none());
        assert!(result.needs_manual_review());
        assert_eq!(
            result.reasons,
            vec![IneligibilityReason::RecentDonation, IneligibilityReason::MedicalCondition]
        );
    }

    #[test]
    fn test_underweight() {
        let donor = make_donor(None, 24.9, false);
        let result = evaluate(&donor, date(2024, 5, 10), &EligibilityPolicy::default());
        assert!(!result.is_eligible);
        assert!(!result.is_fit);
        assert_eq!(result.reasons, vec![IneligibilityReason::Underweight]);

        let donor = make_donor(None, 25.0, false);
        assert!(evaluate(&donor, date(2024, 5, 10), &EligibilityPolicy::default()).is_eligible);
    }

    #[test]
    fn test_custom_policy() {
        let policy = EligibilityPolicy {
            min_interval_days: 90,
            min_weight_kg: 20.0,
        };
        let last = date(2024, 1, 1);
        let donor = make_donor(Some(last), 22.0, false);

        assert!(!evaluate(&donor, last + Duration::days(89), &policy).is_eligible);
        assert!(evaluate(&donor, last + Duration::days(90), &policy).is_eligible);
    }

    #[test]
    fn test_unrepresentable_wait_does_not_panic() {
        let last = date(2024, 1, 1);
        let donor = make_donor(Some(last), 30.0, false);
        let policy = EligibilityPolicy {
            min_interval_days: 200_000_000,
            ..EligibilityPolicy::default()
        };

        let result = evaluate(&donor, date(2024, 6, 1), &policy);
        assert!(!result.is_eligible);
        assert_eq!(result.reasons, vec![IneligibilityReason::RecentDonation]);
        assert!(result.next_eligible_date.is_none());
    }
}
