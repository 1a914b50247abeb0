//! Candidate ranking heuristic.
//!
//! Fixed additive weights, no normalization:
//! - Eligible: 40
//! - Medically fit: 30
//! - Same city as the clinic: 20
//! - Urgent request AND same city: 10
//! - Experience: one point per past donation, capped at 5
//!
//! The score orders candidates; it never excludes one.

use serde::{Deserialize, Serialize};

pub const ELIGIBLE_POINTS: u32 = 40;
pub const FIT_POINTS: u32 = 30;
pub const SAME_CITY_POINTS: u32 = 20;
pub const URGENT_LOCAL_POINTS: u32 = 10;
pub const EXPERIENCE_CAP: u32 = 5;

/// Highest reachable score.
pub const MAX_SCORE: u32 =
    ELIGIBLE_POINTS + FIT_POINTS + SAME_CITY_POINTS + URGENT_LOCAL_POINTS + EXPERIENCE_CAP;

/// Scoring inputs for one donor against one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInput {
    pub is_eligible: bool,
    pub is_fit: bool,
    pub is_same_city: bool,
    pub is_urgent: bool,
    pub donation_count: u32,
}

/// Points earned per factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub eligibility: u32,
    pub fitness: u32,
    pub locality: u32,
    pub urgency: u32,
    pub experience: u32,
}

impl ScoreBreakdown {
    /// Sum of all factors.
    pub fn total(&self) -> u32 {
        self.eligibility + self.fitness + self.locality + self.urgency + self.experience
    }
}

/// Score a candidate.
pub fn score(input: &ScoreInput) -> ScoreBreakdown {
    ScoreBreakdown {
        eligibility: if input.is_eligible { ELIGIBLE_POINTS } else { 0 },
        fitness: if input.is_fit { FIT_POINTS } else { 0 },
        locality: if input.is_same_city { SAME_CITY_POINTS } else { 0 },
        urgency: if input.is_urgent && input.is_same_city {
            URGENT_LOCAL_POINTS
        } else {
            0
        },
        experience: input.donation_count.min(EXPERIENCE_CAP),
    }
}

/// Score a candidate, returning just the total.
pub fn match_score(input: &ScoreInput) -> u32 {
    score(input).total()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgent_same_city_veteran() {
        let input = ScoreInput {
            is_eligible: true,
            is_fit: true,
            is_same_city: true,
            is_urgent: true,
            donation_count: 3,
        };
        assert_eq!(match_score(&input), 103);
    }

    #[test]
    fn test_nothing_going_for_them() {
        let input = ScoreInput {
            is_eligible: false,
            is_fit: false,
            is_same_city: false,
            is_urgent: true,
            donation_count: 0,
        };
        assert_eq!(match_score(&input), 0);
    }

    #[test]
    fn test_urgency_needs_same_city() {
        let far = ScoreInput {
            is_eligible: true,
            is_fit: true,
            is_same_city: false,
            is_urgent: true,
            donation_count: 0,
        };
        let breakdown = score(&far);
        assert_eq!(breakdown.urgency, 0);
        assert_eq!(breakdown.total(), 70);
    }

    #[test]
    fn test_experience_capped() {
        let input = ScoreInput {
            is_eligible: true,
            is_fit: true,
            is_same_city: true,
            is_urgent: true,
            donation_count: 40,
        };
        assert_eq!(score(&input).experience, 5);
        assert_eq!(match_score(&input), MAX_SCORE);
        assert_eq!(MAX_SCORE, 105);
    }
}
