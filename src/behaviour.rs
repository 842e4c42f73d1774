//! Orthogonality and behaviour membership.
//!
//! Two designs of opposite polarity are orthogonal when their interaction
//! converges. A behaviour here is the set of designs orthogonal to every
//! member of a supplied counter-design set. This is a finite approximation
//! of true bi-orthogonal closure, which is generally infinite; every API in
//! this module is relative to the counter set it was given and nothing more.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::act::Player;
use crate::design::{Design, DesignId};
use crate::dispute::{step_interaction, DisputeStatus};
use crate::locus::LocusPath;

/// One counter design the candidate failed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthogonalityFailure {
    /// The counter design.
    pub counter: DesignId,
    /// The terminal status the interaction reached instead of CONVERGENT.
    pub status: DisputeStatus,
}

/// Verdict of testing a design against a counter-design set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrthogonalityReport {
    /// True if every interaction converged.
    pub orthogonal: bool,
    /// The counters that did not converge.
    pub failures: Vec<OrthogonalityFailure>,
}

/// Steps two opposite-polarity designs and reports whether they converge.
///
/// `picks` carries any recorded additive resolutions for the pair.
#[must_use]
pub fn are_orthogonal(
    pos: &Design,
    neg: &Design,
    picks: &BTreeMap<LocusPath, u32>,
    max_pairs: usize,
) -> bool {
    step_interaction(pos, neg, picks, max_pairs).status == DisputeStatus::Convergent
}

/// Tests a design against every counter in the set.
///
/// Counters with the same polarity as the candidate cannot interact and are
/// reported as divergent failures.
#[must_use]
pub fn check_orthogonal(design: &Design, counters: &[&Design], max_pairs: usize) -> OrthogonalityReport {
    let empty_picks = BTreeMap::new();
    let mut failures = Vec::new();
    for counter in counters {
        if counter.owner == design.owner {
            failures.push(OrthogonalityFailure {
                counter: counter.id,
                status: DisputeStatus::Divergent,
            });
            continue;
        }
        let (pos, neg) = match design.owner {
            Player::P => (design, *counter),
            Player::O => (*counter, design),
        };
        let status = step_interaction(pos, neg, &empty_picks, max_pairs).status;
        if status != DisputeStatus::Convergent {
            failures.push(OrthogonalityFailure {
                counter: counter.id,
                status,
            });
        }
    }
    OrthogonalityReport {
        orthogonal: failures.is_empty(),
        failures,
    }
}

/// Membership verdict for a behaviour's finite approximation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourMembership {
    /// True if the candidate is orthogonal to every counter.
    pub is_member: bool,
    /// The counters the candidate failed against.
    pub failures: Vec<OrthogonalityFailure>,
}

/// Tests membership of a candidate design in the behaviour generated by a
/// counter-design set.
///
/// Relative to the supplied finite set only; no closure is computed.
#[must_use]
pub fn membership(candidate: &Design, counters: &[&Design], max_pairs: usize) -> BehaviourMembership {
    let report = check_orthogonal(candidate, counters, max_pairs);
    BehaviourMembership {
        is_member: report.orthogonal,
        failures: report.failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::act::Polarity;
    use crate::locus::Ramification;

    fn ram(suffixes: &[u32]) -> Ramification {
        suffixes.iter().copied().collect()
    }

    fn yielding_positive() -> Design {
        Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .daimon()
            .build()
            .unwrap()
    }

    fn challenging_negative() -> Design {
        Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap()
    }

    fn off_branch_negative() -> Design {
        Design::builder(Player::O)
            .act(
                Polarity::Neg,
                LocusPath::root().child(2),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_daimon_design_is_orthogonal_to_challenge() {
        let pos = yielding_positive();
        let neg = challenging_negative();
        assert!(are_orthogonal(&pos, &neg, &BTreeMap::new(), 64));
    }

    #[test]
    fn test_orthogonality_report_collects_failures() {
        let pos = yielding_positive();
        let good = challenging_negative();
        let bad = off_branch_negative();
        let report = check_orthogonal(&pos, &[&good, &bad], 64);
        assert!(!report.orthogonal);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].counter, bad.id);
        assert_eq!(report.failures[0].status, DisputeStatus::Divergent);
    }

    #[test]
    fn test_same_polarity_counter_is_a_failure() {
        let pos = yielding_positive();
        let other_pos = yielding_positive();
        let report = check_orthogonal(&pos, &[&other_pos], 64);
        assert!(!report.orthogonal);
    }

    #[test]
    fn test_membership_matches_orthogonality() {
        let pos = yielding_positive();
        let good = challenging_negative();
        let verdict = membership(&pos, &[&good], 64);
        assert!(verdict.is_member);
        assert!(verdict.failures.is_empty());
    }
}
