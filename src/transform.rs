//! Correspondence between designs and strategies.
//!
//! A design induces a strategy (its plays against a counter set); a strategy
//! with a total order induces a design again, read off its maximal play. The
//! round-trip check compares the orthogonality pattern of the original and
//! the derived design against the same counters.

use serde::{Deserialize, Serialize};

use crate::act::{Act, Player};
use crate::behaviour::{check_orthogonal, OrthogonalityReport};
use crate::design::{Design, DesignId};
use crate::error::ValidationError;
use crate::position::Position;
use crate::strategy::{build_strategy, Strategy};

/// Which correspondence operation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    /// Design to strategy only.
    Transform,
    /// Design to strategy to design, with orthogonality comparison.
    RoundTrip,
}

/// Outcome of a round-trip comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTripReport {
    /// True if original and derived designs converge against exactly the
    /// same counters.
    pub preserved: bool,
    /// Orthogonality of the original design.
    pub original: OrthogonalityReport,
    /// Orthogonality of the derived design.
    pub derived: OrthogonalityReport,
    /// Counters whose outcome changed across the round trip.
    pub changed: Vec<DesignId>,
}

/// Outcome of a transformation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutcome {
    /// The strategy built from the source design.
    pub strategy: Strategy,
    /// The design read back off the strategy, for round trips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<Design>,
    /// The orthogonality comparison, for round trips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_trip: Option<RoundTripReport>,
}

/// Reads a design back off a strategy's maximal play.
///
/// The chronicle starts at the strategy player's first move; justifiers
/// pointing before that point become initial.
///
/// # Errors
///
/// Fails if the strategy has no plays containing a move by its player.
pub fn strategy_to_design(strategy: &Strategy) -> Result<Design, ValidationError> {
    let maximal: Option<&Position> = strategy.plays.iter().max_by_key(|play| play.len());
    let Some(maximal) = maximal else {
        return Err(ValidationError::EmptyDesign);
    };
    let offset = maximal
        .moves
        .iter()
        .position(|mv| mv.player == strategy.player)
        .ok_or(ValidationError::EmptyDesign)?;
    let mut design = Design {
        id: DesignId::new(),
        owner: strategy.player,
        participant: String::new(),
        root: maximal.moves[offset].locus.clone(),
        acts: Vec::new(),
    };
    for mv in &maximal.moves[offset..] {
        let justifier = mv
            .justifier
            .and_then(|justifier| justifier.checked_sub(offset));
        let act = Act {
            polarity: mv.polarity,
            locus: mv.locus.clone(),
            ramification: mv.ramification.clone(),
            justifier,
            expression: mv.expression.clone(),
        };
        design.push_act(act)?;
    }
    Ok(design)
}

/// Runs a correspondence operation for a design against a counter set.
///
/// # Errors
///
/// Round trips fail with a validation error when the strategy yields no
/// design to read back.
pub fn transform(
    design: &Design,
    counters: &[&Design],
    op: TransformOp,
    max_pairs: usize,
) -> Result<TransformOutcome, ValidationError> {
    let strategy = build_strategy(design, counters, max_pairs);
    match op {
        TransformOp::Transform => Ok(TransformOutcome {
            strategy,
            derived: None,
            round_trip: None,
        }),
        TransformOp::RoundTrip => {
            let derived = strategy_to_design(&strategy)?;
            let original_report = check_orthogonal(design, counters, max_pairs);
            let derived_report = check_orthogonal(&derived, counters, max_pairs);
            let changed = changed_counters(&original_report, &derived_report, counters);
            let preserved = changed.is_empty();
            Ok(TransformOutcome {
                strategy,
                derived: Some(derived),
                round_trip: Some(RoundTripReport {
                    preserved,
                    original: original_report,
                    derived: derived_report,
                    changed,
                }),
            })
        }
    }
}

fn changed_counters(
    original: &OrthogonalityReport,
    derived: &OrthogonalityReport,
    counters: &[&Design],
) -> Vec<DesignId> {
    counters
        .iter()
        .filter_map(|counter| {
            let failed_before = original
                .failures
                .iter()
                .any(|failure| failure.counter == counter.id);
            let failed_after = derived
                .failures
                .iter()
                .any(|failure| failure.counter == counter.id);
            (failed_before != failed_after).then_some(counter.id)
        })
        .collect()
}
