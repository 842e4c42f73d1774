//! Strategies: the plays a design generates, and their coherence.
//!
//! A strategy for a player collects every play reachable when the player
//! moves according to one design, interacted against a set of counter
//! designs. Propagation checking validates two properties: total ordering
//! (shorter plays are prefixes of longer ones) and innocence (identical
//! views force identical next moves).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::act::Player;
use crate::design::{Design, DesignId};
use crate::dispute::step_interaction;
use crate::position::{Move, Position};
use crate::view::extract_view;

/// Unique identifier for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(Uuid);

impl StrategyId {
    /// Generates a new random strategy ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's strategy: the plays consistent with one design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// Unique identifier.
    pub id: StrategyId,
    /// The design the strategy was built from.
    pub design: DesignId,
    /// The player the strategy belongs to.
    pub player: Player,
    /// All collected plays, prefix-closed, shortest first.
    pub plays: Vec<Position>,
    /// Cached propagation verdict, if one has been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagation: Option<PropagationReport>,
}

impl Strategy {
    /// Number of distinct views of the player across the collected plays.
    #[must_use]
    pub fn view_count(&self) -> usize {
        let mut keys: Vec<String> = self
            .plays
            .iter()
            .map(|play| view_key(&play.moves, self.player))
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    /// Returns true if the strategy passed both propagation properties.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.propagation.as_ref().is_some_and(PropagationReport::is_stable)
    }
}

/// One innocence violation: two plays with the same view but different
/// continuations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationViolation {
    /// Index of the first offending play.
    pub play_a: usize,
    /// Index of the second offending play.
    pub play_b: usize,
    /// The shared view at which the continuations diverge.
    pub view: Vec<Move>,
}

/// Verdict of the propagation checks over a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Identical views always lead to identical next moves.
    pub satisfies_propagation: bool,
    /// Plays form a prefix chain.
    pub is_totally_ordered: bool,
    /// Every non-maximal play extends one move at a time within the set.
    pub is_linearly_extended: bool,
    /// The offending play pairs, if any.
    pub violations: Vec<PropagationViolation>,
}

impl PropagationReport {
    /// Returns true if both core properties hold.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.satisfies_propagation && self.is_totally_ordered
    }
}

/// Collects the prefix-closed play set of a design against counter designs.
///
/// Each counter is stepped to its fixed point; the resulting interleaved
/// position and all its non-empty prefixes become plays. Duplicates across
/// counters are collapsed.
#[must_use]
pub fn collect_plays(design: &Design, counters: &[&Design], max_pairs: usize) -> Vec<Position> {
    let mut plays: Vec<Position> = Vec::new();
    for counter in counters {
        let (pos, neg) = match design.owner {
            Player::P => (design, *counter),
            Player::O => (*counter, design),
        };
        let dispute = step_interaction(pos, neg, &std::collections::BTreeMap::new(), max_pairs);
        let maximal = dispute.to_position(pos, neg);
        for cut in 1..=maximal.len() {
            let prefix = Position::from_moves(Player::P, maximal.moves[..cut].to_vec());
            if !plays.contains(&prefix) {
                plays.push(prefix);
            }
        }
    }
    plays.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| {
        serde_json::to_string(&a.moves)
            .unwrap_or_default()
            .cmp(&serde_json::to_string(&b.moves).unwrap_or_default())
    }));
    plays
}

/// Builds a strategy for a design's owner against a counter-design set.
#[must_use]
pub fn build_strategy(design: &Design, counters: &[&Design], max_pairs: usize) -> Strategy {
    let plays = collect_plays(design, counters, max_pairs);
    let player = design.owner;
    let mut strategy = Strategy {
        id: StrategyId::new(),
        design: design.id,
        player,
        plays,
        propagation: None,
    };
    strategy.propagation = Some(check_propagation(&strategy));
    strategy
}

/// Runs the total-ordering and innocence checks over a strategy's plays.
#[must_use]
pub fn check_propagation(strategy: &Strategy) -> PropagationReport {
    let player = strategy.player;
    let plays = &strategy.plays;
    let mut report = PropagationReport {
        satisfies_propagation: true,
        is_totally_ordered: true,
        is_linearly_extended: true,
        violations: Vec::new(),
    };

    // Total ordering: every shorter play must be a prefix of every longer
    // one. Two distinct plays of equal length already break the chain.
    for (a, play_a) in plays.iter().enumerate() {
        for play_b in plays.iter().skip(a + 1) {
            let (shorter, longer) = if play_a.len() <= play_b.len() {
                (play_a, play_b)
            } else {
                (play_b, play_a)
            };
            if !shorter.is_prefix_of(longer) {
                report.is_totally_ordered = false;
            }
        }
    }

    // Linear extension: a play strictly below another play must have its
    // one-move extension present as well.
    for play in plays {
        let extended_by_more = plays
            .iter()
            .any(|other| other.len() > play.len() + 1 && play.is_prefix_of(other));
        if extended_by_more {
            let has_single_step = plays
                .iter()
                .any(|other| other.len() == play.len() + 1 && play.is_prefix_of(other));
            if !has_single_step {
                report.is_linearly_extended = false;
            }
        }
    }

    // Innocence: wherever the player moved, the view of the preceding moves
    // determines the move. Identical views with different continuations are
    // violations.
    let mut seen: Vec<(String, usize, Move)> = Vec::new();
    for (index, play) in plays.iter().enumerate() {
        for (at, mv) in play.moves.iter().enumerate() {
            if mv.player != player {
                continue;
            }
            let key = view_key(&play.moves[..at], player);
            match seen.iter().find(|(existing, _, _)| *existing == key) {
                Some((_, earlier_play, earlier_move)) => {
                    if earlier_move != mv {
                        report.satisfies_propagation = false;
                        let prefix = Position::from_moves(Player::P, play.moves[..at].to_vec());
                        report.violations.push(PropagationViolation {
                            play_a: *earlier_play,
                            play_b: index,
                            view: extract_view(&prefix, player).sequence,
                        });
                    }
                }
                None => seen.push((key, index, mv.clone())),
            }
        }
    }

    report
}

fn view_key(moves: &[Move], player: Player) -> String {
    let position = Position::from_moves(Player::P, moves.to_vec());
    let view = extract_view(&position, player);
    serde_json::to_string(&view.sequence).unwrap_or_default()
}
