//! Arenas: the locus universe legal positions are drawn from.
//!
//! An arena fixes, for every locus, which child suffixes may be opened
//! there. Enumeration walks legal continuations depth-first under explicit
//! caps and validates each candidate fail-fast, so an illegal branch is
//! abandoned at its first bad move.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::act::{Player, Polarity};
use crate::legality::check_position;
use crate::locus::{LocusPath, Ramification};
use crate::position::{Move, Position};

/// The locus universe: every reachable locus with its allowed ramification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    loci: BTreeMap<LocusPath, Ramification>,
}

impl Arena {
    /// Starts an arena builder.
    #[must_use]
    pub fn builder() -> ArenaBuilder {
        ArenaBuilder::default()
    }

    /// Returns true if the arena contains the locus.
    #[must_use]
    pub fn contains(&self, locus: &LocusPath) -> bool {
        self.loci.contains_key(locus)
    }

    /// The allowed ramification at a locus, if the locus exists.
    #[must_use]
    pub fn ramification(&self, locus: &LocusPath) -> Option<&Ramification> {
        self.loci.get(locus)
    }

    /// All loci in depth-first order.
    pub fn loci(&self) -> impl Iterator<Item = (&LocusPath, &Ramification)> {
        self.loci.iter()
    }

    /// Number of loci.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loci.len()
    }

    /// Returns true if the arena holds no loci.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    /// Checks structural well-formedness of the locus universe.
    #[must_use]
    pub fn validate(&self) -> ArenaReport {
        let mut report = ArenaReport {
            is_rooted: self.loci.contains_key(&LocusPath::root()),
            is_prefix_closed: true,
            is_saturated: true,
            issues: Vec::new(),
        };
        if !report.is_rooted {
            report.issues.push(ArenaIssue::MissingRoot);
        }
        for (locus, ramification) in &self.loci {
            if let Some(parent) = locus.parent() {
                match self.loci.get(&parent) {
                    None => {
                        report.is_prefix_closed = false;
                        report.issues.push(ArenaIssue::OrphanLocus {
                            locus: locus.clone(),
                        });
                    }
                    Some(parent_ram) => {
                        let suffix = locus.last_suffix().unwrap_or(0);
                        if !parent_ram.contains(&suffix) {
                            report.is_prefix_closed = false;
                            report.issues.push(ArenaIssue::UndeclaredBranch {
                                locus: locus.clone(),
                            });
                        }
                    }
                }
            }
            for &suffix in ramification {
                let child = locus.child(suffix);
                if !self.loci.contains_key(&child) {
                    report.is_saturated = false;
                    report.issues.push(ArenaIssue::MissingChild { locus: child });
                }
            }
        }
        report
    }

    /// Enumerates all legal positions reachable under the configured caps.
    ///
    /// The Proponent opens at the root; every continuation answers a branch
    /// opened by an earlier move, at a locus not yet played. Each emitted
    /// position carries its legality report. Hitting `max_positions` sets
    /// the `truncated` flag instead of failing.
    #[must_use]
    pub fn enumerate_positions(&self, config: &EnumerationConfig) -> PositionSet {
        let mut set = PositionSet {
            positions: Vec::new(),
            truncated: false,
        };
        let empty = Position::empty(Player::P);
        self.enumerate_from(&empty, config, &mut set);
        set
    }

    fn enumerate_from(&self, position: &Position, config: &EnumerationConfig, set: &mut PositionSet) {
        if set.positions.len() >= config.max_positions {
            set.truncated = true;
            return;
        }
        let mut validated = position.clone();
        let report = check_position(&validated.moves);
        if !report.is_legal() {
            return; // fail fast, nothing below an illegal prefix is legal
        }
        validated.validity = Some(report);
        set.positions.push(validated);
        if position.len() >= config.max_depth {
            return;
        }
        for mv in self.available_moves(position, config) {
            let extended = position.extended(mv);
            self.enumerate_from(&extended, config, set);
        }
    }

    /// Legal continuation moves of a position within this arena.
    #[must_use]
    pub fn available_moves(&self, position: &Position, config: &EnumerationConfig) -> Vec<Move> {
        let player = position.next_player;
        let mut moves = Vec::new();
        if position.is_empty() {
            if let Some(ramification) = self.loci.get(&LocusPath::root()) {
                moves.push(Move {
                    player: Player::P,
                    polarity: Polarity::Pos,
                    locus: LocusPath::root(),
                    ramification: capped(ramification, config.max_ramification),
                    justifier: None,
                    expression: String::new(),
                });
            }
            return moves;
        }
        for (index, opener) in position.moves.iter().enumerate() {
            if opener.player == player {
                continue;
            }
            for &suffix in &opener.ramification {
                let locus = opener.locus.child(suffix);
                if !self.loci.contains_key(&locus) {
                    continue;
                }
                if position.moves.iter().any(|played| played.locus == locus) {
                    continue;
                }
                let ramification = self
                    .loci
                    .get(&locus)
                    .map(|r| capped(r, config.max_ramification))
                    .unwrap_or_default();
                moves.push(Move {
                    player,
                    polarity: player.proper_polarity(),
                    locus,
                    ramification,
                    justifier: Some(index),
                    expression: String::new(),
                });
            }
        }
        moves
    }
}

fn capped(ramification: &Ramification, max_ramification: usize) -> Ramification {
    ramification.iter().copied().take(max_ramification).collect()
}

/// Builder for [`Arena`].
#[derive(Debug, Default)]
pub struct ArenaBuilder {
    loci: BTreeMap<LocusPath, Ramification>,
}

impl ArenaBuilder {
    /// Declares a locus with its allowed child suffixes.
    #[must_use]
    pub fn locus(mut self, path: LocusPath, ramification: impl IntoIterator<Item = u32>) -> Self {
        self.loci.insert(path, ramification.into_iter().collect());
        self
    }

    /// Produces the arena.
    #[must_use]
    pub fn build(self) -> Arena {
        Arena { loci: self.loci }
    }
}

/// Structural verdict over an arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaReport {
    /// The root locus is present.
    pub is_rooted: bool,
    /// Every locus's parent exists and declares the connecting branch.
    pub is_prefix_closed: bool,
    /// Every declared branch leads to a declared locus.
    pub is_saturated: bool,
    /// All issues found.
    pub issues: Vec<ArenaIssue>,
}

impl ArenaReport {
    /// Returns true if the arena is fully well-formed.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.is_rooted && self.is_prefix_closed && self.is_saturated
    }
}

/// One structural problem in an arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ArenaIssue {
    /// No root locus.
    MissingRoot,
    /// A locus whose parent is not in the arena.
    OrphanLocus { locus: LocusPath },
    /// A locus whose parent does not declare the connecting suffix.
    UndeclaredBranch { locus: LocusPath },
    /// A declared branch with no locus behind it.
    MissingChild { locus: LocusPath },
}

/// Caps for position enumeration. Every traversal is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationConfig {
    /// Maximum number of moves in an emitted position.
    pub max_depth: usize,
    /// Maximum branches considered per move.
    pub max_ramification: usize,
    /// Maximum number of positions emitted before truncation.
    pub max_positions: usize,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_ramification: 4,
            max_positions: 1024,
        }
    }
}

/// The outcome of an enumeration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSet {
    /// All legal positions found, shortest first along each branch.
    pub positions: Vec<Position>,
    /// True if `max_positions` stopped the walk early.
    pub truncated: bool,
}

impl PositionSet {
    /// Number of positions found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if even the empty position was not emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_branch_arena() -> Arena {
        Arena::builder()
            .locus(LocusPath::root(), [1, 2])
            .locus("0.1".parse().unwrap(), [1])
            .locus("0.2".parse().unwrap(), [1])
            .locus("0.1.1".parse().unwrap(), [])
            .locus("0.2.1".parse().unwrap(), [])
            .build()
    }

    #[test]
    fn test_well_formed_arena() {
        let report = two_branch_arena().validate();
        assert!(report.is_well_formed(), "issues: {:?}", report.issues);
    }

    #[test]
    fn test_orphan_locus_detected() {
        let arena = Arena::builder()
            .locus(LocusPath::root(), [1])
            .locus("0.2.1".parse().unwrap(), [])
            .build();
        let report = arena.validate();
        assert!(!report.is_prefix_closed);
        assert!(report
            .issues
            .iter()
            .any(|issue| matches!(issue, ArenaIssue::OrphanLocus { .. })));
    }

    #[test]
    fn test_unsaturated_branch_detected() {
        let arena = Arena::builder().locus(LocusPath::root(), [1]).build();
        let report = arena.validate();
        assert!(!report.is_saturated);
        assert!(matches!(
            report.issues[0],
            ArenaIssue::MissingChild { .. }
        ));
    }

    #[test]
    fn test_missing_root_detected() {
        let arena = Arena::builder().locus("0.1".parse().unwrap(), []).build();
        let report = arena.validate();
        assert!(!report.is_rooted);
    }

    #[test]
    fn test_enumeration_small_arena_counted_by_hand() {
        // Depth cap 2 over a two-branch root: the empty position, the
        // opening at "0", and one O-answer per branch. Four in total.
        let config = EnumerationConfig {
            max_depth: 2,
            max_ramification: 2,
            max_positions: 100,
        };
        let set = two_branch_arena().enumerate_positions(&config);
        assert!(!set.truncated);
        assert_eq!(set.len(), 4);
        assert_eq!(set.positions[0].len(), 0);
        assert_eq!(set.positions[1].len(), 1);
        let two_movers: Vec<String> = set
            .positions
            .iter()
            .filter(|p| p.len() == 2)
            .map(|p| p.moves[1].locus.to_string())
            .collect();
        assert_eq!(two_movers, vec!["0.1", "0.2"]);
    }

    #[test]
    fn test_every_emitted_position_is_legal() {
        let config = EnumerationConfig {
            max_depth: 4,
            max_ramification: 2,
            max_positions: 1000,
        };
        let set = two_branch_arena().enumerate_positions(&config);
        for position in &set.positions {
            let report = position.validity.as_ref().unwrap();
            assert!(report.is_legal(), "illegal position emitted: {position:?}");
        }
    }

    #[test]
    fn test_truncation_flag() {
        let config = EnumerationConfig {
            max_depth: 4,
            max_ramification: 2,
            max_positions: 2,
        };
        let set = two_branch_arena().enumerate_positions(&config);
        assert!(set.truncated);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_max_ramification_caps_branching() {
        let config = EnumerationConfig {
            max_depth: 2,
            max_ramification: 1,
            max_positions: 100,
        };
        let set = two_branch_arena().enumerate_positions(&config);
        // Root ramification capped to {1}: only the "0.1" answer remains.
        assert_eq!(set.len(), 3);
    }
}
