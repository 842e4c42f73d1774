//! Legality checking: the four predicates over a position.
//!
//! Linearity (no locus is played twice), parity (players strictly
//! alternate), justification (every non-initial move answers an opened
//! branch of an earlier move) and visibility (the justifier is in the
//! mover's view). Each predicate is checked independently and the verdict is
//! a structured report; an illegal position is a result, never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::act::Player;
use crate::design::Design;
use crate::locus::LocusPath;
use crate::position::Move;
use crate::view::view_indices;

/// One legality violation, tied to the move that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LegalityViolation {
    /// A locus was played more than once.
    RepeatedLocus { index: usize, locus: LocusPath },
    /// Two consecutive moves by the same player.
    ParityBreak { index: usize, player: Player },
    /// A non-initial move with no justifier at all.
    MissingJustifier { index: usize },
    /// The justifier exists but does not open the branch this move plays.
    UnjustifiedMove {
        index: usize,
        locus: LocusPath,
        justifier: usize,
    },
    /// The justifier was discarded from the mover's view.
    JustifierNotVisible { index: usize, justifier: usize },
    /// The locus is not part of the arena the sequence was checked against.
    UnknownLocus { index: usize, locus: LocusPath },
}

impl fmt::Display for LegalityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatedLocus { index, locus } => {
                write!(f, "move {index} repeats locus '{locus}'")
            }
            Self::ParityBreak { index, player } => {
                write!(f, "move {index} breaks alternation ({player} moved twice)")
            }
            Self::MissingJustifier { index } => {
                write!(f, "move {index} is non-initial but has no justifier")
            }
            Self::UnjustifiedMove {
                index,
                locus,
                justifier,
            } => write!(
                f,
                "move {index} at '{locus}' is not opened by its justifier {justifier}"
            ),
            Self::JustifierNotVisible { index, justifier } => {
                write!(f, "justifier {justifier} of move {index} is not in the mover's view")
            }
            Self::UnknownLocus { index, locus } => {
                write!(f, "move {index} plays locus '{locus}' which is not in the arena")
            }
        }
    }
}

/// Verdict of the four legality predicates over one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalityReport {
    /// No locus played twice.
    pub is_linear: bool,
    /// Players strictly alternate.
    pub is_parity_alternating: bool,
    /// Every non-initial move answers a branch its justifier opened.
    pub is_justified: bool,
    /// Every justifier survives in the mover's view.
    pub is_visible: bool,
    /// Every locus belongs to the arena the sequence was checked against.
    /// Vacuously true when no arena is supplied.
    pub is_in_arena: bool,
    /// All violations found, in move order.
    pub violations: Vec<LegalityViolation>,
}

impl LegalityReport {
    /// Returns true if the four predicates hold and, where an arena was
    /// supplied, every locus belongs to it.
    #[must_use]
    pub fn is_legal(&self) -> bool {
        self.is_linear
            && self.is_parity_alternating
            && self.is_justified
            && self.is_visible
            && self.is_in_arena
    }

    fn legal() -> Self {
        Self {
            is_linear: true,
            is_parity_alternating: true,
            is_justified: true,
            is_visible: true,
            is_in_arena: true,
            violations: Vec::new(),
        }
    }
}

/// Runs all four predicates over a move sequence.
#[must_use]
pub fn check_position(moves: &[Move]) -> LegalityReport {
    let mut report = LegalityReport::legal();

    // Linearity: each locus at most once. Daimon moves replay the locus they
    // yield at and are exempt.
    let mut seen: HashMap<&LocusPath, usize> = HashMap::new();
    for (index, mv) in moves.iter().enumerate() {
        if mv.is_daimon() {
            continue;
        }
        if seen.insert(&mv.locus, index).is_some() {
            report.is_linear = false;
            report.violations.push(LegalityViolation::RepeatedLocus {
                index,
                locus: mv.locus.clone(),
            });
        }
    }

    // Parity: strict alternation of players.
    for (index, window) in moves.windows(2).enumerate() {
        if window[0].player == window[1].player {
            report.is_parity_alternating = false;
            report.violations.push(LegalityViolation::ParityBreak {
                index: index + 1,
                player: window[1].player,
            });
        }
    }

    // Justification: a non-initial move must play a child locus of its
    // justifier, on a branch the justifier's ramification opened.
    for (index, mv) in moves.iter().enumerate() {
        if mv.is_daimon() {
            continue;
        }
        match mv.justifier {
            None => {
                if index > 0 {
                    report.is_justified = false;
                    report
                        .violations
                        .push(LegalityViolation::MissingJustifier { index });
                }
            }
            Some(justifier) => {
                let opened = justifier < index
                    && moves[justifier].locus == mv.locus.parent().unwrap_or_default()
                    && mv
                        .locus
                        .last_suffix()
                        .is_some_and(|suffix| moves[justifier].ramification.contains(&suffix));
                if !opened {
                    report.is_justified = false;
                    report.violations.push(LegalityViolation::UnjustifiedMove {
                        index,
                        locus: mv.locus.clone(),
                        justifier,
                    });
                }
            }
        }
    }

    // Visibility: the justifier must be retained by the mover's view of the
    // strict prefix ending at the move.
    for (index, mv) in moves.iter().enumerate() {
        if let Some(justifier) = mv.justifier {
            if justifier >= index {
                continue; // already reported as unjustified
            }
            let kept = view_indices(&moves[..index], mv.player);
            if !kept.contains(&justifier) {
                report.is_visible = false;
                report
                    .violations
                    .push(LegalityViolation::JustifierNotVisible { index, justifier });
            }
        }
    }

    report
}

/// Runs the four predicates and additionally pins every locus to the arena.
///
/// Arena membership is reported on its own flag; the four predicates are
/// untouched by it.
#[must_use]
pub fn check_position_in_arena(moves: &[Move], arena: &crate::arena::Arena) -> LegalityReport {
    let mut report = check_position(moves);
    for (index, mv) in moves.iter().enumerate() {
        if mv.is_daimon() {
            continue;
        }
        if !arena.contains(&mv.locus) {
            report.is_in_arena = false;
            report.violations.push(LegalityViolation::UnknownLocus {
                index,
                locus: mv.locus.clone(),
            });
        }
    }
    report
}

/// Runs the structural predicates over a single design's own act sequence.
///
/// Visibility is vacuous on one design's chronicle (the view of an
/// alternating single-source sequence retains every act), so this reduces to
/// linearity, alternation and justification.
#[must_use]
pub fn check_design(design: &Design) -> LegalityReport {
    let mut report = LegalityReport::legal();

    let mut seen: HashMap<&LocusPath, usize> = HashMap::new();
    for (index, act) in design.acts.iter().enumerate() {
        if act.is_daimon() {
            continue;
        }
        if seen.insert(&act.locus, index).is_some() {
            report.is_linear = false;
            report.violations.push(LegalityViolation::RepeatedLocus {
                index,
                locus: act.locus.clone(),
            });
        }
        match act.justifier {
            None => {
                if index > 0 {
                    report.is_justified = false;
                    report
                        .violations
                        .push(LegalityViolation::MissingJustifier { index });
                }
            }
            Some(justifier) => {
                let opened = justifier < index
                    && design.acts[justifier].locus == act.locus.parent().unwrap_or_default()
                    && act
                        .locus
                        .last_suffix()
                        .is_some_and(|suffix| design.acts[justifier].ramification.contains(&suffix));
                if !opened {
                    report.is_justified = false;
                    report.violations.push(LegalityViolation::UnjustifiedMove {
                        index,
                        locus: act.locus.clone(),
                        justifier,
                    });
                }
            }
        }
    }

    for (index, act) in design.acts.iter().enumerate() {
        if act.is_daimon() {
            continue;
        }
        if act.polarity != design.expected_polarity(index) {
            report.is_parity_alternating = false;
            report.violations.push(LegalityViolation::ParityBreak {
                index,
                player: design.owner,
            });
        }
    }

    report
}
