//! The dispute stepper: interacting a positive and a negative design.
//!
//! Stepping consumes acts from the two designs in turn order, pairing an act
//! with its mirror in the other design when both recorded the same move.
//! The interaction ends CONVERGENT when a daimon is reached, DIVERGENT when
//! an act cannot be legally placed, and STUCK when a branching act needs an
//! additive pick that has not been supplied. A dispute that merely runs out
//! of acts stays ONGOING: either design may still be extended.
//!
//! The stepper is pure. Persistence, re-resolution of design references and
//! race-conflict retries live in the engine facade.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::act::{Act, Player, Polarity};
use crate::design::{Design, DesignId};
use crate::locus::{LocusPath, Ramification};

/// Unique identifier for a persisted trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generates a new random trace ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal and non-terminal states of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// The interaction can still proceed or be extended.
    Ongoing,
    /// A daimon was reached; the designs are orthogonal.
    Convergent,
    /// An act could not be legally placed; the designs disagree.
    Divergent,
    /// A branching act awaits an additive pick.
    Stuck,
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ongoing => "ONGOING",
            Self::Convergent => "CONVERGENT",
            Self::Divergent => "DIVERGENT",
            Self::Stuck => "STUCK",
        };
        write!(f, "{label}")
    }
}

/// One consumption step of the interaction.
///
/// A step consumes the acting side's act and, when the other design mirrors
/// the same move at the same locus, the mirror as well; such fully paired
/// steps are the dispute's action pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// The player whose turn the step was.
    pub player: Player,
    /// Index of the consumed act in the positive design, if any.
    pub pos_act: Option<usize>,
    /// Index of the consumed act in the negative design, if any.
    pub neg_act: Option<usize>,
    /// The locus acted at.
    pub locus: LocusPath,
    /// When the step was taken.
    pub at: DateTime<Utc>,
}

/// A fully matched action pair: both designs recorded the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPair {
    /// Act index in the positive design.
    pub pos_act: usize,
    /// Act index in the negative design.
    pub neg_act: usize,
    /// The shared locus.
    pub locus: LocusPath,
    /// When the pair was matched.
    pub at: DateTime<Utc>,
}

/// An additive branch point awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    /// The locus of the branching act.
    pub parent: LocusPath,
    /// The child suffixes to choose among.
    pub options: Vec<u32>,
}

/// Why an interaction diverged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DivergenceReason {
    /// The act answers no branch opened by the other side.
    UnjustifiedAct {
        side: Player,
        act_index: usize,
        locus: LocusPath,
    },
    /// The act replays a locus already consumed.
    RepeatedLocus {
        side: Player,
        act_index: usize,
        locus: LocusPath,
    },
    /// A design's next act carries the wrong polarity for its owner's turn:
    /// it anticipates a move the other side never made.
    ChronicleMismatch { side: Player, act_index: usize },
}

/// The pure outcome of stepping two designs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// All consumption steps, in order.
    pub steps: Vec<TraceStep>,
    /// Terminal or non-terminal status after the last step.
    pub status: DisputeStatus,
    /// On convergence, the side that did not yield.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
    /// On STUCK, the branch point awaiting a pick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingChoice>,
    /// Why the interaction diverged, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceReason>,
    /// True if `max_pairs` stopped the interaction.
    pub hit_cap: bool,
}

impl Dispute {
    /// Number of consumption steps taken.
    #[must_use]
    pub fn length(&self) -> usize {
        self.steps.len()
    }

    /// Projects the stepped interaction onto a single interleaved position,
    /// re-indexing justifiers to step indices.
    ///
    /// Steps whose act indices do not resolve in the supplied designs are
    /// skipped, so handing in designs other than the pair that produced the
    /// dispute yields a partial position rather than a panic.
    #[must_use]
    pub fn to_position(&self, pos: &Design, neg: &Design) -> crate::position::Position {
        let mut moves = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let act = match (step.pos_act, step.neg_act) {
                (Some(pos_act), _) => pos.acts.get(pos_act),
                (None, Some(neg_act)) => neg.acts.get(neg_act),
                (None, None) => None,
            };
            let Some(act) = act else {
                continue;
            };
            let justifier = step.locus.parent().and_then(|parent| {
                self.steps[..index]
                    .iter()
                    .position(|earlier| earlier.locus == parent)
            });
            moves.push(crate::position::Move::from_act(step.player, act, justifier));
        }
        crate::position::Position::from_moves(Player::P, moves)
    }

    /// The fully matched action pairs.
    #[must_use]
    pub fn pairs(&self) -> Vec<ActionPair> {
        self.steps
            .iter()
            .filter_map(|step| match (step.pos_act, step.neg_act) {
                (Some(pos_act), Some(neg_act)) => Some(ActionPair {
                    pos_act,
                    neg_act,
                    locus: step.locus.clone(),
                    at: step.at,
                }),
                _ => None,
            })
            .collect()
    }
}

/// A persisted interaction record for one (positive, negative) design pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Unique identifier of this trace row.
    pub id: TraceId,
    /// The positive design.
    pub pos_design: DesignId,
    /// The negative design.
    pub neg_design: DesignId,
    /// The stepped interaction.
    pub dispute: Dispute,
    /// Recorded additive picks, parent locus to chosen child suffix.
    pub used_additive: BTreeMap<LocusPath, u32>,
    /// Revision of the positive design the trace was computed against.
    pub pos_revision: u64,
    /// Revision of the negative design the trace was computed against.
    pub neg_revision: u64,
    /// When the trace was (re)computed.
    pub computed_at: DateTime<Utc>,
}

impl Trace {
    /// Builds a trace row around a stepped dispute.
    #[must_use]
    pub fn new(
        pos_design: DesignId,
        neg_design: DesignId,
        dispute: Dispute,
        used_additive: BTreeMap<LocusPath, u32>,
        pos_revision: u64,
        neg_revision: u64,
    ) -> Self {
        Self {
            id: TraceId::new(),
            pos_design,
            neg_design,
            dispute,
            used_additive,
            pos_revision,
            neg_revision,
            computed_at: Utc::now(),
        }
    }
}

struct OpenedBranch {
    player: Player,
    ramification: Ramification,
}

/// Steps the interaction of a positive and a negative design.
///
/// `picks` resolves additive branch points; `max_pairs` caps the number of
/// steps (the cap is reported through `hit_cap`, never an error).
#[must_use]
pub fn step_interaction(
    pos: &Design,
    neg: &Design,
    picks: &BTreeMap<LocusPath, u32>,
    max_pairs: usize,
) -> Dispute {
    let mut dispute = Dispute {
        steps: Vec::new(),
        status: DisputeStatus::Ongoing,
        winner: None,
        pending: None,
        divergence: None,
        hit_cap: false,
    };
    let mut pos_cursor = 0usize;
    let mut neg_cursor = 0usize;
    let mut opened: BTreeMap<LocusPath, OpenedBranch> = BTreeMap::new();
    let mut turn = Player::P;

    loop {
        if dispute.steps.len() >= max_pairs {
            dispute.hit_cap = true;
            break;
        }
        let (own, other, own_cursor, other_cursor) = match turn {
            Player::P => (pos, neg, pos_cursor, neg_cursor),
            Player::O => (neg, pos, neg_cursor, pos_cursor),
        };
        let Some(act) = own.acts.get(own_cursor) else {
            // The side to move has nothing left. An opposing daimon still
            // terminates the interaction; otherwise the dispute stays open.
            if let Some(tail) = other.acts.get(other_cursor) {
                if tail.is_daimon() {
                    let locus = tail.locus.clone();
                    record_step(&mut dispute, turn.opponent(), other_cursor, None, locus);
                    dispute.status = DisputeStatus::Convergent;
                    dispute.winner = Some(turn);
                }
            }
            break;
        };

        if act.is_daimon() {
            let locus = act.locus.clone();
            record_step(&mut dispute, turn, own_cursor, None, locus);
            dispute.status = DisputeStatus::Convergent;
            dispute.winner = Some(turn.opponent());
            break;
        }

        if act.polarity != turn.proper_polarity() {
            dispute.status = DisputeStatus::Divergent;
            dispute.divergence = Some(DivergenceReason::ChronicleMismatch {
                side: turn,
                act_index: own_cursor,
            });
            break;
        }

        if !placeable(act, own, &dispute, &opened, turn) {
            dispute.status = DisputeStatus::Divergent;
            dispute.divergence = Some(DivergenceReason::UnjustifiedAct {
                side: turn,
                act_index: own_cursor,
                locus: act.locus.clone(),
            });
            break;
        }

        if opened.contains_key(&act.locus) {
            dispute.status = DisputeStatus::Divergent;
            dispute.divergence = Some(DivergenceReason::RepeatedLocus {
                side: turn,
                act_index: own_cursor,
                locus: act.locus.clone(),
            });
            break;
        }

        let mut effective = act.ramification.clone();
        if act.is_branching() {
            match picks.get(&act.locus) {
                Some(&choice) if effective.contains(&choice) => {
                    effective = std::iter::once(choice).collect();
                }
                _ => {
                    dispute.status = DisputeStatus::Stuck;
                    dispute.pending = Some(PendingChoice {
                        parent: act.locus.clone(),
                        options: act.ramification.iter().copied().collect(),
                    });
                    break;
                }
            }
        }

        // Consume the act, together with its mirror in the other design if
        // the other side recorded the same move.
        let mirror = other
            .acts
            .get(other_cursor)
            .is_some_and(|candidate| {
                candidate.locus == act.locus && candidate.polarity == act.polarity
            })
            .then_some(other_cursor);
        let locus = act.locus.clone();
        record_step(&mut dispute, turn, own_cursor, mirror, locus.clone());
        opened.insert(
            locus,
            OpenedBranch {
                player: turn,
                ramification: effective,
            },
        );
        match turn {
            Player::P => pos_cursor += 1,
            Player::O => neg_cursor += 1,
        }
        if mirror.is_some() {
            match turn {
                Player::P => neg_cursor += 1,
                Player::O => pos_cursor += 1,
            }
        }
        turn = turn.opponent();
    }

    dispute
}

/// An act is placeable if it opens the interaction at its design's root, or
/// answers a branch the other player opened.
fn placeable(
    act: &Act,
    own: &Design,
    dispute: &Dispute,
    opened: &BTreeMap<LocusPath, OpenedBranch>,
    turn: Player,
) -> bool {
    if dispute.steps.is_empty() {
        return act.locus == own.root;
    }
    let Some(parent) = act.locus.parent() else {
        return false;
    };
    let Some(suffix) = act.locus.last_suffix() else {
        return false;
    };
    opened
        .get(&parent)
        .is_some_and(|branch| branch.player == turn.opponent() && branch.ramification.contains(&suffix))
}

fn record_step(
    dispute: &mut Dispute,
    player: Player,
    own_index: usize,
    mirror_index: Option<usize>,
    locus: LocusPath,
) {
    // Orient the two indices onto the positive/negative design columns.
    let (pos_act, neg_act) = match player {
        Player::P => (Some(own_index), mirror_index),
        Player::O => (mirror_index, Some(own_index)),
    };
    dispute.steps.push(TraceStep {
        player,
        pos_act,
        neg_act,
        locus,
        at: Utc::now(),
    });
}
