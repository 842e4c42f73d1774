//! Compiling canonical dialogue moves into designs.
//!
//! Deliberation front-ends speak in moves (assert, why, grounds, concede);
//! the engine speaks in designs. The compiler walks an ordered move list,
//! allocates child loci, threads justifiers, and splits the resulting
//! timeline into the Proponent's and the Opponent's chronicles. Move kind is
//! a closed enum and every kind is mapped through the single `match` in
//! [`compile_moves`]; there is no string dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::act::{Act, Player, Polarity};
use crate::design::{Design, DesignId};
use crate::error::ValidationError;
use crate::legality::{check_design, LegalityReport};
use crate::locus::{LocusPath, Ramification};

/// The closed set of canonical dialogue move kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Put forward a claim, opening the dialogue or a fresh branch.
    Assert,
    /// Challenge the other side's last claim.
    Why,
    /// Answer the pending challenge with supporting grounds.
    Grounds,
    /// Draw a conclusion in answer to the pending challenge.
    Therefore,
    /// Introduce a hypothesis in answer to the pending challenge.
    Suppose,
    /// Close a supposition; opens no further branches.
    Discharge,
    /// Accept the other side's point and yield.
    Concede,
    /// Withdraw one's own claim and yield.
    Retract,
    /// End one's part of the dialogue.
    Close,
}

/// One canonical dialogue move, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMove {
    /// What the move does.
    pub kind: MoveKind,
    /// Who makes it.
    pub actor: Player,
    /// Explicit target locus; defaults follow the dialogue anchors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locus: Option<LocusPath>,
    /// Explicit child suffix; defaults to the next free suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<u32>,
    /// Child suffixes the compiled act should open; defaults per kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opens: Option<Vec<u32>>,
    /// Free-form content.
    pub expression: String,
}

impl CanonicalMove {
    /// A move with defaulted placement.
    #[must_use]
    pub fn new(kind: MoveKind, actor: Player, expression: impl Into<String>) -> Self {
        Self {
            kind,
            actor,
            locus: None,
            child: None,
            opens: None,
            expression: expression.into(),
        }
    }
}

/// The designs a dialogue compiles into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDesigns {
    /// The Proponent's chronicle.
    pub positive: Design,
    /// The Opponent's chronicle, absent if the Opponent never moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<Design>,
    /// Structural verdict over the Proponent's chronicle.
    pub positive_report: LegalityReport,
    /// Structural verdict over the Opponent's chronicle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_report: Option<LegalityReport>,
}

struct TimelineEntry {
    actor: Player,
    act: Act,
}

/// Compiles an ordered move list into a positive and a negative design.
///
/// # Errors
///
/// Fails on an empty move list, a non-Proponent or non-assertive opening,
/// broken actor alternation, moves after a yielding move, or an explicit
/// zero child suffix.
pub fn compile_moves(moves: &[CanonicalMove]) -> Result<CompiledDesigns, ValidationError> {
    if moves.is_empty() {
        return Err(ValidationError::EmptyMoveList);
    }

    let mut timeline: Vec<TimelineEntry> = Vec::new();
    let mut next_child: BTreeMap<LocusPath, u32> = BTreeMap::new();
    // The last positive locus (claims attach challenges here) and the last
    // negative locus (answers attach here).
    let mut anchor = LocusPath::root();
    let mut last_challenge: Option<LocusPath> = None;
    let mut yielded = false;

    for (index, mv) in moves.iter().enumerate() {
        if yielded {
            return Err(ValidationError::DesignClosed);
        }
        if let Some(0) = mv.child {
            return Err(ValidationError::ZeroChildSuffix);
        }
        // The single mapping table for all move kinds.
        match mv.kind {
            MoveKind::Assert | MoveKind::Grounds | MoveKind::Therefore | MoveKind::Suppose
            | MoveKind::Discharge => {
                let parent = if timeline.is_empty() {
                    None // opening claim sits at the root
                } else {
                    Some(match (&mv.locus, &last_challenge) {
                        (Some(explicit), _) => explicit.clone(),
                        (None, Some(challenge)) => challenge.clone(),
                        (None, None) => anchor.clone(),
                    })
                };
                let locus = match parent {
                    None => mv.locus.clone().unwrap_or_default(),
                    Some(ref parent) => parent.child(allocate(&mut next_child, parent, mv.child)),
                };
                let opens = default_opens(mv, mv.kind != MoveKind::Discharge);
                let justifier = parent
                    .as_ref()
                    .and_then(|parent| locus_index(&timeline, parent));
                expect_polarity(&timeline, index, Polarity::Pos)?;
                anchor = locus.clone();
                timeline.push(TimelineEntry {
                    actor: mv.actor,
                    act: Act::proper(Polarity::Pos, locus, opens, justifier, &*mv.expression),
                });
            }
            MoveKind::Why => {
                let target = mv.locus.clone().unwrap_or_else(|| anchor.clone());
                let locus = target.child(allocate(&mut next_child, &target, mv.child));
                let opens = default_opens(mv, true);
                let justifier = locus_index(&timeline, &target);
                expect_polarity(&timeline, index, Polarity::Neg)?;
                last_challenge = Some(locus.clone());
                timeline.push(TimelineEntry {
                    actor: mv.actor,
                    act: Act::proper(Polarity::Neg, locus, opens, justifier, &*mv.expression),
                });
            }
            MoveKind::Concede | MoveKind::Retract | MoveKind::Close => {
                let locus = timeline
                    .last()
                    .map_or_else(LocusPath::root, |entry| entry.act.locus.clone());
                let justifier = timeline.len().checked_sub(1);
                timeline.push(TimelineEntry {
                    actor: mv.actor,
                    act: Act::daimon(locus, justifier),
                });
                yielded = true;
            }
        }
    }

    let positive = split_chronicle(&timeline, Player::P)?.ok_or(ValidationError::EmptyDesign)?;
    let negative = split_chronicle(&timeline, Player::O)?;
    let positive_report = check_design(&positive);
    let negative_report = negative.as_ref().map(check_design);
    Ok(CompiledDesigns {
        positive,
        negative,
        positive_report,
        negative_report,
    })
}

fn allocate(next_child: &mut BTreeMap<LocusPath, u32>, parent: &LocusPath, explicit: Option<u32>) -> u32 {
    match explicit {
        Some(suffix) => {
            let reserved = next_child.entry(parent.clone()).or_insert(1);
            if *reserved <= suffix {
                *reserved = suffix + 1;
            }
            suffix
        }
        None => {
            let counter = next_child.entry(parent.clone()).or_insert(1);
            let suffix = *counter;
            *counter += 1;
            suffix
        }
    }
}

fn default_opens(mv: &CanonicalMove, opens_branch: bool) -> Ramification {
    match &mv.opens {
        Some(suffixes) => suffixes.iter().copied().collect(),
        None if opens_branch => std::iter::once(1).collect(),
        None => Ramification::new(),
    }
}

fn locus_index(timeline: &[TimelineEntry], locus: &LocusPath) -> Option<usize> {
    timeline.iter().position(|entry| entry.act.locus == *locus)
}

fn expect_polarity(
    timeline: &[TimelineEntry],
    index: usize,
    actual: Polarity,
) -> Result<(), ValidationError> {
    let expected = if timeline.len() % 2 == 0 {
        Polarity::Pos
    } else {
        Polarity::Neg
    };
    if actual == expected {
        Ok(())
    } else {
        Err(ValidationError::PolarityBreak {
            index,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Cuts one player's chronicle out of the shared timeline.
///
/// The chronicle starts at the player's first act and includes everything
/// from there on, except that a yielding daimon belongs only to its actor.
fn split_chronicle(
    timeline: &[TimelineEntry],
    owner: Player,
) -> Result<Option<Design>, ValidationError> {
    let Some(offset) = timeline.iter().position(|entry| entry.actor == owner) else {
        return Ok(None);
    };
    let mut design = Design {
        id: DesignId::new(),
        owner,
        participant: String::new(),
        root: timeline[offset].act.locus.clone(),
        acts: Vec::new(),
    };
    let mut kept: Vec<usize> = Vec::new();
    for (index, entry) in timeline.iter().enumerate().skip(offset) {
        if entry.act.is_daimon() && entry.actor != owner {
            continue;
        }
        kept.push(index);
    }
    let remap: BTreeMap<usize, usize> = kept
        .iter()
        .enumerate()
        .map(|(new_index, &old_index)| (old_index, new_index))
        .collect();
    for &index in &kept {
        let entry = &timeline[index];
        let act = Act {
            justifier: entry
                .act
                .justifier
                .and_then(|justifier| remap.get(&justifier).copied()),
            ..entry.act.clone()
        };
        design.push_act(act)?;
    }
    Ok(Some(design))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispute::{step_interaction, DisputeStatus};

    fn why_grounds_dialogue() -> Vec<CanonicalMove> {
        vec![
            CanonicalMove::new(MoveKind::Assert, Player::P, "tariffs raise prices"),
            CanonicalMove::new(MoveKind::Why, Player::O, "why?"),
            CanonicalMove::new(MoveKind::Grounds, Player::P, "import costs pass through"),
        ]
    }

    #[test]
    fn test_assert_why_grounds_loci() {
        let compiled = compile_moves(&why_grounds_dialogue()).unwrap();
        let pos = &compiled.positive;
        assert_eq!(pos.acts.len(), 3);
        assert_eq!(pos.acts[0].locus.to_string(), "0");
        assert_eq!(pos.acts[1].locus.to_string(), "0.1");
        assert_eq!(pos.acts[2].locus.to_string(), "0.1.1");
        assert_eq!(pos.acts[1].justifier, Some(0));
        assert_eq!(pos.acts[2].justifier, Some(1));
        assert!(compiled.positive_report.is_legal());

        let neg = compiled.negative.unwrap();
        assert_eq!(neg.acts.len(), 2);
        assert_eq!(neg.root.to_string(), "0.1");
        assert!(neg.acts[0].is_initial());
        assert!(compiled.negative_report.unwrap().is_legal());
    }

    #[test]
    fn test_compiled_designs_interact() {
        let compiled = compile_moves(&why_grounds_dialogue()).unwrap();
        let neg = compiled.negative.unwrap();
        let dispute = step_interaction(&compiled.positive, &neg, &BTreeMap::new(), 64);
        assert_eq!(dispute.status, DisputeStatus::Ongoing);
        assert_eq!(dispute.length(), 3);
        assert_eq!(dispute.pairs().len(), 2);
    }

    #[test]
    fn test_concede_appends_daimon_to_actor_only() {
        let mut moves = why_grounds_dialogue();
        moves.push(CanonicalMove::new(MoveKind::Concede, Player::O, ""));
        let compiled = compile_moves(&moves).unwrap();
        assert!(!compiled.positive.is_closed());
        let neg = compiled.negative.unwrap();
        assert!(neg.is_closed());
        let dispute = step_interaction(&compiled.positive, &neg, &BTreeMap::new(), 64);
        assert_eq!(dispute.status, DisputeStatus::Convergent);
    }

    #[test]
    fn test_retract_closes_own_design() {
        let moves = vec![
            CanonicalMove::new(MoveKind::Assert, Player::P, "claim"),
            CanonicalMove::new(MoveKind::Why, Player::O, "why?"),
            CanonicalMove::new(MoveKind::Retract, Player::P, ""),
        ];
        let compiled = compile_moves(&moves).unwrap();
        assert!(compiled.positive.is_closed());
    }

    #[test]
    fn test_move_after_close_is_rejected() {
        let moves = vec![
            CanonicalMove::new(MoveKind::Assert, Player::P, "claim"),
            CanonicalMove::new(MoveKind::Close, Player::P, ""),
            CanonicalMove::new(MoveKind::Why, Player::O, "why?"),
        ];
        let err = compile_moves(&moves).unwrap_err();
        assert!(matches!(err, ValidationError::DesignClosed));
    }

    #[test]
    fn test_consecutive_claims_break_alternation() {
        let moves = vec![
            CanonicalMove::new(MoveKind::Assert, Player::P, "first"),
            CanonicalMove::new(MoveKind::Assert, Player::P, "second"),
        ];
        let err = compile_moves(&moves).unwrap_err();
        assert!(matches!(err, ValidationError::PolarityBreak { index: 1, .. }));
    }

    #[test]
    fn test_empty_move_list_rejected() {
        assert!(matches!(
            compile_moves(&[]).unwrap_err(),
            ValidationError::EmptyMoveList
        ));
    }

    #[test]
    fn test_explicit_zero_child_rejected() {
        let mut mv = CanonicalMove::new(MoveKind::Why, Player::O, "why?");
        mv.child = Some(0);
        let moves = vec![
            CanonicalMove::new(MoveKind::Assert, Player::P, "claim"),
            mv,
        ];
        assert!(matches!(
            compile_moves(&moves).unwrap_err(),
            ValidationError::ZeroChildSuffix
        ));
    }

    #[test]
    fn test_branching_assert_via_opens() {
        let mut opening = CanonicalMove::new(MoveKind::Assert, Player::P, "two-pronged claim");
        opening.opens = Some(vec![1, 2]);
        let moves = vec![
            opening,
            CanonicalMove::new(MoveKind::Why, Player::O, "why the first prong?"),
        ];
        let compiled = compile_moves(&moves).unwrap();
        assert!(compiled.positive.acts[0].is_branching());
        let neg = compiled.negative.unwrap();
        let dispute = step_interaction(&compiled.positive, &neg, &BTreeMap::new(), 64);
        assert_eq!(dispute.status, DisputeStatus::Stuck);
    }

    #[test]
    fn test_discharge_opens_nothing() {
        let moves = vec![
            CanonicalMove::new(MoveKind::Suppose, Player::P, "suppose prices rise"),
            CanonicalMove::new(MoveKind::Why, Player::O, "granting what?"),
            CanonicalMove::new(MoveKind::Discharge, Player::P, "then demand falls"),
        ];
        let compiled = compile_moves(&moves).unwrap();
        assert!(compiled.positive.acts[2].ramification.is_empty());
        assert!(compiled.positive_report.is_legal());
    }
}
