//! Designs: one participant's side of a dialogue.
//!
//! A design is an append-only sequence of acts at loci, alternating in
//! polarity from the owner's proper polarity, optionally closed by a trailing
//! daimon. Designs are the persistent objects of the engine; everything else
//! (traces, views, strategies) is derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::act::{Act, Player, Polarity};
use crate::error::ValidationError;
use crate::locus::{LocusPath, Ramification};

/// Unique identifier for a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignId(Uuid);

impl DesignId {
    /// Generates a new random design ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DesignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DesignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One participant's alternating act sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    /// Unique identifier.
    pub id: DesignId,
    /// Which side of the dialogue this design belongs to.
    pub owner: Player,
    /// Free-form participant label (agent name, session handle).
    pub participant: String,
    /// The base locus the design is rooted at.
    pub root: LocusPath,
    /// The act sequence. Append-only; polarity alternates from the owner's
    /// proper polarity, except that a daimon may close the sequence anywhere.
    pub acts: Vec<Act>,
}

impl Design {
    /// Starts a builder for a new design.
    #[must_use]
    pub fn builder(owner: Player) -> DesignBuilder {
        DesignBuilder::new(owner)
    }

    /// Returns true if the design ends with a daimon and accepts no more acts.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.acts.last().is_some_and(Act::is_daimon)
    }

    /// The polarity expected at position `index`, ignoring the daimon escape.
    #[must_use]
    pub fn expected_polarity(&self, index: usize) -> Polarity {
        let first = self.owner.proper_polarity();
        if index % 2 == 0 {
            first
        } else {
            first.flipped()
        }
    }

    /// Appends an act, re-validating the design invariants.
    ///
    /// # Errors
    ///
    /// Fails if the design is already closed, the act breaks polarity
    /// alternation, or its justifier does not precede it.
    pub fn push_act(&mut self, act: Act) -> Result<(), ValidationError> {
        if self.is_closed() {
            return Err(ValidationError::DesignClosed);
        }
        let index = self.acts.len();
        validate_act_at(self, index, &act)?;
        self.acts.push(act);
        Ok(())
    }

    /// Appends a closing daimon justified by the last act, if the design is
    /// still open. Idempotent on closed designs.
    pub fn close_with_daimon(&mut self) {
        if self.is_closed() || self.acts.is_empty() {
            if self.acts.is_empty() {
                self.acts.push(Act::daimon(self.root.clone(), None));
            }
            return;
        }
        let last = self.acts.len() - 1;
        let locus = self.acts[last].locus.clone();
        self.acts.push(Act::daimon(locus, Some(last)));
    }

    /// The locus of the last proper act, or the root for an empty design.
    #[must_use]
    pub fn tip_locus(&self) -> LocusPath {
        self.acts
            .iter()
            .rev()
            .find(|act| !act.is_daimon())
            .map_or_else(|| self.root.clone(), |act| act.locus.clone())
    }
}

fn validate_act_at(design: &Design, index: usize, act: &Act) -> Result<(), ValidationError> {
    if let Some(justifier) = act.justifier {
        if justifier >= index {
            return Err(ValidationError::JustifierOutOfRange { index, justifier });
        }
    } else if index > 0 && !act.is_daimon() {
        return Err(ValidationError::MissingJustifier { index });
    }
    if !act.is_daimon() {
        let expected = design.expected_polarity(index);
        if act.polarity != expected {
            return Err(ValidationError::PolarityBreak {
                index,
                expected: expected.to_string(),
                actual: act.polarity.to_string(),
            });
        }
    }
    Ok(())
}

/// Builder for [`Design`], validating the whole act sequence on `build`.
#[derive(Debug)]
pub struct DesignBuilder {
    owner: Player,
    participant: String,
    root: LocusPath,
    acts: Vec<Act>,
}

impl DesignBuilder {
    fn new(owner: Player) -> Self {
        Self {
            owner,
            participant: String::new(),
            root: LocusPath::root(),
            acts: Vec::new(),
        }
    }

    /// Sets the participant label.
    #[must_use]
    pub fn participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = participant.into();
        self
    }

    /// Sets the base locus.
    #[must_use]
    pub fn root(mut self, root: LocusPath) -> Self {
        self.root = root;
        self
    }

    /// Appends a proper act.
    #[must_use]
    pub fn act(
        mut self,
        polarity: Polarity,
        locus: LocusPath,
        ramification: Ramification,
        justifier: Option<usize>,
        expression: impl Into<String>,
    ) -> Self {
        self.acts
            .push(Act::proper(polarity, locus, ramification, justifier, expression));
        self
    }

    /// Appends a daimon justified by the previous act.
    #[must_use]
    pub fn daimon(mut self) -> Self {
        let justifier = self.acts.len().checked_sub(1);
        let locus = self
            .acts
            .last()
            .map_or_else(LocusPath::root, |act| act.locus.clone());
        self.acts.push(Act::daimon(locus, justifier));
        self
    }

    /// Validates and produces the design.
    ///
    /// # Errors
    ///
    /// Fails on an empty act sequence, broken alternation, out-of-range
    /// justifiers, or acts after a daimon.
    pub fn build(self) -> Result<Design, ValidationError> {
        if self.acts.is_empty() {
            return Err(ValidationError::EmptyDesign);
        }
        let mut design = Design {
            id: DesignId::new(),
            owner: self.owner,
            participant: self.participant,
            root: self.root,
            acts: Vec::with_capacity(self.acts.len()),
        };
        for act in self.acts {
            design.push_act(act)?;
        }
        Ok(design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(suffixes: &[u32]) -> Ramification {
        suffixes.iter().copied().collect()
    }

    #[test]
    fn test_builder_alternation_ok() {
        let design = Design::builder(Player::P)
            .participant("alice")
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[1]),
                Some(0),
                "why",
            )
            .build()
            .unwrap();
        assert_eq!(design.acts.len(), 2);
        assert!(!design.is_closed());
        assert_eq!(design.tip_locus().to_string(), "0.1");
    }

    #[test]
    fn test_builder_rejects_polarity_break() {
        let err = Design::builder(Player::P)
            .act(Polarity::Neg, LocusPath::root(), ram(&[1]), None, "claim")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::PolarityBreak { index: 0, .. }));
    }

    #[test]
    fn test_builder_rejects_empty() {
        let err = Design::builder(Player::O).build().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyDesign));
    }

    #[test]
    fn test_push_after_daimon_fails() {
        let mut design = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .daimon()
            .build()
            .unwrap();
        assert!(design.is_closed());
        let err = design
            .push_act(Act::proper(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                Some(0),
                "late",
            ))
            .unwrap_err();
        assert!(matches!(err, ValidationError::DesignClosed));
    }

    #[test]
    fn test_justifier_must_precede() {
        let err = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                Some(5),
                "why",
            )
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::JustifierOutOfRange {
                index: 1,
                justifier: 5
            }
        ));
    }

    #[test]
    fn test_non_initial_needs_justifier() {
        let err = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .act(
                Polarity::Neg,
                LocusPath::root().child(1),
                ram(&[]),
                None,
                "why",
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingJustifier { index: 1 }));
    }

    #[test]
    fn test_close_with_daimon_idempotent() {
        let mut design = Design::builder(Player::P)
            .act(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim")
            .build()
            .unwrap();
        design.close_with_daimon();
        design.close_with_daimon();
        assert!(design.is_closed());
        assert_eq!(design.acts.len(), 2);
        assert_eq!(design.acts[1].justifier, Some(0));
    }

    #[test]
    fn test_design_id_serde_transparent() {
        let id = DesignId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
