//! Polarized dialogue acts.
//!
//! An act is one atomic contribution at a locus: positive acts claim and open
//! branches, negative acts challenge, and the daimon ends the speaker's part
//! of the interaction. Justifiers are indices into the owning sequence,
//! never references to acts elsewhere.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locus::{LocusPath, Ramification};

/// Polarity of a dialogue act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// A claim or answer; opens the branches in its ramification.
    Pos,
    /// A challenge or request; focuses one opened branch.
    Neg,
    /// The daimon: the speaker yields, terminating interaction convergently.
    Daimon,
}

impl Polarity {
    /// The dual polarity. The daimon is self-dual.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Pos => Self::Neg,
            Self::Neg => Self::Pos,
            Self::Daimon => Self::Daimon,
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pos => write!(f, "+"),
            Self::Neg => write!(f, "-"),
            Self::Daimon => write!(f, "daimon"),
        }
    }
}

/// The two sides of a dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    /// Proponent: plays the positive design.
    P,
    /// Opponent: plays the negative design.
    O,
}

impl Player {
    /// The other player.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::P => Self::O,
            Self::O => Self::P,
        }
    }

    /// The polarity of this player's proper (non-daimon) opening acts.
    #[must_use]
    pub const fn proper_polarity(self) -> Polarity {
        match self {
            Self::P => Polarity::Pos,
            Self::O => Polarity::Neg,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::P => write!(f, "P"),
            Self::O => write!(f, "O"),
        }
    }
}

/// One polarized act at a locus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    /// Polarity of the act.
    pub polarity: Polarity,
    /// The locus this act plays at.
    pub locus: LocusPath,
    /// Child suffixes this act instantiates below its locus.
    pub ramification: Ramification,
    /// Index of the act this one responds to, within the owning sequence.
    /// `None` only for initial acts.
    pub justifier: Option<usize>,
    /// Human-readable content carried by the act.
    pub expression: String,
}

impl Act {
    /// Creates a proper (non-daimon) act.
    #[must_use]
    pub fn proper(
        polarity: Polarity,
        locus: LocusPath,
        ramification: Ramification,
        justifier: Option<usize>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            polarity,
            locus,
            ramification,
            justifier,
            expression: expression.into(),
        }
    }

    /// Creates a daimon act at the given locus.
    ///
    /// The daimon carries no ramification: it opens nothing.
    #[must_use]
    pub fn daimon(locus: LocusPath, justifier: Option<usize>) -> Self {
        Self {
            polarity: Polarity::Daimon,
            locus,
            ramification: Ramification::new(),
            justifier,
            expression: String::new(),
        }
    }

    /// Returns true for the daimon.
    #[must_use]
    pub fn is_daimon(&self) -> bool {
        self.polarity == Polarity::Daimon
    }

    /// Returns true if this act has no justifier.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.justifier.is_none()
    }

    /// Returns true if the act opens more than one branch, requiring an
    /// additive pick during interaction.
    #[must_use]
    pub fn is_branching(&self) -> bool {
        self.polarity == Polarity::Pos && self.ramification.len() > 1
    }
}

impl fmt::Display for Act {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_daimon() {
            write!(f, "daimon@{}", self.locus)
        } else {
            write!(f, "{}{}", self.polarity, self.locus)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(suffixes: &[u32]) -> Ramification {
        suffixes.iter().copied().collect()
    }

    #[test]
    fn test_polarity_flip() {
        assert_eq!(Polarity::Pos.flipped(), Polarity::Neg);
        assert_eq!(Polarity::Neg.flipped(), Polarity::Pos);
        assert_eq!(Polarity::Daimon.flipped(), Polarity::Daimon);
    }

    #[test]
    fn test_player_opponent() {
        assert_eq!(Player::P.opponent(), Player::O);
        assert_eq!(Player::O.opponent(), Player::P);
        assert_eq!(Player::P.proper_polarity(), Polarity::Pos);
    }

    #[test]
    fn test_daimon_act_shape() {
        let act = Act::daimon(LocusPath::root(), None);
        assert!(act.is_daimon());
        assert!(act.is_initial());
        assert!(!act.is_branching());
        assert!(act.ramification.is_empty());
    }

    #[test]
    fn test_branching_detection() {
        let single = Act::proper(Polarity::Pos, LocusPath::root(), ram(&[1]), None, "claim");
        let wide = Act::proper(Polarity::Pos, LocusPath::root(), ram(&[1, 2]), None, "claim");
        let neg = Act::proper(
            Polarity::Neg,
            LocusPath::root().child(1),
            ram(&[1, 2]),
            Some(0),
            "why",
        );
        assert!(!single.is_branching());
        assert!(wide.is_branching());
        assert!(!neg.is_branching());
    }

    #[test]
    fn test_serde_snake_case_polarity() {
        let json = serde_json::to_string(&Polarity::Daimon).unwrap();
        assert_eq!(json, "\"daimon\"");
        let json = serde_json::to_string(&Player::P).unwrap();
        assert_eq!(json, "\"p\"");
    }
}
