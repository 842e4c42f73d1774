//! Positions: interleaved move sequences from both players.
//!
//! A position is what legality, views and strategies operate on. Unlike a
//! design, which holds one side's acts, a position interleaves moves from
//! both players with justifiers re-indexed into the shared sequence.

use serde::{Deserialize, Serialize};

use crate::act::{Act, Player, Polarity};
use crate::legality::LegalityReport;
use crate::locus::{LocusPath, Ramification};

/// One move in a position: an act tagged with the player who made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Which player made the move.
    pub player: Player,
    /// Polarity of the underlying act.
    pub polarity: Polarity,
    /// Locus the move plays at.
    pub locus: LocusPath,
    /// Child suffixes the move instantiates.
    pub ramification: Ramification,
    /// Index of the justifying move within the position, `None` for initial
    /// moves.
    pub justifier: Option<usize>,
    /// Content carried over from the act.
    pub expression: String,
}

impl Move {
    /// Builds a move from an act, re-indexing the justifier into the
    /// position's shared sequence.
    #[must_use]
    pub fn from_act(player: Player, act: &Act, justifier: Option<usize>) -> Self {
        Self {
            player,
            polarity: act.polarity,
            locus: act.locus.clone(),
            ramification: act.ramification.clone(),
            justifier,
            expression: act.expression.clone(),
        }
    }

    /// Returns true if the move has no justifier.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.justifier.is_none()
    }

    /// Returns true for a daimon move.
    #[must_use]
    pub fn is_daimon(&self) -> bool {
        self.polarity == Polarity::Daimon
    }
}

/// A finite interleaved move sequence, with the player to move next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// The moves played so far, oldest first.
    pub moves: Vec<Move>,
    /// Whose turn it is after the recorded moves.
    pub next_player: Player,
    /// Cached legality verdict, if one has been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<LegalityReport>,
}

impl Position {
    /// The empty position with `starter` to move.
    #[must_use]
    pub fn empty(starter: Player) -> Self {
        Self {
            moves: Vec::new(),
            next_player: starter,
            validity: None,
        }
    }

    /// Builds a position from moves; the next player is derived from the
    /// last move (or `starter` if there are none).
    #[must_use]
    pub fn from_moves(starter: Player, moves: Vec<Move>) -> Self {
        let next_player = moves
            .last()
            .map_or(starter, |last| last.player.opponent());
        Self {
            moves,
            next_player,
            validity: None,
        }
    }

    /// Number of moves played.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Returns true if no move has been played.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Extends the position by one move, invalidating the cached verdict.
    #[must_use]
    pub fn extended(&self, mv: Move) -> Self {
        let mut moves = self.moves.clone();
        let next_player = mv.player.opponent();
        moves.push(mv);
        Self {
            moves,
            next_player,
            validity: None,
        }
    }

    /// Returns true if `self` is a prefix of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.moves.len() >= self.moves.len() && other.moves[..self.moves.len()] == self.moves[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(suffixes: &[u32]) -> Ramification {
        suffixes.iter().copied().collect()
    }

    fn mv(player: Player, polarity: Polarity, locus: &str, justifier: Option<usize>) -> Move {
        Move {
            player,
            polarity,
            locus: locus.parse().unwrap(),
            ramification: ram(&[1]),
            justifier,
            expression: String::new(),
        }
    }

    #[test]
    fn test_empty_position() {
        let pos = Position::empty(Player::P);
        assert!(pos.is_empty());
        assert_eq!(pos.next_player, Player::P);
    }

    #[test]
    fn test_extended_alternates_turn() {
        let pos = Position::empty(Player::P)
            .extended(mv(Player::P, Polarity::Pos, "0", None))
            .extended(mv(Player::O, Polarity::Neg, "0.1", Some(0)));
        assert_eq!(pos.len(), 2);
        assert_eq!(pos.next_player, Player::P);
        assert!(pos.validity.is_none());
    }

    #[test]
    fn test_prefix_relation() {
        let a = Position::empty(Player::P).extended(mv(Player::P, Polarity::Pos, "0", None));
        let b = a
            .clone()
            .extended(mv(Player::O, Polarity::Neg, "0.1", Some(0)));
        assert!(a.is_prefix_of(&b));
        assert!(a.is_prefix_of(&a));
        assert!(!b.is_prefix_of(&a));
    }

    #[test]
    fn test_from_moves_derives_next_player() {
        let moves = vec![
            mv(Player::P, Polarity::Pos, "0", None),
            mv(Player::O, Polarity::Neg, "0.1", Some(0)),
            mv(Player::P, Polarity::Pos, "0.1.1", Some(1)),
        ];
        let pos = Position::from_moves(Player::P, moves);
        assert_eq!(pos.next_player, Player::O);
    }
}
