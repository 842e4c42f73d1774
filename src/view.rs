//! View extraction: what one player has actually seen.
//!
//! The view of a position for a player keeps the player's own moves and, for
//! each opponent move it retains, jumps back to the move that justified it,
//! discarding everything in between. Extraction is idempotent: the view of a
//! view is itself.

use serde::{Deserialize, Serialize};

use crate::act::Player;
use crate::dispute::TraceId;
use crate::position::{Move, Position};

/// A player's projection of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// The player the view belongs to.
    pub player: Player,
    /// The retained moves, oldest first, with justifiers re-indexed into the
    /// view sequence (or cleared where the justifying move was discarded).
    pub sequence: Vec<Move>,
    /// The trace this view was projected from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_trace: Option<TraceId>,
}

impl View {
    /// Number of retained moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns true if nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Indices of the moves a player's view retains, ascending.
///
/// Scans backward: the player's own moves are always kept; an opponent move
/// is kept together with its justifier, and the scan resumes just before the
/// justifier. An unjustified opponent move ends the scan, as does one whose
/// justifier does not strictly precede it (a dangling or forward index
/// cannot be followed).
#[must_use]
pub fn view_indices(moves: &[Move], player: Player) -> Vec<usize> {
    let mut kept = Vec::new();
    let mut cursor = match moves.len().checked_sub(1) {
        Some(last) => last,
        None => return kept,
    };
    loop {
        let mv = &moves[cursor];
        if mv.player == player {
            kept.push(cursor);
            match cursor.checked_sub(1) {
                Some(prev) => cursor = prev,
                None => break,
            }
        } else {
            kept.push(cursor);
            match mv.justifier {
                Some(justifier) if justifier < cursor => {
                    kept.push(justifier);
                    match justifier.checked_sub(1) {
                        Some(prev) => cursor = prev,
                        None => break,
                    }
                }
                _ => break,
            }
        }
    }
    kept.reverse();
    kept
}

/// Extracts a player's view of a position.
#[must_use]
pub fn extract_view(position: &Position, player: Player) -> View {
    let kept = view_indices(&position.moves, player);
    let mut remap = vec![None; position.moves.len()];
    for (new_index, &old_index) in kept.iter().enumerate() {
        remap[old_index] = Some(new_index);
    }
    let sequence = kept
        .iter()
        .map(|&old_index| {
            let mut mv = position.moves[old_index].clone();
            mv.justifier = mv
                .justifier
                .and_then(|justifier| remap.get(justifier).copied().flatten());
            mv
        })
        .collect();
    View {
        player,
        sequence,
        source_trace: None,
    }
}
