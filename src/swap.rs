//! Left/right display-position swapping for two-candidate comparisons.
//!
//! Comparative judgments suffer from position bias: annotators grade the
//! left slot differently from the right one. The mitigation is a fair-coin
//! swap of the two candidates' display positions, decided once per row on
//! first display and frozen in the table, so a resumed session reproduces
//! the same ordering.
//!
//! Judgments travel in *slot* space (what the annotator saw) and are stored
//! in *candidate* space (who actually produced the text). For two
//! candidates the mapping is its own inverse, so [`slot_to_candidate`] is
//! used in both directions.

use rand::Rng;

/// Swap state of one row, as frozen in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    /// No assignment yet; the row has never been displayed.
    Undecided,
    /// Candidates display in storage order.
    Straight,
    /// Candidates display exchanged.
    Swapped,
}

impl SwapState {
    /// Parse the stored cell value. Empty means undecided; anything other
    /// than `true` reads as straight.
    #[must_use]
    pub fn parse(cell: &str) -> Self {
        match cell {
            "" => SwapState::Undecided,
            "true" => SwapState::Swapped,
            _ => SwapState::Straight,
        }
    }

    /// Cell value to freeze this state in the table.
    #[must_use]
    pub fn as_cell(&self) -> &'static str {
        match self {
            SwapState::Undecided => "",
            SwapState::Straight => "false",
            SwapState::Swapped => "true",
        }
    }

    /// Whether display order is exchanged.
    #[must_use]
    pub fn is_swapped(&self) -> bool {
        matches!(self, SwapState::Swapped)
    }

    /// Draw a fresh assignment with a fair coin.
    pub fn decide<R: Rng>(rng: &mut R) -> Self {
        if rng.gen::<bool>() {
            SwapState::Swapped
        } else {
            SwapState::Straight
        }
    }
}

/// Map a display slot to the candidate stored at that position (and back:
/// the two-candidate exchange is self-inverse).
///
/// Swapping only ever applies to two-candidate layouts; for any other
/// candidate count the mapping is the identity.
#[must_use]
pub fn slot_to_candidate(slot: usize, swapped: bool, candidates: usize) -> usize {
    if swapped && candidates == 2 && slot < 2 {
        1 - slot
    } else {
        slot
    }
}
