//! # Grid Placement
//!
//! Deterministic initial positions for new nodes. Real layout is the layout
//! collaborator's job; these slots only keep fresh nodes from overlapping.

use crate::Position;
use crate::primitives::{
    GRID_GAP_X, GRID_GAP_Y, GRID_START_X, GRID_START_Y, MIN_MANUAL_ROW,
};

/// Smallest `r` with `r * r >= n`.
fn ceil_sqrt(n: usize) -> usize {
    let mut r = 0usize;
    while r.saturating_mul(r) < n {
        r = r.saturating_add(1);
    }
    r
}

/// Position of slot `index` in a grid with `per_row` columns.
#[must_use]
pub fn grid_slot(index: usize, per_row: usize) -> Position {
    let per_row = per_row.max(1);
    let col = index % per_row;
    let row = index / per_row;
    Position::new(
        GRID_START_X + col as f64 * GRID_GAP_X,
        GRID_START_Y + row as f64 * GRID_GAP_Y,
    )
}

/// Positions for `count` imported columns, laid out as a near-square grid.
#[must_use]
pub fn import_grid(count: usize) -> Vec<Position> {
    let per_row = ceil_sqrt(count);
    (0..count).map(|i| grid_slot(i, per_row)).collect()
}

/// Slot for a manual node appended after `existing` nodes.
#[must_use]
pub fn next_manual_slot(existing: usize) -> Position {
    let per_row = ceil_sqrt(existing.saturating_add(1)).max(MIN_MANUAL_ROW);
    grid_slot(existing, per_row)
}

// =============================================================================
// TESTS
// =============================================================================
