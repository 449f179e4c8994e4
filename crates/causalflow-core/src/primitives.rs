//! # Workbench Primitives
//!
//! Hardcoded constants shared by the core.

/// Minimum number of states for a node to be usable.
pub const MIN_STATES: usize = 2;

/// Absolute tolerance when checking that a prior sums to 1.
pub const PRIOR_TOLERANCE: f64 = 0.05;

/// Lifetime of a notification, in milliseconds.
pub const NOTIFICATION_TTL_MS: u64 = 3000;

/// Grid origin (x) for automatically placed nodes.
pub const GRID_START_X: f64 = 50.0;

/// Grid origin (y) for automatically placed nodes.
pub const GRID_START_Y: f64 = 50.0;

/// Horizontal distance between grid slots.
pub const GRID_GAP_X: f64 = 200.0;

/// Vertical distance between grid slots.
pub const GRID_GAP_Y: f64 = 120.0;

/// Minimum columns per grid row when placing manual nodes.
pub const MIN_MANUAL_ROW: usize = 2;
