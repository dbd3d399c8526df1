//! Engine module: the 4x4 grid, directional shifts, tile spawning and
//! terminal-state detection.
//!
//! - `Grid` is the plain 4x4 state with useful methods.
//! - Free functions mirror the methods when convenient (e.g., `shift`).
//! - Line-level transforms live in `ops` to keep things tidy.

mod ops;
pub mod state;

pub use state::{Direction, Grid, ParseDirectionError, Score, Tile, MAX_TILE, SIZE};

pub use ops::{is_terminal, shift, spawn_tile};
