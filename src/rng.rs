//! Random source for tile spawning.
//!
//! Spawning is the only non-determinism in the game. It needs exactly two
//! decisions: which empty cell, and whether the new tile is a 2 or a 4.
//! Every [`rand::Rng`] satisfies [`TileSource`]; [`ScriptedTiles`] replays a
//! fixed script for tests.

use std::collections::VecDeque;

use rand::Rng;

/// Decisions needed to spawn one tile.
pub trait TileSource {
    /// Pick an index in `0..len`. Callers never pass `len == 0`.
    fn pick_cell(&mut self, len: usize) -> usize;

    /// Return true when the new tile should be a 2 (nine times in ten).
    fn pick_two(&mut self) -> bool;
}

impl<R: Rng + ?Sized> TileSource for R {
    #[inline]
    fn pick_cell(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }

    #[inline]
    fn pick_two(&mut self) -> bool {
        self.gen_range(0..10) < 9
    }
}

/// A deterministic [`TileSource`] that plays back queued answers.
///
/// When a queue runs dry it falls back to cell 0 and a 2.
///
/// ```
/// use succinct_2048::engine::Grid;
/// use succinct_2048::rng::ScriptedTiles;
///
/// let mut tiles = ScriptedTiles::new([5], [false]);
/// let mut grid = Grid::EMPTY;
/// assert_eq!(grid.spawn_tile(&mut tiles), Some((1, 1)));
/// assert_eq!(grid.get(1, 1), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedTiles {
    cells: VecDeque<usize>,
    twos: VecDeque<bool>,
}

impl ScriptedTiles {
    pub fn new(
        cells: impl IntoIterator<Item = usize>,
        twos: impl IntoIterator<Item = bool>,
    ) -> Self {
        Self { cells: cells.into_iter().collect(), twos: twos.into_iter().collect() }
    }

    /// Number of cell picks still queued.
    pub fn remaining_cells(&self) -> usize {
        self.cells.len()
    }
}

impl TileSource for ScriptedTiles {
    fn pick_cell(&mut self, len: usize) -> usize {
        self.cells.pop_front().unwrap_or(0) % len
    }

    fn pick_two(&mut self) -> bool {
        self.twos.pop_front().unwrap_or(true)
    }
}
