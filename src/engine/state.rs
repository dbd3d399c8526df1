use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ops;
use crate::rng::TileSource;

/// Value of a single cell. `0` is empty, anything else is a power of two.
pub type Tile = u32;
/// Points accumulated from merges.
pub type Score = u64;

/// Side length of the square grid.
pub const SIZE: usize = 4;

/// Largest tile reachable on a 4x4 grid when every spawn is a 4.
pub const MAX_TILE: Tile = 1 << 17;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions in byte-code order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Lowercase name used in proof requests (`"up"`, `"down"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Stable byte code used by game records.
    #[inline]
    pub fn to_u8(self) -> u8 {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Inverse of [`Direction::to_u8`].
    #[inline]
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a key name does not map to any direction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("not a direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    /// Accepts browser key names (`ArrowUp`), plain names (`up`), WASD and vi keys.
    ///
    /// ```
    /// use succinct_2048::engine::Direction;
    /// assert_eq!("ArrowLeft".parse::<Direction>(), Ok(Direction::Left));
    /// assert_eq!("W".parse::<Direction>(), Ok(Direction::Up));
    /// assert!("Enter".parse::<Direction>().is_err());
    /// ```
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key.trim().to_ascii_lowercase().as_str() {
            "arrowup" | "up" | "w" | "k" => Ok(Direction::Up),
            "arrowdown" | "down" | "s" | "j" => Ok(Direction::Down),
            "arrowleft" | "left" | "a" | "h" => Ok(Direction::Left),
            "arrowright" | "right" | "d" | "l" => Ok(Direction::Right),
            _ => Err(ParseDirectionError(key.to_string())),
        }
    }
}

/// The 4x4 playing field, row-major.
///
/// The grid is a plain `Copy` value: operations return new grids (`shift`) or
/// mutate in place (`spawn_tile`) and never allocate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Grid([[Tile; SIZE]; SIZE]);

impl Grid {
    /// A constant empty grid (all zeros).
    pub const EMPTY: Grid = Grid([[0; SIZE]; SIZE]);

    /// Build a grid from rows. Values are taken as-is.
    #[inline]
    pub const fn from_rows(rows: [[Tile; SIZE]; SIZE]) -> Self {
        Grid(rows)
    }

    /// Borrow the rows.
    #[inline]
    pub fn rows(&self) -> &[[Tile; SIZE]; SIZE] {
        &self.0
    }

    /// Consume the grid, returning its rows.
    #[inline]
    pub fn into_rows(self) -> [[Tile; SIZE]; SIZE] {
        self.0
    }

    /// Value at (`row`, `col`). Panics when out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Tile {
        self.0[row][col]
    }

    /// Set the value at (`row`, `col`). Panics when out of range.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Tile) {
        self.0[row][col] = value;
    }

    /// Iterate all cells row-major.
    pub fn cells(&self) -> impl Iterator<Item = Tile> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    /// Return the grid resulting from sliding/merging tiles in `dir` (no random
    /// insert), together with the points scored by the merges.
    ///
    /// ```
    /// use succinct_2048::engine::{Direction, Grid};
    /// let g = Grid::from_rows([[2, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
    /// let (moved, gained) = g.shift(Direction::Left);
    /// assert_eq!(moved.rows()[0], [4, 4, 0, 0]);
    /// assert_eq!(gained, 8);
    /// ```
    #[inline]
    pub fn shift(self, dir: Direction) -> (Self, Score) {
        ops::shift(self, dir)
    }

    /// Put a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
    ///
    /// Returns the chosen position, or `None` when the grid is full.
    #[inline]
    pub fn spawn_tile<T: TileSource + ?Sized>(&mut self, tiles: &mut T) -> Option<(usize, usize)> {
        ops::spawn_tile(self, tiles)
    }

    /// True when the grid is full and no two neighbors are equal.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        ops::is_terminal(self)
    }

    /// Count the number of empty cells.
    #[inline]
    pub fn count_empty(&self) -> usize {
        self.cells().filter(|&v| v == 0).count()
    }

    /// Return the highest tile value present (0 for an empty grid).
    #[inline]
    pub fn highest_tile(&self) -> Tile {
        self.cells().max().unwrap_or(0)
    }

    /// True when every non-zero cell holds a power of two in `2..=MAX_TILE`.
    pub fn is_well_formed(&self) -> bool {
        self.cells().all(|v| v == 0 || (v.is_power_of_two() && (2..=MAX_TILE).contains(&v)))
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Grid").field(&self.0).finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, row) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f, "{}", "-".repeat(32))?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl From<[[Tile; SIZE]; SIZE]> for Grid {
    fn from(rows: [[Tile; SIZE]; SIZE]) -> Self {
        Grid::from_rows(rows)
    }
}

fn format_val(val: Tile) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_codes_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_u8(dir.to_u8()), Some(dir));
        }
        assert_eq!(Direction::from_u8(4), None);
    }

    #[test]
    fn parse_key_names() {
        assert_eq!("ArrowUp".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("arrowdown".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!(" left ".parse::<Direction>(), Ok(Direction::Left));
        assert_eq!("D".parse::<Direction>(), Ok(Direction::Right));
        assert_eq!("j".parse::<Direction>(), Ok(Direction::Down));
        assert_eq!(
            "Escape".parse::<Direction>(),
            Err(ParseDirectionError("Escape".to_string()))
        );
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Right).unwrap(), "\"right\"");
    }

    #[test]
    fn counts_and_highest() {
        let g = Grid::from_rows([[2, 0, 0, 0], [0, 8, 0, 0], [0, 0, 0, 0], [0, 0, 0, 1024]]);
        assert_eq!(g.count_empty(), 13);
        assert_eq!(g.highest_tile(), 1024);
        assert_eq!(Grid::EMPTY.highest_tile(), 0);
        assert!(g.is_well_formed());
        assert!(!Grid::from_rows([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_well_formed());
        assert!(!Grid::from_rows([[1, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_well_formed());
        assert!(Grid::from_rows([[MAX_TILE, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_well_formed());
        assert!(!Grid::from_rows([[MAX_TILE * 2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_well_formed());
    }

    #[test]
    fn display_has_four_rows() {
        let g = Grid::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2048]]);
        let text = g.to_string();
        assert_eq!(text.lines().count(), 7);
        assert!(text.contains("2048"));
    }
}
