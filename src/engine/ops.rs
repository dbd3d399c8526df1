use log::debug;

use super::state::{Direction, Grid, Score, Tile, SIZE};
use crate::rng::TileSource;

pub(crate) type Line = [Tile; SIZE];

/// Slide/merge tiles in the given direction. No randomness.
///
/// Returns the new grid and the points scored by this move's merges.
pub fn shift(grid: Grid, direction: Direction) -> (Grid, Score) {
    // Right and down slide toward the far end of the line.
    let reversed = matches!(direction, Direction::Right | Direction::Down);
    match direction {
        Direction::Left | Direction::Right => shift_rows(grid, reversed),
        Direction::Up | Direction::Down => shift_cols(grid, reversed),
    }
}

/// Insert a random 2 (90%) or 4 (10%) tile into a random empty cell.
///
/// Empty cells are enumerated row-major and one is picked uniformly.
pub fn spawn_tile<T: TileSource + ?Sized>(grid: &mut Grid, tiles: &mut T) -> Option<(usize, usize)> {
    let empty: Vec<(usize, usize)> = (0..SIZE)
        .flat_map(|row| (0..SIZE).map(move |col| (row, col)))
        .filter(|&(row, col)| grid.get(row, col) == 0)
        .collect();
    if empty.is_empty() {
        return None;
    }
    // Clamp so a misbehaving source can never index out of bounds.
    let idx = tiles.pick_cell(empty.len()).min(empty.len() - 1);
    let (row, col) = empty[idx];
    let value = generate_random_tile(tiles);
    grid.set(row, col, value);
    debug!("spawned {value} at ({row}, {col})");
    Some((row, col))
}

/// True if the grid is full and no cell equals its right or bottom neighbor.
///
/// Equality is symmetric, so checking right/bottom from every cell covers
/// left/top as well.
pub fn is_terminal(grid: &Grid) -> bool {
    for row in 0..SIZE {
        for col in 0..SIZE {
            let val = grid.get(row, col);
            if val == 0 {
                return false;
            }
            if col + 1 < SIZE && mergeable(val, grid.get(row, col + 1)) {
                return false;
            }
            if row + 1 < SIZE && mergeable(val, grid.get(row + 1, col)) {
                return false;
            }
        }
    }
    true
}

/// Compress, merge, compress a single line toward index 0.
pub(crate) fn slide_line(line: Line) -> (Line, Score) {
    let mut line = compress(line);
    let gained = merge(&mut line);
    (compress(line), gained)
}

fn generate_random_tile<T: TileSource + ?Sized>(tiles: &mut T) -> Tile {
    if tiles.pick_two() {
        2
    } else {
        4
    }
}

fn shift_rows(grid: Grid, reversed: bool) -> (Grid, Score) {
    let mut rows = grid.into_rows();
    let mut score = 0;
    for row in rows.iter_mut() {
        let (line, gained) = slide_oriented(*row, reversed);
        *row = line;
        score += gained;
    }
    (Grid::from_rows(rows), score)
}

fn shift_cols(grid: Grid, reversed: bool) -> (Grid, Score) {
    let mut rows = grid.into_rows();
    let mut score = 0;
    for col in 0..SIZE {
        let column: Line = [rows[0][col], rows[1][col], rows[2][col], rows[3][col]];
        let (line, gained) = slide_oriented(column, reversed);
        for (row, &val) in line.iter().enumerate() {
            rows[row][col] = val;
        }
        score += gained;
    }
    (Grid::from_rows(rows), score)
}

fn slide_oriented(mut line: Line, reversed: bool) -> (Line, Score) {
    if reversed {
        line.reverse();
    }
    let (mut out, gained) = slide_line(line);
    if reversed {
        out.reverse();
    }
    (out, gained)
}

fn compress(line: Line) -> Line {
    let mut out = [0; SIZE];
    for (slot, val) in out.iter_mut().zip(line.into_iter().filter(|&v| v != 0)) {
        *slot = val;
    }
    out
}

#[inline]
fn mergeable(a: Tile, b: Tile) -> bool {
    a != 0 && a == b && a.checked_mul(2).is_some()
}

// A merged cell leaves a zero behind, so it cannot merge again in this pass.
// Pairs whose sum does not fit in a tile stay put.
fn merge(line: &mut Line) -> Score {
    let mut score: Score = 0;
    for i in 0..SIZE - 1 {
        if !mergeable(line[i], line[i + 1]) {
            continue;
        }
        let Some(merged) = line[i].checked_mul(2) else { continue };
        line[i] = merged;
        score = score.saturating_add(Score::from(merged));
        line[i + 1] = 0;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedTiles;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn it_slide_line() {
        assert_eq!(slide_line([0, 0, 0, 0]), ([0, 0, 0, 0], 0));
        assert_eq!(slide_line([2, 4, 2, 4]), ([2, 4, 2, 4], 0));
        assert_eq!(slide_line([2, 2, 4, 4]), ([4, 8, 0, 0], 12));
        assert_eq!(slide_line([2, 0, 0, 2]), ([4, 0, 0, 0], 4));
        assert_eq!(slide_line([0, 4, 4, 4]), ([8, 4, 0, 0], 8));
        assert_eq!(slide_line([4, 4, 8, 0]), ([8, 8, 0, 0], 8));
    }

    #[test]
    fn merged_tile_does_not_merge_again() {
        assert_eq!(slide_line([2, 2, 2, 2]), ([4, 4, 0, 0], 8));
        assert_eq!(slide_line([2, 2, 4, 0]), ([4, 4, 0, 0], 4));
    }

    #[test]
    fn tiles_too_large_to_double_stay_put() {
        let top: Tile = 1 << 31;
        assert_eq!(slide_line([top, top, 0, 0]), ([top, top, 0, 0], 0));
        assert_eq!(slide_line([0, top, top, 2]), ([top, top, 2, 0], 0));
        let mut rows = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];
        rows[0][0] = top;
        rows[0][1] = top;
        assert!(is_terminal(&Grid::from_rows(rows)));
    }

    #[test]
    fn test_shift_left() {
        let grid = Grid::from_rows([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let (moved, score) = shift(grid, Direction::Left);
        assert_eq!(
            moved,
            Grid::from_rows([[2, 4, 8, 16], [2, 16, 4, 0], [8, 0, 0, 0], [2, 4, 0, 0]])
        );
        assert_eq!(score, 16 + 8);
    }

    #[test]
    fn test_shift_right() {
        let grid = Grid::from_rows([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let (moved, score) = shift(grid, Direction::Right);
        assert_eq!(
            moved,
            Grid::from_rows([[2, 4, 8, 16], [0, 2, 16, 4], [0, 0, 0, 8], [0, 0, 2, 4]])
        );
        assert_eq!(score, 16 + 8);
    }

    #[test]
    fn test_shift_right_merges_far_pair_first() {
        let grid = Grid::from_rows([[0, 2, 2, 2], [0; 4], [0; 4], [0; 4]]);
        let (moved, score) = shift(grid, Direction::Right);
        assert_eq!(moved.rows()[0], [0, 0, 2, 4]);
        assert_eq!(score, 4);
    }

    #[test]
    fn test_shift_up() {
        let grid = Grid::from_rows([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let (moved, score) = shift(grid, Direction::Up);
        assert_eq!(
            moved,
            Grid::from_rows([[2, 2, 8, 2], [4, 16, 0, 4], [8, 4, 0, 0], [16, 0, 0, 0]])
        );
        assert_eq!(score, 16 + 8);
    }

    #[test]
    fn test_shift_down() {
        let grid = Grid::from_rows([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let (moved, score) = shift(grid, Direction::Down);
        assert_eq!(
            moved,
            Grid::from_rows([[2, 0, 0, 0], [4, 2, 0, 0], [8, 16, 0, 2], [16, 4, 8, 4]])
        );
        assert_eq!(score, 16 + 8);
    }

    #[test]
    fn shift_does_not_change_blocked_grid() {
        let grid = Grid::from_rows([[2, 4, 0, 0], [4, 2, 0, 0], [0; 4], [0; 4]]);
        assert_eq!(shift(grid, Direction::Left), (grid, 0));
        assert_eq!(shift(grid, Direction::Up), (grid, 0));
        assert_ne!(shift(grid, Direction::Right).0, grid);
        assert_ne!(shift(grid, Direction::Down).0, grid);
    }

    #[test]
    fn spawn_fills_chosen_empty_cell() {
        let mut grid = Grid::from_rows([[2, 0, 2, 0], [2; 4], [2; 4], [2; 4]]);
        // Empty cells are (0,1) and (0,3); pick the second one and a 4.
        let mut tiles = ScriptedTiles::new([1], [false]);
        assert_eq!(spawn_tile(&mut grid, &mut tiles), Some((0, 3)));
        assert_eq!(grid.rows()[0], [2, 0, 2, 4]);
    }

    #[test]
    fn spawn_on_full_grid_is_noop() {
        let mut grid = Grid::from_rows([[2; 4]; 4]);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(spawn_tile(&mut grid, &mut rng), None);
        assert_eq!(grid, Grid::from_rows([[2; 4]; 4]));
    }

    #[test]
    fn it_spawn_until_full() {
        let mut grid = Grid::EMPTY;
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..16 {
            assert!(spawn_tile(&mut grid, &mut rng).is_some());
        }
        assert_eq!(grid.count_empty(), 0);
        assert!(grid.cells().all(|v| v == 2 || v == 4));
    }

    #[test]
    fn checkerboard_is_terminal() {
        let grid = Grid::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(is_terminal(&grid));
        for dir in Direction::ALL {
            assert_eq!(shift(grid, dir), (grid, 0));
        }
    }

    #[test]
    fn removing_any_cell_breaks_terminal() {
        let grid = Grid::from_rows([[2, 4, 8, 16], [32, 64, 128, 256], [2, 4, 8, 16], [32, 64, 128, 256]]);
        assert!(is_terminal(&grid));
        for row in 0..SIZE {
            for col in 0..SIZE {
                let mut holed = grid;
                holed.set(row, col, 0);
                assert!(!is_terminal(&holed), "hole at ({row}, {col})");
            }
        }
    }

    #[test]
    fn equal_neighbors_break_terminal() {
        // Only the last column has an equal vertical pair.
        let vertical = Grid::from_rows([[2, 4, 2, 8], [4, 2, 4, 8], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(!is_terminal(&vertical));
        // Only the last row has an equal horizontal pair.
        let horizontal = Grid::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 16, 16]]);
        assert!(!is_terminal(&horizontal));
    }

    #[test]
    fn terminal_matches_move_availability() {
        let mut rng = StdRng::seed_from_u64(2048);
        for _ in 0..200 {
            let mut grid = Grid::EMPTY;
            spawn_tile(&mut grid, &mut rng);
            spawn_tile(&mut grid, &mut rng);
            for step in 0..400 {
                let movable = Direction::ALL.iter().any(|&d| shift(grid, d).0 != grid);
                assert_eq!(is_terminal(&grid), !movable, "disagreement on {grid:?}");
                if !movable {
                    break;
                }
                let dir = Direction::ALL[step % 4];
                let (moved, _) = shift(grid, dir);
                if moved != grid {
                    grid = moved;
                    spawn_tile(&mut grid, &mut rng);
                }
            }
        }
    }
}
