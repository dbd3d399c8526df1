//! One game: a grid, its score and whether it has ended.
//!
//! The session is an explicitly owned value. Front ends read `grid()` and
//! `score()` to render and feed directions back in; nothing else holds game
//! state.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{Direction, Grid, Score};
use crate::events::{EventSink, SessionEvent};
use crate::rng::TileSource;

/// Lifecycle of a session. `Terminal` is left only through a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Terminal,
}

/// What a single move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub direction: Direction,
    /// False for blocked moves and for any move after the game ended.
    pub changed: bool,
    /// Points added by merges in this move.
    pub gained: Score,
    /// Where the new tile landed, if one was spawned.
    pub spawned: Option<(usize, usize)>,
    /// True only for the move that ended the game.
    pub terminated: bool,
}

impl MoveOutcome {
    fn unchanged(direction: Direction) -> Self {
        Self { direction, changed: false, gained: 0, spawned: None, terminated: false }
    }
}

/// A snapshot serializes all three fields, but deserializing recomputes the
/// state from the grid (see [`Session::from_parts`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SessionParts")]
pub struct Session {
    grid: Grid,
    score: Score,
    state: SessionState,
}

#[derive(Deserialize)]
struct SessionParts {
    grid: Grid,
    score: Score,
    // Recomputed on load; read only so older snapshots still parse.
    #[serde(default, rename = "state")]
    _state: Option<SessionState>,
}

impl From<SessionParts> for Session {
    fn from(parts: SessionParts) -> Self {
        Session::from_parts(parts.grid, parts.score)
    }
}

impl Session {
    /// Start a session with two random tiles and a zero score.
    ///
    /// ```
    /// use succinct_2048::session::Session;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let session = Session::new(&mut rng);
    /// assert_eq!(session.grid().count_empty(), 14);
    /// assert_eq!(session.score(), 0);
    /// ```
    pub fn new<T: TileSource + ?Sized>(tiles: &mut T) -> Self {
        let mut session = Self { grid: Grid::EMPTY, score: 0, state: SessionState::Active };
        session.reset(tiles);
        session
    }

    /// Resume from an existing grid and score.
    ///
    /// A grid that already has no moves left yields a terminal session.
    pub fn from_parts(grid: Grid, score: Score) -> Self {
        let state = if grid.is_terminal() { SessionState::Terminal } else { SessionState::Active };
        Self { grid, score, state }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state == SessionState::Terminal
    }

    /// Clear the grid, zero the score and spawn two fresh tiles.
    pub fn reset<T: TileSource + ?Sized>(&mut self, tiles: &mut T) {
        self.grid = Grid::EMPTY;
        self.score = 0;
        self.state = SessionState::Active;
        self.grid.spawn_tile(tiles);
        self.grid.spawn_tile(tiles);
        debug!("session reset");
    }

    /// Apply one move.
    ///
    /// If the grid changes, its merge points are added to the score and
    /// exactly one tile is spawned; the session then becomes terminal if no
    /// move is left. Blocked moves and moves on a terminal session leave
    /// everything untouched.
    ///
    /// ```
    /// use succinct_2048::engine::{Direction, Grid};
    /// use succinct_2048::session::Session;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(1);
    /// let grid = Grid::from_rows([[2, 0, 0, 2], [0; 4], [0; 4], [0; 4]]);
    /// let mut session = Session::from_parts(grid, 0);
    /// let outcome = session.apply(Direction::Left, &mut rng);
    /// assert!(outcome.changed);
    /// assert_eq!(session.score(), 4);
    /// ```
    pub fn apply<T: TileSource + ?Sized>(&mut self, direction: Direction, tiles: &mut T) -> MoveOutcome {
        if self.is_terminal() {
            debug!("ignoring {direction}: session is terminal");
            return MoveOutcome::unchanged(direction);
        }
        let (moved, gained) = self.grid.shift(direction);
        if moved == self.grid {
            debug!("{direction} does not change the grid");
            return MoveOutcome::unchanged(direction);
        }
        self.grid = moved;
        self.score += gained;
        let spawned = self.grid.spawn_tile(tiles);
        let terminated = self.grid.is_terminal();
        if terminated {
            self.state = SessionState::Terminal;
            info!(
                "game over: score {}, highest tile {}",
                self.score,
                self.grid.highest_tile()
            );
        }
        MoveOutcome { direction, changed: true, gained, spawned, terminated }
    }

    /// Apply the move named by `key` (`"ArrowUp"`, `"left"`, `"w"`, ...).
    ///
    /// Unknown keys are a no-op and return `None`.
    pub fn apply_key<T: TileSource + ?Sized>(&mut self, key: &str, tiles: &mut T) -> Option<MoveOutcome> {
        match key.parse::<Direction>() {
            Ok(direction) => Some(self.apply(direction, tiles)),
            Err(e) => {
                debug!("{e}");
                None
            }
        }
    }

    /// [`Session::apply`] plus event publication.
    ///
    /// Publishes `Moved` for every move made while active (changed or not) and
    /// `Terminated` once, right after the move that ended the game.
    pub fn step<T, S>(&mut self, direction: Direction, tiles: &mut T, sink: &mut S) -> MoveOutcome
    where
        T: TileSource + ?Sized,
        S: EventSink + ?Sized,
    {
        if self.is_terminal() {
            return self.apply(direction, tiles);
        }
        let outcome = self.apply(direction, tiles);
        sink.publish(SessionEvent::Moved {
            direction,
            grid: self.grid,
            score: self.score,
            changed: outcome.changed,
        });
        if outcome.terminated {
            sink.publish(SessionEvent::Terminated {
                final_score: self.score,
                highest_tile: self.grid.highest_tile(),
            });
        }
        outcome
    }

    /// [`Session::reset`] plus a `Restarted` event.
    pub fn restart<T, S>(&mut self, tiles: &mut T, sink: &mut S)
    where
        T: TileSource + ?Sized,
        S: EventSink + ?Sized,
    {
        self.reset(tiles);
        sink.publish(SessionEvent::Restarted { grid: self.grid });
    }
}
