//! succinct-2048: a 2048 grid engine with proof receipts and a leaderboard
//!
//! This crate provides:
//! - A plain 4x4 `Grid` with directional shifts, tile spawning and terminal detection (`engine`)
//! - A `Session` state machine that owns one game and publishes events (`session`, `events`)
//! - Replayable binary game records (`trace`)
//! - Proof and leaderboard collaborators plus a background reporting worker (`report`, `reporter`)
//!
//! Quick start:
//! ```
//! use succinct_2048::engine::Direction;
//! use succinct_2048::session::Session;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic session with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut session = Session::new(&mut rng);
//! let outcome = session.apply(Direction::Left, &mut rng);
//! assert!(session.score() >= outcome.gained);
//! ```
//!
//! Full loop with events
//! ```
//! use succinct_2048::engine::Direction;
//! use succinct_2048::events::SessionEvent;
//! use succinct_2048::session::Session;
//! use succinct_2048::trace::{self, Recorder};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let seed = 123;
//! let mut rng = StdRng::seed_from_u64(seed);
//! let mut session = Session::new(&mut rng);
//! let mut recorder = Recorder::new(seed, Some("alice".into()), &session);
//! let mut events: Vec<SessionEvent> = Vec::new();
//!
//! let mut i = 0;
//! while !session.is_terminal() {
//!     let dir = Direction::ALL[i % 4];
//!     session.step(dir, &mut rng, &mut (&mut recorder, &mut events));
//!     i += 1;
//! }
//!
//! // Exactly one terminal notification, and the record replays to the same score.
//! let ends = events.iter().filter(|e| matches!(e, SessionEvent::Terminated { .. })).count();
//! assert_eq!(ends, 1);
//! let replayed = trace::replay(&recorder.finish()).unwrap();
//! assert_eq!(replayed.score(), session.score());
//! ```
//!
pub mod config;
pub mod engine;
pub mod events;
pub mod report;
pub mod reporter;
pub mod rng;
pub mod session;
pub mod trace;
