//! Session events and the sinks that receive them.
//!
//! A [`Session`](crate::session::Session) publishes one [`SessionEvent::Moved`]
//! per accepted move and exactly one [`SessionEvent::Terminated`] when the game
//! ends. Sinks never feed back into the session, so slow or failing consumers
//! (proof requests, persistence) cannot stall play.

use crossbeam_channel::Sender;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::{Direction, Grid, Score, Tile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A direction was applied while the session was active.
    Moved { direction: Direction, grid: Grid, score: Score, changed: bool },
    /// The session just became terminal.
    Terminated { final_score: Score, highest_tile: Tile },
    /// The session was reset to a fresh two-tile grid.
    Restarted { grid: Grid },
}

/// Receiver of session events.
pub trait EventSink {
    fn publish(&mut self, event: SessionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: SessionEvent) {}
}

impl EventSink for Vec<SessionEvent> {
    fn publish(&mut self, event: SessionEvent) {
        self.push(event);
    }
}

/// Fire-and-forget delivery to another thread.
impl EventSink for Sender<SessionEvent> {
    fn publish(&mut self, event: SessionEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped; event discarded");
        }
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, event: SessionEvent) {
        (**self).publish(event);
    }
}

/// `None` discards events.
impl<S: EventSink> EventSink for Option<S> {
    fn publish(&mut self, event: SessionEvent) {
        if let Some(sink) = self {
            sink.publish(event);
        }
    }
}

/// Fan out to two sinks, first then second.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn publish(&mut self, event: SessionEvent) {
        self.0.publish(event.clone());
        self.1.publish(event);
    }
}
