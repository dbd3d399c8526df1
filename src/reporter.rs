//! Background worker that turns session events into proof requests and
//! leaderboard submissions.
//!
//! Design:
//! - Consumes [`SessionEvent`]s from a channel; the game never waits on it
//! - Each move is proven on its own; failures are reported, never retried
//! - On game over the final score is proven and then submitted
//! - Results go back as [`ReportStatus`] messages for the front end to show

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use crate::engine::{Direction, Score};
use crate::events::SessionEvent;
use crate::report::{
    Leaderboard, ProofReceipt, ProofService, ProveFinalRequest, ProveMoveRequest, SubmitOutcome,
};
use crate::trace::now_unix_seconds;

/// Progress of reporting, mirrored to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    MoveProved { direction: Direction, receipt: ProofReceipt },
    MoveFailed { direction: Direction, reason: String },
    FinalProved { score: Score, receipt: ProofReceipt, outcome: SubmitOutcome },
    /// The proof succeeded but the leaderboard rejected the write.
    SaveFailed { score: Score, receipt: ProofReceipt, reason: String },
    FinalFailed { score: Score, reason: String },
}

impl ReportStatus {
    /// One-line summary suitable for a status bar.
    pub fn summary(&self) -> String {
        match self {
            ReportStatus::MoveProved { receipt, .. } => {
                format!("Move proved! Hash: {}...", receipt.short_hash(16))
            }
            ReportStatus::MoveFailed { .. } => "Move failed".to_string(),
            ReportStatus::FinalProved { receipt, outcome, .. } if outcome.is_new_record() => {
                format!("New personal record! Hash: {}...", receipt.short_hash(8))
            }
            ReportStatus::FinalProved { receipt, .. } => format!(
                "Score verified! Previous record maintained. Hash: {}...",
                receipt.short_hash(8)
            ),
            ReportStatus::SaveFailed { receipt, .. } => {
                format!("Proof completed but save failed. Hash: {}...", receipt.short_hash(8))
            }
            ReportStatus::FinalFailed { .. } => "Final proof failed".to_string(),
        }
    }
}

pub struct Reporter<P, L> {
    username: String,
    prover: P,
    leaderboard: L,
    events: Receiver<SessionEvent>,
    statuses: Option<Sender<ReportStatus>>,
}

/// Handle to a running [`Reporter`] thread.
pub struct ReporterHandle<P, L> {
    handle: JoinHandle<(P, L)>,
}

impl<P, L> ReporterHandle<P, L> {
    /// Wait until the event channel closes and the backlog is drained.
    ///
    /// Returns the collaborators so callers can inspect or reuse them.
    pub fn join(self) -> thread::Result<(P, L)> {
        self.handle.join()
    }
}

impl<P, L> Reporter<P, L>
where
    P: ProofService,
    L: Leaderboard,
{
    pub fn new(
        username: impl Into<String>,
        prover: P,
        leaderboard: L,
        events: Receiver<SessionEvent>,
    ) -> Self {
        Self { username: username.into(), prover, leaderboard, events, statuses: None }
    }

    /// Send progress messages to `statuses`.
    pub fn with_statuses(mut self, statuses: Sender<ReportStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Process events on the current thread until the channel closes.
    pub fn run(mut self) -> (P, L) {
        while let Ok(event) = self.events.recv() {
            self.handle(event);
        }
        debug!("event channel closed; reporter stopping");
        (self.prover, self.leaderboard)
    }

    /// Handle a single event.
    pub fn handle(&mut self, event: SessionEvent) {
        if self.username.trim().is_empty() {
            debug!("no username set; skipping report");
            return;
        }
        match event {
            SessionEvent::Moved { direction, .. } => self.prove_move(direction),
            SessionEvent::Terminated { final_score, .. } => self.prove_final(final_score),
            SessionEvent::Restarted { .. } => {}
        }
    }

    fn prove_move(&mut self, direction: Direction) {
        let request = ProveMoveRequest {
            username: self.username.clone(),
            direction,
            timestamp: now_unix_seconds(),
        };
        let status = match self.prover.prove_move(&request) {
            Ok(receipt) => ReportStatus::MoveProved { direction, receipt },
            Err(e) => {
                warn!("proving {direction} failed: {e}");
                ReportStatus::MoveFailed { direction, reason: e.to_string() }
            }
        };
        self.emit(status);
    }

    fn prove_final(&mut self, score: Score) {
        let request = ProveFinalRequest { username: self.username.clone(), final_point: score };
        let receipt = match self.prover.prove_final(&request) {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("final proof failed: {e}");
                self.emit(ReportStatus::FinalFailed { score, reason: e.to_string() });
                return;
            }
        };
        let status = match self.leaderboard.submit(
            &self.username,
            &receipt.proof_hash,
            score,
            now_unix_seconds(),
        ) {
            Ok(outcome) => {
                info!("final score {score} for {} submitted: {outcome:?}", self.username);
                ReportStatus::FinalProved { score, receipt, outcome }
            }
            Err(e) => {
                warn!("saving final score failed: {e}");
                ReportStatus::SaveFailed { score, receipt, reason: e.to_string() }
            }
        };
        self.emit(status);
    }

    fn emit(&self, status: ReportStatus) {
        if let Some(tx) = &self.statuses {
            if tx.send(status).is_err() {
                debug!("status receiver dropped");
            }
        }
    }
}

impl<P, L> Reporter<P, L>
where
    P: ProofService + Send + 'static,
    L: Leaderboard + Send + 'static,
{
    /// Run on a dedicated thread.
    pub fn spawn(self) -> std::io::Result<ReporterHandle<P, L>> {
        let handle = thread::Builder::new().name("reporter".into()).spawn(move || self.run())?;
        Ok(ReporterHandle { handle })
    }
}
