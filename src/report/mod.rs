//! Reporting collaborators: proof receipts and the leaderboard.
//!
//! Nothing here touches game state. A [`ProofService`] turns a move or a final
//! score into an opaque [`ProofReceipt`]; a [`Leaderboard`] stores each
//! player's best proven score.

mod digest;
mod memory;
mod sqlite;

pub use digest::DigestProver;
pub use memory::MemoryLeaderboard;
pub use sqlite::SqliteLeaderboard;

use serde::{Deserialize, Serialize};

use crate::engine::{Direction, Score};

/// Default number of rows shown by a ranking view.
pub const DEFAULT_TOP_LIMIT: usize = 50;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("proof service failed: {0}")]
    Proof(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{field} {value} does not fit in a database integer")]
    OutOfRange { field: &'static str, value: u64 },
}

/// Body of a per-move proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveMoveRequest {
    pub username: String,
    pub direction: Direction,
    /// Unix seconds at which the move was made.
    pub timestamp: u64,
}

/// Body of a final-score proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveFinalRequest {
    pub username: String,
    pub final_point: Score,
}

/// Opaque answer of a proof service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReceipt {
    pub proof_hash: String,
}

impl ProofReceipt {
    /// First `len` characters of the hash, for display.
    pub fn short_hash(&self, len: usize) -> &str {
        match self.proof_hash.char_indices().nth(len) {
            Some((end, _)) => &self.proof_hash[..end],
            None => &self.proof_hash,
        }
    }
}

pub trait ProofService {
    fn prove_move(&mut self, request: &ProveMoveRequest) -> Result<ProofReceipt, ReportError>;
    fn prove_final(&mut self, request: &ProveFinalRequest) -> Result<ProofReceipt, ReportError>;
}

impl<P: ProofService + ?Sized> ProofService for Box<P> {
    fn prove_move(&mut self, request: &ProveMoveRequest) -> Result<ProofReceipt, ReportError> {
        (**self).prove_move(request)
    }

    fn prove_final(&mut self, request: &ProveFinalRequest) -> Result<ProofReceipt, ReportError> {
        (**self).prove_final(request)
    }
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub proof_hash: String,
    pub top_score: Score,
    /// Unix seconds of the submission that set `top_score`.
    pub created_at: u64,
}

/// Result of a leaderboard submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// First entry for this player.
    Created,
    /// Replaced a lower score.
    Improved { previous: Score },
    /// Existing score was equal or higher and was kept.
    Kept { best: Score },
}

impl SubmitOutcome {
    pub fn is_new_record(&self) -> bool {
        !matches!(self, SubmitOutcome::Kept { .. })
    }
}

/// Persistent ranking of each player's best score.
///
/// Implementations keep one entry per player and replace it only when a
/// strictly higher score arrives.
pub trait Leaderboard {
    fn submit(
        &mut self,
        username: &str,
        proof_hash: &str,
        score: Score,
        at_unix_s: u64,
    ) -> Result<SubmitOutcome, ReportError>;

    fn best(&self, username: &str) -> Result<Option<LeaderboardEntry>, ReportError>;

    /// Highest scores first; ties go to the earlier submission, then by name.
    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ReportError>;
}

impl<L: Leaderboard + ?Sized> Leaderboard for Box<L> {
    fn submit(
        &mut self,
        username: &str,
        proof_hash: &str,
        score: Score,
        at_unix_s: u64,
    ) -> Result<SubmitOutcome, ReportError> {
        (**self).submit(username, proof_hash, score, at_unix_s)
    }

    fn best(&self, username: &str) -> Result<Option<LeaderboardEntry>, ReportError> {
        (**self).best(username)
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ReportError> {
        (**self).top(limit)
    }
}

pub(crate) fn normalize_username(username: &str) -> Result<&str, ReportError> {
    let name = username.trim();
    if name.is_empty() {
        Err(ReportError::EmptyUsername)
    } else {
        Ok(name)
    }
}

/// Keep-the-best policy shared by every leaderboard.
pub(crate) fn decide(existing: Option<Score>, score: Score) -> SubmitOutcome {
    match existing {
        None => SubmitOutcome::Created,
        Some(previous) if score > previous => SubmitOutcome::Improved { previous },
        Some(best) => SubmitOutcome::Kept { best },
    }
}
