use std::collections::HashMap;

use crate::engine::Score;

use super::{decide, normalize_username, Leaderboard, LeaderboardEntry, ReportError, SubmitOutcome};

/// In-process leaderboard, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaderboard {
    entries: HashMap<String, LeaderboardEntry>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Leaderboard for MemoryLeaderboard {
    fn submit(
        &mut self,
        username: &str,
        proof_hash: &str,
        score: Score,
        at_unix_s: u64,
    ) -> Result<SubmitOutcome, ReportError> {
        let name = normalize_username(username)?;
        let outcome = decide(self.entries.get(name).map(|e| e.top_score), score);
        if outcome.is_new_record() {
            self.entries.insert(
                name.to_string(),
                LeaderboardEntry {
                    username: name.to_string(),
                    proof_hash: proof_hash.to_string(),
                    top_score: score,
                    created_at: at_unix_s,
                },
            );
        }
        Ok(outcome)
    }

    fn best(&self, username: &str) -> Result<Option<LeaderboardEntry>, ReportError> {
        Ok(self.entries.get(username.trim()).cloned())
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ReportError> {
        let mut rows: Vec<LeaderboardEntry> = self.entries.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.top_score
                .cmp(&a.top_score)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.username.cmp(&b.username))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
