use std::path::Path;

use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::engine::Score;

use super::{decide, normalize_username, Leaderboard, LeaderboardEntry, ReportError, SubmitOutcome};

/// Leaderboard stored in a SQLite file.
///
/// Schema:
/// - succinct2048(id INTEGER PRIMARY KEY, username TEXT UNIQUE, proof_hash TEXT,
///   top_score INTEGER, created_at INTEGER)
pub struct SqliteLeaderboard {
    conn: Connection,
}

impl SqliteLeaderboard {
    /// Create or open the database at `path`, ensuring the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    /// A throwaway database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, ReportError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ReportError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS succinct2048 (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                proof_hash TEXT NOT NULL,
                top_score INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS succinct2048_by_score
                ON succinct2048 (top_score DESC, created_at ASC);
            "#,
        )?;
        Ok(Self { conn })
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        username: row.get(0)?,
        proof_hash: row.get(1)?,
        top_score: column_u64(row, 2)?,
        created_at: column_u64(row, 3)?,
    })
}

fn column_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

// SQLite integers are signed 64-bit.
fn to_db_int(field: &'static str, value: u64) -> Result<i64, ReportError> {
    i64::try_from(value).map_err(|_| ReportError::OutOfRange { field, value })
}

impl Leaderboard for SqliteLeaderboard {
    fn submit(
        &mut self,
        username: &str,
        proof_hash: &str,
        score: Score,
        at_unix_s: u64,
    ) -> Result<SubmitOutcome, ReportError> {
        let name = normalize_username(username)?;
        let db_score = to_db_int("score", score)?;
        let db_at = to_db_int("timestamp", at_unix_s)?;
        let tx = self.conn.transaction()?;
        let existing: Option<Score> = tx
            .query_row(
                "SELECT top_score FROM succinct2048 WHERE username = ?1",
                params![name],
                |r| column_u64(r, 0),
            )
            .optional()?;
        let outcome = decide(existing, score);
        match outcome {
            SubmitOutcome::Created => {
                tx.execute(
                    "INSERT INTO succinct2048 (username, proof_hash, top_score, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![name, proof_hash, db_score, db_at],
                )?;
            }
            SubmitOutcome::Improved { .. } => {
                tx.execute(
                    "UPDATE succinct2048 SET proof_hash = ?2, top_score = ?3, created_at = ?4
                     WHERE username = ?1",
                    params![name, proof_hash, db_score, db_at],
                )?;
            }
            SubmitOutcome::Kept { .. } => {}
        }
        tx.commit()?;
        info!("leaderboard submit for {name}: {score} -> {outcome:?}");
        Ok(outcome)
    }

    fn best(&self, username: &str) -> Result<Option<LeaderboardEntry>, ReportError> {
        let entry = self
            .conn
            .query_row(
                "SELECT username, proof_hash, top_score, created_at FROM succinct2048
                 WHERE username = ?1",
                params![username.trim()],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ReportError> {
        let mut stmt = self.conn.prepare(
            "SELECT username, proof_hash, top_score, created_at FROM succinct2048
             ORDER BY top_score DESC, created_at ASC, username ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn persists_best_score_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("leaderboard.db");
        {
            let mut board = SqliteLeaderboard::open(&path).unwrap();
            assert_eq!(board.submit("alice", "h1", 256, 100).unwrap(), SubmitOutcome::Created);
            assert_eq!(
                board.submit("alice", "h2", 1024, 200).unwrap(),
                SubmitOutcome::Improved { previous: 256 }
            );
        }
        let board = SqliteLeaderboard::open(&path).unwrap();
        let best = board.best("alice").unwrap().unwrap();
        assert_eq!(
            best,
            LeaderboardEntry {
                username: "alice".into(),
                proof_hash: "h2".into(),
                top_score: 1024,
                created_at: 200
            }
        );
    }

    #[test]
    fn lower_or_equal_score_is_kept() {
        let mut board = SqliteLeaderboard::open_in_memory().unwrap();
        board.submit("bob", "first", 800, 1).unwrap();
        assert_eq!(board.submit("bob", "second", 800, 2).unwrap(), SubmitOutcome::Kept { best: 800 });
        assert_eq!(board.submit("bob", "third", 12, 3).unwrap(), SubmitOutcome::Kept { best: 800 });
        let best = board.best("bob").unwrap().unwrap();
        assert_eq!((best.proof_hash.as_str(), best.created_at), ("first", 1));
    }

    #[test]
    fn top_is_ordered_and_limited() {
        let mut board = SqliteLeaderboard::open_in_memory().unwrap();
        board.submit("carol", "c", 100, 5).unwrap();
        board.submit("bob", "b", 400, 9).unwrap();
        board.submit("alice", "a", 400, 3).unwrap();
        board.submit("dave", "d", 50, 1).unwrap();
        let top = board.top(3).unwrap();
        let names: Vec<&str> = top.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
        assert!(board.top(0).unwrap().is_empty());
        assert_eq!(board.best("nobody").unwrap(), None);
    }

    #[test]
    fn rejects_values_beyond_sqlite_integers() {
        let mut board = SqliteLeaderboard::open_in_memory().unwrap();
        assert!(matches!(
            board.submit("frank", "f", u64::MAX, 1),
            Err(ReportError::OutOfRange { field: "score", value: u64::MAX })
        ));
        assert!(matches!(
            board.submit("frank", "f", 8, 1 << 63),
            Err(ReportError::OutOfRange { field: "timestamp", .. })
        ));
        assert_eq!(board.best("frank").unwrap(), None);
        board.submit("frank", "f", i64::MAX as u64, 1).unwrap();
        assert_eq!(board.best("frank").unwrap().unwrap().top_score, i64::MAX as u64);
    }

    #[test]
    fn trims_and_rejects_usernames() {
        let mut board = SqliteLeaderboard::open_in_memory().unwrap();
        board.submit("  erin ", "e", 64, 1).unwrap();
        assert!(board.best("erin").unwrap().is_some());
        assert!(matches!(board.submit("", "x", 1, 1), Err(ReportError::EmptyUsername)));
    }
}
