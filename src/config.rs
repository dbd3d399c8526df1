//! Front-end configuration, read from TOML.
//!
//! ```toml
//! username = "alice"
//! seed = 42
//!
//! [leaderboard]
//! path = "leaderboard.db"
//! limit = 50
//!
//! [trace]
//! dir = "runs"
//!
//! [report]
//! enabled = true
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Player handle used for proofs and the leaderboard.
    #[serde(default)]
    pub username: Option<String>,

    /// Fixed seed for the first game; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardConfig {
    /// SQLite file. Without it the leaderboard lives in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "defaults::limit")]
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Directory for finished game records.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { path: None, limit: defaults::limit() }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: defaults::enabled() }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// The configured username, if it is not blank.
    pub fn player(&self) -> Option<&str> {
        self.username.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }
}

mod defaults {
    use crate::report::DEFAULT_TOP_LIMIT;

    pub fn limit() -> usize { DEFAULT_TOP_LIMIT }
    pub fn enabled() -> bool { true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.leaderboard.limit, 50);
        assert!(cfg.report.enabled);
        assert_eq!(cfg.player(), None);
    }

    #[test]
    fn reads_all_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            username = " alice "
            seed = 42

            [leaderboard]
            path = "scores/leaderboard.db"
            limit = 10

            [trace]
            dir = "runs"

            [report]
            enabled = false
            "#
        )
        .unwrap();
        let cfg = Config::from_toml(file.path()).unwrap();
        assert_eq!(cfg.player(), Some("alice"));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.leaderboard.path, Some(PathBuf::from("scores/leaderboard.db")));
        assert_eq!(cfg.leaderboard.limit, 10);
        assert_eq!(cfg.trace.dir, Some(PathBuf::from("runs")));
        assert!(!cfg.report.enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(Config::from_toml_str("colour = \"pink\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::from_toml("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
