use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver, Sender};
use env_logger::Env;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use succinct_2048::config::Config;
use succinct_2048::engine::Direction;
use succinct_2048::events::SessionEvent;
use succinct_2048::report::{
    DigestProver, Leaderboard, MemoryLeaderboard, ProofService, SqliteLeaderboard,
};
use succinct_2048::reporter::{ReportStatus, Reporter, ReporterHandle};
use succinct_2048::session::Session;
use succinct_2048::trace::{self, Recorder};

type BoxedProver = Box<dyn ProofService + Send>;
type BoxedLeaderboard = Box<dyn Leaderboard + Send>;

#[derive(Parser, Debug)]
#[command(
    name = "succinct-2048",
    version,
    about = "Play 2048 in the terminal, prove final scores and rank them"
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play interactively. Enter moves (w/a/s/d, up/down/left/right), `r` to restart, `q` to quit
    Play {
        /// Player handle for proofs and the leaderboard
        #[arg(short, long)]
        username: Option<String>,
        /// Seed for the first game
        #[arg(long)]
        seed: Option<u64>,
        /// Leaderboard database (SQLite)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
        /// Do not prove moves or submit the final score
        #[arg(long)]
        no_submit: bool,
    },
    /// Print the top scores
    Leaderboard {
        /// Leaderboard database (SQLite)
        #[arg(long, value_name = "FILE")]
        db: Option<PathBuf>,
        /// Number of rows to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Replay a game record and check its final score
    Verify {
        /// Record written by `play`
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_toml(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.cmd {
        Command::Play { username, seed, db, no_submit } => {
            let username = username
                .filter(|name| !name.trim().is_empty())
                .or_else(|| config.player().map(str::to_string));
            let db = db.or_else(|| config.leaderboard.path.clone());
            let submit = config.report.enabled && !no_submit;
            play(&config, username, seed.or(config.seed), db.as_deref(), submit)
        }
        Command::Leaderboard { db, limit } => {
            let Some(db) = db.or_else(|| config.leaderboard.path.clone()) else {
                bail!("no leaderboard database; pass --db or set [leaderboard] path");
            };
            show_leaderboard(&db, limit.unwrap_or(config.leaderboard.limit))
        }
        Command::Verify { path } => verify(&path),
    }
}

fn open_leaderboard(db: Option<&Path>) -> Result<BoxedLeaderboard> {
    Ok(match db {
        Some(path) => Box::new(
            SqliteLeaderboard::open(path)
                .with_context(|| format!("opening leaderboard {}", path.display()))?,
        ),
        None => Box::new(MemoryLeaderboard::new()),
    })
}

struct ReportLink {
    events: Sender<SessionEvent>,
    statuses: Receiver<ReportStatus>,
    handle: ReporterHandle<BoxedProver, BoxedLeaderboard>,
}

fn start_reporter(username: &str, db: Option<&Path>) -> Result<ReportLink> {
    let prover: BoxedProver = Box::new(DigestProver::new());
    let leaderboard = open_leaderboard(db)?;
    let (event_tx, event_rx) = unbounded();
    let (status_tx, status_rx) = unbounded();
    let handle = Reporter::new(username, prover, leaderboard, event_rx)
        .with_statuses(status_tx)
        .spawn()
        .context("starting reporter thread")?;
    Ok(ReportLink { events: event_tx, statuses: status_rx, handle })
}

fn print_statuses(statuses: &Receiver<ReportStatus>) {
    for status in statuses.try_iter() {
        println!("  {}", status.summary());
    }
}

struct Game {
    seed: u64,
    rng: StdRng,
    session: Session,
    recorder: Recorder,
    saved: bool,
}

impl Game {
    fn start(seed: u64, username: Option<String>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let session = Session::new(&mut rng);
        let recorder = Recorder::new(seed, username, &session);
        info!("new game with seed {seed}");
        Self { seed, rng, session, recorder, saved: false }
    }

    fn render(&self) {
        println!("{}", self.session.grid());
        println!("Score: {}", self.session.score());
    }

    /// Write the record once, if a trace directory is configured and moves were made.
    fn save_record(&mut self, dir: Option<&Path>) -> Result<()> {
        let Some(dir) = dir else { return Ok(()) };
        if self.saved || self.recorder.steps() == 0 {
            return Ok(());
        }
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let record = self.recorder.finish();
        let path = dir.join(format!("{}-{}.s2t", record.meta.start_unix_s, self.seed));
        trace::write_record_to_path(&path, &record)
            .with_context(|| format!("writing {}", path.display()))?;
        self.saved = true;
        info!("game record written to {}", path.display());
        Ok(())
    }

    /// [`Game::save_record`], but a failure only costs the record, not the session.
    fn keep_record(&mut self, dir: Option<&Path>) {
        if let Err(e) = self.save_record(dir) {
            warn!("game record not saved: {e:#}");
        }
    }
}

fn play(
    config: &Config,
    username: Option<String>,
    seed: Option<u64>,
    db: Option<&Path>,
    submit: bool,
) -> Result<()> {
    let mut link = match (&username, submit) {
        (Some(name), true) => Some(start_reporter(name, db)?),
        (None, true) => {
            warn!("no username set; scores will not be proven or submitted");
            None
        }
        (_, false) => None,
    };
    let trace_dir = config.trace.dir.as_deref();
    let mut seeds = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut game = Game::start(seed.unwrap_or_else(|| seeds.gen()), username.clone());
    game.render();

    let played = read_moves(
        io::stdin().lock(),
        &mut game,
        &mut seeds,
        username.as_deref(),
        trace_dir,
        &mut link,
    );
    game.keep_record(trace_dir);

    // Always drain the reporter, even when input failed, so a finished game's
    // final proof and submission are not lost on exit.
    let reported = match link.take() {
        Some(link) => finish_reporting(link).map(|statuses| {
            for status in statuses {
                println!("  {}", status.summary());
            }
        }),
        None => Ok(()),
    };
    played?;
    reported
}

/// Drive games from `input` until it ends or a `q` token arrives.
fn read_moves<R: BufRead>(
    input: R,
    game: &mut Game,
    seeds: &mut StdRng,
    username: Option<&str>,
    trace_dir: Option<&Path>,
    link: &mut Option<ReportLink>,
) -> Result<()> {
    'input: for line in input.lines() {
        let line = line.context("reading input")?;
        for token in line.split_whitespace() {
            match token.to_ascii_lowercase().as_str() {
                "q" | "quit" => break 'input,
                "r" | "restart" | "new" => {
                    game.keep_record(trace_dir);
                    *game = Game::start(seeds.gen(), username.map(str::to_string));
                    if let Some(link) = link.as_mut() {
                        link.events.send(SessionEvent::Restarted { grid: *game.session.grid() }).ok();
                    }
                    game.render();
                    continue;
                }
                _ => {}
            }
            let direction = match token.parse::<Direction>() {
                Ok(direction) => direction,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            if game.session.is_terminal() {
                println!("Game over. `r` starts a new game, `q` quits.");
                continue;
            }
            let mut events = link.as_mut().map(|l| &mut l.events);
            let outcome = game.session.step(
                direction,
                &mut game.rng,
                &mut (&mut game.recorder, &mut events),
            );
            if outcome.changed {
                game.render();
            }
            if outcome.terminated {
                println!("Game Over! Final Score: {}", game.session.score());
                game.keep_record(trace_dir);
            }
            if let Some(link) = link.as_ref() {
                print_statuses(&link.statuses);
            }
        }
        io::stdout().flush().ok();
    }
    Ok(())
}

/// Close the event channel, wait for the backlog and collect the remaining statuses.
fn finish_reporting(link: ReportLink) -> Result<Vec<ReportStatus>> {
    let ReportLink { events, statuses, handle } = link;
    drop(events);
    let joined = handle.join();
    let remaining = statuses.try_iter().collect();
    if joined.is_err() {
        bail!("reporter thread panicked");
    }
    Ok(remaining)
}

fn show_leaderboard(db: &Path, limit: usize) -> Result<()> {
    let leaderboard = SqliteLeaderboard::open(db)
        .with_context(|| format!("opening leaderboard {}", db.display()))?;
    let rows = leaderboard.top(limit).context("querying leaderboard")?;
    if rows.is_empty() {
        println!("No scores yet.");
        return Ok(());
    }
    println!("{:>4}  {:<20} {:>10}  {:<10} {:>12}", "rank", "player", "score", "proof", "submitted");
    for (idx, row) in rows.iter().enumerate() {
        let proof: String = row.proof_hash.chars().take(8).collect();
        println!(
            "{:>4}  {:<20} {:>10}  {:<10} {:>12}",
            idx + 1,
            row.username,
            row.top_score,
            proof,
            row.created_at
        );
    }
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let record = trace::parse_record_file(path)
        .with_context(|| format!("reading game record {}", path.display()))?;
    let session = trace::replay(&record).with_context(|| format!("replaying {}", path.display()))?;
    println!(
        "OK: {} moves, final score {}, highest tile {}{}",
        record.meta.steps,
        session.score(),
        session.grid().highest_tile(),
        record.meta.username.as_deref().map(|u| format!(" ({u})")).unwrap_or_default()
    );
    Ok(())
}
