//! Game records: a compact binary trace of one game and its replay check.
//!
//! A game played with `StdRng::seed_from_u64(seed)` as its tile source is
//! fully determined by the seed and the list of directions, so a record can be
//! replayed to confirm the claimed score.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::{Direction, Grid, Score, Tile, SIZE};
use crate::events::{EventSink, SessionEvent};
use crate::session::Session;

const MAGIC: &[u8; 4] = b"S2T1"; // ASCII magic
const VERSION: u8 = 1;
const ENDIAN_LE: u8 = 0; // 0 = little-endian

// 4 magic + 1 version + 1 endian + 4 steps + 8 seed + 8 start + 4 elapsed
// + 8 final_score + 4 highest_tile + 2 username_len
const HEADER_LEN: usize = 4 + 1 + 1 + 4 + 8 + 8 + 4 + 8 + 4 + 2;
const GRID_LEN: usize = SIZE * SIZE * 4;
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub seed: u64,
    pub steps: u32,
    pub start_unix_s: u64,
    pub elapsed_s: f32,
    pub final_score: Score,
    pub highest_tile: Tile,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub meta: Meta,
    pub moves: Vec<Direction>, // length = steps
    pub final_grid: Grid,
}

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("unsupported endianness")]
    Endianness,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("username too long ({0} bytes)")]
    UsernameTooLong(usize),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("record has {recorded} steps in its header but {actual} moves")]
    StepCount { recorded: u32, actual: usize },
    #[error("move {step} was recorded after the game had ended")]
    MovesAfterEnd { step: usize },
    #[error("recorded score {recorded} but replay reached {replayed}")]
    ScoreMismatch { recorded: Score, replayed: Score },
    #[error("recorded final grid does not match the replay")]
    GridMismatch,
}

#[inline]
fn read_u16_le(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(..2)?.try_into().ok()?))
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

#[inline]
fn read_u64_le(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(..8)?.try_into().ok()?))
}

#[inline]
fn read_f32_le(bytes: &[u8]) -> Option<f32> {
    read_u32_le(bytes).map(f32::from_bits)
}

pub fn encode_record(record: &GameRecord) -> Result<Vec<u8>, TraceError> {
    let meta = &record.meta;
    if usize::try_from(meta.steps).ok() != Some(record.moves.len()) {
        return Err(TraceError::Malformed);
    }
    let name_bytes = meta.username.as_deref().map(str::as_bytes).unwrap_or(&[]);
    let name_len: u16 = name_bytes
        .len()
        .try_into()
        .map_err(|_| TraceError::UsernameTooLong(name_bytes.len()))?;

    let total = HEADER_LEN + name_bytes.len() + record.moves.len() + GRID_LEN + CHECKSUM_LEN;
    let mut buf = Vec::with_capacity(total);

    // Header
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.push(ENDIAN_LE);
    buf.extend_from_slice(&meta.steps.to_le_bytes());
    buf.extend_from_slice(&meta.seed.to_le_bytes());
    buf.extend_from_slice(&meta.start_unix_s.to_le_bytes());
    buf.extend_from_slice(&meta.elapsed_s.to_bits().to_le_bytes());
    buf.extend_from_slice(&meta.final_score.to_le_bytes());
    buf.extend_from_slice(&meta.highest_tile.to_le_bytes());
    buf.extend_from_slice(&name_len.to_le_bytes());

    // Variable metadata
    buf.extend_from_slice(name_bytes);

    // Payload: one byte per move, then the final grid row-major
    buf.extend(record.moves.iter().map(|d| d.to_u8()));
    for cell in record.final_grid.cells() {
        buf.extend_from_slice(&cell.to_le_bytes());
    }

    // Trailer: CRC32C of all preceding bytes
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn write_record_to_path<P: AsRef<Path>>(path: P, record: &GameRecord) -> Result<(), TraceError> {
    let data = encode_record(record)?;
    let mut f = fs::File::create(path)?;
    f.write_all(&data)?;
    Ok(())
}

pub fn parse_record_bytes(bytes: &[u8]) -> Result<GameRecord, TraceError> {
    if bytes.len() < HEADER_LEN + GRID_LEN + CHECKSUM_LEN {
        return Err(TraceError::Malformed);
    }

    // Validate checksum first to avoid reading garbage fields
    let (content, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let file_crc = read_u32_le(trailer).ok_or(TraceError::Malformed)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(TraceError::Checksum);
    }

    // Fixed header
    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(TraceError::MagicOrVersion);
    }
    if content[5] != ENDIAN_LE {
        return Err(TraceError::Endianness);
    }

    let mut off = 6;
    let steps = read_u32_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 4;
    let seed = read_u64_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 8;
    let start_unix_s = read_u64_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 8;
    let elapsed_s = read_f32_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 4;
    let final_score = read_u64_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 8;
    let highest_tile = read_u32_le(&content[off..]).ok_or(TraceError::Malformed)?; off += 4;
    let name_len = read_u16_le(&content[off..]).ok_or(TraceError::Malformed)? as usize; off += 2;

    let moves_len = usize::try_from(steps).map_err(|_| TraceError::Malformed)?;
    if content.len() != off + name_len + moves_len + GRID_LEN {
        return Err(TraceError::Malformed);
    }

    let name_bytes = &content[off..off + name_len];
    off += name_len;
    let username = if name_len > 0 {
        Some(String::from_utf8(name_bytes.to_vec()).map_err(|_| TraceError::Malformed)?)
    } else {
        None
    };

    let moves = content[off..off + moves_len]
        .iter()
        .map(|&b| Direction::from_u8(b).ok_or(TraceError::Malformed))
        .collect::<Result<Vec<_>, _>>()?;
    off += moves_len;

    let mut rows = [[0; SIZE]; SIZE];
    for (idx, chunk) in content[off..].chunks_exact(4).enumerate() {
        rows[idx / SIZE][idx % SIZE] = read_u32_le(chunk).ok_or(TraceError::Malformed)?;
    }
    let final_grid = Grid::from_rows(rows);
    if !final_grid.is_well_formed() {
        return Err(TraceError::Malformed);
    }

    let meta = Meta { seed, steps, start_unix_s, elapsed_s, final_score, highest_tile, username };
    Ok(GameRecord { meta, moves, final_grid })
}

pub fn parse_record_file<P: AsRef<Path>>(path: P) -> Result<GameRecord, TraceError> {
    let data = fs::read(path)?;
    parse_record_bytes(&data)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Replay a record from its seed and check the claimed result.
///
/// Returns the replayed session on success.
pub fn replay(record: &GameRecord) -> Result<Session, ReplayError> {
    if usize::try_from(record.meta.steps).ok() != Some(record.moves.len()) {
        return Err(ReplayError::StepCount { recorded: record.meta.steps, actual: record.moves.len() });
    }
    let mut rng = StdRng::seed_from_u64(record.meta.seed);
    let mut session = Session::new(&mut rng);
    for (step, &direction) in record.moves.iter().enumerate() {
        if session.is_terminal() {
            return Err(ReplayError::MovesAfterEnd { step });
        }
        session.apply(direction, &mut rng);
    }
    if session.score() != record.meta.final_score {
        return Err(ReplayError::ScoreMismatch {
            recorded: record.meta.final_score,
            replayed: session.score(),
        });
    }
    if session.grid() != &record.final_grid {
        return Err(ReplayError::GridMismatch);
    }
    debug!("replayed {} moves from seed {}", record.moves.len(), record.meta.seed);
    Ok(session)
}

/// Collects a game's directions from its events.
///
/// One recorder covers one game started with `Session::new` from a
/// `StdRng` seeded with `seed`. `Restarted` events are ignored; start a new
/// recorder for the next game.
#[derive(Debug, Clone)]
pub struct Recorder {
    seed: u64,
    username: Option<String>,
    start_unix_s: u64,
    started: Instant,
    moves: Vec<Direction>,
    grid: Grid,
    score: Score,
}

impl Recorder {
    pub fn new(seed: u64, username: Option<String>, initial: &Session) -> Self {
        Self {
            seed,
            username: username.filter(|name| !name.trim().is_empty()),
            start_unix_s: now_unix_seconds(),
            started: Instant::now(),
            moves: Vec::with_capacity(1024),
            grid: *initial.grid(),
            score: initial.score(),
        }
    }

    pub fn steps(&self) -> usize {
        self.moves.len()
    }

    /// Snapshot the record so far.
    pub fn finish(&self) -> GameRecord {
        let meta = Meta {
            seed: self.seed,
            // Saturates; `encode_record` rejects a count that no longer matches.
            steps: u32::try_from(self.moves.len()).unwrap_or(u32::MAX),
            start_unix_s: self.start_unix_s,
            elapsed_s: self.started.elapsed().as_secs_f32(),
            final_score: self.score,
            highest_tile: self.grid.highest_tile(),
            username: self.username.clone(),
        };
        GameRecord { meta, moves: self.moves.clone(), final_grid: self.grid }
    }
}

impl EventSink for Recorder {
    fn publish(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Moved { direction, grid, score, .. } => {
                self.moves.push(direction);
                self.grid = grid;
                self.score = score;
            }
            SessionEvent::Terminated { .. } => {}
            SessionEvent::Restarted { .. } => debug!("recorder ignores restart"),
        }
    }
}
