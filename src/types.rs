//! This module defines the core data structures and types used throughout the simulator and
//! the busy beaver search, including symbols, transition entries, execution outcomes and
//! error types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Rule;

/// A tape symbol. Valid symbols of a table lie in `0..=charset_max`.
pub type Symbol = u8;
/// Index of a machine state. Valid states of a table lie in `0..num_states`.
pub type State = usize;

/// The symbol every unvisited tape cell holds.
pub const BLANK_SYMBOL: Symbol = 0;
/// The distinguished symbol whose count scores a busy beaver.
pub const MARK_SYMBOL: Symbol = 1;
/// The largest alphabet a table may declare (`charset_max` is a `Symbol`).
pub const MAX_CHARSET: Symbol = Symbol::MAX;
/// The maximum allowed size for a table or tape definition in bytes.
pub const MAX_DEFINITION_SIZE: usize = 1 << 20; // 1MB
/// The default maximum tape length (in storage cells) for runs and searches.
pub const DEFAULT_MAX_TAPE_LEN: usize = 409_750;
/// The largest head distance from 0 a tape may address. Storage for it stays below
/// `isize::MAX` cells.
pub const MAX_TAPE_POSITION: i64 = i64::MAX / 4;
/// How often (in examined tables) the search writes a routine checkpoint.
pub const DEFAULT_CHECKPOINT_PERIOD: u64 = 21 * 21 * 21 * 21 + 1;

/// Represents the possible moves of the tape head.
///
/// The variant order is the enumeration order used by the search: `Left < Right < Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Halt the machine. The head does not move.
    Stop,
}

impl Direction {
    /// The one-letter code used by the table file format.
    pub fn code(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stop => 'S',
        }
    }

    /// Parses a one-letter direction code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            'S' => Some(Direction::Stop),
            _ => None,
        }
    }

    /// The head offset applied by this move, or `None` for `Stop`.
    pub fn offset(self) -> Option<i64> {
        match self {
            Direction::Left => Some(-1),
            Direction::Right => Some(1),
            Direction::Stop => None,
        }
    }
}

/// The transition rule for one `(state, symbol)` cell of a table.
///
/// When `direction` is `Stop`, `write` is still applied before halting while `next` has no
/// operational effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Symbol written at the head.
    pub write: Symbol,
    /// Head movement after writing.
    pub direction: Direction,
    /// State entered after moving.
    pub next: State,
}

impl Entry {
    pub const fn new(write: Symbol, direction: Direction, next: State) -> Self {
        Self {
            write,
            direction,
            next,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.direction == Direction::Stop
    }
}

impl Default for Entry {
    /// The first configuration of a cell in enumeration order.
    fn default() -> Self {
        Self::new(BLANK_SYMBOL, Direction::Left, 0)
    }
}

/// Represents the outcome of a single machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The machine moved and keeps running.
    Continue,
    /// The machine applied a `Stop` entry.
    Halted,
}

/// Represents the outcome of a bounded run.
///
/// Only `Halted` is conclusive; the other variants are expected results of bounding an
/// undecidable question and are never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Halted after the given number of steps, the halting step included.
    Halted(u64),
    /// The step budget ran out.
    StepLimitExceeded,
    /// The next step would have grown the tape beyond its bound.
    TapeLimitExceeded,
    /// Re-entered the start state early with a tape free of marks.
    BlankLoop,
    /// The cancellation token was set while the machine was running.
    Interrupted,
}

impl Outcome {
    /// A one-letter progress code, matching the search's progress output.
    pub fn code(&self) -> char {
        match self {
            Outcome::Halted(_) => 'h',
            Outcome::StepLimitExceeded => 'i',
            Outcome::TapeLimitExceeded => 't',
            Outcome::BlankLoop => 'L',
            Outcome::Interrupted => 'x',
        }
    }
}

/// Bounds for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum number of steps before giving up.
    pub max_steps: u64,
    /// Maximum tape storage length, in cells.
    pub max_tape_len: usize,
    /// Enables the early blank-loop check used by the search.
    pub blank_loop_check: bool,
}

impl Limits {
    pub fn new(max_steps: u64, max_tape_len: usize) -> Self {
        Self {
            max_steps,
            max_tape_len,
            blank_loop_check: false,
        }
    }

    pub fn with_blank_loop_check(mut self, enabled: bool) -> Self {
        self.blank_loop_check = enabled;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(u64::MAX, DEFAULT_MAX_TAPE_LEN)
    }
}

/// A cloneable cancellation flag shared between a long computation and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from a signal handler thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Represents the errors that can occur while loading, saving or searching machines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeaverError {
    /// Indicates a syntax or semantic error in a table or tape definition.
    #[error("Definition parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates a table or tape that is structurally inconsistent.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to reading or writing files.
    #[error("File error: {0}")]
    FileError(String),
}
