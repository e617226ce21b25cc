//! This crate provides the core of a single-tape Turing machine simulator and an exhaustive
//! busy beaver search. It includes modules for the tape and transition table, the execution
//! engine, structural pruning of candidate tables, the table and tape file formats, a catalog
//! of known champions, and the search driver with its checkpoints.

pub mod catalog;
pub mod config;
pub mod encoder;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod pruner;
pub mod queue;
pub mod search;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the built-in machine catalog.
pub use catalog::{KnownMachine, MachineCatalog, MachineInfo, MACHINES};
/// Re-exports the search configuration.
pub use config::SearchConfig;
/// Re-exports the writers and the compact notation codec.
pub use encoder::{
    decode_compact, encode_cell, encode_compact, encode_table, encode_tape, state_letter,
};
/// Re-exports the `MachineLoader` struct from the loader module.
pub use loader::MachineLoader;
/// Re-exports the execution engine.
pub use machine::{run, run_cancellable, step, TuringMachine};
/// Re-exports the parsing functions from the parser module.
pub use parser::{parse_table, parse_tape};
/// Re-exports the pruning types.
pub use pruner::{Predicate, Pruner, Rejection, Verdict};
/// Re-exports the work queue used by the pruner.
pub use queue::{QueueFull, WorkQueue};
/// Re-exports the search driver and its results.
pub use search::{CheckpointStore, Finish, SearchDriver, SearchReport};
pub use table::TransitionTable;
pub use tape::Tape;
/// Re-exports the core value types.
pub use types::{
    BeaverError, CancelToken, Direction, Entry, Limits, Outcome, State, Step, Symbol,
    BLANK_SYMBOL, MARK_SYMBOL, MAX_TAPE_POSITION,
};
