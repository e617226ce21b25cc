//! Built-in busy beaver champions, embedded from `machines/`.

use serde::Serialize;

use crate::encoder::encode_compact;
use crate::parser::parse_table;
use crate::table::TransitionTable;
use crate::types::BeaverError;

/// An embedded machine file with its known result on a blank tape.
struct Builtin {
    name: &'static str,
    text: &'static str,
    score: usize,
    steps: u64,
}

const BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "bb1",
        text: include_str!("../machines/bb1.tm"),
        score: 1,
        steps: 1,
    },
    Builtin {
        name: "bb2",
        text: include_str!("../machines/bb2.tm"),
        score: 4,
        steps: 6,
    },
    Builtin {
        name: "bb3",
        text: include_str!("../machines/bb3.tm"),
        score: 6,
        steps: 14,
    },
    Builtin {
        name: "bb4",
        text: include_str!("../machines/bb4.tm"),
        score: 13,
        steps: 107,
    },
    Builtin {
        name: "bb5",
        text: include_str!("../machines/bb5.tm"),
        score: 4098,
        steps: 47_176_870,
    },
];

/// A parsed built-in machine.
#[derive(Debug, Clone)]
pub struct KnownMachine {
    pub name: &'static str,
    pub text: &'static str,
    pub table: TransitionTable,
    /// Marks left on the tape when started on a blank tape.
    pub score: usize,
    /// Steps to halt from a blank tape, the halting step included.
    pub steps: u64,
}

lazy_static::lazy_static! {
    pub static ref MACHINES: Vec<KnownMachine> = BUILTINS
        .iter()
        .filter_map(|builtin| match parse_table(builtin.text) {
            Ok(table) => Some(KnownMachine {
                name: builtin.name,
                text: builtin.text,
                table,
                score: builtin.score,
                steps: builtin.steps,
            }),
            Err(e) => {
                tracing::warn!(name = builtin.name, error = %e, "failed to parse built-in machine");
                None
            }
        })
        .collect();
}

/// Summary of a built-in machine, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineInfo {
    pub index: usize,
    pub name: String,
    pub num_states: usize,
    pub num_symbols: usize,
    pub compact: Option<String>,
    pub score: usize,
    pub steps: u64,
}

pub struct MachineCatalog;

impl MachineCatalog {
    /// Get the number of available machines
    pub fn count() -> usize {
        MACHINES.len()
    }

    /// Get a machine by its index
    pub fn by_index(index: usize) -> Result<&'static KnownMachine, BeaverError> {
        MACHINES.get(index).ok_or_else(|| {
            BeaverError::ValidationError(format!("Machine index {} out of range", index))
        })
    }

    /// Get a machine by its name
    pub fn by_name(name: &str) -> Result<&'static KnownMachine, BeaverError> {
        MACHINES
            .iter()
            .find(|machine| machine.name == name)
            .ok_or_else(|| BeaverError::ValidationError(format!("Machine '{}' not found", name)))
    }

    /// List all machine names
    pub fn names() -> Vec<&'static str> {
        MACHINES.iter().map(|machine| machine.name).collect()
    }

    pub fn info(index: usize) -> Result<MachineInfo, BeaverError> {
        let machine = Self::by_index(index)?;

        Ok(MachineInfo {
            index,
            name: machine.name.to_string(),
            num_states: machine.table.num_states(),
            num_symbols: machine.table.width(),
            compact: encode_compact(&machine.table).ok(),
            score: machine.score,
            steps: machine.steps,
        })
    }

    /// Get the raw file text of a machine by its index
    pub fn text(index: usize) -> Result<&'static str, BeaverError> {
        Self::by_index(index).map(|machine| machine.text)
    }
}
