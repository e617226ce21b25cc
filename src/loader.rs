//! This module provides the `MachineLoader` struct, responsible for loading transition tables
//! and tapes from files and strings, and for writing them back atomically.

use crate::encoder::{encode_table, encode_tape};
use crate::parser::{parse_table, parse_tape};
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{BeaverError, State};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `MachineLoader` is a utility struct for reading and writing machine files.
/// It provides methods to load tables and tapes from individual files or strings, to discover
/// and load all `.tm` files within a directory, and to save tables and tapes.
pub struct MachineLoader;

impl MachineLoader {
    /// Loads a transition table from the specified file path.
    ///
    /// # Arguments
    ///
    /// * `path` - A reference to the `Path` of the `.tm` file to load.
    ///
    /// # Returns
    ///
    /// * `Ok(TransitionTable)` if the file is successfully read and parsed.
    /// * `Err(BeaverError::FileError)` if the file cannot be read.
    /// * `Err(BeaverError::ParseError)` if the file content is not a valid table.
    pub fn load_table(path: &Path) -> Result<TransitionTable, BeaverError> {
        parse_table(&read(path)?)
    }

    /// Loads a transition table from the provided string content.
    pub fn load_table_from_string(content: &str) -> Result<TransitionTable, BeaverError> {
        parse_table(content)
    }

    /// Loads a tape for `table` from the specified file path.
    ///
    /// Returns the tape with its head placed, and the initial state the file asks for.
    pub fn load_tape(path: &Path, table: &TransitionTable) -> Result<(Tape, State), BeaverError> {
        parse_tape(&read(path)?, table)
    }

    /// Loads all table files (`.tm` extension) from a given directory.
    ///
    /// Directories and other files are skipped. Each element of the result is either a loaded
    /// table with its path, or the error that prevented loading it.
    pub fn load_tables(directory: &Path) -> Vec<Result<(PathBuf, TransitionTable), BeaverError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(BeaverError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(BeaverError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                // Skip directories and non-.tm files
                if path.is_dir() || path.extension().is_none_or(|ext| ext != "tm") {
                    return None;
                }

                match Self::load_table(&path) {
                    Ok(table) => Some(Ok((path, table))),
                    Err(e) => Some(Err(BeaverError::FileError(format!(
                        "Failed to load table from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        // Directory order is unspecified; sort the successes by path for stable listings.
        results.sort_by(|a, b| match (a, b) {
            (Ok((a, _)), Ok((b, _))) => a.cmp(b),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => std::cmp::Ordering::Equal,
        });
        results
    }

    /// Writes a table to `path`, naming it `name` in the header comment.
    ///
    /// The file is replaced atomically: readers see either the previous file or the complete
    /// new one.
    pub fn save_table(path: &Path, table: &TransitionTable, name: &str) -> Result<(), BeaverError> {
        write_atomic(path, &encode_table(table, name))
    }

    /// Writes a tape and the machine state to `path`, atomically.
    pub fn save_tape(path: &Path, tape: &Tape, state: State) -> Result<(), BeaverError> {
        write_atomic(path, &encode_tape(tape, state))
    }
}

fn read(path: &Path) -> Result<String, BeaverError> {
    fs::read_to_string(path).map_err(|e| {
        BeaverError::FileError(format!("Failed to read file {}: {}", path.display(), e))
    })
}

/// Writes into a temporary file next to `path`, then renames it over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<(), BeaverError> {
    let file_error =
        |e: std::io::Error| BeaverError::FileError(format!("Failed to write {}: {}", path.display(), e));

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory).map_err(file_error)?;
    file.write_all(content.as_bytes()).map_err(file_error)?;
    file.as_file().sync_all().map_err(file_error)?;
    file.persist(path).map_err(|e| file_error(e.error))?;

    Ok(())
}
