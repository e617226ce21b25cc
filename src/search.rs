//! This module implements the exhaustive busy beaver search.
//!
//! The driver walks the enumeration order from a starting table, weeds out tables that cannot
//! be interesting, simulates the rest from a blank tape and keeps every table that reaches the
//! best score seen so far. Progress survives interruption through checkpoint files written
//! into the configured output directory:
//!
//! * `interrupt.tm` - the next unexamined table, written when the search is cancelled;
//! * `periodic.tm` - the next unexamined table, written every `checkpoint_period` tables;
//! * `max<score>.tm` / `max<score>.tape` - a table reaching the best score and its final tape.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::SearchConfig;
use crate::loader::MachineLoader;
use crate::machine::run_cancellable;
use crate::pruner::{Pruner, Rejection, Verdict};
use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{BeaverError, CancelToken, Outcome, State};

/// File written when the search is cancelled.
pub const INTERRUPT_FILE: &str = "interrupt.tm";
/// File written every `checkpoint_period` tables.
pub const PERIODIC_FILE: &str = "periodic.tm";

/// Writes checkpoint and best-score files into one directory. Every write is atomic.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn best_table_path(&self, score: usize) -> PathBuf {
        self.dir.join(format!("max{:04}.tm", score))
    }

    pub fn best_tape_path(&self, score: usize) -> PathBuf {
        self.dir.join(format!("max{:04}.tape", score))
    }

    pub fn save_interrupt(&self, table: &TransitionTable) -> Result<PathBuf, BeaverError> {
        self.save_named(INTERRUPT_FILE, table)
    }

    pub fn save_periodic(&self, table: &TransitionTable) -> Result<PathBuf, BeaverError> {
        self.save_named(PERIODIC_FILE, table)
    }

    /// Saves a table reaching `score` together with the tape and state it halted with.
    pub fn save_best(
        &self,
        score: usize,
        table: &TransitionTable,
        tape: &Tape,
        state: State,
    ) -> Result<PathBuf, BeaverError> {
        let table_path = self.best_table_path(score);
        let name = format!("max{:04}.tm", score);
        MachineLoader::save_table(&table_path, table, &name)?;
        MachineLoader::save_tape(&self.best_tape_path(score), tape, state)?;
        Ok(table_path)
    }

    fn save_named(&self, name: &str, table: &TransitionTable) -> Result<PathBuf, BeaverError> {
        let path = self.dir.join(name);
        MachineLoader::save_table(&path, table, name)?;
        Ok(path)
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Finish {
    /// Every table from the starting one to the end of the enumeration was examined.
    Exhausted,
    /// The cancellation token was set; `interrupt.tm` holds the next table.
    Cancelled,
}

/// Counters and results of one search run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub num_states: usize,
    pub num_symbols: usize,
    /// Canonical index of the first table examined.
    pub start_index: u128,
    pub tables_examined: u64,
    pub tables_simulated: u64,
    pub halted: u64,
    pub step_limited: u64,
    pub tape_limited: u64,
    pub blank_loops: u64,
    /// Weeded tables, per reason.
    pub rejections: BTreeMap<Rejection, u64>,
    pub best_score: usize,
    /// Canonical index of the last table that reached `best_score`, if any did in this run.
    pub best_index: Option<u128>,
    /// Canonical index of the last table fully examined, if any was.
    pub last_index: Option<u128>,
    /// Canonical index to resume from, if the search was cut short.
    pub resume_index: Option<u128>,
    pub finish: Finish,
}

impl SearchReport {
    fn new(table: &TransitionTable, best_score: usize) -> Self {
        Self {
            num_states: table.num_states(),
            num_symbols: table.width(),
            start_index: table.index(),
            tables_examined: 0,
            tables_simulated: 0,
            halted: 0,
            step_limited: 0,
            tape_limited: 0,
            blank_loops: 0,
            rejections: Rejection::ALL.iter().map(|&r| (r, 0)).collect(),
            best_score,
            best_index: None,
            last_index: None,
            resume_index: None,
            finish: Finish::Exhausted,
        }
    }

    /// The number of weeded tables, all reasons together.
    pub fn tables_rejected(&self) -> u64 {
        self.rejections.values().sum()
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Halted(_) => self.halted += 1,
            Outcome::StepLimitExceeded => self.step_limited += 1,
            Outcome::TapeLimitExceeded => self.tape_limited += 1,
            Outcome::BlankLoop => self.blank_loops += 1,
            Outcome::Interrupted => {}
        }
    }
}

/// Runs the search loop.
pub struct SearchDriver {
    config: SearchConfig,
    cancel: CancelToken,
    pruner: Pruner,
    store: CheckpointStore,
}

impl SearchDriver {
    pub fn new(config: SearchConfig, cancel: CancelToken) -> Self {
        let store = CheckpointStore::new(config.output_dir.clone());
        Self {
            config,
            cancel,
            pruner: Pruner::new(),
            store,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Searches from `table` to the end of the enumeration order, or until cancelled.
    ///
    /// The table counter starts at the table's canonical index, so a search restarted from a
    /// checkpoint file continues where the previous one stopped.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchReport)` when the enumeration is exhausted or the search is cancelled.
    /// * `Err(BeaverError::FileError)` if a checkpoint or best-score file cannot be written.
    pub fn run(&mut self, mut table: TransitionTable) -> Result<SearchReport, BeaverError> {
        self.config.validate()?;
        fs::create_dir_all(self.store.dir()).map_err(|e| {
            BeaverError::FileError(format!(
                "Failed to create output directory {}: {}",
                self.store.dir().display(),
                e
            ))
        })?;

        let limits = self.config.limits();
        let period = self.config.checkpoint_period;
        let mut report = SearchReport::new(&table, self.config.initial_best);
        let mut counter = report.start_index;
        let mut tape = Tape::new();

        tracing::info!(
            states = table.num_states(),
            symbols = table.width(),
            start = counter,
            space = ?table.space_size(),
            "starting search"
        );

        loop {
            if self.cancel.is_cancelled() {
                return self.interrupt(report, &table, counter);
            }

            match self.pruner.weed(&table) {
                Verdict::Reject(reason) => {
                    *report.rejections.entry(reason).or_insert(0) += 1;
                    tracing::trace!(index = counter, code = reason.code(), "weeded");
                }
                Verdict::Accept => {
                    tape.blank();
                    let mut state = 0;
                    let outcome = run_cancellable(&table, &mut tape, &mut state, &limits, &self.cancel);
                    if outcome == Outcome::Interrupted {
                        // The table is examined again on resume.
                        return self.interrupt(report, &table, counter);
                    }
                    report.tables_simulated += 1;
                    report.record(&outcome);
                    tracing::debug!(index = counter, code = %outcome.code(), "simulated");

                    if let Outcome::Halted(steps) = outcome {
                        let score = tape.one_count();
                        if score >= report.best_score {
                            let path = self.store.save_best(score, &table, &tape, state)?;
                            tracing::info!(
                                score,
                                steps,
                                index = counter,
                                path = %path.display(),
                                "new best score"
                            );
                            report.best_score = score;
                            report.best_index = Some(counter);
                        }
                    }
                }
            }
            report.tables_examined += 1;
            report.last_index = Some(counter);

            if table.advance() {
                tracing::info!(
                    examined = report.tables_examined,
                    simulated = report.tables_simulated,
                    best = report.best_score,
                    "search space exhausted"
                );
                return Ok(report);
            }

            counter = counter.saturating_add(1);
            if counter % period as u128 == 0 {
                self.store.save_periodic(&table)?;
                tracing::info!(
                    index = counter,
                    simulated = report.tables_simulated,
                    best = report.best_score,
                    "checkpoint"
                );
            }
        }
    }

    /// Writes `table` to the interrupt file and closes the report as cancelled.
    fn interrupt(
        &self,
        mut report: SearchReport,
        table: &TransitionTable,
        counter: u128,
    ) -> Result<SearchReport, BeaverError> {
        let path = self.store.save_interrupt(table)?;
        tracing::info!(index = counter, path = %path.display(), "search cancelled");
        report.resume_index = Some(table.index());
        report.finish = Finish::Cancelled;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TuringMachine;
    use crate::types::Limits;
    use tempfile::tempdir;

    fn config(dir: &Path) -> SearchConfig {
        SearchConfig {
            max_steps: 1000,
            max_tape_len: 1000,
            output_dir: dir.to_path_buf(),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_two_state_search_is_exhaustive() {
        let dir = tempdir().unwrap();
        let mut driver = SearchDriver::new(config(dir.path()), CancelToken::new());
        let report = driver.run(TransitionTable::new(2, 1)).unwrap();

        assert_eq!(report.finish, Finish::Exhausted);
        assert_eq!(report.tables_examined, 6561);
        assert_eq!(report.tables_simulated, 624);
        assert_eq!(report.tables_rejected() + report.tables_simulated, 6561);
        assert_eq!(report.halted, 336);
        assert_eq!(report.step_limited, 25);
        assert_eq!(report.tape_limited, 195);
        assert_eq!(report.blank_loops, 68);
        assert_eq!(report.rejections[&Rejection::StartSelfLoop], 2916);
        assert_eq!(report.rejections[&Rejection::StartHalts], 729);
        assert_eq!(report.rejections[&Rejection::NoStop], 2048);
        assert_eq!(report.rejections[&Rejection::StopUnreachable], 0);
        assert_eq!(report.rejections[&Rejection::OnlyLeft], 122);
        assert_eq!(report.rejections[&Rejection::OnlyRight], 122);
        assert_eq!(report.best_score, 4);
        assert_eq!(report.best_index, Some(6303));
        assert_eq!(report.last_index, Some(6560));
        assert_eq!(report.resume_index, None);

        for score in 1..=4 {
            assert!(driver.store().best_table_path(score).exists());
            assert!(driver.store().best_tape_path(score).exists());
        }
        assert!(!dir.path().join(PERIODIC_FILE).exists());
        assert!(!dir.path().join(INTERRUPT_FILE).exists());
    }

    #[test]
    fn test_best_file_reloads_to_a_champion() {
        let dir = tempdir().unwrap();
        let mut driver = SearchDriver::new(config(dir.path()), CancelToken::new());
        driver.run(TransitionTable::new(2, 1)).unwrap();

        let table = MachineLoader::load_table(&driver.store().best_table_path(4)).unwrap();
        assert_eq!(table.index(), 6303);

        let mut machine = TuringMachine::new(table.clone());
        assert!(matches!(machine.run(&Limits::default()), Outcome::Halted(_)));
        assert_eq!(machine.score(), 4);

        let (tape, _) =
            MachineLoader::load_tape(&driver.store().best_tape_path(4), &table).unwrap();
        assert_eq!(tape.one_count(), 4);
    }

    #[test]
    fn test_blank_loop_check_can_be_disabled() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            blank_loop_check: false,
            ..config(dir.path())
        };
        let report = SearchDriver::new(config, CancelToken::new())
            .run(TransitionTable::new(2, 1))
            .unwrap();

        assert_eq!(report.blank_loops, 0);
        assert_eq!(report.step_limited, 74);
        assert_eq!(report.tape_limited, 214);
        assert_eq!(report.halted, 336);
    }

    #[test]
    fn test_periodic_checkpoint() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            checkpoint_period: 1000,
            ..config(dir.path())
        };
        SearchDriver::new(config, CancelToken::new())
            .run(TransitionTable::new(2, 1))
            .unwrap();

        // The last checkpoint holds the first table not yet examined at that point.
        let table = MachineLoader::load_table(&dir.path().join(PERIODIC_FILE)).unwrap();
        assert_eq!(table.index(), 6000);
    }

    #[test]
    fn test_resume_from_index() {
        let dir = tempdir().unwrap();
        let mut driver = SearchDriver::new(config(dir.path()), CancelToken::new());
        let report = driver
            .run(TransitionTable::from_index(2, 1, 6000))
            .unwrap();

        assert_eq!(report.start_index, 6000);
        assert_eq!(report.tables_examined, 561);
        assert_eq!(report.tables_simulated, 172);
        assert_eq!(report.best_score, 4);
    }

    #[test]
    fn test_resume_from_champion_writes_only_its_score() {
        let dir = tempdir().unwrap();
        let mut driver = SearchDriver::new(config(dir.path()), CancelToken::new());
        let report = driver
            .run(TransitionTable::from_index(2, 1, 5947))
            .unwrap();

        assert_eq!(report.tables_examined, 614);
        assert_eq!(report.tables_simulated, 191);
        assert!(driver.store().best_table_path(4).exists());
        assert!(!driver.store().best_table_path(3).exists());
    }

    #[test]
    fn test_initial_best_suppresses_lower_scores() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            initial_best: 5,
            ..config(dir.path())
        };
        let report = SearchDriver::new(config, CancelToken::new())
            .run(TransitionTable::new(2, 1))
            .unwrap();

        assert_eq!(report.best_score, 5);
        assert_eq!(report.best_index, None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cancelled_search_writes_interrupt_file() {
        let dir = tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = TransitionTable::from_index(2, 1, 1234);
        let report = SearchDriver::new(config(dir.path()), cancel)
            .run(start.clone())
            .unwrap();

        assert_eq!(report.finish, Finish::Cancelled);
        assert_eq!(report.tables_examined, 0);
        assert_eq!(report.last_index, None);
        assert_eq!(report.resume_index, Some(1234));

        let saved = MachineLoader::load_table(&dir.path().join(INTERRUPT_FILE)).unwrap();
        assert_eq!(saved, start);
    }

    #[test]
    fn test_cancel_stops_an_unbounded_simulation() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            output_dir: dir.path().to_path_buf(),
            ..SearchConfig::default()
        };
        assert_eq!(config.max_steps, u64::MAX);

        let cancel = CancelToken::new();
        let handle = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(200));
                cancel.cancel();
            })
        };
        // Without a step bound the first looping table never finishes on its own.
        let report = SearchDriver::new(config, cancel)
            .run(TransitionTable::new(2, 1))
            .unwrap();
        handle.join().unwrap();

        assert_eq!(report.finish, Finish::Cancelled);
        let resume = report.resume_index.unwrap();
        assert_eq!(report.last_index, Some(resume - 1));
        assert_eq!(report.tables_examined as u128, resume);

        let saved = MachineLoader::load_table(&dir.path().join(INTERRUPT_FILE)).unwrap();
        assert_eq!(saved.index(), resume);
        assert_eq!(saved, TransitionTable::from_index(2, 1, resume));
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("results").join("2x2");
        let report = SearchDriver::new(config(&nested), CancelToken::new())
            .run(TransitionTable::new(1, 1))
            .unwrap();

        assert!(nested.is_dir());
        assert_eq!(report.tables_examined, 25);
        assert_eq!(report.tables_rejected(), 25);
    }

    #[test]
    fn test_report_serializes() {
        let dir = tempdir().unwrap();
        let report = SearchDriver::new(config(dir.path()), CancelToken::new())
            .run(TransitionTable::new(1, 1))
            .unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"finish\":\"Exhausted\""));
        assert!(json.contains("\"StartSelfLoop\":25"));
    }
}
