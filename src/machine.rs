//! This module implements the execution engine: applying single transitions and running a
//! table to halt or to one of its bounds. The [`TuringMachine`] struct bundles a table with
//! its tape and state for interactive use.

use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{CancelToken, Entry, Limits, Outcome, State, Step, Symbol};

/// Steps between two polls of a cancellation token (a power of two, minus one).
const CANCEL_POLL_MASK: u64 = (1 << 16) - 1;

/// Applies one transition.
///
/// Reads the symbol under the head, writes the entry's symbol, moves the head (growing the
/// tape as needed) and enters the entry's next state. Returns `Step::Halted` iff the entry
/// was a `Stop` entry.
#[inline]
pub fn step(table: &TransitionTable, tape: &mut Tape, state: &mut State) -> Step {
    let entry = *table.get(*state, tape.read_head());
    apply(&entry, tape, state)
}

#[inline]
fn apply(entry: &Entry, tape: &mut Tape, state: &mut State) -> Step {
    tape.write_head(entry.write);
    let moved = tape.move_head(entry.direction);
    *state = entry.next;

    if moved {
        Step::Continue
    } else {
        Step::Halted
    }
}

/// Runs until the machine halts or hits one of its limits.
///
/// The tape bound is checked before every moving step: a step whose move would grow storage
/// past `limits.max_tape_len` is not performed and `TapeLimitExceeded` is returned instead.
pub fn run(table: &TransitionTable, tape: &mut Tape, state: &mut State, limits: &Limits) -> Outcome {
    run_counted(table, tape, state, limits, None).0
}

/// Like [`run`], but returns `Outcome::Interrupted` soon after `cancel` is set.
///
/// The token is polled before the first step and then every 65 536 steps, so a run without
/// a step bound can still be stopped.
pub fn run_cancellable(
    table: &TransitionTable,
    tape: &mut Tape,
    state: &mut State,
    limits: &Limits,
    cancel: &CancelToken,
) -> Outcome {
    run_counted(table, tape, state, limits, Some(cancel)).0
}

/// Like [`run`], also returning the number of steps actually performed.
fn run_counted(
    table: &TransitionTable,
    tape: &mut Tape,
    state: &mut State,
    limits: &Limits,
    cancel: Option<&CancelToken>,
) -> (Outcome, u64) {
    let blank_loop_window = if limits.blank_loop_check {
        (table.num_states() * table.width()) as u64
    } else {
        0
    };
    let mut steps: u64 = 0;

    loop {
        if steps >= limits.max_steps {
            return (Outcome::StepLimitExceeded, steps);
        }
        if steps & CANCEL_POLL_MASK == 0 && cancel.is_some_and(CancelToken::is_cancelled) {
            return (Outcome::Interrupted, steps);
        }

        let entry = *table.get(*state, tape.read_head());
        if let Some(offset) = entry.direction.offset() {
            if tape.required_len(tape.head() + offset) > limits.max_tape_len {
                return (Outcome::TapeLimitExceeded, steps);
            }
        }

        steps += 1;
        if apply(&entry, tape, state) == Step::Halted {
            return (Outcome::Halted(steps), steps);
        }

        // A machine back in its start state early with nothing marked will only repeat itself.
        if steps <= blank_loop_window && *state == 0 && tape.one_count() == 0 {
            return (Outcome::BlankLoop, steps);
        }
    }
}

/// A table bundled with the tape and state it runs on.
///
/// This is the convenient owner for interactive use (tracing, visual mode); the search runs
/// the free [`step`] and [`run`] functions against a borrowed table instead.
#[derive(Debug, Clone)]
pub struct TuringMachine {
    table: TransitionTable,
    initial_tape: Tape,
    initial_state: State,
    tape: Tape,
    state: State,
    step_count: u64,
    halted: bool,
}

impl TuringMachine {
    /// Creates a machine on a blank tape, in state 0.
    pub fn new(table: TransitionTable) -> Self {
        Self::with_tape(table, Tape::new(), 0)
    }

    /// Creates a machine on the given tape, starting in `state`.
    pub fn with_tape(table: TransitionTable, tape: Tape, state: State) -> Self {
        Self {
            table,
            initial_tape: tape.clone(),
            initial_state: state,
            tape,
            state,
            step_count: 0,
            halted: false,
        }
    }

    /// Executes a single step. Stepping a halted machine is a no-op that reports `Halted`.
    pub fn step(&mut self) -> Step {
        if self.halted {
            return Step::Halted;
        }

        let result = step(&self.table, &mut self.tape, &mut self.state);
        self.step_count += 1;
        self.halted = result == Step::Halted;
        result
    }

    /// Runs from the current configuration until halt or a limit.
    ///
    /// `Halted` carries the total step count since the last reset.
    pub fn run(&mut self, limits: &Limits) -> Outcome {
        if self.halted {
            return Outcome::Halted(self.step_count);
        }

        let remaining = Limits {
            max_steps: limits.max_steps.saturating_sub(self.step_count),
            ..*limits
        };
        let (outcome, steps) =
            run_counted(&self.table, &mut self.tape, &mut self.state, &remaining, None);
        self.step_count += steps;

        match outcome {
            Outcome::Halted(_) => {
                self.halted = true;
                Outcome::Halted(self.step_count)
            }
            _ => outcome,
        }
    }

    /// Restores the initial tape and state.
    pub fn reset(&mut self) {
        self.tape = self.initial_tape.clone();
        self.state = self.initial_state;
        self.step_count = 0;
        self.halted = false;
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The symbol under the head.
    pub fn symbol(&self) -> Symbol {
        self.tape.read_head()
    }

    /// The entry that the next step will apply.
    pub fn current_entry(&self) -> &Entry {
        self.table.get(self.state, self.symbol())
    }

    /// The number of marks on the tape.
    pub fn score(&self) -> usize {
        self.tape.one_count()
    }
}
