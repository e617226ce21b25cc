//! This module provides the cheap structural checks ("weeding") that reject a candidate table
//! before it is ever simulated. The checks walk the state graph breadth-first from state 0 and
//! look for reachable entries with a given property: a `Stop`, a mark being written, a move in
//! either direction.

use serde::{Deserialize, Serialize};

use crate::queue::WorkQueue;
use crate::table::TransitionTable;
use crate::types::{Direction, Entry, State, MARK_SYMBOL};

/// A property of a single entry, tested by the reachability traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    IsStop,
    WritesMark,
    MovesLeft,
    MovesRight,
}

impl Predicate {
    pub fn test(self, entry: &Entry) -> bool {
        match self {
            Predicate::IsStop => entry.direction == Direction::Stop,
            Predicate::WritesMark => entry.write == MARK_SYMBOL,
            Predicate::MovesLeft => entry.direction == Direction::Left,
            Predicate::MovesRight => entry.direction == Direction::Right,
        }
    }
}

/// Why a table was weeded out. Codes are stable and appear in search progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rejection {
    /// The start entry loops straight back into state 0.
    StartSelfLoop,
    /// The start entry halts.
    StartHalts,
    /// No entry halts.
    NoStop,
    /// No halting entry is reachable from state 0.
    StopUnreachable,
    /// Some state is unreachable from state 0.
    UnreachableState,
    /// No reachable entry writes a mark.
    NoMarkWritten,
    /// Every reachable move goes left.
    OnlyLeft,
    /// Every reachable move goes right.
    OnlyRight,
}

impl Rejection {
    pub const ALL: [Rejection; 8] = [
        Rejection::StartSelfLoop,
        Rejection::StartHalts,
        Rejection::NoStop,
        Rejection::StopUnreachable,
        Rejection::UnreachableState,
        Rejection::NoMarkWritten,
        Rejection::OnlyLeft,
        Rejection::OnlyRight,
    ];

    pub fn code(self) -> u8 {
        match self {
            Rejection::StartSelfLoop => 1,
            Rejection::StartHalts => 2,
            Rejection::NoStop => 3,
            Rejection::StopUnreachable => 4,
            Rejection::UnreachableState => 5,
            Rejection::NoMarkWritten => 6,
            Rejection::OnlyLeft => 7,
            Rejection::OnlyRight => 8,
        }
    }
}

/// The result of weeding one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

/// Reusable traversal state.
///
/// The visited markers and the queue are allocated once per table shape and only reset
/// between traversals. The queue holds `num_states + 1` slots and every state is enqueued at
/// most once per traversal, so it can never overflow.
#[derive(Debug, Clone)]
pub struct Pruner {
    visited: Vec<bool>,
    queue: WorkQueue<State>,
}

impl Default for Pruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner {
    pub fn new() -> Self {
        Self {
            visited: Vec::new(),
            queue: WorkQueue::with_capacity(0),
        }
    }

    /// Returns `true` if an entry satisfying `predicate` is reachable from state 0.
    pub fn reachable(&mut self, table: &TransitionTable, predicate: Predicate) -> bool {
        self.traverse(table, Some(predicate)).0
    }

    /// Counts the states reachable from state 0, state 0 included.
    pub fn reachable_count(&mut self, table: &TransitionTable) -> usize {
        self.traverse(table, None).1
    }

    /// Runs the ordered rejection chain. The first applicable reason wins.
    ///
    /// # Arguments
    ///
    /// * `table` - The candidate table.
    ///
    /// # Returns
    ///
    /// * `Verdict::Accept` if the table is worth simulating.
    /// * `Verdict::Reject` with the first reason that applies otherwise.
    pub fn weed(&mut self, table: &TransitionTable) -> Verdict {
        let start = table.get(0, 0);

        let rejection = if start.next == 0 {
            Some(Rejection::StartSelfLoop)
        } else if start.is_stop() {
            Some(Rejection::StartHalts)
        } else if !table.contains_stop() {
            Some(Rejection::NoStop)
        } else if !self.reachable(table, Predicate::IsStop) {
            Some(Rejection::StopUnreachable)
        } else if self.reachable_count(table) < table.num_states() {
            Some(Rejection::UnreachableState)
        } else if !self.reachable(table, Predicate::WritesMark) {
            Some(Rejection::NoMarkWritten)
        } else {
            let left = self.reachable(table, Predicate::MovesLeft);
            let right = self.reachable(table, Predicate::MovesRight);
            match (left, right) {
                (true, false) => Some(Rejection::OnlyLeft),
                (false, true) => Some(Rejection::OnlyRight),
                _ => None,
            }
        };

        match rejection {
            Some(reason) => Verdict::Reject(reason),
            None => Verdict::Accept,
        }
    }

    /// Breadth-first walk from state 0 over every `next` link, `Stop` entries included.
    ///
    /// Returns whether the predicate matched and how many states were visited. With a
    /// predicate the walk stops at the first match.
    fn traverse(&mut self, table: &TransitionTable, predicate: Option<Predicate>) -> (bool, usize) {
        self.prepare(table.num_states());

        self.visited[0] = true;
        self.enqueue(0);
        let mut count = 1;

        while let Some(state) = self.queue.pop() {
            for entry in table.row(state) {
                if predicate.is_some_and(|p| p.test(entry)) {
                    return (true, count);
                }
                if !self.visited[entry.next] {
                    self.visited[entry.next] = true;
                    self.enqueue(entry.next);
                    count += 1;
                }
            }
        }

        (false, count)
    }

    fn prepare(&mut self, num_states: usize) {
        if self.visited.len() != num_states {
            self.visited = vec![false; num_states];
            self.queue = WorkQueue::with_capacity(num_states + 1);
        } else {
            self.visited.iter_mut().for_each(|v| *v = false);
            self.queue.reset();
        }
    }

    fn enqueue(&mut self, state: State) {
        if self.queue.push(state).is_err() {
            // Each state is pushed once per traversal and the queue has a spare slot.
            unreachable!("reachability queue overflowed with {} states", self.visited.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction::{Left, Right, Stop};

    fn table(charset_max: u8, rows: Vec<Vec<Entry>>) -> TransitionTable {
        TransitionTable::from_rows(charset_max, rows).unwrap()
    }

    fn bb2() -> TransitionTable {
        table(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Stop, 1)],
            ],
        )
    }

    fn bb4() -> TransitionTable {
        table(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(0, Left, 2)],
                vec![Entry::new(1, Stop, 3), Entry::new(1, Left, 3)],
                vec![Entry::new(1, Right, 3), Entry::new(0, Right, 0)],
            ],
        )
    }

    #[test]
    fn test_champions_are_accepted() {
        let mut pruner = Pruner::new();
        assert_eq!(pruner.weed(&bb2()), Verdict::Accept);
        assert_eq!(pruner.weed(&bb4()), Verdict::Accept);
        assert_eq!(pruner.reachable_count(&bb4()), 4);
    }

    #[test]
    fn test_rejection_order() {
        let mut pruner = Pruner::new();

        let self_loop = table(
            1,
            vec![
                vec![Entry::new(1, Stop, 0), Entry::new(1, Stop, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Stop, 1)],
            ],
        );
        assert_eq!(
            pruner.weed(&self_loop),
            Verdict::Reject(Rejection::StartSelfLoop)
        );

        let start_halts = table(
            1,
            vec![
                vec![Entry::new(1, Stop, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Right, 1)],
            ],
        );
        assert_eq!(
            pruner.weed(&start_halts),
            Verdict::Reject(Rejection::StartHalts)
        );
    }

    #[test]
    fn test_no_stop_wins_over_reachability() {
        // State 1 is unreachable and there is no Stop: NoStop must be reported.
        let no_stop = table(
            1,
            vec![
                vec![Entry::new(1, Right, 2), Entry::new(1, Left, 2)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Right, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Right, 2)],
            ],
        );
        let mut pruner = Pruner::new();
        assert_eq!(pruner.weed(&no_stop), Verdict::Reject(Rejection::NoStop));
        assert_eq!(pruner.reachable_count(&no_stop), 2);
    }

    #[test]
    fn test_unreachable_stop() {
        let unreachable_stop = table(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Right, 1)],
                vec![Entry::new(1, Stop, 0), Entry::new(1, Stop, 0)],
            ],
        );
        let mut pruner = Pruner::new();
        assert_eq!(
            pruner.weed(&unreachable_stop),
            Verdict::Reject(Rejection::StopUnreachable)
        );
    }

    #[test]
    fn test_unreachable_state() {
        // State 1 halts on 1 but state 2 is never entered.
        let dead_state = table(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Stop, 0)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Right, 0)],
            ],
        );
        let mut pruner = Pruner::new();
        assert_eq!(
            pruner.weed(&dead_state),
            Verdict::Reject(Rejection::UnreachableState)
        );
    }

    #[test]
    fn test_no_mark_written() {
        let blank = table(
            1,
            vec![
                vec![Entry::new(0, Right, 1), Entry::new(0, Left, 1)],
                vec![Entry::new(0, Left, 0), Entry::new(0, Stop, 1)],
            ],
        );
        let mut pruner = Pruner::new();
        assert_eq!(
            pruner.weed(&blank),
            Verdict::Reject(Rejection::NoMarkWritten)
        );
    }

    #[test]
    fn test_one_way_movers() {
        let left = table(
            1,
            vec![
                vec![Entry::new(1, Left, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Stop, 1)],
            ],
        );
        let right = table(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Right, 1)],
                vec![Entry::new(1, Right, 0), Entry::new(1, Stop, 1)],
            ],
        );
        let mut pruner = Pruner::new();
        assert_eq!(pruner.weed(&left), Verdict::Reject(Rejection::OnlyLeft));
        assert_eq!(pruner.weed(&right), Verdict::Reject(Rejection::OnlyRight));
    }

    #[test]
    fn test_reachable_predicates() {
        let mut pruner = Pruner::new();
        let table = bb2();
        assert!(pruner.reachable(&table, Predicate::IsStop));
        assert!(pruner.reachable(&table, Predicate::WritesMark));
        assert!(pruner.reachable(&table, Predicate::MovesLeft));
        assert!(pruner.reachable(&table, Predicate::MovesRight));
    }

    #[test]
    fn test_reachable_count_is_monotone() {
        // Start with a chain that only reaches state 0 and add links one by one.
        let mut table = TransitionTable::new(4, 1);
        let mut pruner = Pruner::new();
        let mut previous = pruner.reachable_count(&table);
        assert_eq!(previous, 1);

        let links = [(0, 1, 1), (1, 0, 2), (2, 1, 3), (3, 0, 1)];
        for (state, symbol, next) in links {
            table.set(state, symbol, Entry::new(1, Right, next));
            let count = pruner.reachable_count(&table);
            assert!(count >= previous);
            previous = count;
        }
        assert_eq!(previous, table.num_states());
    }

    #[test]
    fn test_pruner_adapts_to_shape_changes() {
        let mut pruner = Pruner::new();
        assert_eq!(pruner.reachable_count(&TransitionTable::new(2, 1)), 1);
        assert_eq!(pruner.reachable_count(&bb4()), 4);
        assert_eq!(pruner.reachable_count(&bb2()), 2);
    }

    #[test]
    fn test_rejection_codes_are_distinct_and_ordered() {
        let codes: Vec<u8> = Rejection::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
