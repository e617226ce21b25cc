//! The transition table and its enumeration order.
//!
//! Every table of a given shape is numbered by a mixed-radix "canonical index". Each cell is
//! one digit: `write + next·(charset_max+1) + move·(charset_max+1)·num_states` for moving
//! entries, and a sentinel one above the largest moving digit for `Stop` entries. Cells are
//! scanned state-major, symbol-minor, the first cell being the least significant digit.
//! [`TransitionTable::advance`] steps through tables in exactly this order, so the index of
//! a successor is always the index of its predecessor plus one.

use crate::types::{BeaverError, Direction, Entry, State, Symbol, MARK_SYMBOL};

/// A dense `(state, symbol) -> Entry` function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionTable {
    num_states: usize,
    charset_max: Symbol,
    entries: Vec<Entry>,
}

impl TransitionTable {
    /// Creates the all-zero table: every cell writes 0, moves left and enters state 0.
    ///
    /// This is the first table of the enumeration order.
    pub fn new(num_states: usize, charset_max: Symbol) -> Self {
        assert!(num_states >= 1, "a table needs at least one state");
        Self {
            num_states,
            charset_max,
            entries: vec![Entry::default(); num_states * (charset_max as usize + 1)],
        }
    }

    /// Builds a table from rows of entries, one row per state, one entry per symbol.
    pub fn from_rows(charset_max: Symbol, rows: Vec<Vec<Entry>>) -> Result<Self, BeaverError> {
        let width = charset_max as usize + 1;
        if rows.is_empty() {
            return Err(BeaverError::ValidationError(
                "A table needs at least one state".to_string(),
            ));
        }
        if let Some((state, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(BeaverError::ValidationError(format!(
                "State {} has {} entries, expected {}",
                state,
                row.len(),
                width
            )));
        }

        let table = Self {
            num_states: rows.len(),
            charset_max,
            entries: rows.into_iter().flatten().collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Decodes a canonical index into its table.
    ///
    /// `Stop` cells come back with the canonical placeholders, so this inverts
    /// [`TransitionTable::index`] exactly for every table produced by the enumeration.
    pub fn from_index(num_states: usize, charset_max: Symbol, index: u128) -> Self {
        let mut table = Self::new(num_states, charset_max);
        let radix = table.radix();
        let width = charset_max as u128 + 1;
        let states = num_states as u128;
        let mut rest = index;

        for cell in 0..table.entries.len() {
            let digit = rest % radix;
            rest /= radix;

            table.entries[cell] = if digit == table.stop_digit() {
                table.stop_entry()
            } else {
                let direction = if digit / (width * states) == 0 {
                    Direction::Left
                } else {
                    Direction::Right
                };
                Entry::new(
                    (digit % width) as Symbol,
                    direction,
                    ((digit / width) % states) as State,
                )
            };
        }

        table
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn charset_max(&self) -> Symbol {
        self.charset_max
    }

    /// The number of symbols in the alphabet.
    pub fn width(&self) -> usize {
        self.charset_max as usize + 1
    }

    /// All cells in scan order (state-major, symbol-minor).
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The cells of one state, indexed by symbol.
    pub fn row(&self, state: State) -> &[Entry] {
        let width = self.width();
        &self.entries[state * width..(state + 1) * width]
    }

    #[inline]
    pub fn get(&self, state: State, symbol: Symbol) -> &Entry {
        &self.entries[state * self.width() + symbol as usize]
    }

    pub fn set(&mut self, state: State, symbol: Symbol, entry: Entry) {
        let width = self.width();
        self.entries[state * width + symbol as usize] = entry;
    }

    /// Checks that every entry writes a valid symbol and names a valid next state.
    pub fn validate(&self) -> Result<(), BeaverError> {
        for (cell, entry) in self.entries.iter().enumerate() {
            let (state, symbol) = (cell / self.width(), cell % self.width());
            if entry.write > self.charset_max {
                return Err(BeaverError::ValidationError(format!(
                    "State {} input {} writes {}, above charset_max {}",
                    state, symbol, entry.write, self.charset_max
                )));
            }
            if entry.next >= self.num_states {
                return Err(BeaverError::ValidationError(format!(
                    "State {} input {} refers to non-existent state {}",
                    state, symbol, entry.next
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` iff any cell halts.
    pub fn contains_stop(&self) -> bool {
        self.entries.iter().any(Entry::is_stop)
    }

    /// The number of distinct digit values per cell.
    pub fn radix(&self) -> u128 {
        self.stop_digit() + 1
    }

    /// The digit of a `Stop` cell, one above the largest moving digit.
    pub fn stop_digit(&self) -> u128 {
        2 * self.width() as u128 * self.num_states as u128
    }

    /// The digit value of a single cell.
    pub fn digit(&self, entry: &Entry) -> u128 {
        let width = self.width() as u128;
        let states = self.num_states as u128;
        let direction = match entry.direction {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Stop => return self.stop_digit(),
        };
        entry.write as u128 + entry.next as u128 * width + direction * width * states
    }

    /// The canonical index of this table.
    ///
    /// Saturates at `u128::MAX` for shapes whose configuration space does not fit; it is then
    /// only a progress key, not an identifier.
    pub fn index(&self) -> u128 {
        let radix = self.radix();
        let mut index: u128 = 0;
        let mut power: u128 = 1;
        for entry in &self.entries {
            index = index.saturating_add(power.saturating_mul(self.digit(entry)));
            power = power.saturating_mul(radix);
        }
        index
    }

    /// The number of tables of this shape, if it fits in a `u128`.
    pub fn space_size(&self) -> Option<u128> {
        let exponent = u32::try_from(self.entries.len()).ok()?;
        self.radix().checked_pow(exponent)
    }

    /// Advances to the next table in enumeration order.
    ///
    /// Within a cell, `write` varies fastest, then `next`, then the direction
    /// (`Left`, `Right`, `Stop`). A cell that becomes `Stop` takes the canonical placeholders
    /// (write the mark, next the last state) and is a single configuration: advancing it wraps
    /// the cell back to the all-zero entry and carries into the following cell.
    ///
    /// Returns `true` if the whole table wrapped around to the all-zero table.
    pub fn advance(&mut self) -> bool {
        let charset_max = self.charset_max;
        let last_state = self.num_states - 1;
        let stop = self.stop_entry();

        for entry in &mut self.entries {
            if entry.direction == Direction::Stop {
                *entry = Entry::default();
                continue;
            }
            if entry.write < charset_max {
                entry.write += 1;
                return false;
            }
            entry.write = 0;
            if entry.next < last_state {
                entry.next += 1;
                return false;
            }
            entry.next = 0;
            if entry.direction == Direction::Left {
                entry.direction = Direction::Right;
            } else {
                *entry = stop;
            }
            return false;
        }

        true
    }

    /// The canonical `Stop` entry used by the enumeration.
    pub fn stop_entry(&self) -> Entry {
        Entry::new(
            MARK_SYMBOL.min(self.charset_max),
            Direction::Stop,
            self.num_states - 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Left, Right, Stop};

    fn bb2() -> TransitionTable {
        TransitionTable::from_rows(
            1,
            vec![
                vec![Entry::new(1, Right, 1), Entry::new(1, Left, 1)],
                vec![Entry::new(1, Left, 0), Entry::new(1, Stop, 1)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_table_is_all_zero() {
        let table = TransitionTable::new(5, 1);
        assert_eq!(table.entries().len(), 10);
        assert_eq!(table.index(), 0);
        assert!(!table.contains_stop());
    }

    #[test]
    fn test_classical_radix_and_sentinel() {
        let table = TransitionTable::new(5, 1);
        assert_eq!(table.radix(), 21);
        assert_eq!(table.stop_digit(), 20);
        assert_eq!(table.space_size(), Some(16_679_880_978_201));
    }

    #[test]
    fn test_get_and_set() {
        let mut table = TransitionTable::new(3, 2);
        table.set(2, 1, Entry::new(2, Right, 0));
        assert_eq!(*table.get(2, 1), Entry::new(2, Right, 0));
        assert_eq!(table.row(2)[1], Entry::new(2, Right, 0));
        assert_eq!(*table.get(1, 1), Entry::default());
    }

    #[test]
    fn test_digit_values() {
        let table = TransitionTable::new(5, 1);
        assert_eq!(table.digit(&Entry::new(1, Left, 0)), 1);
        assert_eq!(table.digit(&Entry::new(0, Left, 1)), 2);
        assert_eq!(table.digit(&Entry::new(1, Right, 4)), 19);
        assert_eq!(table.digit(&Entry::new(0, Stop, 3)), 20);
    }

    #[test]
    fn test_index_of_known_table() {
        // Cells in scan order: 1RB = 7, 1LB = 3, 1LA = 1, halt = 8, radix 9.
        assert_eq!(bb2().index(), 7 + 3 * 9 + 81 + 8 * 729);
        assert_eq!(bb2().index(), 5947);
    }

    #[test]
    fn test_successor_is_exhaustive_and_cyclic() {
        for (num_states, charset_max, expected) in [(1, 0, 3), (1, 1, 25), (2, 1, 6561)] {
            let start = TransitionTable::new(num_states, charset_max);
            let mut table = start.clone();
            let mut applications = 0u32;
            loop {
                applications += 1;
                let wrapped = table.advance();
                if table == start {
                    assert!(wrapped);
                    break;
                }
                assert!(!wrapped);
            }
            assert_eq!(applications, expected);
            assert_eq!(Some(applications as u128), start.space_size());
        }
    }

    #[test]
    fn test_successor_increments_index() {
        let mut table = TransitionTable::new(2, 1);
        for expected in 1..6561u128 {
            assert!(!table.advance());
            assert_eq!(table.index(), expected);
        }
        assert!(table.advance());
        assert_eq!(table.index(), 0);
    }

    #[test]
    fn test_stop_snaps_to_placeholders() {
        let mut table = TransitionTable::new(3, 1);
        table.set(0, 0, Entry::new(1, Right, 2));
        table.advance();
        assert_eq!(*table.get(0, 0), Entry::new(1, Stop, 2));
        table.advance();
        assert_eq!(*table.get(0, 0), Entry::default());
        assert_eq!(*table.get(0, 1), Entry::new(1, Left, 0));
    }

    #[test]
    fn test_stop_placeholder_in_single_symbol_alphabet() {
        let table = TransitionTable::new(2, 0);
        assert_eq!(table.stop_entry(), Entry::new(0, Stop, 1));
    }

    #[test]
    fn test_from_index_inverts_index() {
        let mut table = TransitionTable::new(2, 1);
        for _ in 0..2000 {
            let decoded = TransitionTable::from_index(2, 1, table.index());
            assert_eq!(decoded, table);
            table.advance();
        }
        assert_eq!(TransitionTable::from_index(2, 1, bb2().index()), bb2());
    }

    #[test]
    fn test_contains_stop() {
        assert!(bb2().contains_stop());
        assert!(!TransitionTable::new(2, 1).contains_stop());
    }

    #[test]
    fn test_validate_rejects_bad_next_state() {
        let result = TransitionTable::from_rows(
            0,
            vec![vec![Entry::new(0, Right, 1)]],
        );
        assert!(matches!(result, Err(BeaverError::ValidationError(_))));
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = TransitionTable::from_rows(
            1,
            vec![vec![Entry::new(0, Right, 0)]],
        );
        let error = result.unwrap_err();
        assert!(error.to_string().contains("expected 2"));
    }
}
