//! The unbounded, bidirectional tape.
//!
//! Head positions are signed and unbounded in both directions. Storage is a single vector
//! addressed through a zig-zag mapping: position `h >= 0` lives at index `2h` and position
//! `h < 0` at index `-(2h + 1)`. Growth in either direction therefore extends the same vector
//! and no slot is ever wasted.

use crate::types::{Direction, Symbol, BLANK_SYMBOL, MARK_SYMBOL};

/// Maps a head position to its storage index.
#[inline]
pub fn index_of(position: i64) -> usize {
    if position >= 0 {
        (position as usize) * 2
    } else {
        (-(position * 2 + 1)) as usize
    }
}

/// Maps a storage index back to its head position. Inverse of [`index_of`].
#[inline]
pub fn position_of(index: usize) -> i64 {
    if index % 2 == 0 {
        (index / 2) as i64
    } else {
        -(((index + 1) / 2) as i64)
    }
}

/// A growable tape with a head.
///
/// Storage only ever grows during a machine's lifetime; [`Tape::blank`] is the only way to
/// release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<Symbol>,
    head: i64,
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

impl Tape {
    /// Creates a blank tape with the head at position 0.
    pub fn new() -> Self {
        let mut tape = Self {
            cells: Vec::new(),
            head: 0,
        };
        tape.ensure_capacity(0);
        tape
    }

    /// Creates a tape holding `symbols` from position `start` rightwards, head at `head`.
    pub fn from_symbols(start: i64, symbols: &[Symbol], head: i64) -> Self {
        let mut tape = Self::new();
        for (offset, &symbol) in symbols.iter().enumerate() {
            tape.write(start + offset as i64, symbol);
        }
        tape.set_head(head);
        tape
    }

    /// Grows storage so that `position` is addressable. New cells are blank.
    ///
    /// Allocation failure aborts the process: the tape has no degraded mode.
    #[inline]
    pub fn ensure_capacity(&mut self, position: i64) {
        let index = index_of(position);
        if index >= self.cells.len() {
            self.cells.resize(index + 1, BLANK_SYMBOL);
        }
    }

    /// The storage length the tape would have after ensuring `position`.
    #[inline]
    pub fn required_len(&self, position: i64) -> usize {
        self.cells.len().max(index_of(position) + 1)
    }

    #[inline]
    pub fn read(&mut self, position: i64) -> Symbol {
        self.ensure_capacity(position);
        self.cells[index_of(position)]
    }

    #[inline]
    pub fn write(&mut self, position: i64, symbol: Symbol) {
        self.ensure_capacity(position);
        self.cells[index_of(position)] = symbol;
    }

    /// Reads the symbol under the head.
    #[inline]
    pub fn read_head(&self) -> Symbol {
        // The head cell is always allocated: every head change goes through `ensure_capacity`.
        self.cells[index_of(self.head)]
    }

    /// Writes the symbol under the head.
    #[inline]
    pub fn write_head(&mut self, symbol: Symbol) {
        let index = index_of(self.head);
        self.cells[index] = symbol;
    }

    /// Moves the head one cell, growing storage as needed.
    ///
    /// Returns `false` for `Stop`, which leaves the head in place and signals termination.
    #[inline]
    pub fn move_head(&mut self, direction: Direction) -> bool {
        match direction.offset() {
            Some(offset) => {
                self.head += offset;
                self.ensure_capacity(self.head);
                true
            }
            None => false,
        }
    }

    /// Releases all storage and resets the head to position 0.
    pub fn blank(&mut self) {
        self.cells = Vec::new();
        self.head = 0;
        self.ensure_capacity(0);
    }

    /// Counts the cells holding the mark symbol.
    pub fn one_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|&&symbol| symbol == MARK_SYMBOL)
            .count()
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    /// Places the head at `position`, growing storage as needed.
    pub fn set_head(&mut self, position: i64) {
        self.head = position;
        self.ensure_capacity(position);
    }

    /// The storage length, in cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The inclusive range of positions covered by storage.
    ///
    /// Indices `0..len` always cover a contiguous run of positions around 0.
    pub fn extent(&self) -> (i64, i64) {
        let far = position_of(self.cells.len().saturating_sub(1));
        if far >= 0 {
            (-far, far)
        } else {
            (far, -(far + 1))
        }
    }

    /// Returns the symbol at `position` without growing storage.
    pub fn get(&self, position: i64) -> Symbol {
        self.cells
            .get(index_of(position))
            .copied()
            .unwrap_or(BLANK_SYMBOL)
    }

    /// The stored symbols, ordered left to right by position.
    pub fn symbols(&self) -> Vec<Symbol> {
        let (left, right) = self.extent();
        (left..=right).map(|position| self.get(position)).collect()
    }
}
