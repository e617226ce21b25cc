//! This module provides the writers for the table and tape file formats, plus conversion to and
//! from the compact one-line notation used by the busy beaver community (`1RB1LB_1LA1RZ`).
//!
//! Everything written here reads back through [`crate::parser`] to an identical table or tape.

use std::fmt::Write as _;

use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{BeaverError, Direction, Entry, State, Symbol, MARK_SYMBOL};

/// The state letter that marks a halting cell in compact notation.
const HALT_LETTER: char = 'Z';
/// An undefined cell in compact notation; loaded as a halting cell.
const UNDEFINED_CELL: &str = "---";

/// Encodes a table in the `.tm` file format.
///
/// The header comment records `name` and the table's canonical index, zero-padded to 14
/// digits.
pub fn encode_table(table: &TransitionTable, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}: table {:014}", name, table.index());
    let _ = writeln!(out);
    let _ = writeln!(out, "charset_max {}", table.charset_max());

    for state in 0..table.num_states() {
        let _ = writeln!(out);
        let _ = writeln!(out, "state {}", state);
        for (input, entry) in table.row(state).iter().enumerate() {
            let _ = writeln!(
                out,
                "input {} write {} move {} next {}",
                input,
                entry.write,
                entry.direction.code(),
                entry.next
            );
        }
    }

    out
}

/// Encodes a tape and the machine's current state in the `.tape` file format.
///
/// Every stored cell is written, left to right, so the reloaded tape has the same storage.
pub fn encode_tape(tape: &Tape, state: State) -> String {
    let (left, right) = tape.extent();
    let mut out = String::new();

    let _ = writeln!(out, "# tape: {} frames, head at {}", tape.len(), tape.head());
    let _ = writeln!(out, "start {}", left);
    let _ = writeln!(out, "state {}", state);

    for position in left..=right {
        let symbol = tape.get(position);
        if position == tape.head() {
            let _ = writeln!(out, "# tape head at {}", position);
            let _ = writeln!(out, "head {}", symbol);
        } else {
            let _ = writeln!(out, "{}", symbol);
        }
    }

    out
}

/// Encodes a table in compact notation: one group per state separated by `_`, each cell
/// written as `<write><L|R><next letter>`, halting cells as `<write>RZ`.
///
/// # Returns
///
/// * `Ok(String)` for tables with at most 25 states and 10 symbols.
/// * `Err(BeaverError::ValidationError)` if the shape cannot be expressed.
pub fn encode_compact(table: &TransitionTable) -> Result<String, BeaverError> {
    if table.num_states() > 25 || table.width() > 10 {
        return Err(BeaverError::ValidationError(format!(
            "A {}-state {}-symbol table has no compact notation",
            table.num_states(),
            table.width()
        )));
    }

    let groups: Vec<String> = (0..table.num_states())
        .map(|state| {
            table
                .row(state)
                .iter()
                .map(encode_cell)
                .collect()
        })
        .collect();

    Ok(groups.join("_"))
}

/// Decodes a table from compact notation.
///
/// Halting cells (`Z` as next state, or `---`) become `Stop` entries entering the last state,
/// the same placeholder the search uses.
pub fn decode_compact(input: &str) -> Result<TransitionTable, BeaverError> {
    let groups: Vec<&str> = input.trim().split('_').collect();
    let num_states = groups.len();
    let width = groups[0].len() / 3;

    if width == 0 || width > 10 || num_states > 25 {
        return Err(BeaverError::ValidationError(format!(
            "Invalid compact table: {}",
            input.trim()
        )));
    }
    let charset_max = (width - 1) as Symbol;

    let mut rows = Vec::with_capacity(num_states);
    for (state, group) in groups.iter().enumerate() {
        if group.len() != width * 3 || !group.is_ascii() {
            return Err(BeaverError::ValidationError(format!(
                "State {} is '{}', expected {} cells of 3 characters",
                state_letter(state),
                group,
                width
            )));
        }

        let row = (0..width)
            .map(|cell| decode_cell(&group[cell * 3..cell * 3 + 3], num_states))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    TransitionTable::from_rows(charset_max, rows)
}

fn decode_cell(cell: &str, num_states: usize) -> Result<Entry, BeaverError> {
    let invalid = || BeaverError::ValidationError(format!("Invalid compact cell '{}'", cell));
    let last_state = num_states - 1;

    if cell == UNDEFINED_CELL {
        return Ok(Entry::new(MARK_SYMBOL, Direction::Stop, last_state));
    }

    let mut chars = cell.chars();
    let write = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(invalid)? as Symbol;
    let direction = chars
        .next()
        .and_then(Direction::from_code)
        .ok_or_else(invalid)?;
    let letter = chars.next().ok_or_else(invalid)?;

    if letter == HALT_LETTER || direction == Direction::Stop {
        return Ok(Entry::new(write, Direction::Stop, last_state));
    }
    if !letter.is_ascii_uppercase() {
        return Err(invalid());
    }
    Ok(Entry::new(write, direction, (letter as u8 - b'A') as State))
}

/// Encodes one cell in compact notation, e.g. `1LB`, or `1RZ` for a halting cell.
pub fn encode_cell(entry: &Entry) -> String {
    match entry.direction {
        Direction::Stop => format!("{}R{}", entry.write, HALT_LETTER),
        direction => format!(
            "{}{}{}",
            entry.write,
            direction.code(),
            state_letter(entry.next)
        ),
    }
}

/// The letter naming a state in compact notation and in the terminal UI (`A` is state 0).
pub fn state_letter(state: State) -> char {
    if state < 26 {
        (b'A' + state as u8) as char
    } else {
        '?'
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_table, parse_tape};
    use crate::types::Direction::{Left, Right, Stop};

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
    fn test_encode_cell() {
        assert_eq!(encode_cell(&Entry::new(1, Left, 1)), "1LB");
        assert_eq!(encode_cell(&Entry::new(0, Right, 0)), "0RA");
        assert_eq!(encode_cell(&Entry::new(1, Stop, 3)), "1RZ");
    }
    #[test]
    fn test_encode_table_format() {
        let text = encode_table(&bb2(), "max0004.tm");
        let expected = "# max0004.tm: table 00000000005947

charset_max 1

state 0
input 0 write 1 move R next 1
input 1 write 1 move L next 1

state 1
input 0 write 1 move L next 0
input 1 write 1 move S next 1
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_written_table_reloads_identically() {
        let mut table = TransitionTable::new(3, 2);
        for _ in 0..5000 {
            table.advance();
        }
        table.set(2, 2, Entry::new(0, Stop, 0));

        let reloaded = parse_table(&encode_table(&table, "periodic.tm")).unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn test_encode_tape_format() {
        let tape = Tape::from_symbols(-1, &[1, 1, 0], 0);
        let text = encode_tape(&tape, 1);
        let expected = "# tape: 3 frames, head at 0
start -1
state 1
1
# tape head at 0
head 1
0
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_written_tape_reloads_identically() {
        let tape = Tape::from_symbols(-3, &[1, 0, 1, 1, 0, 1], 2);
        let (reloaded, state) = parse_tape(&encode_tape(&tape, 1), &bb2()).unwrap();
        assert_eq!(reloaded, tape);
        assert_eq!(state, 1);
    }

    #[test]
    fn test_compact_notation() {
        assert_eq!(encode_compact(&bb2()).unwrap(), "1RB1LB_1LA1RZ");
        assert_eq!(decode_compact("1RB1LB_1LA1RZ").unwrap(), bb2());
    }

    #[test]
    fn test_compact_undefined_cell() {
        let table = decode_compact("1RB---_1LA1RZ").unwrap();
        assert_eq!(*table.get(0, 1), Entry::new(1, Stop, 1));
    }

    #[test]
    fn test_compact_rejects_malformed() {
        assert!(decode_compact("").is_err());
        assert!(decode_compact("1RB1LB_1LA").is_err());
        assert!(decode_compact("1XB1LB_1LA1RZ").is_err());
        assert!(decode_compact("1RC1LB_1LA1RZ").is_err());
        assert!(decode_compact("1Rb1LB_1LA1RZ").is_err());
    }

    #[test]
    fn test_state_letters() {
        assert_eq!(state_letter(0), 'A');
        assert_eq!(state_letter(4), 'E');
    }
}
