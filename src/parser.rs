//! This module provides the parsers for transition table (`.tm`) and tape (`.tape`) files,
//! utilizing the `pest` crate. The grammar in `grammar.pest` only checks the shape of each line;
//! everything else (ordering of directives, ranges, duplicates, dangling state references) is
//! checked here and reported against the offending span.

use crate::table::TransitionTable;
use crate::tape::Tape;
use crate::types::{
    BeaverError, Direction, Entry, State, Symbol, MAX_DEFINITION_SIZE, MAX_TAPE_POSITION,
};
use pest::{
    error::{Error, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;
use std::str::FromStr;

/// Derives a `PestParser` for the table and tape grammars defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct BeaverParser;

/// A state whose rows are still being read.
struct PendingState<'i> {
    span: Span<'i>,
    cells: Vec<Option<Entry>>,
}

/// Parses a transition table definition.
///
/// The load succeeds or fails as a unit: no partial table is ever returned.
///
/// # Arguments
///
/// * `input` - The content of a `.tm` file.
///
/// # Returns
///
/// * `Ok(TransitionTable)` if every `(state, input)` cell is defined exactly once.
/// * `Err(BeaverError::ParseError)` for syntax errors and semantic errors tied to a line.
/// * `Err(BeaverError::ValidationError)` for errors that concern the table as a whole.
pub fn parse_table(input: &str) -> Result<TransitionTable, BeaverError> {
    check_size(input)?;
    let root = parse_root(Rule::table, input)?;

    let mut charset_max: Option<Symbol> = None;
    let mut states: Vec<PendingState> = Vec::new();
    let mut references: Vec<(State, Span)> = Vec::new();

    for pair in root.into_inner() {
        let span = pair.as_span();

        match pair.as_rule() {
            Rule::charset_max => {
                if charset_max.is_some() {
                    return Err(parse_error("Duplicate 'charset_max' declaration", span));
                }
                let value = next_pair(&mut pair.into_inner(), span)?;
                charset_max = Some(parse_number::<Symbol>(value, "charset_max")?);
            }
            Rule::state_header => {
                let width = match charset_max {
                    Some(c) => c as usize + 1,
                    None => {
                        return Err(parse_error("'charset_max' must come before 'state'", span))
                    }
                };
                if let Some(index) = pair.into_inner().next() {
                    let index: State = parse_number(index, "state")?;
                    if index != states.len() {
                        return Err(parse_error(
                            &format!("Expected state {}, found state {}", states.len(), index),
                            span,
                        ));
                    }
                }
                states.push(PendingState {
                    span,
                    cells: vec![None; width],
                });
            }
            Rule::entry => {
                let index = states.len().checked_sub(1);
                let (index, state) = match (index, states.last_mut()) {
                    (Some(index), Some(state)) => (index, state),
                    _ => return Err(parse_error("'state' must come before 'input'", span)),
                };
                let symbol_max = state.cells.len() as u64 - 1;

                let mut fields = pair.into_inner();
                let input = parse_symbol(next_pair(&mut fields, span)?, symbol_max, "input")?;
                let write = parse_symbol(next_pair(&mut fields, span)?, symbol_max, "write")?;
                let direction = parse_direction(next_pair(&mut fields, span)?)?;
                let next = next_pair(&mut fields, span)?;
                let next_span = next.as_span();
                let next: State = parse_number(next, "next")?;

                let cell = &mut state.cells[input as usize];
                if cell.is_some() {
                    return Err(parse_error(
                        &format!("Duplicate entry for state {} input {}", index, input),
                        span,
                    ));
                }
                *cell = Some(Entry::new(write, direction, next));
                references.push((next, next_span));
            }
            _ => {} // Comments and EOI
        }
    }

    let charset_max = charset_max.ok_or_else(|| {
        BeaverError::ValidationError("Missing 'charset_max' declaration".to_string())
    })?;
    if states.is_empty() {
        return Err(BeaverError::ValidationError(
            "Table defines no states".to_string(),
        ));
    }

    // Forward references are fine; references past the last state are not.
    if let Some((next, span)) = references.iter().find(|(next, _)| *next >= states.len()) {
        return Err(parse_error(
            &format!("Reference to non-existent state {}", next),
            *span,
        ));
    }

    let mut rows = Vec::with_capacity(states.len());
    for (index, state) in states.into_iter().enumerate() {
        let mut row = Vec::with_capacity(state.cells.len());
        for (input, cell) in state.cells.into_iter().enumerate() {
            match cell {
                Some(entry) => row.push(entry),
                None => {
                    return Err(parse_error(
                        &format!("State {} has no entry for input {}", index, input),
                        state.span,
                    ))
                }
            }
        }
        rows.push(row);
    }

    TransitionTable::from_rows(charset_max, rows)
}

/// Parses a tape definition for a machine running `table`.
///
/// # Arguments
///
/// * `input` - The content of a `.tape` file.
/// * `table` - The table the tape is meant for; bounds the symbols and the initial state.
///
/// # Returns
///
/// * `Ok((Tape, State))` with the head placed on the `head` cell (position 0 if none) and the
///   initial state (0 if none).
/// * `Err(BeaverError::ParseError)` if the tape is malformed or inconsistent with `table`.
pub fn parse_tape(input: &str, table: &TransitionTable) -> Result<(Tape, State), BeaverError> {
    check_size(input)?;
    let root = parse_root(Rule::tape, input)?;
    let charset_max = table.charset_max() as u64;

    let mut start: i64 = 0;
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut head: Option<i64> = None;
    let mut state: Option<State> = None;

    for pair in root.into_inner() {
        let span = pair.as_span();

        match pair.as_rule() {
            Rule::start => {
                start = parse_number(next_pair(&mut pair.into_inner(), span)?, "start")?;
                if !(-MAX_TAPE_POSITION..=MAX_TAPE_POSITION).contains(&start) {
                    return Err(parse_error(
                        &format!(
                            "Start position {} is outside the addressable tape (±{})",
                            start, MAX_TAPE_POSITION
                        ),
                        span,
                    ));
                }
            }
            rule @ (Rule::cell | Rule::head_cell) => {
                let value = next_pair(&mut pair.into_inner(), span)?;
                let symbol = parse_symbol(value, charset_max, "tape symbol")?;

                let position = start + symbols.len() as i64;
                if position > MAX_TAPE_POSITION {
                    return Err(parse_error(
                        &format!("Tape cell at position {} is outside the addressable tape", position),
                        span,
                    ));
                }

                if rule == Rule::head_cell {
                    if head.is_some() {
                        return Err(parse_error("Multiple head locations given", span));
                    }
                    head = Some(position);
                }
                symbols.push(symbol);
            }
            Rule::initial_state => {
                if state.is_some() {
                    return Err(parse_error("Multiple initial states given", span));
                }
                let value: State = parse_number(next_pair(&mut pair.into_inner(), span)?, "state")?;
                if value >= table.num_states() {
                    return Err(parse_error(
                        &format!(
                            "Initial state {} does not exist (table has {} states)",
                            value,
                            table.num_states()
                        ),
                        span,
                    ));
                }
                state = Some(value);
            }
            _ => {} // Comments and EOI
        }
    }

    let tape = Tape::from_symbols(start, &symbols, head.unwrap_or(0));
    Ok((tape, state.unwrap_or(0)))
}

/// Creates a `BeaverError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> BeaverError {
    BeaverError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

fn check_size(input: &str) -> Result<(), BeaverError> {
    if input.len() > MAX_DEFINITION_SIZE {
        return Err(BeaverError::ValidationError(format!(
            "Definition is {} bytes, the limit is {}",
            input.len(),
            MAX_DEFINITION_SIZE
        )));
    }
    Ok(())
}

/// Runs the grammar and returns the single top-level pair.
fn parse_root(rule: Rule, input: &str) -> Result<Pair<Rule>, BeaverError> {
    BeaverParser::parse(rule, input)
        .map_err(|e| BeaverError::ParseError(Box::new(e)))?
        .next()
        .ok_or_else(|| BeaverError::ValidationError("Empty definition".to_string()))
}

/// Takes the next inner pair of a directive whose grammar guarantees one.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, span: Span<'i>) -> Result<Pair<'i, Rule>, BeaverError> {
    pairs
        .next()
        .ok_or_else(|| parse_error("Incomplete directive", span))
}

/// Parses a numeric token, reporting overflow against the token.
fn parse_number<T: FromStr>(pair: Pair<Rule>, what: &str) -> Result<T, BeaverError> {
    pair.as_str().parse::<T>().map_err(|_| {
        parse_error(
            &format!("Bad value for {}: {}", what, pair.as_str()),
            pair.as_span(),
        )
    })
}

/// Parses a symbol token and checks it against the alphabet.
fn parse_symbol(pair: Pair<Rule>, charset_max: u64, what: &str) -> Result<Symbol, BeaverError> {
    let span = pair.as_span();
    let value: u64 = parse_number(pair, what)?;
    if value > charset_max {
        return Err(parse_error(
            &format!(
                "Bad value for {}: {} is above charset_max {}",
                what, value, charset_max
            ),
            span,
        ));
    }
    Ok(value as Symbol)
}

fn parse_direction(pair: Pair<Rule>) -> Result<Direction, BeaverError> {
    pair.as_str()
        .chars()
        .next()
        .and_then(Direction::from_code)
        .ok_or_else(|| {
            parse_error(
                &format!("Unsupported move: {}", pair.as_str()),
                pair.as_span(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction::{Left, Right, Stop};
    use pest::error::LineColLocation;

    const BB2: &str = "# two state busy beaver

charset_max 1

state 0
input 0 write 1 move R next 1
input 1 write 1 move L next 1

state 1
input 0 write 1 move L next 0
input 1 write 1 move S next 1
";

    fn error_line(error: BeaverError) -> usize {
        match error {
            BeaverError::ParseError(e) => match e.line_col {
                LineColLocation::Pos((line, _)) => line,
                LineColLocation::Span((line, _), _) => line,
            },
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_busy_beaver() {
        let table = parse_table(BB2).unwrap();
        assert_eq!(table.num_states(), 2);
        assert_eq!(table.charset_max(), 1);
        assert_eq!(*table.get(0, 0), Entry::new(1, Right, 1));
        assert_eq!(*table.get(0, 1), Entry::new(1, Left, 1));
        assert_eq!(*table.get(1, 0), Entry::new(1, Left, 0));
        assert_eq!(*table.get(1, 1), Entry::new(1, Stop, 1));
    }

    #[test]
    fn test_bare_state_headers_and_crlf() {
        let input = "charset_max 0\r\nstate\r\n  input 0 write 0 move R next 1\r\nstate\r\ninput 0 write 0 move S next 0\r\n";
        let table = parse_table(input).unwrap();
        assert_eq!(table.num_states(), 2);
        assert_eq!(*table.get(1, 0), Entry::new(0, Stop, 0));
    }

    #[test]
    fn test_forward_reference_is_allowed() {
        let input = "charset_max 0\nstate 0\ninput 0 write 0 move R next 2\nstate 1\ninput 0 write 0 move R next 0\nstate 2\ninput 0 write 0 move S next 0";
        assert!(parse_table(input).is_ok());
    }

    #[test]
    fn test_undefined_state_reported_at_reference() {
        let input = "charset_max 0\nstate 0\ninput 0 write 0 move R next 0\n\nstate 1\ninput 0 write 0 move R next 5\n";
        let error = parse_table(input).unwrap_err();
        assert!(error.to_string().contains("non-existent state 5"));
        assert_eq!(error_line(error), 6);
    }

    #[test]
    fn test_duplicate_charset_max() {
        let input = "charset_max 1\ncharset_max 1\n";
        assert_eq!(error_line(parse_table(input).unwrap_err()), 2);
    }

    #[test]
    fn test_state_before_charset_max() {
        let error = parse_table("state 0\n").unwrap_err();
        assert!(error.to_string().contains("'charset_max' must come before 'state'"));
    }

    #[test]
    fn test_input_before_state() {
        let error = parse_table("charset_max 0\ninput 0 write 0 move S next 0\n").unwrap_err();
        assert_eq!(error_line(error), 2);
    }

    #[test]
    fn test_symbol_out_of_range() {
        let input = "charset_max 1\nstate\ninput 2 write 0 move S next 0\n";
        let error = parse_table(input).unwrap_err();
        assert!(error.to_string().contains("Bad value for input"));

        let input = "charset_max 1\nstate\ninput 0 write 7 move S next 0\n";
        let error = parse_table(input).unwrap_err();
        assert!(error.to_string().contains("Bad value for write"));
    }

    #[test]
    fn test_charset_max_overflow() {
        let error = parse_table("charset_max 256\n").unwrap_err();
        assert_eq!(error_line(error), 1);
    }

    #[test]
    fn test_duplicate_and_missing_cells() {
        let duplicate = "charset_max 1\nstate\ninput 0 write 0 move S next 0\ninput 0 write 1 move S next 0\ninput 1 write 0 move S next 0\n";
        assert_eq!(error_line(parse_table(duplicate).unwrap_err()), 4);

        let missing = "charset_max 1\n\nstate\ninput 0 write 0 move S next 0\n";
        let error = parse_table(missing).unwrap_err();
        assert!(error.to_string().contains("no entry for input 1"));
        assert_eq!(error_line(error), 3);
    }

    #[test]
    fn test_out_of_order_state_index() {
        let input = "charset_max 0\nstate 1\n";
        let error = parse_table(input).unwrap_err();
        assert!(error.to_string().contains("Expected state 0"));
    }

    #[test]
    fn test_invalid_lines() {
        assert!(parse_table("charset_max 1\nstate\ninput 0 write 1 move X next 0\n").is_err());
        assert!(parse_table("charset_max 1\nhello\n").is_err());
        assert!(matches!(
            parse_table("# nothing here\n"),
            Err(BeaverError::ValidationError(_))
        ));
        assert!(matches!(
            parse_table("charset_max 1\n"),
            Err(BeaverError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_tape() {
        let table = parse_table(BB2).unwrap();
        let input = "# a tape\nstart -2\n1\n0\n# tape head at 0\nhead 1\n1\nstate 1\n";
        let (tape, state) = parse_tape(input, &table).unwrap();

        assert_eq!(state, 1);
        assert_eq!(tape.head(), 0);
        assert_eq!(tape.get(-2), 1);
        assert_eq!(tape.get(-1), 0);
        assert_eq!(tape.get(0), 1);
        assert_eq!(tape.get(1), 1);
        assert_eq!(tape.one_count(), 3);
    }

    #[test]
    fn test_tape_defaults() {
        let table = parse_table(BB2).unwrap();
        let (tape, state) = parse_tape("# empty\nstart 0\n", &table).unwrap();
        assert_eq!(state, 0);
        assert_eq!(tape, Tape::new());
    }

    #[test]
    fn test_tape_errors() {
        let table = parse_table(BB2).unwrap();

        let missing_comment = "start 0\n1\n";
        assert!(parse_tape(missing_comment, &table).is_err());

        let missing_start = "# tape\n1\n";
        assert!(parse_tape(missing_start, &table).is_err());

        let two_heads = "# tape\nstart 0\nhead 1\nhead 0\n";
        assert_eq!(error_line(parse_tape(two_heads, &table).unwrap_err()), 4);

        let two_states = "# tape\nstart 0\nstate 0\nstate 1\n";
        assert_eq!(error_line(parse_tape(two_states, &table).unwrap_err()), 4);

        let big_symbol = "# tape\nstart 0\n0\n2\n";
        assert_eq!(error_line(parse_tape(big_symbol, &table).unwrap_err()), 4);

        let bad_state = "# tape\nstart 0\nstate 2\n";
        assert!(parse_tape(bad_state, &table)
            .unwrap_err()
            .to_string()
            .contains("does not exist"));
    }

    #[test]
    fn test_tape_positions_out_of_range() {
        let table = parse_table(BB2).unwrap();

        let far_left = "# tape\nstart -5000000000000000000\n1\n";
        let err = parse_tape(far_left, &table).unwrap_err();
        assert!(matches!(err, BeaverError::ParseError(_)));
        assert_eq!(error_line(err), 2);

        let past_the_end = format!("# tape\nstart {}\n1\n1\n", MAX_TAPE_POSITION);
        assert_eq!(error_line(parse_tape(&past_the_end, &table).unwrap_err()), 4);

        let too_large = "# tape\nstart 99999999999999999999\n";
        assert!(parse_tape(too_large, &table).is_err());
    }

    #[test]
    fn test_size_limit() {
        let input = "#".repeat(MAX_DEFINITION_SIZE + 1);
        assert!(matches!(
            parse_table(&input),
            Err(BeaverError::ValidationError(_))
        ));
    }
}
