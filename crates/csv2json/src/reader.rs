//! Tabular reader: turns an uploaded byte stream into rows of string cells.
//!
//! The first row returned is the header. Every row must have the header's
//! field count; ragged input is rejected instead of padded.

use std::io::Read;

use csv::{ErrorKind, ReaderBuilder};

use crate::error::{Error, Result};
use crate::options::Delimiter;

pub type Row = Vec<String>;

/// Read every record from `reader`, split on `delimiter`.
pub fn read_rows<R: Read>(mut reader: R, delimiter: Delimiter) -> Result<Vec<Row>> {
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .map_err(|e| Error::Parse { line: None, message: e.to_string() })?;
    read_rows_from_slice(&buf, delimiter)
}

pub fn read_rows_from_slice(input: &[u8], delimiter: Delimiter) -> Result<Vec<Row>> {
    check_quotes(input, delimiter.as_byte())?;

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .delimiter(delimiter.as_byte())
        .from_reader(input);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    tracing::debug!(rows = rows.len(), delimiter = %delimiter, "read csv rows");
    Ok(rows)
}

#[derive(Clone, Copy)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    // A `"` inside a quoted field: either the closing quote or the first half
    // of an escaped `""`.
    QuoteInQuoted,
}

/// Strict quoting check, run before the csv crate sees the input.
///
/// The csv crate is lenient: it closes an open quoted field at end of input
/// and keeps stray quotes as text. Here a `"` may only open a field, a closing
/// `"` must be followed by a delimiter, a line break, end of input or a second
/// `"`, and a quoted field must be closed.
fn check_quotes(input: &[u8], delimiter: u8) -> Result<()> {
    use QuoteState::*;

    let mut line = 1u64;
    let mut open_line = 1u64;
    let mut state = FieldStart;
    for &b in input {
        state = match (state, b) {
            (FieldStart, b'"') => {
                open_line = line;
                Quoted
            }
            (Unquoted, b'"') => return Err(Error::parse_at(line, "bare \" in non-quoted-field")),
            (FieldStart | Unquoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (FieldStart | Unquoted, d) if d == delimiter => FieldStart,
            (FieldStart | Unquoted, _) => Unquoted,
            (Quoted, b'"') => QuoteInQuoted,
            (Quoted, b'\n') => {
                line += 1;
                Quoted
            }
            (Quoted, _) => Quoted,
            (QuoteInQuoted, b'"') => Quoted,
            (QuoteInQuoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (QuoteInQuoted, d) if d == delimiter => FieldStart,
            (QuoteInQuoted, b'\r') => Unquoted,
            (QuoteInQuoted, _) => {
                return Err(Error::parse_at(line, "extraneous or missing \" in quoted-field"));
            }
        };
    }
    match state {
        Quoted => Err(Error::parse_at(open_line, "extraneous or missing \" in quoted-field")),
        _ => Ok(()),
    }
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map(|p| p.line());
    let message = match err.kind() {
        ErrorKind::UnequalLengths { expected_len, len, .. } => {
            format!("wrong number of fields: expected {}, found {}", expected_len, len)
        }
        ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8 in field {}", err.field() + 1),
        _ => err.to_string(),
    };
    Error::Parse { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(input: &str, delimiter: Delimiter) -> Result<Vec<Row>> {
        read_rows(input.as_bytes(), delimiter)
    }

    #[test]
    fn reads_header_and_rows_in_order() {
        let out = rows("a,b\n1,2\n3,4\n", Delimiter::Comma).unwrap();
        assert_eq!(out, vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn quoted_fields_keep_separator_newline_and_quotes() {
        let out = rows("a,b\n\"x,y\",\"line1\nline2 \"\"q\"\"\"\n", Delimiter::Comma).unwrap();
        assert_eq!(out[1], vec!["x,y".to_string(), "line1\nline2 \"q\"".to_string()]);
    }

    #[test]
    fn missing_trailing_newline_is_fine() {
        let out = rows("a|b\n1|2", Delimiter::Pipe).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec!["1", "2"]);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(rows("", Delimiter::Comma).unwrap().is_empty());
    }

    #[test]
    fn unequal_field_count_reports_line() {
        let err = rows("a,b\n1,2\n3\n", Delimiter::Comma).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, Some(3));
                assert!(message.contains("expected 2, found 1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let err = rows("a,b\n1,\"open\n2,3\n", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, Error::Parse { line: Some(2), .. }));
    }

    #[test]
    fn text_after_closing_quote_is_rejected() {
        let err = rows("a,b\n1,2\n\"x\"y,2\n", Delimiter::Comma).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, Some(3));
                assert!(message.contains("quoted-field"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_quote_in_unquoted_field_is_rejected() {
        let err = rows("a,b\nx\"y\"z,2\n", Delimiter::Comma).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, Some(2));
                assert!(message.contains("bare"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn closing_quote_before_delimiter_or_line_end() {
        let out = rows("a;b\r\n\"x\";\"y\"\r\n\"\";\"\"\"\"\n", Delimiter::Semicolon).unwrap();
        assert_eq!(out[1], vec!["x", "y"]);
        assert_eq!(out[2], vec!["", "\""]);
    }

    #[test]
    fn quote_at_field_start_depends_on_delimiter() {
        // with `|` as separator, the comma is field text and the quote is bare
        assert!(rows("a|b\n1,\"2\"|3\n", Delimiter::Pipe).is_err());
        assert_eq!(rows("a|b\n1|\"2,3\"\n", Delimiter::Pipe).unwrap()[1], vec!["1", "2,3"]);
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = read_rows(&b"a\n\xff\xfe\n"[..], Delimiter::Comma).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
