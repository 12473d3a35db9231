//! Error localization inside generated SQL
//!
//! Warehouses report the position of a SQL error inside their message text. This module
//! pulls the line number out of the message and renders the surrounding lines of the
//! offending SQL so the report can show where the error is.
//!
//! Only the BigQuery `at [<line>:<column>]` marker is recognized today. Messages from
//! other warehouses yield no line number and no snippet.

use lazy_static::lazy_static;
use regex::Regex;

/// Lines of context shown on each side of the offending line
pub const DEFAULT_WINDOW_SIZE: usize = 2;

const OFFENDING_LINE_MARKER: &str = "*";
const CONTEXT_LINE_MARKER: &str = "|";

lazy_static! {
    static ref BIGQUERY_LINE_NUMBER: Regex =
        Regex::new(r"at \[(\d+):\d+\]").expect("line number pattern is valid");
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub line_number: Option<usize>,
    pub snippet: Option<String>,
}

/// Extracts the 1-indexed line number of a SQL error from a warehouse error message.
pub fn parse_error_line_number(error_message: &str) -> Option<usize> {
    BIGQUERY_LINE_NUMBER
        .captures(error_message)
        .and_then(|captures| captures.get(1))
        .and_then(|line| line.as_str().parse().ok())
}

/// Prefixes the line at `marked_index` with `*` and every other line with `|`.
pub fn mark_line(lines: &[&str], marked_index: usize) -> Vec<String> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let marker = if i == marked_index {
                OFFENDING_LINE_MARKER
            } else {
                CONTEXT_LINE_MARKER
            };
            format!("{} {}", marker, line)
        })
        .collect()
}

/// Renders up to `2 * window_size + 1` lines of `sql` centered on 1-indexed `line_number`.
///
/// The window is clamped at the start and end of the SQL; the marked line is always
/// `line_number` itself. Returns `None` when the line does not exist.
pub fn extract_sql_context(sql: &str, line_number: usize, window_size: usize) -> Option<String> {
    let lines: Vec<&str> = sql.split('\n').collect();
    if line_number == 0 || line_number > lines.len() {
        return None;
    }

    let index = line_number - 1;
    let start = index.saturating_sub(window_size);
    let end = (index + window_size + 1).min(lines.len());

    Some(mark_line(&lines[start..end], index - start).join("\n"))
}

/// Locates the error described by `error_message` inside `sql`.
pub fn extract_error_context(sql: &str, error_message: &str, window_size: usize) -> ErrorContext {
    let Some(line_number) = parse_error_line_number(error_message) else {
        return ErrorContext::default();
    };

    ErrorContext {
        line_number: Some(line_number),
        snippet: extract_sql_context(sql, line_number, window_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_sql(lines: usize) -> String {
        (1..=lines)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_error_line_number() {
        assert_eq!(
            parse_error_line_number("Syntax error: Unexpected keyword FROM at [17:1]"),
            Some(17)
        );
    }

    #[test]
    fn test_parse_error_line_number_without_marker() {
        assert_eq!(
            parse_error_line_number("ERROR: column \"nope\" does not exist"),
            None
        );
    }

    #[test]
    fn test_mark_line() {
        let marked = mark_line(&["a", "b", "c"], 1);
        assert_eq!(marked, vec!["| a", "* b", "| c"]);
    }

    #[test]
    fn test_context_centered_on_line() {
        let sql = numbered_sql(10);
        let context = extract_sql_context(&sql, 5, 2).unwrap();
        assert_eq!(
            context,
            "| line 3\n| line 4\n* line 5\n| line 6\n| line 7"
        );
    }

    #[test]
    fn test_context_clamped_at_first_line() {
        let sql = numbered_sql(10);
        let context = extract_sql_context(&sql, 1, 2).unwrap();
        assert_eq!(context, "* line 1\n| line 2\n| line 3");
    }

    #[test]
    fn test_context_clamped_near_start() {
        let sql = numbered_sql(10);
        let context = extract_sql_context(&sql, 2, 2).unwrap();
        assert_eq!(context, "| line 1\n* line 2\n| line 3\n| line 4");
    }

    #[test]
    fn test_context_clamped_at_last_line() {
        let sql = numbered_sql(10);
        let context = extract_sql_context(&sql, 10, 2).unwrap();
        assert_eq!(context, "| line 8\n| line 9\n* line 10");
    }

    #[test]
    fn test_context_out_of_range() {
        let sql = numbered_sql(3);
        assert_eq!(extract_sql_context(&sql, 0, 2), None);
        assert_eq!(extract_sql_context(&sql, 4, 2), None);
    }

    #[test]
    fn test_extract_error_context_marks_reported_line() {
        let sql = numbered_sql(6);
        let context = extract_error_context(&sql, "Unrecognized name: x at [4:9]", 2);
        assert_eq!(context.line_number, Some(4));
        let snippet = context.snippet.unwrap();
        let marked: Vec<&str> = snippet.lines().filter(|l| l.starts_with('*')).collect();
        assert_eq!(marked, vec!["* line 4"]);
        assert_eq!(snippet.lines().count(), 5);
    }

    #[test]
    fn test_extract_error_context_without_marker() {
        let context = extract_error_context("SELECT 1", "something broke", 2);
        assert_eq!(context, ErrorContext::default());
    }
}
