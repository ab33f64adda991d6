//! Human-readable diagnostics for templates whose generated script failed to compile.
//!
//! For every syntax error the report shows the compiler message above a window
//! of template lines around the mapped position, followed by the same window
//! over the generated script at the unmapped position:
//!
//! ```text
//!
//! Expecting '}' to end this statement block
//!
//!    1:Title
//!    2:<% if (ready) { %>
//! ====:  ^
//!    3:Body
//!
//! The template was parsed into following script:
//!
//!    1:print(`Title
//!    ...
//! ```

use crate::engine::{CompileFailure, SyntaxError};
use crate::position::{Position, PositionMap};

/// Header of the generated-script block of each error.
pub const SCRIPT_HEADER: &str = "The template was parsed into following script:";

/// Lines shown on each side of the error line.
const CONTEXT_LINES: usize = 5;

/// Width of the line-number gutter.
const GUTTER: usize = 4;

/// Build the full report for `failure`.
pub fn describe(
    failure: &CompileFailure,
    template: &str,
    script: &str,
    positions: &PositionMap,
) -> String {
    let template_lines = split_lines(template);
    let script_lines = split_lines(script);

    let mut details = Vec::new();
    for error in &failure.errors {
        details.extend(describe_error(error, &template_lines, &script_lines, positions));
    }
    details.join("\n")
}

fn describe_error(
    error: &SyntaxError,
    template_lines: &[&str],
    script_lines: &[&str],
    positions: &PositionMap,
) -> Vec<String> {
    let generated = Position::at(error.line, error.column);
    let resolved = positions.resolve(generated);

    let mut details = context(template_lines, &error.message, resolved);
    details.extend(context(script_lines, SCRIPT_HEADER, generated));
    details.push(String::new());
    details
}

/// A message followed by the numbered lines around `at`, with a caret line
/// under the line `at` points to.
fn context(lines: &[&str], message: &str, at: Position) -> Vec<String> {
    let mut details = vec![String::new(), message.to_string(), String::new()];
    if lines.is_empty() {
        return details;
    }

    let first = at.line.saturating_sub(CONTEXT_LINES).max(1);
    let last = (at.line + CONTEXT_LINES).min(lines.len());
    for number in first..=last {
        details.push(format!("{:>width$}:{}", number, lines[number - 1], width = GUTTER));
        if number == at.line {
            details.push(format!(
                "{}:{}^",
                "=".repeat(GUTTER),
                " ".repeat(at.column.saturating_sub(1))
            ));
        }
    }
    details
}

/// Split on `\n`, drop trailing empty lines and any `\r` left at line ends.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(line: usize, column: usize) -> CompileFailure {
        CompileFailure {
            errors: vec![SyntaxError {
                message: "unexpected token".into(),
                line,
                column,
            }],
        }
    }

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line{i}\n")).collect()
    }

    #[test]
    fn test_context_window_is_clamped() {
        let text = numbered(20);
        let lines = split_lines(&text);
        let details = context(&lines, "msg", Position::at(10, 3));
        assert_eq!(details[1], "msg");
        assert_eq!(details[3], "   5:line5");
        assert_eq!(details.last().unwrap(), "  15:line15");
        assert!(details.contains(&"====:  ^".to_string()));

        let details = context(&lines, "msg", Position::at(2, 1));
        assert_eq!(details[3], "   1:line1");
        assert_eq!(details.last().unwrap(), "   7:line7");

        let details = context(&lines, "msg", Position::at(19, 1));
        assert_eq!(details[3], "  14:line14");
        assert_eq!(details.last().unwrap(), "  20:line20");
    }

    #[test]
    fn test_caret_sits_under_the_error_line() {
        let lines = split_lines("a\nbcd\ne");
        let details = context(&lines, "msg", Position::at(2, 3));
        let idx = details.iter().position(|l| l == "   2:bcd").unwrap();
        assert_eq!(details[idx + 1], "====:  ^");
        assert_eq!(details[idx + 2], "   3:e");
    }

    #[test]
    fn test_sentinel_position_has_no_caret() {
        let text = numbered(12);
        let lines = split_lines(&text);
        let details = context(&lines, "msg", Position::NOT_FOUND);
        assert_eq!(details[3], "   1:line1");
        assert_eq!(details.last().unwrap(), "   5:line5");
        assert!(!details.iter().any(|l| l.starts_with("====")));
    }

    #[test]
    fn test_describe_maps_error_into_template() {
        let template = "first\nsecond <% bad %>\nthird";
        let script = "print(`first\nsecond `); bad ;\nprint(`\nthird`);";
        let mut positions = PositionMap::new();
        positions.record(Position::at(2, 11), Position::at(2, 12));

        let report = describe(&failure(2, 11), template, script, &positions);
        let lines: Vec<&str> = report.split('\n').collect();

        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "unexpected token");
        assert_eq!(lines[3], "   1:first");
        assert_eq!(lines[4], "   2:second <% bad %>");
        assert_eq!(lines[5], format!("====:{}^", " ".repeat(11)));
        assert_eq!(lines[6], "   3:third");
        assert_eq!(lines[8], SCRIPT_HEADER);
        assert!(report.contains(&format!("   2:second `); bad ;\n====:{}^", " ".repeat(10))));
        assert!(report.ends_with("\n"));
    }

    #[test]
    fn test_describe_unmapped_error_uses_sentinel() {
        let report = describe(&failure(9, 1), "only line", "print(`only line`);", &PositionMap::new());
        assert!(report.contains("   1:only line"));
        assert!(!report.contains("===="));
    }

    #[test]
    fn test_describe_multiple_errors_in_order() {
        let failure = CompileFailure {
            errors: vec![
                SyntaxError { message: "first error".into(), line: 1, column: 1 },
                SyntaxError { message: "second error".into(), line: 1, column: 2 },
            ],
        };
        let report = describe(&failure, "x", "y", &PositionMap::new());
        let first = report.find("first error").unwrap();
        let second = report.find("second error").unwrap();
        assert!(first < second);
        assert_eq!(report.matches(SCRIPT_HEADER).count(), 2);
    }

    #[test]
    fn test_describe_no_errors_is_empty() {
        let report = describe(&CompileFailure::default(), "x", "y", &PositionMap::new());
        assert!(report.is_empty());
    }

    #[test]
    fn test_split_lines_drops_trailing_blank_lines() {
        assert_eq!(split_lines("a\r\nb\n\n\n"), vec!["a", "b"]);
        assert!(split_lines("").is_empty());
    }
}
