//! Terminal output formatting for the dte CLI.
//!
//! Status lines go to stderr so they never mix with rendered output on stdout.
//! Colors come from the [`console`] crate.

use console::style;

/// Print a bold cyan header with an underline separator.
pub fn print_header(text: &str) {
    eprintln!("\n{}", style(text).bold().cyan());
    eprintln!("{}", style("=".repeat(text.len())).dim());
}

/// Print a warning message prefixed with yellow `[WARN]`.
pub fn print_warning(text: &str) {
    eprintln!("{} {}", style("[WARN]").yellow().bold(), text);
}

/// Print a key-value pair with dimmed key formatting.
pub fn print_key_value(key: &str, value: &str) {
    eprintln!("  {}: {}", style(key).dim(), value);
}

/// Print script text to stdout with a dimmed line-number gutter.
pub fn print_numbered(text: &str) {
    for (i, line) in text.lines().enumerate() {
        println!("{} {}", style(format!("{:>4}:", i + 1)).dim(), line);
    }
}
