//! Literal-emission syntax of the script language a template is translated into.
//!
//! The transducer wraps every run of literal template text in a print statement
//! whose argument is an interpolating multi-line string. Script languages
//! disagree on how that string is delimited and which character has to be
//! escaped inside it, so the parser takes these details from a [`Dialect`].

/// Comment appended to every generated script.
pub const GENERATOR_MARKER: &str = "/* Generated by dte */";

/// How literal blocks are opened, closed and escaped in the target script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Opens a literal-emission statement, e.g. `print("""`.
    pub literal_open: &'static str,
    /// Closes it again, without the statement terminator, e.g. `""")`.
    pub literal_close: &'static str,
    /// Character of literal text that must be escaped.
    pub quote: char,
    /// Replacement emitted for [`quote`](Self::quote).
    pub escaped_quote: &'static str,
    /// The target drops a newline that directly follows `literal_open`.
    pub strips_leading_newline: bool,
}

impl Dialect {
    /// Triple-quoted interpolating strings; a raw `"` is escaped with one backslash.
    pub const TRIPLE_QUOTED: Dialect = Dialect {
        literal_open: "print(\"\"\"",
        literal_close: "\"\"\")",
        quote: '"',
        escaped_quote: "\\\"",
        strips_leading_newline: false,
    };

    /// Back-tick literal strings (Rhai): no escape sequences, `` ` `` is doubled,
    /// and a newline right after the opening back-tick is skipped.
    pub const BACKTICK: Dialect = Dialect {
        literal_open: "print(`",
        literal_close: "`)",
        quote: '`',
        escaped_quote: "``",
        strips_leading_newline: true,
    };
}

impl Default for Dialect {
    fn default() -> Self {
        Self::TRIPLE_QUOTED
    }
}
