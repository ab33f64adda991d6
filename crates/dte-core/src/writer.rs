//! String sink that keeps its own line/column and records, for every character
//! written, where in the template that character came from.
//!
//! Line and column numbers start at 1. The writer holds no reference to the
//! reader: every write carries the source position the caller wants recorded,
//! so one mapping is appended per character and nothing can bypass it.

use std::io;
use std::ops::Range;

use crate::position::{Position, PositionMap, Positioned};

/// Output cursor plus the generated-to-template [`PositionMap`].
#[derive(Debug)]
pub struct PositionWriter {
    buf: String,
    line: usize,
    column: usize,
    /// True before the first character and right after a `\n`.
    at_line_start: bool,
    positions: PositionMap,
}

impl PositionWriter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            line: 0,
            column: 0,
            at_line_start: true,
            positions: PositionMap::new(),
        }
    }

    /// Write one character produced by the template character at `source`.
    pub fn write_char(&mut self, c: char, source: Position) {
        if self.at_line_start && c != '\r' {
            self.at_line_start = false;
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        if c == '\n' {
            self.at_line_start = true;
        }

        self.positions.record(self.position(), source);
        self.buf.push(c);
    }

    /// Write a whole string, one mapped character at a time.
    pub fn write_str(&mut self, s: &str, source: Position) {
        for c in s.chars() {
            self.write_char(c, source);
        }
    }

    /// Write a whole character slice, one mapped character at a time.
    pub fn write_chars(&mut self, chars: &[char], source: Position) {
        for &c in chars {
            self.write_char(c, source);
        }
    }

    /// Partial writes are rejected: they would skip the per-character mapping.
    pub fn write_range(&mut self, _s: &str, _range: Range<usize>, _source: Position) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "only whole char, str and char-slice writes are supported",
        ))
    }

    /// Text written so far.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Read-only view of the accumulated position map.
    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Consume the writer, returning the written text and its position map.
    pub fn into_parts(self) -> (String, PositionMap) {
        (self.buf, self.positions)
    }
}

impl Default for PositionWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Positioned for PositionWriter {
    fn position(&self) -> Position {
        Position::at(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_of_written_characters() {
        let mut writer = PositionWriter::new();
        let src = Position::at(1, 1);
        writer.write_str("ab\ncd", src);

        let keys: Vec<_> = writer.positions().iter().map(|m| m.generated).collect();
        assert_eq!(
            keys,
            vec![
                Position::at(1, 1),
                Position::at(1, 2),
                Position::at(1, 3),
                Position::at(2, 1),
                Position::at(2, 2),
            ]
        );
        assert_eq!(writer.position(), Position::at(2, 2));
        assert_eq!(writer.as_str(), "ab\ncd");
    }

    #[test]
    fn test_every_character_records_its_source() {
        let mut writer = PositionWriter::new();
        writer.write_char('x', Position::at(4, 2));
        writer.write_chars(&['y', 'z'], Position::at(5, 7));

        assert_eq!(writer.positions().len(), 3);
        assert_eq!(writer.positions().get(Position::at(1, 1)), Some(Position::at(4, 2)));
        assert_eq!(writer.positions().get(Position::at(1, 3)), Some(Position::at(5, 7)));
    }

    #[test]
    fn test_carriage_return_never_opens_a_line() {
        let mut writer = PositionWriter::new();
        writer.write_str("a\n\r\n", Position::at(1, 1));
        let keys: Vec<_> = writer.positions().iter().map(|m| m.generated).collect();
        assert_eq!(
            keys,
            vec![
                Position::at(1, 1),
                Position::at(1, 2),
                Position::at(1, 3),
                Position::at(2, 1),
            ]
        );
    }

    #[test]
    fn test_write_range_is_unsupported() {
        let mut writer = PositionWriter::new();
        let err = writer
            .write_range("hello", 1..3, Position::at(1, 1))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(writer.positions().is_empty());
    }

    #[test]
    fn test_into_parts() {
        let mut writer = PositionWriter::new();
        writer.write_str("ok", Position::at(3, 3));
        let (text, positions) = writer.into_parts();
        assert_eq!(text, "ok");
        assert_eq!(positions.len(), 2);
    }
}
