//! Character reader that keeps track of its line and column.
//!
//! Only character-at-a-time reads are supported, with a single character of
//! pushback through [`PositionReader::mark`] / [`PositionReader::reset`].
//! Position bookkeeping is only correct at this granularity, so line-oriented
//! reads fail instead of silently skewing the cursor.
//!
//! Line and column numbers start at 1. The reported position is the cursor
//! after the last consumed character: consuming `\n` moves to the next line,
//! column 1; consuming anything else advances the column by one.

use std::io::{self, BufRead};

use crate::position::{Position, Positioned};

#[derive(Debug, Clone, Copy)]
struct Mark {
    line: usize,
    column: usize,
    /// The single character consumed since the mark, if any.
    consumed: Option<char>,
    /// Set once a read happened after the mark (even one that hit end of input).
    read_once: bool,
    valid: bool,
}

/// UTF-8 character reader over a [`BufRead`] source exposing its current position.
pub struct PositionReader<R> {
    inner: R,
    line: usize,
    column: usize,
    pushback: Option<char>,
    mark: Option<Mark>,
}

impl<'a> PositionReader<&'a [u8]> {
    /// Reader over an in-memory template.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> PositionReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 1,
            column: 1,
            pushback: None,
            mark: None,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Read the next character, or `None` at end of input.
    pub fn read(&mut self) -> io::Result<Option<char>> {
        let c = match self.pushback.take() {
            Some(c) => Some(c),
            None => self.decode()?,
        };

        if let Some(mark) = self.mark.as_mut() {
            if mark.read_once {
                mark.valid = false;
            } else {
                mark.read_once = true;
                mark.consumed = c;
            }
        }

        if let Some(c) = c {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(c)
    }

    /// Remember the current position so that the next character can be pushed back.
    pub fn mark(&mut self) {
        self.mark = Some(Mark {
            line: self.line,
            column: self.column,
            consumed: None,
            read_once: false,
            valid: true,
        });
    }

    /// Push back the character read since the last [`mark`](Self::mark) and
    /// restore the marked position.
    pub fn reset(&mut self) -> io::Result<()> {
        let mark = match self.mark.take() {
            Some(mark) if mark.valid => mark,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "reset without a valid mark (only one character of pushback is supported)",
                ))
            }
        };
        if let Some(c) = mark.consumed {
            self.pushback = Some(c);
        }
        self.line = mark.line;
        self.column = mark.column;
        Ok(())
    }

    /// Line reads are not supported; this reader only works character by character.
    pub fn read_line(&mut self, _buf: &mut String) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "this reader only supports reading character by character",
        ))
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let Some(&byte) = buf.first() else {
                return Ok(None);
            };
            self.inner.consume(1);
            return Ok(Some(byte));
        }
    }

    fn decode(&mut self) -> io::Result<Option<char>> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7F => return Ok(Some(first as char)),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(invalid_utf8()),
        };

        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self.next_byte()?.ok_or_else(invalid_utf8)?;
        }
        let decoded = std::str::from_utf8(&bytes[..width]).map_err(|_| invalid_utf8())?;
        Ok(decoded.chars().next())
    }
}

impl<R> Positioned for PositionReader<R> {
    fn position(&self) -> Position {
        Position::at(self.line, self.column)
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "template is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(reader: &mut PositionReader<&[u8]>) -> Vec<(char, Position)> {
        let mut out = Vec::new();
        while let Some(c) = reader.read().unwrap() {
            out.push((c, reader.position()));
        }
        out
    }

    #[test]
    fn test_positions_follow_newlines() {
        let mut reader = PositionReader::from_text("ab\nc");
        assert_eq!(reader.position(), Position::at(1, 1));
        let read = read_all(&mut reader);
        assert_eq!(
            read,
            vec![
                ('a', Position::at(1, 2)),
                ('b', Position::at(1, 3)),
                ('\n', Position::at(2, 1)),
                ('c', Position::at(2, 2)),
            ]
        );
    }

    #[test]
    fn test_carriage_return_is_an_ordinary_column() {
        let mut reader = PositionReader::from_text("a\r\nb");
        let read = read_all(&mut reader);
        assert_eq!(read[1], ('\r', Position::at(1, 3)));
        assert_eq!(read[2], ('\n', Position::at(2, 1)));
    }

    #[test]
    fn test_mark_reset_pushes_back_one_character() {
        let mut reader = PositionReader::from_text("<x");
        assert_eq!(reader.read().unwrap(), Some('<'));
        reader.mark();
        assert_eq!(reader.read().unwrap(), Some('x'));
        assert_eq!(reader.position(), Position::at(1, 3));
        reader.reset().unwrap();
        assert_eq!(reader.position(), Position::at(1, 2));
        assert_eq!(reader.read().unwrap(), Some('x'));
        assert_eq!(reader.position(), Position::at(1, 3));
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_reset_over_newline_restores_line() {
        let mut reader = PositionReader::from_text("<\nz");
        reader.read().unwrap();
        reader.mark();
        assert_eq!(reader.read().unwrap(), Some('\n'));
        assert_eq!(reader.line(), 2);
        reader.reset().unwrap();
        assert_eq!(reader.position(), Position::at(1, 2));
    }

    #[test]
    fn test_reset_at_end_of_input() {
        let mut reader = PositionReader::from_text("$");
        reader.read().unwrap();
        reader.mark();
        assert_eq!(reader.read().unwrap(), None);
        reader.reset().unwrap();
        assert_eq!(reader.read().unwrap(), None);
        assert_eq!(reader.position(), Position::at(1, 2));
    }

    #[test]
    fn test_reset_without_mark_fails() {
        let mut reader = PositionReader::from_text("abc");
        let err = reader.reset().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_mark_invalid_after_two_reads() {
        let mut reader = PositionReader::from_text("abc");
        reader.mark();
        reader.read().unwrap();
        reader.read().unwrap();
        assert!(reader.reset().is_err());
    }

    #[test]
    fn test_read_line_is_unsupported() {
        let mut reader = PositionReader::from_text("line\n");
        let mut buf = String::new();
        let err = reader.read_line(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_eq!(reader.position(), Position::at(1, 1));
    }

    #[test]
    fn test_decodes_multibyte_characters() {
        let mut reader = PositionReader::from_text("ž€😀");
        let chars: Vec<char> = read_all(&mut reader).into_iter().map(|(c, _)| c).collect();
        assert_eq!(chars, vec!['ž', '€', '😀']);
        assert_eq!(reader.position(), Position::at(1, 4));
    }

    #[test]
    fn test_invalid_utf8_is_an_io_error() {
        let bytes: &[u8] = &[b'a', 0xFF, b'b'];
        let mut reader = PositionReader::new(bytes);
        assert_eq!(reader.read().unwrap(), Some('a'));
        let err = reader.read().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
