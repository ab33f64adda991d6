//! Template-to-script transducer.
//!
//! Reads the template one character at a time and writes an equivalent script:
//! literal text becomes print statements, `<%= expr %>` and `${ expr }` become
//! interpolations inside those literals, and `<% code %>` is copied between
//! them as plain script code. Every character goes through a
//! [`PositionWriter`], so the resulting [`PositionMap`] covers the whole script.
//!
//! Unterminated blocks are not rejected here. The malformed script fails at
//! compile time and is reported with template context by [`crate::report`].

use std::io::{self, BufRead};

use crate::dialect::{Dialect, GENERATOR_MARKER};
use crate::position::{Position, PositionMap, Positioned};
use crate::reader::PositionReader;
use crate::writer::PositionWriter;

/// Generated script text together with its generated-to-template position map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScript {
    pub script: String,
    pub positions: PositionMap,
}

/// Translate an in-memory template.
pub fn parse_str(text: &str, dialect: Dialect) -> io::Result<ParsedScript> {
    parse(PositionReader::from_text(text), dialect)
}

/// Translate everything `reader` yields. I/O and UTF-8 errors of the
/// underlying source are returned unchanged.
pub fn parse<R: BufRead>(reader: PositionReader<R>, dialect: Dialect) -> io::Result<ParsedScript> {
    let parsed = Transducer {
        reader,
        writer: PositionWriter::new(),
        dialect,
        block_start: false,
    }
    .run()?;

    tracing::debug!(
        chars = parsed.script.chars().count(),
        mappings = parsed.positions.len(),
        "template parsed"
    );
    Ok(parsed)
}

struct Transducer<R> {
    reader: PositionReader<R>,
    writer: PositionWriter,
    dialect: Dialect,
    /// Nothing was emitted yet in the currently open literal block.
    block_start: bool,
}

impl<R: BufRead> Transducer<R> {
    fn run(mut self) -> io::Result<ParsedScript> {
        self.open_literal();

        while let Some(c) = self.reader.read()? {
            match c {
                '<' => self.angle()?,
                '$' => self.dollar()?,
                '\r' | '\n' => self.newline(c)?,
                c if c == self.dialect.quote => self.emit(self.dialect.escaped_quote),
                c => self.emit_char(c),
            }
        }

        self.emit(self.dialect.literal_close);
        self.emit(";\n");
        self.emit("\n");
        self.emit(GENERATOR_MARKER);

        let (script, positions) = self.writer.into_parts();
        Ok(ParsedScript { script, positions })
    }

    fn emit(&mut self, s: &str) {
        let source = self.reader.position();
        self.writer.write_str(s, source);
        self.block_start = false;
    }

    fn emit_char(&mut self, c: char) {
        let source = self.reader.position();
        self.emit_char_at(c, source);
    }

    fn emit_char_at(&mut self, c: char, source: Position) {
        self.writer.write_char(c, source);
        self.block_start = false;
    }

    fn open_literal(&mut self) {
        self.emit(self.dialect.literal_open);
        self.block_start = true;
    }

    /// `<` seen: a `<%=` expression, a `<%` statement, or a literal `<`.
    fn angle(&mut self) -> io::Result<()> {
        self.reader.mark();
        if self.reader.read()? != Some('%') {
            self.reader.reset()?;
            self.emit_char('<');
            return Ok(());
        }

        self.reader.mark();
        if self.reader.read()? == Some('=') {
            self.expression()
        } else {
            self.reader.reset()?;
            self.statement()
        }
    }

    /// `$` seen: a `${` interpolation or a literal `$`.
    fn dollar(&mut self) -> io::Result<()> {
        self.reader.mark();
        if self.reader.read()? != Some('{') {
            self.reader.reset()?;
            self.emit_char('$');
            return Ok(());
        }

        self.emit("${");
        self.interpolation()
    }

    /// `\n`, `\r` and `\r\n` all become a single `\n`.
    fn newline(&mut self, c: char) -> io::Result<()> {
        if c == '\r' {
            self.reader.mark();
            if self.reader.read()? != Some('\n') {
                self.reader.reset()?;
            }
        }

        if self.block_start && self.dialect.strips_leading_newline {
            self.emit_char('\n');
        }
        self.emit_char('\n');
        Ok(())
    }

    /// `<%= ... %>`: interpolated into the open literal, newlines dropped.
    fn expression(&mut self) -> io::Result<()> {
        self.emit("${");
        self.block_body(false)?;
        self.emit_char('}');
        Ok(())
    }

    /// `<% ... %>`: closes the literal, copies code verbatim, reopens a literal.
    /// Newlines are kept since they separate statements.
    fn statement(&mut self) -> io::Result<()> {
        self.emit(self.dialect.literal_close);
        self.emit_char(';');
        self.block_body(true)?;
        self.emit(";\n");
        self.open_literal();
        Ok(())
    }

    /// `${ ... }`: copied through the first `}`, newlines dropped.
    fn interpolation(&mut self) -> io::Result<()> {
        while let Some(c) = self.reader.read()? {
            if c != '\n' && c != '\r' {
                self.emit_char(c);
            }
            if c == '}' {
                break;
            }
        }
        Ok(())
    }

    /// Copy a block body up to the closing `%>` or end of input.
    ///
    /// A `%` not followed by `>` is emitted and the character after it is
    /// treated as ordinary body text, so `%%>` does not close the block.
    fn block_body(&mut self, keep_newlines: bool) -> io::Result<()> {
        while let Some(mut c) = self.reader.read()? {
            if c == '%' {
                // the `%` maps to itself, not to the character looked at after it
                let percent = self.reader.position();
                match self.reader.read()? {
                    Some('>') => return Ok(()),
                    Some(next) => {
                        self.emit_char_at('%', percent);
                        c = next;
                    }
                    None => {
                        self.emit_char_at('%', percent);
                        return Ok(());
                    }
                }
            }
            if keep_newlines || (c != '\n' && c != '\r') {
                self.emit_char(c);
            }
        }
        Ok(())
    }
}
