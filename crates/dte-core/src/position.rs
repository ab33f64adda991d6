//! Line/column positions and the ordered map between generated and template positions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A 1-based (line, column) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Sentinel used when a generated position has no recorded template position.
    pub const NOT_FOUND: Position = Position { line: 0, column: 0 };

    pub const fn at(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Snapshot the current position of a cursor.
    pub fn from(source: &impl Positioned) -> Self {
        source.position()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[l:{},c:{}]", self.line, self.column)
    }
}

/// Anything able to tell its current line and column.
pub trait Positioned {
    fn position(&self) -> Position;
}

impl Positioned for Position {
    fn position(&self) -> Position {
        *self
    }
}

/// One recorded correspondence, as exposed to serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub generated: Position,
    pub source: Position,
}

/// Ordered map from generated-script positions to template positions.
///
/// Entries keep insertion order. Recording an already-known generated position
/// overwrites its template position but keeps the original slot, so iteration
/// still reflects the order in which generated positions were first written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    entries: Vec<Mapping>,
    index: HashMap<Position, usize>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `generated -> source`, overwriting any earlier entry for `generated`.
    pub fn record(&mut self, generated: Position, source: Position) {
        match self.index.get(&generated) {
            Some(&slot) => self.entries[slot].source = source,
            None => {
                self.index.insert(generated, self.entries.len());
                self.entries.push(Mapping { generated, source });
            }
        }
    }

    /// Template position recorded for `generated`, if any.
    pub fn get(&self, generated: Position) -> Option<Position> {
        self.index
            .get(&generated)
            .map(|&slot| self.entries[slot].source)
    }

    /// Template position for `generated`, or [`Position::NOT_FOUND`].
    pub fn resolve(&self, generated: Position) -> Position {
        self.get(generated).unwrap_or(Position::NOT_FOUND)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over mappings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> + '_ {
        self.entries.iter()
    }
}

impl Serialize for PositionMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
