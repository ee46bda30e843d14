//! Offset ↔ line/column conversion.
//!
//! The tokenizer records the offset immediately following each line break;
//! this index turns that table into O(log n) queries in both directions.

use crate::location::Position;

#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Start offset of each line. `line_starts[0]` is always 0.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build from the offsets immediately following each line terminator,
    /// as accumulated by the tokenizer.
    pub fn from_terminators(line_terminators: &[usize]) -> Self {
        let mut line_starts = Vec::with_capacity(line_terminators.len() + 1);
        line_starts.push(0);
        line_starts.extend_from_slice(line_terminators);
        LineIndex { line_starts }
    }

    /// Build by scanning the source. `\r\n` counts as a single terminator.
    pub fn from_source(source: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = source.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(i + 1),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line_starts.push(i + 1);
                }
                _ => {}
            }
            i += 1;
        }
        LineIndex { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Locate `offset`. Offsets past the last line start stay on the last
    /// line; the column is the distance from the line start.
    pub fn position_for(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position::new(line + 1, offset - self.line_starts[line])
    }

    /// Inverse of [`position_for`]. Lines past the end clamp to the last
    /// line start.
    pub fn offset_for(&self, pos: Position) -> usize {
        let line = pos.line.saturating_sub(1).min(self.line_starts.len() - 1);
        self.line_starts[line] + pos.column
    }
}
