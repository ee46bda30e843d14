//! Restores original-source offsets after text has been shortened by entity
//! decoding or line-ending normalization, and after expressions have been
//! relocated inside a surrogate script.
//!
//! A calculator owns a base offset and a sorted gap table. Gap keys live in
//! decoded-text space relative to the base; each entry carries the cumulative
//! number of original code units skipped up to and including that decode.

use std::rc::Rc;

use crate::line_index::LineIndex;
use crate::location::{Position, SourceLocation};

/// One shrinking decode. `offset` is the position of the decoded replacement
/// character (relative to the calculator base); `gap` is cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapEntry {
    pub offset: usize,
    pub gap: usize,
}

/// Which end of a range an offset belongs to. The gap rule is identical for
/// both ends; the kind documents intent at call sites and keeps the fix
/// routines honest about which delta they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetKind {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct LocationCalculator {
    line_index: Rc<LineIndex>,
    base_offset: usize,
    gaps: Vec<GapEntry>,
}

impl LocationCalculator {
    pub fn new(line_index: Rc<LineIndex>, base_offset: usize, gaps: Vec<GapEntry>) -> Self {
        debug_assert!(gaps.windows(2).all(|w| w[0].offset < w[1].offset && w[0].gap < w[1].gap));
        LocationCalculator {
            line_index,
            base_offset,
            gaps,
        }
    }

    pub fn without_gaps(line_index: Rc<LineIndex>, base_offset: usize) -> Self {
        LocationCalculator::new(line_index, base_offset, Vec::new())
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Cumulative gap for a decoded-space offset relative to the base.
    /// An entry applies strictly below the queried offset, so offsets at the
    /// decoded replacement character itself map to the start of the original
    /// sequence, and offsets just past it map past the whole sequence.
    fn gap_delta(&self, relative: usize) -> usize {
        match self.gaps.binary_search_by(|e| e.offset.cmp(&relative)) {
            // Exact hit: the entry at `relative` does not apply yet.
            Ok(0) => 0,
            Ok(i) => self.gaps[i - 1].gap,
            Err(0) => 0,
            Err(i) => self.gaps[i - 1].gap,
        }
    }

    /// Map a surrogate-text offset back to the original source. Offsets in
    /// front of the base (synthesized prefix, wrapper punctuators) pass
    /// through unchanged.
    pub fn fix_offset(&self, offset: usize, _kind: OffsetKind) -> usize {
        if offset < self.base_offset {
            return offset;
        }
        offset + self.gap_delta(offset - self.base_offset)
    }

    /// Fix a `[start, end)` pair in place and return the matching location.
    pub fn fix_range(&self, range: &mut [usize; 2]) -> SourceLocation {
        range[0] = self.fix_offset(range[0], OffsetKind::Start);
        range[1] = self.fix_offset(range[1], OffsetKind::End);
        self.location_for(*range)
    }

    pub fn position_for(&self, original_offset: usize) -> Position {
        self.line_index.position_for(original_offset)
    }

    pub fn location_for(&self, range: [usize; 2]) -> SourceLocation {
        SourceLocation::new(self.position_for(range[0]), self.position_for(range[1]))
    }

    /// A calculator whose base is advanced by `delta` decoded units, with the
    /// gap table rebased accordingly. Entries consumed by the advance drop
    /// out and their cumulative contribution is folded into the new base.
    pub fn sub_calculator_after(&self, delta: usize) -> LocationCalculator {
        let split = self.gaps.partition_point(|e| e.offset < delta);
        let consumed = if split == 0 { 0 } else { self.gaps[split - 1].gap };
        let gaps = self.gaps[split..]
            .iter()
            .map(|e| GapEntry {
                offset: e.offset - delta,
                gap: e.gap - consumed,
            })
            .collect();
        LocationCalculator {
            line_index: Rc::clone(&self.line_index),
            base_offset: self.base_offset + delta + consumed,
            gaps,
        }
    }
}

/// Accumulates gap entries while a decoder shrinks text, producing the table
/// a [`LocationCalculator`] consumes.
#[derive(Debug, Default, Clone)]
pub struct GapRecorder {
    entries: Vec<GapEntry>,
    cumulative: usize,
}

impl GapRecorder {
    pub fn new() -> Self {
        GapRecorder::default()
    }

    /// Record that the decode emitted a replacement at `decoded_offset` and
    /// skipped `skipped` original code units beyond it.
    pub fn record(&mut self, decoded_offset: usize, skipped: usize) {
        if skipped == 0 {
            return;
        }
        self.cumulative += skipped;
        self.entries.push(GapEntry {
            offset: decoded_offset,
            gap: self.cumulative,
        });
    }

    pub fn cumulative(&self) -> usize {
        self.cumulative
    }

    pub fn into_entries(self) -> Vec<GapEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator(source: &str, base: usize, gaps: Vec<GapEntry>) -> LocationCalculator {
        LocationCalculator::new(Rc::new(LineIndex::from_source(source)), base, gaps)
    }

    #[test]
    fn test_no_gaps_is_identity() {
        let calc = calculator("abcdef", 0, vec![]);
        for offset in 0..6 {
            assert_eq!(calc.fix_offset(offset, OffsetKind::Start), offset);
            assert_eq!(calc.fix_offset(offset, OffsetKind::End), offset);
        }
    }

    #[test]
    fn test_entity_gap_mapping() {
        // original: x &amp;&amp; y     decoded: x && y
        let calc = calculator(
            "x &amp;&amp; y",
            0,
            vec![GapEntry { offset: 3, gap: 4 }, GapEntry { offset: 4, gap: 8 }],
        );
        // decoded '&' characters sit at 3 and 4
        assert_eq!(calc.fix_offset(3, OffsetKind::Start), 3);
        assert_eq!(calc.fix_offset(4, OffsetKind::End), 8);
        assert_eq!(calc.fix_offset(4, OffsetKind::Start), 8);
        assert_eq!(calc.fix_offset(5, OffsetKind::End), 13);
        // text before the first entity is untouched
        assert_eq!(calc.fix_offset(2, OffsetKind::End), 2);
        // `y` after both entities
        assert_eq!(calc.fix_offset(6, OffsetKind::Start), 14);
    }

    #[test]
    fn test_fix_is_idempotent_past_gaps() {
        let calc = calculator("x &amp; y", 0, vec![GapEntry { offset: 3, gap: 4 }]);
        let fixed = calc.fix_offset(4, OffsetKind::Start);
        assert_eq!(fixed, 8);
        // A second application through a gap-free calculator is a no-op.
        let refix = calculator("x &amp; y", 0, vec![]);
        assert_eq!(refix.fix_offset(fixed, OffsetKind::Start), fixed);
    }

    #[test]
    fn test_sub_calculator_rebase() {
        let calc = calculator(
            "ab &lt; cd &gt; ef",
            0,
            vec![GapEntry { offset: 3, gap: 3 }, GapEntry { offset: 8, gap: 6 }],
        );
        // Skip the first five decoded characters ("ab < ").
        let sub = calc.sub_calculator_after(5);
        assert_eq!(sub.base_offset(), 8);
        // decoded offset 3 in the sub space is 8 in the parent space
        assert_eq!(
            sub.fix_offset(8 + 3, OffsetKind::Start),
            calc.fix_offset(8, OffsetKind::Start)
        );
    }
}
