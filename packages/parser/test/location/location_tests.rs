//! Location plumbing: line/column conversion, gap-aware offset fixing, and
//! the consistency of `range` and `loc` on public nodes.

use std::rc::Rc;

use sfc_parser::line_index::LineIndex;
use sfc_parser::location::Position;
use sfc_parser::location_calculator::{GapEntry, LocationCalculator, OffsetKind};
use sfc_parser::{parse_for_analysis, parse_template_fragment, ParserOptions};

mod line_index {
    use super::*;

    #[test]
    fn offsets_and_positions_round_trip() {
        let source = "line one\nline two\r\nline three";
        let index = LineIndex::from_source(source);
        for offset in 0..=source.len() {
            let position = index.position_for(offset);
            assert_eq!(index.offset_for(position), offset, "offset {offset}");
        }
    }

    #[test]
    fn first_line_is_line_one() {
        let index = LineIndex::from_source("abc");
        assert_eq!(index.position_for(0), Position::new(1, 0));
        assert_eq!(index.position_for(2), Position::new(1, 2));
    }
}

mod calculator {
    use super::*;

    fn calc(source: &str, base: usize, gaps: Vec<GapEntry>) -> LocationCalculator {
        LocationCalculator::new(Rc::new(LineIndex::from_source(source)), base, gaps)
    }

    #[test]
    fn fixing_without_gaps_is_identity() {
        let calculator = calc("abcdef", 0, vec![]);
        for offset in 0..6 {
            assert_eq!(calculator.fix_offset(offset, OffsetKind::Start), offset);
            assert_eq!(calculator.fix_offset(offset, OffsetKind::End), offset);
        }
    }

    #[test]
    fn gaps_shift_offsets_past_the_decode() {
        // "x &amp; y" decodes to "x & y": the gap sits at decoded offset 2.
        let calculator = calc("x &amp; y", 0, vec![GapEntry { offset: 2, gap: 4 }]);
        assert_eq!(calculator.fix_offset(2, OffsetKind::Start), 2);
        assert_eq!(calculator.fix_offset(3, OffsetKind::End), 7);
        assert_eq!(calculator.fix_offset(4, OffsetKind::Start), 8);
    }

    #[test]
    fn fixing_an_already_fixed_offset_is_a_no_op() {
        let calculator = calc("x &amp; y", 0, vec![GapEntry { offset: 2, gap: 4 }]);
        let fixed = calculator.fix_offset(4, OffsetKind::Start);
        // Once mapped past all gaps, a gap-free pass must not move it.
        let refix = calc("x &amp; y", 0, vec![]);
        assert_eq!(refix.fix_offset(fixed, OffsetKind::Start), fixed);
        assert_eq!(refix.fix_offset(fixed, OffsetKind::End), fixed);
    }

    #[test]
    fn fix_range_recomputes_the_location() {
        let source = "ab\n&amp;cd";
        // Decoded "&cd" at base 3; the replacement `&` sits at decoded 0.
        let calculator = calc(source, 3, vec![GapEntry { offset: 0, gap: 4 }]);
        let mut range = [4, 6];
        let loc = calculator.fix_range(&mut range);
        assert_eq!(range, [8, 10]);
        assert_eq!(loc.start.line, 2);
        assert_eq!(loc.start.column, 5);
    }

    #[test]
    fn sub_calculator_advances_the_base() {
        let calculator = calc("abcdef", 2, vec![]);
        let sub = calculator.sub_calculator_after(2);
        assert_eq!(sub.base_offset(), 4);
        assert_eq!(sub.fix_offset(5, OffsetKind::Start), 5);
    }
}

mod node_consistency {
    use super::*;

    /// Every token's `loc` agrees with its `range` through the line index.
    #[test]
    fn template_token_locations_match_ranges() {
        let source = "<div a=\"1\">\n  {{ x }}\n  <br/>\n</div>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let index = LineIndex::from_source(source);
        for token in &doc.tokens {
            assert_eq!(index.offset_for(token.loc.start), token.range[0], "{token:?}");
            assert_eq!(index.offset_for(token.loc.end), token.range[1], "{token:?}");
        }
    }

    #[test]
    fn script_token_locations_match_ranges() {
        let source = "<script>\nlet a = 1\nlet b = a + 2\n</script>";
        let options = ParserOptions {
            file_path: Some("c.vue".to_string()),
            ..ParserOptions::default()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let index = LineIndex::from_source(source);
        for token in &result.tokens {
            assert_eq!(index.offset_for(token.loc.start), token.range[0], "{token:?}");
            assert_eq!(index.offset_for(token.loc.end), token.range[1], "{token:?}");
        }
    }

    #[test]
    fn token_values_match_decoded_slices() {
        let source = "<p title=\"a&lt;b\">x &amp; y</p>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        for token in &doc.tokens {
            use sfc_parser::ast::tokens::TokenType;
            match token.token_type {
                TokenType::HtmlLiteral => assert_eq!(token.value, "a<b"),
                TokenType::HtmlText => assert_eq!(token.value, "x & y"),
                _ => {
                    // Non-decoded tokens reproduce their raw span or a
                    // fixed punctuator form.
                }
            }
        }
    }

    #[test]
    fn non_whitespace_bytes_are_covered_exactly_once() {
        let source = "<div a=\"1\"><p>t</p></div>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let mut covered = vec![0u8; source.len()];
        for token in &doc.tokens {
            for slot in covered.iter_mut().take(token.range[1]).skip(token.range[0]) {
                *slot += 1;
            }
        }
        for (offset, count) in covered.iter().enumerate() {
            let byte = source.as_bytes()[offset];
            if byte.is_ascii_whitespace() {
                continue;
            }
            assert_eq!(*count, 1, "byte {offset} covered {count} times");
        }
    }
}
