//! Tokenizer tests: token shapes, source spans, character references, and
//! recoverable errors.

use sfc_parser::ast::tokens::{Token, TokenType};
use sfc_parser::html::Tokenizer;
use sfc_parser::location::ErrorCode;

fn tokenize(source: &str) -> (Vec<Token>, Vec<sfc_parser::location::ParseError>) {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    (tokens, tokenizer.errors)
}

fn tokenize_with_expressions(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(source);
    tokenizer.set_expression_enabled(true);
    let mut tokens = Vec::new();
    while let Some(token) = tokenizer.next_token() {
        tokens.push(token);
    }
    tokens
}

fn kinds(tokens: &[Token]) -> Vec<TokenType> {
    tokens.iter().map(|t| t.token_type).collect()
}

mod basic_tags {
    use super::*;

    #[test]
    fn tokenizes_a_simple_element() {
        let (tokens, errors) = tokenize("<div>x</div>");
        assert!(errors.is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenType::HtmlTagOpen,
                TokenType::HtmlTagClose,
                TokenType::HtmlText,
                TokenType::HtmlEndTagOpen,
                TokenType::HtmlTagClose,
            ]
        );
        assert_eq!(tokens[0].value, "div");
        assert_eq!(tokens[0].range, [0, 4]);
        assert_eq!(tokens[2].value, "x");
    }

    #[test]
    fn lowercases_tag_names_but_ranges_keep_raw_bytes() {
        let source = "<DIV></DIV>";
        let (tokens, _) = tokenize(source);
        assert_eq!(tokens[0].value, "div");
        assert_eq!(&source[tokens[0].range[0]..tokens[0].range[1]], "<DIV");
    }

    #[test]
    fn every_token_range_reproduces_the_source_span() {
        let source = "<div a=\"1\" b='2' c=3>t &amp; u</div>";
        let (tokens, _) = tokenize(source);
        for token in &tokens {
            assert!(token.range[0] < token.range[1], "empty range for {:?}", token);
            assert!(token.range[1] <= source.len());
        }
    }

    #[test]
    fn self_closing_tag_close_token() {
        let (tokens, _) = tokenize("<br/>");
        assert_eq!(
            kinds(&tokens),
            vec![TokenType::HtmlTagOpen, TokenType::HtmlSelfClosingTagClose]
        );
        assert_eq!(tokens[1].value, "/>");
        assert_eq!(tokens[1].range, [3, 5]);
    }
}

mod attributes {
    use super::*;

    #[test]
    fn attribute_tokens_split_into_identifier_association_literal() {
        let source = "<a href=\"x\">";
        let (tokens, _) = tokenize(source);
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenType::HtmlTagOpen,
                TokenType::HtmlWhitespace,
                TokenType::HtmlIdentifier,
                TokenType::HtmlAssociation,
                TokenType::HtmlLiteral,
                TokenType::HtmlTagClose,
            ]
        );
        let literal = &tokens[4];
        // The range covers the quotes, the value does not.
        assert_eq!(&source[literal.range[0]..literal.range[1]], "\"x\"");
        assert_eq!(literal.value, "x");
    }

    #[test]
    fn attribute_names_are_lowercased() {
        let (tokens, _) = tokenize("<a HREF='x'>");
        let identifier = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlIdentifier)
            .unwrap();
        assert_eq!(identifier.value, "href");
    }

    #[test]
    fn unquoted_value_ends_at_whitespace() {
        let (tokens, _) = tokenize("<a x=1 y=2>");
        let literals: Vec<_> = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::HtmlLiteral)
            .collect();
        assert_eq!(literals.len(), 2);
        assert_eq!(literals[0].value, "1");
        assert_eq!(literals[1].value, "2");
    }

    #[test]
    fn missing_attribute_value_is_reported() {
        let (_, errors) = tokenize("<div a=></div>");
        assert!(errors.iter().any(|e| e.code == ErrorCode::MissingAttributeValue));
    }

    #[test]
    fn double_equals_is_recovered() {
        // `a==\"b\"` parses as attribute `a` with an unquoted value `="b"`.
        let (tokens, errors) = tokenize("<div a==\"b\"></div>");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::UnexpectedCharacterInUnquotedAttributeValue));
        assert!(tokens.iter().any(|t| t.token_type == TokenType::HtmlTagOpen));
        assert!(tokens.iter().any(|t| t.token_type == TokenType::HtmlEndTagOpen));
    }
}

mod character_references {
    use super::*;

    #[test]
    fn named_references_decode_into_the_token_value() {
        let source = "a &amp; b";
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "a & b");
        assert_eq!(tokens[0].range, [0, source.len()]);
    }

    #[test]
    fn numeric_references_decode() {
        let (tokens, _) = tokenize("&#65;&#x42;");
        assert_eq!(tokens[0].value, "AB");
    }

    #[test]
    fn numeric_reference_out_of_range_becomes_replacement() {
        let (tokens, errors) = tokenize("&#x110000;");
        assert_eq!(tokens[0].value, "\u{FFFD}");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::CharacterReferenceOutsideUnicodeRange));
    }

    #[test]
    fn unknown_named_reference_stays_raw() {
        let (tokens, errors) = tokenize("&nosuch;");
        assert_eq!(tokens[0].value, "&nosuch;");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::UnknownNamedCharacterReference));
    }

    #[test]
    fn legacy_reference_without_semicolon_decodes_with_error() {
        let (tokens, errors) = tokenize("a &amp b");
        assert_eq!(tokens[0].value, "a & b");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::MissingSemicolonAfterCharacterReference));
    }

    #[test]
    fn references_decode_inside_attribute_values() {
        let (tokens, _) = tokenize("<a title=\"x &lt; y\">");
        let literal = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlLiteral)
            .unwrap();
        assert_eq!(literal.value, "x < y");
    }

    #[test]
    fn gaps_record_shrunk_units() {
        let mut tokenizer = Tokenizer::new("a&amp;b");
        while tokenizer.next_token().is_some() {}
        // `&amp;` decodes to one byte; four source bytes became gaps.
        assert_eq!(tokenizer.gaps.len(), 4);
    }
}

mod comments_and_cdata {
    use super::*;

    #[test]
    fn comments_produce_comment_tokens() {
        let source = "<!-- hello -->";
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::HtmlComment);
        assert_eq!(tokens[0].value, " hello ");
        assert_eq!(tokens[0].range, [0, source.len()]);
    }

    #[test]
    fn abrupt_comment_close_is_reported() {
        let (tokens, errors) = tokenize("<!-->");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::AbruptClosingOfEmptyComment));
        assert_eq!(tokens[0].token_type, TokenType::HtmlComment);
    }

    #[test]
    fn eof_in_comment_is_reported() {
        let (_, errors) = tokenize("<!-- never closed");
        assert!(errors.iter().any(|e| e.code == ErrorCode::EofInComment));
    }

    #[test]
    fn bogus_comment_from_doctype() {
        let (tokens, errors) = tokenize("<!doctype html>");
        assert_eq!(tokens[0].token_type, TokenType::HtmlBogusComment);
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::IncorrectlyOpenedComment));
    }

    #[test]
    fn cdata_in_html_content_is_an_error() {
        let (_, errors) = tokenize("<![CDATA[x]]>");
        assert!(errors.iter().any(|e| e.code == ErrorCode::CdataInHtmlContent));
    }
}

mod positions {
    use super::*;

    #[test]
    fn lines_are_one_based_and_columns_zero_based() {
        let (tokens, _) = tokenize("<t>\na</t>");
        let text = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlText)
            .unwrap();
        assert_eq!(text.loc.start.line, 1);
        assert_eq!(text.loc.start.column, 3);
        let close = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlEndTagOpen)
            .unwrap();
        assert_eq!(close.loc.start.line, 2);
        assert_eq!(close.loc.start.column, 1);
    }

    #[test]
    fn crlf_counts_as_one_terminator() {
        let mut tokenizer = Tokenizer::new("a\r\nb");
        while tokenizer.next_token().is_some() {}
        assert_eq!(tokenizer.line_terminators(), &[3]);
    }
}

mod mustaches {
    use super::*;

    #[test]
    fn expression_tokens_are_emitted_when_enabled() {
        let tokens = tokenize_with_expressions("a{{ b }}c");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenType::HtmlText,
                TokenType::VExpressionStart,
                TokenType::HtmlText,
                TokenType::VExpressionEnd,
                TokenType::HtmlText,
            ]
        );
        assert_eq!(tokens[1].value, "{{");
        assert_eq!(tokens[1].range, [1, 3]);
        assert_eq!(tokens[3].value, "}}");
    }

    #[test]
    fn a_single_brace_is_plain_text() {
        let tokens = tokenize_with_expressions("a{b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "a{b");
        assert_eq!(tokens[0].range, [0, 3]);
    }

    #[test]
    fn lt_inside_interpolation_is_not_a_tag() {
        let tokens = tokenize_with_expressions("{{ a < b }}");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenType::VExpressionStart,
                TokenType::HtmlText,
                TokenType::VExpressionEnd,
            ]
        );
        assert_eq!(tokens[1].value, " a < b ");
    }

    #[test]
    fn missing_expression_end_is_reported() {
        let mut tokenizer = Tokenizer::new("{{ a");
        tokenizer.set_expression_enabled(true);
        while tokenizer.next_token().is_some() {}
        assert!(tokenizer
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::XMissingExpressionEnd));
    }

    #[test]
    fn mustaches_are_disabled_by_default() {
        let (tokens, _) = tokenize("{{ a }}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "{{ a }}");
    }
}

mod raw_text {
    use super::*;

    #[test]
    fn script_content_is_raw_until_matching_end_tag() {
        let source = "<script>if (a < b) {}</script>";
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        let mut switched = false;
        loop {
            let Some(token) = tokenizer.next_token() else { break };
            if token.token_type == TokenType::HtmlTagClose && !switched {
                tokenizer.set_content_model(sfc_parser::html::ContentModel::RawText, "script");
                switched = true;
            }
            tokens.push(token);
        }
        let raw = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlRawText)
            .unwrap();
        assert_eq!(raw.value, "if (a < b) {}");
        let end = tokens
            .iter()
            .find(|t| t.token_type == TokenType::HtmlEndTagOpen)
            .unwrap();
        assert_eq!(end.value, "script");
    }

    #[test]
    fn non_matching_end_tag_stays_text() {
        let mut tokenizer = Tokenizer::new("<style>a</b>x</style>");
        let mut tokens = Vec::new();
        let mut switched = false;
        loop {
            let Some(token) = tokenizer.next_token() else { break };
            if token.token_type == TokenType::HtmlTagClose && !switched {
                tokenizer.set_content_model(sfc_parser::html::ContentModel::RawText, "style");
                switched = true;
            }
            tokens.push(token);
        }
        let raw: String = tokens
            .iter()
            .filter(|t| t.token_type == TokenType::HtmlRawText)
            .map(|t| t.value.clone())
            .collect();
        assert_eq!(raw, "a</b>x");
    }
}

mod eof_recovery {
    use super::*;

    #[test]
    fn eof_in_tag_is_reported_and_tokenization_ends() {
        let (_, errors) = tokenize("<div a=");
        assert!(errors.iter().any(|e| e.code == ErrorCode::EofInTag));
    }

    #[test]
    fn lone_lt_at_eof_is_text() {
        let (tokens, errors) = tokenize("a<");
        assert!(errors.iter().any(|e| e.code == ErrorCode::EofBeforeTagName));
        let text: String = tokens.iter().map(|t| t.value.clone()).collect();
        assert_eq!(text, "a<");
    }

    #[test]
    fn null_character_is_reported() {
        let (_, errors) = tokenize("a\0b");
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::UnexpectedNullCharacter));
    }
}
