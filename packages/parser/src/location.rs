//! Source positions, ranges, and the recoverable-error model.
//!
//! Every positioned entity carries `range = [start, end)` byte offsets into
//! the original source plus a `loc` with 1-based lines and 0-based columns.

use serde::{Deserialize, Serialize};

/// Half-open byte-offset pair into the original source.
pub type OffsetRange = [usize; 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 0-based column, counted in characters from the line start.
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        SourceLocation { start, end }
    }
}

/// Recoverable parse errors. Codes mirror the HTML tokenization spec with a
/// small `x-` extension set for the templating layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    AbruptClosingOfEmptyComment,
    AbsenceOfDigitsInNumericCharacterReference,
    CdataInHtmlContent,
    CharacterReferenceOutsideUnicodeRange,
    ControlCharacterReference,
    DuplicateAttribute,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,
    EofBeforeTagName,
    EofInCdata,
    EofInComment,
    EofInTag,
    IncorrectlyClosedComment,
    IncorrectlyOpenedComment,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingEndTagName,
    MissingSemicolonAfterCharacterReference,
    MissingWhitespaceBetweenAttributes,
    NestedComment,
    NoncharacterCharacterReference,
    NonVoidHtmlElementStartTagWithTrailingSolidus,
    NullCharacterReference,
    SurrogateCharacterReference,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,
    UnknownNamedCharacterReference,
    XInvalidEndTag,
    XInvalidNamespace,
    XExpressionError,
    XMissingExpressionEnd,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            ErrorCode::AbsenceOfDigitsInNumericCharacterReference => {
                "absence-of-digits-in-numeric-character-reference"
            }
            ErrorCode::CdataInHtmlContent => "cdata-in-html-content",
            ErrorCode::CharacterReferenceOutsideUnicodeRange => {
                "character-reference-outside-unicode-range"
            }
            ErrorCode::ControlCharacterReference => "control-character-reference",
            ErrorCode::DuplicateAttribute => "duplicate-attribute",
            ErrorCode::EndTagWithAttributes => "end-tag-with-attributes",
            ErrorCode::EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
            ErrorCode::EofBeforeTagName => "eof-before-tag-name",
            ErrorCode::EofInCdata => "eof-in-cdata",
            ErrorCode::EofInComment => "eof-in-comment",
            ErrorCode::EofInTag => "eof-in-tag",
            ErrorCode::IncorrectlyClosedComment => "incorrectly-closed-comment",
            ErrorCode::IncorrectlyOpenedComment => "incorrectly-opened-comment",
            ErrorCode::InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            ErrorCode::MissingAttributeValue => "missing-attribute-value",
            ErrorCode::MissingEndTagName => "missing-end-tag-name",
            ErrorCode::MissingSemicolonAfterCharacterReference => {
                "missing-semicolon-after-character-reference"
            }
            ErrorCode::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            ErrorCode::NestedComment => "nested-comment",
            ErrorCode::NoncharacterCharacterReference => "noncharacter-character-reference",
            ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus => {
                "non-void-html-element-start-tag-with-trailing-solidus"
            }
            ErrorCode::NullCharacterReference => "null-character-reference",
            ErrorCode::SurrogateCharacterReference => "surrogate-character-reference",
            ErrorCode::UnexpectedCharacterInAttributeName => {
                "unexpected-character-in-attribute-name"
            }
            ErrorCode::UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            ErrorCode::UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            ErrorCode::UnexpectedNullCharacter => "unexpected-null-character",
            ErrorCode::UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            ErrorCode::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            ErrorCode::UnknownNamedCharacterReference => "unknown-named-character-reference",
            ErrorCode::XInvalidEndTag => "x-invalid-end-tag",
            ErrorCode::XInvalidNamespace => "x-invalid-namespace",
            ErrorCode::XExpressionError => "x-expression-error",
            ErrorCode::XMissingExpressionEnd => "x-missing-expression-end",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable error. Appended to the document fragment's `errors` list;
/// never aborts parsing.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    /// Byte offset at which the problem was detected.
    pub index: usize,
    #[serde(rename = "lineNumber")]
    pub line_number: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(code: ErrorCode, index: usize, pos: Position) -> Self {
        ParseError {
            code,
            message: code.as_str().to_string(),
            index,
            line_number: pos.line,
            column: pos.column,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>, index: usize, pos: Position) -> Self {
        ParseError {
            code,
            message: message.into(),
            index,
            line_number: pos.line,
            column: pos.column,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{} (offset {})",
            self.message, self.line_number, self.column, self.index
        )
    }
}

/// The only fatal surface of the parser: a script block (or the
/// `<script setup>` reconstruction) failed to parse. Coordinates are already
/// remapped into the original file.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line_number}:{column}")]
pub struct ParseFatalError {
    pub message: String,
    pub index: usize,
    pub line_number: usize,
    pub column: usize,
}

impl ParseFatalError {
    pub fn new(message: impl Into<String>, index: usize, pos: Position) -> Self {
        ParseFatalError {
            message: message.into(),
            index,
            line_number: pos.line,
            column: pos.column,
        }
    }
}
