//! Flat token stream emitted by the template tokenizer.

use serde::{Deserialize, Serialize};

use crate::location::{OffsetRange, SourceLocation};

/// Token types for template tokenization. The set is closed; downstream
/// consumers match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "HTMLTagOpen")]
    HtmlTagOpen,
    #[serde(rename = "HTMLEndTagOpen")]
    HtmlEndTagOpen,
    #[serde(rename = "HTMLTagClose")]
    HtmlTagClose,
    #[serde(rename = "HTMLSelfClosingTagClose")]
    HtmlSelfClosingTagClose,
    #[serde(rename = "HTMLIdentifier")]
    HtmlIdentifier,
    #[serde(rename = "HTMLLiteral")]
    HtmlLiteral,
    #[serde(rename = "HTMLAssociation")]
    HtmlAssociation,
    #[serde(rename = "HTMLText")]
    HtmlText,
    #[serde(rename = "HTMLWhitespace")]
    HtmlWhitespace,
    #[serde(rename = "HTMLRawText")]
    HtmlRawText,
    #[serde(rename = "HTMLRCDataText")]
    HtmlRcDataText,
    #[serde(rename = "HTMLCDataText")]
    HtmlCDataText,
    #[serde(rename = "HTMLComment")]
    HtmlComment,
    #[serde(rename = "HTMLBogusComment")]
    HtmlBogusComment,
    #[serde(rename = "VExpressionStart")]
    VExpressionStart,
    #[serde(rename = "VExpressionEnd")]
    VExpressionEnd,
    Punctuator,
}

/// A positioned token. `value` is the processed text: entities are decoded
/// for text and literal tokens, and tag-name identifiers are lowercased.
/// `range` always reproduces the raw byte span of the original source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub value: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

impl Token {
    pub fn new(token_type: TokenType, value: String, range: OffsetRange, loc: SourceLocation) -> Self {
        Token {
            token_type,
            value,
            range,
            loc,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::HtmlText
                | TokenType::HtmlWhitespace
                | TokenType::HtmlRawText
                | TokenType::HtmlRcDataText
                | TokenType::HtmlCDataText
        )
    }
}
