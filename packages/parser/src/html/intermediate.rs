//! Aggregates the flat token stream into the four events the template
//! parser consumes: start tags, end tags, text runs, and mustaches.
//!
//! Also the place where duplicate attributes and malformed end tags are
//! detected, and where adjacent text tokens merge into one run.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::ast::tokens::{Token, TokenType};
use crate::html::tokenizer::Tokenizer;
use crate::location::{ErrorCode, OffsetRange, ParseError, SourceLocation};

/// One attribute as tokenized: the name identifier, and optionally `=` plus
/// a value literal.
#[derive(Debug, Clone)]
pub struct AttributeTokens {
    pub key: Token,
    pub association: Option<Token>,
    pub value: Option<Token>,
}

impl AttributeTokens {
    pub fn range(&self) -> OffsetRange {
        let end = self
            .value
            .as_ref()
            .or(self.association.as_ref())
            .map_or(self.key.range[1], |t| t.range[1]);
        [self.key.range[0], end]
    }
}

#[derive(Debug)]
pub enum IntermediateToken {
    StartTag(StartTagEvent),
    EndTag(EndTagEvent),
    Text(TextEvent),
    Mustache(MustacheEvent),
}

#[derive(Debug)]
pub struct StartTagEvent {
    /// Lowercased tag name.
    pub name: String,
    /// Tag name as written.
    pub raw_name: String,
    pub self_closing: bool,
    pub attributes: Vec<AttributeTokens>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug)]
pub struct EndTagEvent {
    pub name: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug)]
pub struct TextEvent {
    pub token_type: TokenType,
    pub value: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug)]
pub struct MustacheEvent {
    /// Decoded text between the delimiters.
    pub value: String,
    /// Range including `{{` and `}}`.
    pub range: OffsetRange,
    /// Range of the body between the delimiters.
    pub value_range: OffsetRange,
    pub loc: SourceLocation,
}

pub struct IntermediateTokenizer<'a> {
    pub tokenizer: Tokenizer<'a>,
    /// Every token produced, in order.
    pub tokens: Vec<Token>,
    /// Comment tokens, kept out of the tree.
    pub comments: Vec<Token>,
    /// Aggregation-level errors (duplicate attributes, end-tag abuse).
    pub errors: Vec<ParseError>,
    queue: VecDeque<IntermediateToken>,
    text: Option<TextEvent>,
}

impl<'a> IntermediateTokenizer<'a> {
    pub fn new(tokenizer: Tokenizer<'a>) -> Self {
        IntermediateTokenizer {
            tokenizer,
            tokens: Vec::new(),
            comments: Vec::new(),
            errors: Vec::new(),
            queue: VecDeque::new(),
            text: None,
        }
    }

    pub fn next(&mut self) -> Option<IntermediateToken> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            let Some(token) = self.pull() else {
                self.flush_text();
                return self.queue.pop_front();
            };
            match token.token_type {
                TokenType::HtmlTagOpen => {
                    self.flush_text();
                    let event = self.aggregate_tag(token, false);
                    self.queue.push_back(event);
                }
                TokenType::HtmlEndTagOpen => {
                    self.flush_text();
                    let event = self.aggregate_tag(token, true);
                    self.queue.push_back(event);
                }
                TokenType::HtmlText
                | TokenType::HtmlRawText
                | TokenType::HtmlRcDataText
                | TokenType::HtmlCDataText => self.append_text(token),
                TokenType::HtmlComment | TokenType::HtmlBogusComment => {
                    self.flush_text();
                    self.comments.push(token);
                }
                TokenType::VExpressionStart => {
                    self.flush_text();
                    let event = self.aggregate_mustache(token);
                    self.queue.push_back(event);
                }
                // Stray close or whitespace tokens carry no event.
                _ => {}
            }
        }
    }

    fn pull(&mut self) -> Option<Token> {
        let token = self.tokenizer.next_token()?;
        self.tokens.push(token.clone());
        Some(token)
    }

    fn report(&mut self, code: ErrorCode, index: usize) {
        let pos = self.tokenizer.position_at(index);
        self.errors.push(ParseError::new(code, index, pos));
    }

    fn append_text(&mut self, token: Token) {
        match self.text.as_mut() {
            Some(text) if text.range[1] == token.range[0] && text.token_type == token.token_type => {
                text.value.push_str(&token.value);
                text.range[1] = token.range[1];
                text.loc.end = token.loc.end;
            }
            _ => {
                self.flush_text();
                self.text = Some(TextEvent {
                    token_type: token.token_type,
                    value: token.value,
                    range: token.range,
                    loc: token.loc,
                });
            }
        }
    }

    fn flush_text(&mut self) {
        if let Some(text) = self.text.take() {
            self.queue.push_back(IntermediateToken::Text(text));
        }
    }

    /// Consume attribute tokens up to the closing `>` / `/>` and build the
    /// tag event. The first occurrence of a duplicated attribute name wins.
    fn aggregate_tag(&mut self, open: Token, is_end_tag: bool) -> IntermediateToken {
        let name = open.value.clone();
        let raw_name = self.raw_tag_name(&open);
        let mut attributes: Vec<AttributeTokens> = Vec::new();
        let mut self_closing = false;
        let mut end = open.range[1];
        let mut end_loc = open.loc.end;

        while let Some(token) = self.pull() {
            match token.token_type {
                TokenType::HtmlIdentifier => {
                    attributes.push(AttributeTokens {
                        key: token,
                        association: None,
                        value: None,
                    });
                }
                TokenType::HtmlAssociation => {
                    if let Some(last) = attributes.last_mut() {
                        last.association = Some(token);
                    }
                }
                TokenType::HtmlLiteral => {
                    if let Some(last) = attributes.last_mut() {
                        if last.association.is_some() && last.value.is_none() {
                            last.value = Some(token);
                        }
                    }
                }
                TokenType::HtmlWhitespace => {}
                TokenType::HtmlTagClose => {
                    end = token.range[1];
                    end_loc = token.loc.end;
                    break;
                }
                TokenType::HtmlSelfClosingTagClose => {
                    self_closing = true;
                    end = token.range[1];
                    end_loc = token.loc.end;
                    break;
                }
                // The tokenizer bailed out of the tag (EOF recovery).
                _ => break,
            }
        }

        // Duplicate detection on the lowercased source keys.
        let mut seen: SmallVec<[String; 8]> = SmallVec::new();
        attributes.retain(|attribute| {
            let key = attribute.key.value.clone();
            if seen.contains(&key) {
                let index = attribute.key.range[0];
                let pos = attribute.key.loc.start;
                self.errors
                    .push(ParseError::new(ErrorCode::DuplicateAttribute, index, pos));
                false
            } else {
                seen.push(key);
                true
            }
        });

        let range = [open.range[0], end];
        let loc = SourceLocation::new(open.loc.start, end_loc);
        if is_end_tag {
            if !attributes.is_empty() {
                self.report(ErrorCode::EndTagWithAttributes, attributes[0].key.range[0]);
            }
            if self_closing {
                self.report(ErrorCode::EndTagWithTrailingSolidus, end.saturating_sub(2));
            }
            IntermediateToken::EndTag(EndTagEvent { name, range, loc })
        } else {
            IntermediateToken::StartTag(StartTagEvent {
                name,
                raw_name,
                self_closing,
                attributes,
                range,
                loc,
            })
        }
    }

    fn raw_tag_name(&self, open: &Token) -> String {
        let source = self.tokenizer.source();
        let skip = if open.token_type == TokenType::HtmlEndTagOpen { 2 } else { 1 };
        source[open.range[0] + skip..open.range[1]].to_string()
    }

    /// Collect mustache body text up to the matching `}}`.
    fn aggregate_mustache(&mut self, start: Token) -> IntermediateToken {
        let mut value = String::new();
        let mut body_end = start.range[1];
        let mut end = start.range[1];
        let mut end_loc = start.loc.end;
        while let Some(token) = self.pull() {
            match token.token_type {
                TokenType::HtmlText => {
                    value.push_str(&token.value);
                    body_end = token.range[1];
                    end = token.range[1];
                    end_loc = token.loc.end;
                }
                TokenType::VExpressionEnd => {
                    body_end = token.range[0];
                    end = token.range[1];
                    end_loc = token.loc.end;
                    break;
                }
                _ => break,
            }
        }
        IntermediateToken::Mustache(MustacheEvent {
            value,
            range: [start.range[0], end],
            value_range: [start.range[1], body_end],
            loc: SourceLocation::new(start.loc.start, end_loc),
        })
    }
}
