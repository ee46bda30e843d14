//! Byte-accurate template tokenizer.
//!
//! A deterministic state machine over the source text, modeled on the HTML
//! tokenization algorithm and extended with mustache recognition
//! (`{{ … }}`). Tokens are produced lazily through [`Tokenizer::next_token`];
//! malformed input never aborts — every problem is recorded as a
//! [`ParseError`] and tokenization continues from the HTML algorithm's
//! recovery state.
//!
//! The tokenizer also maintains two side tables consumed downstream:
//! `gaps` (original offsets of code units dropped by entity decoding and
//! CR/LF normalization) and `line_terminators` (offsets immediately after
//! each line break, feeding the lines-and-columns index).

use std::collections::VecDeque;

use crate::ast::tokens::{Token, TokenType};
use crate::chars;
use crate::html::entities::{LEGACY_NAMED_REFERENCES, NAMED_ENTITIES};
use crate::html::tags::{ContentModel, Namespace};
use crate::location::{ErrorCode, ParseError, Position, SourceLocation};

/// Tokenizer states. The set mirrors the HTML tokenization spec minus the
/// DOCTYPE sub-machine (markup declarations other than comments and CDATA
/// become bogus comments), plus the mustache states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    RcData,
    RcDataLessThanSign,
    RcDataEndTagOpen,
    RcDataEndTagName,
    RawText,
    RawTextLessThanSign,
    RawTextEndTagOpen,
    RawTextEndTagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentLessThanSign,
    CommentLessThanSignBang,
    CommentLessThanSignBangDash,
    CommentLessThanSignBangDashDash,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    CdataSection,
    CdataSectionBracket,
    CdataSectionEnd,
    CharacterReference,
    NamedCharacterReference,
    AmbiguousAmpersand,
    NumericCharacterReference,
    HexCharacterReferenceStart,
    DecimalCharacterReferenceStart,
    HexCharacterReference,
    DecimalCharacterReference,
    NumericCharacterReferenceEnd,
    VExpressionStart,
    VExpressionData,
    VExpressionEnd,
}

bitflags::bitflags! {
    /// Mode switches toggled by the template parser while tokenizing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenizerFlags: u8 {
        /// Recognize `{{ … }}` in data/RCDATA content.
        const EXPRESSION_ENABLED = 1 << 0;
        /// Treat `<` inside an interpolation as plain expression text.
        const INTERPOLATION_AS_NON_HTML = 1 << 1;
    }
}

/// The token under construction.
#[derive(Debug, Clone)]
struct ProvisionalToken {
    token_type: TokenType,
    start: usize,
    value: String,
}

pub struct Tokenizer<'a> {
    source: &'a str,
    /// Byte offset of the next character to read.
    pos: usize,
    /// Byte offset of the current character.
    offset: usize,
    /// Byte length of the current character (2 for a CRLF pair).
    cp_len: usize,
    /// Current code point, `None` at end of input. CRLF pairs and lone CRs
    /// are presented as `\n`.
    cp: Option<char>,
    reconsume: bool,
    state: State,
    return_state: State,

    namespace: Namespace,
    flags: TokenizerFlags,

    token: Option<ProvisionalToken>,
    committed: VecDeque<Token>,

    // character-reference scratch
    char_ref_start: usize,
    char_ref_buffer: String,
    char_ref_name: String,
    char_ref_code: u32,
    char_ref_overflow: bool,

    // tag scratch
    last_lt_offset: usize,
    solidus_offset: usize,
    /// Lowercased name of the last open tag, for raw-text end-tag matching.
    last_start_tag_name: String,
    /// Raw characters provisionally consumed after `<` in raw-text content.
    temp_buffer: String,
    temp_name: String,

    pub errors: Vec<ParseError>,
    /// Original offsets of code units dropped by decoding.
    pub gaps: Vec<usize>,
    /// Offsets of each line start; index 0 is always 0.
    line_starts: Vec<usize>,

    ended: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            pos: 0,
            offset: 0,
            cp_len: 0,
            cp: None,
            reconsume: false,
            state: State::Data,
            return_state: State::Data,
            namespace: Namespace::Html,
            flags: TokenizerFlags::INTERPOLATION_AS_NON_HTML,
            token: None,
            committed: VecDeque::new(),
            char_ref_start: 0,
            char_ref_buffer: String::new(),
            char_ref_name: String::new(),
            char_ref_code: 0,
            char_ref_overflow: false,
            last_lt_offset: 0,
            solidus_offset: 0,
            last_start_tag_name: String::new(),
            temp_buffer: String::new(),
            temp_name: String::new(),
            errors: Vec::new(),
            gaps: Vec::new(),
            line_starts: vec![0],
            ended: false,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Set by the template parser when an element is opened or closed. The
    /// tokenizer only consults the namespace for raw-text decisions.
    pub fn set_namespace(&mut self, namespace: Namespace) {
        self.namespace = namespace;
    }

    pub fn expression_enabled(&self) -> bool {
        self.flags.contains(TokenizerFlags::EXPRESSION_ENABLED)
    }

    pub fn set_expression_enabled(&mut self, enabled: bool) {
        self.flags.set(TokenizerFlags::EXPRESSION_ENABLED, enabled);
    }

    pub fn set_interpolation_as_non_html(&mut self, enabled: bool) {
        self.flags.set(TokenizerFlags::INTERPOLATION_AS_NON_HTML, enabled);
    }

    /// Switch the content model for the element just opened. Raw text and
    /// RCDATA need the tag name to recognize the matching end tag.
    pub fn set_content_model(&mut self, model: ContentModel, tag_name: &str) {
        match model {
            ContentModel::ParsableData => self.state = State::Data,
            ContentModel::RawText => {
                self.state = State::RawText;
                self.last_start_tag_name = chars::to_ascii_lowercase(tag_name);
            }
            ContentModel::EscapableRawText => {
                self.state = State::RcData;
                self.last_start_tag_name = chars::to_ascii_lowercase(tag_name);
            }
        }
    }

    /// Offsets immediately following each line break, in order.
    pub fn line_terminators(&self) -> &[usize] {
        &self.line_starts[1..]
    }

    pub fn position_at(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Position::new(line + 1, offset - self.line_starts[line])
    }

    fn location_for(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::new(self.position_at(start), self.position_at(end))
    }

    fn report(&mut self, code: ErrorCode, index: usize) {
        let pos = self.position_at(index);
        self.errors.push(ParseError::new(code, index, pos));
    }

    /// Pull the next committed token, pumping the state machine as needed.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.committed.pop_front() {
                return Some(token);
            }
            if self.ended {
                return None;
            }
            self.step();
        }
    }

    // ---------------------------------------------------------------------
    // cursor
    // ---------------------------------------------------------------------

    fn consume_next(&mut self) -> Option<char> {
        if self.reconsume {
            self.reconsume = false;
            return self.cp;
        }
        if self.pos >= self.source.len() {
            self.offset = self.source.len();
            self.cp_len = 0;
            self.cp = None;
            return None;
        }
        self.offset = self.pos;
        let c = self.source[self.pos..].chars().next().unwrap();
        let mut len = c.len_utf8();
        let presented = if c == chars::CR {
            if self.source.as_bytes().get(self.pos + 1) == Some(&b'\n') {
                // CRLF is presented as a single LF; the CR byte is a gap.
                self.gaps.push(self.pos);
                len = 2;
            }
            chars::LF
        } else {
            c
        };
        self.cp_len = len;
        self.pos += len;
        if presented == chars::LF {
            self.line_starts.push(self.pos);
        }
        self.cp = Some(presented);
        self.cp
    }

    fn reconsume_in(&mut self, state: State) {
        self.reconsume = true;
        self.state = state;
    }

    /// End offset of the current character (exclusive).
    fn cp_end(&self) -> usize {
        self.offset + self.cp_len
    }

    // ---------------------------------------------------------------------
    // token building
    // ---------------------------------------------------------------------

    fn start_token(&mut self, token_type: TokenType, start: usize) {
        debug_assert!(self.token.is_none(), "previous token not committed");
        self.token = Some(ProvisionalToken {
            token_type,
            start,
            value: String::new(),
        });
    }

    fn ensure_text_token(&mut self, token_type: TokenType) {
        if self.token.is_none() {
            self.start_token(token_type, self.offset);
        }
    }

    /// Like [`ensure_text_token`], for recovery paths that re-emit an
    /// already-consumed `<` (or `{`) as text: the token must start at that
    /// character, not at the current cursor.
    fn ensure_text_token_at(&mut self, token_type: TokenType, start: usize) {
        if self.token.is_none() {
            self.start_token(token_type, start);
        }
    }

    fn append_value(&mut self, c: char) {
        if let Some(token) = self.token.as_mut() {
            token.value.push(c);
        }
    }

    fn append_value_str(&mut self, s: &str) {
        if let Some(token) = self.token.as_mut() {
            token.value.push_str(s);
        }
    }

    fn commit_token(&mut self, end: usize) {
        if let Some(token) = self.token.take() {
            if end <= token.start {
                return;
            }
            let loc = self.location_for(token.start, end);
            self.committed.push_back(Token::new(
                token.token_type,
                token.value,
                [token.start, end],
                loc,
            ));
        }
    }

    /// Commit the pending text token (if any) ending at `end`.
    fn flush_text(&mut self, end: usize) {
        self.commit_token(end);
    }

    fn discard_token(&mut self) {
        self.token = None;
    }

    fn emit_punctuator(&mut self, token_type: TokenType, value: &str, start: usize, end: usize) {
        let loc = self.location_for(start, end);
        self.committed
            .push_back(Token::new(token_type, value.to_string(), [start, end], loc));
    }

    fn finish(&mut self) {
        self.ended = true;
    }

    // ---------------------------------------------------------------------
    // dispatch
    // ---------------------------------------------------------------------

    fn step(&mut self) {
        let cp = self.consume_next();
        match self.state {
            State::Data => self.state_data(cp),
            State::TagOpen => self.state_tag_open(cp),
            State::EndTagOpen => self.state_end_tag_open(cp),
            State::TagName => self.state_tag_name(cp),
            State::RcData => self.state_rcdata(cp),
            State::RcDataLessThanSign => self.state_rcdata_less_than_sign(cp),
            State::RcDataEndTagOpen => self.state_rcdata_end_tag_open(cp),
            State::RcDataEndTagName => self.state_rcdata_end_tag_name(cp),
            State::RawText => self.state_rawtext(cp),
            State::RawTextLessThanSign => self.state_rawtext_less_than_sign(cp),
            State::RawTextEndTagOpen => self.state_rawtext_end_tag_open(cp),
            State::RawTextEndTagName => self.state_rawtext_end_tag_name(cp),
            State::BeforeAttributeName => self.state_before_attribute_name(cp),
            State::AttributeName => self.state_attribute_name(cp),
            State::AfterAttributeName => self.state_after_attribute_name(cp),
            State::BeforeAttributeValue => self.state_before_attribute_value(cp),
            State::AttributeValueDoubleQuoted => self.state_attribute_value_quoted(cp, chars::DQ),
            State::AttributeValueSingleQuoted => self.state_attribute_value_quoted(cp, chars::SQ),
            State::AttributeValueUnquoted => self.state_attribute_value_unquoted(cp),
            State::AfterAttributeValueQuoted => self.state_after_attribute_value_quoted(cp),
            State::SelfClosingStartTag => self.state_self_closing_start_tag(cp),
            State::BogusComment => self.state_bogus_comment(cp),
            State::MarkupDeclarationOpen => self.state_markup_declaration_open(cp),
            State::CommentStart => self.state_comment_start(cp),
            State::CommentStartDash => self.state_comment_start_dash(cp),
            State::Comment => self.state_comment(cp),
            State::CommentLessThanSign => self.state_comment_less_than_sign(cp),
            State::CommentLessThanSignBang => self.state_comment_less_than_sign_bang(cp),
            State::CommentLessThanSignBangDash => self.state_comment_less_than_sign_bang_dash(cp),
            State::CommentLessThanSignBangDashDash => {
                self.state_comment_less_than_sign_bang_dash_dash(cp)
            }
            State::CommentEndDash => self.state_comment_end_dash(cp),
            State::CommentEnd => self.state_comment_end(cp),
            State::CommentEndBang => self.state_comment_end_bang(cp),
            State::CdataSection => self.state_cdata_section(cp),
            State::CdataSectionBracket => self.state_cdata_section_bracket(cp),
            State::CdataSectionEnd => self.state_cdata_section_end(cp),
            State::CharacterReference => self.state_character_reference(cp),
            State::NamedCharacterReference => self.state_named_character_reference(cp),
            State::AmbiguousAmpersand => self.state_ambiguous_ampersand(cp),
            State::NumericCharacterReference => self.state_numeric_character_reference(cp),
            State::HexCharacterReferenceStart => self.state_hex_character_reference_start(cp),
            State::DecimalCharacterReferenceStart => self.state_decimal_character_reference_start(cp),
            State::HexCharacterReference => self.state_hex_character_reference(cp),
            State::DecimalCharacterReference => self.state_decimal_character_reference(cp),
            State::NumericCharacterReferenceEnd => self.state_numeric_character_reference_end(cp),
            State::VExpressionStart => self.state_v_expression_start(cp),
            State::VExpressionData => self.state_v_expression_data(cp),
            State::VExpressionEnd => self.state_v_expression_end(cp),
        }
    }

    // ---------------------------------------------------------------------
    // data-like states
    // ---------------------------------------------------------------------

    fn state_data(&mut self, cp: Option<char>) {
        match cp {
            None => {
                self.flush_text(self.offset);
                self.finish();
            }
            Some(chars::AMPERSAND) => {
                self.ensure_text_token(TokenType::HtmlText);
                self.begin_character_reference(State::Data);
            }
            Some(chars::LT) => {
                self.flush_text(self.offset);
                self.last_lt_offset = self.offset;
                self.state = State::TagOpen;
            }
            Some(chars::LBRACE) if self.expression_enabled() => {
                // Open the text token before looking at the second brace so a
                // lone `{` stays covered by the token's range.
                self.ensure_text_token(TokenType::HtmlText);
                self.last_lt_offset = self.offset;
                self.return_state = State::Data;
                self.state = State::VExpressionStart;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.ensure_text_token(TokenType::HtmlText);
                self.append_value(chars::NULL);
            }
            Some(c) => {
                self.ensure_text_token(TokenType::HtmlText);
                self.append_value(c);
            }
        }
    }

    fn state_rcdata(&mut self, cp: Option<char>) {
        match cp {
            None => {
                self.flush_text(self.offset);
                self.finish();
            }
            Some(chars::AMPERSAND) => {
                self.ensure_text_token(TokenType::HtmlRcDataText);
                self.begin_character_reference(State::RcData);
            }
            Some(chars::LT) => {
                self.temp_buffer.clear();
                self.temp_name.clear();
                self.last_lt_offset = self.offset;
                self.state = State::RcDataLessThanSign;
            }
            Some(chars::LBRACE) if self.expression_enabled() => {
                self.ensure_text_token(TokenType::HtmlRcDataText);
                self.last_lt_offset = self.offset;
                self.return_state = State::RcData;
                self.state = State::VExpressionStart;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.ensure_text_token(TokenType::HtmlRcDataText);
                self.append_value(chars::REPLACEMENT);
            }
            Some(c) => {
                self.ensure_text_token(TokenType::HtmlRcDataText);
                self.append_value(c);
            }
        }
    }

    fn state_rawtext(&mut self, cp: Option<char>) {
        match cp {
            None => {
                self.flush_text(self.offset);
                self.finish();
            }
            Some(chars::LT) => {
                self.temp_buffer.clear();
                self.temp_name.clear();
                self.last_lt_offset = self.offset;
                self.state = State::RawTextLessThanSign;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.ensure_text_token(TokenType::HtmlRawText);
                self.append_value(chars::REPLACEMENT);
            }
            Some(c) => {
                self.ensure_text_token(TokenType::HtmlRawText);
                self.append_value(c);
            }
        }
    }

    // ---------------------------------------------------------------------
    // raw-text / RCDATA end tags
    // ---------------------------------------------------------------------

    fn state_rcdata_less_than_sign(&mut self, cp: Option<char>) {
        if cp == Some(chars::SLASH) {
            self.state = State::RcDataEndTagOpen;
        } else {
            self.ensure_text_token_at(TokenType::HtmlRcDataText, self.last_lt_offset);
            self.append_value(chars::LT);
            self.reconsume_in(State::RcData);
        }
    }

    fn state_rcdata_end_tag_open(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_ascii_letter(c) => {
                self.reconsume_in(State::RcDataEndTagName);
            }
            _ => {
                self.ensure_text_token_at(TokenType::HtmlRcDataText, self.last_lt_offset);
                self.append_value_str("</");
                self.reconsume_in(State::RcData);
            }
        }
    }

    fn state_rcdata_end_tag_name(&mut self, cp: Option<char>) {
        self.appropriate_end_tag_name(cp, State::RcData, TokenType::HtmlRcDataText);
    }

    fn state_rawtext_less_than_sign(&mut self, cp: Option<char>) {
        if cp == Some(chars::SLASH) {
            self.state = State::RawTextEndTagOpen;
        } else {
            self.ensure_text_token_at(TokenType::HtmlRawText, self.last_lt_offset);
            self.append_value(chars::LT);
            self.reconsume_in(State::RawText);
        }
    }

    fn state_rawtext_end_tag_open(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_ascii_letter(c) => {
                self.reconsume_in(State::RawTextEndTagName);
            }
            _ => {
                self.ensure_text_token_at(TokenType::HtmlRawText, self.last_lt_offset);
                self.append_value_str("</");
                self.reconsume_in(State::RawText);
            }
        }
    }

    fn state_rawtext_end_tag_name(&mut self, cp: Option<char>) {
        self.appropriate_end_tag_name(cp, State::RawText, TokenType::HtmlRawText);
    }

    /// Shared RCDATA/RAWTEXT end-tag-name handling. Only the end tag matching
    /// the open element terminates the text content; anything else is text.
    fn appropriate_end_tag_name(&mut self, cp: Option<char>, text_state: State, text_type: TokenType) {
        match cp {
            Some(c) if chars::is_ascii_letter(c) => {
                self.temp_name.push(c.to_ascii_lowercase());
                self.temp_buffer.push(c);
            }
            Some(c)
                if (chars::is_whitespace(c) || c == chars::SLASH || c == chars::GT)
                    && self.temp_name == self.last_start_tag_name =>
            {
                // Appropriate end tag: close the text content and hand the
                // tag machinery its usual states.
                self.flush_text(self.last_lt_offset);
                self.start_token(TokenType::HtmlEndTagOpen, self.last_lt_offset);
                let name = std::mem::take(&mut self.temp_name);
                self.append_value_str(&name);
                match c {
                    chars::GT => {
                        self.commit_token(self.offset);
                        self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                        self.state = State::Data;
                    }
                    chars::SLASH => {
                        self.commit_token(self.offset);
                        self.solidus_offset = self.offset;
                        self.state = State::SelfClosingStartTag;
                    }
                    _ => {
                        self.commit_token(self.offset);
                        self.reconsume_in(State::BeforeAttributeName);
                    }
                }
            }
            _ => {
                self.ensure_text_token_at(text_type, self.last_lt_offset);
                self.append_value_str("</");
                let buffered = std::mem::take(&mut self.temp_buffer);
                self.append_value_str(&buffered);
                self.temp_name.clear();
                self.reconsume_in(text_state);
            }
        }
    }

    // ---------------------------------------------------------------------
    // tag states
    // ---------------------------------------------------------------------

    fn state_tag_open(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::BANG) => {
                self.state = State::MarkupDeclarationOpen;
            }
            Some(chars::SLASH) => {
                self.state = State::EndTagOpen;
            }
            Some(c) if chars::is_ascii_letter(c) => {
                self.start_token(TokenType::HtmlTagOpen, self.last_lt_offset);
                self.reconsume_in(State::TagName);
            }
            Some(chars::QUESTION) => {
                self.report(ErrorCode::UnexpectedQuestionMarkInsteadOfTagName, self.offset);
                self.start_token(TokenType::HtmlBogusComment, self.last_lt_offset);
                self.reconsume_in(State::BogusComment);
            }
            None => {
                self.report(ErrorCode::EofBeforeTagName, self.offset);
                self.ensure_text_token_at(TokenType::HtmlText, self.last_lt_offset);
                self.append_value(chars::LT);
                self.flush_text(self.offset);
                self.finish();
            }
            Some(_) => {
                self.report(ErrorCode::InvalidFirstCharacterOfTagName, self.offset);
                self.ensure_text_token_at(TokenType::HtmlText, self.last_lt_offset);
                self.append_value(chars::LT);
                self.reconsume_in(State::Data);
            }
        }
    }

    fn state_end_tag_open(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_ascii_letter(c) => {
                self.start_token(TokenType::HtmlEndTagOpen, self.last_lt_offset);
                self.reconsume_in(State::TagName);
            }
            Some(chars::GT) => {
                self.report(ErrorCode::MissingEndTagName, self.offset);
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofBeforeTagName, self.offset);
                self.ensure_text_token_at(TokenType::HtmlText, self.last_lt_offset);
                self.append_value_str("</");
                self.flush_text(self.offset);
                self.finish();
            }
            Some(_) => {
                self.report(ErrorCode::InvalidFirstCharacterOfTagName, self.offset);
                self.start_token(TokenType::HtmlBogusComment, self.last_lt_offset);
                self.reconsume_in(State::BogusComment);
            }
        }
    }

    fn state_tag_name(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.commit_token(self.offset);
                self.reconsume_in(State::BeforeAttributeName);
            }
            Some(chars::SLASH) => {
                self.commit_token(self.offset);
                self.solidus_offset = self.offset;
                self.state = State::SelfClosingStartTag;
            }
            Some(chars::GT) => {
                self.commit_token(self.offset);
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(c) => {
                self.append_value(c.to_ascii_lowercase());
            }
        }
    }

    fn state_before_attribute_name(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.ensure_text_token(TokenType::HtmlWhitespace);
                self.append_value(c);
            }
            Some(chars::SLASH) => {
                self.flush_text(self.offset);
                self.solidus_offset = self.offset;
                self.state = State::SelfClosingStartTag;
            }
            Some(chars::GT) => {
                self.flush_text(self.offset);
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            Some(chars::EQ) => {
                self.report(ErrorCode::UnexpectedEqualsSignBeforeAttributeName, self.offset);
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlIdentifier, self.offset);
                self.append_value(chars::EQ);
                self.state = State::AttributeName;
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(_) => {
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlIdentifier, self.offset);
                self.reconsume_in(State::AttributeName);
            }
        }
    }

    fn state_attribute_name(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) || c == chars::SLASH || c == chars::GT => {
                self.commit_token(self.offset);
                self.reconsume_in(State::AfterAttributeName);
            }
            None => {
                self.commit_token(self.offset);
                self.reconsume_in(State::AfterAttributeName);
            }
            Some(chars::EQ) => {
                self.commit_token(self.offset);
                self.emit_punctuator(TokenType::HtmlAssociation, "=", self.offset, self.cp_end());
                self.state = State::BeforeAttributeValue;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            Some(c @ (chars::DQ | chars::SQ | chars::LT)) => {
                self.report(ErrorCode::UnexpectedCharacterInAttributeName, self.offset);
                self.append_value(c);
            }
            Some(c) => {
                self.append_value(c.to_ascii_lowercase());
            }
        }
    }

    fn state_after_attribute_name(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.ensure_text_token(TokenType::HtmlWhitespace);
                self.append_value(c);
            }
            Some(chars::SLASH) => {
                self.flush_text(self.offset);
                self.solidus_offset = self.offset;
                self.state = State::SelfClosingStartTag;
            }
            Some(chars::EQ) => {
                self.flush_text(self.offset);
                self.emit_punctuator(TokenType::HtmlAssociation, "=", self.offset, self.cp_end());
                self.state = State::BeforeAttributeValue;
            }
            Some(chars::GT) => {
                self.flush_text(self.offset);
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(_) => {
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlIdentifier, self.offset);
                self.reconsume_in(State::AttributeName);
            }
        }
    }

    fn state_before_attribute_value(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.ensure_text_token(TokenType::HtmlWhitespace);
                self.append_value(c);
            }
            Some(chars::DQ) => {
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlLiteral, self.offset);
                self.state = State::AttributeValueDoubleQuoted;
            }
            Some(chars::SQ) => {
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlLiteral, self.offset);
                self.state = State::AttributeValueSingleQuoted;
            }
            Some(chars::GT) => {
                self.report(ErrorCode::MissingAttributeValue, self.offset);
                self.flush_text(self.offset);
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(_) => {
                self.flush_text(self.offset);
                self.start_token(TokenType::HtmlLiteral, self.offset);
                self.reconsume_in(State::AttributeValueUnquoted);
            }
        }
    }

    fn state_attribute_value_quoted(&mut self, cp: Option<char>, quote: char) {
        match cp {
            Some(c) if c == quote => {
                self.commit_token(self.cp_end());
                self.state = State::AfterAttributeValueQuoted;
            }
            Some(chars::AMPERSAND) => {
                self.begin_character_reference(self.state);
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(c) => {
                self.append_value(c);
            }
        }
    }

    fn state_attribute_value_unquoted(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.commit_token(self.offset);
                self.reconsume_in(State::BeforeAttributeName);
            }
            Some(chars::AMPERSAND) => {
                self.begin_character_reference(State::AttributeValueUnquoted);
            }
            Some(chars::GT) => {
                self.commit_token(self.offset);
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            Some(c @ (chars::DQ | chars::SQ | chars::LT | chars::EQ | chars::BT)) => {
                self.report(ErrorCode::UnexpectedCharacterInUnquotedAttributeValue, self.offset);
                self.append_value(c);
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(c) => {
                self.append_value(c);
            }
        }
    }

    fn state_after_attribute_value_quoted(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_whitespace(c) => {
                self.ensure_text_token(TokenType::HtmlWhitespace);
                self.append_value(c);
                self.state = State::BeforeAttributeName;
            }
            Some(chars::SLASH) => {
                self.solidus_offset = self.offset;
                self.state = State::SelfClosingStartTag;
            }
            Some(chars::GT) => {
                self.emit_punctuator(TokenType::HtmlTagClose, ">", self.offset, self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(_) => {
                self.report(ErrorCode::MissingWhitespaceBetweenAttributes, self.offset);
                self.reconsume_in(State::BeforeAttributeName);
            }
        }
    }

    fn state_self_closing_start_tag(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::GT) => {
                self.emit_punctuator(
                    TokenType::HtmlSelfClosingTagClose,
                    "/>",
                    self.solidus_offset,
                    self.cp_end(),
                );
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInTag, self.offset);
                self.discard_token();
                self.finish();
            }
            Some(_) => {
                self.report(ErrorCode::UnexpectedSolidusInTag, self.solidus_offset);
                self.reconsume_in(State::BeforeAttributeName);
            }
        }
    }

    // ---------------------------------------------------------------------
    // comments / markup declarations / CDATA
    // ---------------------------------------------------------------------

    fn state_markup_declaration_open(&mut self, cp: Option<char>) {
        // Reconsume so the raw lookahead below starts at the current char.
        self.reconsume = true;
        let _ = cp;
        let rest = &self.source[self.offset.min(self.source.len())..];
        if rest.starts_with("--") {
            self.reconsume = false;
            self.consume_next(); // second '-'
            self.start_token(TokenType::HtmlComment, self.last_lt_offset);
            self.state = State::CommentStart;
        } else if rest.starts_with("[CDATA[") {
            self.reconsume = false;
            for _ in 0..6 {
                self.consume_next();
            }
            if self.namespace == Namespace::Html {
                self.report(ErrorCode::CdataInHtmlContent, self.last_lt_offset);
                self.start_token(TokenType::HtmlBogusComment, self.last_lt_offset);
                self.append_value_str("[CDATA[");
                self.state = State::BogusComment;
            } else {
                self.start_token(TokenType::HtmlCDataText, self.last_lt_offset);
                self.state = State::CdataSection;
            }
        } else {
            self.report(ErrorCode::IncorrectlyOpenedComment, self.last_lt_offset);
            self.start_token(TokenType::HtmlBogusComment, self.last_lt_offset);
            self.state = State::BogusComment;
        }
    }

    fn state_bogus_comment(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::GT) => {
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.commit_token(self.offset);
                self.finish();
            }
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            Some(c) => {
                self.append_value(c);
            }
        }
    }

    fn state_comment_start(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::MINUS) => self.state = State::CommentStartDash,
            Some(chars::GT) => {
                self.report(ErrorCode::AbruptClosingOfEmptyComment, self.offset);
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            _ => self.reconsume_in(State::Comment),
        }
    }

    fn state_comment_start_dash(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::MINUS) => self.state = State::CommentEnd,
            Some(chars::GT) => {
                self.report(ErrorCode::AbruptClosingOfEmptyComment, self.offset);
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInComment, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(_) => {
                self.append_value(chars::MINUS);
                self.reconsume_in(State::Comment);
            }
        }
    }

    fn state_comment(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::LT) => {
                self.append_value(chars::LT);
                self.state = State::CommentLessThanSign;
            }
            Some(chars::MINUS) => self.state = State::CommentEndDash,
            Some(chars::NULL) => {
                self.report(ErrorCode::UnexpectedNullCharacter, self.offset);
                self.append_value(chars::REPLACEMENT);
            }
            None => {
                self.report(ErrorCode::EofInComment, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(c) => self.append_value(c),
        }
    }

    fn state_comment_less_than_sign(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::BANG) => {
                self.append_value(chars::BANG);
                self.state = State::CommentLessThanSignBang;
            }
            Some(chars::LT) => self.append_value(chars::LT),
            _ => self.reconsume_in(State::Comment),
        }
    }

    fn state_comment_less_than_sign_bang(&mut self, cp: Option<char>) {
        if cp == Some(chars::MINUS) {
            self.state = State::CommentLessThanSignBangDash;
        } else {
            self.reconsume_in(State::Comment);
        }
    }

    fn state_comment_less_than_sign_bang_dash(&mut self, cp: Option<char>) {
        if cp == Some(chars::MINUS) {
            self.state = State::CommentLessThanSignBangDashDash;
        } else {
            self.reconsume_in(State::CommentEndDash);
        }
    }

    fn state_comment_less_than_sign_bang_dash_dash(&mut self, cp: Option<char>) {
        if cp != Some(chars::GT) && cp.is_some() {
            self.report(ErrorCode::NestedComment, self.offset);
        }
        self.reconsume_in(State::CommentEnd);
    }

    fn state_comment_end_dash(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::MINUS) => self.state = State::CommentEnd,
            None => {
                self.report(ErrorCode::EofInComment, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(_) => {
                self.append_value(chars::MINUS);
                self.reconsume_in(State::Comment);
            }
        }
    }

    fn state_comment_end(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::GT) => {
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            Some(chars::BANG) => self.state = State::CommentEndBang,
            Some(chars::MINUS) => self.append_value(chars::MINUS),
            None => {
                self.report(ErrorCode::EofInComment, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(_) => {
                self.append_value_str("--");
                self.reconsume_in(State::Comment);
            }
        }
    }

    fn state_comment_end_bang(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::MINUS) => {
                self.append_value_str("--!");
                self.state = State::CommentEndDash;
            }
            Some(chars::GT) => {
                self.report(ErrorCode::IncorrectlyClosedComment, self.offset);
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            None => {
                self.report(ErrorCode::EofInComment, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(_) => {
                self.append_value_str("--!");
                self.reconsume_in(State::Comment);
            }
        }
    }

    fn state_cdata_section(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::RBRACKET) => self.state = State::CdataSectionBracket,
            None => {
                self.report(ErrorCode::EofInCdata, self.offset);
                self.commit_token(self.offset);
                self.finish();
            }
            Some(c) => self.append_value(c),
        }
    }

    fn state_cdata_section_bracket(&mut self, cp: Option<char>) {
        if cp == Some(chars::RBRACKET) {
            self.state = State::CdataSectionEnd;
        } else {
            self.append_value(chars::RBRACKET);
            self.reconsume_in(State::CdataSection);
        }
    }

    fn state_cdata_section_end(&mut self, cp: Option<char>) {
        match cp {
            Some(chars::GT) => {
                self.commit_token(self.cp_end());
                self.state = State::Data;
            }
            Some(chars::RBRACKET) => self.append_value(chars::RBRACKET),
            _ => {
                self.append_value_str("]]");
                self.reconsume_in(State::CdataSection);
            }
        }
    }

    // ---------------------------------------------------------------------
    // character references
    // ---------------------------------------------------------------------

    fn begin_character_reference(&mut self, return_state: State) {
        self.return_state = return_state;
        self.char_ref_start = self.offset;
        self.char_ref_buffer.clear();
        self.char_ref_buffer.push(chars::AMPERSAND);
        self.char_ref_name.clear();
        self.char_ref_code = 0;
        self.char_ref_overflow = false;
        self.state = State::CharacterReference;
    }

    /// Append decoded text to the current token and record the shrink.
    fn append_decoded(&mut self, decoded: &str, raw_len: usize) {
        let token_type = self.char_ref_token_type();
        self.ensure_text_token(token_type);
        self.append_value_str(decoded);
        let decoded_len = decoded.len();
        for i in decoded_len..raw_len {
            self.gaps.push(self.char_ref_start + i);
        }
    }

    /// Append the raw (undecoded) reference text to the current token.
    fn flush_char_ref_raw(&mut self) {
        let token_type = self.char_ref_token_type();
        self.ensure_text_token(token_type);
        let raw = std::mem::take(&mut self.char_ref_buffer);
        self.append_value_str(&raw);
        self.char_ref_buffer = raw;
    }

    fn char_ref_token_type(&self) -> TokenType {
        match self.return_state {
            State::Data | State::VExpressionData => TokenType::HtmlText,
            State::RcData => TokenType::HtmlRcDataText,
            State::AttributeValueDoubleQuoted
            | State::AttributeValueSingleQuoted
            | State::AttributeValueUnquoted => TokenType::HtmlLiteral,
            _ => TokenType::HtmlText,
        }
    }

    fn in_attribute_value(&self) -> bool {
        matches!(
            self.return_state,
            State::AttributeValueDoubleQuoted
                | State::AttributeValueSingleQuoted
                | State::AttributeValueUnquoted
        )
    }

    fn state_character_reference(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if c.is_ascii_alphanumeric() => {
                self.reconsume_in(State::NamedCharacterReference);
            }
            Some(chars::HASH) => {
                self.char_ref_buffer.push(chars::HASH);
                self.state = State::NumericCharacterReference;
            }
            _ => {
                self.flush_char_ref_raw();
                self.reconsume_in(self.return_state);
            }
        }
    }

    fn state_named_character_reference(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if c.is_ascii_alphanumeric() => {
                self.char_ref_name.push(c);
                self.char_ref_buffer.push(c);
            }
            Some(chars::SEMICOLON) => {
                self.char_ref_buffer.push(chars::SEMICOLON);
                let raw_len = self.char_ref_buffer.len();
                match NAMED_ENTITIES.get(self.char_ref_name.as_str()) {
                    Some(decoded) => {
                        let decoded = *decoded;
                        self.append_decoded(decoded, raw_len);
                    }
                    None => {
                        self.report(ErrorCode::UnknownNamedCharacterReference, self.char_ref_start);
                        self.flush_char_ref_raw();
                    }
                }
                self.state = self.return_state;
            }
            other => {
                // No semicolon. The legacy subset still decodes, except in
                // attribute values followed by `=` or an alphanumeric.
                let followed_by_eq_or_alnum =
                    matches!(other, Some(c) if c == chars::EQ || c.is_ascii_alphanumeric());
                let legacy = LEGACY_NAMED_REFERENCES.contains(&self.char_ref_name.as_str());
                if legacy && !(self.in_attribute_value() && followed_by_eq_or_alnum) {
                    self.report(
                        ErrorCode::MissingSemicolonAfterCharacterReference,
                        self.char_ref_start,
                    );
                    let raw_len = self.char_ref_buffer.len();
                    let decoded = *NAMED_ENTITIES.get(self.char_ref_name.as_str()).unwrap();
                    self.append_decoded(decoded, raw_len);
                    self.reconsume_in(self.return_state);
                } else {
                    self.flush_char_ref_raw();
                    self.reconsume_in(State::AmbiguousAmpersand);
                }
            }
        }
    }

    fn state_ambiguous_ampersand(&mut self, cp: Option<char>) {
        // The raw text was already flushed; just hand the character back.
        let _ = cp;
        self.reconsume_in(self.return_state);
    }

    fn state_numeric_character_reference(&mut self, cp: Option<char>) {
        self.char_ref_code = 0;
        self.char_ref_overflow = false;
        match cp {
            Some(c @ ('x' | 'X')) => {
                self.char_ref_buffer.push(c);
                self.state = State::HexCharacterReferenceStart;
            }
            _ => self.reconsume_in(State::DecimalCharacterReferenceStart),
        }
    }

    fn state_hex_character_reference_start(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_ascii_hex_digit(c) => {
                self.reconsume_in(State::HexCharacterReference);
            }
            _ => {
                self.report(
                    ErrorCode::AbsenceOfDigitsInNumericCharacterReference,
                    self.char_ref_start,
                );
                self.flush_char_ref_raw();
                self.reconsume_in(self.return_state);
            }
        }
    }

    fn state_decimal_character_reference_start(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_digit(c) => {
                self.reconsume_in(State::DecimalCharacterReference);
            }
            _ => {
                self.report(
                    ErrorCode::AbsenceOfDigitsInNumericCharacterReference,
                    self.char_ref_start,
                );
                self.flush_char_ref_raw();
                self.reconsume_in(self.return_state);
            }
        }
    }

    fn state_hex_character_reference(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_ascii_hex_digit(c) => {
                self.char_ref_buffer.push(c);
                self.push_char_ref_digit(c.to_digit(16).unwrap(), 16);
            }
            Some(chars::SEMICOLON) => {
                self.char_ref_buffer.push(chars::SEMICOLON);
                self.state = State::NumericCharacterReferenceEnd;
                self.reconsume = true;
            }
            _ => {
                self.report(
                    ErrorCode::MissingSemicolonAfterCharacterReference,
                    self.char_ref_start,
                );
                self.reconsume_in(State::NumericCharacterReferenceEnd);
            }
        }
    }

    fn state_decimal_character_reference(&mut self, cp: Option<char>) {
        match cp {
            Some(c) if chars::is_digit(c) => {
                self.char_ref_buffer.push(c);
                self.push_char_ref_digit(c.to_digit(10).unwrap(), 10);
            }
            Some(chars::SEMICOLON) => {
                self.char_ref_buffer.push(chars::SEMICOLON);
                self.state = State::NumericCharacterReferenceEnd;
                self.reconsume = true;
            }
            _ => {
                self.report(
                    ErrorCode::MissingSemicolonAfterCharacterReference,
                    self.char_ref_start,
                );
                self.reconsume_in(State::NumericCharacterReferenceEnd);
            }
        }
    }

    fn push_char_ref_digit(&mut self, digit: u32, base: u32) {
        match self
            .char_ref_code
            .checked_mul(base)
            .and_then(|v| v.checked_add(digit))
        {
            Some(v) => self.char_ref_code = v,
            None => self.char_ref_overflow = true,
        }
    }

    fn state_numeric_character_reference_end(&mut self, cp: Option<char>) {
        // Entered with the terminator already handled; decode and return.
        let _ = cp;
        let code = self.char_ref_code;
        let decoded = if self.char_ref_overflow || code > 0x10FFFF {
            self.report(
                ErrorCode::CharacterReferenceOutsideUnicodeRange,
                self.char_ref_start,
            );
            chars::REPLACEMENT
        } else if code == 0 {
            self.report(ErrorCode::NullCharacterReference, self.char_ref_start);
            chars::REPLACEMENT
        } else if (0xD800..=0xDFFF).contains(&code) {
            self.report(ErrorCode::SurrogateCharacterReference, self.char_ref_start);
            chars::REPLACEMENT
        } else {
            if (code & 0xFFFE) == 0xFFFE || (0xFDD0..=0xFDEF).contains(&code) {
                self.report(
                    ErrorCode::NoncharacterCharacterReference,
                    self.char_ref_start,
                );
            } else if code < 0x20 && !matches!(code, 0x09 | 0x0A | 0x0C) {
                self.report(ErrorCode::ControlCharacterReference, self.char_ref_start);
            }
            char::from_u32(code).unwrap_or(chars::REPLACEMENT)
        };
        let raw_len = self.char_ref_buffer.len();
        let decoded_str = decoded.to_string();
        self.append_decoded(&decoded_str, raw_len);
        // The terminator was either the semicolon (still current) or a
        // non-digit that must be reprocessed by the return state.
        if self.cp == Some(chars::SEMICOLON) {
            self.reconsume = false;
            self.state = self.return_state;
        } else {
            self.reconsume_in(self.return_state);
        }
    }

    // ---------------------------------------------------------------------
    // mustache states
    // ---------------------------------------------------------------------

    fn state_v_expression_start(&mut self, cp: Option<char>) {
        if cp == Some(chars::LBRACE) {
            self.flush_text(self.last_lt_offset);
            self.emit_punctuator(
                TokenType::VExpressionStart,
                "{{",
                self.last_lt_offset,
                self.cp_end(),
            );
            if self.flags.contains(TokenizerFlags::INTERPOLATION_AS_NON_HTML) {
                self.state = State::VExpressionData;
            } else {
                self.state = self.return_state;
            }
        } else {
            let text_type = match self.return_state {
                State::RcData => TokenType::HtmlRcDataText,
                _ => TokenType::HtmlText,
            };
            self.ensure_text_token(text_type);
            self.append_value(chars::LBRACE);
            self.reconsume_in(self.return_state);
        }
    }

    fn state_v_expression_data(&mut self, cp: Option<char>) {
        match cp {
            None => {
                self.flush_text(self.offset);
                self.report(ErrorCode::XMissingExpressionEnd, self.offset);
                self.finish();
            }
            Some(chars::AMPERSAND) => {
                self.ensure_text_token(TokenType::HtmlText);
                self.begin_character_reference(State::VExpressionData);
            }
            Some(chars::RBRACE) => {
                self.last_lt_offset = self.offset;
                self.state = State::VExpressionEnd;
            }
            Some(c) => {
                self.ensure_text_token(TokenType::HtmlText);
                self.append_value(c);
            }
        }
    }

    fn state_v_expression_end(&mut self, cp: Option<char>) {
        if cp == Some(chars::RBRACE) {
            self.flush_text(self.last_lt_offset);
            self.emit_punctuator(
                TokenType::VExpressionEnd,
                "}}",
                self.last_lt_offset,
                self.cp_end(),
            );
            self.state = State::Data;
        } else {
            self.ensure_text_token(TokenType::HtmlText);
            self.append_value(chars::RBRACE);
            self.reconsume_in(State::VExpressionData);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.next_token() {
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn test_token_ranges_cover_source_spans() {
        let source = "<div class=\"a\">x</div>";
        for token in tokenize(source) {
            let slice = &source[token.range[0]..token.range[1]];
            assert!(!slice.is_empty());
        }
    }

    #[test]
    fn test_crlf_is_one_line_terminator() {
        let mut tokenizer = Tokenizer::new("a\r\nb");
        while tokenizer.next_token().is_some() {}
        assert_eq!(tokenizer.line_terminators(), &[3]);
        assert_eq!(tokenizer.gaps, vec![1]);
    }
}
