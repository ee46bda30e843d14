//! Character constants and classes shared by the template and script
//! tokenizers.
#![allow(non_upper_case_globals)]

pub const EOF: char = '\0';
pub const NULL: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const FF: char = '\x0C';
pub const CR: char = '\r';
pub const SPACE: char = ' ';

pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';
pub const AT: char = '@';
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const UNDERSCORE: char = '_';
pub const BT: char = '`';
pub const LBRACE: char = '{';
pub const RBRACE: char = '}';

/// Unicode replacement character, substituted for invalid code points.
pub const REPLACEMENT: char = '\u{FFFD}';

/// HTML whitespace per the tokenization spec (not Unicode whitespace).
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == LF || ch == CR || ch == FF
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

pub fn is_ascii_hex_digit(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

pub fn is_upper_ascii_letter(ch: char) -> bool {
    ch.is_ascii_uppercase()
}

pub fn is_new_line(ch: char) -> bool {
    ch == LF || ch == CR
}

pub fn is_quote(ch: char) -> bool {
    ch == SQ || ch == DQ || ch == BT
}

/// Start of an ECMAScript identifier. `$` and `_` are starters; the
/// non-ASCII range is approximated by `char::is_alphabetic`.
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == UNDERSCORE || ch == DOLLAR || (!ch.is_ascii() && ch.is_alphabetic())
}

pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit() || (!ch.is_ascii() && ch.is_numeric())
}

/// Lowercase a tag or attribute name the way the HTML spec does: ASCII
/// uppercase letters only, anything else untouched.
pub fn to_ascii_lowercase(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c })
        .collect()
}
