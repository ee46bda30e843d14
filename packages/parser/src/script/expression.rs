//! Directive-expression transformer.
//!
//! Template expressions arrive as raw source slices (mustache bodies,
//! directive values). Each is entity-decoded into a working buffer with a
//! per-expression gap list, relocated inside a surrogate script whose
//! whitespace prefix reproduces the original line/column geometry, parsed,
//! stripped of its wrapper tokens, and fixed back onto original offsets.
//! Iteration and slot-scope forms additionally yield element variables.

use std::rc::Rc;

use crate::ast::es;
use crate::ast::nodes::{
    ContainerExpression, Reference, ReferenceMode, VForExpression, VSlotScopeExpression,
    VariableHandle, VariableKind,
};
use crate::html::entities::{LEGACY_NAMED_REFERENCES, NAMED_ENTITIES};
use crate::line_index::LineIndex;
use crate::location::{ErrorCode, OffsetRange, ParseError};
use crate::location_calculator::{GapEntry, GapRecorder, LocationCalculator};
use crate::script::es_lexer::{EsSyntaxError, EsToken};
use crate::script::es_parser::EsParserOptions;
use crate::script::scope;
use crate::script::{
    fix_expression_locations, fix_pattern_locations, fix_token_locations, ScriptParser,
};

/// What the enclosing construct expects of the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// Mustaches, `v-bind`, `v-if`, dynamic arguments, …
    Standard,
    /// `v-for` iteration heads.
    VFor,
    /// `v-on` handlers; the synthetic `$event` binding is elided.
    VOn,
    /// `slot-scope` / `scope` parameter lists.
    SlotScope,
}

/// Everything the template parser needs to finish a `VExpressionContainer`.
#[derive(Debug)]
pub struct TransformedExpression {
    pub expression: Option<ContainerExpression>,
    pub references: Vec<Reference>,
    /// Element variables introduced by `v-for` / slot scope.
    pub variables: Vec<VariableHandle>,
    pub tokens: Vec<EsToken>,
}

pub struct ExpressionContext<'a> {
    pub source: &'a str,
    pub line_index: Rc<LineIndex>,
    pub parser: &'a dyn ScriptParser,
    pub options: EsParserOptions,
}

impl<'a> ExpressionContext<'a> {
    /// Parse the expression body at `body_range` (original coordinates,
    /// delimiters excluded). A syntax error is returned as the recoverable
    /// `ParseError` the container stores; it never propagates.
    pub fn transform(
        &self,
        body_range: OffsetRange,
        kind: ExpressionKind,
    ) -> Result<TransformedExpression, ParseError> {
        let raw = &self.source[body_range[0]..body_range[1]];
        let (decoded, gaps) = decode_template_text(raw);
        if decoded.trim().is_empty() {
            return Ok(TransformedExpression {
                expression: None,
                references: Vec::new(),
                variables: Vec::new(),
                tokens: Vec::new(),
            });
        }
        let calculator = LocationCalculator::new(Rc::clone(&self.line_index), body_range[0], gaps);
        let result = match kind {
            ExpressionKind::Standard => self.parse_standard(&decoded, body_range, &calculator),
            ExpressionKind::VOn => self.parse_standard(&decoded, body_range, &calculator).map(|mut r| {
                // `$event` is supplied by the host runtime, not the scope.
                r.references.retain(|reference| reference.id.name != "$event");
                r
            }),
            ExpressionKind::VFor => self.parse_v_for(&decoded, body_range, &calculator),
            ExpressionKind::SlotScope => self.parse_slot_scope(&decoded, body_range, &calculator),
        };
        result.map_err(|error| self.to_parse_error(error, &calculator))
    }

    fn to_parse_error(&self, error: EsSyntaxError, calculator: &LocationCalculator) -> ParseError {
        let (index, pos) = super::fix_error_offset(&error, calculator);
        ParseError::with_message(ErrorCode::XExpressionError, error.message, index, pos)
    }

    fn parser_options(&self) -> EsParserOptions {
        EsParserOptions {
            source_type: es::SourceType::Script,
            ..self.options
        }
    }

    fn parse_standard(
        &self,
        decoded: &str,
        body_range: OffsetRange,
        calculator: &LocationCalculator,
    ) -> Result<TransformedExpression, EsSyntaxError> {
        let base = body_range[0];
        let prefix = super::whitespace_prefix(self.source, base - 1);
        let code = format!("{prefix}({decoded})");
        let parsed = self.parser.parse_program(&code, self.parser_options())?;
        let mut program = parsed.program;
        let mut tokens = parsed.tokens;

        let mut expression = match program.body.pop() {
            Some(es::Statement::ExpressionStatement(stmt)) if program.body.is_empty() => {
                stmt.expression
            }
            _ => return Err(EsSyntaxError::new("Expected a single expression", base)),
        };

        // Drop the wrapper parentheses from the token stream.
        if tokens.first().is_some_and(|t| t.is_punctuator("(")) {
            tokens.remove(0);
        }
        if tokens.last().is_some_and(|t| t.is_punctuator(")")) {
            tokens.pop();
        }

        fix_expression_locations(&mut expression, calculator);
        fix_token_locations(&mut tokens, calculator);
        let references = collect_references(&expression, self.parser_options());

        Ok(TransformedExpression {
            expression: Some(ContainerExpression::Expression(expression)),
            references,
            variables: Vec::new(),
            tokens,
        })
    }

    fn parse_v_for(
        &self,
        decoded: &str,
        body_range: OffsetRange,
        calculator: &LocationCalculator,
    ) -> Result<TransformedExpression, EsSyntaxError> {
        let base = body_range[0];
        // `(alias, index) of xs` is not a valid for-head; swap the outer
        // parentheses to brackets (same byte length) and restore them in the
        // token stream afterwards.
        let (rewritten, paren_offsets) = rewrite_alias_parens(decoded);
        let prefix = super::whitespace_prefix(self.source, base - 4);
        let code = format!("{prefix}for({rewritten});");
        let parsed = self.parser.parse_program(&code, self.parser_options())?;
        let mut program = parsed.program;
        let mut tokens = parsed.tokens;

        let body_end = base + decoded.len();
        // Strip `for`, `(`, `)`, `;` wrapper tokens.
        tokens.retain(|t| t.range[0] >= base && t.range[1] <= body_end);
        // Restore the rewritten alias parentheses.
        if let Some((open, close)) = paren_offsets {
            for token in &mut tokens {
                if token.range[0] == base + open && token.is_punctuator("[") {
                    token.value = "(".to_string();
                } else if token.range[0] == base + close && token.is_punctuator("]") {
                    token.value = ")".to_string();
                }
            }
        }

        let statement = match program.body.pop() {
            Some(statement) if program.body.is_empty() => statement,
            _ => return Err(EsSyntaxError::new("Invalid iteration expression", base)),
        };
        let (left_target, mut right) = match statement {
            es::Statement::ForOfStatement(stmt) => (stmt.left, stmt.right),
            es::Statement::ForInStatement(stmt) => (stmt.left, stmt.right),
            _ => return Err(EsSyntaxError::new("Invalid iteration expression", base)),
        };
        let pattern = match left_target {
            es::ForTarget::Pattern(pattern) => pattern,
            es::ForTarget::Declaration(_) => {
                return Err(EsSyntaxError::new("Invalid iteration alias", base));
            }
        };

        // A rewritten head keeps the array elements as the alias list;
        // otherwise the single pattern is wrapped.
        let mut left: Vec<es::Pattern> = match (paren_offsets.is_some(), pattern) {
            (true, es::Pattern::ArrayPattern(array)) => array.elements.into_iter().flatten().collect(),
            (_, other) => vec![other],
        };

        for pattern in &mut left {
            fix_pattern_locations(pattern, calculator);
        }
        fix_expression_locations(&mut right, calculator);
        fix_token_locations(&mut tokens, calculator);

        // Alias identifiers become element variables and leave the
        // reference list.
        let mut alias_ids = Vec::new();
        for pattern in &left {
            collect_pattern_identifiers(pattern, &mut alias_ids);
        }
        let mut references = collect_for_head_references(&left, &right, self.parser_options());
        references.retain(|reference| {
            !alias_ids.iter().any(|alias| alias.range == reference.id.range)
        });
        let variables = alias_ids
            .into_iter()
            .map(|id| VariableHandle::new(id, VariableKind::VFor))
            .collect();

        let range = body_range;
        let loc = calculator.location_for(range);
        let expression = VForExpression::new(left, right, range, loc);

        Ok(TransformedExpression {
            expression: Some(ContainerExpression::VForExpression(expression)),
            references,
            variables,
            tokens,
        })
    }

    fn parse_slot_scope(
        &self,
        decoded: &str,
        body_range: OffsetRange,
        calculator: &LocationCalculator,
    ) -> Result<TransformedExpression, EsSyntaxError> {
        let base = body_range[0];
        let prefix = super::whitespace_prefix(self.source, base - 1);
        let code = format!("{prefix}({decoded})=>{{}}");
        let parsed = self.parser.parse_program(&code, self.parser_options())?;
        let mut program = parsed.program;
        let mut tokens = parsed.tokens;

        let arrow = match program.body.pop() {
            Some(es::Statement::ExpressionStatement(stmt)) if program.body.is_empty() => {
                match stmt.expression {
                    es::Expression::ArrowFunctionExpression(arrow) => arrow,
                    _ => return Err(EsSyntaxError::new("Invalid scope parameters", base)),
                }
            }
            _ => return Err(EsSyntaxError::new("Invalid scope parameters", base)),
        };

        let body_end = base + decoded.len();
        tokens.retain(|t| t.range[0] >= base && t.range[1] <= body_end);

        let mut params = arrow.params;
        for param in &mut params {
            fix_pattern_locations(param, calculator);
        }
        fix_token_locations(&mut tokens, calculator);

        let mut param_ids = Vec::new();
        for param in &params {
            collect_pattern_identifiers(param, &mut param_ids);
        }
        let references = collect_param_default_references(&params, self.parser_options());
        let variables = param_ids
            .into_iter()
            .map(|id| VariableHandle::new(id, VariableKind::Scope))
            .collect();

        let range = body_range;
        let loc = calculator.location_for(range);
        let expression = VSlotScopeExpression::new(params, range, loc);

        Ok(TransformedExpression {
            expression: Some(ContainerExpression::VSlotScopeExpression(expression)),
            references,
            variables,
            tokens,
        })
    }
}

// ---------------------------------------------------------------------------
// reference collection helpers
// ---------------------------------------------------------------------------

fn references_from_manager(manager: scope::ScopeManager) -> Vec<Reference> {
    let mut references: Vec<Reference> = manager
        .unresolved()
        .iter()
        .map(|r| Reference::new(r.id.clone(), r.mode))
        .collect();
    references.sort_by_key(|r| r.id.range[0]);
    references
}

/// External references of a fixed expression.
fn collect_references(expression: &es::Expression, options: EsParserOptions) -> Vec<Reference> {
    let program = wrap_expression(expression.clone(), options);
    references_from_manager(scope::analyze_program(&program))
}

/// References of a `v-for` head: alias writes plus iterable reads.
fn collect_for_head_references(
    left: &[es::Pattern],
    right: &es::Expression,
    options: EsParserOptions,
) -> Vec<Reference> {
    let range = [
        left.first().map_or(right.range()[0], |p| p.range()[0]),
        right.range()[1],
    ];
    let loc = crate::script::es_parser::dummy_loc();
    let elements = left.iter().cloned().map(Some).collect();
    let statement = es::Statement::ForOfStatement(es::ForOfStatement {
        left: es::ForTarget::Pattern(es::Pattern::ArrayPattern(es::ArrayPattern {
            elements,
            range: left.first().map_or(range, |p| [p.range()[0], left.last().unwrap().range()[1]]),
            loc,
        })),
        right: right.clone(),
        body: Box::new(es::Statement::EmptyStatement(es::EmptyStatement { range, loc })),
        is_await: false,
        range,
        loc,
    });
    let program = es::Program::new(vec![statement], options.source_type, range, loc);
    references_from_manager(scope::analyze_program(&program))
}

/// References appearing in slot-scope parameter defaults.
fn collect_param_default_references(params: &[es::Pattern], options: EsParserOptions) -> Vec<Reference> {
    let loc = crate::script::es_parser::dummy_loc();
    let range = params
        .first()
        .map_or([0, 0], |p| [p.range()[0], params.last().unwrap().range()[1]]);
    let body = es::ArrowBody::Block(es::BlockStatement {
        body: Vec::new(),
        range,
        loc,
    });
    let arrow = es::Expression::ArrowFunctionExpression(es::ArrowFunctionExpression {
        params: params.to_vec(),
        body,
        is_async: false,
        expression: false,
        range,
        loc,
    });
    let program = wrap_expression(arrow, options);
    references_from_manager(scope::analyze_program(&program))
}

fn wrap_expression(expression: es::Expression, options: EsParserOptions) -> es::Program {
    let range = expression.range();
    let loc = expression.loc();
    let statement = es::Statement::ExpressionStatement(es::ExpressionStatement {
        range,
        loc,
        expression,
    });
    es::Program::new(vec![statement], options.source_type, range, loc)
}

pub(crate) fn collect_pattern_identifiers(pattern: &es::Pattern, out: &mut Vec<es::Identifier>) {
    match pattern {
        es::Pattern::Identifier(id) => out.push(id.clone()),
        es::Pattern::ArrayPattern(array) => {
            for element in array.elements.iter().flatten() {
                collect_pattern_identifiers(element, out);
            }
        }
        es::Pattern::ObjectPattern(object) => {
            for member in &object.properties {
                match member {
                    es::ObjectPatternMember::Property(property) => {
                        collect_pattern_identifiers(&property.value, out)
                    }
                    es::ObjectPatternMember::RestElement(rest) => {
                        collect_pattern_identifiers(&rest.argument, out)
                    }
                }
            }
        }
        es::Pattern::AssignmentPattern(assignment) => {
            collect_pattern_identifiers(&assignment.left, out)
        }
        es::Pattern::RestElement(rest) => collect_pattern_identifiers(&rest.argument, out),
    }
}

// ---------------------------------------------------------------------------
// entity decoding
// ---------------------------------------------------------------------------

/// Decode character references and normalize CRLF in a raw template slice,
/// recording each shrink so offsets can be restored later.
pub fn decode_template_text(raw: &str) -> (String, Vec<GapEntry>) {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut recorder = GapRecorder::new();
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i..].chars().next().unwrap();
        if c == '&' {
            if let Some((decoded, consumed)) = decode_reference(&raw[i..]) {
                let decoded_pos = out.len();
                out.push_str(&decoded);
                recorder.record(decoded_pos, consumed - decoded.len());
                i += consumed;
                continue;
            }
        }
        if c == '\r' {
            let decoded_pos = out.len();
            out.push('\n');
            if bytes.get(i + 1) == Some(&b'\n') {
                recorder.record(decoded_pos, 1);
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        out.push(c);
        i += c.len_utf8();
    }
    (out, recorder.into_entries())
}

/// Try to decode one reference at the start of `text` (which begins with
/// `&`). Returns the decoded string and the consumed byte count.
fn decode_reference(text: &str) -> Option<(String, usize)> {
    let rest = &text[1..];
    if let Some(numeric) = rest.strip_prefix('#') {
        let (digits, radix): (String, u32) = if let Some(hex) = numeric.strip_prefix(['x', 'X']) {
            (hex.chars().take_while(|c| c.is_ascii_hexdigit()).collect(), 16)
        } else {
            (numeric.chars().take_while(|c| c.is_ascii_digit()).collect(), 10)
        };
        if digits.is_empty() {
            return None;
        }
        let mut consumed = 1 + 1 + if radix == 16 { 1 } else { 0 } + digits.len();
        if text[consumed..].starts_with(';') {
            consumed += 1;
        }
        let code = u32::from_str_radix(&digits, radix).unwrap_or(u32::MAX);
        let decoded = char::from_u32(code).unwrap_or(crate::chars::REPLACEMENT);
        return Some((decoded.to_string(), consumed));
    }
    let name: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
    if name.is_empty() {
        return None;
    }
    let after = 1 + name.len();
    if text[after..].starts_with(';') {
        let decoded = NAMED_ENTITIES.get(name.as_str())?;
        return Some(((*decoded).to_string(), after + 1));
    }
    if LEGACY_NAMED_REFERENCES.contains(&name.as_str()) {
        let decoded = NAMED_ENTITIES.get(name.as_str())?;
        return Some(((*decoded).to_string(), after));
    }
    None
}

/// Swap a surrounding `( … )` alias list for `[ … ]`, returning the byte
/// offsets of the swapped pair (in decoded coordinates).
fn rewrite_alias_parens(decoded: &str) -> (String, Option<(usize, usize)>) {
    let open = match decoded.find(|c: char| !c.is_whitespace()) {
        Some(i) if decoded.as_bytes()[i] == b'(' => i,
        _ => return (decoded.to_string(), None),
    };
    let mut depth = 0usize;
    for (i, b) in decoded.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    let mut rewritten = decoded.to_string();
                    // Same byte length, so no offsets move.
                    rewritten.replace_range(open..open + 1, "[");
                    rewritten.replace_range(i..i + 1, "]");
                    return (rewritten, Some((open, i)));
                }
            }
            _ => {}
        }
    }
    (decoded.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities_with_gaps() {
        let (decoded, gaps) = decode_template_text(" x &amp;&amp; y ");
        assert_eq!(decoded, " x && y ");
        assert_eq!(gaps, vec![GapEntry { offset: 3, gap: 4 }, GapEntry { offset: 4, gap: 8 }]);
    }

    #[test]
    fn test_decode_numeric_reference() {
        let (decoded, _) = decode_template_text("&#65;&#x42;");
        assert_eq!(decoded, "AB");
    }

    #[test]
    fn test_legacy_reference_without_semicolon() {
        let (decoded, _) = decode_template_text("a &amp b");
        assert_eq!(decoded, "a & b");
    }

    #[test]
    fn test_rewrite_alias_parens() {
        let (rewritten, offsets) = rewrite_alias_parens("(a, i) of items");
        assert_eq!(rewritten, "[a, i] of items");
        assert_eq!(offsets, Some((0, 5)));
        let (unchanged, offsets) = rewrite_alias_parens("a in items");
        assert_eq!(unchanged, "a in items");
        assert_eq!(offsets, None);
    }
}
