//! Embedded-script integration: the external-parser interface, the bundled
//! default implementation, whitespace-prefix synthesis, and the location fix
//! pass that rebases parsed nodes onto original-file coordinates.

pub mod es_lexer;
pub mod es_parser;
pub mod expression;
pub mod scope;
pub mod setup;

use std::rc::Rc;

use crate::ast::es::*;
use crate::location::{OffsetRange, SourceLocation};
use crate::location_calculator::{LocationCalculator, OffsetKind};
use es_lexer::{EsRawComment, EsSyntaxError, EsToken};
use es_parser::{EsParserOptions, ParsedProgram};

/// The embedded script parser contract. The bundled parser implements it;
/// callers may supply their own through the options.
pub trait ScriptParser {
    /// Parse `code` as a whole program. Nodes must carry `range` in the
    /// coordinate system of the given string.
    fn parse_program(&self, code: &str, options: EsParserOptions) -> Result<ParsedProgram, EsSyntaxError>;
}

/// The default implementation backed by the bundled recursive-descent
/// parser.
#[derive(Debug, Default)]
pub struct BundledScriptParser;

impl ScriptParser for BundledScriptParser {
    fn parse_program(&self, code: &str, options: EsParserOptions) -> Result<ParsedProgram, EsSyntaxError> {
        es_parser::parse_program(code, options)
    }
}

pub type SharedScriptParser = Rc<dyn ScriptParser>;

/// Replace every non-line-terminator before `end` with a space, preserving
/// line structure, so a parse of `prefix + slice` yields original
/// lines/columns without adjustment.
pub fn whitespace_prefix(source: &str, end: usize) -> String {
    let bytes = source.as_bytes();
    let mut prefix = String::with_capacity(end);
    for i in 0..end {
        match bytes[i] {
            b'\n' => prefix.push('\n'),
            // A lone CR is a line break; in a CRLF pair the LF carries it.
            b'\r' if bytes.get(i + 1) != Some(&b'\n') => prefix.push('\n'),
            _ => prefix.push(' '),
        }
    }
    prefix
}

// ---------------------------------------------------------------------------
// range traversal
// ---------------------------------------------------------------------------

/// Visit the `range`/`loc` pair of every node in a program, parents first.
pub(crate) fn walk_program_ranges(
    program: &mut Program,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    f(&mut program.range, &mut program.loc);
    for statement in &mut program.body {
        walk_statement_ranges(statement, f);
    }
}

pub(crate) fn walk_statement_ranges(
    statement: &mut Statement,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    match statement {
        Statement::ExpressionStatement(stmt) => {
            f(&mut stmt.range, &mut stmt.loc);
            walk_expression_ranges(&mut stmt.expression, f);
        }
        Statement::BlockStatement(block) => walk_block_ranges(block, f),
        Statement::EmptyStatement(stmt) => f(&mut stmt.range, &mut stmt.loc),
        Statement::VariableDeclaration(decl) => walk_variable_declaration_ranges(decl, f),
        Statement::FunctionDeclaration(decl) => {
            f(&mut decl.range, &mut decl.loc);
            f(&mut decl.id.range, &mut decl.id.loc);
            for param in &mut decl.params {
                walk_pattern_ranges(param, f);
            }
            walk_block_ranges(&mut decl.body, f);
        }
        Statement::ReturnStatement(stmt) => {
            f(&mut stmt.range, &mut stmt.loc);
            if let Some(argument) = &mut stmt.argument {
                walk_expression_ranges(argument, f);
            }
        }
        Statement::IfStatement(stmt) => {
            f(&mut stmt.range, &mut stmt.loc);
            walk_expression_ranges(&mut stmt.test, f);
            walk_statement_ranges(&mut stmt.consequent, f);
            if let Some(alternate) = &mut stmt.alternate {
                walk_statement_ranges(alternate, f);
            }
        }
        Statement::ForOfStatement(stmt) => {
            f(&mut stmt.range, &mut stmt.loc);
            walk_for_target_ranges(&mut stmt.left, f);
            walk_expression_ranges(&mut stmt.right, f);
            walk_statement_ranges(&mut stmt.body, f);
        }
        Statement::ForInStatement(stmt) => {
            f(&mut stmt.range, &mut stmt.loc);
            walk_for_target_ranges(&mut stmt.left, f);
            walk_expression_ranges(&mut stmt.right, f);
            walk_statement_ranges(&mut stmt.body, f);
        }
        Statement::ImportDeclaration(decl) => {
            f(&mut decl.range, &mut decl.loc);
            for specifier in &mut decl.specifiers {
                match specifier {
                    ImportSpecifierKind::ImportSpecifier {
                        imported,
                        local,
                        range,
                        loc,
                    } => {
                        f(range, loc);
                        f(&mut imported.range, &mut imported.loc);
                        f(&mut local.range, &mut local.loc);
                    }
                    ImportSpecifierKind::ImportDefaultSpecifier { local, range, loc }
                    | ImportSpecifierKind::ImportNamespaceSpecifier { local, range, loc } => {
                        f(range, loc);
                        f(&mut local.range, &mut local.loc);
                    }
                }
            }
            f(&mut decl.source.range, &mut decl.source.loc);
        }
        Statement::ExportNamedDeclaration(decl) => {
            f(&mut decl.range, &mut decl.loc);
            if let Some(inner) = &mut decl.declaration {
                walk_statement_ranges(inner, f);
            }
            for specifier in &mut decl.specifiers {
                f(&mut specifier.range, &mut specifier.loc);
                f(&mut specifier.local.range, &mut specifier.local.loc);
                f(&mut specifier.exported.range, &mut specifier.exported.loc);
            }
            if let Some(source) = &mut decl.source {
                f(&mut source.range, &mut source.loc);
            }
        }
        Statement::ExportDefaultDeclaration(decl) => {
            f(&mut decl.range, &mut decl.loc);
            walk_expression_ranges(&mut decl.declaration, f);
        }
    }
}

fn walk_variable_declaration_ranges(
    decl: &mut VariableDeclaration,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    f(&mut decl.range, &mut decl.loc);
    for declarator in &mut decl.declarations {
        f(&mut declarator.range, &mut declarator.loc);
        walk_pattern_ranges(&mut declarator.id, f);
        if let Some(init) = &mut declarator.init {
            walk_expression_ranges(init, f);
        }
    }
}

fn walk_for_target_ranges(
    target: &mut ForTarget,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    match target {
        ForTarget::Declaration(decl) => walk_variable_declaration_ranges(decl, f),
        ForTarget::Pattern(pattern) => walk_pattern_ranges(pattern, f),
    }
}

fn walk_block_ranges(block: &mut BlockStatement, f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation)) {
    f(&mut block.range, &mut block.loc);
    for statement in &mut block.body {
        walk_statement_ranges(statement, f);
    }
}

pub(crate) fn walk_pattern_ranges(
    pattern: &mut Pattern,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    match pattern {
        Pattern::Identifier(id) => f(&mut id.range, &mut id.loc),
        Pattern::ArrayPattern(array) => {
            f(&mut array.range, &mut array.loc);
            for element in array.elements.iter_mut().flatten() {
                walk_pattern_ranges(element, f);
            }
        }
        Pattern::ObjectPattern(object) => {
            f(&mut object.range, &mut object.loc);
            for member in &mut object.properties {
                match member {
                    ObjectPatternMember::Property(property) => {
                        f(&mut property.range, &mut property.loc);
                        walk_expression_ranges(&mut property.key, f);
                        walk_pattern_ranges(&mut property.value, f);
                    }
                    ObjectPatternMember::RestElement(rest) => {
                        f(&mut rest.range, &mut rest.loc);
                        walk_pattern_ranges(&mut rest.argument, f);
                    }
                }
            }
        }
        Pattern::AssignmentPattern(assignment) => {
            f(&mut assignment.range, &mut assignment.loc);
            walk_pattern_ranges(&mut assignment.left, f);
            walk_expression_ranges(&mut assignment.right, f);
        }
        Pattern::RestElement(rest) => {
            f(&mut rest.range, &mut rest.loc);
            walk_pattern_ranges(&mut rest.argument, f);
        }
    }
}

pub(crate) fn walk_expression_ranges(
    expression: &mut Expression,
    f: &mut dyn FnMut(&mut OffsetRange, &mut SourceLocation),
) {
    match expression {
        Expression::Identifier(id) => f(&mut id.range, &mut id.loc),
        Expression::Literal(literal) => f(&mut literal.range, &mut literal.loc),
        Expression::TemplateLiteral(template) => {
            f(&mut template.range, &mut template.loc);
            for quasi in &mut template.quasis {
                f(&mut quasi.range, &mut quasi.loc);
            }
            for expr in &mut template.expressions {
                walk_expression_ranges(expr, f);
            }
        }
        Expression::ThisExpression(this) => f(&mut this.range, &mut this.loc),
        Expression::ArrayExpression(array) => {
            f(&mut array.range, &mut array.loc);
            for element in array.elements.iter_mut().flatten() {
                walk_expression_ranges(element, f);
            }
        }
        Expression::ObjectExpression(object) => {
            f(&mut object.range, &mut object.loc);
            for member in &mut object.properties {
                match member {
                    ObjectMember::Property(property) => {
                        f(&mut property.range, &mut property.loc);
                        walk_expression_ranges(&mut property.key, f);
                        walk_expression_ranges(&mut property.value, f);
                    }
                    ObjectMember::SpreadElement(spread) => {
                        f(&mut spread.range, &mut spread.loc);
                        walk_expression_ranges(&mut spread.argument, f);
                    }
                }
            }
        }
        Expression::UnaryExpression(unary) => {
            f(&mut unary.range, &mut unary.loc);
            walk_expression_ranges(&mut unary.argument, f);
        }
        Expression::UpdateExpression(update) => {
            f(&mut update.range, &mut update.loc);
            walk_expression_ranges(&mut update.argument, f);
        }
        Expression::BinaryExpression(binary) => {
            f(&mut binary.range, &mut binary.loc);
            walk_expression_ranges(&mut binary.left, f);
            walk_expression_ranges(&mut binary.right, f);
        }
        Expression::LogicalExpression(logical) => {
            f(&mut logical.range, &mut logical.loc);
            walk_expression_ranges(&mut logical.left, f);
            walk_expression_ranges(&mut logical.right, f);
        }
        Expression::AssignmentExpression(assignment) => {
            f(&mut assignment.range, &mut assignment.loc);
            match assignment.left.as_mut() {
                AssignmentTarget::Expression(expr) => walk_expression_ranges(expr, f),
                AssignmentTarget::Pattern(pattern) => walk_pattern_ranges(pattern, f),
            }
            walk_expression_ranges(&mut assignment.right, f);
        }
        Expression::ConditionalExpression(conditional) => {
            f(&mut conditional.range, &mut conditional.loc);
            walk_expression_ranges(&mut conditional.test, f);
            walk_expression_ranges(&mut conditional.consequent, f);
            walk_expression_ranges(&mut conditional.alternate, f);
        }
        Expression::CallExpression(call) => {
            f(&mut call.range, &mut call.loc);
            walk_expression_ranges(&mut call.callee, f);
            for argument in &mut call.arguments {
                walk_expression_ranges(argument, f);
            }
        }
        Expression::NewExpression(new) => {
            f(&mut new.range, &mut new.loc);
            walk_expression_ranges(&mut new.callee, f);
            for argument in &mut new.arguments {
                walk_expression_ranges(argument, f);
            }
        }
        Expression::MemberExpression(member) => {
            f(&mut member.range, &mut member.loc);
            walk_expression_ranges(&mut member.object, f);
            walk_expression_ranges(&mut member.property, f);
        }
        Expression::SequenceExpression(sequence) => {
            f(&mut sequence.range, &mut sequence.loc);
            for expr in &mut sequence.expressions {
                walk_expression_ranges(expr, f);
            }
        }
        Expression::ArrowFunctionExpression(arrow) => {
            f(&mut arrow.range, &mut arrow.loc);
            for param in &mut arrow.params {
                walk_pattern_ranges(param, f);
            }
            match &mut arrow.body {
                ArrowBody::Expression(expr) => walk_expression_ranges(expr, f),
                ArrowBody::Block(block) => walk_block_ranges(block, f),
            }
        }
        Expression::FunctionExpression(function) => {
            f(&mut function.range, &mut function.loc);
            if let Some(id) = &mut function.id {
                f(&mut id.range, &mut id.loc);
            }
            for param in &mut function.params {
                walk_pattern_ranges(param, f);
            }
            walk_block_ranges(&mut function.body, f);
        }
        Expression::AwaitExpression(await_expr) => {
            f(&mut await_expr.range, &mut await_expr.loc);
            walk_expression_ranges(&mut await_expr.argument, f);
        }
        Expression::SpreadElement(spread) => {
            f(&mut spread.range, &mut spread.loc);
            walk_expression_ranges(&mut spread.argument, f);
        }
    }
}

// ---------------------------------------------------------------------------
// fix pass
// ---------------------------------------------------------------------------

pub(crate) fn fix_program_locations(program: &mut Program, calculator: &LocationCalculator) {
    walk_program_ranges(program, &mut |range, loc| {
        *loc = calculator.fix_range(range);
    });
}

pub(crate) fn fix_expression_locations(expression: &mut Expression, calculator: &LocationCalculator) {
    walk_expression_ranges(expression, &mut |range, loc| {
        *loc = calculator.fix_range(range);
    });
}

pub(crate) fn fix_pattern_locations(pattern: &mut Pattern, calculator: &LocationCalculator) {
    walk_pattern_ranges(pattern, &mut |range, loc| {
        *loc = calculator.fix_range(range);
    });
}

pub(crate) fn fix_token_locations(tokens: &mut [EsToken], calculator: &LocationCalculator) {
    for token in tokens {
        token.loc = calculator.fix_range(&mut token.range);
    }
}

pub(crate) fn comments_with_locations(
    comments: Vec<EsRawComment>,
    calculator: &LocationCalculator,
) -> Vec<EsComment> {
    comments
        .into_iter()
        .map(|comment| {
            let mut range = comment.range;
            let loc = calculator.fix_range(&mut range);
            EsComment {
                comment_type: if comment.block { "Block" } else { "Line" },
                value: comment.value,
                range,
                loc,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// script blocks
// ---------------------------------------------------------------------------

/// Result of parsing one `<script>` block, in original-file coordinates.
#[derive(Debug)]
pub struct ParsedScriptBlock {
    pub program: Program,
    pub tokens: Vec<EsToken>,
    pub comments: Vec<EsComment>,
    pub scope_manager: Option<scope::ScopeManager>,
}

/// Parse the text content of a `<script>` element.
///
/// The source is sliced at the content range and fronted with a
/// line-preserving whitespace prefix, so the embedded parser reports
/// original coordinates directly. Two synthetic punctuator tokens covering
/// the open and close tags are spliced around the token stream.
#[allow(clippy::too_many_arguments)]
pub fn parse_script_element(
    source: &str,
    content_range: OffsetRange,
    open_tag_range: OffsetRange,
    close_tag_range: Option<OffsetRange>,
    parser: &dyn ScriptParser,
    parser_options: EsParserOptions,
    calculator: &LocationCalculator,
    with_scope: bool,
) -> Result<ParsedScriptBlock, EsSyntaxError> {
    let prefix = whitespace_prefix(source, content_range[0]);
    let code = format!("{}{}", prefix, &source[content_range[0]..content_range[1]]);
    let parsed = parser.parse_program(&code, parser_options)?;
    let ParsedProgram {
        mut program,
        mut tokens,
        comments,
    } = parsed;

    // An empty script still spans the gap between its tags.
    program.range = [content_range[0], content_range[1]];
    if let Some(first) = program.body.first() {
        program.range[0] = program.range[0].min(first.range()[0]);
    }
    if let Some(last) = program.body.last() {
        program.range[1] = program.range[1].max(last.range()[1]);
    }

    fix_program_locations(&mut program, calculator);
    fix_token_locations(&mut tokens, calculator);
    let comments = comments_with_locations(comments, calculator);
    let scope_manager = with_scope.then(|| scope::analyze_program(&program));

    let mut all_tokens = Vec::with_capacity(tokens.len() + 2);
    all_tokens.push(synthetic_tag_token(source, open_tag_range, calculator));
    all_tokens.extend(tokens);
    if let Some(close) = close_tag_range {
        all_tokens.push(synthetic_tag_token(source, close, calculator));
    }

    Ok(ParsedScriptBlock {
        program,
        tokens: all_tokens,
        comments,
        scope_manager,
    })
}

fn synthetic_tag_token(source: &str, range: OffsetRange, calculator: &LocationCalculator) -> EsToken {
    let mut fixed = range;
    let loc = calculator.fix_range(&mut fixed);
    EsToken {
        token_type: es_lexer::EsTokenType::Punctuator,
        value: source[range[0]..range[1]].to_string(),
        range: fixed,
        loc,
    }
}

/// Convert a script-level error offset back into original coordinates.
pub(crate) fn fix_error_offset(error: &EsSyntaxError, calculator: &LocationCalculator) -> (usize, crate::location::Position) {
    let fixed = calculator.fix_offset(error.index, OffsetKind::Start);
    (fixed, calculator.position_for(fixed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_prefix_preserves_lines() {
        let source = "abc\ndef\r\nghi<script>";
        let prefix = whitespace_prefix(source, 12);
        assert_eq!(prefix.len(), 12);
        assert_eq!(prefix.matches('\n').count(), 2);
        assert!(!prefix.contains(|c: char| c != ' ' && c != '\n'));
    }

    #[test]
    fn test_lone_cr_stays_a_line_break() {
        let prefix = whitespace_prefix("a\rb", 3);
        assert_eq!(prefix, " \n ");
    }
}
