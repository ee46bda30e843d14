//! Recursive-descent parser for the bundled script language.
//!
//! Covers the expression grammar templates actually use plus the statement
//! and module surface needed for `<script>` blocks: declarations, functions,
//! imports/exports, `for … in/of` heads, and top-level `await` gated on the
//! configured language version.
//!
//! All ranges are relative to the text handed in; the caller runs the
//! location fix pass afterwards.

use crate::ast::es::*;
use crate::location::{Position, SourceLocation};
use crate::script::es_lexer::{cook_string, EsRawComment, EsSyntaxError, EsToken, EsTokenType, Scanner};

#[derive(Debug, Clone, Copy)]
pub struct EsParserOptions {
    /// Resolved ECMAScript year (e.g. 2017, 2022).
    pub ecma_version: u32,
    pub source_type: SourceType,
}

impl Default for EsParserOptions {
    fn default() -> Self {
        EsParserOptions {
            ecma_version: 2017,
            source_type: SourceType::Script,
        }
    }
}

#[derive(Debug)]
pub struct ParsedProgram {
    pub program: Program,
    pub tokens: Vec<EsToken>,
    pub comments: Vec<EsRawComment>,
}

pub fn parse_program(text: &str, options: EsParserOptions) -> Result<ParsedProgram, EsSyntaxError> {
    let (tokens, comments) = Scanner::new(text).scan()?;
    let mut parser = EsParser::new(text, &tokens, options);
    let body = parser.parse_program_body()?;
    let range = [0, text.len()];
    let program = Program::new(body, options.source_type, range, dummy_loc());
    Ok(ParsedProgram {
        program,
        tokens,
        comments,
    })
}

pub(crate) fn dummy_loc() -> SourceLocation {
    SourceLocation::new(Position::new(1, 0), Position::new(1, 0))
}

struct EsParser<'a> {
    text: &'a str,
    tokens: &'a [EsToken],
    index: usize,
    options: EsParserOptions,
    /// Depth of enclosing async functions; top-level `await` also needs
    /// ecma_version ≥ 2022 and module source type.
    async_depth: usize,
}

impl<'a> EsParser<'a> {
    fn new(text: &'a str, tokens: &'a [EsToken], options: EsParserOptions) -> Self {
        EsParser {
            text,
            tokens,
            index: 0,
            options,
            async_depth: 0,
        }
    }

    // ------------------------------------------------------------------
    // token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&'a EsToken> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, n: usize) -> Option<&'a EsToken> {
        self.tokens.get(self.index + n)
    }

    fn next(&mut self) -> Result<&'a EsToken, EsSyntaxError> {
        let token = self
            .tokens
            .get(self.index)
            .ok_or_else(|| self.eof_error())?;
        self.index += 1;
        Ok(token)
    }

    fn eof_error(&self) -> EsSyntaxError {
        EsSyntaxError::new("Unexpected end of input", self.text.len())
    }

    fn error_at_current(&self, message: impl Into<String>) -> EsSyntaxError {
        let index = self.peek().map_or(self.text.len(), |t| t.range[0]);
        EsSyntaxError::new(message, index)
    }

    fn at_punct(&self, value: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punctuator(value))
    }

    fn at_keyword(&self, value: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(value))
    }

    fn eat_punct(&mut self, value: &str) -> bool {
        if self.at_punct(value) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, value: &str) -> bool {
        if self.at_keyword(value) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, value: &str) -> Result<&'a EsToken, EsSyntaxError> {
        if self.at_punct(value) {
            self.next()
        } else {
            Err(self.error_at_current(format!("Expected '{value}'")))
        }
    }

    fn prev_end(&self) -> usize {
        if self.index == 0 {
            0
        } else {
            self.tokens[self.index - 1].range[1]
        }
    }

    /// True when a line terminator separates the previous token from the
    /// next one (or the input ends) — the automatic-semicolon condition.
    fn can_insert_semicolon(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                if token.is_punctuator("}") {
                    return true;
                }
                self.text[self.prev_end()..token.range[0]].contains('\n')
            }
        }
    }

    fn consume_semicolon(&mut self) -> Result<(), EsSyntaxError> {
        if self.eat_punct(";") || self.can_insert_semicolon() {
            Ok(())
        } else {
            Err(self.error_at_current("Expected ';'"))
        }
    }

    // ------------------------------------------------------------------
    // program / statements
    // ------------------------------------------------------------------

    fn parse_program_body(&mut self) -> Result<Vec<Statement>, EsSyntaxError> {
        let mut body = Vec::new();
        while self.peek().is_some() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Statement, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        match token.token_type {
            EsTokenType::Punctuator if token.value == ";" => {
                let tok = self.next()?;
                Ok(Statement::EmptyStatement(EmptyStatement {
                    range: tok.range,
                    loc: dummy_loc(),
                }))
            }
            EsTokenType::Punctuator if token.value == "{" => {
                Ok(Statement::BlockStatement(self.parse_block()?))
            }
            EsTokenType::Keyword => match token.value.as_str() {
                "var" | "let" | "const" => {
                    let decl = self.parse_variable_declaration()?;
                    self.consume_semicolon()?;
                    Ok(Statement::VariableDeclaration(decl))
                }
                "function" => Ok(Statement::FunctionDeclaration(self.parse_function_declaration(false)?)),
                "return" => self.parse_return_statement(),
                "if" => self.parse_if_statement(),
                "for" => self.parse_for_statement(),
                "import" => {
                    self.require_module("'import' outside a module")?;
                    Ok(Statement::ImportDeclaration(self.parse_import_declaration()?))
                }
                "export" => {
                    self.require_module("'export' outside a module")?;
                    self.parse_export_declaration()
                }
                _ => self.parse_expression_statement(),
            },
            EsTokenType::Identifier
                if token.value == "async"
                    && self.peek_at(1).is_some_and(|t| t.is_keyword("function")) =>
            {
                self.next()?;
                let mut decl = self.parse_function_declaration(true)?;
                decl.range[0] = token.range[0];
                Ok(Statement::FunctionDeclaration(decl))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn require_module(&self, message: &str) -> Result<(), EsSyntaxError> {
        if self.options.source_type == SourceType::Module {
            Ok(())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn parse_block(&mut self) -> Result<BlockStatement, EsSyntaxError> {
        let open = self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.at_punct("}") {
            if self.peek().is_none() {
                return Err(self.eof_error());
            }
            body.push(self.parse_statement()?);
        }
        let close = self.expect_punct("}")?;
        Ok(BlockStatement {
            body,
            range: [open.range[0], close.range[1]],
            loc: dummy_loc(),
        })
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, EsSyntaxError> {
        let kind_token = self.next()?;
        let kind = match kind_token.value.as_str() {
            "var" => DeclarationKind::Var,
            "let" => DeclarationKind::Let,
            _ => DeclarationKind::Const,
        };
        let mut declarations = Vec::new();
        loop {
            let id = self.parse_binding_pattern()?;
            let mut end = id.range()[1];
            let init = if self.eat_punct("=") {
                let expr = self.parse_assignment()?;
                end = expr.range()[1];
                Some(expr)
            } else {
                None
            };
            declarations.push(VariableDeclarator {
                range: [id.range()[0], end],
                loc: dummy_loc(),
                id,
                init,
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        let end = declarations.last().map_or(kind_token.range[1], |d| d.range[1]);
        Ok(VariableDeclaration {
            kind,
            declarations,
            range: [kind_token.range[0], end],
            loc: dummy_loc(),
        })
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> Result<FunctionDeclaration, EsSyntaxError> {
        let fn_token = self.next()?; // function
        let generator = self.eat_punct("*");
        let id = self.parse_identifier()?;
        let params = self.parse_params()?;
        if is_async {
            self.async_depth += 1;
        }
        let body = self.parse_block();
        if is_async {
            self.async_depth -= 1;
        }
        let body = body?;
        Ok(FunctionDeclaration {
            range: [fn_token.range[0], body.range[1]],
            loc: dummy_loc(),
            id,
            params,
            body,
            is_async,
            generator,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, EsSyntaxError> {
        let ret = self.next()?;
        let mut end = ret.range[1];
        let argument = if self.at_punct(";") || self.can_insert_semicolon() {
            None
        } else {
            let expr = self.parse_expression()?;
            end = expr.range()[1];
            Some(expr)
        };
        if self.eat_punct(";") {
            end = self.tokens[self.index - 1].range[1];
        }
        Ok(Statement::ReturnStatement(ReturnStatement {
            argument,
            range: [ret.range[0], end],
            loc: dummy_loc(),
        }))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, EsSyntaxError> {
        let if_token = self.next()?;
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.parse_statement()?);
        let mut end = consequent.range()[1];
        let alternate = if self.eat_keyword("else") {
            let stmt = Box::new(self.parse_statement()?);
            end = stmt.range()[1];
            Some(stmt)
        } else {
            None
        };
        Ok(Statement::IfStatement(IfStatement {
            test,
            consequent,
            alternate,
            range: [if_token.range[0], end],
            loc: dummy_loc(),
        }))
    }

    /// Only the `for (… in …)` / `for (… of …)` forms are supported; that is
    /// all the iteration-directive wrapper produces.
    fn parse_for_statement(&mut self) -> Result<Statement, EsSyntaxError> {
        let for_token = self.next()?;
        self.expect_punct("(")?;
        let left = if self.at_keyword("var") || self.at_keyword("let") || self.at_keyword("const") {
            let kind_token = self.next()?;
            let kind = match kind_token.value.as_str() {
                "var" => DeclarationKind::Var,
                "let" => DeclarationKind::Let,
                _ => DeclarationKind::Const,
            };
            let id = self.parse_binding_pattern()?;
            let declarator_range = id.range();
            ForTarget::Declaration(VariableDeclaration {
                kind,
                range: [kind_token.range[0], declarator_range[1]],
                loc: dummy_loc(),
                declarations: vec![VariableDeclarator {
                    range: declarator_range,
                    loc: dummy_loc(),
                    id,
                    init: None,
                }],
            })
        } else {
            ForTarget::Pattern(self.parse_binding_pattern()?)
        };
        let is_of = if self.eat_keyword("in") {
            false
        } else if self.peek().is_some_and(|t| t.is_identifier("of")) {
            self.next()?;
            true
        } else {
            return Err(self.error_at_current("Expected 'in' or 'of'"));
        };
        let right = self.parse_assignment()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        let range = [for_token.range[0], body.range()[1]];
        Ok(if is_of {
            Statement::ForOfStatement(ForOfStatement {
                left,
                right,
                body,
                is_await: false,
                range,
                loc: dummy_loc(),
            })
        } else {
            Statement::ForInStatement(ForInStatement {
                left,
                right,
                body,
                range,
                loc: dummy_loc(),
            })
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, EsSyntaxError> {
        let expression = self.parse_expression()?;
        let mut end = expression.range()[1];
        if self.eat_punct(";") {
            end = self.tokens[self.index - 1].range[1];
        } else if !self.can_insert_semicolon() {
            return Err(self.error_at_current("Expected ';'"));
        }
        Ok(Statement::ExpressionStatement(ExpressionStatement {
            range: [expression.range()[0], end],
            loc: dummy_loc(),
            expression,
        }))
    }

    // ------------------------------------------------------------------
    // modules
    // ------------------------------------------------------------------

    fn parse_import_declaration(&mut self) -> Result<ImportDeclaration, EsSyntaxError> {
        let import_token = self.next()?;
        let mut specifiers = Vec::new();
        if self.peek().is_some_and(|t| t.token_type == EsTokenType::String) {
            // Bare side-effect import.
            let source = self.parse_string_literal()?;
            let end = self.finish_import(source.range[1])?;
            return Ok(ImportDeclaration {
                specifiers,
                source,
                range: [import_token.range[0], end],
                loc: dummy_loc(),
            });
        }
        let mut needs_comma = false;
        if self
            .peek()
            .is_some_and(|t| matches!(t.token_type, EsTokenType::Identifier) || t.is_keyword("default"))
            && !self.at_punct("{")
            && !self.at_punct("*")
        {
            let local = self.parse_identifier()?;
            specifiers.push(ImportSpecifierKind::ImportDefaultSpecifier {
                range: local.range,
                loc: dummy_loc(),
                local,
            });
            needs_comma = true;
        }
        if !needs_comma || self.eat_punct(",") {
            if self.at_punct("*") {
                let star = self.next()?;
                if !self.peek().is_some_and(|t| t.is_identifier("as")) {
                    return Err(self.error_at_current("Expected 'as'"));
                }
                self.next()?;
                let local = self.parse_identifier()?;
                specifiers.push(ImportSpecifierKind::ImportNamespaceSpecifier {
                    range: [star.range[0], local.range[1]],
                    loc: dummy_loc(),
                    local,
                });
            } else if self.eat_punct("{") {
                while !self.at_punct("}") {
                    let imported = self.parse_module_export_name()?;
                    let local = if self.peek().is_some_and(|t| t.is_identifier("as")) {
                        self.next()?;
                        self.parse_identifier()?
                    } else {
                        imported.clone()
                    };
                    specifiers.push(ImportSpecifierKind::ImportSpecifier {
                        range: [imported.range[0], local.range[1]],
                        loc: dummy_loc(),
                        imported,
                        local,
                    });
                    if !self.eat_punct(",") {
                        break;
                    }
                }
                self.expect_punct("}")?;
            }
        }
        if !self.peek().is_some_and(|t| t.is_identifier("from")) {
            return Err(self.error_at_current("Expected 'from'"));
        }
        self.next()?;
        let source = self.parse_string_literal()?;
        let end = self.finish_import(source.range[1])?;
        Ok(ImportDeclaration {
            specifiers,
            source,
            range: [import_token.range[0], end],
            loc: dummy_loc(),
        })
    }

    fn finish_import(&mut self, source_end: usize) -> Result<usize, EsSyntaxError> {
        if self.eat_punct(";") {
            Ok(self.tokens[self.index - 1].range[1])
        } else if self.can_insert_semicolon() {
            Ok(source_end)
        } else {
            Err(self.error_at_current("Expected ';'"))
        }
    }

    fn parse_export_declaration(&mut self) -> Result<Statement, EsSyntaxError> {
        let export_token = self.next()?;
        if self.eat_keyword("default") {
            let declaration = self.parse_assignment()?;
            let mut end = declaration.range()[1];
            if self.eat_punct(";") {
                end = self.tokens[self.index - 1].range[1];
            }
            return Ok(Statement::ExportDefaultDeclaration(ExportDefaultDeclaration {
                declaration,
                range: [export_token.range[0], end],
                loc: dummy_loc(),
            }));
        }
        if self.at_punct("{") {
            self.next()?;
            let mut specifiers = Vec::new();
            while !self.at_punct("}") {
                let local = self.parse_module_export_name()?;
                let exported = if self.peek().is_some_and(|t| t.is_identifier("as")) {
                    self.next()?;
                    self.parse_module_export_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier {
                    range: [local.range[0], exported.range[1]],
                    loc: dummy_loc(),
                    local,
                    exported,
                });
                if !self.eat_punct(",") {
                    break;
                }
            }
            let close = self.expect_punct("}")?;
            let mut end = close.range[1];
            let source = if self.peek().is_some_and(|t| t.is_identifier("from")) {
                self.next()?;
                let source = self.parse_string_literal()?;
                end = source.range[1];
                Some(source)
            } else {
                None
            };
            if self.eat_punct(";") {
                end = self.tokens[self.index - 1].range[1];
            }
            return Ok(Statement::ExportNamedDeclaration(ExportNamedDeclaration {
                declaration: None,
                specifiers,
                source,
                range: [export_token.range[0], end],
                loc: dummy_loc(),
            }));
        }
        // export <declaration>
        let declaration = self.parse_statement()?;
        let end = declaration.range()[1];
        Ok(Statement::ExportNamedDeclaration(ExportNamedDeclaration {
            declaration: Some(Box::new(declaration)),
            specifiers: Vec::new(),
            source: None,
            range: [export_token.range[0], end],
            loc: dummy_loc(),
        }))
    }

    fn parse_module_export_name(&mut self) -> Result<Identifier, EsSyntaxError> {
        self.parse_identifier()
    }

    // ------------------------------------------------------------------
    // patterns
    // ------------------------------------------------------------------

    fn parse_identifier(&mut self) -> Result<Identifier, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        // Contextual keywords are valid binding names.
        let ok = matches!(token.token_type, EsTokenType::Identifier)
            || (token.token_type == EsTokenType::Keyword
                && matches!(token.value.as_str(), "let" | "await" | "default"));
        if !ok {
            return Err(self.error_at_current(format!("Unexpected token '{}'", token.value)));
        }
        let token = self.next()?;
        Ok(Identifier {
            name: token.value.clone(),
            range: token.range,
            loc: dummy_loc(),
        })
    }

    fn parse_binding_pattern(&mut self) -> Result<Pattern, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        let mut pattern = if token.is_punctuator("[") {
            self.parse_array_pattern()?
        } else if token.is_punctuator("{") {
            self.parse_object_pattern()?
        } else {
            Pattern::Identifier(self.parse_identifier()?)
        };
        if self.eat_punct("=") {
            let right = self.parse_assignment()?;
            let range = [pattern.range()[0], right.range()[1]];
            pattern = Pattern::AssignmentPattern(AssignmentPattern {
                left: Box::new(pattern),
                right: Box::new(right),
                range,
                loc: dummy_loc(),
            });
        }
        Ok(pattern)
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, EsSyntaxError> {
        let open = self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.at_punct("]") {
            if self.eat_punct(",") {
                elements.push(None);
                continue;
            }
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_binding_pattern()?;
                let range = [dots.range[0], argument.range()[1]];
                elements.push(Some(Pattern::RestElement(RestElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                })));
            } else {
                elements.push(Some(self.parse_binding_pattern()?));
            }
            if !self.at_punct("]") {
                self.expect_punct(",")?;
            }
        }
        let close = self.expect_punct("]")?;
        Ok(Pattern::ArrayPattern(ArrayPattern {
            elements,
            range: [open.range[0], close.range[1]],
            loc: dummy_loc(),
        }))
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, EsSyntaxError> {
        let open = self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.at_punct("}") {
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_binding_pattern()?;
                let range = [dots.range[0], argument.range()[1]];
                properties.push(ObjectPatternMember::RestElement(RestElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                }));
            } else {
                let (key, computed, key_range) = self.parse_property_key()?;
                let (value, shorthand) = if self.eat_punct(":") {
                    (self.parse_binding_pattern()?, false)
                } else {
                    let Expression::Identifier(id) = key.clone() else {
                        return Err(self.error_at_current("Invalid shorthand property"));
                    };
                    let mut pattern = Pattern::Identifier(id);
                    if self.eat_punct("=") {
                        let right = self.parse_assignment()?;
                        let range = [pattern.range()[0], right.range()[1]];
                        pattern = Pattern::AssignmentPattern(AssignmentPattern {
                            left: Box::new(pattern),
                            right: Box::new(right),
                            range,
                            loc: dummy_loc(),
                        });
                    }
                    (pattern, true)
                };
                let range = [key_range[0], value.range()[1]];
                properties.push(ObjectPatternMember::Property(PatternProperty {
                    key,
                    value: Box::new(value),
                    computed,
                    shorthand,
                    range,
                    loc: dummy_loc(),
                }));
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        let close = self.expect_punct("}")?;
        Ok(Pattern::ObjectPattern(ObjectPattern {
            properties,
            range: [open.range[0], close.range[1]],
            loc: dummy_loc(),
        }))
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>, EsSyntaxError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.at_punct(")") {
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_binding_pattern()?;
                let range = [dots.range[0], argument.range()[1]];
                params.push(Pattern::RestElement(RestElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                }));
            } else {
                params.push(self.parse_binding_pattern()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, EsSyntaxError> {
        let first = self.parse_assignment()?;
        if !self.at_punct(",") {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(",") {
            expressions.push(self.parse_assignment()?);
        }
        let range = [
            expressions[0].range()[0],
            expressions.last().unwrap().range()[1],
        ];
        Ok(Expression::SequenceExpression(SequenceExpression {
            expressions,
            range,
            loc: dummy_loc(),
        }))
    }

    fn parse_assignment(&mut self) -> Result<Expression, EsSyntaxError> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        let left = self.parse_conditional()?;
        let Some(op_token) = self.peek() else {
            return Ok(left);
        };
        let is_assign_op = op_token.token_type == EsTokenType::Punctuator
            && matches!(
                op_token.value.as_str(),
                "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" | "<<=" | ">>=" | ">>>=" | "&="
                    | "|=" | "^=" | "&&=" | "||=" | "??="
            );
        if !is_assign_op {
            return Ok(left);
        }
        if !matches!(
            left,
            Expression::Identifier(_)
                | Expression::MemberExpression(_)
                | Expression::ArrayExpression(_)
                | Expression::ObjectExpression(_)
        ) {
            return Err(self.error_at_current("Invalid assignment target"));
        }
        let operator = self.next()?.value.clone();
        let right = self.parse_assignment()?;
        let range = [left.range()[0], right.range()[1]];
        // Destructuring shapes become patterns; identifiers and member
        // targets stay expressions.
        let target = if operator == "="
            && matches!(left, Expression::ArrayExpression(_) | Expression::ObjectExpression(_))
        {
            match expression_to_pattern(left.clone()) {
                Ok(pattern) => AssignmentTarget::Pattern(pattern),
                Err(_) => AssignmentTarget::Expression(left),
            }
        } else {
            AssignmentTarget::Expression(left)
        };
        Ok(Expression::AssignmentExpression(AssignmentExpression {
            operator,
            left: Box::new(target),
            right: Box::new(right),
            range,
            loc: dummy_loc(),
        }))
    }

    /// Detect and parse an arrow function, rewinding on failure.
    fn try_parse_arrow(&mut self) -> Result<Option<Expression>, EsSyntaxError> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let start = token.range[0];
        let is_async = token.is_identifier("async")
            && self
                .peek_at(1)
                .is_some_and(|t| t.is_punctuator("(") || t.token_type == EsTokenType::Identifier);
        let look = if is_async { 1 } else { 0 };
        let Some(head) = self.peek_at(look) else {
            return Ok(None);
        };
        let feasible = match head.token_type {
            EsTokenType::Identifier => self.peek_at(look + 1).is_some_and(|t| t.is_punctuator("=>")),
            EsTokenType::Punctuator if head.value == "(" => true,
            _ => false,
        };
        if !feasible {
            return Ok(None);
        }
        let saved = self.index;
        let result = self.parse_arrow_tail(is_async, start);
        match result {
            Ok(arrow) => Ok(Some(arrow)),
            Err(_) => {
                self.index = saved;
                Ok(None)
            }
        }
    }

    fn parse_arrow_tail(&mut self, is_async: bool, start: usize) -> Result<Expression, EsSyntaxError> {
        if is_async {
            self.next()?; // async
        }
        let params = if self.at_punct("(") {
            self.parse_params()?
        } else {
            vec![Pattern::Identifier(self.parse_identifier()?)]
        };
        self.expect_punct("=>")?;
        if is_async {
            self.async_depth += 1;
        }
        let body = if self.at_punct("{") {
            self.parse_block().map(ArrowBody::Block)
        } else {
            self.parse_assignment().map(|e| ArrowBody::Expression(Box::new(e)))
        };
        if is_async {
            self.async_depth -= 1;
        }
        let body = body?;
        let (end, expression) = match &body {
            ArrowBody::Block(b) => (b.range[1], false),
            ArrowBody::Expression(e) => (e.range()[1], true),
        };
        Ok(Expression::ArrowFunctionExpression(ArrowFunctionExpression {
            params,
            body,
            is_async,
            expression,
            range: [start, end],
            loc: dummy_loc(),
        }))
    }

    fn parse_conditional(&mut self) -> Result<Expression, EsSyntaxError> {
        let test = self.parse_binary(0)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect_punct(":")?;
        let alternate = self.parse_assignment()?;
        let range = [test.range()[0], alternate.range()[1]];
        Ok(Expression::ConditionalExpression(ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            range,
            loc: dummy_loc(),
        }))
    }

    fn binary_precedence(&self, token: &EsToken) -> Option<(u8, bool)> {
        // (precedence, is_logical)
        let value = token.value.as_str();
        match token.token_type {
            EsTokenType::Punctuator => match value {
                "??" => Some((1, true)),
                "||" => Some((2, true)),
                "&&" => Some((3, true)),
                "|" => Some((4, false)),
                "^" => Some((5, false)),
                "&" => Some((6, false)),
                "==" | "!=" | "===" | "!==" => Some((7, false)),
                "<" | ">" | "<=" | ">=" => Some((8, false)),
                "<<" | ">>" | ">>>" => Some((9, false)),
                "+" | "-" => Some((10, false)),
                "*" | "/" | "%" => Some((11, false)),
                "**" => Some((12, false)),
                _ => None,
            },
            EsTokenType::Keyword if value == "in" || value == "instanceof" => Some((8, false)),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, EsSyntaxError> {
        let mut left = self.parse_unary()?;
        while let Some(token) = self.peek() {
            let Some((precedence, is_logical)) = self.binary_precedence(token) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            let operator = self.next()?.value.clone();
            // `**` is right-associative; the rest are left-associative.
            let next_min = if operator == "**" { precedence } else { precedence + 1 };
            let right = self.parse_binary(next_min)?;
            let range = [left.range()[0], right.range()[1]];
            left = if is_logical {
                Expression::LogicalExpression(LogicalExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    range,
                    loc: dummy_loc(),
                })
            } else {
                Expression::BinaryExpression(BinaryExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    range,
                    loc: dummy_loc(),
                })
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, EsSyntaxError> {
        let Some(token) = self.peek() else {
            return Err(self.eof_error());
        };
        let is_unary = matches!(
            (token.token_type, token.value.as_str()),
            (EsTokenType::Punctuator, "!" | "~" | "+" | "-")
                | (EsTokenType::Keyword, "typeof" | "void" | "delete")
        );
        if is_unary {
            let op = self.next()?;
            let operator = op.value.clone();
            let argument = self.parse_unary()?;
            let range = [op.range[0], argument.range()[1]];
            return Ok(Expression::UnaryExpression(UnaryExpression {
                operator,
                prefix: true,
                argument: Box::new(argument),
                range,
                loc: dummy_loc(),
            }));
        }
        if token.is_punctuator("++") || token.is_punctuator("--") {
            let op = self.next()?;
            let operator = op.value.clone();
            let argument = self.parse_unary()?;
            let range = [op.range[0], argument.range()[1]];
            return Ok(Expression::UpdateExpression(UpdateExpression {
                operator,
                prefix: true,
                argument: Box::new(argument),
                range,
                loc: dummy_loc(),
            }));
        }
        if token.is_keyword("await") {
            let allowed = self.async_depth > 0
                || (self.options.ecma_version >= 2022
                    && self.options.source_type == SourceType::Module);
            if !allowed {
                return Err(EsSyntaxError::new(
                    "'await' is only allowed within async functions or at the top level of a module",
                    token.range[0],
                ));
            }
            let op = self.next()?;
            let argument = self.parse_unary()?;
            let range = [op.range[0], argument.range()[1]];
            return Ok(Expression::AwaitExpression(AwaitExpression {
                argument: Box::new(argument),
                range,
                loc: dummy_loc(),
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, EsSyntaxError> {
        let expr = self.parse_call_member()?;
        if (self.at_punct("++") || self.at_punct("--")) && !self.can_insert_semicolon() {
            let op = self.next()?;
            let range = [expr.range()[0], op.range[1]];
            return Ok(Expression::UpdateExpression(UpdateExpression {
                operator: op.value.clone(),
                prefix: false,
                argument: Box::new(expr),
                range,
                loc: dummy_loc(),
            }));
        }
        Ok(expr)
    }

    fn parse_call_member(&mut self) -> Result<Expression, EsSyntaxError> {
        let mut expr = if self.at_keyword("new") {
            let new_token = self.next()?;
            let callee = self.parse_call_member_head()?;
            let (arguments, end) = if self.at_punct("(") {
                self.parse_arguments()?
            } else {
                (Vec::new(), callee.range()[1])
            };
            Expression::NewExpression(NewExpression {
                range: [new_token.range[0], end],
                loc: dummy_loc(),
                callee: Box::new(callee),
                arguments,
            })
        } else {
            self.parse_primary()?
        };
        loop {
            if self.at_punct(".") {
                self.next()?;
                let property = self.parse_member_name()?;
                let range = [expr.range()[0], property.range[1]];
                expr = Expression::MemberExpression(MemberExpression {
                    object: Box::new(expr),
                    property: Box::new(Expression::Identifier(property)),
                    computed: false,
                    optional: false,
                    range,
                    loc: dummy_loc(),
                });
            } else if self.at_punct("?.") {
                self.next()?;
                if self.at_punct("(") {
                    let (arguments, end) = self.parse_arguments()?;
                    let range = [expr.range()[0], end];
                    expr = Expression::CallExpression(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                        optional: true,
                        range,
                        loc: dummy_loc(),
                    });
                } else if self.at_punct("[") {
                    self.next()?;
                    let property = self.parse_expression()?;
                    let close = self.expect_punct("]")?;
                    let range = [expr.range()[0], close.range[1]];
                    expr = Expression::MemberExpression(MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                        optional: true,
                        range,
                        loc: dummy_loc(),
                    });
                } else {
                    let property = self.parse_member_name()?;
                    let range = [expr.range()[0], property.range[1]];
                    expr = Expression::MemberExpression(MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(Expression::Identifier(property)),
                        computed: false,
                        optional: true,
                        range,
                        loc: dummy_loc(),
                    });
                }
            } else if self.at_punct("[") {
                self.next()?;
                let property = self.parse_expression()?;
                let close = self.expect_punct("]")?;
                let range = [expr.range()[0], close.range[1]];
                expr = Expression::MemberExpression(MemberExpression {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                    optional: false,
                    range,
                    loc: dummy_loc(),
                });
            } else if self.at_punct("(") {
                let (arguments, end) = self.parse_arguments()?;
                let range = [expr.range()[0], end];
                expr = Expression::CallExpression(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                    optional: false,
                    range,
                    loc: dummy_loc(),
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `new` callee: member chain without call expressions.
    fn parse_call_member_head(&mut self) -> Result<Expression, EsSyntaxError> {
        let mut expr = self.parse_primary()?;
        while self.at_punct(".") {
            self.next()?;
            let property = self.parse_member_name()?;
            let range = [expr.range()[0], property.range[1]];
            expr = Expression::MemberExpression(MemberExpression {
                object: Box::new(expr),
                property: Box::new(Expression::Identifier(property)),
                computed: false,
                optional: false,
                range,
                loc: dummy_loc(),
            });
        }
        Ok(expr)
    }

    /// A member name after `.` may be any identifier-like word, keywords
    /// included.
    fn parse_member_name(&mut self) -> Result<Identifier, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        let ok = matches!(
            token.token_type,
            EsTokenType::Identifier | EsTokenType::Keyword | EsTokenType::Boolean | EsTokenType::Null
        );
        if !ok {
            return Err(self.error_at_current("Expected a property name"));
        }
        let token = self.next()?;
        Ok(Identifier {
            name: token.value.clone(),
            range: token.range,
            loc: dummy_loc(),
        })
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, usize), EsSyntaxError> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.at_punct(")") {
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_assignment()?;
                let range = [dots.range[0], argument.range()[1]];
                arguments.push(Expression::SpreadElement(SpreadElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                }));
            } else {
                arguments.push(self.parse_assignment()?);
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        let close = self.expect_punct(")")?;
        Ok((arguments, close.range[1]))
    }

    fn parse_primary(&mut self) -> Result<Expression, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        match token.token_type {
            EsTokenType::Numeric => {
                let token = self.next()?;
                let normalized = token.value.replace('_', "");
                let value = if let Some(hex) = normalized.strip_prefix("0x").or_else(|| normalized.strip_prefix("0X")) {
                    u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64)
                } else if let Some(oct) = normalized.strip_prefix("0o").or_else(|| normalized.strip_prefix("0O")) {
                    u64::from_str_radix(oct, 8).map_or(f64::NAN, |v| v as f64)
                } else if let Some(bin) = normalized.strip_prefix("0b").or_else(|| normalized.strip_prefix("0B")) {
                    u64::from_str_radix(bin, 2).map_or(f64::NAN, |v| v as f64)
                } else {
                    normalized.parse().unwrap_or(f64::NAN)
                };
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Number(value),
                    raw: token.value.clone(),
                    range: token.range,
                    loc: dummy_loc(),
                }))
            }
            EsTokenType::String => {
                let literal = self.parse_string_literal()?;
                Ok(Expression::Literal(literal))
            }
            EsTokenType::Boolean => {
                let token = self.next()?;
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Boolean(token.value == "true"),
                    raw: token.value.clone(),
                    range: token.range,
                    loc: dummy_loc(),
                }))
            }
            EsTokenType::Null => {
                let token = self.next()?;
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Null,
                    raw: token.value.clone(),
                    range: token.range,
                    loc: dummy_loc(),
                }))
            }
            EsTokenType::RegularExpression => {
                let token = self.next()?;
                let close = token.value.rfind('/').unwrap_or(0);
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::RegExp {
                        pattern: token.value[1..close].to_string(),
                        flags: token.value[close + 1..].to_string(),
                    },
                    raw: token.value.clone(),
                    range: token.range,
                    loc: dummy_loc(),
                }))
            }
            EsTokenType::Template => self.parse_template_literal(),
            EsTokenType::Keyword => match token.value.as_str() {
                "this" => {
                    let token = self.next()?;
                    Ok(Expression::ThisExpression(ThisExpression {
                        range: token.range,
                        loc: dummy_loc(),
                    }))
                }
                "function" => self.parse_function_expression(false),
                "let" | "await" | "default" => {
                    let id = self.parse_identifier()?;
                    Ok(Expression::Identifier(id))
                }
                other => Err(self.error_at_current(format!("Unexpected token '{other}'"))),
            },
            EsTokenType::Identifier => {
                if token.value == "async" && self.peek_at(1).is_some_and(|t| t.is_keyword("function")) {
                    self.next()?;
                    let start = token.range[0];
                    let mut expr = self.parse_function_expression(true)?;
                    if let Expression::FunctionExpression(f) = &mut expr {
                        f.range[0] = start;
                    }
                    return Ok(expr);
                }
                let id = self.parse_identifier()?;
                Ok(Expression::Identifier(id))
            }
            EsTokenType::Punctuator => match token.value.as_str() {
                "(" => {
                    self.next()?;
                    let expr = self.parse_expression()?;
                    self.expect_punct(")")?;
                    Ok(expr)
                }
                "[" => self.parse_array_expression(),
                "{" => self.parse_object_expression(),
                other => Err(self.error_at_current(format!("Unexpected token '{other}'"))),
            },
        }
    }

    fn parse_string_literal(&mut self) -> Result<Literal, EsSyntaxError> {
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        if token.token_type != EsTokenType::String {
            return Err(self.error_at_current("Expected a string"));
        }
        let token = self.next()?;
        Ok(Literal {
            value: LiteralValue::String(cook_string(&token.value)),
            raw: token.value.clone(),
            range: token.range,
            loc: dummy_loc(),
        })
    }

    fn parse_template_literal(&mut self) -> Result<Expression, EsSyntaxError> {
        let first = self.next()?;
        let start = first.range[0];
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        let mut current = first;
        loop {
            let tail = current.value.ends_with('`');
            let head_len = 1; // ` or }
            let tail_len = if tail { 1 } else { 2 }; // ` or ${
            let raw = &current.value[head_len..current.value.len() - tail_len];
            quasis.push(TemplateElement {
                value: TemplateElementValue {
                    raw: raw.to_string(),
                    cooked: Some(cook_string(&format!("'{raw}'"))),
                },
                tail,
                range: [current.range[0] + head_len, current.range[1] - tail_len],
                loc: dummy_loc(),
            });
            if tail {
                break;
            }
            expressions.push(self.parse_expression()?);
            let next = self.peek().ok_or_else(|| self.eof_error())?;
            if next.token_type != EsTokenType::Template || !next.value.starts_with('}') {
                return Err(self.error_at_current("Expected '}' in template literal"));
            }
            current = self.next()?;
        }
        let end = current.range[1];
        Ok(Expression::TemplateLiteral(TemplateLiteral {
            quasis,
            expressions,
            range: [start, end],
            loc: dummy_loc(),
        }))
    }

    fn parse_function_expression(&mut self, is_async: bool) -> Result<Expression, EsSyntaxError> {
        let fn_token = self.next()?; // function
        let generator = self.eat_punct("*");
        let id = if self.peek().is_some_and(|t| t.token_type == EsTokenType::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let params = self.parse_params()?;
        if is_async {
            self.async_depth += 1;
        }
        let body = self.parse_block();
        if is_async {
            self.async_depth -= 1;
        }
        let body = body?;
        Ok(Expression::FunctionExpression(FunctionExpression {
            range: [fn_token.range[0], body.range[1]],
            loc: dummy_loc(),
            id,
            params,
            body,
            is_async,
            generator,
        }))
    }

    fn parse_array_expression(&mut self) -> Result<Expression, EsSyntaxError> {
        let open = self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.at_punct("]") {
            if self.eat_punct(",") {
                elements.push(None);
                continue;
            }
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_assignment()?;
                let range = [dots.range[0], argument.range()[1]];
                elements.push(Some(Expression::SpreadElement(SpreadElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                })));
            } else {
                elements.push(Some(self.parse_assignment()?));
            }
            if !self.at_punct("]") {
                self.expect_punct(",")?;
            }
        }
        let close = self.expect_punct("]")?;
        Ok(Expression::ArrayExpression(ArrayExpression {
            elements,
            range: [open.range[0], close.range[1]],
            loc: dummy_loc(),
        }))
    }

    fn parse_property_key(&mut self) -> Result<(Expression, bool, [usize; 2]), EsSyntaxError> {
        if self.at_punct("[") {
            let open = self.next()?;
            let key = self.parse_assignment()?;
            let close = self.expect_punct("]")?;
            return Ok((key, true, [open.range[0], close.range[1]]));
        }
        let token = self.peek().ok_or_else(|| self.eof_error())?;
        match token.token_type {
            EsTokenType::String => {
                let literal = self.parse_string_literal()?;
                let range = literal.range;
                Ok((Expression::Literal(literal), false, range))
            }
            EsTokenType::Numeric => {
                let expr = self.parse_primary()?;
                let range = expr.range();
                Ok((expr, false, range))
            }
            _ => {
                let id = self.parse_member_name()?;
                let range = id.range;
                Ok((Expression::Identifier(id), false, range))
            }
        }
    }

    fn parse_object_expression(&mut self) -> Result<Expression, EsSyntaxError> {
        let open = self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.at_punct("}") {
            if self.at_punct("...") {
                let dots = self.next()?;
                let argument = self.parse_assignment()?;
                let range = [dots.range[0], argument.range()[1]];
                properties.push(ObjectMember::SpreadElement(SpreadElement {
                    argument: Box::new(argument),
                    range,
                    loc: dummy_loc(),
                }));
                if !self.eat_punct(",") {
                    break;
                }
                continue;
            }
            properties.push(ObjectMember::Property(self.parse_object_property()?));
            if !self.eat_punct(",") {
                break;
            }
        }
        let close = self.expect_punct("}")?;
        Ok(Expression::ObjectExpression(ObjectExpression {
            properties,
            range: [open.range[0], close.range[1]],
            loc: dummy_loc(),
        }))
    }

    fn parse_object_property(&mut self) -> Result<Property, EsSyntaxError> {
        let start_token = self.peek().ok_or_else(|| self.eof_error())?;
        let start = start_token.range[0];

        // async method / getter / setter prefixes
        let is_async_method = start_token.is_identifier("async")
            && self
                .peek_at(1)
                .is_some_and(|t| !t.is_punctuator(":") && !t.is_punctuator(",") && !t.is_punctuator("}") && !t.is_punctuator("("));
        let accessor = if (start_token.is_identifier("get") || start_token.is_identifier("set"))
            && self
                .peek_at(1)
                .is_some_and(|t| !t.is_punctuator(":") && !t.is_punctuator(",") && !t.is_punctuator("}") && !t.is_punctuator("("))
        {
            Some(start_token.value.clone())
        } else {
            None
        };
        if is_async_method || accessor.is_some() {
            self.next()?;
        }

        let (key, computed, key_range) = self.parse_property_key()?;

        if self.at_punct("(") {
            // method shorthand
            let params = self.parse_params()?;
            if is_async_method {
                self.async_depth += 1;
            }
            let body = self.parse_block();
            if is_async_method {
                self.async_depth -= 1;
            }
            let body = body?;
            let end = body.range[1];
            let kind = match accessor.as_deref() {
                Some("get") => PropertyKind::Get,
                Some("set") => PropertyKind::Set,
                _ => PropertyKind::Init,
            };
            let value = Expression::FunctionExpression(FunctionExpression {
                id: None,
                params,
                range: [key_range[1], end],
                loc: dummy_loc(),
                body,
                is_async: is_async_method,
                generator: false,
            });
            return Ok(Property {
                key,
                value,
                kind,
                computed,
                shorthand: false,
                method: accessor.is_none(),
                range: [start, end],
                loc: dummy_loc(),
            });
        }

        if self.eat_punct(":") {
            let value = self.parse_assignment()?;
            let end = value.range()[1];
            return Ok(Property {
                key,
                value,
                kind: PropertyKind::Init,
                computed,
                shorthand: false,
                method: false,
                range: [start, end],
                loc: dummy_loc(),
            });
        }

        // shorthand { a }
        let Expression::Identifier(id) = &key else {
            return Err(self.error_at_current("Expected ':'"));
        };
        let value = Expression::Identifier(id.clone());
        let end = key_range[1];
        Ok(Property {
            key,
            value,
            kind: PropertyKind::Init,
            computed: false,
            shorthand: true,
            method: false,
            range: [start, end],
            loc: dummy_loc(),
        })
    }
}

/// Convert an already-parsed expression into a destructuring pattern, for
/// assignment targets. Returns the expression unchanged when it is not a
/// valid pattern shape.
fn expression_to_pattern(expr: Expression) -> Result<Pattern, Expression> {
    match expr {
        Expression::Identifier(id) => Ok(Pattern::Identifier(id)),
        Expression::ArrayExpression(array) => {
            let mut elements = Vec::with_capacity(array.elements.len());
            for element in array.elements {
                match element {
                    None => elements.push(None),
                    Some(Expression::SpreadElement(spread)) => {
                        let argument = expression_to_pattern(*spread.argument)
                            .map_err(|_| fallback_array(&array.range))?;
                        elements.push(Some(Pattern::RestElement(RestElement {
                            argument: Box::new(argument),
                            range: spread.range,
                            loc: spread.loc,
                        })));
                    }
                    Some(other) => {
                        let pattern =
                            expression_to_pattern(other).map_err(|_| fallback_array(&array.range))?;
                        elements.push(Some(pattern));
                    }
                }
            }
            Ok(Pattern::ArrayPattern(ArrayPattern {
                elements,
                range: array.range,
                loc: array.loc,
            }))
        }
        Expression::ObjectExpression(object) => {
            let object_range = object.range;
            let mut properties = Vec::with_capacity(object.properties.len());
            for member in object.properties {
                match member {
                    ObjectMember::Property(property) => {
                        if property.method || property.kind != PropertyKind::Init {
                            return Err(fallback_array(&object_range));
                        }
                        let value = expression_to_pattern(property.value)
                            .map_err(|_| fallback_array(&object_range))?;
                        properties.push(ObjectPatternMember::Property(PatternProperty {
                            key: property.key,
                            value: Box::new(value),
                            computed: property.computed,
                            shorthand: property.shorthand,
                            range: property.range,
                            loc: property.loc,
                        }));
                    }
                    ObjectMember::SpreadElement(spread) => {
                        let argument = expression_to_pattern(*spread.argument)
                            .map_err(|_| fallback_array(&object_range))?;
                        properties.push(ObjectPatternMember::RestElement(RestElement {
                            argument: Box::new(argument),
                            range: spread.range,
                            loc: spread.loc,
                        }));
                    }
                }
            }
            Ok(Pattern::ObjectPattern(ObjectPattern {
                properties,
                range: object_range,
                loc: object.loc,
            }))
        }
        other => Err(other),
    }
}

fn fallback_array(range: &[usize; 2]) -> Expression {
    Expression::ArrayExpression(ArrayExpression {
        elements: Vec::new(),
        range: *range,
        loc: dummy_loc(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> ParsedProgram {
        parse_program(text, EsParserOptions::default()).expect("parse failed")
    }

    fn parse_module(text: &str) -> ParsedProgram {
        parse_program(
            text,
            EsParserOptions {
                ecma_version: 2022,
                source_type: SourceType::Module,
            },
        )
        .expect("parse failed")
    }

    #[test]
    fn test_logical_expression_shape() {
        let parsed = parse_ok("x && y");
        let Statement::ExpressionStatement(stmt) = &parsed.program.body[0] else {
            panic!("expected expression statement");
        };
        let Expression::LogicalExpression(logical) = &stmt.expression else {
            panic!("expected logical expression");
        };
        assert_eq!(logical.operator, "&&");
    }

    #[test]
    fn test_member_call_chain() {
        let parsed = parse_ok("a.b.c(1, d)");
        let Statement::ExpressionStatement(stmt) = &parsed.program.body[0] else {
            panic!();
        };
        let Expression::CallExpression(call) = &stmt.expression else {
            panic!();
        };
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_for_of_head() {
        let parsed = parse_ok("for ([a, i] of items);");
        let Statement::ForOfStatement(stmt) = &parsed.program.body[0] else {
            panic!("expected for-of");
        };
        let ForTarget::Pattern(Pattern::ArrayPattern(pattern)) = &stmt.left else {
            panic!("expected array pattern");
        };
        assert_eq!(pattern.elements.len(), 2);
    }

    #[test]
    fn test_import_and_let() {
        let parsed = parse_module("import M from \"m\"\nlet b = 2");
        assert_eq!(parsed.program.body.len(), 2);
        assert!(parsed.program.body[0].is_import());
        assert!(matches!(parsed.program.body[1], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn test_top_level_await_gating() {
        let result = parse_program(
            "await f()",
            EsParserOptions {
                ecma_version: 2021,
                source_type: SourceType::Module,
            },
        );
        assert!(result.is_err());
        assert!(parse_program(
            "await f()",
            EsParserOptions {
                ecma_version: 2022,
                source_type: SourceType::Module,
            },
        )
        .is_ok());
    }

    #[test]
    fn test_arrow_functions() {
        let parsed = parse_ok("xs.map((x) => x * 2)");
        let Statement::ExpressionStatement(stmt) = &parsed.program.body[0] else {
            panic!();
        };
        let Expression::CallExpression(call) = &stmt.expression else {
            panic!();
        };
        assert!(matches!(
            call.arguments[0],
            Expression::ArrowFunctionExpression(_)
        ));
    }

    #[test]
    fn test_export_default_object_with_methods() {
        let parsed = parse_module("export default { data() { return { a: 1 } }, computed: {} }");
        assert!(matches!(
            parsed.program.body[0],
            Statement::ExportDefaultDeclaration(_)
        ));
    }

    #[test]
    fn test_assignment_mode_targets() {
        let parsed = parse_ok("a = b");
        let Statement::ExpressionStatement(stmt) = &parsed.program.body[0] else {
            panic!();
        };
        assert!(matches!(stmt.expression, Expression::AssignmentExpression(_)));
    }

    #[test]
    fn test_empty_program() {
        let parsed = parse_ok("   \n  ");
        assert!(parsed.program.body.is_empty());
    }
}
