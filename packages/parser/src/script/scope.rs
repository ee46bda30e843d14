//! Scope analysis for embedded scripts.
//!
//! Builds a small scope manager over the bundled parser's AST: variable
//! declarations per scope, identifier references with read/write modes, and
//! the unresolved set the directive-expression transformer consumes. Also
//! hosts the scope-merge step the `<script setup>` reconstructor runs after
//! it splices the synthetic block back into the program body.

use indexmap::IndexMap;

use crate::ast::es::*;
use crate::ast::nodes::ReferenceMode;
use crate::location::OffsetRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct ScriptVariable {
    pub name: String,
    /// Ranges of the declaring constructs.
    pub defs: Vec<OffsetRange>,
    /// Declaring identifier nodes.
    pub identifiers: Vec<Identifier>,
    /// Indices into `ScopeManager::references`.
    pub references: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ScriptReference {
    pub id: Identifier,
    pub mode: ReferenceMode,
    /// Scope the reference occurs in.
    pub from: usize,
    /// Resolution target: (scope index, variable name).
    pub resolved: Option<(usize, String)>,
}

#[derive(Debug, Clone)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    /// Range of the AST construct that opened the scope.
    pub range: OffsetRange,
    pub variables: IndexMap<String, ScriptVariable>,
    pub reference_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeManager {
    pub scopes: Vec<ScopeData>,
    pub references: Vec<ScriptReference>,
}

impl ScopeManager {
    pub fn top_scope(&self) -> &ScopeData {
        &self.scopes[0]
    }

    /// References that resolve to no variable in any enclosing scope.
    pub fn unresolved(&self) -> Vec<&ScriptReference> {
        self.references
            .iter()
            .filter(|r| r.resolved.is_none())
            .collect()
    }

    fn resolve_all(&mut self) {
        for index in 0..self.references.len() {
            let (name, mut scope_index) = {
                let reference = &self.references[index];
                (reference.id.name.clone(), reference.from)
            };
            loop {
                if self.scopes[scope_index].variables.contains_key(&name) {
                    self.references[index].resolved = Some((scope_index, name.clone()));
                    self.scopes[scope_index]
                        .variables
                        .get_mut(&name)
                        .unwrap()
                        .references
                        .push(index);
                    break;
                }
                match self.scopes[scope_index].parent {
                    Some(parent) => scope_index = parent,
                    None => break,
                }
            }
        }
    }

    /// Register compiler macros (`defineProps`, …) as top-scope variables
    /// and resolve any pending references to them. Macros have no defining
    /// identifier; they exist by fiat of the host compiler.
    pub fn define_macros<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if !self.scopes[0].variables.contains_key(name) {
                self.scopes[0].variables.insert(
                    name.to_string(),
                    ScriptVariable {
                        name: name.to_string(),
                        defs: Vec::new(),
                        identifiers: Vec::new(),
                        references: Vec::new(),
                    },
                );
            }
            for index in 0..self.references.len() {
                if self.references[index].resolved.is_none() && self.references[index].id.name == name {
                    self.references[index].resolved = Some((0, name.to_string()));
                    self.scopes[0]
                        .variables
                        .get_mut(name)
                        .unwrap()
                        .references
                        .push(index);
                }
            }
        }
    }

    /// Merge the block scope covering `block_range` into the top scope.
    ///
    /// The synthetic `{ … }` the reconstructor wraps around setup statements
    /// creates one block scope; the setup body is semantically a module
    /// body, so its references are re-homed and its variables adopted (or
    /// merged with same-named module variables).
    pub fn merge_block_scope_into_top(&mut self, block_range: OffsetRange) {
        let Some(block_index) = self
            .scopes
            .iter()
            .position(|s| s.kind == ScopeKind::Block && s.range == block_range)
        else {
            return;
        };

        // Re-home references.
        for reference in &mut self.references {
            if reference.from == block_index {
                reference.from = 0;
            }
        }
        let reference_indices = std::mem::take(&mut self.scopes[block_index].reference_indices);
        self.scopes[0].reference_indices.extend(reference_indices);

        // Adopt or merge variables.
        let variables = std::mem::take(&mut self.scopes[block_index].variables);
        for (name, variable) in variables {
            for index in &variable.references {
                self.references[*index].resolved = Some((0, name.clone()));
            }
            match self.scopes[0].variables.get_mut(&name) {
                Some(existing) => {
                    existing.defs.extend(variable.defs);
                    existing.identifiers.extend(variable.identifiers);
                    existing.references.extend(variable.references);
                }
                None => {
                    self.scopes[0].variables.insert(name, variable);
                }
            }
        }

        // Re-parent children of the dissolved scope, then re-resolve any
        // reference that previously bubbled out through it.
        for scope in &mut self.scopes {
            if scope.parent == Some(block_index) {
                scope.parent = Some(0);
            }
        }
        for index in 0..self.references.len() {
            if self.references[index].resolved.is_none() {
                let name = self.references[index].id.name.clone();
                if self.scopes[0].variables.contains_key(&name) {
                    self.references[index].resolved = Some((0, name.clone()));
                    self.scopes[0]
                        .variables
                        .get_mut(&name)
                        .unwrap()
                        .references
                        .push(index);
                }
            }
        }

        // Drop the dissolved scope entry and shift every stored scope
        // index past it.
        self.scopes.remove(block_index);
        for scope in &mut self.scopes {
            if let Some(parent) = scope.parent.as_mut() {
                if *parent > block_index {
                    *parent -= 1;
                }
            }
        }
        for reference in &mut self.references {
            if reference.from > block_index {
                reference.from -= 1;
            }
            if let Some((scope_index, _)) = reference.resolved.as_mut() {
                if *scope_index > block_index {
                    *scope_index -= 1;
                }
            }
        }
    }
}

/// Analyze a program, producing the scope manager.
pub fn analyze_program(program: &Program) -> ScopeManager {
    let mut analyzer = Analyzer::new(program.source_type, program.range);
    for statement in &program.body {
        analyzer.hoist_statement(statement);
    }
    for statement in &program.body {
        analyzer.walk_statement(statement);
    }
    let mut manager = analyzer.manager;
    manager.resolve_all();
    manager
}

struct Analyzer {
    manager: ScopeManager,
    stack: Vec<usize>,
}

impl Analyzer {
    fn new(source_type: SourceType, range: OffsetRange) -> Self {
        let kind = match source_type {
            SourceType::Module => ScopeKind::Module,
            SourceType::Script => ScopeKind::Global,
        };
        let manager = ScopeManager {
            scopes: vec![ScopeData {
                kind,
                parent: None,
                range,
                variables: IndexMap::new(),
                reference_indices: Vec::new(),
            }],
            references: Vec::new(),
        };
        Analyzer {
            manager,
            stack: vec![0],
        }
    }

    fn current(&self) -> usize {
        *self.stack.last().unwrap()
    }

    fn push_scope(&mut self, kind: ScopeKind, range: OffsetRange) -> usize {
        let parent = self.current();
        let index = self.manager.scopes.len();
        self.manager.scopes.push(ScopeData {
            kind,
            parent: Some(parent),
            range,
            variables: IndexMap::new(),
            reference_indices: Vec::new(),
        });
        self.stack.push(index);
        index
    }

    fn pop_scope(&mut self) {
        self.stack.pop();
    }

    fn declare(&mut self, id: &Identifier, def_range: OffsetRange) {
        let scope = self.current();
        let variable = self.manager.scopes[scope]
            .variables
            .entry(id.name.clone())
            .or_insert_with(|| ScriptVariable {
                name: id.name.clone(),
                defs: Vec::new(),
                identifiers: Vec::new(),
                references: Vec::new(),
            });
        variable.defs.push(def_range);
        variable.identifiers.push(id.clone());
    }

    fn reference(&mut self, id: &Identifier, mode: ReferenceMode) {
        let from = self.current();
        let index = self.manager.references.len();
        self.manager.references.push(ScriptReference {
            id: id.clone(),
            mode,
            from,
            resolved: None,
        });
        self.manager.scopes[from].reference_indices.push(index);
    }

    /// Pre-declare hoisted names (functions, `var`) so forward references
    /// inside the same scope resolve.
    fn hoist_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::FunctionDeclaration(decl) => self.declare(&decl.id, decl.range),
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    self.declare_pattern(&declarator.id, declarator.range);
                }
            }
            Statement::ImportDeclaration(decl) => {
                for specifier in &decl.specifiers {
                    let local = match specifier {
                        ImportSpecifierKind::ImportSpecifier { local, .. } => local,
                        ImportSpecifierKind::ImportDefaultSpecifier { local, .. } => local,
                        ImportSpecifierKind::ImportNamespaceSpecifier { local, .. } => local,
                    };
                    self.declare(local, decl.range);
                }
            }
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(inner) = &decl.declaration {
                    self.hoist_statement(inner);
                }
            }
            _ => {}
        }
    }

    fn declare_pattern(&mut self, pattern: &Pattern, def_range: OffsetRange) {
        match pattern {
            Pattern::Identifier(id) => self.declare(id, def_range),
            Pattern::ArrayPattern(array) => {
                for element in array.elements.iter().flatten() {
                    self.declare_pattern(element, def_range);
                }
            }
            Pattern::ObjectPattern(object) => {
                for member in &object.properties {
                    match member {
                        ObjectPatternMember::Property(property) => {
                            if property.computed {
                                self.walk_expression(&property.key, ReferenceMode::Read);
                            }
                            self.declare_pattern(&property.value, def_range);
                        }
                        ObjectPatternMember::RestElement(rest) => {
                            self.declare_pattern(&rest.argument, def_range);
                        }
                    }
                }
            }
            Pattern::AssignmentPattern(assignment) => {
                self.declare_pattern(&assignment.left, def_range);
                self.walk_expression(&assignment.right, ReferenceMode::Read);
            }
            Pattern::RestElement(rest) => self.declare_pattern(&rest.argument, def_range),
        }
    }

    /// Treat a pattern as an assignment target, producing write references.
    fn assign_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Identifier(id) => self.reference(id, ReferenceMode::Write),
            Pattern::ArrayPattern(array) => {
                for element in array.elements.iter().flatten() {
                    self.assign_pattern(element);
                }
            }
            Pattern::ObjectPattern(object) => {
                for member in &object.properties {
                    match member {
                        ObjectPatternMember::Property(property) => {
                            if property.computed {
                                self.walk_expression(&property.key, ReferenceMode::Read);
                            }
                            self.assign_pattern(&property.value);
                        }
                        ObjectPatternMember::RestElement(rest) => self.assign_pattern(&rest.argument),
                    }
                }
            }
            Pattern::AssignmentPattern(assignment) => {
                self.assign_pattern(&assignment.left);
                self.walk_expression(&assignment.right, ReferenceMode::Read);
            }
            Pattern::RestElement(rest) => self.assign_pattern(&rest.argument),
        }
    }

    fn walk_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::ExpressionStatement(stmt) => {
                self.walk_expression(&stmt.expression, ReferenceMode::Read)
            }
            Statement::BlockStatement(block) => {
                self.push_scope(ScopeKind::Block, block.range);
                for inner in &block.body {
                    self.hoist_statement(inner);
                }
                for inner in &block.body {
                    self.walk_statement(inner);
                }
                self.pop_scope();
            }
            Statement::EmptyStatement(_) => {}
            Statement::VariableDeclaration(decl) => {
                // Names were hoisted; only walk initializers here.
                for declarator in &decl.declarations {
                    if let Some(init) = &declarator.init {
                        self.walk_expression(init, ReferenceMode::Read);
                    }
                }
            }
            Statement::FunctionDeclaration(decl) => {
                self.push_scope(ScopeKind::Function, decl.range);
                for param in &decl.params {
                    self.declare_pattern(param, param.range());
                }
                for inner in &decl.body.body {
                    self.hoist_statement(inner);
                }
                for inner in &decl.body.body {
                    self.walk_statement(inner);
                }
                self.pop_scope();
            }
            Statement::ReturnStatement(stmt) => {
                if let Some(argument) = &stmt.argument {
                    self.walk_expression(argument, ReferenceMode::Read);
                }
            }
            Statement::IfStatement(stmt) => {
                self.walk_expression(&stmt.test, ReferenceMode::Read);
                self.walk_statement(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.walk_statement(alternate);
                }
            }
            Statement::ForOfStatement(stmt) => {
                self.walk_for_head(&stmt.left);
                self.walk_expression(&stmt.right, ReferenceMode::Read);
                self.walk_statement(&stmt.body);
            }
            Statement::ForInStatement(stmt) => {
                self.walk_for_head(&stmt.left);
                self.walk_expression(&stmt.right, ReferenceMode::Read);
                self.walk_statement(&stmt.body);
            }
            Statement::ImportDeclaration(_) => {}
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(inner) = &decl.declaration {
                    self.walk_statement(inner);
                }
                if decl.source.is_none() {
                    for specifier in &decl.specifiers {
                        self.reference(&specifier.local, ReferenceMode::Read);
                    }
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                self.walk_expression(&decl.declaration, ReferenceMode::Read);
            }
        }
    }

    fn walk_for_head(&mut self, target: &ForTarget) {
        match target {
            ForTarget::Declaration(decl) => {
                for declarator in &decl.declarations {
                    self.declare_pattern(&declarator.id, declarator.range);
                }
            }
            ForTarget::Pattern(pattern) => self.assign_pattern(pattern),
        }
    }

    fn walk_expression(&mut self, expression: &Expression, mode: ReferenceMode) {
        match expression {
            Expression::Identifier(id) => self.reference(id, mode),
            Expression::Literal(_) | Expression::ThisExpression(_) => {}
            Expression::TemplateLiteral(template) => {
                for expr in &template.expressions {
                    self.walk_expression(expr, ReferenceMode::Read);
                }
            }
            Expression::ArrayExpression(array) => {
                for element in array.elements.iter().flatten() {
                    self.walk_expression(element, ReferenceMode::Read);
                }
            }
            Expression::ObjectExpression(object) => {
                for member in &object.properties {
                    match member {
                        ObjectMember::Property(property) => {
                            if property.computed {
                                self.walk_expression(&property.key, ReferenceMode::Read);
                            }
                            self.walk_expression(&property.value, ReferenceMode::Read);
                        }
                        ObjectMember::SpreadElement(spread) => {
                            self.walk_expression(&spread.argument, ReferenceMode::Read)
                        }
                    }
                }
            }
            Expression::UnaryExpression(unary) => {
                self.walk_expression(&unary.argument, ReferenceMode::Read)
            }
            Expression::UpdateExpression(update) => {
                self.walk_expression(&update.argument, ReferenceMode::ReadWrite)
            }
            Expression::BinaryExpression(binary) => {
                self.walk_expression(&binary.left, ReferenceMode::Read);
                self.walk_expression(&binary.right, ReferenceMode::Read);
            }
            Expression::LogicalExpression(logical) => {
                self.walk_expression(&logical.left, ReferenceMode::Read);
                self.walk_expression(&logical.right, ReferenceMode::Read);
            }
            Expression::AssignmentExpression(assignment) => {
                let target_mode = if assignment.operator == "=" {
                    ReferenceMode::Write
                } else {
                    ReferenceMode::ReadWrite
                };
                match assignment.left.as_ref() {
                    AssignmentTarget::Expression(expr) => self.walk_expression(expr, target_mode),
                    AssignmentTarget::Pattern(pattern) => self.assign_pattern(pattern),
                }
                self.walk_expression(&assignment.right, ReferenceMode::Read);
            }
            Expression::ConditionalExpression(conditional) => {
                self.walk_expression(&conditional.test, ReferenceMode::Read);
                self.walk_expression(&conditional.consequent, ReferenceMode::Read);
                self.walk_expression(&conditional.alternate, ReferenceMode::Read);
            }
            Expression::CallExpression(call) => {
                self.walk_expression(&call.callee, ReferenceMode::Read);
                for argument in &call.arguments {
                    self.walk_expression(argument, ReferenceMode::Read);
                }
            }
            Expression::NewExpression(new) => {
                self.walk_expression(&new.callee, ReferenceMode::Read);
                for argument in &new.arguments {
                    self.walk_expression(argument, ReferenceMode::Read);
                }
            }
            Expression::MemberExpression(member) => {
                // The mode applies to the innermost object; `a.b = 1` reads `a`.
                self.walk_expression(&member.object, ReferenceMode::Read);
                if member.computed {
                    self.walk_expression(&member.property, ReferenceMode::Read);
                }
            }
            Expression::SequenceExpression(sequence) => {
                for expr in &sequence.expressions {
                    self.walk_expression(expr, ReferenceMode::Read);
                }
            }
            Expression::ArrowFunctionExpression(arrow) => {
                self.push_scope(ScopeKind::Function, arrow.range);
                for param in &arrow.params {
                    self.declare_pattern(param, param.range());
                }
                match &arrow.body {
                    ArrowBody::Expression(expr) => self.walk_expression(expr, ReferenceMode::Read),
                    ArrowBody::Block(block) => {
                        for inner in &block.body {
                            self.hoist_statement(inner);
                        }
                        for inner in &block.body {
                            self.walk_statement(inner);
                        }
                    }
                }
                self.pop_scope();
            }
            Expression::FunctionExpression(function) => {
                self.push_scope(ScopeKind::Function, function.range);
                if let Some(id) = &function.id {
                    self.declare(id, function.range);
                }
                for param in &function.params {
                    self.declare_pattern(param, param.range());
                }
                for inner in &function.body.body {
                    self.hoist_statement(inner);
                }
                for inner in &function.body.body {
                    self.walk_statement(inner);
                }
                self.pop_scope();
            }
            Expression::AwaitExpression(await_expr) => {
                self.walk_expression(&await_expr.argument, ReferenceMode::Read)
            }
            Expression::SpreadElement(spread) => {
                self.walk_expression(&spread.argument, ReferenceMode::Read)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::es_parser::{parse_program, EsParserOptions};

    fn analyze(text: &str) -> ScopeManager {
        let parsed = parse_program(text, EsParserOptions::default()).expect("parse failed");
        analyze_program(&parsed.program)
    }

    #[test]
    fn test_unresolved_references() {
        let manager = analyze("x && y");
        let names: Vec<_> = manager.unresolved().iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_arrow_params_are_local() {
        let manager = analyze("xs.map(x => x + y)");
        let names: Vec<_> = manager.unresolved().iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["xs", "y"]);
    }

    #[test]
    fn test_write_modes() {
        let manager = analyze("a = 1, b += 2, c++");
        let unresolved = manager.unresolved();
        assert_eq!(unresolved[0].mode, ReferenceMode::Write);
        assert_eq!(unresolved[1].mode, ReferenceMode::ReadWrite);
        assert_eq!(unresolved[2].mode, ReferenceMode::ReadWrite);
    }

    #[test]
    fn test_for_of_pattern_is_write() {
        let manager = analyze("for ([a, i] of items);");
        let names: Vec<_> = manager
            .unresolved()
            .iter()
            .map(|r| (r.id.name.clone(), r.mode))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a".to_string(), ReferenceMode::Write),
                ("i".to_string(), ReferenceMode::Write),
                ("items".to_string(), ReferenceMode::Read),
            ]
        );
    }

    #[test]
    fn test_declared_variables_resolve() {
        let manager = analyze("let a = 1; a + b");
        let names: Vec<_> = manager.unresolved().iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["b"]);
        assert!(manager.top_scope().variables.contains_key("a"));
    }

    #[test]
    fn test_member_property_not_referenced() {
        let manager = analyze("a.b.c");
        let names: Vec<_> = manager.unresolved().iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["a"]);
    }
}
