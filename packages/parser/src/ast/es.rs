//! ESTree-compatible AST for embedded script content.
//!
//! Every node carries `range` and `loc` in original-source coordinates once
//! the location fix pass has run. Serialization produces the conventional
//! `type`-tagged JSON shape.

use serde::Serialize;

use crate::location::{OffsetRange, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Script,
    Module,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Expression {
    Identifier(Identifier),
    Literal(Literal),
    TemplateLiteral(TemplateLiteral),
    ThisExpression(ThisExpression),
    ArrayExpression(ArrayExpression),
    ObjectExpression(ObjectExpression),
    UnaryExpression(UnaryExpression),
    UpdateExpression(UpdateExpression),
    BinaryExpression(BinaryExpression),
    LogicalExpression(LogicalExpression),
    AssignmentExpression(AssignmentExpression),
    ConditionalExpression(ConditionalExpression),
    CallExpression(CallExpression),
    NewExpression(NewExpression),
    MemberExpression(MemberExpression),
    SequenceExpression(SequenceExpression),
    ArrowFunctionExpression(ArrowFunctionExpression),
    FunctionExpression(FunctionExpression),
    AwaitExpression(AwaitExpression),
    SpreadElement(SpreadElement),
}

impl Expression {
    pub fn range(&self) -> OffsetRange {
        match self {
            Expression::Identifier(n) => n.range,
            Expression::Literal(n) => n.range,
            Expression::TemplateLiteral(n) => n.range,
            Expression::ThisExpression(n) => n.range,
            Expression::ArrayExpression(n) => n.range,
            Expression::ObjectExpression(n) => n.range,
            Expression::UnaryExpression(n) => n.range,
            Expression::UpdateExpression(n) => n.range,
            Expression::BinaryExpression(n) => n.range,
            Expression::LogicalExpression(n) => n.range,
            Expression::AssignmentExpression(n) => n.range,
            Expression::ConditionalExpression(n) => n.range,
            Expression::CallExpression(n) => n.range,
            Expression::NewExpression(n) => n.range,
            Expression::MemberExpression(n) => n.range,
            Expression::SequenceExpression(n) => n.range,
            Expression::ArrowFunctionExpression(n) => n.range,
            Expression::FunctionExpression(n) => n.range,
            Expression::AwaitExpression(n) => n.range,
            Expression::SpreadElement(n) => n.range,
        }
    }

    pub fn loc(&self) -> SourceLocation {
        match self {
            Expression::Identifier(n) => n.loc,
            Expression::Literal(n) => n.loc,
            Expression::TemplateLiteral(n) => n.loc,
            Expression::ThisExpression(n) => n.loc,
            Expression::ArrayExpression(n) => n.loc,
            Expression::ObjectExpression(n) => n.loc,
            Expression::UnaryExpression(n) => n.loc,
            Expression::UpdateExpression(n) => n.loc,
            Expression::BinaryExpression(n) => n.loc,
            Expression::LogicalExpression(n) => n.loc,
            Expression::AssignmentExpression(n) => n.loc,
            Expression::ConditionalExpression(n) => n.loc,
            Expression::CallExpression(n) => n.loc,
            Expression::NewExpression(n) => n.loc,
            Expression::MemberExpression(n) => n.loc,
            Expression::SequenceExpression(n) => n.loc,
            Expression::ArrowFunctionExpression(n) => n.loc,
            Expression::FunctionExpression(n) => n.loc,
            Expression::AwaitExpression(n) => n.loc,
            Expression::SpreadElement(n) => n.loc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Identifier {
    pub name: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Regular expressions serialize their source text.
    RegExp {
        pattern: String,
        flags: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub raw: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateLiteral {
    pub quasis: Vec<TemplateElement>,
    pub expressions: Vec<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateElementValue {
    pub raw: String,
    pub cooked: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateElement {
    pub value: TemplateElementValue,
    pub tail: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThisExpression {
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayExpression {
    pub elements: Vec<Option<Expression>>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ObjectMember {
    Property(Property),
    SpreadElement(SpreadElement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub key: Expression,
    pub value: Expression,
    pub kind: PropertyKind,
    pub computed: bool,
    pub shorthand: bool,
    pub method: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectExpression {
    pub properties: Vec<ObjectMember>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpreadElement {
    pub argument: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnaryExpression {
    pub operator: String,
    pub prefix: bool,
    pub argument: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateExpression {
    pub operator: String,
    pub prefix: bool,
    pub argument: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryExpression {
    pub operator: String,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogicalExpression {
    pub operator: String,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentExpression {
    pub operator: String,
    pub left: Box<AssignmentTarget>,
    pub right: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

/// The left side of an assignment: either a plain expression (member or
/// identifier) or a destructuring pattern.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AssignmentTarget {
    Expression(Expression),
    Pattern(Pattern),
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub optional: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewExpression {
    pub callee: Box<Expression>,
    pub arguments: Vec<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberExpression {
    pub object: Box<Expression>,
    pub property: Box<Expression>,
    pub computed: bool,
    pub optional: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceExpression {
    pub expressions: Vec<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(BlockStatement),
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrowFunctionExpression {
    pub params: Vec<Pattern>,
    pub body: ArrowBody,
    #[serde(rename = "async")]
    pub is_async: bool,
    /// True when the body is a bare expression.
    pub expression: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionExpression {
    pub id: Option<Identifier>,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub generator: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct AwaitExpression {
    pub argument: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------------------
// patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Pattern {
    Identifier(Identifier),
    ArrayPattern(ArrayPattern),
    ObjectPattern(ObjectPattern),
    AssignmentPattern(AssignmentPattern),
    RestElement(RestElement),
}

impl Pattern {
    pub fn range(&self) -> OffsetRange {
        match self {
            Pattern::Identifier(n) => n.range,
            Pattern::ArrayPattern(n) => n.range,
            Pattern::ObjectPattern(n) => n.range,
            Pattern::AssignmentPattern(n) => n.range,
            Pattern::RestElement(n) => n.range,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayPattern {
    pub elements: Vec<Option<Pattern>>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ObjectPatternMember {
    Property(PatternProperty),
    RestElement(RestElement),
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternProperty {
    pub key: Expression,
    pub value: Box<Pattern>,
    pub computed: bool,
    pub shorthand: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternMember>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentPattern {
    pub left: Box<Pattern>,
    pub right: Box<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestElement {
    pub argument: Box<Pattern>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

// ---------------------------------------------------------------------------
// statements & module items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    ExpressionStatement(ExpressionStatement),
    BlockStatement(BlockStatement),
    EmptyStatement(EmptyStatement),
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(FunctionDeclaration),
    ReturnStatement(ReturnStatement),
    IfStatement(IfStatement),
    ForOfStatement(ForOfStatement),
    ForInStatement(ForInStatement),
    ImportDeclaration(ImportDeclaration),
    ExportNamedDeclaration(ExportNamedDeclaration),
    ExportDefaultDeclaration(ExportDefaultDeclaration),
}

impl Statement {
    pub fn range(&self) -> OffsetRange {
        match self {
            Statement::ExpressionStatement(n) => n.range,
            Statement::BlockStatement(n) => n.range,
            Statement::EmptyStatement(n) => n.range,
            Statement::VariableDeclaration(n) => n.range,
            Statement::FunctionDeclaration(n) => n.range,
            Statement::ReturnStatement(n) => n.range,
            Statement::IfStatement(n) => n.range,
            Statement::ForOfStatement(n) => n.range,
            Statement::ForInStatement(n) => n.range,
            Statement::ImportDeclaration(n) => n.range,
            Statement::ExportNamedDeclaration(n) => n.range,
            Statement::ExportDefaultDeclaration(n) => n.range,
        }
    }

    pub fn is_import(&self) -> bool {
        matches!(self, Statement::ImportDeclaration(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockStatement {
    pub body: Vec<Statement>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmptyStatement {
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableDeclarator {
    pub id: Pattern,
    pub init: Option<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableDeclaration {
    pub kind: DeclarationKind,
    pub declarations: Vec<VariableDeclarator>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub id: Identifier,
    pub params: Vec<Pattern>,
    pub body: BlockStatement,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub generator: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnStatement {
    pub argument: Option<Expression>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

/// Iteration head: either a declaration (`let x of xs`) or a bare pattern.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ForTarget {
    Declaration(VariableDeclaration),
    Pattern(Pattern),
}

#[derive(Debug, Clone, Serialize)]
pub struct ForOfStatement {
    pub left: ForTarget,
    pub right: Expression,
    pub body: Box<Statement>,
    #[serde(rename = "await")]
    pub is_await: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForInStatement {
    pub left: ForTarget,
    pub right: Expression,
    pub body: Box<Statement>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ImportSpecifierKind {
    ImportSpecifier {
        imported: Identifier,
        local: Identifier,
        range: OffsetRange,
        loc: SourceLocation,
    },
    ImportDefaultSpecifier {
        local: Identifier,
        range: OffsetRange,
        loc: SourceLocation,
    },
    ImportNamespaceSpecifier {
        local: Identifier,
        range: OffsetRange,
        loc: SourceLocation,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportDeclaration {
    pub specifiers: Vec<ImportSpecifierKind>,
    pub source: Literal,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSpecifier {
    pub local: Identifier,
    pub exported: Identifier,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportNamedDeclaration {
    pub declaration: Option<Box<Statement>>,
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<Literal>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDefaultDeclaration {
    pub declaration: Expression,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

/// Root of a parsed script. `template_body` is attached by the SFC layer
/// after the template has been parsed and post-processed.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub body: Vec<Statement>,
    #[serde(rename = "sourceType")]
    pub source_type: SourceType,
    pub range: OffsetRange,
    pub loc: SourceLocation,
    #[serde(rename = "templateBody", skip_serializing_if = "Option::is_none")]
    pub template_body: Option<Box<crate::ast::nodes::VElement>>,
}

impl Program {
    pub fn new(body: Vec<Statement>, source_type: SourceType, range: OffsetRange, loc: SourceLocation) -> Self {
        Program {
            node_type: "Program",
            body,
            source_type,
            range,
            loc,
            template_body: None,
        }
    }
}

/// A comment attached to the script token stream.
#[derive(Debug, Clone, Serialize)]
pub struct EsComment {
    #[serde(rename = "type")]
    pub comment_type: &'static str,
    pub value: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}
