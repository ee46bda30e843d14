//! Template AST.
//!
//! The document fragment exclusively owns every node reachable through
//! child/attribute links. Cross-node links (`Reference.variable`, the
//! variable's recorded references) are weak and established by the
//! post-parse resolution pass; they never participate in ownership.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::ast::es;
use crate::ast::tokens::Token;
use crate::html::tags::Namespace;
use crate::location::{OffsetRange, ParseError, SourceLocation};

/// Root of a parsed document. Tokens, comments, and errors are appended
/// during tokenization and never moved.
#[derive(Debug, Default, Serialize)]
pub struct VDocumentFragment {
    pub children: Vec<VNode>,
    pub tokens: Vec<Token>,
    pub comments: Vec<Token>,
    pub errors: Vec<ParseError>,
    pub range: OffsetRange,
    pub loc: Option<SourceLocation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum VNode {
    VElement(VElement),
    VText(VText),
    VExpressionContainer(VExpressionContainer),
}

impl VNode {
    pub fn range(&self) -> OffsetRange {
        match self {
            VNode::VElement(n) => n.range,
            VNode::VText(n) => n.range,
            VNode::VExpressionContainer(n) => n.range,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VElement {
    /// Adjusted name: lowercased for HTML, case-restored for SVG/MathML.
    pub name: String,
    /// Name as written in the source.
    #[serde(rename = "rawName")]
    pub raw_name: String,
    pub namespace: Namespace,
    #[serde(rename = "startTag")]
    pub start_tag: VStartTag,
    pub children: Vec<VNode>,
    /// Present only when the closing tag physically exists in the source.
    #[serde(rename = "endTag")]
    pub end_tag: Option<VEndTag>,
    pub variables: Vec<VariableHandle>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

impl VElement {
    /// First plain attribute with the given (adjusted) name.
    pub fn attribute(&self, name: &str) -> Option<&VPlainAttribute> {
        self.start_tag.attributes.iter().find_map(|a| match a {
            VAttribute::Plain(p) if p.key.name == name => Some(p),
            _ => None,
        })
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .and_then(|a| a.value.as_ref())
            .map(|v| v.value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// First directive with the given name (without prefix).
    pub fn directive(&self, name: &str) -> Option<&VDirectiveAttribute> {
        self.start_tag.attributes.iter().find_map(|a| match a {
            VAttribute::Directive(d) if d.key.name == name => Some(d),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VStartTag {
    pub attributes: Vec<VAttribute>,
    #[serde(rename = "selfClosing")]
    pub self_closing: bool,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VEndTag {
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

/// An attribute is either a plain name/value pair or a directive carrying an
/// expression container.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VAttribute {
    Plain(VPlainAttribute),
    Directive(VDirectiveAttribute),
}

impl VAttribute {
    pub fn is_directive(&self) -> bool {
        matches!(self, VAttribute::Directive(_))
    }

    pub fn range(&self) -> OffsetRange {
        match self {
            VAttribute::Plain(a) => a.range,
            VAttribute::Directive(a) => a.range,
        }
    }

    /// Lowercased key text as it appears in the source, used for duplicate
    /// detection.
    pub fn raw_key(&self) -> &str {
        match self {
            VAttribute::Plain(a) => &a.key.raw_name,
            VAttribute::Directive(a) => &a.key.raw,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VPlainAttribute {
    pub directive: bool,
    pub key: VIdentifier,
    pub value: Option<VLiteral>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VDirectiveAttribute {
    pub directive: bool,
    pub key: VDirectiveKey,
    pub value: Option<VExpressionContainer>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VIdentifier {
    /// Adjusted name (case-restored for foreign attributes).
    pub name: String,
    #[serde(rename = "rawName")]
    pub raw_name: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VLiteral {
    /// Entity-decoded value.
    pub value: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct VDirectiveKey {
    /// Directive name without prefix (`for` in `v-for`, `on` for `@`).
    pub name: String,
    pub argument: Option<VDirectiveArgument>,
    pub modifiers: Vec<String>,
    pub shorthand: bool,
    /// Lowercased source text of the whole key, for duplicate detection.
    #[serde(skip)]
    pub raw: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum VDirectiveArgument {
    Static(String),
    /// `v-bind:[expr]` style dynamic argument.
    Dynamic(VExpressionContainer),
}

#[derive(Debug, Clone, Serialize)]
pub struct VText {
    /// Entity-decoded text.
    pub value: String,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

/// Wrapper for expressions embedded in the template: mustaches, directive
/// values, and dynamic directive arguments.
#[derive(Debug, Clone, Serialize)]
pub struct VExpressionContainer {
    pub expression: Option<ContainerExpression>,
    pub references: Vec<Reference>,
    #[serde(rename = "syntaxError")]
    pub syntax_error: Option<ParseError>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContainerExpression {
    Expression(es::Expression),
    VForExpression(VForExpression),
    VSlotScopeExpression(VSlotScopeExpression),
}

/// Synthesized from a parsed `for (… in …)` / `for (… of …)` head.
#[derive(Debug, Clone, Serialize)]
pub struct VForExpression {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub left: Vec<es::Pattern>,
    pub right: es::Expression,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

impl VForExpression {
    pub fn new(left: Vec<es::Pattern>, right: es::Expression, range: OffsetRange, loc: SourceLocation) -> Self {
        VForExpression {
            node_type: "VForExpression",
            left,
            right,
            range,
            loc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VSlotScopeExpression {
    #[serde(rename = "type")]
    pub node_type: &'static str,
    pub params: Vec<es::Pattern>,
    pub range: OffsetRange,
    pub loc: SourceLocation,
}

impl VSlotScopeExpression {
    pub fn new(params: Vec<es::Pattern>, range: OffsetRange, loc: SourceLocation) -> Self {
        VSlotScopeExpression {
            node_type: "VSlotScopeExpression",
            params,
            range,
            loc,
        }
    }
}

// ---------------------------------------------------------------------------
// references and element-scope variables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceMode {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableKind {
    VFor,
    Scope,
    Generic,
}

/// An element-scoped declaration introduced by an iteration or slot-scope
/// directive.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: es::Identifier,
    pub kind: VariableKind,
    /// References bound to this variable by the resolution pass.
    pub references: Vec<ResolvedReference>,
}

/// The identifying parts of a reference, recorded on the variable side.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedReference {
    pub id: es::Identifier,
    pub mode: ReferenceMode,
}

/// Shared handle to a variable. Elements own their variables through this
/// handle; references hold weak links only.
#[derive(Debug, Clone)]
pub struct VariableHandle(pub Rc<RefCell<Variable>>);

impl VariableHandle {
    pub fn new(id: es::Identifier, kind: VariableKind) -> Self {
        VariableHandle(Rc::new(RefCell::new(Variable {
            id,
            kind,
            references: Vec::new(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().id.name.clone()
    }

    pub fn kind(&self) -> VariableKind {
        self.0.borrow().kind
    }

    pub fn downgrade(&self) -> Weak<RefCell<Variable>> {
        Rc::downgrade(&self.0)
    }
}

impl Serialize for VariableHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let variable = self.0.borrow();
        let mut state = serializer.serialize_struct("Variable", 3)?;
        state.serialize_field("id", &variable.id)?;
        state.serialize_field("kind", &variable.kind)?;
        state.serialize_field("references", &variable.references)?;
        state.end()
    }
}

/// A reference from a template expression to an identifier that is not
/// declared inside the expression itself.
#[derive(Debug, Clone)]
pub struct Reference {
    pub id: es::Identifier,
    pub mode: ReferenceMode,
    /// Weak back-pointer to the element variable this reference resolved
    /// to, set by the resolution pass. `None` means the identifier is free.
    pub variable: Option<Weak<RefCell<Variable>>>,
}

impl Reference {
    pub fn new(id: es::Identifier, mode: ReferenceMode) -> Self {
        Reference {
            id,
            mode,
            variable: None,
        }
    }

    pub fn resolved_variable(&self) -> Option<Rc<RefCell<Variable>>> {
        self.variable.as_ref().and_then(Weak::upgrade)
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Reference", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("mode", &self.mode)?;
        state.serialize_field("resolved", &self.resolved_variable().is_some())?;
        state.end()
    }
}
