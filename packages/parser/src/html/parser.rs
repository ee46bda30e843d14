//! Template parser: consumes intermediate events and builds the document
//! fragment, tracking the element stack, namespaces, content models, and
//! directive expressions.

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::nodes::*;
use crate::ast::tokens::Token;
use crate::html::intermediate::{
    AttributeTokens, EndTagEvent, IntermediateToken, IntermediateTokenizer, MustacheEvent,
    StartTagEvent, TextEvent,
};
use crate::html::tags::{
    content_model_of, foreign_attribute_namespace, is_html_integration_point,
    is_mathml_text_integration_point, ContentModel, Namespace, CLOSED_BY_SIBLINGS, VOID_ELEMENTS,
    SVG_ATTRIBUTE_CASE, SVG_ELEMENT_CASE, MATHML_ATTRIBUTE_CASE,
};
use crate::line_index::LineIndex;
use crate::location::{ErrorCode, OffsetRange, ParseError, SourceLocation};
use crate::script::expression::{ExpressionContext, ExpressionKind};

/// Attribute names introducing directives: the directive prefix grammar or
/// the slot-scope legacy forms.
static DIRECTIVE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:v-|[.:@#]).*[^.:@#]$").unwrap());

/// Value of a plain attribute on a not-yet-built start tag.
fn event_attribute_value<'e>(event: &'e StartTagEvent, name: &str) -> Option<&'e str> {
    event
        .attributes
        .iter()
        .find(|attribute| attribute.key.value == name)
        .and_then(|attribute| attribute.value.as_ref())
        .map(|token| token.value.as_str())
}

/// The event source the parser drives. The built-in tokenizer pipeline
/// implements it; alternate template languages plug in through the same
/// surface.
pub trait IntermediateTokenSource {
    fn next(&mut self) -> Option<IntermediateToken>;
    fn set_namespace(&mut self, namespace: Namespace);
    fn set_content_model(&mut self, model: ContentModel, tag_name: &str);
    fn set_expression_enabled(&mut self, enabled: bool);
    fn expression_enabled(&self) -> bool;
    fn take_tokens(&mut self) -> Vec<Token>;
    fn take_comments(&mut self) -> Vec<Token>;
    fn take_errors(&mut self) -> Vec<ParseError>;
}

impl<'a> IntermediateTokenSource for IntermediateTokenizer<'a> {
    fn next(&mut self) -> Option<IntermediateToken> {
        IntermediateTokenizer::next(self)
    }

    fn set_namespace(&mut self, namespace: Namespace) {
        self.tokenizer.set_namespace(namespace);
    }

    fn set_content_model(&mut self, model: ContentModel, tag_name: &str) {
        self.tokenizer.set_content_model(model, tag_name);
    }

    fn set_expression_enabled(&mut self, enabled: bool) {
        self.tokenizer.set_expression_enabled(enabled);
    }

    fn expression_enabled(&self) -> bool {
        self.tokenizer.expression_enabled()
    }

    fn take_tokens(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.tokens)
    }

    fn take_comments(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.comments)
    }

    fn take_errors(&mut self) -> Vec<ParseError> {
        let mut errors = std::mem::take(&mut self.tokenizer.errors);
        errors.append(&mut self.errors);
        errors
    }
}

/// An element still being built: the node plus the bookkeeping needed when
/// it closes.
struct OpenElement {
    element: VElement,
    /// Expression parsing was off before this element enabled/disabled it.
    restore_expression: Option<bool>,
}

pub struct TemplateParser<'a, S: IntermediateTokenSource> {
    source_text: &'a str,
    tokens: S,
    line_index: Rc<LineIndex>,
    expression: Option<ExpressionContext<'a>>,
    stack: Vec<OpenElement>,
    fragment: VDocumentFragment,
    errors: Vec<ParseError>,
    /// Depth at which a `v-pre` subtree started.
    v_pre_depth: Option<usize>,
    /// Treat root-level `<template>` as the expression root (SFC mode).
    sfc_mode: bool,
}

impl<'a, S: IntermediateTokenSource> TemplateParser<'a, S> {
    pub fn new(
        source_text: &'a str,
        tokens: S,
        line_index: Rc<LineIndex>,
        expression: Option<ExpressionContext<'a>>,
        sfc_mode: bool,
    ) -> Self {
        let end = source_text.len();
        let fragment = VDocumentFragment {
            children: Vec::new(),
            tokens: Vec::new(),
            comments: Vec::new(),
            errors: Vec::new(),
            range: [0, end],
            loc: None,
        };
        TemplateParser {
            source_text,
            tokens,
            line_index,
            expression,
            stack: Vec::new(),
            fragment,
            errors: Vec::new(),
            v_pre_depth: None,
            sfc_mode,
        }
    }

    pub fn parse(mut self) -> VDocumentFragment {
        while let Some(event) = self.tokens.next() {
            match event {
                IntermediateToken::StartTag(event) => self.process_start_tag(event),
                IntermediateToken::EndTag(event) => self.process_end_tag(event),
                IntermediateToken::Text(event) => self.process_text(event),
                IntermediateToken::Mustache(event) => self.process_mustache(event),
            }
        }
        while !self.stack.is_empty() {
            self.close_implicitly();
        }
        self.fragment.loc = Some(SourceLocation::new(
            self.line_index.position_for(self.fragment.range[0]),
            self.line_index.position_for(self.fragment.range[1]),
        ));
        self.fragment.tokens = self.tokens.take_tokens();
        self.fragment.comments = self.tokens.take_comments();
        let mut errors = self.tokens.take_errors();
        errors.append(&mut self.errors);
        errors.sort_by_key(|e| e.index);
        self.fragment.errors = errors;
        self.fragment
    }

    // ------------------------------------------------------------------
    // helpers
    // ------------------------------------------------------------------

    fn location_for(&self, range: OffsetRange) -> SourceLocation {
        SourceLocation::new(
            self.line_index.position_for(range[0]),
            self.line_index.position_for(range[1]),
        )
    }

    fn report(&mut self, code: ErrorCode, index: usize) {
        let pos = self.line_index.position_for(index);
        self.errors.push(ParseError::new(code, index, pos));
    }

    fn current_namespace(&self) -> Namespace {
        self.stack
            .last()
            .map_or(Namespace::Html, |open| open.element.namespace)
    }

    fn append_child(&mut self, node: VNode) {
        match self.stack.last_mut() {
            Some(open) => open.element.children.push(node),
            None => self.fragment.children.push(node),
        }
    }

    fn in_v_pre(&self) -> bool {
        self.v_pre_depth.is_some()
    }

    // ------------------------------------------------------------------
    // start tags
    // ------------------------------------------------------------------

    fn process_start_tag(&mut self, event: StartTagEvent) {
        let namespace = self.detect_namespace(&event);

        // Implicit close of siblings that cannot stay open.
        if namespace == Namespace::Html {
            loop {
                let closes = self.stack.last().is_some_and(|open| {
                    open.element.namespace == Namespace::Html
                        && CLOSED_BY_SIBLINGS
                            .get(open.element.name.as_str())
                            .is_some_and(|closers| closers.contains(event.name.as_str()))
                });
                if !closes {
                    break;
                }
                self.close_implicitly();
            }
        }

        let adjusted_name = match namespace {
            Namespace::Svg => SVG_ELEMENT_CASE
                .get(event.name.as_str())
                .map_or(event.name.clone(), |n| (*n).to_string()),
            _ => event.name.clone(),
        };

        let prior_expression = self.tokens.expression_enabled();
        let mut expression_changed = false;

        // Expression parsing turns on inside the SFC's root `<template>`.
        if self.sfc_mode
            && self.stack.is_empty()
            && event.name == "template"
            && event_attribute_value(&event, "lang").map_or(true, |lang| lang.is_empty() || lang == "html")
            && self.expression.is_some()
        {
            self.tokens.set_expression_enabled(true);
            expression_changed = true;
        }

        // A `v-pre` start tag freezes expression parsing for the subtree,
        // including its own remaining attributes.
        let starts_v_pre = !self.in_v_pre()
            && event
                .attributes
                .iter()
                .any(|attribute| attribute.key.value == "v-pre");
        if starts_v_pre {
            self.v_pre_depth = Some(self.stack.len());
            self.tokens.set_expression_enabled(false);
            expression_changed = true;
        }

        let mut variables: Vec<VariableHandle> = Vec::new();
        let attributes: Vec<VAttribute> = event
            .attributes
            .iter()
            .map(|attribute| self.process_attribute(attribute, &event.name, namespace, &mut variables))
            .collect();

        let start_tag = VStartTag {
            attributes,
            self_closing: event.self_closing,
            range: event.range,
            loc: event.loc,
        };
        let element = VElement {
            name: adjusted_name,
            raw_name: event.raw_name.clone(),
            namespace,
            start_tag,
            children: Vec::new(),
            end_tag: None,
            variables,
            range: event.range,
            loc: event.loc,
        };

        let is_void = namespace == Namespace::Html && VOID_ELEMENTS.contains(event.name.as_str());
        if event.self_closing && !is_void && namespace == Namespace::Html {
            self.report(
                ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus,
                event.range[0],
            );
        }
        if event.self_closing || is_void {
            if starts_v_pre {
                self.v_pre_depth = None;
            }
            if expression_changed {
                self.tokens.set_expression_enabled(prior_expression);
            }
            self.append_child(VNode::VElement(element));
            return;
        }

        let restore_expression = expression_changed.then_some(prior_expression);

        // Content model and namespace for the subtree.
        let lang = element.attribute_value("lang").map(|s| s.to_string());
        let lang_applies = self.stack.is_empty()
            || matches!(element.name.as_str(), "template" | "script" | "style");
        let model = content_model_of(
            &element.name,
            namespace,
            if lang_applies { lang.as_deref() } else { None },
        );
        self.tokens.set_namespace(namespace);
        if model != ContentModel::ParsableData {
            self.tokens.set_content_model(model, &event.name);
        }

        self.stack.push(OpenElement {
            element,
            restore_expression,
        });
    }

    /// HTML tree-construction dispatcher rules, reduced to what a template
    /// fragment can contain.
    fn detect_namespace(&mut self, event: &StartTagEvent) -> Namespace {
        let mut namespace = self.current_namespace();
        if let Some(open) = self.stack.last() {
            let parent = &open.element;
            if is_mathml_text_integration_point(parent.namespace, &parent.name)
                && event.name != "mglyph"
                && event.name != "malignmark"
            {
                namespace = Namespace::Html;
            }
            let encoding = parent.attribute_value("encoding");
            if is_html_integration_point(parent.namespace, &parent.name, encoding) {
                namespace = Namespace::Html;
            }
        }
        if namespace == Namespace::Html {
            if event.name == "svg" {
                namespace = Namespace::Svg;
            } else if event.name == "math" {
                namespace = Namespace::MathMl;
            }
        }
        if let Some(xmlns) = event
            .attributes
            .iter()
            .find(|attribute| attribute.key.value == "xmlns")
        {
            if let Some(value) = &xmlns.value {
                match Namespace::from_uri(&value.value) {
                    Some(declared) => namespace = declared,
                    None => self.report(ErrorCode::XInvalidNamespace, value.range[0]),
                }
            }
        }
        namespace
    }

    // ------------------------------------------------------------------
    // attributes
    // ------------------------------------------------------------------

    fn process_attribute(
        &mut self,
        attribute: &AttributeTokens,
        tag_name: &str,
        namespace: Namespace,
        variables: &mut Vec<VariableHandle>,
    ) -> VAttribute {
        let range = attribute.range();
        let loc = self.location_for(range);
        let key_token = &attribute.key;
        let raw_key = self.source_text[key_token.range[0]..key_token.range[1]].to_string();

        // `scope` carries a slot expression only on `<template>`; elsewhere
        // it is a real attribute (`<th scope="col">`).
        let is_directive = !self.in_v_pre()
            && (DIRECTIVE_NAME_RE.is_match(&key_token.value)
                || key_token.value == "slot-scope"
                || (key_token.value == "scope" && tag_name == "template"));

        if !is_directive {
            let adjusted = self.adjust_attribute_name(&key_token.value, namespace);
            let key = VIdentifier {
                name: adjusted,
                raw_name: raw_key,
                range: key_token.range,
                loc: key_token.loc,
            };
            let value = attribute.value.as_ref().map(|token| VLiteral {
                value: token.value.clone(),
                range: token.range,
                loc: token.loc,
            });
            return VAttribute::Plain(VPlainAttribute {
                directive: false,
                key,
                value,
                range,
                loc,
            });
        }

        let key = self.parse_directive_key(key_token);
        let kind = match key.name.as_str() {
            "for" => ExpressionKind::VFor,
            "on" => ExpressionKind::VOn,
            "slot-scope" | "scope" => ExpressionKind::SlotScope,
            _ => ExpressionKind::Standard,
        };
        let value = attribute
            .value
            .as_ref()
            .map(|token| self.build_expression_container(self.value_body_range(token), token.range, kind, variables));

        VAttribute::Directive(VDirectiveAttribute {
            directive: true,
            key,
            value,
            range,
            loc,
        })
    }

    fn adjust_attribute_name(&self, name: &str, namespace: Namespace) -> String {
        // Foreign attributes (xlink:, xml:, xmlns) keep their written form.
        if foreign_attribute_namespace(name).is_some() {
            return name.to_string();
        }
        match namespace {
            Namespace::Svg => SVG_ATTRIBUTE_CASE
                .get(name)
                .map_or(name.to_string(), |n| (*n).to_string()),
            Namespace::MathMl => MATHML_ATTRIBUTE_CASE
                .get(name)
                .map_or(name.to_string(), |n| (*n).to_string()),
            _ => name.to_string(),
        }
    }

    /// Quoted literals carry their quotes in the token range; the expression
    /// body sits inside them.
    fn value_body_range(&self, token: &Token) -> OffsetRange {
        let bytes = self.source_text.as_bytes();
        let first = bytes.get(token.range[0]);
        if matches!(first, Some(b'"') | Some(b'\'')) && token.range[1] - token.range[0] >= 2 {
            [token.range[0] + 1, token.range[1] - 1]
        } else {
            token.range
        }
    }

    /// Split a directive key into name, argument, and modifiers.
    fn parse_directive_key(&mut self, key_token: &Token) -> VDirectiveKey {
        let text = key_token.value.as_str();
        let base = key_token.range[0];
        let mut modifiers: Vec<String> = Vec::new();
        let mut shorthand = false;

        let (name, rest, rest_offset): (String, &str, usize) = if text == "slot-scope" || text == "scope" {
            (text.to_string(), "", text.len())
        } else if let Some(rest) = text.strip_prefix(':') {
            shorthand = true;
            ("bind".to_string(), rest, 1)
        } else if let Some(rest) = text.strip_prefix('@') {
            shorthand = true;
            ("on".to_string(), rest, 1)
        } else if let Some(rest) = text.strip_prefix('#') {
            shorthand = true;
            ("slot".to_string(), rest, 1)
        } else if let Some(rest) = text.strip_prefix('.') {
            shorthand = true;
            modifiers.push("prop".to_string());
            ("bind".to_string(), rest, 1)
        } else {
            // v-name[:argument][.modifiers]
            let body = &text[2..];
            let name_end = body.find([':', '.']).unwrap_or(body.len());
            let name = body[..name_end].to_string();
            let after = &body[name_end..];
            if let Some(rest) = after.strip_prefix(':') {
                (name, rest, 2 + name_end + 1)
            } else {
                (name, after, 2 + name_end)
            }
        };

        let mut argument = None;
        let mut modifier_text = rest;
        if !rest.is_empty() && !rest.starts_with('.') {
            if let Some(after_bracket) = rest.strip_prefix('[') {
                // Dynamic argument `[expr]`.
                let close = after_bracket.find(']').map(|i| i + 1);
                let end = close.unwrap_or(rest.len());
                let body_range = [base + rest_offset + 1, base + rest_offset + end];
                let container_range = [
                    base + rest_offset,
                    base + rest_offset + close.map_or(rest.len(), |c| c + 1),
                ];
                let mut no_variables = Vec::new();
                let container = self.build_expression_container(
                    body_range,
                    container_range,
                    ExpressionKind::Standard,
                    &mut no_variables,
                );
                argument = Some(VDirectiveArgument::Dynamic(container));
                modifier_text = &rest[close.map_or(rest.len(), |c| c + 1)..];
            } else {
                let end = rest.find('.').unwrap_or(rest.len());
                argument = Some(VDirectiveArgument::Static(rest[..end].to_string()));
                modifier_text = &rest[end..];
            }
        }
        for modifier in modifier_text.split('.').filter(|m| !m.is_empty()) {
            modifiers.push(modifier.to_string());
        }

        VDirectiveKey {
            name,
            argument,
            modifiers,
            shorthand,
            raw: text.to_string(),
            range: key_token.range,
            loc: key_token.loc,
        }
    }

    /// Parse an expression body and wrap it into a container; syntax errors
    /// are captured on the container and echoed into the error list.
    fn build_expression_container(
        &mut self,
        body_range: OffsetRange,
        container_range: OffsetRange,
        kind: ExpressionKind,
        variables: &mut Vec<VariableHandle>,
    ) -> VExpressionContainer {
        let loc = self.location_for(container_range);
        let Some(ctx) = self.expression.as_ref() else {
            return VExpressionContainer {
                expression: None,
                references: Vec::new(),
                syntax_error: None,
                range: container_range,
                loc,
            };
        };
        match ctx.transform(body_range, kind) {
            Ok(transformed) => {
                variables.extend(transformed.variables);
                VExpressionContainer {
                    expression: transformed.expression,
                    references: transformed.references,
                    syntax_error: None,
                    range: container_range,
                    loc,
                }
            }
            Err(error) => {
                self.errors.push(error.clone());
                VExpressionContainer {
                    expression: None,
                    references: Vec::new(),
                    syntax_error: Some(error),
                    range: container_range,
                    loc,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // end tags & implicit closing
    // ------------------------------------------------------------------

    fn process_end_tag(&mut self, event: EndTagEvent) {
        let Some(depth) = self
            .stack
            .iter()
            .rposition(|open| open.element.name.eq_ignore_ascii_case(&event.name))
        else {
            self.report(ErrorCode::XInvalidEndTag, event.range[0]);
            return;
        };
        while self.stack.len() > depth + 1 {
            self.close_implicitly();
        }
        let mut open = self.stack.pop().unwrap();
        open.element.end_tag = Some(VEndTag {
            range: event.range,
            loc: event.loc,
        });
        open.element.range[1] = event.range[1];
        open.element.loc.end = event.loc.end;
        self.finish_element(open);
    }

    /// Close the innermost element without a physical end tag; its range
    /// ends at its last child (or its start tag).
    fn close_implicitly(&mut self) {
        let Some(mut open) = self.stack.pop() else { return };
        let end = open
            .element
            .children
            .last()
            .map_or(open.element.start_tag.range[1], |child| child.range()[1]);
        open.element.range[1] = end;
        open.element.loc.end = self.line_index.position_for(end);
        self.finish_element(open);
    }

    fn finish_element(&mut self, open: OpenElement) {
        // Restore tokenizer context for the enclosing element.
        if self.v_pre_depth == Some(self.stack.len()) {
            self.v_pre_depth = None;
        }
        if let Some(previous) = open.restore_expression {
            self.tokens.set_expression_enabled(previous);
        }
        self.tokens.set_namespace(self.current_namespace());
        self.append_child(VNode::VElement(open.element));
    }

    // ------------------------------------------------------------------
    // text & mustaches
    // ------------------------------------------------------------------

    fn process_text(&mut self, event: TextEvent) {
        if event.value.is_empty() {
            return;
        }
        self.append_child(VNode::VText(VText {
            value: event.value,
            range: event.range,
            loc: event.loc,
        }));
    }

    fn process_mustache(&mut self, event: MustacheEvent) {
        let mut no_variables = Vec::new();
        let container = self.build_expression_container(
            event.value_range,
            event.range,
            ExpressionKind::Standard,
            &mut no_variables,
        );
        self.append_child(VNode::VExpressionContainer(container));
    }
}
