//! Template traversal for downstream analyzers.

use crate::ast::nodes::*;

/// Visitor over template nodes. Callbacks fire on entry; the walker handles
/// recursion.
pub trait TemplateVisitor {
    fn visit_element(&mut self, _element: &VElement) {}
    fn visit_text(&mut self, _text: &VText) {}
    fn visit_expression_container(&mut self, _container: &VExpressionContainer) {}
    fn visit_attribute(&mut self, _attribute: &VAttribute) {}
}

pub fn walk_fragment(fragment: &VDocumentFragment, visitor: &mut dyn TemplateVisitor) {
    for child in &fragment.children {
        walk_node(child, visitor);
    }
}

pub fn walk_node(node: &VNode, visitor: &mut dyn TemplateVisitor) {
    match node {
        VNode::VElement(element) => walk_element(element, visitor),
        VNode::VText(text) => visitor.visit_text(text),
        VNode::VExpressionContainer(container) => visitor.visit_expression_container(container),
    }
}

pub fn walk_element(element: &VElement, visitor: &mut dyn TemplateVisitor) {
    visitor.visit_element(element);
    for attribute in &element.start_tag.attributes {
        visitor.visit_attribute(attribute);
        if let VAttribute::Directive(directive) = attribute {
            if let Some(VDirectiveArgument::Dynamic(container)) = &directive.key.argument {
                visitor.visit_expression_container(container);
            }
            if let Some(container) = &directive.value {
                visitor.visit_expression_container(container);
            }
        }
    }
    for child in &element.children {
        walk_node(child, visitor);
    }
}
