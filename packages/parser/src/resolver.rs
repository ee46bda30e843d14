//! Post-parse reference resolution.
//!
//! A single depth-first pass over the document fragment binds every
//! expression reference to the nearest ancestor element variable with the
//! same name. Nothing else is mutated; the links are weak back-pointers.

use crate::ast::nodes::*;

pub fn resolve_references(fragment: &mut VDocumentFragment) {
    let mut scope: Vec<VariableHandle> = Vec::new();
    for child in &mut fragment.children {
        resolve_node(child, &mut scope);
    }
}

/// Directives whose value declares the element's variables. Their own value
/// expression (the iterable, the scope parameter defaults) evaluates in the
/// enclosing scope, before those variables exist.
fn introduces_variables(directive_name: &str) -> bool {
    matches!(directive_name, "for" | "slot-scope" | "scope")
}

fn resolve_node(node: &mut VNode, scope: &mut Vec<VariableHandle>) {
    match node {
        VNode::VElement(element) => {
            let base = scope.len();
            // `v-for="x in x"` must not bind its iterable to its own alias.
            for attribute in &mut element.start_tag.attributes {
                if let VAttribute::Directive(directive) = attribute {
                    if introduces_variables(&directive.key.name) {
                        if let Some(container) = &mut directive.value {
                            resolve_container(container, scope);
                        }
                    }
                }
            }
            // Sibling directives (`:key="item.id"`) and children do see the
            // element's own variables.
            scope.extend(element.variables.iter().cloned());
            for attribute in &mut element.start_tag.attributes {
                if let VAttribute::Directive(directive) = attribute {
                    if let Some(VDirectiveArgument::Dynamic(container)) = &mut directive.key.argument {
                        resolve_container(container, scope);
                    }
                    if !introduces_variables(&directive.key.name) {
                        if let Some(container) = &mut directive.value {
                            resolve_container(container, scope);
                        }
                    }
                }
            }
            for child in &mut element.children {
                resolve_node(child, scope);
            }
            scope.truncate(base);
        }
        VNode::VExpressionContainer(container) => resolve_container(container, scope),
        VNode::VText(_) => {}
    }
}

fn resolve_container(container: &mut VExpressionContainer, scope: &[VariableHandle]) {
    for reference in &mut container.references {
        let Some(variable) = scope
            .iter()
            .rev()
            .find(|variable| variable.name() == reference.id.name)
        else {
            continue;
        };
        reference.variable = Some(variable.downgrade());
        variable.0.borrow_mut().references.push(ResolvedReference {
            id: reference.id.clone(),
            mode: reference.mode,
        });
    }
}
