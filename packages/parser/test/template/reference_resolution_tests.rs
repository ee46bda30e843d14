//! Reference resolution over the template: ancestor variable lookup,
//! shadowing, and the unresolved fallthrough.

use sfc_parser::ast::nodes::*;
use sfc_parser::{parse_template_fragment, ParserOptions};

fn fragment(source: &str) -> VDocumentFragment {
    parse_template_fragment(source, &ParserOptions::default())
}

fn first_element(fragment: &VDocumentFragment) -> &VElement {
    fragment
        .children
        .iter()
        .find_map(|child| match child {
            VNode::VElement(element) => Some(element),
            _ => None,
        })
        .expect("no element")
}

fn mustache_container(element: &VElement) -> &VExpressionContainer {
    element
        .children
        .iter()
        .find_map(|child| match child {
            VNode::VExpressionContainer(container) => Some(container),
            _ => None,
        })
        .expect("no mustache")
}

#[test]
fn mustache_resolves_to_the_iteration_variable() {
    let doc = fragment("<div v-for=\"(a, i) of items\">{{a}}</div>");
    let div = first_element(&doc);
    let container = mustache_container(div);
    assert_eq!(container.references.len(), 1);
    let reference = &container.references[0];
    let variable = reference.resolved_variable().expect("resolved");
    assert_eq!(variable.borrow().id.name, "a");
    assert_eq!(variable.borrow().kind, VariableKind::VFor);
    // The variable records the reference back.
    assert_eq!(variable.borrow().references.len(), 1);
    assert_eq!(variable.borrow().references[0].id.name, "a");
}

#[test]
fn iterable_reference_stays_unresolved() {
    let doc = fragment("<div v-for=\"(a, i) of items\">{{a}}</div>");
    let div = first_element(&doc);
    let container = div.directive("for").unwrap().value.as_ref().unwrap();
    let items = &container.references[0];
    assert_eq!(items.id.name, "items");
    assert!(items.resolved_variable().is_none());
}

#[test]
fn sibling_directives_see_the_same_elements_variables() {
    let doc = fragment("<li v-for=\"item in list\" :key=\"item.id\"></li>");
    let li = first_element(&doc);
    let bind = li.directive("bind").unwrap().value.as_ref().unwrap();
    assert_eq!(bind.references.len(), 1);
    let reference = &bind.references[0];
    assert_eq!(reference.id.name, "item");
    assert!(reference.resolved_variable().is_some());
}

#[test]
fn inner_variables_shadow_outer_ones() {
    let doc = fragment("<ul v-for=\"x in xs\">{{x}}<li v-for=\"x in ys\">{{x}}</li></ul>");
    let ul = first_element(&doc);
    let outer = mustache_container(ul);
    let outer_resolved = outer.references[0].resolved_variable().expect("resolved");
    assert!(std::rc::Rc::ptr_eq(&outer_resolved, &ul.variables[0].0));

    let VNode::VElement(li) = ul
        .children
        .iter()
        .find(|c| matches!(c, VNode::VElement(_)))
        .unwrap()
    else {
        panic!()
    };
    let inner = mustache_container(li);
    let inner_resolved = inner.references[0].resolved_variable().expect("resolved");
    assert!(std::rc::Rc::ptr_eq(&inner_resolved, &li.variables[0].0));
    assert!(!std::rc::Rc::ptr_eq(&inner_resolved, &ul.variables[0].0));
}

#[test]
fn iterable_does_not_bind_to_its_own_alias() {
    // `x in x`: the right-hand side evaluates before the alias exists.
    let doc = fragment("<div v-for=\"x in x\">{{x}}</div>");
    let div = first_element(&doc);
    let container = div.directive("for").unwrap().value.as_ref().unwrap();
    assert_eq!(container.references.len(), 1);
    assert_eq!(container.references[0].id.name, "x");
    assert!(container.references[0].resolved_variable().is_none());
    // The mustache, by contrast, does bind to the alias.
    let mustache = mustache_container(div);
    assert!(mustache.references[0].resolved_variable().is_some());
}

#[test]
fn inner_iterable_resolves_to_the_outer_alias() {
    let doc = fragment("<ul v-for=\"x in xs\"><li v-for=\"x in x.children\">{{x}}</li></ul>");
    let ul = first_element(&doc);
    let VNode::VElement(li) = ul
        .children
        .iter()
        .find(|c| matches!(c, VNode::VElement(_)))
        .unwrap()
    else {
        panic!()
    };
    // `x.children` sees the outer loop variable, not the inner alias it is
    // about to introduce.
    let inner_for = li.directive("for").unwrap().value.as_ref().unwrap();
    let iterable = inner_for.references[0].resolved_variable().expect("resolved");
    assert!(std::rc::Rc::ptr_eq(&iterable, &ul.variables[0].0));
    // The inner subtree is shadowed by the inner alias.
    let mustache = mustache_container(li);
    let resolved = mustache.references[0].resolved_variable().expect("resolved");
    assert!(std::rc::Rc::ptr_eq(&resolved, &li.variables[0].0));
}

#[test]
fn references_outside_any_variable_scope_are_free() {
    let doc = fragment("<p>{{ unbound }}</p>");
    let p = first_element(&doc);
    let container = mustache_container(p);
    assert!(container.references[0].resolved_variable().is_none());
}

#[test]
fn scope_variables_resolve_in_children() {
    let doc = fragment("<template slot-scope=\"{ row }\"><span>{{ row.id }}</span></template>");
    let template = first_element(&doc);
    let VNode::VElement(span) = template
        .children
        .iter()
        .find(|c| matches!(c, VNode::VElement(_)))
        .unwrap()
    else {
        panic!()
    };
    let container = mustache_container(span);
    let resolved = container.references[0].resolved_variable().expect("resolved");
    assert_eq!(resolved.borrow().kind, VariableKind::Scope);
}

#[test]
fn every_matching_reference_is_resolved() {
    let doc = fragment("<div v-for=\"v in vs\">{{ v }}<span>{{ v }}{{ other }}</span></div>");
    let div = first_element(&doc);
    let mut resolved = 0;
    let mut free = 0;
    count_references(&div.children, &mut resolved, &mut free);
    assert_eq!(resolved, 2);
    assert_eq!(free, 1);
}

fn count_references(children: &[VNode], resolved: &mut usize, free: &mut usize) {
    for child in children {
        match child {
            VNode::VExpressionContainer(container) => {
                for reference in &container.references {
                    if reference.resolved_variable().is_some() {
                        *resolved += 1;
                    } else {
                        *free += 1;
                    }
                }
            }
            VNode::VElement(element) => count_references(&element.children, resolved, free),
            VNode::VText(_) => {}
        }
    }
}
