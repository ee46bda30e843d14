//! Directive-expression transformer tests: iteration heads, handler
//! expressions, slot scopes, and entity-gap offset restoration.

use std::rc::Rc;

use sfc_parser::ast::es;
use sfc_parser::ast::nodes::*;
use sfc_parser::line_index::LineIndex;
use sfc_parser::script::es_parser::EsParserOptions;
use sfc_parser::script::expression::{ExpressionContext, ExpressionKind};
use sfc_parser::script::BundledScriptParser;
use sfc_parser::{parse_template_fragment, ParserOptions};

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

mod iteration {
    use super::*;

    #[test]
    fn v_for_with_parenthesized_aliases() {
        let source = "<div v-for=\"(a, i) of items\">{{a}}</div>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let div = first_element(&doc);

        let names: Vec<(String, VariableKind)> = div
            .variables
            .iter()
            .map(|v| (v.name(), v.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a".to_string(), VariableKind::VFor),
                ("i".to_string(), VariableKind::VFor),
            ]
        );

        let container = div.directive("for").unwrap().value.as_ref().unwrap();
        let Some(ContainerExpression::VForExpression(for_expr)) = &container.expression else {
            panic!("expected VForExpression");
        };
        assert_eq!(for_expr.left.len(), 2);
        let es::Expression::Identifier(right) = &for_expr.right else {
            panic!("expected identifier iterable");
        };
        assert_eq!(right.name, "items");
        assert_eq!(&source[right.range[0]..right.range[1]], "items");

        // Aliases left the reference list; the iterable did not.
        let reference_names: Vec<_> = container.references.iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(reference_names, vec!["items"]);
    }

    #[test]
    fn v_for_single_alias_wraps_into_a_list() {
        let source = "<li v-for=\"item in list\"></li>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let li = first_element(&doc);
        let container = li.directive("for").unwrap().value.as_ref().unwrap();
        let Some(ContainerExpression::VForExpression(for_expr)) = &container.expression else {
            panic!();
        };
        assert_eq!(for_expr.left.len(), 1);
        assert!(matches!(for_expr.left[0], es::Pattern::Identifier(_)));
        assert_eq!(li.variables.len(), 1);
        assert_eq!(li.variables[0].name(), "item");
    }

    #[test]
    fn v_for_destructured_alias() {
        let source = "<li v-for=\"{ id, name } of rows\"></li>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let li = first_element(&doc);
        let names: Vec<_> = li.variables.iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }
}

mod handlers {
    use super::*;

    #[test]
    fn dollar_event_is_elided_from_references() {
        let source = "<button @click=\"foo($event)\"></button>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let button = first_element(&doc);
        let container = button.directive("on").unwrap().value.as_ref().unwrap();
        let names: Vec<_> = container.references.iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["foo"]);
    }

    #[test]
    fn assignment_handlers_report_write_mode() {
        let source = "<button @click=\"visible = false\"></button>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let button = first_element(&doc);
        let container = button.directive("on").unwrap().value.as_ref().unwrap();
        assert_eq!(container.references.len(), 1);
        assert_eq!(container.references[0].mode, ReferenceMode::Write);
    }
}

mod slot_scope {
    use super::*;

    #[test]
    fn slot_scope_introduces_scope_variables() {
        let source = "<template slot-scope=\"{ row }\"></template>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let template = first_element(&doc);
        assert_eq!(template.variables.len(), 1);
        assert_eq!(template.variables[0].name(), "row");
        assert_eq!(template.variables[0].kind(), VariableKind::Scope);

        let container = template.directive("slot-scope").unwrap().value.as_ref().unwrap();
        assert!(matches!(
            container.expression,
            Some(ContainerExpression::VSlotScopeExpression(_))
        ));
    }
}

mod entity_gaps {
    use super::*;

    #[test]
    fn operator_spans_the_original_entity_bytes() {
        // Equivalent of parsing `{{ x &amp;&amp; y }}`: the mustache body
        // starts at offset 2 of this synthetic template.
        let source = "{{ x &amp;&amp; y }}";
        let line_index = Rc::new(LineIndex::from_source(source));
        let parser = BundledScriptParser;
        let ctx = ExpressionContext {
            source,
            line_index,
            parser: &parser,
            options: EsParserOptions::default(),
        };
        let body = [2, source.len() - 2];
        let result = ctx.transform(body, ExpressionKind::Standard).expect("parse");

        let Some(ContainerExpression::Expression(es::Expression::LogicalExpression(logical))) =
            &result.expression
        else {
            panic!("expected logical expression");
        };
        assert_eq!(logical.operator, "&&");
        // `x` and `y` sit at their original offsets.
        assert_eq!(&source[logical.left.range()[0]..logical.left.range()[1]], "x");
        assert_eq!(&source[logical.right.range()[0]..logical.right.range()[1]], "y");

        // The operator token covers the full `&amp;&amp;` byte span and its
        // value is the decoded form.
        let op = result
            .tokens
            .iter()
            .find(|t| t.value == "&&")
            .expect("operator token");
        assert_eq!(&source[op.range[0]..op.range[1]], "&amp;&amp;");
    }

    #[test]
    fn mustache_with_entities_parses_in_a_full_template() {
        let source = "<p>{{ x &amp;&amp; y }}</p>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let p = first_element(&doc);
        let VNode::VExpressionContainer(container) = &p.children[0] else {
            panic!()
        };
        let Some(ContainerExpression::Expression(es::Expression::LogicalExpression(logical))) =
            &container.expression
        else {
            panic!("expected logical expression, got {:?}", container.expression);
        };
        assert_eq!(logical.operator, "&&");
        let names: Vec<_> = container.references.iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}

mod locations {
    use super::*;

    #[test]
    fn expression_nodes_point_at_the_original_source() {
        let source = "<p>\n  {{ value }}\n</p>";
        let doc = parse_template_fragment(source, &ParserOptions::default());
        let p = first_element(&doc);
        let container = p
            .children
            .iter()
            .find_map(|c| match c {
                VNode::VExpressionContainer(c) => Some(c),
                _ => None,
            })
            .unwrap();
        let Some(ContainerExpression::Expression(es::Expression::Identifier(id))) =
            &container.expression
        else {
            panic!();
        };
        assert_eq!(&source[id.range[0]..id.range[1]], "value");
        assert_eq!(id.loc.start.line, 2);
        assert_eq!(id.loc.start.column, 5);
    }
}
