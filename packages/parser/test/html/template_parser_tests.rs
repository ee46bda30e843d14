//! Template parser tests: element stack behavior, namespaces, implicit
//! closing, directives, and error recovery.

use sfc_parser::ast::nodes::*;
use sfc_parser::html::Namespace;
use sfc_parser::location::ErrorCode;
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

mod tree_shape {
    use super::*;

    #[test]
    fn builds_nested_elements() {
        let doc = fragment("<div><span>a</span></div>");
        let div = first_element(&doc);
        assert_eq!(div.name, "div");
        assert_eq!(div.children.len(), 1);
        let VNode::VElement(span) = &div.children[0] else {
            panic!("expected span");
        };
        assert_eq!(span.name, "span");
        let VNode::VText(text) = &span.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.value, "a");
    }

    #[test]
    fn child_ranges_nest_inside_parent_ranges() {
        let doc = fragment("<div><span>a</span><b>c</b></div>");
        let div = first_element(&doc);
        for child in &div.children {
            assert!(child.range()[0] >= div.range[0]);
            assert!(child.range()[1] <= div.range[1]);
        }
        // Siblings are ordered and do not overlap.
        for pair in div.children.windows(2) {
            assert!(pair[0].range()[1] <= pair[1].range()[0]);
        }
    }

    #[test]
    fn physical_end_tag_is_recorded() {
        let source = "<div>x</div>";
        let doc = fragment(source);
        let div = first_element(&doc);
        let end_tag = div.end_tag.as_ref().expect("end tag");
        assert_eq!(&source[end_tag.range[0]..end_tag.range[1]], "</div>");
        assert_eq!(div.range, [0, source.len()]);
    }

    #[test]
    fn unclosed_element_ends_at_last_child() {
        let source = "<div><span>a</span>";
        let doc = fragment(source);
        let div = first_element(&doc);
        assert!(div.end_tag.is_none());
        assert_eq!(div.range[1], div.children.last().unwrap().range()[1]);
    }

    #[test]
    fn text_entities_are_decoded() {
        let doc = fragment("<p>a &amp; b</p>");
        let p = first_element(&doc);
        let VNode::VText(text) = &p.children[0] else { panic!() };
        assert_eq!(text.value, "a & b");
    }

    #[test]
    fn comments_are_kept_out_of_the_tree() {
        let doc = fragment("<div><!-- note -->x</div>");
        let div = first_element(&doc);
        assert_eq!(div.children.len(), 1);
        assert_eq!(doc.comments.len(), 1);
        assert_eq!(doc.comments[0].value, " note ");
    }
}

mod implicit_close {
    use super::*;

    #[test]
    fn p_is_closed_by_a_block_sibling() {
        let doc = fragment("<div><p>a<div>b</div></div>");
        let outer = first_element(&doc);
        assert_eq!(outer.children.len(), 2);
        let VNode::VElement(p) = &outer.children[0] else { panic!() };
        assert_eq!(p.name, "p");
        assert!(p.end_tag.is_none());
        let VNode::VElement(inner) = &outer.children[1] else { panic!() };
        assert_eq!(inner.name, "div");
    }

    #[test]
    fn li_closes_a_preceding_li() {
        let doc = fragment("<ul><li>a<li>b</ul>");
        let ul = first_element(&doc);
        let items: Vec<_> = ul
            .children
            .iter()
            .filter_map(|c| match c {
                VNode::VElement(e) if e.name == "li" => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].end_tag.is_none());
    }

    #[test]
    fn dt_dd_alternate() {
        let doc = fragment("<dl><dt>t<dd>d</dl>");
        let dl = first_element(&doc);
        let names: Vec<_> = dl
            .children
            .iter()
            .filter_map(|c| match c {
                VNode::VElement(e) => Some(e.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["dt", "dd"]);
    }
}

mod end_tags {
    use super::*;

    #[test]
    fn unmatched_end_tag_is_reported_and_discarded() {
        let doc = fragment("<div></span></div>");
        assert!(doc.errors.iter().any(|e| e.code == ErrorCode::XInvalidEndTag));
        let div = first_element(&doc);
        assert!(div.end_tag.is_some());
    }

    #[test]
    fn end_tag_closes_intervening_elements() {
        let doc = fragment("<div><span><b>x</div>");
        let div = first_element(&doc);
        assert!(div.end_tag.is_some());
        let VNode::VElement(span) = &div.children[0] else { panic!() };
        assert!(span.end_tag.is_none());
    }
}

mod self_closing {
    use super::*;

    #[test]
    fn void_elements_do_not_nest() {
        let doc = fragment("<div><br>x</div>");
        let div = first_element(&doc);
        assert_eq!(div.children.len(), 2);
        let VNode::VElement(br) = &div.children[0] else { panic!() };
        assert_eq!(br.name, "br");
        assert!(br.children.is_empty());
    }

    #[test]
    fn self_closing_non_void_html_element_is_reported_but_honored() {
        let doc = fragment("<div/><span>x</span>");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus));
        // The div did not swallow the span.
        assert_eq!(doc.children.len(), 2);
    }

    #[test]
    fn self_closing_is_fine_in_svg() {
        let doc = fragment("<svg><rect/></svg>");
        assert!(!doc
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::NonVoidHtmlElementStartTagWithTrailingSolidus));
    }
}

mod namespaces {
    use super::*;

    #[test]
    fn svg_subtree_gets_the_svg_namespace() {
        let doc = fragment("<svg><circle r=\"1\"/></svg>");
        let svg = first_element(&doc);
        assert_eq!(svg.namespace, Namespace::Svg);
        let VNode::VElement(circle) = &svg.children[0] else { panic!() };
        assert_eq!(circle.namespace, Namespace::Svg);
    }

    #[test]
    fn svg_element_names_restore_case() {
        let doc = fragment("<svg><foreignobject></foreignobject></svg>");
        let svg = first_element(&doc);
        let VNode::VElement(fo) = &svg.children[0] else { panic!() };
        assert_eq!(fo.name, "foreignObject");
        assert_eq!(fo.raw_name, "foreignobject");
    }

    #[test]
    fn svg_attribute_names_restore_case() {
        let doc = fragment("<svg viewbox=\"0 0 1 1\"></svg>");
        let svg = first_element(&doc);
        let VAttribute::Plain(attribute) = &svg.start_tag.attributes[0] else {
            panic!()
        };
        assert_eq!(attribute.key.name, "viewBox");
        assert_eq!(attribute.key.raw_name, "viewbox");
    }

    #[test]
    fn html_resumes_inside_foreign_object() {
        let doc = fragment("<svg><foreignObject><div></div></foreignObject></svg>");
        let svg = first_element(&doc);
        let VNode::VElement(fo) = &svg.children[0] else { panic!() };
        let VNode::VElement(div) = &fo.children[0] else { panic!() };
        assert_eq!(div.namespace, Namespace::Html);
    }

    #[test]
    fn math_subtree_gets_the_mathml_namespace() {
        let doc = fragment("<math><mi>x</mi></math>");
        let math = first_element(&doc);
        assert_eq!(math.namespace, Namespace::MathMl);
    }

    #[test]
    fn invalid_xmlns_is_reported() {
        let doc = fragment("<div xmlns=\"urn:nope\"></div>");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::XInvalidNamespace));
    }
}

mod attributes_and_directives {
    use super::*;

    #[test]
    fn duplicate_attribute_keeps_the_first() {
        let doc = fragment("<div a=\"1\" a=\"2\"></div>");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::DuplicateAttribute));
        let div = first_element(&doc);
        assert_eq!(div.start_tag.attributes.len(), 1);
        assert_eq!(div.attribute_value("a"), Some("1"));
    }

    #[test]
    fn plain_attributes_have_decoded_literal_values() {
        let doc = fragment("<a title=\"x &gt; y\"></a>");
        let a = first_element(&doc);
        assert_eq!(a.attribute_value("title"), Some("x > y"));
    }

    #[test]
    fn directive_key_shapes() {
        let doc = fragment("<div v-on:click.stop=\"f\" :src=\"s\" @go=\"g\" #head=\"h\" v-if=\"c\"></div>");
        let div = first_element(&doc);
        let directives: Vec<&VDirectiveAttribute> = div
            .start_tag
            .attributes
            .iter()
            .filter_map(|a| match a {
                VAttribute::Directive(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(directives.len(), 5);

        let on = &directives[0].key;
        assert_eq!(on.name, "on");
        assert!(matches!(on.argument, Some(VDirectiveArgument::Static(ref s)) if s == "click"));
        assert_eq!(on.modifiers, vec!["stop"]);
        assert!(!on.shorthand);

        let bind = &directives[1].key;
        assert_eq!(bind.name, "bind");
        assert!(bind.shorthand);
        assert!(matches!(bind.argument, Some(VDirectiveArgument::Static(ref s)) if s == "src"));

        let at = &directives[2].key;
        assert_eq!(at.name, "on");
        assert!(at.shorthand);

        let slot = &directives[3].key;
        assert_eq!(slot.name, "slot");
        assert!(slot.shorthand);

        let cond = &directives[4].key;
        assert_eq!(cond.name, "if");
        assert!(cond.argument.is_none());
        assert!(cond.modifiers.is_empty());
    }

    #[test]
    fn directive_without_value_has_no_container() {
        let doc = fragment("<div v-else></div>");
        let div = first_element(&doc);
        let directive = div.directive("else").expect("v-else");
        assert!(directive.value.is_none());
    }

    #[test]
    fn directive_with_empty_value_yields_no_expression() {
        let doc = fragment("<div v-if=\"\"></div>");
        let div = first_element(&doc);
        let directive = div.directive("if").expect("v-if");
        let container = directive.value.as_ref().expect("container");
        assert!(container.expression.is_none());
        assert!(container.references.is_empty());
        assert!(container.syntax_error.is_none());
    }

    #[test]
    fn broken_expression_is_captured_not_propagated() {
        let doc = fragment("<div v-if=\"a +\"></div>");
        let div = first_element(&doc);
        let container = div.directive("if").unwrap().value.as_ref().unwrap();
        assert!(container.syntax_error.is_some());
        assert!(container.expression.is_none());
        assert!(doc
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::XExpressionError));
    }

    #[test]
    fn dynamic_directive_argument_parses_as_expression() {
        let doc = fragment("<div v-bind:[name]=\"v\"></div>");
        let div = first_element(&doc);
        let directive = div.directive("bind").unwrap();
        let Some(VDirectiveArgument::Dynamic(container)) = &directive.key.argument else {
            panic!("expected dynamic argument");
        };
        assert_eq!(container.references.len(), 1);
        assert_eq!(container.references[0].id.name, "name");
    }
}

mod v_pre {
    use super::*;

    #[test]
    fn mustaches_under_v_pre_are_plain_text() {
        let doc = fragment("<div v-pre>{{ x }}</div>");
        let div = first_element(&doc);
        assert_eq!(div.children.len(), 1);
        let VNode::VText(text) = &div.children[0] else {
            panic!("expected text, got {:?}", div.children[0]);
        };
        assert_eq!(text.value, "{{ x }}");
    }

    #[test]
    fn attributes_under_v_pre_stay_plain() {
        let doc = fragment("<div v-pre v-if=\"x\"></div>");
        let div = first_element(&doc);
        assert!(div.start_tag.attributes.iter().all(|a| !a.is_directive()));
    }

    #[test]
    fn expression_parsing_resumes_after_the_subtree() {
        let doc = fragment("<div><span v-pre>{{ a }}</span>{{ b }}</div>");
        let div = first_element(&doc);
        let VNode::VElement(span) = &div.children[0] else { panic!() };
        assert!(matches!(span.children[0], VNode::VText(_)));
        assert!(matches!(div.children[1], VNode::VExpressionContainer(_)));
    }
}

mod mustaches {
    use super::*;

    #[test]
    fn mustache_produces_an_expression_container() {
        let source = "<p>{{ msg }}</p>";
        let doc = fragment(source);
        let p = first_element(&doc);
        let VNode::VExpressionContainer(container) = &p.children[0] else {
            panic!()
        };
        assert_eq!(&source[container.range[0]..container.range[1]], "{{ msg }}");
        assert_eq!(container.references.len(), 1);
        assert_eq!(container.references[0].id.name, "msg");
    }

    #[test]
    fn text_interleaves_with_mustaches() {
        let doc = fragment("<p>a {{ b }} c</p>");
        let p = first_element(&doc);
        assert_eq!(p.children.len(), 3);
        assert!(matches!(p.children[0], VNode::VText(_)));
        assert!(matches!(p.children[1], VNode::VExpressionContainer(_)));
        assert!(matches!(p.children[2], VNode::VText(_)));
    }
}
