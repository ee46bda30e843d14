//! Script-block integration: slicing, coordinate preservation, synthetic
//! tag tokens, and the plain-script (non-SFC) path.

use sfc_parser::ast::es::{SourceType, Statement};
use sfc_parser::{parse_for_analysis, ParserOptions, ScriptParserChoice};

fn sfc_options() -> ParserOptions {
    ParserOptions {
        file_path: Some("component.vue".to_string()),
        ..ParserOptions::default()
    }
}

mod sfc_scripts {
    use super::*;

    #[test]
    fn empty_script_has_empty_body_and_tag_bounded_range() {
        let source = "<script></script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        assert!(result.ast.body.is_empty());
        assert_eq!(result.ast.range, [8, 8]);
    }

    #[test]
    fn script_nodes_are_in_original_coordinates() {
        let source = "<template><p>x</p></template>\n<script>\nlet answer = 42\n</script>\n";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        assert_eq!(result.ast.body.len(), 1);
        let Statement::VariableDeclaration(decl) = &result.ast.body[0] else {
            panic!("expected declaration");
        };
        assert_eq!(&source[decl.range[0]..decl.range[1]], "let answer = 42");
        assert_eq!(decl.loc.start.line, 3);
        assert_eq!(decl.loc.start.column, 0);
    }

    #[test]
    fn synthetic_script_tag_tokens_bracket_the_stream() {
        let source = "<script>let a = 1</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        let first = result.tokens.first().expect("tokens");
        let last = result.tokens.last().expect("tokens");
        assert_eq!(first.value, "<script>");
        assert_eq!(first.range, [0, 8]);
        assert_eq!(last.value, "</script>");
        assert_eq!(last.range, [17, 26]);
    }

    #[test]
    fn template_body_is_attached() {
        let source = "<template><p>{{ m }}</p></template><script>let m = 1</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        let template = result.ast.template_body.as_ref().expect("template body");
        assert_eq!(template.name, "template");
        assert!(!template.children.is_empty());
    }

    #[test]
    fn script_errors_are_fatal_with_original_coordinates() {
        let source = "<script>\nlet = broken\n</script>";
        let error = parse_for_analysis(source, &sfc_options()).unwrap_err();
        assert_eq!(error.line_number, 2);
    }

    #[test]
    fn comments_are_collected() {
        let source = "<script>// note\nlet a = 1 /* block */</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        assert_eq!(result.comments.len(), 2);
        assert_eq!(result.comments[0].value, " note");
        assert_eq!(result.comments[1].value, " block ");
    }

    #[test]
    fn parser_false_skips_script_parsing() {
        let source = "<script>not ~~ valid</script>";
        let options = ParserOptions {
            parser: ScriptParserChoice::None,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        assert!(result.ast.body.is_empty());
    }

    #[test]
    fn scope_manager_is_returned_on_request() {
        let source = "<script>let a = 1\na + b</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        assert!(manager.top_scope().variables.contains_key("a"));
        let unresolved: Vec<_> = manager.unresolved().iter().map(|r| r.id.name.clone()).collect();
        assert_eq!(unresolved, vec!["b"]);
    }
}

mod plain_scripts {
    use super::*;

    #[test]
    fn non_vue_files_parse_as_plain_scripts() {
        let source = "let x = 1";
        let options = ParserOptions {
            file_path: Some("file.js".to_string()),
            ..ParserOptions::default()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        assert!(result.document.is_none());
        assert!(result.ast.template_body.is_none());
        assert_eq!(result.ast.body.len(), 1);
    }

    #[test]
    fn source_type_module_allows_imports() {
        let source = "import x from \"y\"";
        let options = ParserOptions {
            file_path: Some("file.js".to_string()),
            source_type: Some(SourceType::Module),
            ..ParserOptions::default()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        assert!(result.ast.body[0].is_import());
    }

    #[test]
    fn imports_in_script_source_type_fail() {
        let source = "import x from \"y\"";
        let options = ParserOptions {
            file_path: Some("file.js".to_string()),
            ..ParserOptions::default()
        };
        assert!(parse_for_analysis(source, &options).is_err());
    }
}

mod determinism {
    use super::*;

    #[test]
    fn parsing_twice_yields_identical_serialized_asts() {
        let source = "<template><div v-for=\"x in xs\">{{ x }}</div></template><script>let xs = []</script>";
        let a = parse_for_analysis(source, &sfc_options()).expect("parse");
        let b = parse_for_analysis(source, &sfc_options()).expect("parse");
        let ser_a = serde_json::to_string(&a.ast).expect("serialize");
        let ser_b = serde_json::to_string(&b.ast).expect("serialize");
        assert_eq!(ser_a, ser_b);
    }
}
