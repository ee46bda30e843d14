//! `<script setup>` reconstruction: statement ordering, offset remapping,
//! synthetic-punctuator scrubbing, version raising, and scope merging.

use sfc_parser::ast::es::{Expression, SourceType, Statement};
use sfc_parser::{parse_for_analysis, EcmaVersion, ParserOptions};

fn sfc_options() -> ParserOptions {
    ParserOptions {
        file_path: Some("component.vue".to_string()),
        ..ParserOptions::default()
    }
}

fn statement_slices<'a>(source: &'a str, body: &[Statement]) -> Vec<&'a str> {
    body.iter()
        .map(|statement| {
            let range = statement.range();
            &source[range[0]..range[1]]
        })
        .collect()
}

mod reconstruction {
    use super::*;

    #[test]
    fn plain_then_imports_then_setup_statements() {
        let source = "<script>export let a = 1</script><script setup>import M from \"m\"\nlet b = 2</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        assert_eq!(result.ast.source_type, SourceType::Module);
        assert_eq!(
            statement_slices(source, &result.ast.body),
            vec!["export let a = 1", "import M from \"m\"", "let b = 2"]
        );
    }

    #[test]
    fn no_node_carries_a_synthetic_punctuator() {
        // Every node's byte span must reproduce original text exactly; a
        // leaked synthetic `;`/`{`/`}` would show up as a trailing
        // character that is not in the source at that offset.
        let source = "<script>export let a = 1</script><script setup>import M from \"m\"\nlet b = 2</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        for statement in &result.ast.body {
            let range = statement.range();
            let text = &source[range[0]..range[1]];
            assert!(!text.ends_with(';'));
            assert!(!text.ends_with('{'));
            assert!(!text.ends_with('}'));
        }
        for token in &result.tokens {
            assert!(token.range[0] < token.range[1]);
            assert!(token.range[1] <= source.len());
        }
    }

    #[test]
    fn setup_only_script_is_a_module() {
        let source = "<script setup>import M from \"m\"\nlet c = M</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        assert_eq!(result.ast.source_type, SourceType::Module);
        assert_eq!(
            statement_slices(source, &result.ast.body),
            vec!["import M from \"m\"", "let c = M"]
        );
    }

    #[test]
    fn setup_statements_keep_their_original_locations() {
        let source = "<script>let a = 1</script>\n<script setup>\nlet b = 2\n</script>";
        let result = parse_for_analysis(source, &sfc_options()).expect("parse");
        let Statement::VariableDeclaration(b_decl) = &result.ast.body[1] else {
            panic!("expected declaration");
        };
        assert_eq!(&source[b_decl.range[0]..b_decl.range[1]], "let b = 2");
        assert_eq!(b_decl.loc.start.line, 3);
    }

    #[test]
    fn reconstruction_errors_are_remapped_to_the_original_file() {
        let source = "<script>let a = 1</script><script setup>\nlet ( = 2\n</script>";
        let error = parse_for_analysis(source, &sfc_options()).unwrap_err();
        assert_eq!(error.line_number, 2);
    }
}

mod top_level_await {
    use super::*;

    use std::rc::Rc;

    use sfc_parser::line_index::LineIndex;
    use sfc_parser::script::es_parser::EsParserOptions;
    use sfc_parser::script::setup::reconstruct_script_setup;
    use sfc_parser::script::BundledScriptParser;

    fn reconstruct(source: &str, plain: &str, setup: &str, ecma_version: u32) -> u32 {
        let plain_start = source.find(plain).expect("plain slice");
        let setup_start = source.find(setup).expect("setup slice");
        let result = reconstruct_script_setup(
            source,
            Rc::new(LineIndex::from_source(source)),
            [plain_start, plain_start + plain.len()],
            [setup_start, setup_start + setup.len()],
            &BundledScriptParser,
            EsParserOptions {
                ecma_version,
                source_type: SourceType::Module,
            },
            false,
        )
        .expect("reconstruct");
        result.effective_ecma_version
    }

    #[test]
    fn await_inside_an_async_function_does_not_raise_the_version() {
        let source =
            "<script>let a = 1</script><script setup>async function f() { await g() }</script>";
        let effective = reconstruct(source, "let a = 1", "async function f() { await g() }", 2017);
        assert_eq!(effective, 2017);
    }

    #[test]
    fn await_in_a_braced_arrow_body_does_not_raise_the_version() {
        let source =
            "<script>let a = 1</script><script setup>const f = async () => { await g() }</script>";
        let effective =
            reconstruct(source, "let a = 1", "const f = async () => { await g() }", 2017);
        assert_eq!(effective, 2017);
    }

    #[test]
    fn top_level_await_raises_the_version_directly() {
        let source = "<script>let u = 1</script><script setup>await fetch(u)</script>";
        let effective = reconstruct(source, "let u = 1", "await fetch(u)", 2017);
        assert_eq!(effective, 2022);
    }

    #[test]
    fn await_raises_the_effective_version() {
        let source = "<script setup>await fetch(u)</script>";
        let options = ParserOptions {
            ecma_version: EcmaVersion::Year(2021),
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let Statement::ExpressionStatement(stmt) = &result.ast.body[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(stmt.expression, Expression::AwaitExpression(_)));
    }

    #[test]
    fn await_raises_the_version_in_two_block_reconstruction() {
        let source = "<script>let u = \"/api\"</script><script setup>await fetch(u)</script>";
        let options = ParserOptions {
            ecma_version: EcmaVersion::Year(2017),
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        assert_eq!(result.ast.body.len(), 2);
    }
}

mod scope_merge {
    use super::*;

    #[test]
    fn setup_variables_live_in_the_module_scope() {
        let source = "<script>export let a = 1</script><script setup>import M from \"m\"\nlet b = 2\nM(a, b)</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        let top = manager.top_scope();
        assert!(top.variables.contains_key("a"));
        assert!(top.variables.contains_key("b"));
        assert!(top.variables.contains_key("M"));
        // Everything resolved; nothing bubbled out.
        assert!(manager.unresolved().is_empty());
    }

    #[test]
    fn same_named_variables_merge_their_definitions() {
        let source = "<script>let shared = 1</script><script setup>let shared = 2</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        let variable = &manager.top_scope().variables["shared"];
        assert_eq!(variable.defs.len(), 2);
        assert_eq!(variable.identifiers.len(), 2);
    }

    #[test]
    fn dissolved_block_scope_is_removed_and_ranges_are_original() {
        use sfc_parser::script::scope::ScopeKind;

        let source = "<script>let a = 1</script><script setup>let b = 2</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        // The synthetic block's scope is gone, not just emptied.
        assert!(manager.scopes.iter().all(|s| s.kind != ScopeKind::Block));
        // Scope extents point into the original file, not the scratch
        // buffer the reconstruction parsed.
        let top = manager.top_scope();
        assert_eq!(top.range[0], source.find("let a = 1").unwrap());
        assert_eq!(
            top.range[1],
            source.find("let b = 2").unwrap() + "let b = 2".len()
        );
        for variable in top.variables.values() {
            for identifier in &variable.identifiers {
                assert!(identifier.range[1] <= source.len());
            }
        }
    }

    #[test]
    fn nested_function_scopes_survive_the_merge_with_original_ranges() {
        use sfc_parser::script::scope::ScopeKind;

        let source =
            "<script>let a = 1</script><script setup>function f() { return a }</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        let function_scope = manager
            .scopes
            .iter()
            .find(|s| s.kind == ScopeKind::Function)
            .expect("function scope");
        // Re-parented onto the top scope after the block dissolved, with a
        // range inside the original file.
        assert_eq!(function_scope.parent, Some(0));
        let body = "function f() { return a }";
        let start = source.find(body).unwrap();
        assert_eq!(function_scope.range, [start, start + body.len()]);
        // `a` resolved into the top scope.
        assert!(manager.unresolved().is_empty());
    }

    #[test]
    fn compiler_macros_resolve_without_declarations() {
        let source = "<script setup>const props = defineProps([\"x\"])</script>";
        let options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        assert!(manager.unresolved().is_empty());
        assert!(manager.top_scope().variables.contains_key("defineProps"));
    }

    #[test]
    fn custom_macros_extend_the_builtin_set() {
        let source = "<script setup>const x = myMacro()</script>";
        let mut options = ParserOptions {
            scope_manager: true,
            ..sfc_options()
        };
        options.vue_features.custom_macros.push("myMacro".to_string());
        let result = parse_for_analysis(source, &options).expect("parse");
        let manager = result.scope_manager.expect("scope manager");
        assert!(manager.unresolved().is_empty());
    }
}
