//! Parser for single-file components: an HTML-modeled template tokenizer
//! and parser, embedded-script integration with exact source mapping,
//! `<script setup>` reconstruction, and template reference resolution.
//!
//! Entry points: [`parse`] returns the script program with `templateBody`
//! attached; [`parse_for_analysis`] additionally returns the document
//! fragment, token streams, visitor keys, and (optionally) a scope manager.

pub mod ast;
pub mod chars;
pub mod html;
pub mod line_index;
pub mod location;
pub mod location_calculator;
pub mod resolver;
pub mod script;

use std::collections::HashMap;
use std::rc::Rc;

use ast::es::{EsComment, Program, SourceType};
use ast::nodes::{VDocumentFragment, VNode};
use ast::visitor_keys::VISITOR_KEYS;
use html::intermediate::IntermediateTokenizer;
use html::parser::TemplateParser;
use html::tokenizer::Tokenizer;
use html::TemplateTokenizerFactory;
use line_index::LineIndex;
use location::{OffsetRange, ParseError, ParseFatalError, SourceLocation};
use script::es_lexer::EsToken;
use script::es_parser::EsParserOptions;
use script::expression::ExpressionContext;
use script::scope::ScopeManager;
use script::setup::reconstruct_script_setup;
use script::{parse_script_element, BundledScriptParser, ScriptParser};

/// Identifiers recognized as compiler macros inside `<script setup>`.
const BUILTIN_MACROS: &[&str] = &[
    "defineProps",
    "defineEmits",
    "defineExpose",
    "defineOptions",
    "defineSlots",
    "defineModel",
    "withDefaults",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcmaVersion {
    Latest,
    Year(u32),
}

impl EcmaVersion {
    /// `Latest` resolves to the bundled parser's most recent year.
    pub fn resolve(self) -> u32 {
        match self {
            EcmaVersion::Latest => 2022,
            EcmaVersion::Year(year) => year,
        }
    }
}

impl Default for EcmaVersion {
    fn default() -> Self {
        EcmaVersion::Year(2017)
    }
}

/// Selection of the embedded script parser.
#[derive(Clone, Default)]
pub enum ScriptParserChoice {
    /// The bundled parser.
    #[default]
    Default,
    /// Skip script parsing entirely.
    None,
    /// One parser for every language tag.
    Custom(Rc<dyn ScriptParser>),
    /// Per-language parsers; unlisted languages fall back to the bundled
    /// parser.
    PerLang(HashMap<String, Rc<dyn ScriptParser>>),
}

impl ScriptParserChoice {
    fn resolve(&self, lang: &str) -> Option<Rc<dyn ScriptParser>> {
        match self {
            ScriptParserChoice::Default => Some(Rc::new(BundledScriptParser)),
            ScriptParserChoice::None => None,
            ScriptParserChoice::Custom(parser) => Some(Rc::clone(parser)),
            ScriptParserChoice::PerLang(map) => Some(
                map.get(lang)
                    .cloned()
                    .unwrap_or_else(|| Rc::new(BundledScriptParser)),
            ),
        }
    }
}

#[derive(Clone)]
pub struct VueFeatures {
    /// Inside `<template>`, `<` within an interpolation is not an error.
    pub interpolation_as_non_html: bool,
    /// Parse expressions in style-block `v-bind()` calls (the CSS side is
    /// an external collaborator; the flag is recognized and forwarded).
    pub style_css_variable_injection: bool,
    /// Additional identifiers treated as compiler macros.
    pub custom_macros: Vec<String>,
}

impl Default for VueFeatures {
    fn default() -> Self {
        VueFeatures {
            interpolation_as_non_html: true,
            style_css_variable_injection: true,
            custom_macros: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct ParserOptions {
    /// Determines SFC handling (`.vue`) and identifies the source in
    /// reported errors.
    pub file_path: Option<String>,
    pub parser: ScriptParserChoice,
    pub ecma_version: EcmaVersion,
    pub source_type: Option<SourceType>,
    pub vue_features: VueFeatures,
    /// Alternate template tokenizers by language name.
    pub template_tokenizer: HashMap<String, Rc<dyn TemplateTokenizerFactory>>,
    /// Run scope analysis and return a scope manager.
    pub scope_manager: bool,
}

impl ParserOptions {
    fn is_sfc(&self) -> bool {
        self.file_path
            .as_deref()
            .map_or(true, |path| path.ends_with(".vue"))
    }

    fn es_options(&self, source_type: SourceType) -> EsParserOptions {
        EsParserOptions {
            ecma_version: self.ecma_version.resolve(),
            source_type,
        }
    }
}

/// A parsed custom block (any root block other than template/script/style).
#[derive(Debug)]
pub struct CustomBlock {
    pub name: String,
    pub program: Program,
    pub error: Option<ParseError>,
}

/// Full result of [`parse_for_analysis`].
#[derive(Debug)]
pub struct ParseResult {
    pub ast: Program,
    pub tokens: Vec<EsToken>,
    pub comments: Vec<EsComment>,
    /// The document fragment: remaining root blocks plus the aggregate
    /// token/comment/error lists of the whole document.
    pub document: Option<VDocumentFragment>,
    pub scope_manager: Option<ScopeManager>,
    pub custom_blocks: Vec<CustomBlock>,
    pub visitor_keys: &'static HashMap<&'static str, &'static [&'static str]>,
}

/// Parse a source document and return the script program, with the template
/// AST attached as `template_body` when the source is a single-file
/// component.
pub fn parse(source: &str, options: &ParserOptions) -> Result<Program, ParseFatalError> {
    parse_for_analysis(source, options).map(|result| result.ast)
}

/// Parse a source document and return the extended program: AST, token
/// streams, document fragment, and optional scope manager.
pub fn parse_for_analysis(source: &str, options: &ParserOptions) -> Result<ParseResult, ParseFatalError> {
    if options.is_sfc() {
        parse_sfc(source, options)
    } else {
        parse_plain_script(source, options)
    }
}

fn parse_plain_script(source: &str, options: &ParserOptions) -> Result<ParseResult, ParseFatalError> {
    let line_index = Rc::new(LineIndex::from_source(source));
    let source_type = options.source_type.unwrap_or(SourceType::Script);
    let Some(parser) = options.parser.resolve("js") else {
        return Ok(empty_result(source, &line_index, source_type));
    };
    let calculator =
        location_calculator::LocationCalculator::without_gaps(Rc::clone(&line_index), 0);
    let parsed = parser
        .parse_program(source, options.es_options(source_type))
        .map_err(|error| {
            ParseFatalError::new(
                error.message.clone(),
                error.index,
                line_index.position_for(error.index),
            )
        })?;
    let mut program = parsed.program;
    let mut tokens = parsed.tokens;
    script::fix_program_locations(&mut program, &calculator);
    script::fix_token_locations(&mut tokens, &calculator);
    let comments = script::comments_with_locations(parsed.comments, &calculator);
    let scope_manager = options
        .scope_manager
        .then(|| script::scope::analyze_program(&program));
    Ok(ParseResult {
        ast: program,
        tokens,
        comments,
        document: None,
        scope_manager,
        custom_blocks: Vec::new(),
        visitor_keys: &*VISITOR_KEYS,
    })
}

fn parse_sfc(source: &str, options: &ParserOptions) -> Result<ParseResult, ParseFatalError> {
    let line_index = Rc::new(LineIndex::from_source(source));

    // Template-side pipeline. The expression context uses the parser
    // configured for plain script.
    let expression_parser = options.parser.resolve("js");
    let mut tokenizer = Tokenizer::new(source);
    tokenizer.set_interpolation_as_non_html(options.vue_features.interpolation_as_non_html);
    let intermediate = IntermediateTokenizer::new(tokenizer);
    let expression = expression_parser.as_deref().map(|parser| ExpressionContext {
        source,
        line_index: Rc::clone(&line_index),
        parser,
        options: options.es_options(SourceType::Script),
    });
    let template_parser = TemplateParser::new(source, intermediate, Rc::clone(&line_index), expression, true);
    let mut fragment = template_parser.parse();

    // Locate the root blocks.
    let mut template_index = None;
    let mut script_indices: Vec<usize> = Vec::new();
    for (index, child) in fragment.children.iter().enumerate() {
        if let VNode::VElement(element) = child {
            match element.name.as_str() {
                "template" if template_index.is_none() => template_index = Some(index),
                "script" => script_indices.push(index),
                _ => {}
            }
        }
    }

    // A registered plug-in tokenizer takes over non-HTML template content.
    if let Some(index) = template_index {
        apply_template_plugin(source, options, &line_index, &mut fragment, index);
    }
    resolver::resolve_references(&mut fragment);

    // Script blocks.
    let source_type = options.source_type.unwrap_or(SourceType::Module);
    let mut program = None;
    let mut tokens: Vec<EsToken> = Vec::new();
    let mut comments: Vec<EsComment> = Vec::new();
    let mut scope_manager = None;
    if let Some(parser) = options.parser.resolve("js") {
        let scripts: Vec<(usize, bool, String)> = script_indices
            .iter()
            .map(|&index| {
                let VNode::VElement(element) = &fragment.children[index] else {
                    unreachable!()
                };
                let lang = element
                    .attribute_value("lang")
                    .unwrap_or("js")
                    .to_string();
                (index, element.has_attribute("setup"), lang)
            })
            .collect();
        let setup = scripts.iter().find(|(_, is_setup, _)| *is_setup);
        let plain = scripts.iter().find(|(_, is_setup, _)| !*is_setup);

        match (plain, setup) {
            (Some(plain), Some(setup)) => {
                let plain_content = script_content_range(&fragment, plain.0);
                let setup_content = script_content_range(&fragment, setup.0);
                let lang_parser = options.parser.resolve(&setup.2).unwrap_or(parser);
                let reconstruction = reconstruct_script_setup(
                    source,
                    Rc::clone(&line_index),
                    plain_content,
                    setup_content,
                    lang_parser.as_ref(),
                    options.es_options(SourceType::Module),
                    options.scope_manager,
                )?;
                let mut manager = reconstruction.scope_manager;
                if let Some(manager) = manager.as_mut() {
                    manager.define_macros(
                        BUILTIN_MACROS
                            .iter()
                            .copied()
                            .chain(options.vue_features.custom_macros.iter().map(String::as_str)),
                    );
                }
                program = Some(reconstruction.program);
                tokens = reconstruction.tokens;
                comments = reconstruction.comments;
                scope_manager = manager;
            }
            (maybe_plain, maybe_setup) => {
                if let Some(&(index, is_setup, ref lang)) = maybe_setup.or(maybe_plain) {
                    let element_source_type = if is_setup { SourceType::Module } else { source_type };
                    let mut es_options = options.es_options(element_source_type);
                    if is_setup && es_options.ecma_version < 2022 {
                        let content = script_content_range(&fragment, index);
                        if script::setup::contains_top_level_await(
                            &source[content[0]..content[1]],
                        ) {
                            es_options.ecma_version = 2022;
                        }
                    }
                    let lang_parser = options.parser.resolve(lang).unwrap_or(parser);
                    let (content, open_tag, close_tag) = script_tag_ranges(&fragment, index);
                    let calculator = location_calculator::LocationCalculator::without_gaps(
                        Rc::clone(&line_index),
                        0,
                    );
                    let block = parse_script_element(
                        source,
                        content,
                        open_tag,
                        close_tag,
                        lang_parser.as_ref(),
                        es_options,
                        &calculator,
                        options.scope_manager,
                    )
                    .map_err(|error| {
                        ParseFatalError::new(
                            error.message.clone(),
                            error.index,
                            line_index.position_for(error.index),
                        )
                    })?;
                    let mut manager = block.scope_manager;
                    if is_setup {
                        if let Some(manager) = manager.as_mut() {
                            manager.define_macros(
                                BUILTIN_MACROS.iter().copied().chain(
                                    options.vue_features.custom_macros.iter().map(String::as_str),
                                ),
                            );
                        }
                    }
                    program = Some(block.program);
                    tokens = block.tokens;
                    comments = block.comments;
                    scope_manager = manager;
                }
            }
        }
    }

    // Custom blocks: non-template/script/style root elements with a
    // configured per-language parser.
    let mut custom_blocks = Vec::new();
    if let ScriptParserChoice::PerLang(map) = &options.parser {
        for (index, child) in fragment.children.iter().enumerate() {
            let VNode::VElement(element) = child else { continue };
            if matches!(element.name.as_str(), "template" | "script" | "style") {
                continue;
            }
            let lang = element.attribute_value("lang").unwrap_or("json");
            let Some(parser) = map.get(lang) else { continue };
            custom_blocks.push(parse_custom_block(
                source,
                &fragment,
                index,
                parser.as_ref(),
                options,
                &line_index,
            ));
        }
    }

    // Attach the template to the program.
    let mut program = program.unwrap_or_else(|| empty_program(source, &line_index, source_type));
    if let Some(index) = template_index {
        if let VNode::VElement(element) = fragment.children.remove(index) {
            program.template_body = Some(Box::new(element));
        }
    }

    Ok(ParseResult {
        ast: program,
        tokens,
        comments,
        document: Some(fragment),
        scope_manager,
        custom_blocks,
        visitor_keys: &*VISITOR_KEYS,
    })
}

/// Re-tokenize a `<template lang="…">` block through a registered plug-in
/// and splice the produced tree into the template element.
fn apply_template_plugin(
    source: &str,
    options: &ParserOptions,
    line_index: &Rc<LineIndex>,
    fragment: &mut VDocumentFragment,
    template_index: usize,
) {
    let (lang, content) = {
        let VNode::VElement(element) = &fragment.children[template_index] else {
            return;
        };
        let lang = element.attribute_value("lang").unwrap_or("html").to_string();
        let content = script_content_range(fragment, template_index);
        (lang, content)
    };
    if lang.is_empty() || lang == "html" {
        return;
    }
    let Some(factory) = options.template_tokenizer.get(&lang) else {
        return;
    };

    let text = &source[content[0]..content[1]];
    let start = line_index.position_for(content[0]);
    let token_source = factory.create(text, source, start.line, start.column);
    let expression_parser = options.parser.resolve("js");
    let expression = expression_parser.as_deref().map(|parser| ExpressionContext {
        source,
        line_index: Rc::clone(line_index),
        parser,
        options: options.es_options(SourceType::Script),
    });
    let sub_parser = TemplateParser::new(source, token_source, Rc::clone(line_index), expression, false);
    let mut sub_fragment = sub_parser.parse();

    let VNode::VElement(element) = &mut fragment.children[template_index] else {
        return;
    };
    element.children = std::mem::take(&mut sub_fragment.children);
    fragment.tokens.append(&mut sub_fragment.tokens);
    fragment.comments.append(&mut sub_fragment.comments);
    fragment.errors.append(&mut sub_fragment.errors);
}

/// The content span of a script element: end of the open tag to start of
/// the close tag (or the element end when the close tag is missing).
fn script_content_range(fragment: &VDocumentFragment, index: usize) -> OffsetRange {
    let VNode::VElement(element) = &fragment.children[index] else {
        unreachable!()
    };
    let start = element.start_tag.range[1];
    let end = element
        .end_tag
        .as_ref()
        .map_or(element.range[1], |tag| tag.range[0]);
    [start, end.max(start)]
}

fn script_tag_ranges(
    fragment: &VDocumentFragment,
    index: usize,
) -> (OffsetRange, OffsetRange, Option<OffsetRange>) {
    let VNode::VElement(element) = &fragment.children[index] else {
        unreachable!()
    };
    (
        script_content_range(fragment, index),
        element.start_tag.range,
        element.end_tag.as_ref().map(|tag| tag.range),
    )
}

fn parse_custom_block(
    source: &str,
    fragment: &VDocumentFragment,
    index: usize,
    parser: &dyn ScriptParser,
    options: &ParserOptions,
    line_index: &Rc<LineIndex>,
) -> CustomBlock {
    let VNode::VElement(element) = &fragment.children[index] else {
        unreachable!()
    };
    let content = script_content_range(fragment, index);
    let prefix = script::whitespace_prefix(source, content[0]);
    let code = format!("{}{}", prefix, &source[content[0]..content[1]]);
    let calculator = location_calculator::LocationCalculator::without_gaps(Rc::clone(line_index), 0);
    match parser.parse_program(&code, options.es_options(SourceType::Script)) {
        Ok(parsed) => {
            let mut program = parsed.program;
            program.range = content;
            script::fix_program_locations(&mut program, &calculator);
            CustomBlock {
                name: element.name.clone(),
                program,
                error: None,
            }
        }
        Err(error) => {
            // Failures yield an empty program spanning the block, with the
            // error carried alongside.
            let pos = line_index.position_for(error.index);
            CustomBlock {
                name: element.name.clone(),
                program: empty_program_spanning(content, line_index),
                error: Some(ParseError::with_message(
                    location::ErrorCode::XExpressionError,
                    error.message,
                    error.index,
                    pos,
                )),
            }
        }
    }
}

fn empty_program(source: &str, line_index: &Rc<LineIndex>, source_type: SourceType) -> Program {
    let end = source.len();
    let pos = line_index.position_for(end);
    Program::new(
        Vec::new(),
        source_type,
        [end, end],
        SourceLocation::new(pos, pos),
    )
}

fn empty_program_spanning(range: OffsetRange, line_index: &Rc<LineIndex>) -> Program {
    Program::new(
        Vec::new(),
        SourceType::Script,
        range,
        SourceLocation::new(
            line_index.position_for(range[0]),
            line_index.position_for(range[1]),
        ),
    )
}

fn empty_result(source: &str, line_index: &Rc<LineIndex>, source_type: SourceType) -> ParseResult {
    ParseResult {
        ast: empty_program(source, line_index, source_type),
        tokens: Vec::new(),
        comments: Vec::new(),
        document: None,
        scope_manager: None,
        custom_blocks: Vec::new(),
        visitor_keys: &*VISITOR_KEYS,
    }
}

/// Parse only a template fragment (no SFC wrapper); used by tests and by
/// embedders that already extracted the template text.
pub fn parse_template_fragment(source: &str, options: &ParserOptions) -> VDocumentFragment {
    let line_index = Rc::new(LineIndex::from_source(source));
    let expression_parser = options.parser.resolve("js");
    let mut tokenizer = Tokenizer::new(source);
    tokenizer.set_interpolation_as_non_html(options.vue_features.interpolation_as_non_html);
    tokenizer.set_expression_enabled(true);
    let intermediate = IntermediateTokenizer::new(tokenizer);
    let expression = expression_parser.as_deref().map(|parser| ExpressionContext {
        source,
        line_index: Rc::clone(&line_index),
        parser,
        options: options.es_options(SourceType::Script),
    });
    let template_parser = TemplateParser::new(source, intermediate, Rc::clone(&line_index), expression, false);
    let mut fragment = template_parser.parse();
    resolver::resolve_references(&mut fragment);
    fragment
}

/// Convenience accessor mirroring the document error surface.
pub fn document_errors(result: &ParseResult) -> &[ParseError] {
    result
        .document
        .as_ref()
        .map_or(&[], |document| document.errors.as_slice())
}

/// Serialize a program to its `type`-tagged JSON form.
pub fn ast_to_json(program: &Program) -> serde_json::Value {
    serde_json::to_value(program).expect("AST serialization is infallible")
}

/// Serialize a document fragment (template tree, tokens, errors) to JSON.
pub fn document_to_json(document: &VDocumentFragment) -> serde_json::Value {
    serde_json::to_value(document).expect("document serialization is infallible")
}

// Re-exports for consumers.
pub use ast::es::Program as EsProgram;
pub use ast::nodes as template_nodes;
pub use location::Position as SourcePosition;
