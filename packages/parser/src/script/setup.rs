//! `<script setup>` reconstruction.
//!
//! Two script blocks are reassembled into one parseable module: the plain
//! block's statements first, then the setup block's imports hoisted to the
//! top level, then the remaining setup statements wrapped in a synthetic
//! block. After parsing, the block is spliced back into the program body,
//! every trace of the synthetic punctuators is removed, and all coordinates
//! are remapped onto the original file. Failures here are the parser's only
//! fatal condition; their offsets are remapped before rethrow.

use std::rc::Rc;

use crate::ast::es::*;
use crate::line_index::LineIndex;
use crate::location::{OffsetRange, ParseFatalError, SourceLocation};
use crate::script::es_lexer::{EsToken, EsTokenType, Scanner};
use crate::script::es_parser::EsParserOptions;
use crate::script::scope::{self, ScopeManager};
use crate::script::{
    walk_program_ranges, walk_statement_ranges, whitespace_prefix, ScriptParser,
};

/// A slice appended to the reconstruction buffer: `offset` is the delta from
/// buffer coordinates back to original coordinates.
#[derive(Debug, Clone, Copy)]
struct RemapBlock {
    buffer_start: usize,
    length: usize,
    original_start: usize,
}

/// Growing buffer plus the bookkeeping needed to undo the synthesis.
#[derive(Debug, Default)]
struct CodeBlocks {
    code: String,
    remap_blocks: Vec<RemapBlock>,
    split_punctuators: Vec<usize>,
}

impl CodeBlocks {
    fn append(&mut self, source: &str, range: OffsetRange) {
        if range[0] >= range[1] {
            return;
        }
        self.remap_blocks.push(RemapBlock {
            buffer_start: self.code.len(),
            length: range[1] - range[0],
            original_start: range[0],
        });
        self.code.push_str(&source[range[0]..range[1]]);
    }

    fn append_split_punctuator(&mut self, punctuator: char) {
        self.split_punctuators.push(self.code.len());
        self.code.push(punctuator);
    }

    /// Map a buffer offset back to the original file. End offsets may sit
    /// exactly on a block boundary, so they probe one unit earlier.
    fn remap_offset(&self, offset: usize, is_end: bool) -> usize {
        let probe = if is_end && offset > 0 { offset - 1 } else { offset };
        for block in &self.remap_blocks {
            if probe >= block.buffer_start && probe < block.buffer_start + block.length {
                return block.original_start + (offset - block.buffer_start);
            }
        }
        // Offsets inside synthetic text snap to the nearest block edge.
        for block in &self.remap_blocks {
            if offset <= block.buffer_start {
                return block.original_start;
            }
        }
        self.remap_blocks
            .last()
            .map_or(0, |b| b.original_start + b.length)
    }
}

#[derive(Debug)]
pub struct SetupReconstruction {
    pub program: Program,
    pub tokens: Vec<EsToken>,
    pub comments: Vec<EsComment>,
    pub scope_manager: Option<ScopeManager>,
    /// The ECMAScript year the parse actually used.
    pub effective_ecma_version: u32,
}

/// Reassemble a plain `<script>` block and a `<script setup>` block into a
/// single module program in original coordinates.
pub fn reconstruct_script_setup(
    source: &str,
    line_index: Rc<LineIndex>,
    plain_content: OffsetRange,
    setup_content: OffsetRange,
    parser: &dyn ScriptParser,
    options: EsParserOptions,
    with_scope: bool,
) -> Result<SetupReconstruction, ParseFatalError> {
    let setup_slice = &source[setup_content[0]..setup_content[1]];

    // Top-level `await` in the setup body raises the language year.
    let effective_ecma_version = if options.ecma_version < 2022 && contains_top_level_await(setup_slice) {
        2022
    } else {
        options.ecma_version
    };
    let parse_options = EsParserOptions {
        ecma_version: effective_ecma_version,
        source_type: SourceType::Module,
    };

    // Locate the setup block's import declarations, expanding each import's
    // range to cover every nested node.
    let setup_prefix = whitespace_prefix(source, setup_content[0]);
    let setup_code = format!("{}{}", setup_prefix, setup_slice);
    let pre_parsed = parser
        .parse_program(&setup_code, parse_options)
        .map_err(|error| fatal(&line_index, error.message, error.index))?;
    let mut import_ranges: Vec<OffsetRange> = Vec::new();
    for statement in &pre_parsed.program.body {
        if statement.is_import() {
            import_ranges.push(covering_range(statement));
        }
    }

    // Phase A: tokenization into code blocks.
    let mut blocks = CodeBlocks::default();
    blocks.append(source, plain_content);
    blocks.append_split_punctuator(';');
    for import_range in &import_ranges {
        blocks.append(source, *import_range);
        blocks.append_split_punctuator(';');
    }
    let block_open = blocks.code.len();
    blocks.append_split_punctuator('{');
    let mut cursor = setup_content[0];
    for import_range in &import_ranges {
        blocks.append(source, [cursor, import_range[0]]);
        blocks.append_split_punctuator(';');
        cursor = import_range[1];
    }
    blocks.append(source, [cursor, setup_content[1]]);
    let block_close = blocks.code.len();
    blocks.append_split_punctuator('}');

    // Phase B: parse the combined buffer; errors travel back through the
    // remap blocks.
    let parsed = parser
        .parse_program(&blocks.code, parse_options)
        .map_err(|error| {
            let original = blocks.remap_offset(error.index, false);
            fatal(&line_index, error.message, original)
        })?;
    let mut program = parsed.program;
    let mut tokens = parsed.tokens;
    let comments = parsed.comments;

    // The scope manager sees the synthetic block, then has it dissolved.
    let mut scope_manager = with_scope.then(|| scope::analyze_program(&program));
    if let Some(manager) = scope_manager.as_mut() {
        manager.merge_block_scope_into_top([block_open, block_close + 1]);
    }

    // Phase C: splice the synthetic block into the program body and scrub
    // the split punctuators out of nodes and tokens.
    let split_offsets = blocks.split_punctuators.clone();
    let is_split = |offset: usize| split_offsets.binary_search(&offset).is_ok();

    let mut body = Vec::with_capacity(program.body.len());
    for statement in program.body.drain(..) {
        match statement {
            Statement::BlockStatement(block) if block.range == [block_open, block_close + 1] => {
                body.extend(block.body);
            }
            Statement::EmptyStatement(empty) if is_split(empty.range[0]) => {}
            other => body.push(other),
        }
    }
    // Empty statements born from the synthetic `;` delimiters may have been
    // carried inside the block as well.
    body.retain(|statement| {
        !matches!(statement, Statement::EmptyStatement(empty) if is_split(empty.range[0]))
    });
    program.body = body;

    for statement in &mut program.body {
        walk_statement_ranges(statement, &mut |range, _loc| {
            while range[1] > range[0] && is_split(range[1] - 1) {
                range[1] -= 1;
            }
        });
    }
    tokens.retain(|token| !(token.range[1] - token.range[0] == 1 && is_split(token.range[0])));

    if let Some(extent) = program_extent(&program) {
        program.range = extent;
    }

    // Remap everything onto the original file.
    walk_program_ranges(&mut program, &mut |range, loc| {
        range[0] = blocks.remap_offset(range[0], false);
        range[1] = blocks.remap_offset(range[1], true);
        *loc = location_of(&line_index, *range);
    });
    if program.body.is_empty() {
        program.range = plain_content;
        program.loc = location_of(&line_index, plain_content);
    }
    for token in &mut tokens {
        token.range[0] = blocks.remap_offset(token.range[0], false);
        token.range[1] = blocks.remap_offset(token.range[1], true);
        token.loc = location_of(&line_index, token.range);
    }
    let comments = comments
        .into_iter()
        .map(|comment| {
            let range = [
                blocks.remap_offset(comment.range[0], false),
                blocks.remap_offset(comment.range[1], true),
            ];
            EsComment {
                comment_type: if comment.block { "Block" } else { "Line" },
                value: comment.value,
                range,
                loc: location_of(&line_index, range),
            }
        })
        .collect();
    if let Some(manager) = scope_manager.as_mut() {
        for reference in &mut manager.references {
            reference.id.range[0] = blocks.remap_offset(reference.id.range[0], false);
            reference.id.range[1] = blocks.remap_offset(reference.id.range[1], true);
            reference.id.loc = location_of(&line_index, reference.id.range);
        }
        for scope_data in &mut manager.scopes {
            scope_data.range[0] = blocks.remap_offset(scope_data.range[0], false);
            scope_data.range[1] = blocks.remap_offset(scope_data.range[1], true);
            for variable in scope_data.variables.values_mut() {
                for identifier in &mut variable.identifiers {
                    identifier.range[0] = blocks.remap_offset(identifier.range[0], false);
                    identifier.range[1] = blocks.remap_offset(identifier.range[1], true);
                    identifier.loc = location_of(&line_index, identifier.range);
                }
                for def in &mut variable.defs {
                    def[0] = blocks.remap_offset(def[0], false);
                    def[1] = blocks.remap_offset(def[1], true);
                }
            }
        }
    }

    Ok(SetupReconstruction {
        program,
        tokens,
        comments,
        scope_manager,
        effective_ecma_version,
    })
}

/// True when `code` contains an `await` keyword outside any function body.
/// Awaits inside `function` bodies and braced arrow bodies are ordinary and
/// must not raise the language year; only the top-level form needs it.
pub(crate) fn contains_top_level_await(code: &str) -> bool {
    let Ok((tokens, _)) = Scanner::new(code).scan() else {
        return false;
    };
    let mut paren_depth = 0usize;
    let mut brace_depth = 0usize;
    // Brace depths at which a function body opened.
    let mut function_bodies: Vec<usize> = Vec::new();
    // Paren depth recorded at a `function` keyword (or a braced arrow),
    // so parameter destructuring braces are not mistaken for the body.
    let mut pending_function: Option<usize> = None;
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        match token.token_type {
            EsTokenType::Punctuator => match token.value.as_str() {
                "(" => paren_depth += 1,
                ")" => paren_depth = paren_depth.saturating_sub(1),
                "{" => {
                    if pending_function == Some(paren_depth) {
                        pending_function = None;
                        function_bodies.push(brace_depth);
                    }
                    brace_depth += 1;
                }
                "}" => {
                    brace_depth = brace_depth.saturating_sub(1);
                    if function_bodies.last() == Some(&brace_depth) {
                        function_bodies.pop();
                    }
                }
                "=>" => {
                    if iter.peek().is_some_and(|t| t.is_punctuator("{")) {
                        pending_function = Some(paren_depth);
                    }
                }
                _ => {}
            },
            EsTokenType::Keyword if token.value == "function" => {
                pending_function = Some(paren_depth);
            }
            EsTokenType::Keyword if token.value == "await" => {
                if function_bodies.is_empty() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Smallest range covering a statement and every nested node. Some parsers
/// attach specifier nodes slightly outside the declaration's own range.
fn covering_range(statement: &Statement) -> OffsetRange {
    let mut min = usize::MAX;
    let mut max = 0;
    let mut probe = statement.clone();
    walk_statement_ranges(&mut probe, &mut |range, _loc| {
        min = min.min(range[0]);
        max = max.max(range[1]);
    });
    [min, max]
}

fn program_extent(program: &Program) -> Option<OffsetRange> {
    match (program.body.first(), program.body.last()) {
        (Some(first), Some(last)) => Some([first.range()[0], last.range()[1]]),
        _ => None,
    }
}

fn location_of(line_index: &LineIndex, range: OffsetRange) -> SourceLocation {
    SourceLocation::new(
        line_index.position_for(range[0]),
        line_index.position_for(range[1]),
    )
}

fn fatal(line_index: &LineIndex, message: String, index: usize) -> ParseFatalError {
    ParseFatalError::new(message, index, line_index.position_for(index))
}
