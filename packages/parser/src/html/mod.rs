//! Template-side parsing: the byte-level tokenizer, intermediate
//! aggregation, tag metadata, and the template parser.

pub mod entities;
pub mod intermediate;
pub mod parser;
pub mod tags;
pub mod tokenizer;

pub use parser::{IntermediateTokenSource, TemplateParser};
pub use tags::{ContentModel, Namespace};
pub use tokenizer::Tokenizer;

/// Constructor for alternate template tokenizers (`<template lang="…">`).
/// Implementations own their input and expose the same intermediate-token
/// surface the built-in pipeline provides.
pub trait TemplateTokenizerFactory {
    fn create(
        &self,
        text: &str,
        whole_source: &str,
        starting_line: usize,
        starting_column: usize,
    ) -> Box<dyn IntermediateTokenSource>;
}

impl IntermediateTokenSource for Box<dyn IntermediateTokenSource> {
    fn next(&mut self) -> Option<intermediate::IntermediateToken> {
        (**self).next()
    }

    fn set_namespace(&mut self, namespace: Namespace) {
        (**self).set_namespace(namespace)
    }

    fn set_content_model(&mut self, model: ContentModel, tag_name: &str) {
        (**self).set_content_model(model, tag_name)
    }

    fn set_expression_enabled(&mut self, enabled: bool) {
        (**self).set_expression_enabled(enabled)
    }

    fn expression_enabled(&self) -> bool {
        (**self).expression_enabled()
    }

    fn take_tokens(&mut self) -> Vec<crate::ast::tokens::Token> {
        (**self).take_tokens()
    }

    fn take_comments(&mut self) -> Vec<crate::ast::tokens::Token> {
        (**self).take_comments()
    }

    fn take_errors(&mut self) -> Vec<crate::location::ParseError> {
        (**self).take_errors()
    }
}
