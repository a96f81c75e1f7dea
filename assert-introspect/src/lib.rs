//! Assertion introspection for C
//!
//! Rewrites `assert(e)` so that a failure reports the values that made `e`
//! false, not just its source text.

pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod rewrite;
pub mod sema;
pub mod tree;
pub mod util;

pub use ast::Span;
pub use config::Config;
pub use emit::emit_c;
pub use error::{CompileError, Result};
pub use rewrite::{RewriteError, RewriteReport, Rewriter};
pub use tree::TranslationUnit;

/// Lex, parse and analyze `source` into a translation unit
pub fn compile(filename: &str, source: &str) -> Result<TranslationUnit> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(filename, source, tokens)?;
    sema::analyze(filename, source, &program)
}

/// Compile `source` and rewrite every covered assertion
pub fn rewrite_source(filename: &str, source: &str, config: &Config) -> Result<(TranslationUnit, RewriteReport)> {
    let mut unit = compile(filename, source)?;
    let report = Rewriter::new(config).run(&mut unit);
    Ok((unit, report))
}
