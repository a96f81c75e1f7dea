//! Assertion rewriting
//!
//! Replaces the failure branch of every `assert` expansion with code that,
//! when the assertion fails, prints which parts of the condition were
//! evaluated and what they produced, then terminates.
//!
//! The pass runs in stages per assertion:
//! 1. `matcher`: recognize `cond ? (void)0 : __assert_fail(...)`
//! 2. `synth::validate`: reject shapes and types the report cannot print
//! 3. `wrap`: put evaluate-once handles on everything read twice
//! 4. `report`: build the statements that fill the repr buffers
//! 5. `reconstruct`: render the static text, sharing colors with 4
//! 6. `synth`: assemble the replacement block

pub mod colors;
pub mod format;
pub mod matcher;
pub mod reconstruct;
mod report;
mod synth;
pub mod wrap;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::ast::Span;
use crate::config::{Config, PrimitiveNames, RewriteConfig};
use crate::tree::{DeclId, Decls, FnSig, Item, NodeId, Stmt, TranslationUnit, Tree};

pub use matcher::{is_assertion, match_assertion, AssertionShape};

/// Why one assertion was left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("not an assertion")]
    NotAnAssertion,

    #[error("runtime primitive '{0}' is not declared")]
    MissingPrimitive(String),

    #[error("runtime primitive '{0}' has an unexpected signature")]
    IncompatiblePrimitive(String),

    #[error("cannot report a {0} in an assertion")]
    UnsupportedExpression(String),

    #[error("cannot print a value of type '{0}'")]
    UnsupportedType(String),
}

/// The functions generated code calls, resolved once per translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitives {
    /// `int print(const char *fmt, ...)`
    pub print: DeclId,
    /// `int format(char *buf, size_t size, const char *fmt, ...)`
    pub format: DeclId,
    /// `void terminate(void)`
    pub terminate: DeclId,
}

impl Primitives {
    pub fn resolve(decls: &Decls, names: &PrimitiveNames) -> Result<Self, RewriteError> {
        Ok(Self {
            print: lookup(decls, &names.print, |sig| {
                sig.variadic && sig.params.len() == 1 && sig.params[0].is_pointer()
            })?,
            format: lookup(decls, &names.format, |sig| {
                sig.variadic
                    && sig.params.len() == 3
                    && sig.params[0].is_pointer()
                    && sig.params[1].is_integer()
                    && sig.params[2].is_pointer()
            })?,
            terminate: lookup(decls, &names.terminate, |sig| sig.params.is_empty() && !sig.variadic)?,
        })
    }
}

fn lookup(decls: &Decls, name: &str, fits: impl Fn(&FnSig) -> bool) -> Result<DeclId, RewriteError> {
    let id = decls
        .find_function(name)
        .ok_or_else(|| RewriteError::MissingPrimitive(name.to_string()))?;
    match decls[id].signature() {
        Some(sig) if fits(sig) => Ok(id),
        _ => Err(RewriteError::IncompatiblePrimitive(name.to_string())),
    }
}

/// An assertion the pass had to leave alone
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    /// Function containing the assertion
    pub function: String,
    pub error: RewriteError,
}

impl Diagnostic {
    pub fn message(&self) -> String {
        format!("assertion in '{}' left unchanged: {}", self.function, self.error)
    }
}

/// Outcome of running the pass over a translation unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteReport {
    pub rewritten: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RewriteReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// The rewriting pass
#[derive(Debug, Clone)]
pub struct Rewriter {
    config: RewriteConfig,
    primitives: PrimitiveNames,
}

impl Rewriter {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.rewrite.clone(),
            primitives: config.primitives.clone(),
        }
    }

    /// Rewrite every assertion in the functions the configuration covers
    pub fn run(&self, unit: &mut TranslationUnit) -> RewriteReport {
        let primitives = Primitives::resolve(&unit.decls, &self.primitives);
        if let Err(error) = &primitives {
            debug!(%error, "runtime primitives unavailable");
        }

        let mut report = RewriteReport::default();
        let TranslationUnit { tree, decls, items, .. } = unit;
        for item in items.iter_mut() {
            let Item::Function(function) = item else {
                continue;
            };
            let name = decls.name(function.decl).to_string();
            if !self.config.covers(&name) {
                trace!(function = %name, "not covered by configuration");
                continue;
            }
            let mut pass = Pass {
                config: &self.config,
                tree: &mut *tree,
                decls: &mut *decls,
                primitives: &primitives,
                function: &name,
                report: &mut report,
            };
            pass.body(&mut function.body);
        }
        report
    }

    /// Rewrite the single assertion `node`, returning its replacement
    ///
    /// On error the unit is left as it was.
    pub fn rewrite_assertion(&self, unit: &mut TranslationUnit, node: NodeId) -> Result<NodeId, RewriteError> {
        let shape = match_assertion(&unit.tree, &unit.decls, node, &self.config.fail_function)
            .ok_or(RewriteError::NotAnAssertion)?;
        let primitives = Primitives::resolve(&unit.decls, &self.primitives)?;
        let span = unit.tree.span(node);
        attempt(&mut unit.tree, &mut unit.decls, &primitives, &self.config, &shape, span)
    }
}

/// Synthesize the replacement, dropping every node and declaration the
/// attempt created if it fails
fn attempt(
    tree: &mut Tree,
    decls: &mut Decls,
    primitives: &Primitives,
    config: &RewriteConfig,
    shape: &AssertionShape,
    span: Span,
) -> Result<NodeId, RewriteError> {
    let (nodes, declared) = (tree.len(), decls.len());
    let result = synth::synthesize(tree, decls, primitives, config, shape, span);
    if result.is_err() {
        tree.truncate(nodes);
        decls.truncate(declared);
    }
    result
}

struct Pass<'a> {
    config: &'a RewriteConfig,
    tree: &'a mut Tree,
    decls: &'a mut Decls,
    primitives: &'a Result<Primitives, RewriteError>,
    function: &'a str,
    report: &'a mut RewriteReport,
}

impl Pass<'_> {
    fn body(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(node) => {
                    if let Some(replacement) = self.statement(*node) {
                        *node = replacement;
                    }
                }
                Stmt::If { then_body, else_body, .. } => {
                    self.body(then_body);
                    self.body(else_body);
                }
                Stmt::Block(inner) => self.body(inner),
                Stmt::Local { .. } | Stmt::Return(_) => {}
            }
        }
    }

    fn statement(&mut self, node: NodeId) -> Option<NodeId> {
        let shape = match_assertion(self.tree, self.decls, node, &self.config.fail_function)?;
        let span = self.tree.span(node);
        let result = match self.primitives {
            Ok(primitives) => attempt(self.tree, self.decls, primitives, self.config, &shape, span),
            Err(error) => Err(error.clone()),
        };
        match result {
            Ok(replacement) => {
                debug!(function = self.function, %span, text = %shape.text, "rewrote assertion");
                self.report.rewritten += 1;
                Some(replacement)
            }
            Err(error) => {
                warn!(function = self.function, %span, %error, "assertion left unchanged");
                self.report.diagnostics.push(Diagnostic {
                    span,
                    function: self.function.to_string(),
                    error,
                });
                None
            }
        }
    }
}
