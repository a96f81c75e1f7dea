//! Runtime report of a failed condition
//!
//! Walks the wrapped condition and produces statements that fill the repr
//! buffers with the evaluated parts of the expression. Short-circuit
//! operators turn into run-time branches on their left operand, so text for
//! an operand that never ran is never produced.
//!
//! Literal text and value directives accumulate in a [`Sink`] and are
//! written with one buffer append per run of text; a branch flushes first.

use std::collections::HashSet;

use super::colors::{paint, Color, Entity};
use super::format::{self, FormatPlan};
use super::reconstruct::{is_operator, needs_parens, reconstruct};
use super::synth::Synth;
use super::RewriteError;
use crate::ast::BinOp;
use crate::tree::{DeclId, NodeId, NodeKind, Tree};
use crate::util::escape_format;

/// What is known about the value of the node being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Context {
    /// The value is falsy: it made the assertion fail
    Failed,
    /// Nothing is known
    Value,
}

/// Format text and its arguments, pending for one buffer
#[derive(Debug, Default)]
pub(super) struct Segment {
    pub fmt: String,
    pub args: Vec<NodeId>,
}

impl Segment {
    pub fn text(&mut self, text: &str) {
        self.fmt.push_str(&escape_format(text));
    }

    pub fn value(&mut self, directive: &str, arg: NodeId) {
        self.fmt.push_str(directive);
        self.args.push(arg);
    }

    pub fn extend(&mut self, other: Segment) {
        self.fmt.push_str(&other.fmt);
        self.args.extend(other.args);
    }

    pub fn is_empty(&self) -> bool {
        self.fmt.is_empty()
    }
}

/// Output of one straight-line stretch of the report
#[derive(Debug, Default)]
pub(super) struct Sink {
    pub main: Segment,
    pub sub: Segment,
    pub stmts: Vec<NodeId>,
}

impl Sink {
    pub fn text(&mut self, text: &str) {
        self.main.text(text);
    }
}

/// Variables whose subexpression line has been written
#[derive(Debug, Clone, Default)]
pub(super) struct Listed {
    /// On every path to this point
    definite: HashSet<DeclId>,
    /// On some path to this point
    possible: HashSet<DeclId>,
}

impl Listed {
    fn merge(self, other: Listed) -> Listed {
        Listed {
            definite: self.definite.intersection(&other.definite).copied().collect(),
            possible: self.possible.union(&other.possible).copied().collect(),
        }
    }
}

/// Whether `node` is a variable read or a call once wrappers are stripped
pub(super) fn is_leaf(tree: &Tree, node: NodeId) -> bool {
    matches!(
        tree.kind(tree.strip_wrappers(node)),
        NodeKind::DeclRef(_) | NodeKind::Call { .. }
    )
}

/// Variable reads and calls inside a call argument, in evaluation order
///
/// Only parts that run whenever the argument runs are collected: the right
/// operand of a short-circuit operator is skipped, and a call's own
/// arguments are left to that call's listing.
pub(super) fn argument_leaves(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
    if tree.is_pure(node) {
        return;
    }
    let inner = tree.strip_wrappers(node);
    match tree.kind(inner) {
        NodeKind::DeclRef(_) if tree.ty(inner).is_array() => {}
        NodeKind::DeclRef(_) | NodeKind::Call { .. } => out.push(node),
        NodeKind::Binary { op, lhs, .. } if op.is_short_circuit() => argument_leaves(tree, *lhs, out),
        NodeKind::Binary { lhs, rhs, .. } => {
            argument_leaves(tree, *lhs, out);
            argument_leaves(tree, *rhs, out);
        }
        NodeKind::Unary { operand, .. } => argument_leaves(tree, *operand, out),
        _ => {}
    }
}

/// The innermost handle above the variable read or call under `node`
fn leaf_handle(tree: &Tree, node: NodeId) -> NodeId {
    let mut handle = node;
    let mut current = node;
    loop {
        match tree.kind(current) {
            NodeKind::Save(inner) => {
                handle = current;
                current = *inner;
            }
            NodeKind::ImplicitConv(inner) => current = *inner,
            _ => return handle,
        }
    }
}

fn directive(color: Option<Color>, plan: &FormatPlan) -> String {
    let cast = plan.cast.as_deref().map(escape_format).unwrap_or_default();
    format!("{cast}{}", paint(color, plan.spec))
}

impl Synth<'_> {
    /// Report `node` into `sink`
    pub(super) fn report(&mut self, node: NodeId, context: Context, sink: &mut Sink) -> Result<(), RewriteError> {
        if self.tree.is_pure(node) {
            self.constant(node, sink);
            return Ok(());
        }
        let inner = self.tree.strip_saves(node);
        match self.tree.kind(inner).clone() {
            NodeKind::Binary { op, lhs, rhs } if op.is_logical_and() => {
                self.report_and(op == BinOp::EagerAnd, lhs, rhs, context, sink)
            }
            NodeKind::Binary { op, lhs, rhs } if op.is_logical_or() => {
                self.report_or(op == BinOp::EagerOr, lhs, rhs, context, sink)
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.operand(lhs, op, false, sink)?;
                sink.text(&format!(" {op} "));
                self.operand(rhs, op, true, sink)
            }
            NodeKind::Unary { op, operand } => {
                sink.text(&op.to_string());
                if is_operator(self.tree, operand) {
                    sink.text("(");
                    self.report(operand, Context::Value, sink)?;
                    sink.text(")");
                    Ok(())
                } else {
                    self.report(operand, Context::Value, sink)
                }
            }
            NodeKind::ImplicitConv(operand) if is_leaf(self.tree, operand) => self.leaf(node, sink),
            NodeKind::ImplicitConv(operand) => self.report(operand, context, sink),
            NodeKind::DeclRef(_) | NodeKind::Call { .. } => self.leaf(node, sink),
            other => unreachable!("{inner} ({other:?}) passed validation but cannot be reported"),
        }
    }

    fn operand(&mut self, child: NodeId, parent: BinOp, right: bool, sink: &mut Sink) -> Result<(), RewriteError> {
        if needs_parens(self.tree, child, parent, right) {
            sink.text("(");
            self.report(child, Context::Value, sink)?;
            sink.text(")");
            Ok(())
        } else {
            self.report(child, Context::Value, sink)
        }
    }

    /// `l && r`: if `l` held, only `r` decided the outcome
    fn report_and(
        &mut self,
        eager: bool,
        lhs: NodeId,
        rhs: NodeId,
        context: Context,
        sink: &mut Sink,
    ) -> Result<(), RewriteError> {
        self.branch(
            lhs,
            sink,
            |this, sink| {
                sink.text("(...) && (");
                this.report(rhs, context, sink)?;
                sink.text(")");
                Ok(())
            },
            |this, sink| {
                if !eager {
                    // The right operand never ran
                    return this.report(lhs, Context::Failed, sink);
                }
                sink.text("(");
                this.report(lhs, Context::Failed, sink)?;
                sink.text(") && (");
                this.report(rhs, Context::Value, sink)?;
                sink.text(")");
                Ok(())
            },
        )
    }

    /// `l || r`: when the whole is false both sides ran and both failed
    fn report_or(
        &mut self,
        eager: bool,
        lhs: NodeId,
        rhs: NodeId,
        context: Context,
        sink: &mut Sink,
    ) -> Result<(), RewriteError> {
        if context == Context::Failed || eager {
            sink.text("(");
            self.report(lhs, context, sink)?;
            sink.text(") || (");
            self.report(rhs, context, sink)?;
            sink.text(")");
            return Ok(());
        }
        self.branch(
            lhs,
            sink,
            |this, sink| {
                sink.text("(");
                this.report(lhs, Context::Value, sink)?;
                sink.text(") || (...)");
                Ok(())
            },
            |this, sink| {
                sink.text("(");
                this.report(lhs, Context::Failed, sink)?;
                sink.text(") || (");
                this.report(rhs, Context::Value, sink)?;
                sink.text(")");
                Ok(())
            },
        )
    }

    /// `if (cond) { taken } else { skipped }` on an already computed value
    fn branch<T, E>(&mut self, cond: NodeId, sink: &mut Sink, taken: T, skipped: E) -> Result<(), RewriteError>
    where
        T: FnOnce(&mut Self, &mut Sink) -> Result<(), RewriteError>,
        E: FnOnce(&mut Self, &mut Sink) -> Result<(), RewriteError>,
    {
        assert!(
            self.tree.is_reusable(cond),
            "branch on {cond}, which has no evaluate-once handle"
        );
        self.flush(sink);
        let before = self.listed.clone();

        let mut then_sink = Sink::default();
        taken(self, &mut then_sink)?;
        let then_stmts = self.finish(then_sink);
        let after_then = std::mem::replace(&mut self.listed, before);

        let mut else_sink = Sink::default();
        skipped(self, &mut else_sink)?;
        let else_stmts = self.finish(else_sink);
        let after_else = std::mem::take(&mut self.listed);

        self.listed = after_then.merge(after_else);
        let then = self.block(then_stmts);
        let else_ = self.block(else_stmts);
        let stmt = self.node(NodeKind::Cond { cond, then, else_ }, crate::ast::CType::Void);
        sink.stmts.push(stmt);
        Ok(())
    }

    /// Constants print as their text; null pointers print as `%p`
    fn constant(&mut self, node: NodeId, sink: &mut Sink) {
        if self.tree.ty(node).is_pointer() && self.tree.is_null_constant(node) {
            sink.main.value("%p", node);
        } else {
            let text = reconstruct(self.tree, self.decls, &mut self.colors, node);
            sink.text(&text);
        }
    }

    fn leaf(&mut self, node: NodeId, sink: &mut Sink) -> Result<(), RewriteError> {
        assert!(
            self.tree.is_reusable(node),
            "{node} is read by the report but has no evaluate-once handle"
        );
        let target = self.tree.strip_wrappers(node);
        let plan = format::resolve(self.tree, node)?;
        match self.tree.kind(target).clone() {
            NodeKind::DeclRef(decl) => {
                let color = self.colors.assign(Entity::Decl(decl));
                sink.main.value(&directive(color, &plan), node);
                self.list_variable(decl, node, color, sink)
            }
            NodeKind::Call { callee, args } => {
                let color = self.colors.assign(Entity::Call(target));
                sink.main.value(&directive(color, &plan), node);
                self.list_call(callee, &args, node, color, sink)
            }
            other => unreachable!("leaf {target} is {other:?}"),
        }
    }

    /// `  name = value`, once per variable on any run-time path
    fn list_variable(
        &mut self,
        decl: DeclId,
        node: NodeId,
        color: Option<Color>,
        sink: &mut Sink,
    ) -> Result<(), RewriteError> {
        if self.listed.definite.contains(&decl) {
            return Ok(());
        }
        let handle = leaf_handle(self.tree, node);
        let plan = format::resolve(self.tree, handle)?;
        let mut line = Segment::default();
        line.text(&format!("  {} = ", paint(color, self.decls.name(decl))));
        line.value(plan.spec, handle);
        line.text("\n");

        if self.listed.possible.contains(&decl) {
            // Written on some paths only: decide at run time
            let flag = self.flag(decl);
            self.flush(sink);
            let stmt = self.append_once(flag, self.sub, line);
            sink.stmts.push(stmt);
        } else {
            sink.sub.extend(line);
            if self.repeated(decl) {
                let flag = self.flag(decl);
                let set = self.set_flag(flag);
                sink.stmts.push(set);
            }
        }
        self.listed.definite.insert(decl);
        self.listed.possible.insert(decl);
        Ok(())
    }

    /// Subexpression line for a variable or call found inside an argument
    fn list_leaf(&mut self, node: NodeId, sink: &mut Sink) -> Result<(), RewriteError> {
        let target = self.tree.strip_wrappers(node);
        match self.tree.kind(target).clone() {
            NodeKind::DeclRef(decl) => {
                let color = self.colors.assign(Entity::Decl(decl));
                self.list_variable(decl, node, color, sink)
            }
            NodeKind::Call { callee, args } => {
                let color = self.colors.assign(Entity::Call(target));
                self.list_call(callee, &args, node, color, sink)
            }
            other => unreachable!("argument leaf {target} is {other:?}"),
        }
    }

    /// `  name(arg=value, ...) = result`, after the lines for what the
    /// arguments read
    fn list_call(
        &mut self,
        callee: DeclId,
        args: &[NodeId],
        node: NodeId,
        color: Option<Color>,
        sink: &mut Sink,
    ) -> Result<(), RewriteError> {
        for arg in args {
            let mut leaves = Vec::new();
            argument_leaves(self.tree, *arg, &mut leaves);
            for leaf in leaves {
                self.list_leaf(leaf, sink)?;
            }
        }

        let mut line = Segment::default();
        line.text(&format!("  {}(", paint(color, self.decls.name(callee))));
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                line.text(", ");
            }
            let text = reconstruct(self.tree, self.decls, &mut self.colors, *arg);
            line.text(&text);
            if self.tree.is_pure(*arg) {
                continue;
            }
            assert!(
                self.tree.is_reusable(*arg),
                "argument {arg} has no evaluate-once handle"
            );
            let plan = format::resolve(self.tree, *arg)?;
            let color = Entity::of(self.tree, *arg).and_then(|entity| self.colors.lookup(entity));
            line.text("=");
            line.value(&directive(color, &plan), *arg);
        }
        let handle = leaf_handle(self.tree, node);
        let plan = format::resolve(self.tree, handle)?;
        line.text(") = ");
        line.value(plan.spec, handle);
        line.text("\n");
        sink.sub.extend(line);
        Ok(())
    }
}
