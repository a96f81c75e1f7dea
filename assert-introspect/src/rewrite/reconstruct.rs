//! Static text of a condition
//!
//! Renders the expression as source text, independent of run-time values.
//! Names are colored through the shared allocator, so calling this after the
//! runtime report has been built reuses the colors the report picked.

use super::colors::{paint, ColorAllocator, Entity};
use super::RewriteError;
use crate::ast::{BinOp, OpClass};
use crate::tree::{Decls, NodeId, NodeKind, Tree};
use crate::util::escape_c_string;

/// Render `node` as C source text
///
/// Handles and implicit conversions are invisible here. The node must have
/// passed [`ensure_renderable`].
pub fn reconstruct(tree: &Tree, decls: &Decls, colors: &mut ColorAllocator, node: NodeId) -> String {
    let node = tree.strip_wrappers(node);
    match tree.kind(node) {
        NodeKind::Binary { op, lhs, rhs } if op.class() == OpClass::Logical => {
            let lhs = reconstruct(tree, decls, colors, *lhs);
            let rhs = reconstruct(tree, decls, colors, *rhs);
            format!("({lhs}) {} ({rhs})", logical_spelling(*op))
        }
        NodeKind::Binary { op, lhs, rhs } => {
            let left = operand(tree, decls, colors, *lhs, *op, false);
            let right = operand(tree, decls, colors, *rhs, *op, true);
            format!("{left} {op} {right}")
        }
        NodeKind::Unary { op, operand } => {
            let text = reconstruct(tree, decls, colors, *operand);
            if is_operator(tree, *operand) {
                format!("{op}({text})")
            } else {
                format!("{op}{text}")
            }
        }
        NodeKind::DeclRef(decl) => {
            let color = colors.assign(Entity::Decl(*decl));
            paint(color, decls.name(*decl))
        }
        NodeKind::Call { callee, args } => {
            let color = colors.assign(Entity::Call(node));
            let args: Vec<_> = args.iter().map(|arg| reconstruct(tree, decls, colors, *arg)).collect();
            format!("{}({})", paint(color, decls.name(*callee)), args.join(", "))
        }
        NodeKind::AddressOf(inner) => format!("&{}", reconstruct(tree, decls, colors, *inner)),
        NodeKind::IntConst { text, .. } | NodeKind::FloatConst { text, .. } => text.clone(),
        NodeKind::StringConst(s) => format!("\"{}\"", escape_c_string(s)),
        NodeKind::FuncName => "__func__".to_string(),
        other => unreachable!("{node} ({other:?}) passed validation but cannot be rendered"),
    }
}

/// Check that [`reconstruct`] can render every node under `node`
pub fn ensure_renderable(tree: &Tree, node: NodeId) -> Result<(), RewriteError> {
    let node = tree.strip_wrappers(node);
    match tree.kind(node) {
        NodeKind::Binary { lhs, rhs, .. } => {
            ensure_renderable(tree, *lhs)?;
            ensure_renderable(tree, *rhs)
        }
        NodeKind::Unary { operand, .. } | NodeKind::AddressOf(operand) => {
            ensure_renderable(tree, *operand)
        }
        NodeKind::Call { args, .. } => args.iter().try_for_each(|arg| ensure_renderable(tree, *arg)),
        NodeKind::DeclRef(_)
        | NodeKind::IntConst { .. }
        | NodeKind::FloatConst { .. }
        | NodeKind::StringConst(_)
        | NodeKind::FuncName => Ok(()),
        other => Err(RewriteError::UnsupportedExpression(describe(other).to_string())),
    }
}

/// How logical operators read in both reports
pub fn logical_spelling(op: BinOp) -> &'static str {
    if op.is_logical_and() { "&&" } else { "||" }
}

/// Whether `child`, as an operand of `parent`, must be parenthesized
///
/// Needed when the child binds looser than the parent, or equally tight on
/// the right-hand side of a left-associative operator.
pub fn needs_parens(tree: &Tree, child: NodeId, parent: BinOp, right: bool) -> bool {
    match tree.kind(tree.strip_wrappers(child)) {
        NodeKind::Binary { op, .. } => {
            op.precedence() < parent.precedence() || (right && op.precedence() == parent.precedence())
        }
        _ => false,
    }
}

/// Whether `node` is an operator application once wrappers are stripped
pub fn is_operator(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.kind(tree.strip_wrappers(node)), NodeKind::Binary { .. })
}

fn operand(
    tree: &Tree,
    decls: &Decls,
    colors: &mut ColorAllocator,
    child: NodeId,
    parent: BinOp,
    right: bool,
) -> String {
    let text = reconstruct(tree, decls, colors, child);
    if needs_parens(tree, child, parent, right) {
        format!("({text})")
    } else {
        text
    }
}

/// Human readable name of a node kind, for diagnostics
pub fn describe(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::IntConst { .. } => "integer constant",
        NodeKind::FloatConst { .. } => "floating constant",
        NodeKind::StringConst(_) => "string literal",
        NodeKind::DeclRef(_) => "variable reference",
        NodeKind::FuncName => "__func__",
        NodeKind::AddressOf(_) => "address-of",
        NodeKind::Unary { .. } => "unary operator",
        NodeKind::Binary { .. } => "binary operator",
        NodeKind::Call { .. } => "call",
        NodeKind::ImplicitConv(_) => "implicit conversion",
        NodeKind::Assign { .. } => "assignment",
        NodeKind::Save(_) => "evaluate-once handle",
        NodeKind::Cond { .. } => "conditional expression",
        NodeKind::Nop => "no-op",
        NodeKind::Block(_) => "block",
        NodeKind::Local { .. } => "declaration",
        NodeKind::ZeroInit => "initializer",
    }
}
