//! Evaluate-once wrapping
//!
//! The report reads operand values after the condition has run. Every value
//! that is read again gets a `Save` handle so the second read reuses the
//! first evaluation instead of re-running calls.

use crate::tree::{NodeId, NodeKind, Tree};

/// Wrap the condition rooted at `node`, bottom-up
///
/// Returns the root of the wrapped copy. The original nodes are untouched;
/// operators are rebuilt over their wrapped operands. Constants and other
/// pure nodes stay as they are, and wrapping a handle again is a no-op.
pub fn wrap(tree: &mut Tree, node: NodeId) -> NodeId {
    if matches!(tree.kind(node), NodeKind::Save(_)) || tree.is_pure(node) {
        return node;
    }
    match tree.kind(node).clone() {
        NodeKind::Binary { op, lhs, rhs } => {
            let lhs = wrap(tree, lhs);
            let rhs = wrap(tree, rhs);
            let rebuilt = rebuild(tree, node, NodeKind::Binary { op, lhs, rhs });
            save(tree, rebuilt)
        }
        NodeKind::Unary { op, operand } => {
            let operand = wrap(tree, operand);
            let rebuilt = rebuild(tree, node, NodeKind::Unary { op, operand });
            save(tree, rebuilt)
        }
        NodeKind::ImplicitConv(inner) => {
            let inner = wrap(tree, inner);
            let rebuilt = rebuild(tree, node, NodeKind::ImplicitConv(inner));
            save(tree, rebuilt)
        }
        NodeKind::Call { callee, args } => {
            // Arguments are listed next to the return value and their
            // variables and calls get lines of their own
            let args = args.into_iter().map(|arg| wrap(tree, arg)).collect();
            let rebuilt = rebuild(tree, node, NodeKind::Call { callee, args });
            save(tree, rebuilt)
        }
        // An array names a fixed address and cannot be held in a temporary
        NodeKind::DeclRef(_) if tree.ty(node).is_array() => node,
        _ => save(tree, node),
    }
}

fn rebuild(tree: &mut Tree, like: NodeId, kind: NodeKind) -> NodeId {
    let (ty, span) = (tree.ty(like).clone(), tree.span(like));
    tree.push(kind, ty, span)
}

fn save(tree: &mut Tree, node: NodeId) -> NodeId {
    rebuild(tree, node, NodeKind::Save(node))
}
