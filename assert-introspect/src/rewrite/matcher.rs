//! Recognizes the expansion of `assert`

use crate::tree::{Decls, NodeId, NodeKind, Tree};

/// Parts of a recognized assertion
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionShape {
    /// The asserted condition
    pub cond: NodeId,
    /// Source text of the condition as the macro captured it
    pub text: String,
    /// File name argument of the failure call
    pub file: NodeId,
    /// Line argument of the failure call
    pub line: NodeId,
    /// Function name argument of the failure call, evaluated at run time
    pub function: NodeId,
}

/// Match `cond ? (void)0 : fail(text, file, line, function)`
///
/// Anything short of the full shape is rejected, leaving the node alone.
pub fn match_assertion(
    tree: &Tree,
    decls: &Decls,
    node: NodeId,
    fail_function: &str,
) -> Option<AssertionShape> {
    let NodeKind::Cond { cond, then, else_ } = tree.kind(node) else {
        return None;
    };
    if !matches!(tree.kind(*then), NodeKind::Nop) {
        return None;
    }
    let NodeKind::Call { callee, args } = tree.kind(*else_) else {
        return None;
    };
    if decls.name(*callee) != fail_function || !decls[*callee].is_function() {
        return None;
    }
    let [text, file, line, function] = args.as_slice() else {
        return None;
    };
    let NodeKind::StringConst(text) = tree.kind(tree.strip_wrappers(*text)) else {
        return None;
    };
    if !matches!(tree.kind(tree.strip_wrappers(*file)), NodeKind::StringConst(_))
        || !matches!(tree.kind(tree.strip_wrappers(*line)), NodeKind::IntConst { .. })
    {
        return None;
    }
    Some(AssertionShape {
        cond: *cond,
        text: text.clone(),
        file: *file,
        line: *line,
        function: *function,
    })
}

pub fn is_assertion(tree: &Tree, decls: &Decls, node: NodeId, fail_function: &str) -> bool {
    match_assertion(tree, decls, node, fail_function).is_some()
}
