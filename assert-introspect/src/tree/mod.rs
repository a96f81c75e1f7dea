//! Typed expression arena
//!
//! `sema` lowers the syntax tree into nodes stored here. Nodes are addressed
//! by `NodeId` and never change once pushed: the rewriter builds replacement
//! subtrees out of new nodes and rewires the statement that held the old one.

mod decl;
mod stmt;

pub use decl::*;
pub use stmt::*;

use crate::ast::{BinOp, CType, Span, UnOp};
use std::fmt;

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node kind
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Integer constant with its spelling (`42`, `'a'`, `NULL`, `true`)
    IntConst { value: i128, text: String },
    FloatConst { value: f64, text: String },
    /// String literal, typed `char *`
    StringConst(String),
    /// Reference to a variable or parameter
    DeclRef(DeclId),
    /// `__func__`, the enclosing function's name at run time
    FuncName,
    /// `&x`
    AddressOf(NodeId),
    /// `!x`, `-x`, `~x`
    Unary { op: UnOp, operand: NodeId },
    Binary { op: BinOp, lhs: NodeId, rhs: NodeId },
    Call { callee: DeclId, args: Vec<NodeId> },
    /// Conversion of the operand to this node's type
    ImplicitConv(NodeId),
    /// `target = value`, or `target op= value`
    Assign {
        target: DeclId,
        op: Option<BinOp>,
        value: NodeId,
    },
    /// Evaluate-once handle: the operand runs the first time the handle is
    /// reached within a statement, later reads reuse the value
    Save(NodeId),
    /// `cond ? then : else_`; at statement level an if/else
    Cond {
        cond: NodeId,
        then: NodeId,
        else_: NodeId,
    },
    /// `(void)0`
    Nop,
    /// Compound statement in expression position
    Block(Vec<NodeId>),
    /// Local declaration inside a `Block`
    Local { decl: DeclId, init: Option<NodeId> },
    /// `{0}` initializer for an aggregate
    ZeroInit,
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: CType,
    pub span: Span,
}

/// The node arena
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, ty: CType, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, ty, span });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn ty(&self, id: NodeId) -> &CType {
        &self.get(id).ty
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.get(id).span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node pushed after the arena had `len` nodes
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Look through evaluate-once handles
    pub fn strip_saves(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Save(inner) = self.kind(id) {
            id = *inner;
        }
        id
    }

    /// Look through evaluate-once handles and implicit conversions
    pub fn strip_wrappers(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.kind(id) {
                NodeKind::Save(inner) | NodeKind::ImplicitConv(inner) => id = *inner,
                _ => return id,
            }
        }
    }

    /// Whether the node is an integer constant zero used as a null pointer
    pub fn is_null_constant(&self, id: NodeId) -> bool {
        matches!(self.kind(self.strip_wrappers(id)), NodeKind::IntConst { value: 0, .. })
    }

    /// Whether evaluating the node twice is indistinguishable from evaluating it once
    ///
    /// Constants, `__func__` and `&x` qualify; so do conversions of them.
    pub fn is_pure(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::IntConst { .. }
            | NodeKind::FloatConst { .. }
            | NodeKind::StringConst(_)
            | NodeKind::FuncName
            | NodeKind::AddressOf(_) => true,
            NodeKind::ImplicitConv(inner) => self.is_pure(*inner),
            _ => false,
        }
    }

    /// Whether the node may be read again without re-running side effects
    pub fn is_reusable(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Save(_)) || self.is_pure(id)
    }

    /// Direct children in evaluation order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::IntConst { .. }
            | NodeKind::FloatConst { .. }
            | NodeKind::StringConst(_)
            | NodeKind::DeclRef(_)
            | NodeKind::FuncName
            | NodeKind::Nop
            | NodeKind::ZeroInit => vec![],
            NodeKind::AddressOf(inner)
            | NodeKind::ImplicitConv(inner)
            | NodeKind::Save(inner)
            | NodeKind::Unary { operand: inner, .. }
            | NodeKind::Assign { value: inner, .. } => vec![*inner],
            NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            NodeKind::Call { args, .. } => args.clone(),
            NodeKind::Cond { cond, then, else_ } => vec![*cond, *then, *else_],
            NodeKind::Block(items) => items.clone(),
            NodeKind::Local { init, .. } => init.iter().copied().collect(),
        }
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id)
    }
}
