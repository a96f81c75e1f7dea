//! Statements and the translation unit

use super::{DeclId, Decls, NodeId, Tree};
use crate::ast::Span;

/// Statement of a lowered function body
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(NodeId),
    Local { decl: DeclId, init: Option<NodeId> },
    Return(Option<NodeId>),
    If {
        cond: NodeId,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
}

/// Function definition
#[derive(Debug, Clone)]
pub struct Function {
    pub decl: DeclId,
    pub params: Vec<DeclId>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Top-level item, in source order
#[derive(Debug, Clone)]
pub enum Item {
    /// `#include <name>`
    Include(String),
    /// Prototype written in the source
    Prototype(DeclId),
    Global(DeclId),
    Function(Function),
}

/// A lowered translation unit
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub filename: String,
    pub tree: Tree,
    pub decls: Decls,
    pub items: Vec<Item>,
}

impl TranslationUnit {
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions().find(|f| self.decls.name(f.decl) == name)
    }

    pub fn globals(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Global(id) => Some(*id),
            _ => None,
        })
    }
}
