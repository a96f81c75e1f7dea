//! Abstract Syntax Tree definitions
//!
//! The untyped tree the parser produces. `sema` lowers it into the typed
//! arena in `tree`.

mod expr;
mod span;
mod types;

pub use expr::*;
pub use span::*;
pub use types::*;

use serde::{Deserialize, Serialize};

/// A translation unit is a sequence of top-level items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// Preprocessor line, text after `#`
    Directive(Spanned<String>),
    FnDef(FnDef),
    Global(VarDecl),
}

/// Function declaration or definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDef {
    pub ret_ty: Spanned<CType>,
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// `None` for a prototype
    pub body: Option<Vec<Spanned<Stmt>>>,
    pub span: Span,
}

/// Function parameter; prototypes may omit the name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Option<Spanned<String>>,
    pub ty: Spanned<CType>,
}

/// Variable declaration, global or local
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: Spanned<CType>,
    pub name: Spanned<String>,
    pub init: Option<Spanned<Expr>>,
    /// Declared `static`: a local keeps its value across calls
    pub is_static: bool,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Empty,
    Expr(Spanned<Expr>),
    Decl(VarDecl),
    Return(Option<Spanned<Expr>>),
    If {
        cond: Spanned<Expr>,
        then_body: Vec<Spanned<Stmt>>,
        /// `else if` chains nest as a single `If` statement
        else_body: Option<Vec<Spanned<Stmt>>>,
    },
    Block(Vec<Spanned<Stmt>>),
}
