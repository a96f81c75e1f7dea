//! Expression AST nodes

use super::Spanned;
use serde::{Deserialize, Serialize};

/// An integer literal as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntLiteral {
    pub value: u64,
    /// `u`/`U` suffix present
    pub unsigned: bool,
    /// Number of `l`/`L` in the suffix
    pub longs: u8,
    /// Literal was written in hex or octal
    pub non_decimal: bool,
    /// Source spelling
    pub text: String,
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal
    IntLit(IntLiteral),
    /// Floating literal: value and spelling
    FloatLit(f64, String),
    /// Character literal: value and spelling (including quotes)
    CharLit(u8, String),
    /// String literal, escapes resolved; adjacent literals are concatenated
    StringLit(String),

    /// Identifier reference
    Ident(String),

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Call of a named function
    Call {
        func: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },

    /// Simple assignment to a variable: name = value
    Assign {
        target: Spanned<String>,
        value: Box<Spanned<Expr>>,
    },
}

/// Operator class, as the rewriter distinguishes them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Arithmetic,
    Relational,
    Logical,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical, short-circuiting
    And,
    Or,

    /// Logical and without short-circuit: `&` on two truth values
    EagerAnd,
    /// Logical or without short-circuit: `|` on two truth values
    EagerOr,
}

impl BinOp {
    pub fn class(self) -> OpClass {
        match self {
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                OpClass::Relational
            }
            BinOp::And | BinOp::Or | BinOp::EagerAnd | BinOp::EagerOr => OpClass::Logical,
            _ => OpClass::Arithmetic,
        }
    }

    pub fn is_logical_and(self) -> bool {
        matches!(self, BinOp::And | BinOp::EagerAnd)
    }

    pub fn is_logical_or(self) -> bool {
        matches!(self, BinOp::Or | BinOp::EagerOr)
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Binding strength, higher binds tighter (C precedence levels)
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div | BinOp::Mod => 10,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => 7,
            BinOp::Eq | BinOp::Ne => 6,
            BinOp::BitAnd | BinOp::EagerAnd => 5,
            BinOp::BitXor => 4,
            BinOp::BitOr | BinOp::EagerOr => 3,
            BinOp::And => 2,
            BinOp::Or => 1,
        }
    }

    /// C spelling
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd | BinOp::EagerAnd => "&",
            BinOp::BitOr | BinOp::EagerOr => "|",
            BinOp::BitXor => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Logical not (!)
    Not,
    /// Negation (-)
    Neg,
    /// Bitwise complement (~)
    BitNot,
    /// Address-of (&)
    AddrOf,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Not => write!(f, "!"),
            UnOp::Neg => write!(f, "-"),
            UnOp::BitNot => write!(f, "~"),
            UnOp::AddrOf => write!(f, "&"),
        }
    }
}
