//! Runtime values for the interpreter

use std::fmt;

/// What a pointer points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Null,
    /// A block of `Memory`
    Block(usize),
}

/// A pointer: a region and a byte offset into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub region: Region,
    pub offset: i64,
}

impl Address {
    pub const NULL: Address = Address {
        region: Region::Null,
        offset: 0,
    };

    pub fn block(block: usize) -> Self {
        Address {
            region: Region::Block(block),
            offset: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.region == Region::Null && self.offset == 0
    }

    pub fn offset_by(self, bytes: i64) -> Self {
        Address {
            offset: self.offset + bytes,
            ..self
        }
    }
}

/// Runtime value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Any integer type, already wrapped to its width
    Int(i128),
    Float(f64),
    Ptr(Address),
    /// Result of a `void` expression
    Void,
}

impl Value {
    pub const NULL: Value = Value::Ptr(Address::NULL);

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Ptr(addr) => !addr.is_null(),
            Value::Void => false,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "floating",
            Value::Ptr(_) => "pointer",
            Value::Void => "void",
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<Address> {
        match self {
            Value::Ptr(addr) => Some(*addr),
            Value::Int(0) => Some(Address::NULL),
            _ => None,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        Value::Int(i128::from(b))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Ptr(addr) => match addr.region {
                Region::Null => write!(f, "(nil)+{}", addr.offset),
                Region::Block(b) => write!(f, "block{b}+{}", addr.offset),
            },
            Value::Void => write!(f, "void"),
        }
    }
}
