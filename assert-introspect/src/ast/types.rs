//! C type model
//!
//! Sizes follow the LP64 ABI (x86_64 Linux): `char` is signed and 8 bits,
//! `long` and pointers are 64 bits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer conversion rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntRank {
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

/// How an integer type was spelled with respect to sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    /// Plain `char`, distinct from `signed char` by spelling only
    Plain,
    Signed,
    Unsigned,
}

/// A builtin integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntType {
    pub rank: IntRank,
    pub signedness: Signedness,
}

impl IntType {
    pub const CHAR: IntType = IntType::new(IntRank::Char, Signedness::Plain);
    pub const INT: IntType = IntType::new(IntRank::Int, Signedness::Signed);
    pub const UINT: IntType = IntType::new(IntRank::Int, Signedness::Unsigned);
    pub const LONG: IntType = IntType::new(IntRank::Long, Signedness::Signed);
    pub const ULONG: IntType = IntType::new(IntRank::Long, Signedness::Unsigned);

    pub const fn new(rank: IntRank, signedness: Signedness) -> Self {
        Self { rank, signedness }
    }

    pub fn is_signed(self) -> bool {
        !matches!(self.signedness, Signedness::Unsigned)
    }

    pub fn bits(self) -> u32 {
        match self.rank {
            IntRank::Char => 8,
            IntRank::Short => 16,
            IntRank::Int => 32,
            IntRank::Long | IntRank::LongLong => 64,
        }
    }

    pub fn to_unsigned(self) -> IntType {
        IntType::new(self.rank, Signedness::Unsigned)
    }

    /// Truncate `value` to this type's width, sign-extending signed types
    pub fn wrap(self, value: i128) -> i128 {
        let bits = self.bits();
        let mask = (1i128 << bits) - 1;
        let truncated = value & mask;
        if self.is_signed() && (truncated >> (bits - 1)) & 1 == 1 {
            truncated - (1i128 << bits)
        } else {
            truncated
        }
    }

    pub fn min_value(self) -> i128 {
        if self.is_signed() { -(1i128 << (self.bits() - 1)) } else { 0 }
    }

    pub fn max_value(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.bits() - 1)) - 1
        } else {
            (1i128 << self.bits()) - 1
        }
    }

    pub fn fits(self, value: i128) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }

    /// The canonical C spelling of this type
    pub fn name(self) -> &'static str {
        use IntRank::*;
        use Signedness::*;
        match (self.rank, self.signedness) {
            (Char, Plain) => "char",
            (Char, Signed) => "signed char",
            (Char, Unsigned) => "unsigned char",
            (Short, Unsigned) => "unsigned short",
            (Short, _) => "short",
            (Int, Unsigned) => "unsigned int",
            (Int, _) => "int",
            (Long, Unsigned) => "unsigned long",
            (Long, _) => "long",
            (LongLong, Unsigned) => "unsigned long long",
            (LongLong, _) => "long long",
        }
    }
}

/// Floating point kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    Float,
    Double,
}

/// A C type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CType {
    Void,
    Bool,
    Int(IntType),
    Float(FloatKind),
    Pointer(Box<CType>),
    Array(Box<CType>, usize),
    /// A typedef name and the type it stands for
    Typedef(String, Box<CType>),
}

impl CType {
    pub fn int() -> Self {
        CType::Int(IntType::INT)
    }

    pub fn uint() -> Self {
        CType::Int(IntType::UINT)
    }

    pub fn long() -> Self {
        CType::Int(IntType::LONG)
    }

    pub fn char() -> Self {
        CType::Int(IntType::CHAR)
    }

    pub fn pointer_to(inner: CType) -> Self {
        CType::Pointer(Box::new(inner))
    }

    pub fn char_ptr() -> Self {
        CType::pointer_to(CType::char())
    }

    pub fn void_ptr() -> Self {
        CType::pointer_to(CType::Void)
    }

    pub fn size_t() -> Self {
        CType::Typedef("size_t".to_string(), Box::new(CType::Int(IntType::ULONG)))
    }

    /// Look through typedef names
    pub fn strip_typedefs(&self) -> &CType {
        let mut ty = self;
        while let CType::Typedef(_, target) = ty {
            ty = target;
        }
        ty
    }

    /// Whether both types denote the same type once typedef names are ignored
    pub fn same_as(&self, other: &CType) -> bool {
        match (self.strip_typedefs(), other.strip_typedefs()) {
            (CType::Pointer(a), CType::Pointer(b)) => a.same_as(b),
            (CType::Array(a, n), CType::Array(b, m)) => n == m && a.same_as(b),
            (a, b) => a == b,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Void)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Bool)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Bool | CType::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Float(_))
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Array(..))
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    pub fn pointee(&self) -> Option<&CType> {
        match self.strip_typedefs() {
            CType::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&CType> {
        match self.strip_typedefs() {
            CType::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// Integer view of the type; `_Bool` counts as an unsigned 8-bit integer
    pub fn int_type(&self) -> Option<IntType> {
        match self.strip_typedefs() {
            CType::Int(it) => Some(*it),
            CType::Bool => Some(IntType::new(IntRank::Char, Signedness::Unsigned)),
            _ => None,
        }
    }

    /// Whether the type is `char`, `signed char` or `unsigned char`
    pub fn is_char(&self) -> bool {
        matches!(self.strip_typedefs(), CType::Int(IntType { rank: IntRank::Char, .. }))
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        match self.strip_typedefs() {
            CType::Void | CType::Bool => 1,
            CType::Int(it) => (it.bits() / 8) as usize,
            CType::Float(FloatKind::Float) => 4,
            CType::Float(FloatKind::Double) => 8,
            CType::Pointer(_) => 8,
            CType::Array(inner, n) => inner.size() * n,
            CType::Typedef(..) => unreachable!("typedefs are stripped"),
        }
    }

    /// Integer promotions; non-integer types are returned unchanged
    pub fn promote(&self) -> CType {
        match self.int_type() {
            Some(it) if it.rank < IntRank::Int => CType::int(),
            _ => self.clone(),
        }
    }

    /// Usual arithmetic conversions of two arithmetic operand types
    pub fn common_arithmetic(left: &CType, right: &CType) -> CType {
        if left.same_as(right) && !left.is_integer() {
            return left.clone();
        }
        if left.is_float() || right.is_float() {
            let double = [left, right].iter().any(|t| {
                matches!(t.strip_typedefs(), CType::Float(FloatKind::Double))
            });
            return CType::Float(if double { FloatKind::Double } else { FloatKind::Float });
        }

        let lp = left.promote();
        let rp = right.promote();
        if lp.same_as(&rp) {
            return lp;
        }
        let (Some(l), Some(r)) = (lp.int_type(), rp.int_type()) else {
            return lp;
        };
        if l.is_signed() == r.is_signed() {
            return if l.rank >= r.rank { lp } else { rp };
        }
        let (signed, unsigned, signed_ty, unsigned_ty) = if l.is_signed() {
            (l, r, lp, rp)
        } else {
            (r, l, rp, lp)
        };
        if unsigned.rank >= signed.rank {
            unsigned_ty
        } else if signed.bits() > unsigned.bits() {
            signed_ty
        } else {
            CType::Int(signed.to_unsigned())
        }
    }

    /// Write a declaration of `name` with this type, e.g. `char buf[16]`
    pub fn declare(&self, name: &str) -> String {
        match self {
            CType::Array(inner, n) => format!("{}[{n}]", inner.declare(name)),
            CType::Pointer(_) => {
                let text = self.to_string();
                format!("{text}{name}")
            }
            _ => format!("{self} {name}"),
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Bool => write!(f, "_Bool"),
            CType::Int(it) => write!(f, "{}", it.name()),
            CType::Float(FloatKind::Float) => write!(f, "float"),
            CType::Float(FloatKind::Double) => write!(f, "double"),
            CType::Pointer(inner) => {
                if matches!(**inner, CType::Pointer(_)) {
                    write!(f, "{inner}*")
                } else {
                    write!(f, "{inner} *")
                }
            }
            CType::Array(inner, n) => write!(f, "{inner}[{n}]"),
            CType::Typedef(name, _) => write!(f, "{name}"),
        }
    }
}

/// Look up one of the typedef names the standard headers provide
pub fn standard_typedef(name: &str) -> Option<CType> {
    use IntRank::*;
    use Signedness::*;
    let target = match name {
        "bool" => CType::Bool,
        "size_t" | "uintptr_t" | "uintmax_t" | "uint64_t" => {
            CType::Int(IntType::new(Long, Unsigned))
        }
        "ssize_t" | "ptrdiff_t" | "intptr_t" | "intmax_t" | "int64_t" => {
            CType::Int(IntType::new(Long, Signed))
        }
        "int8_t" => CType::Int(IntType::new(Char, Signed)),
        "uint8_t" => CType::Int(IntType::new(Char, Unsigned)),
        "int16_t" => CType::Int(IntType::new(Short, Signed)),
        "uint16_t" => CType::Int(IntType::new(Short, Unsigned)),
        "int32_t" => CType::Int(IntType::new(Int, Signed)),
        "uint32_t" => CType::Int(IntType::new(Int, Unsigned)),
        _ => return None,
    };
    Some(CType::Typedef(name.to_string(), Box::new(target)))
}
