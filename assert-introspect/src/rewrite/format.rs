//! Format resolution for leaf values
//!
//! Every value the generated code prints goes through a printf-style
//! directive chosen from the value's static type.

use super::RewriteError;
use crate::ast::CType;
use crate::tree::{NodeId, NodeKind, Tree};

/// How one occurrence of a leaf is printed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPlan {
    /// printf directive, possibly with surrounding literal text (`"%s"`)
    pub spec: &'static str,
    /// `(type)` shown before the value when the occurrence is implicitly converted
    pub cast: Option<String>,
}

/// Integer directives by the type's spelled name
const INTEGER_SPECS: &[(&str, &str)] = &[
    ("char", "%hhd"),
    ("signed char", "%hhd"),
    ("unsigned char", "%hhu"),
    ("short", "%hd"),
    ("unsigned short", "%hu"),
    ("int", "%d"),
    ("unsigned int", "%u"),
    ("long", "%ld"),
    ("unsigned long", "%lu"),
    ("long long", "%lld"),
    ("unsigned long long", "%llu"),
    ("size_t", "%zu"),
    ("ssize_t", "%zd"),
    ("ptrdiff_t", "%td"),
    ("intmax_t", "%jd"),
    ("uintmax_t", "%ju"),
];

/// Choose the format of the value `node` produces
///
/// Evaluate-once handles are transparent. A leading implicit conversion
/// contributes a cast prefix, except for array decay.
pub fn resolve(tree: &Tree, node: NodeId) -> Result<FormatPlan, RewriteError> {
    let node = tree.strip_saves(node);
    let cast = match tree.kind(node) {
        NodeKind::ImplicitConv(inner) if !tree.ty(tree.strip_saves(*inner)).is_array() => {
            Some(format!("({})", tree.ty(node)))
        }
        _ => None,
    };
    let spec = spec_for_type(tree.ty(node), tree.is_null_constant(node))?;
    Ok(FormatPlan { spec, cast })
}

/// The directive for a value of type `ty`
///
/// `null_literal` marks a null pointer constant, which never prints as a string.
pub fn spec_for_type(ty: &CType, null_literal: bool) -> Result<&'static str, RewriteError> {
    if let Some(pointee) = ty.pointee() {
        return Ok(if pointee.is_char() && !null_literal { "\"%s\"" } else { "%p" });
    }
    if ty.is_bool() {
        return Ok("%d");
    }
    if ty.is_integer() {
        return Ok(integer_spec(ty));
    }
    Err(RewriteError::UnsupportedType(ty.to_string()))
}

fn integer_spec(ty: &CType) -> &'static str {
    let mut current = ty;
    loop {
        let name = match current {
            CType::Typedef(name, _) => name.as_str(),
            CType::Int(it) => it.name(),
            _ => break,
        };
        if let Some((_, spec)) = INTEGER_SPECS.iter().find(|(n, _)| *n == name) {
            return spec;
        }
        match current {
            CType::Typedef(_, target) => current = target,
            _ => break,
        }
    }
    match ty.int_type() {
        Some(it) if !it.is_signed() => "%u",
        _ => "%d",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{standard_typedef, IntRank, IntType, Signedness, Span};

    fn spec(ty: CType) -> &'static str {
        spec_for_type(&ty, false).unwrap()
    }

    #[test]
    fn test_builtin_integers() {
        assert_eq!(spec(CType::int()), "%d");
        assert_eq!(spec(CType::uint()), "%u");
        assert_eq!(spec(CType::long()), "%ld");
        assert_eq!(spec(CType::char()), "%hhd");
        assert_eq!(
            spec(CType::Int(IntType::new(IntRank::LongLong, Signedness::Unsigned))),
            "%llu"
        );
        assert_eq!(spec(CType::Int(IntType::new(IntRank::Short, Signedness::Signed))), "%hd");
    }

    #[test]
    fn test_typedef_names() {
        assert_eq!(spec(CType::size_t()), "%zu");
        assert_eq!(spec(standard_typedef("ptrdiff_t").unwrap()), "%td");
        assert_eq!(spec(standard_typedef("intmax_t").unwrap()), "%jd");
    }

    #[test]
    fn test_unknown_typedef_strips_one_level() {
        assert_eq!(spec(standard_typedef("uint8_t").unwrap()), "%hhu");
        assert_eq!(spec(standard_typedef("int32_t").unwrap()), "%d");
        let nested = CType::Typedef("count_t".into(), Box::new(CType::size_t()));
        assert_eq!(spec(nested), "%zu");
    }

    #[test]
    fn test_pointers() {
        assert_eq!(spec(CType::char_ptr()), "\"%s\"");
        assert_eq!(spec(CType::void_ptr()), "%p");
        assert_eq!(spec(CType::pointer_to(CType::int())), "%p");
        assert_eq!(spec_for_type(&CType::char_ptr(), true).unwrap(), "%p");
    }

    #[test]
    fn test_bool() {
        assert_eq!(spec(CType::Bool), "%d");
        assert_eq!(spec(standard_typedef("bool").unwrap()), "%d");
    }

    #[test]
    fn test_float_is_unsupported() {
        let err = spec_for_type(&CType::Float(crate::ast::FloatKind::Double), false).unwrap_err();
        assert_eq!(err, RewriteError::UnsupportedType("double".into()));
    }

    #[test]
    fn test_same_type_same_spec() {
        for ty in [CType::int(), CType::size_t(), CType::char_ptr(), CType::Bool] {
            assert_eq!(spec(ty.clone()), spec(ty));
        }
    }

    #[test]
    fn test_cast_prefix() {
        let mut tree = Tree::new();
        let mut decls = crate::tree::Decls::new();
        let c = decls.push(crate::tree::Decl::local("c", CType::char(), Span::default()));
        let var = tree.push(NodeKind::DeclRef(c), CType::char(), Span::default());
        let saved = tree.push(NodeKind::Save(var), CType::char(), Span::default());
        let conv = tree.push(NodeKind::ImplicitConv(saved), CType::int(), Span::default());
        let plan = resolve(&tree, conv).unwrap();
        assert_eq!(plan, FormatPlan { spec: "%d", cast: Some("(int)".into()) });
        let plain = resolve(&tree, saved).unwrap();
        assert_eq!(plain, FormatPlan { spec: "%hhd", cast: None });
    }

    #[test]
    fn test_array_decay_has_no_prefix() {
        let mut tree = Tree::new();
        let mut decls = crate::tree::Decls::new();
        let array = CType::Array(Box::new(CType::char()), 8);
        let buf = decls.push(crate::tree::Decl::local("buf", array.clone(), Span::default()));
        let var = tree.push(NodeKind::DeclRef(buf), array, Span::default());
        let decay = tree.push(NodeKind::ImplicitConv(var), CType::char_ptr(), Span::default());
        let plan = resolve(&tree, decay).unwrap();
        assert_eq!(plan, FormatPlan { spec: "\"%s\"", cast: None });
    }

    #[test]
    fn test_null_constant_prints_as_pointer() {
        let mut tree = Tree::new();
        let zero = tree.push(
            NodeKind::IntConst { value: 0, text: "NULL".into() },
            CType::int(),
            Span::default(),
        );
        let conv = tree.push(NodeKind::ImplicitConv(zero), CType::char_ptr(), Span::default());
        assert_eq!(resolve(&tree, conv).unwrap().spec, "%p");
    }
}
