//! Parser tests for the C subset

use crate::ast::{BinOp, CType, Expr, IntRank, Item, Signedness, Stmt, UnOp};
use crate::lexer::tokenize;
use crate::parser::{parse, resolve_type, TypeWord};

/// Helper to parse a program and return the AST
fn parse_program(source: &str) -> crate::Result<crate::ast::Program> {
    let tokens = tokenize(source)?;
    parse("test.c", source, tokens)
}

/// Helper to parse and expect success
fn parse_ok(source: &str) -> crate::ast::Program {
    parse_program(source).expect("Parse should succeed")
}

/// Helper to check if parsing fails
fn parse_fails(source: &str) -> bool {
    parse_program(source).is_err()
}

/// Parse `int f(void) { return <expr>; }` and hand back the returned expression
fn parse_expr(expr: &str) -> Expr {
    let prog = parse_ok(&format!("int f(void) {{ return {expr}; }}"));
    let Item::FnDef(f) = &prog.items[0] else {
        panic!("Expected FnDef");
    };
    let body = f.body.as_ref().expect("definition has a body");
    match &body[0].node {
        Stmt::Return(Some(e)) => e.node.clone(),
        other => panic!("Expected return, got {other:?}"),
    }
}

// ============================================
// Declarations
// ============================================

#[test]
fn test_parse_function_definition() {
    let prog = parse_ok("int add(int a, int b) { return a + b; }");
    assert_eq!(prog.items.len(), 1);
    if let Item::FnDef(f) = &prog.items[0] {
        assert_eq!(f.name.node, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.ret_ty.node, CType::int());
        assert!(!f.variadic);
        assert!(f.body.is_some());
    } else {
        panic!("Expected FnDef");
    }
}

#[test]
fn test_parse_prototype_variadic() {
    let prog = parse_ok("int printf(const char *fmt, ...);");
    if let Item::FnDef(f) = &prog.items[0] {
        assert!(f.variadic);
        assert!(f.body.is_none());
        assert_eq!(f.params[0].ty.node, CType::char_ptr());
    } else {
        panic!("Expected FnDef");
    }
}

#[test]
fn test_parse_unnamed_params() {
    let prog = parse_ok("int f(int, char **);");
    if let Item::FnDef(f) = &prog.items[0] {
        assert!(f.params.iter().all(|p| p.name.is_none()));
        assert_eq!(f.params[1].ty.node, CType::pointer_to(CType::char_ptr()));
    } else {
        panic!("Expected FnDef");
    }
}

#[test]
fn test_parse_global_with_init() {
    let prog = parse_ok("static unsigned long counter = 3;");
    if let Item::Global(d) = &prog.items[0] {
        assert_eq!(d.name.node, "counter");
        assert!(d.is_static);
        assert!(d.init.is_some());
        assert_eq!(d.ty.node.int_type().map(|t| t.rank), Some(IntRank::Long));
    } else {
        panic!("Expected Global");
    }
}

#[test]
fn test_parse_array_local() {
    let prog = parse_ok("void f(void) { char buf[16]; }");
    let Item::FnDef(f) = &prog.items[0] else {
        panic!("Expected FnDef");
    };
    let body = f.body.as_ref().unwrap();
    if let Stmt::Decl(d) = &body[0].node {
        assert_eq!(d.ty.node, CType::Array(Box::new(CType::char()), 16));
    } else {
        panic!("Expected Decl");
    }
}

#[test]
fn test_parse_directive_item() {
    let prog = parse_ok("#include <assert.h>\nint x;");
    assert!(matches!(&prog.items[0], Item::Directive(d) if d.node == "include <assert.h>"));
    assert!(matches!(&prog.items[1], Item::Global(_)));
}

#[test]
fn test_parse_typedef_name() {
    let prog = parse_ok("size_t n;");
    if let Item::Global(d) = &prog.items[0] {
        assert_eq!(d.ty.node, CType::size_t());
    } else {
        panic!("Expected Global");
    }
}

// ============================================
// Statements
// ============================================

#[test]
fn test_parse_if_else_chain() {
    let prog = parse_ok("int f(int x) { if (x) { return 1; } else if (x > 2) { return 2; } else { return 3; } }");
    let Item::FnDef(f) = &prog.items[0] else {
        panic!("Expected FnDef");
    };
    let body = f.body.as_ref().unwrap();
    if let Stmt::If { else_body: Some(els), .. } = &body[0].node {
        assert_eq!(els.len(), 1);
        assert!(matches!(&els[0].node, Stmt::If { else_body: Some(_), .. }));
    } else {
        panic!("Expected If");
    }
}

#[test]
fn test_parse_assert_call_statement() {
    let prog = parse_ok("void f(int n) { assert(n == 3); }");
    let Item::FnDef(f) = &prog.items[0] else {
        panic!("Expected FnDef");
    };
    let body = f.body.as_ref().unwrap();
    if let Stmt::Expr(e) = &body[0].node {
        assert!(matches!(&e.node, Expr::Call { func, args } if func.node == "assert" && args.len() == 1));
    } else {
        panic!("Expected expression statement");
    }
}

#[test]
fn test_parse_statement_spans_cover_text() {
    let source = "void f(void) { g(1); }";
    let prog = parse_ok(source);
    let Item::FnDef(f) = &prog.items[0] else {
        panic!("Expected FnDef");
    };
    let stmt = &f.body.as_ref().unwrap()[0];
    assert_eq!(stmt.span.slice(source), Some("g(1);"));
}

// ============================================
// Expressions
// ============================================

#[test]
fn test_parse_precedence() {
    // a + b * c == d parses as (a + (b * c)) == d
    let Expr::Binary { left, op, .. } = parse_expr("a + b * c == d") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Eq);
    let Expr::Binary { op: inner, right, .. } = &left.node else {
        panic!("Expected Binary");
    };
    assert_eq!(*inner, BinOp::Add);
    assert!(matches!(&right.node, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_parse_logical_left_assoc() {
    let Expr::Binary { left, op, .. } = parse_expr("a || b || c") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Or);
    assert!(matches!(&left.node, Expr::Binary { op: BinOp::Or, .. }));
}

#[test]
fn test_parse_and_binds_tighter_than_or() {
    let Expr::Binary { right, op, .. } = parse_expr("a || b && c") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Or);
    assert!(matches!(&right.node, Expr::Binary { op: BinOp::And, .. }));
}

#[test]
fn test_parse_unary_ops() {
    assert!(matches!(parse_expr("!x"), Expr::Unary { op: UnOp::Not, .. }));
    assert!(matches!(parse_expr("-x"), Expr::Unary { op: UnOp::Neg, .. }));
    assert!(matches!(parse_expr("&x"), Expr::Unary { op: UnOp::AddrOf, .. }));
    assert!(matches!(parse_expr("a & b"), Expr::Binary { op: BinOp::BitAnd, .. }));
}

#[test]
fn test_parse_parenthesized() {
    let Expr::Binary { left, op, .. } = parse_expr("(a + b) * c") else {
        panic!("Expected Binary");
    };
    assert_eq!(op, BinOp::Mul);
    assert!(matches!(&left.node, Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn test_parse_call_args() {
    let Expr::Call { func, args } = parse_expr("strstr(\"abc\", \"b\")") else {
        panic!("Expected Call");
    };
    assert_eq!(func.node, "strstr");
    assert_eq!(args.len(), 2);
    assert!(matches!(&args[0].node, Expr::StringLit(s) if s == "abc"));
}

#[test]
fn test_parse_string_concatenation() {
    assert!(matches!(parse_expr("\"ab\" \"cd\""), Expr::StringLit(s) if s == "abcd"));
}

#[test]
fn test_parse_assignment_is_right_assoc() {
    let Expr::Assign { target, value } = parse_expr("a = b = 3") else {
        panic!("Expected Assign");
    };
    assert_eq!(target.node, "a");
    assert!(matches!(value.node, Expr::Assign { .. }));
}

// ============================================
// Errors
// ============================================

#[test]
fn test_parse_missing_semicolon() {
    assert!(parse_fails("int x"));
}

#[test]
fn test_parse_unbalanced_braces() {
    assert!(parse_fails("int f(void) { return 1;"));
}

#[test]
fn test_parse_bad_type_combination() {
    let err = parse_program("signed unsigned x;").unwrap_err();
    assert!(err.message().contains("signed"));
}

// ============================================
// Type specifiers
// ============================================

#[test]
fn test_resolve_type_orderings() {
    use TypeWord::*;
    let a = resolve_type(&[Unsigned, Long, Long, Int]).unwrap();
    let b = resolve_type(&[Long, Unsigned, Long]).unwrap();
    assert_eq!(a, b);
    let it = a.int_type().unwrap();
    assert_eq!(it.rank, IntRank::LongLong);
    assert_eq!(it.signedness, Signedness::Unsigned);
}

#[test]
fn test_resolve_type_char_spellings() {
    use TypeWord::*;
    assert_eq!(resolve_type(&[Char]).unwrap(), CType::char());
    let signed = resolve_type(&[Signed, Char]).unwrap();
    assert_eq!(signed.int_type().unwrap().signedness, Signedness::Signed);
    assert_eq!(signed.to_string(), "signed char");
}

#[test]
fn test_resolve_type_rejects() {
    use TypeWord::*;
    assert!(resolve_type(&[Short, Long]).is_err());
    assert!(resolve_type(&[Long, Long, Long]).is_err());
    assert!(resolve_type(&[Int, Char]).is_err());
    assert!(resolve_type(&[Qualifier]).is_err());
    assert!(resolve_type(&[Unsigned, Named("size_t".to_string())]).is_err());
}

#[test]
fn test_resolve_type_bare_unsigned() {
    assert_eq!(resolve_type(&[TypeWord::Unsigned]).unwrap(), CType::uint());
}
