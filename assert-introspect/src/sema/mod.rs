//! Semantic analysis
//!
//! Resolves names, types every expression the way a C compiler does and
//! lowers the syntax tree into the typed arena. Implicit conversions become
//! explicit `ImplicitConv` nodes and `assert(e)` statements expand into the
//! conditional shape `<assert.h>` produces.

pub mod headers;

use std::collections::{HashMap, HashSet};

use crate::ast::{self, BinOp, CType, Expr, FloatKind, IntLiteral, IntRank, IntType, OpClass, Signedness, Span, Spanned, UnOp};
use crate::error::{CompileError, Result};
use crate::tree::{Decl, DeclId, DeclKind, DeclOrigin, Decls, FnSig, Function, Item, NodeId, NodeKind, Stmt, Tree, TranslationUnit};
use crate::util::{collapse_whitespace, find_similar_name, format_suggestion_hint};

/// Name of the function `assert` reports failures through
pub const ASSERT_FAIL: &str = "__assert_fail";

/// Lower a parsed program into a translation unit
pub fn analyze(filename: &str, source: &str, program: &ast::Program) -> Result<TranslationUnit> {
    let mut analyzer = Analyzer::new(filename, source);
    for item in &program.items {
        analyzer.item(item)?;
    }
    Ok(analyzer.finish())
}

/// Semantic analyzer state
struct Analyzer<'a> {
    filename: &'a str,
    source: &'a str,
    tree: Tree,
    decls: Decls,
    items: Vec<Item>,
    /// Innermost scope last; index 0 is file scope
    scopes: Vec<HashMap<String, DeclId>>,
    headers: HashSet<&'static str>,
    /// Functions that already have a body
    defined: HashSet<DeclId>,
    current_fn: Option<DeclId>,
}

impl<'a> Analyzer<'a> {
    fn new(filename: &'a str, source: &'a str) -> Self {
        Self {
            filename,
            source,
            tree: Tree::new(),
            decls: Decls::new(),
            items: Vec::new(),
            scopes: vec![HashMap::new()],
            headers: HashSet::new(),
            defined: HashSet::new(),
            current_fn: None,
        }
    }

    fn finish(self) -> TranslationUnit {
        TranslationUnit {
            filename: self.filename.to_string(),
            tree: self.tree,
            decls: self.decls,
            items: self.items,
        }
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn lookup(&self, name: &str) -> Option<DeclId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    fn bind(&mut self, name: &str, id: DeclId, span: Span) -> Result<()> {
        let depth = self.scopes.len() - 1;
        if self.scopes[depth].insert(name.to_string(), id).is_some() {
            return Err(CompileError::semantic(format!("redefinition of '{name}'"), span));
        }
        Ok(())
    }

    fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn unknown_name(&self, name: &str, span: Span, what: &str) -> CompileError {
        let mut names: Vec<&str> = self.scopes.iter().flat_map(|s| s.keys().map(String::as_str)).collect();
        names.extend(["NULL", "true", "false", "__func__"]);
        let hint = format_suggestion_hint(find_similar_name(name, &names, 2));
        CompileError::semantic(format!("{what} '{name}'{hint}"), span)
    }

    fn has_header(&self, pred: fn(&str) -> bool) -> bool {
        self.headers.iter().any(|h| pred(h))
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn item(&mut self, item: &ast::Item) -> Result<()> {
        match item {
            ast::Item::Directive(d) => self.directive(d),
            ast::Item::FnDef(f) => self.function(f),
            ast::Item::Global(v) => self.global(v),
        }
    }

    fn directive(&mut self, d: &Spanned<String>) -> Result<()> {
        let Some(target) = headers::include_target(&d.node) else {
            tracing::warn!(directive = %d.node, "ignoring preprocessor directive");
            return Ok(());
        };
        let Some(header) = headers::KNOWN_HEADERS.iter().copied().find(|h| *h == target) else {
            tracing::warn!(header = target, "unknown header, nothing declared");
            self.items.push(Item::Include(target.to_string()));
            return Ok(());
        };
        if !self.headers.insert(header) {
            return Ok(());
        }
        for (name, sig) in headers::functions(header) {
            if self.scopes[0].contains_key(name) {
                continue;
            }
            let id = self.decls.push(Decl::function(name, sig, d.span).with_origin(DeclOrigin::Header(header)));
            self.scopes[0].insert(name.to_string(), id);
        }
        self.items.push(Item::Include(header.to_string()));
        Ok(())
    }

    fn signature(&self, f: &ast::FnDef) -> Result<FnSig> {
        let mut params = Vec::new();
        let void_only = f.params.len() == 1 && f.params[0].ty.node.is_void() && f.params[0].name.is_none();
        if !void_only {
            for p in &f.params {
                if p.ty.node.is_void() {
                    return Err(CompileError::semantic("parameter has void type", p.ty.span));
                }
                params.push(adjust_param_type(&p.ty.node));
            }
        }
        if f.ret_ty.node.is_array() {
            return Err(CompileError::semantic("function cannot return an array", f.ret_ty.span));
        }
        Ok(FnSig {
            ret: f.ret_ty.node.clone(),
            params,
            variadic: f.variadic,
        })
    }

    fn function(&mut self, f: &ast::FnDef) -> Result<()> {
        let sig = self.signature(f)?;
        let name = &f.name.node;
        let id = match self.scopes[0].get(name).copied() {
            Some(prev) => {
                let existing = self.decls.get(prev).signature().cloned().ok_or_else(|| {
                    CompileError::semantic(format!("'{name}' redeclared as a different kind of symbol"), f.name.span)
                })?;
                if !signatures_match(&existing, &sig) {
                    return Err(CompileError::semantic(format!("conflicting types for '{name}'"), f.name.span));
                }
                prev
            }
            None => {
                let id = self.decls.push(Decl::function(name.clone(), sig.clone(), f.name.span));
                self.scopes[0].insert(name.clone(), id);
                id
            }
        };

        let Some(body) = &f.body else {
            if self.decls.get(id).origin == DeclOrigin::Source {
                self.items.push(Item::Prototype(id));
            }
            return Ok(());
        };
        if !self.defined.insert(id) {
            return Err(CompileError::semantic(format!("redefinition of '{name}'"), f.name.span));
        }
        // A definition takes over the declaration, even one a header made
        self.decls.get_mut(id).origin = DeclOrigin::Source;
        self.decls.get_mut(id).span = f.name.span;

        self.current_fn = Some(id);
        let result = self.with_scope(|this| {
            let mut params = Vec::new();
            for (p, ty) in f.params.iter().zip(sig.params.iter()) {
                let Some(pname) = &p.name else {
                    return Err(CompileError::semantic("parameter name omitted", p.ty.span));
                };
                let decl = Decl {
                    name: pname.node.clone(),
                    ty: ty.clone(),
                    kind: DeclKind::Param,
                    origin: DeclOrigin::Source,
                    span: pname.span,
                };
                let pid = this.decls.push(decl);
                this.bind(&pname.node, pid, pname.span)?;
                params.push(pid);
            }
            let body = this.block(body)?;
            Ok(Function {
                decl: id,
                params,
                body,
                span: f.span,
            })
        });
        self.current_fn = None;
        self.items.push(Item::Function(result?));
        Ok(())
    }

    fn global(&mut self, v: &ast::VarDecl) -> Result<()> {
        self.check_object_type(&v.ty)?;
        let init = self.static_init(v)?;
        let id = self.decls.push(Decl {
            name: v.name.node.clone(),
            ty: v.ty.node.clone(),
            kind: DeclKind::Global { init },
            origin: DeclOrigin::Source,
            span: v.name.span,
        });
        self.bind(&v.name.node, id, v.name.span)?;
        self.items.push(Item::Global(id));
        Ok(())
    }

    /// Initializer of an object with static storage: must be a constant
    fn static_init(&mut self, v: &ast::VarDecl) -> Result<Option<NodeId>> {
        let Some(init) = &v.init else {
            return Ok(None);
        };
        let node = self.initializer(&v.ty.node, init)?;
        if !self.tree.is_pure(node) {
            return Err(CompileError::semantic("initializer element is not constant", init.span));
        }
        Ok(Some(node))
    }

    fn check_object_type(&self, ty: &Spanned<CType>) -> Result<()> {
        if ty.node.is_void() {
            return Err(CompileError::semantic("variable has void type", ty.span));
        }
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, stmts: &[Spanned<ast::Stmt>]) -> Result<Vec<Stmt>> {
        let mut out = Vec::new();
        for stmt in stmts {
            if let Some(s) = self.stmt(stmt)? {
                out.push(s);
            }
        }
        Ok(out)
    }

    fn stmt(&mut self, stmt: &Spanned<ast::Stmt>) -> Result<Option<Stmt>> {
        let lowered = match &stmt.node {
            ast::Stmt::Empty => return Ok(None),
            ast::Stmt::Expr(e) => match &e.node {
                Expr::Call { func, args } if func.node == "assert" && self.headers.contains("assert.h") => {
                    Stmt::Expr(self.expand_assert(e, args)?)
                }
                _ => Stmt::Expr(self.expr(e)?),
            },
            ast::Stmt::Decl(v) => self.local(v)?,
            ast::Stmt::Return(value) => self.return_stmt(value.as_ref(), stmt.span)?,
            ast::Stmt::If { cond, then_body, else_body } => {
                let cond_node = self.expr(cond)?;
                self.require_scalar(cond_node, cond.span)?;
                let then_body = self.with_scope(|this| this.block(then_body))?;
                let else_body = match else_body {
                    Some(body) => self.with_scope(|this| this.block(body))?,
                    None => Vec::new(),
                };
                Stmt::If {
                    cond: cond_node,
                    then_body,
                    else_body,
                }
            }
            ast::Stmt::Block(body) => Stmt::Block(self.with_scope(|this| this.block(body))?),
        };
        Ok(Some(lowered))
    }

    fn local(&mut self, v: &ast::VarDecl) -> Result<Stmt> {
        self.check_object_type(&v.ty)?;
        if v.is_static {
            let init = self.static_init(v)?;
            let id = self.decls.push(Decl {
                name: v.name.node.clone(),
                ty: v.ty.node.clone(),
                kind: DeclKind::StaticLocal { init },
                origin: DeclOrigin::Source,
                span: v.name.span,
            });
            self.bind(&v.name.node, id, v.name.span)?;
            return Ok(Stmt::Local { decl: id, init: None });
        }

        let init = match &v.init {
            Some(init) => Some(self.initializer(&v.ty.node, init)?),
            None => None,
        };
        let id = self.decls.push(Decl::local(v.name.node.clone(), v.ty.node.clone(), v.name.span));
        self.bind(&v.name.node, id, v.name.span)?;
        Ok(Stmt::Local { decl: id, init })
    }

    fn initializer(&mut self, ty: &CType, init: &Spanned<Expr>) -> Result<NodeId> {
        if let Some(elem) = ty.element() {
            let CType::Array(_, len) = ty.strip_typedefs() else {
                unreachable!("element() implies an array");
            };
            return match &init.node {
                Expr::StringLit(s) if elem.is_char() => {
                    if s.len() > *len {
                        return Err(CompileError::semantic("initializer string is too long", init.span));
                    }
                    Ok(self.tree.push(NodeKind::StringConst(s.clone()), ty.clone(), init.span))
                }
                _ => Err(CompileError::semantic(
                    "array initializer must be a string literal",
                    init.span,
                )),
            };
        }
        let value = self.expr(init)?;
        self.assign_convert(value, ty, init.span)
    }

    fn return_stmt(&mut self, value: Option<&Spanned<Expr>>, span: Span) -> Result<Stmt> {
        let fn_id = self
            .current_fn
            .ok_or_else(|| CompileError::semantic("return outside of a function", span))?;
        let ret = self.decls.get(fn_id).ty.clone();
        match value {
            None if ret.is_void() => Ok(Stmt::Return(None)),
            None => Err(CompileError::semantic("non-void function should return a value", span)),
            Some(e) if ret.is_void() => Err(CompileError::semantic("void function should not return a value", e.span)),
            Some(e) => {
                let node = self.expr(e)?;
                Ok(Stmt::Return(Some(self.assign_convert(node, &ret, e.span)?)))
            }
        }
    }

    /// `assert(e)` becomes `e ? (void)0 : __assert_fail("e", file, line, __func__)`
    fn expand_assert(&mut self, call: &Spanned<Expr>, args: &[Spanned<Expr>]) -> Result<NodeId> {
        let [arg] = args else {
            return Err(CompileError::semantic(
                format!("macro \"assert\" requires 1 argument, but {} given", args.len()),
                call.span,
            ));
        };
        let cond = self.expr(arg)?;
        self.require_scalar(cond, arg.span)?;

        let fail = self
            .lookup(ASSERT_FAIL)
            .filter(|id| self.decls.get(*id).is_function())
            .ok_or_else(|| CompileError::semantic(format!("'{ASSERT_FAIL}' is not declared"), call.span))?;
        let params = self.decls.get(fail).signature().map(|s| s.params.clone()).unwrap_or_default();
        if params.len() != 4 {
            return Err(CompileError::semantic(format!("'{ASSERT_FAIL}' has an unexpected signature"), call.span));
        }

        let text = collapse_whitespace(arg.span.slice(self.source).unwrap_or_default());
        let line = call.span.line_in(self.source);
        let span = call.span;
        let text_node = self.tree.push(NodeKind::StringConst(text), CType::char_ptr(), span);
        let file_node = self.tree.push(NodeKind::StringConst(self.filename.to_string()), CType::char_ptr(), span);
        let line_node = self.tree.push(
            NodeKind::IntConst {
                value: line as i128,
                text: line.to_string(),
            },
            CType::int(),
            span,
        );
        let func_node = self.tree.push(NodeKind::FuncName, CType::char_ptr(), span);

        let mut fail_args = Vec::new();
        for (node, ty) in [text_node, file_node, line_node, func_node].into_iter().zip(params.iter()) {
            fail_args.push(self.assign_convert(node, ty, span)?);
        }
        let fail_call = self.tree.push(
            NodeKind::Call {
                callee: fail,
                args: fail_args,
            },
            CType::Void,
            span,
        );
        let nop = self.tree.push(NodeKind::Nop, CType::Void, span);
        Ok(self.tree.push(
            NodeKind::Cond {
                cond,
                then: nop,
                else_: fail_call,
            },
            CType::Void,
            span,
        ))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    fn convert(&mut self, id: NodeId, to: &CType) -> NodeId {
        let node = self.tree.get(id);
        if node.ty.same_as(to) {
            return id;
        }
        let span = node.span;
        self.tree.push(NodeKind::ImplicitConv(id), to.clone(), span)
    }

    /// Array-to-pointer decay
    fn rvalue(&mut self, id: NodeId) -> NodeId {
        match self.tree.ty(id).element().cloned() {
            Some(elem) => self.convert(id, &CType::pointer_to(elem)),
            None => id,
        }
    }

    /// Integer constant expression zero
    fn is_null_pointer_constant(&self, id: NodeId) -> bool {
        let ty = self.tree.ty(id);
        (ty.is_integer() || ty.pointee().is_some_and(CType::is_void)) && self.tree.is_null_constant(id)
    }

    /// Conversion as if by assignment
    fn assign_convert(&mut self, id: NodeId, to: &CType, span: Span) -> Result<NodeId> {
        let id = self.rvalue(id);
        let from = self.tree.ty(id).clone();
        let ok = if to.is_arithmetic() {
            from.is_arithmetic() || (to.is_bool() && from.is_pointer())
        } else if let Some(to_pointee) = to.pointee() {
            self.is_null_pointer_constant(id)
                || from.pointee().is_some_and(|p| p.same_as(to_pointee) || p.is_void() || to_pointee.is_void())
        } else {
            false
        };
        if !ok {
            return Err(CompileError::semantic(
                format!("incompatible types: cannot convert '{from}' to '{to}'"),
                span,
            ));
        }
        Ok(self.convert(id, to))
    }

    fn require_scalar(&self, id: NodeId, span: Span) -> Result<()> {
        let ty = self.tree.ty(id);
        if ty.is_scalar() || ty.is_array() {
            Ok(())
        } else {
            Err(CompileError::semantic(format!("used '{ty}' where a scalar is required"), span))
        }
    }

    /// Results of comparisons, logical operators and `!`: always 0 or 1
    fn is_truth_value(&self, id: NodeId) -> bool {
        match self.tree.kind(id) {
            NodeKind::Binary { op, .. } => matches!(op.class(), OpClass::Relational | OpClass::Logical),
            NodeKind::Unary { op: UnOp::Not, .. } => true,
            _ => false,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, e: &Spanned<Expr>) -> Result<NodeId> {
        let node = self.expr_inner(e)?;
        Ok(self.rvalue(node))
    }

    fn expr_inner(&mut self, e: &Spanned<Expr>) -> Result<NodeId> {
        let span = e.span;
        match &e.node {
            Expr::IntLit(lit) => {
                let ty = int_literal_type(lit)
                    .ok_or_else(|| CompileError::semantic("integer constant is too large", span))?;
                Ok(self.tree.push(
                    NodeKind::IntConst {
                        value: lit.value as i128,
                        text: lit.text.clone(),
                    },
                    CType::Int(ty),
                    span,
                ))
            }
            Expr::FloatLit(value, text) => {
                let kind = if text.ends_with(['f', 'F']) {
                    FloatKind::Float
                } else {
                    FloatKind::Double
                };
                Ok(self.tree.push(
                    NodeKind::FloatConst {
                        value: *value,
                        text: text.clone(),
                    },
                    CType::Float(kind),
                    span,
                ))
            }
            Expr::CharLit(value, text) => Ok(self.tree.push(
                NodeKind::IntConst {
                    value: *value as i8 as i128,
                    text: text.clone(),
                },
                CType::int(),
                span,
            )),
            Expr::StringLit(s) => Ok(self.tree.push(NodeKind::StringConst(s.clone()), CType::char_ptr(), span)),
            Expr::Ident(name) => self.ident(name, span),
            Expr::Binary { left, op, right } => self.binary(left, *op, right, span),
            Expr::Unary { op, expr } => self.unary(*op, expr, span),
            Expr::Call { func, args } => self.call(func, args, span),
            Expr::Assign { target, value } => {
                let id = self.variable(&target.node, target.span)?;
                let ty = self.decls.get(id).ty.clone();
                if ty.is_array() {
                    return Err(CompileError::semantic("assignment to expression with array type", target.span));
                }
                let value = self.expr(value)?;
                let value = self.assign_convert(value, &ty, span)?;
                Ok(self.tree.push(
                    NodeKind::Assign {
                        target: id,
                        op: None,
                        value,
                    },
                    ty,
                    span,
                ))
            }
        }
    }

    fn variable(&self, name: &str, span: Span) -> Result<DeclId> {
        match self.lookup(name) {
            Some(id) if self.decls.get(id).is_function() => Err(CompileError::semantic(
                format!("function '{name}' used as a value"),
                span,
            )),
            Some(id) => Ok(id),
            None => Err(self.unknown_name(name, span, "use of undeclared identifier")),
        }
    }

    fn ident(&mut self, name: &str, span: Span) -> Result<NodeId> {
        if self.lookup(name).is_some() {
            let id = self.variable(name, span)?;
            let ty = self.decls.get(id).ty.clone();
            return Ok(self.tree.push(NodeKind::DeclRef(id), ty, span));
        }
        let constant = |value: i128, ty: CType| (NodeKind::IntConst { value, text: name.to_string() }, ty);
        let (kind, ty) = match name {
            "NULL" if self.has_header(headers::defines_null) => constant(0, CType::void_ptr()),
            "true" if self.has_header(headers::defines_bool_constants) => constant(1, CType::int()),
            "false" if self.has_header(headers::defines_bool_constants) => constant(0, CType::int()),
            "__func__" if self.current_fn.is_some() => (NodeKind::FuncName, CType::char_ptr()),
            _ => return Err(self.unknown_name(name, span, "use of undeclared identifier")),
        };
        Ok(self.tree.push(kind, ty, span))
    }

    fn binary(&mut self, left: &Spanned<Expr>, op: BinOp, right: &Spanned<Expr>, span: Span) -> Result<NodeId> {
        let l = self.expr(left)?;
        let l = self.rvalue(l);
        let r = self.expr(right)?;
        let r = self.rvalue(r);
        let lt = self.tree.ty(l).clone();
        let rt = self.tree.ty(r).clone();
        let push = |this: &mut Self, op: BinOp, lhs: NodeId, rhs: NodeId, ty: CType| {
            this.tree.push(NodeKind::Binary { op, lhs, rhs }, ty, span)
        };

        match op.class() {
            OpClass::Logical => {
                self.require_scalar(l, left.span)?;
                self.require_scalar(r, right.span)?;
                Ok(push(self, op, l, r, CType::int()))
            }
            OpClass::Relational => {
                if lt.is_arithmetic() && rt.is_arithmetic() {
                    let common = CType::common_arithmetic(&lt, &rt);
                    let l = self.convert(l, &common);
                    let r = self.convert(r, &common);
                    return Ok(push(self, op, l, r, CType::int()));
                }
                let (l, r) = self.pointer_comparison(l, r, span)?;
                Ok(push(self, op, l, r, CType::int()))
            }
            OpClass::Arithmetic => {
                if matches!(op, BinOp::BitAnd | BinOp::BitOr) && self.is_truth_value(l) && self.is_truth_value(r) {
                    let eager = if op == BinOp::BitAnd { BinOp::EagerAnd } else { BinOp::EagerOr };
                    return Ok(push(self, eager, l, r, CType::int()));
                }
                if matches!(op, BinOp::Add | BinOp::Sub) && (lt.is_pointer() || rt.is_pointer()) {
                    return self.pointer_arithmetic(op, l, r, span);
                }

                let integer_only = !matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div);
                let operands_ok = if integer_only {
                    lt.is_integer() && rt.is_integer()
                } else {
                    lt.is_arithmetic() && rt.is_arithmetic()
                };
                if !operands_ok {
                    return Err(CompileError::semantic(
                        format!("invalid operands to binary {op} ('{lt}' and '{rt}')"),
                        span,
                    ));
                }
                if matches!(op, BinOp::Shl | BinOp::Shr) {
                    let lp = lt.promote();
                    let l = self.convert(l, &lp);
                    let r = self.convert(r, &rt.promote());
                    return Ok(push(self, op, l, r, lp));
                }
                let common = CType::common_arithmetic(&lt, &rt);
                let l = self.convert(l, &common);
                let r = self.convert(r, &common);
                Ok(push(self, op, l, r, common))
            }
        }
    }

    fn pointer_comparison(&mut self, l: NodeId, r: NodeId, span: Span) -> Result<(NodeId, NodeId)> {
        let lt = self.tree.ty(l).clone();
        let rt = self.tree.ty(r).clone();
        if lt.is_pointer() && self.is_null_pointer_constant(r) {
            return Ok((l, self.convert(r, &lt)));
        }
        if rt.is_pointer() && self.is_null_pointer_constant(l) {
            return Ok((self.convert(l, &rt), r));
        }
        match (lt.pointee(), rt.pointee()) {
            (Some(a), Some(b)) if a.same_as(b) => Ok((l, r)),
            (Some(a), Some(_)) if a.is_void() => Ok((l, self.convert(r, &lt))),
            (Some(_), Some(b)) if b.is_void() => Ok((self.convert(l, &rt), r)),
            _ => Err(CompileError::semantic(
                format!("comparison between '{lt}' and '{rt}'"),
                span,
            )),
        }
    }

    fn pointer_arithmetic(&mut self, op: BinOp, l: NodeId, r: NodeId, span: Span) -> Result<NodeId> {
        let lt = self.tree.ty(l).clone();
        let rt = self.tree.ty(r).clone();
        let push = |this: &mut Self, lhs: NodeId, rhs: NodeId, ty: CType| {
            this.tree.push(NodeKind::Binary { op, lhs, rhs }, ty, span)
        };
        match (lt.is_pointer(), rt.is_pointer()) {
            (true, false) if rt.is_integer() => {
                let r = self.convert(r, &CType::long());
                Ok(push(self, l, r, lt))
            }
            (false, true) if op == BinOp::Add && lt.is_integer() => {
                let l = self.convert(l, &CType::long());
                Ok(push(self, l, r, rt))
            }
            (true, true) if op == BinOp::Sub && lt.same_as(&rt) => {
                let diff = CType::Typedef("ptrdiff_t".to_string(), Box::new(CType::long()));
                Ok(push(self, l, r, diff))
            }
            _ => Err(CompileError::semantic(
                format!("invalid operands to binary {op} ('{lt}' and '{rt}')"),
                span,
            )),
        }
    }

    fn unary(&mut self, op: UnOp, operand: &Spanned<Expr>, span: Span) -> Result<NodeId> {
        if op == UnOp::AddrOf {
            let Expr::Ident(name) = &operand.node else {
                return Err(CompileError::semantic("cannot take the address of an rvalue", operand.span));
            };
            let id = self.variable(name, operand.span)?;
            let ty = self.decls.get(id).ty.clone();
            let var = self.tree.push(NodeKind::DeclRef(id), ty.clone(), operand.span);
            return Ok(self.tree.push(NodeKind::AddressOf(var), CType::pointer_to(ty), span));
        }

        let inner = self.expr(operand)?;
        let ty = self.tree.ty(inner).clone();
        match op {
            UnOp::Not => {
                self.require_scalar(inner, operand.span)?;
                Ok(self.tree.push(NodeKind::Unary { op, operand: inner }, CType::int(), span))
            }
            UnOp::Neg | UnOp::BitNot => {
                let valid = if op == UnOp::Neg { ty.is_arithmetic() } else { ty.is_integer() };
                if !valid {
                    return Err(CompileError::semantic(
                        format!("invalid argument type '{ty}' to unary {op}"),
                        operand.span,
                    ));
                }
                let promoted = ty.promote();
                // Fold negative literals so they read as constants
                if op == UnOp::Neg {
                    if let NodeKind::IntConst { value, text } = self.tree.kind(inner).clone() {
                        let it = promoted.int_type().unwrap_or(IntType::INT);
                        return Ok(self.tree.push(
                            NodeKind::IntConst {
                                value: it.wrap(-value),
                                text: format!("-{text}"),
                            },
                            promoted,
                            span,
                        ));
                    }
                }
                let inner = self.convert(inner, &promoted);
                Ok(self.tree.push(NodeKind::Unary { op, operand: inner }, promoted, span))
            }
            UnOp::AddrOf => unreachable!("handled above"),
        }
    }

    fn call(&mut self, func: &Spanned<String>, args: &[Spanned<Expr>], span: Span) -> Result<NodeId> {
        let name = &func.node;
        if name == "assert" && self.headers.contains("assert.h") {
            return Err(CompileError::semantic("assert() is only supported as a statement", span));
        }
        let Some(callee) = self.lookup(name) else {
            return Err(self.unknown_name(name, func.span, "implicit declaration of function"));
        };
        let Some(sig) = self.decls.get(callee).signature().cloned() else {
            return Err(CompileError::semantic(
                format!("called object '{name}' is not a function"),
                func.span,
            ));
        };
        let arity_ok = if sig.variadic {
            args.len() >= sig.params.len()
        } else {
            args.len() == sig.params.len()
        };
        if !arity_ok {
            return Err(CompileError::semantic(
                format!(
                    "function '{name}' expects {}{} argument(s), got {}",
                    if sig.variadic { "at least " } else { "" },
                    sig.params.len(),
                    args.len()
                ),
                span,
            ));
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let node = self.expr(arg)?;
            let node = match sig.params.get(i) {
                Some(ty) => self.assign_convert(node, ty, arg.span)?,
                None => self.default_promote(node, arg.span)?,
            };
            lowered.push(node);
        }
        Ok(self.tree.push(
            NodeKind::Call {
                callee,
                args: lowered,
            },
            sig.ret,
            span,
        ))
    }

    /// Default argument promotions for variadic arguments
    fn default_promote(&mut self, id: NodeId, span: Span) -> Result<NodeId> {
        let ty = self.tree.ty(id).clone();
        if ty.is_void() {
            return Err(CompileError::semantic("invalid use of void expression", span));
        }
        if matches!(ty.strip_typedefs(), CType::Float(FloatKind::Float)) {
            return Ok(self.convert(id, &CType::Float(FloatKind::Double)));
        }
        Ok(self.convert(id, &ty.promote()))
    }
}

/// Array parameters are pointers
fn adjust_param_type(ty: &CType) -> CType {
    match ty.element() {
        Some(elem) => CType::pointer_to(elem.clone()),
        None => ty.clone(),
    }
}

fn signatures_match(a: &FnSig, b: &FnSig) -> bool {
    a.ret.same_as(&b.ret)
        && a.variadic == b.variadic
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| x.same_as(y))
}

/// Type of an integer literal: the first of the candidate types that holds it
fn int_literal_type(lit: &IntLiteral) -> Option<IntType> {
    use IntRank::*;
    use Signedness::*;
    let value = lit.value as i128;
    let ranks: &[IntRank] = match lit.longs {
        0 => &[Int, Long, LongLong],
        1 => &[Long, LongLong],
        _ => &[LongLong],
    };
    let mut candidates = Vec::new();
    for &rank in ranks {
        if !lit.unsigned {
            candidates.push(IntType::new(rank, Signed));
        }
        if lit.unsigned || lit.non_decimal {
            candidates.push(IntType::new(rank, Unsigned));
        }
    }
    candidates.into_iter().find(|ty| ty.fits(value))
}
