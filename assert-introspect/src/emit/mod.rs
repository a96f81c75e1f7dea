//! C source output
//!
//! Prints a translation unit, rewritten or not, back as C. Evaluate-once
//! handles become block-scoped temporaries: the first time a handle is
//! reached in a statement it prints as `(tmp = expr)`, afterwards as `tmp`.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::ast::{BinOp, UnOp};
use crate::tree::{DeclId, DeclKind, Decls, Function, Item, NodeId, NodeKind, Stmt, TranslationUnit, Tree};
use crate::util::escape_c_string;

const INDENT: &str = "    ";
const TEMP_PREFIX: &str = "__introspect_tmp";

/// Render `unit` as C source text
pub fn emit_c(unit: &TranslationUnit) -> String {
    let mut printer = Printer::new(&unit.tree, &unit.decls);
    printer.unit(unit);
    printer.out
}

struct Printer<'a> {
    tree: &'a Tree,
    decls: &'a Decls,
    out: String,
    depth: usize,
    /// Temporaries of the statement being printed
    temps: HashMap<NodeId, String>,
    /// Handles already assigned in the statement being printed
    assigned: HashSet<NodeId>,
    next_temp: usize,
}

impl<'a> Printer<'a> {
    fn new(tree: &'a Tree, decls: &'a Decls) -> Self {
        Self {
            tree,
            decls,
            out: String::new(),
            depth: 0,
            temps: HashMap::new(),
            assigned: HashSet::new(),
            next_temp: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn unit(&mut self, unit: &TranslationUnit) {
        let mut previous_include = false;
        for item in &unit.items {
            match item {
                Item::Include(header) => {
                    self.line(&format!("#include <{header}>"));
                    previous_include = true;
                    continue;
                }
                Item::Prototype(decl) => {
                    if previous_include {
                        self.out.push('\n');
                    }
                    let text = self.signature(*decl, None);
                    self.line(&format!("{text};"));
                }
                Item::Global(decl) => {
                    if previous_include {
                        self.out.push('\n');
                    }
                    let text = self.variable(*decl);
                    self.line(&format!("{text};"));
                }
                Item::Function(function) => {
                    if !self.out.is_empty() {
                        self.out.push('\n');
                    }
                    self.function(function);
                }
            }
            previous_include = false;
        }
    }

    /// `ret name(params)`, with parameter names when given
    fn signature(&self, decl: DeclId, params: Option<&[DeclId]>) -> String {
        let name = self.decls.name(decl);
        let Some(sig) = self.decls[decl].signature() else {
            return name.to_string();
        };
        let mut list: Vec<String> = match params {
            Some(params) => params
                .iter()
                .map(|p| self.decls[*p].ty.declare(self.decls.name(*p)))
                .collect(),
            None => sig.params.iter().map(|ty| ty.to_string()).collect(),
        };
        if sig.variadic {
            list.push("...".to_string());
        }
        if list.is_empty() {
            list.push("void".to_string());
        }
        format!("{} {name}({})", sig.ret, list.join(", "))
    }

    /// `[static] T name [= init]`
    fn variable(&mut self, decl: DeclId) -> String {
        let d = &self.decls[decl];
        let declared = d.ty.declare(&d.name);
        match d.kind {
            DeclKind::Global { init: Some(init) } => format!("{declared} = {}", self.expr(init)),
            DeclKind::StaticLocal { init: Some(init) } => format!("static {declared} = {}", self.expr(init)),
            DeclKind::StaticLocal { init: None } => format!("static {declared}"),
            _ => declared,
        }
    }

    fn function(&mut self, function: &Function) {
        let header = self.signature(function.decl, Some(&function.params));
        self.line(&header);
        self.line("{");
        self.depth += 1;
        self.next_temp = 0;
        for stmt in &function.body {
            self.stmt(stmt);
        }
        self.depth -= 1;
        self.line("}");
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(id) => self.with_temps(&[*id], true, |p| p.node_stmt(*id)),
            Stmt::Local { decl, init } => {
                let decl = *decl;
                let roots: Vec<_> = init.iter().copied().collect();
                self.with_temps(&roots, false, |p| {
                    let mut text = p.variable(decl);
                    if let Some(init) = init {
                        let _ = write!(text, " = {}", p.expr(*init));
                    }
                    p.line(&format!("{text};"));
                });
            }
            Stmt::Return(value) => {
                let roots: Vec<_> = value.iter().copied().collect();
                self.with_temps(&roots, true, |p| match value {
                    Some(value) => {
                        let text = p.expr(*value);
                        p.line(&format!("return {text};"));
                    }
                    None => p.line("return;"),
                });
            }
            Stmt::If { cond, then_body, else_body } => {
                self.with_temps(&[*cond], true, |p| {
                    let cond = p.expr(*cond);
                    p.line(&format!("if ({cond}) {{"));
                    p.stmts(then_body);
                    if !else_body.is_empty() {
                        p.line("} else {");
                        p.stmts(else_body);
                    }
                    p.line("}");
                });
            }
            Stmt::Block(body) => {
                self.line("{");
                self.stmts(body);
                self.line("}");
            }
        }
    }

    fn stmts(&mut self, body: &[Stmt]) {
        self.depth += 1;
        for stmt in body {
            self.stmt(stmt);
        }
        self.depth -= 1;
    }

    /// Print one source statement, declaring the temporaries its handles need
    fn with_temps(&mut self, roots: &[NodeId], scoped: bool, print: impl FnOnce(&mut Self)) {
        let mut handles = Vec::new();
        for root in roots {
            self.collect_handles(*root, &mut handles);
        }
        if handles.is_empty() {
            print(self);
            return;
        }

        if scoped {
            self.line("{");
            self.depth += 1;
        }
        for handle in handles {
            let name = format!("{TEMP_PREFIX}{}", self.next_temp);
            self.next_temp += 1;
            let declared = self.tree.ty(handle).declare(&name);
            self.line(&format!("{declared};"));
            self.temps.insert(handle, name);
        }
        print(self);
        if scoped {
            self.depth -= 1;
            self.line("}");
        }
        self.temps.clear();
        self.assigned.clear();
    }

    fn collect_handles(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.tree.kind(node), NodeKind::Save(_)) && !out.contains(&node) {
            out.push(node);
        }
        for child in self.tree.children(node) {
            self.collect_handles(child, out);
        }
    }

    /// A node in statement position
    fn node_stmt(&mut self, id: NodeId) {
        match self.tree.kind(id) {
            NodeKind::Cond { cond, then, else_ } => {
                let (cond, then, else_) = (*cond, *then, *else_);
                let text = self.expr(cond);
                let then_empty = matches!(self.tree.kind(then), NodeKind::Nop);
                let else_empty = matches!(self.tree.kind(else_), NodeKind::Nop);
                if then_empty && !else_empty {
                    self.line(&format!("if ({text})"));
                    self.depth += 1;
                    self.line(";");
                    self.depth -= 1;
                    self.line("else {");
                    self.nested(else_);
                    self.line("}");
                } else {
                    self.line(&format!("if ({text}) {{"));
                    self.nested(then);
                    if !else_empty {
                        self.line("} else {");
                        self.nested(else_);
                    }
                    self.line("}");
                }
            }
            NodeKind::Block(items) => {
                self.line("{");
                self.depth += 1;
                for item in items.clone() {
                    self.node_stmt(item);
                }
                self.depth -= 1;
                self.line("}");
            }
            NodeKind::Local { decl, init } => {
                let (decl, init) = (*decl, *init);
                let declared = self.decls[decl].ty.declare(self.decls.name(decl));
                match init {
                    Some(init) => {
                        let value = self.expr(init);
                        self.line(&format!("{declared} = {value};"));
                    }
                    None => self.line(&format!("{declared};")),
                }
            }
            NodeKind::Nop => self.line(";"),
            _ => {
                let text = self.expr(id);
                self.line(&format!("{text};"));
            }
        }
    }

    /// Contents of a branch: a block's items, or a single statement
    fn nested(&mut self, id: NodeId) {
        self.depth += 1;
        match self.tree.kind(id) {
            NodeKind::Block(items) => {
                for item in items.clone() {
                    self.node_stmt(item);
                }
            }
            NodeKind::Nop => {}
            _ => self.node_stmt(id),
        }
        self.depth -= 1;
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, id: NodeId) -> String {
        match self.tree.kind(id) {
            NodeKind::IntConst { text, .. } | NodeKind::FloatConst { text, .. } => text.clone(),
            NodeKind::StringConst(s) => format!("\"{}\"", escape_c_string(s)),
            NodeKind::DeclRef(decl) => self.decls.name(*decl).to_string(),
            NodeKind::FuncName => "__func__".to_string(),
            NodeKind::AddressOf(inner) => format!("&{}", self.expr(*inner)),
            NodeKind::Unary { op, operand } => {
                let (op, operand) = (*op, *operand);
                let text = self.expr(operand);
                // `- -x` must not print as a decrement
                let doubled = op == UnOp::Neg && text.starts_with('-');
                if doubled || self.is_compound(operand) {
                    format!("{op}({text})")
                } else {
                    format!("{op}{text}")
                }
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                let left = self.operand(lhs, op, false);
                let right = self.operand(rhs, op, true);
                format!("{left} {op} {right}")
            }
            NodeKind::Call { callee, args } => {
                let callee = *callee;
                let args: Vec<_> = args.clone().into_iter().map(|arg| self.expr(arg)).collect();
                format!("{}({})", self.decls.name(callee), args.join(", "))
            }
            NodeKind::ImplicitConv(inner) => self.expr(*inner),
            NodeKind::Assign { target, op, value } => {
                let (target, op, value) = (*target, *op, *value);
                let value = self.expr(value);
                let op = op.map(|op| op.as_str()).unwrap_or_default();
                format!("{} {op}= {value}", self.decls.name(target))
            }
            NodeKind::Save(inner) => {
                let inner = *inner;
                let Some(temp) = self.temps.get(&id).cloned() else {
                    // Outside any statement that declared it
                    return self.expr(inner);
                };
                if self.assigned.insert(id) {
                    format!("({temp} = {})", self.expr(inner))
                } else {
                    temp
                }
            }
            NodeKind::Cond { cond, then, else_ } => {
                let (cond, then, else_) = (*cond, *then, *else_);
                format!("({} ? {} : {})", self.expr(cond), self.expr(then), self.expr(else_))
            }
            NodeKind::Nop => "(void)0".to_string(),
            NodeKind::ZeroInit => "{0}".to_string(),
            NodeKind::Block(_) | NodeKind::Local { .. } => {
                // Statement expression; only reachable for hand-built trees
                let saved = std::mem::take(&mut self.out);
                let depth = std::mem::replace(&mut self.depth, 0);
                self.node_stmt(id);
                let body = std::mem::replace(&mut self.out, saved);
                self.depth = depth;
                format!("({})", body.split_whitespace().collect::<Vec<_>>().join(" "))
            }
        }
    }

    fn operand(&mut self, child: NodeId, parent: BinOp, right: bool) -> String {
        let text = self.expr(child);
        let parens = match self.tree.kind(self.strip_conversions(child)) {
            NodeKind::Binary { op, .. } => {
                op.precedence() < parent.precedence() || (right && op.precedence() == parent.precedence())
            }
            NodeKind::Assign { .. } | NodeKind::Cond { .. } => true,
            _ => false,
        };
        if parens { format!("({text})") } else { text }
    }

    fn is_compound(&self, node: NodeId) -> bool {
        matches!(
            self.tree.kind(self.strip_conversions(node)),
            NodeKind::Binary { .. } | NodeKind::Assign { .. }
        )
    }

    /// Conversions print as their operand; handles do not, they print atomically
    fn strip_conversions(&self, mut node: NodeId) -> NodeId {
        while let NodeKind::ImplicitConv(inner) = self.tree.kind(node) {
            node = *inner;
        }
        node
    }
}
