//! Assembly of the replacement failure block
//!
//! The block declares two repr buffers, prints the header and the static
//! text, runs the report statements, prints both buffers and terminates:
//!
//! ```text
//! In t.c:5, function 'test':
//! > assert(n == 5)
//! E assert(3 == 5)
//! > subexpressions:
//!   n = 3
//! ```

use std::collections::{BTreeMap, HashMap};

use super::colors::{ColorAllocator, HIGHLIGHT, RESET};
use super::format;
use super::matcher::AssertionShape;
use super::reconstruct::{describe, ensure_renderable, reconstruct};
use super::report::{argument_leaves, is_leaf, Context, Listed, Segment, Sink};
use super::wrap::wrap;
use super::{Primitives, RewriteError};
use crate::ast::{BinOp, CType, Span, UnOp};
use crate::config::RewriteConfig;
use crate::tree::{Decl, DeclId, DeclOrigin, Decls, NodeId, NodeKind, Tree};

const REPR_BUFFER: &str = "__introspect_repr";
const SUBEXPR_BUFFER: &str = "__introspect_subexprs";
const LISTED_FLAG: &str = "__introspect_listed";

/// A character buffer and its write position
#[derive(Debug, Clone, Copy)]
pub(super) struct ReprBuffer {
    pub buf: DeclId,
    pub pos: DeclId,
}

/// Build the replacement for the assertion `shape`
pub(super) fn synthesize(
    tree: &mut Tree,
    decls: &mut Decls,
    primitives: &Primitives,
    config: &RewriteConfig,
    shape: &AssertionShape,
    span: Span,
) -> Result<NodeId, RewriteError> {
    validate(tree, shape.cond)?;
    let cond = wrap(tree, shape.cond);

    let mut synth = Synth::new(tree, decls, primitives, config, span);
    let block = synth.failure_block(shape, cond)?;
    let nop = synth.node(NodeKind::Nop, CType::Void);
    Ok(synth.node(NodeKind::Cond { cond, then: nop, else_: block }, CType::Void))
}

/// Reject conditions the report cannot render, before anything is built
fn validate(tree: &Tree, node: NodeId) -> Result<(), RewriteError> {
    if tree.is_pure(node) {
        if tree.ty(node).is_pointer() && tree.is_null_constant(node) {
            return Ok(());
        }
        return ensure_renderable(tree, node);
    }
    match tree.kind(node) {
        NodeKind::Save(inner) => validate(tree, *inner),
        NodeKind::Binary { lhs, rhs, .. } => {
            validate(tree, *lhs)?;
            validate(tree, *rhs)
        }
        NodeKind::Unary { operand, .. } => validate(tree, *operand),
        NodeKind::ImplicitConv(inner) => {
            if is_leaf(tree, *inner) {
                format::resolve(tree, node)?;
            }
            validate(tree, *inner)
        }
        NodeKind::DeclRef(_) => format::resolve(tree, node).map(drop),
        NodeKind::Call { args, .. } => {
            format::resolve(tree, node)?;
            for arg in args {
                ensure_renderable(tree, *arg)?;
                if tree.is_pure(*arg) {
                    continue;
                }
                format::resolve(tree, *arg)?;
                let mut leaves = Vec::new();
                argument_leaves(tree, *arg, &mut leaves);
                for leaf in leaves {
                    validate(tree, leaf)?;
                }
            }
            Ok(())
        }
        other => Err(RewriteError::UnsupportedExpression(describe(other).to_string())),
    }
}

/// State for building one replacement
pub(super) struct Synth<'a> {
    pub(super) tree: &'a mut Tree,
    pub(super) decls: &'a mut Decls,
    pub(super) colors: ColorAllocator,
    pub(super) listed: Listed,
    pub(super) main: ReprBuffer,
    pub(super) sub: ReprBuffer,
    primitives: &'a Primitives,
    capacity: usize,
    span: Span,
    /// Per variable, the flag recording that its line was written
    flags: BTreeMap<DeclId, DeclId>,
    /// How many times each variable is reported
    occurrences: HashMap<DeclId, usize>,
}

impl<'a> Synth<'a> {
    fn new(
        tree: &'a mut Tree,
        decls: &'a mut Decls,
        primitives: &'a Primitives,
        config: &RewriteConfig,
        span: Span,
    ) -> Self {
        let capacity = config.buffer_size;
        let mut buffer = |name: &str| {
            let array = CType::Array(Box::new(CType::char()), capacity);
            let buf = decls.push(Decl::local(name, array, span).with_origin(DeclOrigin::Synthesized));
            let pos = decls.push(
                Decl::local(format!("{name}_pos"), CType::size_t(), span).with_origin(DeclOrigin::Synthesized),
            );
            ReprBuffer { buf, pos }
        };
        let main = buffer(REPR_BUFFER);
        let sub = buffer(SUBEXPR_BUFFER);
        Self {
            tree,
            decls,
            colors: ColorAllocator::new(config.color),
            listed: Listed::default(),
            main,
            sub,
            primitives,
            capacity,
            span,
            flags: BTreeMap::new(),
            occurrences: HashMap::new(),
        }
    }

    fn failure_block(&mut self, shape: &AssertionShape, cond: NodeId) -> Result<NodeId, RewriteError> {
        self.count_occurrences(cond);

        let mut sink = Sink::default();
        sink.text("assert(");
        self.report(cond, Context::Failed, &mut sink)?;
        sink.text(")");
        let report = self.finish(sink);
        // After the report, so the static text reuses its colors
        let text = reconstruct(self.tree, self.decls, &mut self.colors, cond);

        let mut items = Vec::new();
        for buffer in [self.main, self.sub] {
            let ty = self.decls[buffer.buf].ty.clone();
            let zero = self.node(NodeKind::ZeroInit, ty);
            items.push(self.declare(buffer.buf, zero));
            let zero = self.int(0, CType::size_t());
            items.push(self.declare(buffer.pos, zero));
        }
        let flags: Vec<_> = self.flags.values().copied().collect();
        for flag in flags {
            let zero = self.int(0, CType::int());
            items.push(self.declare(flag, zero));
        }

        let line = self.line_number(shape.line);
        items.push(self.print("In %s:%u, function '%s':\n", vec![shape.file, line, shape.function]));
        let text = self.string(&text);
        items.push(self.print("> assert(%s)\n", vec![text]));
        items.extend(report);

        let marker = if self.colors.is_enabled() {
            format!("{HIGHLIGHT}E{RESET}")
        } else {
            "E".to_string()
        };
        let repr = self.decayed(self.main.buf);
        items.push(self.print(&format!("{marker} %s\n"), vec![repr]));

        let written = self.var(self.sub.pos);
        let zero = self.int(0, CType::size_t());
        let any = self.node(NodeKind::Binary { op: BinOp::Gt, lhs: written, rhs: zero }, CType::int());
        let listing = self.decayed(self.sub.buf);
        let listing = self.print("> subexpressions:\n%s", vec![listing]);
        items.push(self.when(any, listing));

        items.push(self.call(self.primitives.terminate, vec![]));
        Ok(self.block(items))
    }

    /// Count the reported occurrences of each variable
    fn count_occurrences(&mut self, node: NodeId) {
        if self.tree.is_pure(node) {
            return;
        }
        match self.tree.kind(node).clone() {
            NodeKind::Save(inner) => self.count_occurrences(inner),
            NodeKind::Binary { lhs, rhs, .. } => {
                self.count_occurrences(lhs);
                self.count_occurrences(rhs);
            }
            NodeKind::Unary { operand, .. } => self.count_occurrences(operand),
            NodeKind::ImplicitConv(inner) => self.count_occurrences(inner),
            NodeKind::DeclRef(decl) => *self.occurrences.entry(decl).or_default() += 1,
            NodeKind::Call { args, .. } => {
                for arg in args {
                    let mut leaves = Vec::new();
                    argument_leaves(self.tree, arg, &mut leaves);
                    for leaf in leaves {
                        self.count_occurrences(leaf);
                    }
                }
            }
            _ => {}
        }
    }

    /// Whether `decl` is reported more than once, so later listings need a flag
    pub(super) fn repeated(&self, decl: DeclId) -> bool {
        self.occurrences.get(&decl).is_some_and(|count| *count > 1)
    }

    /// The listed flag of `decl`, declared on first use
    pub(super) fn flag(&mut self, decl: DeclId) -> DeclId {
        if let Some(flag) = self.flags.get(&decl) {
            return *flag;
        }
        let name = format!("{LISTED_FLAG}_{}", self.flags.len());
        let flag = self
            .decls
            .push(Decl::local(name, CType::int(), self.span).with_origin(DeclOrigin::Synthesized));
        self.flags.insert(decl, flag);
        flag
    }

    /// Write pending text to the buffers
    pub(super) fn flush(&mut self, sink: &mut Sink) {
        let main = std::mem::take(&mut sink.main);
        let sub = std::mem::take(&mut sink.sub);
        for (segment, buffer) in [(main, self.main), (sub, self.sub)] {
            if !segment.is_empty() {
                let stmt = self.append(buffer, segment);
                sink.stmts.push(stmt);
            }
        }
    }

    pub(super) fn finish(&mut self, mut sink: Sink) -> Vec<NodeId> {
        self.flush(&mut sink);
        sink.stmts
    }

    /// `if (pos < N) pos += snprintf(buf + pos, N - pos, fmt, args...);`
    pub(super) fn append(&mut self, buffer: ReprBuffer, segment: Segment) -> NodeId {
        let size = CType::size_t();
        let pos = self.var(buffer.pos);
        let cap = self.int(self.capacity as i128, size.clone());
        let room_left = self.node(NodeKind::Binary { op: BinOp::Lt, lhs: pos, rhs: cap }, CType::int());

        let base = self.decayed(buffer.buf);
        let pos = self.var(buffer.pos);
        let dest = self.node(NodeKind::Binary { op: BinOp::Add, lhs: base, rhs: pos }, CType::char_ptr());
        let cap = self.int(self.capacity as i128, size.clone());
        let pos = self.var(buffer.pos);
        let room = self.node(NodeKind::Binary { op: BinOp::Sub, lhs: cap, rhs: pos }, size.clone());
        let fmt = self.string(&segment.fmt);

        let mut args = vec![dest, room, fmt];
        args.extend(segment.args);
        let written = self.call(self.primitives.format, args);
        let written = self.node(NodeKind::ImplicitConv(written), size.clone());
        let bump = self.node(
            NodeKind::Assign { target: buffer.pos, op: Some(BinOp::Add), value: written },
            size,
        );
        self.when(room_left, bump)
    }

    /// `if (!flag) { flag = 1; <append> }`
    pub(super) fn append_once(&mut self, flag: DeclId, buffer: ReprBuffer, segment: Segment) -> NodeId {
        let check = self.var(flag);
        let unset = self.node(NodeKind::Unary { op: UnOp::Not, operand: check }, CType::int());
        let set = self.set_flag(flag);
        let append = self.append(buffer, segment);
        let body = self.block(vec![set, append]);
        self.when(unset, body)
    }

    pub(super) fn set_flag(&mut self, flag: DeclId) -> NodeId {
        let one = self.int(1, CType::int());
        self.node(NodeKind::Assign { target: flag, op: None, value: one }, CType::int())
    }

    fn print(&mut self, fmt: &str, args: Vec<NodeId>) -> NodeId {
        let fmt = self.string(fmt);
        let mut all = vec![fmt];
        all.extend(args);
        self.call(self.primitives.print, all)
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    pub(super) fn node(&mut self, kind: NodeKind, ty: CType) -> NodeId {
        self.tree.push(kind, ty, self.span)
    }

    fn int(&mut self, value: i128, ty: CType) -> NodeId {
        self.node(NodeKind::IntConst { value, text: value.to_string() }, ty)
    }

    /// The macro's line as an `unsigned int` literal, the type `%u` reads
    fn line_number(&mut self, line: NodeId) -> NodeId {
        let NodeKind::IntConst { value, .. } = *self.tree.kind(self.tree.strip_wrappers(line)) else {
            return line;
        };
        self.node(NodeKind::IntConst { value, text: format!("{value}u") }, CType::uint())
    }

    fn string(&mut self, text: &str) -> NodeId {
        self.node(NodeKind::StringConst(text.to_string()), CType::char_ptr())
    }

    fn var(&mut self, decl: DeclId) -> NodeId {
        let ty = self.decls[decl].ty.clone();
        self.node(NodeKind::DeclRef(decl), ty)
    }

    /// A char array read as a pointer to its first element
    fn decayed(&mut self, array: DeclId) -> NodeId {
        let element = self.decls[array].ty.element().cloned().unwrap_or_else(CType::char);
        let var = self.var(array);
        self.node(NodeKind::ImplicitConv(var), CType::pointer_to(element))
    }

    fn call(&mut self, callee: DeclId, args: Vec<NodeId>) -> NodeId {
        let ret = self.decls[callee].signature().map_or(CType::Void, |sig| sig.ret.clone());
        self.node(NodeKind::Call { callee, args }, ret)
    }

    fn declare(&mut self, decl: DeclId, init: NodeId) -> NodeId {
        self.node(NodeKind::Local { decl, init: Some(init) }, CType::Void)
    }

    /// `if (cond) then`
    fn when(&mut self, cond: NodeId, then: NodeId) -> NodeId {
        let nop = self.node(NodeKind::Nop, CType::Void);
        self.node(NodeKind::Cond { cond, then, else_: nop }, CType::Void)
    }

    pub(super) fn block(&mut self, items: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Block(items), CType::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rewrite::matcher::match_assertion;
    use crate::sema::ASSERT_FAIL;
    use crate::tree::{Stmt, TranslationUnit};

    const PRELUDE: &str = "#include <assert.h>\n#include <stdio.h>\n#include <stdlib.h>\n";

    fn rewrite(body: &str, color: bool) -> (TranslationUnit, NodeId) {
        let mut tu = crate::compile("t.c", &format!("{PRELUDE}void t(int n, int m) {{ {body} }}")).unwrap();
        let Stmt::Expr(node) = tu.function("t").unwrap().body[0].clone() else {
            panic!("expected an expression statement");
        };
        let shape = match_assertion(&tu.tree, &tu.decls, node, ASSERT_FAIL).unwrap();
        let primitives = Primitives::resolve(&tu.decls, &Config::default().primitives).unwrap();
        let mut config = Config::default().rewrite;
        config.color = color;
        let span = tu.tree.span(node);
        let replacement = synthesize(&mut tu.tree, &mut tu.decls, &primitives, &config, &shape, span).unwrap();
        (tu, replacement)
    }

    fn callee_names(tu: &TranslationUnit, block: NodeId) -> Vec<String> {
        let NodeKind::Block(items) = tu.tree.kind(block) else {
            panic!("expected a block");
        };
        items
            .iter()
            .filter_map(|item| match tu.tree.kind(*item) {
                NodeKind::Call { callee, .. } => Some(tu.decls.name(*callee).to_string()),
                NodeKind::Local { decl, .. } => Some(format!("decl {}", tu.decls.name(*decl))),
                NodeKind::Cond { .. } => Some("if".to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_block_layout() {
        let (tu, replacement) = rewrite("assert(n == 5);", false);
        let NodeKind::Cond { then, else_, .. } = tu.tree.kind(replacement) else {
            panic!("expected a conditional");
        };
        assert!(matches!(tu.tree.kind(*then), NodeKind::Nop));
        assert_eq!(
            callee_names(&tu, *else_),
            vec![
                "decl __introspect_repr",
                "decl __introspect_repr_pos",
                "decl __introspect_subexprs",
                "decl __introspect_subexprs_pos",
                "printf",
                "printf",
                "if",
                "if",
                "printf",
                "if",
                "abort",
            ]
        );
    }

    #[test]
    fn test_synthesized_decls_are_marked() {
        let (tu, _) = rewrite("assert(n == 5);", false);
        let synthesized: Vec<_> = tu
            .decls
            .iter()
            .filter(|(_, d)| d.origin == DeclOrigin::Synthesized)
            .map(|(_, d)| d.name.clone())
            .collect();
        assert_eq!(synthesized.len(), 4);
        assert!(synthesized.contains(&"__introspect_subexprs_pos".to_string()));
    }

    #[test]
    fn test_repeated_variable_gets_a_flag() {
        let (tu, _) = rewrite("assert(n == 1 || n == m);", false);
        let flags = tu
            .decls
            .iter()
            .filter(|(_, d)| d.name.starts_with(LISTED_FLAG))
            .count();
        assert_eq!(flags, 1);
    }

    #[test]
    fn test_static_text_is_a_string_argument() {
        let (tu, replacement) = rewrite("assert(n == 5);", false);
        let NodeKind::Cond { else_, .. } = tu.tree.kind(replacement) else {
            panic!("expected a conditional");
        };
        let NodeKind::Block(items) = tu.tree.kind(*else_) else {
            panic!("expected a block");
        };
        let NodeKind::Call { args, .. } = tu.tree.kind(items[5]) else {
            panic!("expected the static text print");
        };
        assert_eq!(tu.tree.kind(args[0]), &NodeKind::StringConst("> assert(%s)\n".into()));
        assert_eq!(tu.tree.kind(args[1]), &NodeKind::StringConst("n == 5".into()));
    }
}
