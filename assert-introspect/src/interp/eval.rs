//! Statement and expression evaluator

use std::cmp::Ordering;
use std::collections::HashMap;

use super::builtins::{registry, BuiltinFn, Runtime};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::value::{Address, Value};
use super::Outcome;
use crate::ast::{BinOp, CType, FloatKind, OpClass, UnOp};
use crate::tree::{DeclId, DeclKind, Function, NodeId, NodeKind, Stmt, TranslationUnit};

/// Maximum recursion depth
const MAX_RECURSION_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Activation of a user function
struct Frame {
    function: DeclId,
    locals: HashMap<DeclId, Value>,
    /// Blocks standing in for address-taken locals
    homes: HashMap<DeclId, Address>,
    /// Values of evaluate-once handles reached in the current statement
    saved: HashMap<NodeId, Value>,
}

/// How a statement finished
enum Flow {
    Next,
    Return(Value),
}

/// The interpreter
pub struct Interpreter<'u> {
    unit: &'u TranslationUnit,
    /// Functions with a body
    functions: HashMap<DeclId, &'u Function>,
    /// Builtin functions
    builtins: HashMap<&'static str, BuiltinFn>,
    runtime: Runtime,
    /// Globals and static locals
    globals: HashMap<DeclId, Value>,
    global_homes: HashMap<DeclId, Address>,
    frames: Vec<Frame>,
    /// Interned string literals
    strings: HashMap<String, Address>,
    /// Current recursion depth
    recursion_depth: usize,
}

impl<'u> Interpreter<'u> {
    /// Load `unit`: lay out string storage and initialize static variables
    pub fn new(unit: &'u TranslationUnit) -> InterpResult<Self> {
        let program = std::path::Path::new(&unit.filename)
            .file_stem()
            .map_or_else(|| unit.filename.clone(), |stem| stem.to_string_lossy().into_owned());
        let mut interp = Interpreter {
            unit,
            functions: unit.functions().map(|f| (f.decl, f)).collect(),
            builtins: registry(),
            runtime: Runtime {
                program,
                ..Runtime::default()
            },
            globals: HashMap::new(),
            global_homes: HashMap::new(),
            frames: Vec::new(),
            strings: HashMap::new(),
            recursion_depth: 0,
        };

        let statics: Vec<_> = unit
            .decls
            .iter()
            .filter_map(|(id, decl)| match decl.kind {
                DeclKind::Global { init } | DeclKind::StaticLocal { init } => Some((id, init)),
                _ => None,
            })
            .collect();
        for (decl, init) in statics {
            let value = interp.initial_value(decl, init)?;
            interp.globals.insert(decl, value);
        }
        Ok(interp)
    }

    /// Call the function `name` with `args`
    ///
    /// `abort()` and `exit()` end the call with the matching outcome instead
    /// of an error.
    pub fn call(&mut self, name: &str, args: &[Value]) -> InterpResult<Outcome> {
        let decl = self
            .unit
            .decls
            .find_function(name)
            .ok_or_else(|| RuntimeError::undefined_function(name))?;
        match self.call_decl(decl, args.to_vec()) {
            Ok(value) => Ok(Outcome::Returned(value)),
            Err(e) => match e.kind {
                ErrorKind::Aborted => Ok(Outcome::Aborted),
                ErrorKind::Exited(status) => Ok(Outcome::Exited(status)),
                _ => Err(e),
            },
        }
    }

    /// A string in interpreter memory, e.g. for passing `char *` arguments
    pub fn alloc_str(&mut self, text: &str) -> Value {
        Value::Ptr(self.runtime.memory.alloc_str(text))
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.runtime.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.runtime.stderr).into_owned()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call_decl(&mut self, decl: DeclId, args: Vec<Value>) -> InterpResult<Value> {
        if let Some(function) = self.functions.get(&decl).copied() {
            return self.call_function(function, args);
        }
        let unit = self.unit;
        let name = unit.decls.name(decl);
        let builtin = self
            .builtins
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::undefined_function(name))?;
        builtin(&mut self.runtime, &args)
    }

    fn call_function(&mut self, function: &'u Function, args: Vec<Value>) -> InterpResult<Value> {
        if function.params.len() != args.len() {
            return Err(RuntimeError::arity_mismatch(
                self.unit.decls.name(function.decl),
                function.params.len(),
                args.len(),
            ));
        }
        if self.recursion_depth >= MAX_RECURSION_DEPTH {
            return Err(RuntimeError::stack_overflow());
        }

        let unit = self.unit;
        let mut locals = HashMap::with_capacity(args.len());
        for (param, arg) in function.params.iter().zip(args) {
            locals.insert(*param, self.convert(arg, &unit.decls[*param].ty)?);
        }

        self.recursion_depth += 1;
        self.frames.push(Frame {
            function: function.decl,
            locals,
            homes: HashMap::new(),
            saved: HashMap::new(),
        });
        let result = self.exec_block(&function.body);
        self.frames.pop();
        self.recursion_depth -= 1;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::Void),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_block(&mut self, body: &'u [Stmt]) -> InterpResult<Flow> {
        for stmt in body {
            if let Flow::Return(value) = self.exec_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(&mut self, stmt: &'u Stmt) -> InterpResult<Flow> {
        // Handles are shared within one source statement only
        if !matches!(stmt, Stmt::Block(_)) {
            if let Some(frame) = self.frames.last_mut() {
                frame.saved.clear();
            }
        }
        match stmt {
            Stmt::Expr(id) => {
                self.eval(*id)?;
                Ok(Flow::Next)
            }
            Stmt::Local { decl, init } => {
                if !self.unit.decls[*decl].has_static_storage() {
                    self.define_local(*decl, *init)?;
                }
                Ok(Flow::Next)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(id) => self.eval(*id)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If { cond, then_body, else_body } => {
                if self.eval(*cond)?.is_truthy() {
                    self.exec_block(then_body)
                } else {
                    self.exec_block(else_body)
                }
            }
            Stmt::Block(body) => self.exec_block(body),
        }
    }

    fn define_local(&mut self, decl: DeclId, init: Option<NodeId>) -> InterpResult<()> {
        let value = self.initial_value(decl, init)?;
        self.frame_mut()?.locals.insert(decl, value);
        Ok(())
    }

    /// Value of a fresh variable; arrays get a zeroed block
    fn initial_value(&mut self, decl: DeclId, init: Option<NodeId>) -> InterpResult<Value> {
        let ty = self.unit.decls[decl].ty.clone();
        if ty.is_array() {
            let mut bytes = vec![0u8; ty.size()];
            if let Some(NodeKind::StringConst(s)) = init.map(|id| self.unit.tree.kind(id)) {
                let n = s.len().min(bytes.len());
                bytes[..n].copy_from_slice(&s.as_bytes()[..n]);
            }
            return Ok(Value::Ptr(self.runtime.memory.alloc(bytes, false)));
        }
        match init {
            Some(id) => self.eval(id),
            None => Ok(zero_of(&ty)),
        }
    }

    fn frame(&self) -> InterpResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::type_error("function context", "file scope"))
    }

    fn frame_mut(&mut self) -> InterpResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::type_error("function context", "file scope"))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Evaluate a node, growing the stack for deeply nested trees
    pub fn eval(&mut self, id: NodeId) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(id))
    }

    fn eval_inner(&mut self, id: NodeId) -> InterpResult<Value> {
        let unit = self.unit;
        let tree = &unit.tree;
        let ty = tree.ty(id);
        match tree.kind(id) {
            NodeKind::IntConst { value, .. } => self.convert(Value::Int(*value), ty),
            NodeKind::FloatConst { value, .. } => Ok(Value::Float(*value)),
            NodeKind::StringConst(s) => Ok(Value::Ptr(self.intern(s))),
            NodeKind::DeclRef(decl) => self.read(*decl),
            NodeKind::FuncName => {
                let function = self.frame()?.function;
                let name = unit.decls.name(function);
                Ok(Value::Ptr(self.intern(name)))
            }
            NodeKind::AddressOf(inner) => self.address_of(*inner),
            NodeKind::Unary { op, operand } => {
                let value = self.eval(*operand)?;
                unary(*op, value, ty)
            }
            NodeKind::Binary { op, lhs, rhs } => self.binary(*op, *lhs, *rhs, ty),
            NodeKind::Call { callee, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(*arg)?);
                }
                self.call_decl(*callee, values)
            }
            NodeKind::ImplicitConv(inner) => {
                let value = self.eval(*inner)?;
                self.convert(value, ty)
            }
            NodeKind::Assign { target, op, value } => {
                let value = self.eval(*value)?;
                let target_ty = &unit.decls[*target].ty;
                let result = match op {
                    Some(op) => {
                        let current = self.read(*target)?;
                        self.arithmetic(*op, current, value, target_ty, target_ty)?
                    }
                    None => self.convert(value, target_ty)?,
                };
                self.write(*target, result)?;
                Ok(result)
            }
            NodeKind::Save(inner) => {
                let inner = *inner;
                if let Some(value) = self.frames.last().and_then(|f| f.saved.get(&id)) {
                    return Ok(*value);
                }
                let value = self.eval(inner)?;
                if let Some(frame) = self.frames.last_mut() {
                    frame.saved.insert(id, value);
                }
                Ok(value)
            }
            NodeKind::Cond { cond, then, else_ } => {
                let (then, else_) = (*then, *else_);
                if self.eval(*cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(else_)
                }
            }
            NodeKind::Nop => Ok(Value::Void),
            NodeKind::Block(items) => {
                for item in items {
                    self.eval(*item)?;
                }
                Ok(Value::Void)
            }
            NodeKind::Local { decl, init } => {
                self.define_local(*decl, *init)?;
                Ok(Value::Void)
            }
            NodeKind::ZeroInit => Ok(zero_of(ty)),
        }
    }

    fn intern(&mut self, text: &str) -> Address {
        if let Some(addr) = self.strings.get(text) {
            return *addr;
        }
        let addr = self.runtime.memory.alloc_str(text);
        self.strings.insert(text.to_string(), addr);
        addr
    }

    fn read(&self, decl: DeclId) -> InterpResult<Value> {
        let found = if self.unit.decls[decl].has_static_storage() {
            self.globals.get(&decl)
        } else {
            self.frames.last().and_then(|f| f.locals.get(&decl))
        };
        found
            .copied()
            .ok_or_else(|| RuntimeError::undefined_variable(self.unit.decls.name(decl)))
    }

    fn write(&mut self, decl: DeclId, value: Value) -> InterpResult<()> {
        if self.unit.decls[decl].has_static_storage() {
            self.globals.insert(decl, value);
        } else {
            self.frame_mut()?.locals.insert(decl, value);
        }
        Ok(())
    }

    /// `&x`: arrays are their block, scalars get a block of their own
    fn address_of(&mut self, inner: NodeId) -> InterpResult<Value> {
        let NodeKind::DeclRef(decl) = self.unit.tree.kind(inner) else {
            return Err(RuntimeError::type_error("variable operand of '&'", "expression"));
        };
        let decl = *decl;
        if self.unit.decls[decl].ty.is_array() {
            return self.read(decl);
        }
        let size = self.unit.decls[decl].ty.size();
        let existing = if self.unit.decls[decl].has_static_storage() {
            self.global_homes.get(&decl).copied()
        } else {
            self.frame()?.homes.get(&decl).copied()
        };
        if let Some(addr) = existing {
            return Ok(Value::Ptr(addr));
        }
        let addr = self.runtime.memory.alloc(vec![0; size], false);
        if self.unit.decls[decl].has_static_storage() {
            self.global_homes.insert(decl, addr);
        } else {
            self.frame_mut()?.homes.insert(decl, addr);
        }
        Ok(Value::Ptr(addr))
    }

    fn binary(&mut self, op: BinOp, lhs: NodeId, rhs: NodeId, ty: &CType) -> InterpResult<Value> {
        match op {
            BinOp::And => {
                let result = self.eval(lhs)?.is_truthy() && self.eval(rhs)?.is_truthy();
                return Ok(Value::from_bool(result));
            }
            BinOp::Or => {
                let result = self.eval(lhs)?.is_truthy() || self.eval(rhs)?.is_truthy();
                return Ok(Value::from_bool(result));
            }
            _ => {}
        }

        let l = self.eval(lhs)?;
        let r = self.eval(rhs)?;
        match op.class() {
            OpClass::Logical => Ok(Value::from_bool(if op.is_logical_and() {
                l.is_truthy() && r.is_truthy()
            } else {
                l.is_truthy() || r.is_truthy()
            })),
            OpClass::Relational => {
                let ordering = self.compare(l, r)?;
                let result = match op {
                    BinOp::Eq => ordering == Some(Ordering::Equal),
                    BinOp::Ne => ordering != Some(Ordering::Equal),
                    BinOp::Lt => ordering == Some(Ordering::Less),
                    BinOp::Gt => ordering == Some(Ordering::Greater),
                    BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                };
                Ok(Value::from_bool(result))
            }
            OpClass::Arithmetic => {
                let operand_ty = self.unit.tree.ty(lhs);
                self.arithmetic(op, l, r, ty, operand_ty)
            }
        }
    }

    /// `None` when the operands are unordered (NaN)
    fn compare(&self, l: Value, r: Value) -> InterpResult<Option<Ordering>> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(&b))),
            (Value::Ptr(a), Value::Ptr(b)) => {
                let memory = &self.runtime.memory;
                Ok(Some(memory.numeric(a).cmp(&memory.numeric(b))))
            }
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => Ok(x.partial_cmp(&y)),
                _ => Err(RuntimeError::type_error(a.type_name(), b.type_name())),
            },
        }
    }

    /// Arithmetic producing `ty`; `operand_ty` is the left operand's type,
    /// which scales pointer differences
    fn arithmetic(&self, op: BinOp, l: Value, r: Value, ty: &CType, operand_ty: &CType) -> InterpResult<Value> {
        match (l, r) {
            (Value::Ptr(a), Value::Ptr(b)) if op == BinOp::Sub => {
                let memory = &self.runtime.memory;
                let diff = memory.numeric(a) as i128 - memory.numeric(b) as i128;
                let size = element_size(operand_ty);
                self.convert(Value::Int(diff / size), ty)
            }
            (Value::Ptr(p), Value::Int(n)) | (Value::Int(n), Value::Ptr(p)) => {
                let step = element_size(ty);
                let n = if op == BinOp::Sub { -n } else { n };
                Ok(Value::Ptr(p.offset_by((n * step) as i64)))
            }
            (Value::Int(a), Value::Int(b)) => {
                let it = ty
                    .int_type()
                    .ok_or_else(|| RuntimeError::type_error("integer result", &ty.to_string()))?;
                let result = match op {
                    BinOp::Add => a.wrapping_add(b),
                    BinOp::Sub => a.wrapping_sub(b),
                    BinOp::Mul => a.wrapping_mul(b),
                    BinOp::Div | BinOp::Mod if b == 0 => return Err(RuntimeError::division_by_zero()),
                    BinOp::Div => a.wrapping_div(b),
                    BinOp::Mod => a.wrapping_rem(b),
                    BinOp::Shl => a.wrapping_shl(b.clamp(0, 127) as u32),
                    BinOp::Shr => a >> b.clamp(0, 127),
                    BinOp::BitAnd => a & b,
                    BinOp::BitOr => a | b,
                    BinOp::BitXor => a ^ b,
                    other => return Err(RuntimeError::type_error("arithmetic operator", other.as_str())),
                };
                Ok(Value::Int(it.wrap(result)))
            }
            (a, b) => {
                let (Some(x), Some(y)) = (a.as_float(), b.as_float()) else {
                    return Err(RuntimeError::type_error(a.type_name(), b.type_name()));
                };
                let result = match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    BinOp::Mul => x * y,
                    BinOp::Div => x / y,
                    other => return Err(RuntimeError::type_error("floating operator", other.as_str())),
                };
                self.convert(Value::Float(result), ty)
            }
        }
    }

    /// Convert `value` to `to` the way C converts between scalar types
    fn convert(&self, value: Value, to: &CType) -> InterpResult<Value> {
        match to.strip_typedefs() {
            CType::Void => Ok(Value::Void),
            CType::Bool => Ok(Value::from_bool(value.is_truthy())),
            CType::Int(it) => match value {
                Value::Int(n) => Ok(Value::Int(it.wrap(n))),
                Value::Float(f) => Ok(Value::Int(it.wrap(f.trunc() as i128))),
                Value::Ptr(addr) => Ok(Value::Int(it.wrap(self.runtime.memory.numeric(addr) as i128))),
                Value::Void => Err(RuntimeError::type_error("scalar", "void")),
            },
            CType::Float(kind) => {
                let x = value
                    .as_float()
                    .ok_or_else(|| RuntimeError::type_error("arithmetic value", value.type_name()))?;
                Ok(Value::Float(match kind {
                    FloatKind::Float => f64::from(x as f32),
                    FloatKind::Double => x,
                }))
            }
            CType::Pointer(_) | CType::Array(..) => match value {
                Value::Ptr(addr) => Ok(Value::Ptr(addr)),
                Value::Int(0) => Ok(Value::NULL),
                other => Err(RuntimeError::type_error("pointer", other.type_name())),
            },
            CType::Typedef(..) => unreachable!("typedefs are stripped"),
        }
    }
}

fn unary(op: UnOp, value: Value, ty: &CType) -> InterpResult<Value> {
    match (op, value) {
        (UnOp::Not, v) => Ok(Value::from_bool(!v.is_truthy())),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Neg | UnOp::BitNot, Value::Int(n)) => {
            let result = if op == UnOp::Neg { n.wrapping_neg() } else { !n };
            Ok(Value::Int(ty.int_type().map_or(result, |it| it.wrap(result))))
        }
        (op, v) => Err(RuntimeError::type_error(&format!("operand of '{op}'"), v.type_name())),
    }
}

fn zero_of(ty: &CType) -> Value {
    if ty.is_pointer() {
        Value::NULL
    } else if ty.is_float() {
        Value::Float(0.0)
    } else {
        Value::Int(0)
    }
}

/// Bytes per step of a pointer of type `ty`; `void *` steps by one
fn element_size(ty: &CType) -> i128 {
    match ty.pointee() {
        Some(inner) if !inner.is_void() => inner.size() as i128,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, function: &str, args: &[Value]) -> (Outcome, String) {
        let tu = crate::compile("t.c", source).unwrap();
        let mut interp = Interpreter::new(&tu).unwrap();
        let outcome = interp.call(function, args).unwrap();
        (outcome, interp.stdout())
    }

    fn returned(source: &str, args: &[Value]) -> Value {
        match run(source, "f", args).0 {
            Outcome::Returned(value) => value,
            other => panic!("expected a return, got {other:?}"),
        }
    }

    #[test]
    fn test_integer_wrapping() {
        assert_eq!(returned("unsigned f(unsigned a) { return a - 1; }", &[Value::Int(0)]), Value::Int(4294967295));
        assert_eq!(returned("int f(int a) { return a * 2; }", &[Value::Int(0x7fffffff)]), Value::Int(-2));
        assert_eq!(returned("int f(char c) { return c + 1; }", &[Value::Int(127)]), Value::Int(128));
        assert_eq!(returned("char f(int c) { return c; }", &[Value::Int(200)]), Value::Int(-56));
    }

    #[test]
    fn test_usual_arithmetic_conversions() {
        // -1 converts to unsigned before comparing
        assert_eq!(returned("int f(int a) { return a < 1u; }", &[Value::Int(-1)]), Value::Int(0));
        assert_eq!(returned("int f(int a, int b) { return a / b + a % b; }", &[Value::Int(-7), Value::Int(2)]), Value::Int(-4));
    }

    #[test]
    fn test_division_by_zero() {
        let tu = crate::compile("t.c", "int f(int a) { return 1 / a; }").unwrap();
        let mut interp = Interpreter::new(&tu).unwrap();
        let err = interp.call("f", &[Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_short_circuit() {
        let source = "#include <stdio.h>\nint hit(void) { printf(\"hit\"); return 1; }\nint f(int a) { return a || hit(); }";
        let (_, out) = run(source, "f", &[Value::Int(1)]);
        assert_eq!(out, "");
        let (_, out) = run(source, "f", &[Value::Int(0)]);
        assert_eq!(out, "hit");
    }

    #[test]
    fn test_eager_or_evaluates_both() {
        let source = "#include <stdio.h>\nint hit(void) { printf(\"hit\"); return 1; }\nint f(int a) { return (a > 0) | (hit() > 0); }";
        let (_, out) = run(source, "f", &[Value::Int(1)]);
        assert_eq!(out, "hit");
    }

    #[test]
    fn test_static_local_persists() {
        let source = "int f(void) { static int calls = 0; calls = calls + 1; return calls; }";
        let tu = crate::compile("t.c", source).unwrap();
        let mut interp = Interpreter::new(&tu).unwrap();
        interp.call("f", &[]).unwrap();
        assert!(matches!(interp.call("f", &[]).unwrap(), Outcome::Returned(Value::Int(2))));
    }

    #[test]
    fn test_globals_and_recursion() {
        let source = "int base = 10;\nint f(int n) { if (n == 0) { return base; } return f(n - 1) + 1; }";
        assert_eq!(returned(source, &[Value::Int(5)]), Value::Int(15));
    }

    #[test]
    fn test_strings_and_pointers() {
        let source = "#include <string.h>\nint f(void) { char buf[8] = \"abc\"; char *p = buf + 1; return strlen(p) + (p - buf); }";
        assert_eq!(returned(source, &[]), Value::Int(3));
    }

    #[test]
    fn test_strstr_null_result() {
        let source = "#include <string.h>\nint f(void) { return strstr(\"abc\", \"x\") == NULL; }";
        assert_eq!(returned(source, &[]), Value::Int(1));
    }

    #[test]
    fn test_abort_and_exit_outcomes() {
        let source = "#include <stdlib.h>\nvoid f(int a) { if (a) { abort(); } exit(3); }";
        assert_eq!(run(source, "f", &[Value::Int(1)]).0, Outcome::Aborted);
        assert_eq!(run(source, "f", &[Value::Int(0)]).0, Outcome::Exited(3));
    }

    #[test]
    fn test_failed_assertion_aborts_with_message() {
        let source = "#include <assert.h>\nvoid test(int n) { assert(n == 5); }";
        let tu = crate::compile("t.c", source).unwrap();
        let mut interp = Interpreter::new(&tu).unwrap();
        assert_eq!(interp.call("test", &[Value::Int(3)]).unwrap(), Outcome::Aborted);
        assert_eq!(interp.stderr(), "t: t.c:2: test: Assertion `n == 5' failed.\n");
        assert_eq!(interp.call("test", &[Value::Int(5)]).unwrap(), Outcome::Returned(Value::Void));
    }

    #[test]
    fn test_deep_recursion_overflows_cleanly() {
        let source = "int f(int n) { return f(n + 1); }";
        let tu = crate::compile("t.c", source).unwrap();
        let mut interp = Interpreter::new(&tu).unwrap();
        let err = interp.call("f", &[Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }
}
