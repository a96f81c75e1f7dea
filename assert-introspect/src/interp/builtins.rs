//! Runtime implementations of the standard functions the headers declare

use std::collections::HashMap;

use super::error::{InterpResult, RuntimeError};
use super::format::format;
use super::memory::Memory;
use super::value::{Address, Value};

/// Process-wide state the primitives touch
#[derive(Debug, Default)]
pub struct Runtime {
    pub memory: Memory,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Shown as the program name in assertion messages
    pub program: String,
}

/// Builtin function type
pub type BuiltinFn = fn(&mut Runtime, &[Value]) -> InterpResult<Value>;

/// Every primitive, by C name
pub fn registry() -> HashMap<&'static str, BuiltinFn> {
    let mut builtins: HashMap<&'static str, BuiltinFn> = HashMap::new();
    builtins.insert("printf", builtin_printf);
    builtins.insert("snprintf", builtin_snprintf);
    builtins.insert("puts", builtin_puts);
    builtins.insert("abort", builtin_abort);
    builtins.insert("exit", builtin_exit);
    builtins.insert("abs", builtin_abs);
    builtins.insert("__assert_fail", builtin_assert_fail);
    builtins.insert("strlen", builtin_strlen);
    builtins.insert("strcmp", builtin_strcmp);
    builtins.insert("strstr", builtin_strstr);
    builtins
}

fn arity(name: &str, args: &[Value], expected: usize) -> InterpResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::arity_mismatch(name, expected, args.len()))
    }
}

fn pointer(value: &Value) -> InterpResult<Address> {
    value
        .as_ptr()
        .ok_or_else(|| RuntimeError::type_error("pointer", value.type_name()))
}

fn integer(value: &Value) -> InterpResult<i128> {
    value
        .as_int()
        .ok_or_else(|| RuntimeError::type_error("integer", value.type_name()))
}

fn string(rt: &Runtime, value: &Value) -> InterpResult<Vec<u8>> {
    rt.memory.read_cstr(pointer(value)?)
}

fn builtin_printf(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    let Some((fmt, rest)) = args.split_first() else {
        return Err(RuntimeError::arity_mismatch("printf", 1, 0));
    };
    let text = format(&rt.memory, &string(rt, fmt)?, rest)?;
    let written = text.len();
    rt.stdout.extend(text);
    Ok(Value::Int(written as i128))
}

/// Writes at most `size - 1` bytes plus a NUL, returns the untruncated length
fn builtin_snprintf(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    let [dest, size, fmt, rest @ ..] = args else {
        return Err(RuntimeError::arity_mismatch("snprintf", 3, args.len()));
    };
    let size = usize::try_from(integer(size)?).map_err(|_| RuntimeError::format_error("negative size"))?;
    let text = format(&rt.memory, &string(rt, fmt)?, rest)?;
    if size > 0 {
        let kept = text.len().min(size - 1);
        let mut bytes = text[..kept].to_vec();
        bytes.push(0);
        rt.memory.write(pointer(dest)?, &bytes)?;
    }
    Ok(Value::Int(text.len() as i128))
}

fn builtin_puts(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("puts", args, 1)?;
    let text = string(rt, &args[0])?;
    let written = text.len() + 1;
    rt.stdout.extend(text);
    rt.stdout.push(b'\n');
    Ok(Value::Int(written as i128))
}

fn builtin_abort(_rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("abort", args, 0)?;
    Err(RuntimeError::aborted())
}

fn builtin_exit(_rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("exit", args, 1)?;
    Err(RuntimeError::exited(integer(&args[0])? as i32))
}

fn builtin_abs(_rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("abs", args, 1)?;
    let n = integer(&args[0])?;
    // abs(INT_MIN) stays INT_MIN
    Ok(Value::Int(if n == i128::from(i32::MIN) { n } else { n.abs() }))
}

/// glibc's message: `prog: file:line: func: Assertion `text' failed.`
fn builtin_assert_fail(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("__assert_fail", args, 4)?;
    let text = String::from_utf8_lossy(&string(rt, &args[0])?).into_owned();
    let file = String::from_utf8_lossy(&string(rt, &args[1])?).into_owned();
    let line = integer(&args[2])?;
    let function = String::from_utf8_lossy(&string(rt, &args[3])?).into_owned();
    let message = format!(
        "{}: {file}:{line}: {function}: Assertion `{text}' failed.\n",
        rt.program
    );
    rt.stderr.extend(message.into_bytes());
    Err(RuntimeError::aborted())
}

fn builtin_strlen(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("strlen", args, 1)?;
    Ok(Value::Int(string(rt, &args[0])?.len() as i128))
}

fn builtin_strcmp(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("strcmp", args, 2)?;
    let a = string(rt, &args[0])?;
    let b = string(rt, &args[1])?;
    let diff = a
        .iter()
        .chain(std::iter::once(&0))
        .zip(b.iter().chain(std::iter::once(&0)))
        .map(|(x, y)| i128::from(*x) - i128::from(*y))
        .find(|d| *d != 0)
        .unwrap_or(0);
    Ok(Value::Int(diff))
}

fn builtin_strstr(rt: &mut Runtime, args: &[Value]) -> InterpResult<Value> {
    arity("strstr", args, 2)?;
    let haystack_at = pointer(&args[0])?;
    let haystack = string(rt, &args[0])?;
    let needle = string(rt, &args[1])?;
    if needle.is_empty() {
        return Ok(Value::Ptr(haystack_at));
    }
    let found = haystack
        .windows(needle.len())
        .position(|window| window == needle.as_slice());
    Ok(match found {
        Some(at) => Value::Ptr(haystack_at.offset_by(at as i64)),
        None => Value::NULL,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::error::ErrorKind;

    fn runtime() -> Runtime {
        Runtime {
            program: "prog".to_string(),
            ..Runtime::default()
        }
    }

    #[test]
    fn test_snprintf_truncates_and_reports_full_length() {
        let mut rt = runtime();
        let buf = rt.memory.alloc(vec![0; 4], false);
        let fmt = rt.memory.alloc_str("%d!");
        let n = builtin_snprintf(&mut rt, &[Value::Ptr(buf), Value::Int(4), Value::Ptr(fmt), Value::Int(12345)]).unwrap();
        assert_eq!(n, Value::Int(6));
        assert_eq!(rt.memory.read_cstr(buf).unwrap(), b"123");
    }

    #[test]
    fn test_snprintf_zero_size_writes_nothing() {
        let mut rt = runtime();
        let fmt = rt.memory.alloc_str("abc");
        let n = builtin_snprintf(&mut rt, &[Value::NULL, Value::Int(0), Value::Ptr(fmt)]).unwrap();
        assert_eq!(n, Value::Int(3));
    }

    #[test]
    fn test_printf_and_puts_capture_stdout() {
        let mut rt = runtime();
        let fmt = rt.memory.alloc_str("n=%d\n");
        builtin_printf(&mut rt, &[Value::Ptr(fmt), Value::Int(3)]).unwrap();
        let s = rt.memory.alloc_str("done");
        builtin_puts(&mut rt, &[Value::Ptr(s)]).unwrap();
        assert_eq!(rt.stdout, b"n=3\ndone\n");
    }

    #[test]
    fn test_strstr() {
        let mut rt = runtime();
        let hay = rt.memory.alloc_str("hello world");
        let hit = rt.memory.alloc_str("world");
        let miss = rt.memory.alloc_str("xyz");
        let found = builtin_strstr(&mut rt, &[Value::Ptr(hay), Value::Ptr(hit)]).unwrap();
        assert_eq!(found, Value::Ptr(hay.offset_by(6)));
        assert_eq!(builtin_strstr(&mut rt, &[Value::Ptr(hay), Value::Ptr(miss)]).unwrap(), Value::NULL);
    }

    #[test]
    fn test_strcmp_and_strlen() {
        let mut rt = runtime();
        let a = rt.memory.alloc_str("abc");
        let b = rt.memory.alloc_str("abd");
        let cmp = builtin_strcmp(&mut rt, &[Value::Ptr(a), Value::Ptr(b)]).unwrap();
        assert!(cmp.as_int().unwrap() < 0);
        assert_eq!(builtin_strcmp(&mut rt, &[Value::Ptr(a), Value::Ptr(a)]).unwrap(), Value::Int(0));
        assert_eq!(builtin_strlen(&mut rt, &[Value::Ptr(a)]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_assert_fail_message() {
        let mut rt = runtime();
        let args = [
            Value::Ptr(rt.memory.alloc_str("n == 5")),
            Value::Ptr(rt.memory.alloc_str("t.c")),
            Value::Int(4),
            Value::Ptr(rt.memory.alloc_str("test")),
        ];
        let err = builtin_assert_fail(&mut rt, &args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Aborted);
        assert_eq!(
            String::from_utf8(rt.stderr).unwrap(),
            "prog: t.c:4: test: Assertion `n == 5' failed.\n"
        );
    }

    #[test]
    fn test_exit_and_abort() {
        let mut rt = runtime();
        assert_eq!(builtin_exit(&mut rt, &[Value::Int(2)]).unwrap_err().kind, ErrorKind::Exited(2));
        assert_eq!(builtin_abort(&mut rt, &[]).unwrap_err().kind, ErrorKind::Aborted);
        assert!(builtin_abort(&mut rt, &[Value::Int(1)]).is_err());
    }
}
