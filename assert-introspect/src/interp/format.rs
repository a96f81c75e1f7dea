//! printf-style formatting
//!
//! Covers the conversions the rewriter emits and the usual flags around
//! them. Output matches glibc, including `(nil)` for null `%p` and `(null)`
//! for null `%s`.

use super::error::{InterpResult, RuntimeError};
use super::memory::Memory;
use super::value::Value;

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    alternate: bool,
    zero: bool,
}

/// Integer width selected by a length modifier
#[derive(Debug, Clone, Copy, PartialEq)]
enum Length {
    Char,
    Short,
    Int,
    Long,
}

impl Length {
    fn bits(self) -> u32 {
        match self {
            Length::Char => 8,
            Length::Short => 16,
            Length::Int => 32,
            Length::Long => 64,
        }
    }
}

struct Args<'a> {
    values: &'a [Value],
    next: usize,
}

impl Args<'_> {
    fn next(&mut self) -> InterpResult<Value> {
        let value = self
            .values
            .get(self.next)
            .copied()
            .ok_or_else(|| RuntimeError::format_error("too few arguments"))?;
        self.next += 1;
        Ok(value)
    }

    fn next_int(&mut self) -> InterpResult<i128> {
        match self.next()? {
            Value::Int(n) => Ok(n),
            other => Err(RuntimeError::type_error("integer argument", other.type_name())),
        }
    }
}

/// Expand `fmt` with `args`
pub fn format(memory: &Memory, fmt: &[u8], args: &[Value]) -> InterpResult<Vec<u8>> {
    let mut out = Vec::with_capacity(fmt.len());
    let mut args = Args { values: args, next: 0 };
    let mut i = 0;

    while i < fmt.len() {
        if fmt[i] != b'%' {
            out.push(fmt[i]);
            i += 1;
            continue;
        }
        i += 1;

        let mut flags = Flags::default();
        while let Some(c) = fmt.get(i) {
            match c {
                b'-' => flags.left = true,
                b'+' => flags.plus = true,
                b' ' => flags.space = true,
                b'#' => flags.alternate = true,
                b'0' => flags.zero = true,
                _ => break,
            }
            i += 1;
        }

        let mut width = None;
        if fmt.get(i) == Some(&b'*') {
            let w = args.next_int()?;
            if w < 0 {
                flags.left = true;
            }
            width = Some(w.unsigned_abs() as usize);
            i += 1;
        } else {
            let (n, used) = digits(&fmt[i..]);
            if used > 0 {
                width = Some(n);
                i += used;
            }
        }

        let mut precision = None;
        if fmt.get(i) == Some(&b'.') {
            i += 1;
            if fmt.get(i) == Some(&b'*') {
                let p = args.next_int()?;
                precision = usize::try_from(p).ok();
                i += 1;
            } else {
                let (n, used) = digits(&fmt[i..]);
                precision = Some(n);
                i += used;
            }
        }

        let mut length = Length::Int;
        match fmt.get(i) {
            Some(b'h') if fmt.get(i + 1) == Some(&b'h') => {
                length = Length::Char;
                i += 2;
            }
            Some(b'h') => {
                length = Length::Short;
                i += 1;
            }
            Some(b'l') if fmt.get(i + 1) == Some(&b'l') => {
                length = Length::Long;
                i += 2;
            }
            Some(b'l' | b'z' | b'j' | b't') => {
                length = Length::Long;
                i += 1;
            }
            _ => {}
        }

        let Some(&conversion) = fmt.get(i) else {
            return Err(RuntimeError::format_error("incomplete directive"));
        };
        i += 1;

        let field = match conversion {
            b'%' => {
                out.push(b'%');
                continue;
            }
            b'd' | b'i' => {
                let n = wrap(args.next_int()?, length, true);
                let sign = if n < 0 {
                    "-"
                } else if flags.plus {
                    "+"
                } else if flags.space {
                    " "
                } else {
                    ""
                };
                number(sign, "", n.unsigned_abs().to_string(), precision, width, flags)
            }
            b'u' | b'x' | b'X' | b'o' => {
                let n = wrap(args.next_int()?, length, false) as u128;
                let (digits, prefix) = match conversion {
                    b'u' => (n.to_string(), ""),
                    b'x' => (format!("{n:x}"), if flags.alternate && n != 0 { "0x" } else { "" }),
                    b'X' => (format!("{n:X}"), if flags.alternate && n != 0 { "0X" } else { "" }),
                    _ => (format!("{n:o}"), if flags.alternate && n != 0 { "0" } else { "" }),
                };
                number("", prefix, digits, precision, width, flags)
            }
            b'c' => {
                let c = wrap(args.next_int()?, Length::Char, false) as u8;
                pad(vec![c], width, flags.left, b' ')
            }
            b's' => {
                let bytes = match args.next()?.as_ptr() {
                    Some(addr) if addr.is_null() => b"(null)".to_vec(),
                    Some(addr) => memory.read_cstr(addr)?,
                    None => return Err(RuntimeError::type_error("string argument", "integer")),
                };
                let shown = match precision {
                    Some(p) => bytes[..p.min(bytes.len())].to_vec(),
                    None => bytes,
                };
                pad(shown, width, flags.left, b' ')
            }
            b'p' => {
                let value = args.next()?;
                let addr = value
                    .as_ptr()
                    .ok_or_else(|| RuntimeError::type_error("pointer argument", value.type_name()))?;
                let text = if addr.is_null() {
                    "(nil)".to_string()
                } else {
                    format!("0x{:x}", memory.numeric(addr))
                };
                pad(text.into_bytes(), width, flags.left, b' ')
            }
            other => {
                return Err(RuntimeError::format_error(&format!(
                    "unsupported conversion '%{}'",
                    other as char
                )))
            }
        };
        out.extend(field);
    }
    Ok(out)
}

fn digits(text: &[u8]) -> (usize, usize) {
    let used = text.iter().take_while(|c| c.is_ascii_digit()).count();
    let n = text[..used]
        .iter()
        .fold(0usize, |acc, d| acc.saturating_mul(10).saturating_add(usize::from(d - b'0')));
    (n, used)
}

/// Reinterpret a promoted argument at the directive's width
fn wrap(value: i128, length: Length, signed: bool) -> i128 {
    let bits = length.bits();
    let truncated = value & ((1i128 << bits) - 1);
    if signed && (truncated >> (bits - 1)) & 1 == 1 {
        truncated - (1i128 << bits)
    } else {
        truncated
    }
}

fn number(sign: &str, prefix: &str, digits: String, precision: Option<usize>, width: Option<usize>, flags: Flags) -> Vec<u8> {
    let digits = match precision {
        // `%.0d` of zero prints nothing
        Some(0) if digits == "0" => String::new(),
        Some(p) if digits.len() < p => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    };
    let head = format!("{sign}{prefix}");
    let len = head.len() + digits.len();
    match width {
        Some(w) if w > len && flags.zero && !flags.left && precision.is_none() => {
            format!("{head}{}{digits}", "0".repeat(w - len)).into_bytes()
        }
        _ => pad(format!("{head}{digits}").into_bytes(), width, flags.left, b' '),
    }
}

fn pad(mut bytes: Vec<u8>, width: Option<usize>, left: bool, fill: u8) -> Vec<u8> {
    let Some(width) = width else {
        return bytes;
    };
    if bytes.len() >= width {
        return bytes;
    }
    let padding = vec![fill; width - bytes.len()];
    if left {
        bytes.extend(padding);
        bytes
    } else {
        let mut out = padding;
        out.extend(bytes);
        out
    }
}
