//! Interpreter for translation units
//!
//! Runs rewritten or original code directly on the arena, with the C
//! runtime functions the supported headers declare. Standard output and
//! error are captured rather than written through.

mod builtins;
mod error;
mod eval;
mod format;
mod memory;
mod value;

pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::Interpreter;
pub use value::{Address, Region, Value};

use crate::tree::TranslationUnit;

/// Exit status of a process killed by `SIGABRT`, as a shell reports it
pub const ABORT_STATUS: i32 = 134;

/// How a call ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Returned(Value),
    Aborted,
    Exited(i32),
}

impl Outcome {
    /// Process exit status if this call were `main`
    pub fn status(&self) -> i32 {
        match self {
            Outcome::Returned(Value::Int(n)) => *n as i32,
            Outcome::Returned(_) => 0,
            Outcome::Aborted => ABORT_STATUS,
            Outcome::Exited(status) => *status,
        }
    }
}

/// A finished call and everything it printed
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: Outcome,
    pub stdout: String,
    pub stderr: String,
}

/// Call `function` in a fresh instance of `unit`
pub fn run(unit: &TranslationUnit, function: &str, args: &[Value]) -> InterpResult<Execution> {
    let mut interp = Interpreter::new(unit)?;
    let outcome = interp.call(function, args)?;
    Ok(Execution {
        outcome,
        stdout: interp.stdout(),
        stderr: interp.stderr(),
    })
}
