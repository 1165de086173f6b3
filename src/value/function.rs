//! # Function — native and user-defined callables
//!
//! A `Function` value is either a native Rust closure with an
//! argument-count/type contract, or a user-defined function pairing a
//! [`crate::closure::ClosureInfo`] with its compiled body. Calling either
//! kind goes through [`crate::vm::call_function`]; this module only holds
//! the data each carries.

use std::fmt;
use std::rc::Rc;

use crate::closure::ClosureInfo;
use crate::error::RuntimeError;
use crate::symbol::Symbol;
use crate::value::Value;

/// A single `(kindMask, kindExpected)` argument-type check. `kind_mask`
/// selects which [`crate::value::Kind`]s are acceptable for one argument
/// position (encoded as a bitmask over `Kind as u32`); `label` is used to
/// build the `native_method_error` message when a call fails the check.
#[derive(Clone, Debug)]
pub struct ArgCheck {
    pub kind_mask: u64,
    pub label: &'static str,
}

impl ArgCheck {
    pub fn any() -> ArgCheck {
        ArgCheck {
            kind_mask: u64::MAX,
            label: "any",
        }
    }

    pub fn accepts(&self, kind: crate::value::Kind) -> bool {
        self.kind_mask & (1u64 << (kind as u32 & 63)) != 0
    }
}

/// Argument-count policy for a native, mirroring /// "exact|min|max|both" check bits.
#[derive(Clone, Copy, Debug)]
pub enum Arity {
    Exact(u16),
    AtLeast(u16),
    AtMost(u16),
    Range(u16, u16),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        let argc = argc as u16;
        match self {
            Arity::Exact(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
            Arity::AtMost(n) => argc <= n,
            Arity::Range(lo, hi) => argc >= lo && argc <= hi,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Arity::Exact(n) => format!("exactly {}", n),
            Arity::AtLeast(n) => format!("at least {}", n),
            Arity::AtMost(n) => format!("at most {}", n),
            Arity::Range(lo, hi) => format!("between {} and {}", lo, hi),
        }
    }
}

pub type NativeBody = Rc<dyn Fn(&[Value]) -> Result<NativeOutcome, RuntimeError>>;

/// What a native call produces: either an ordinary value, or a state
/// machine the interpreter should drive across further VM steps —
/// backs `each`/`map`/`where`/`count` without growing the native call
/// stack.
pub enum NativeOutcome {
    Value(Value),
    StateMachine(Box<dyn crate::vm::builtins::NativeStateMachine>),
}

pub struct NativeFunction {
    pub name: Symbol,
    pub arity: Arity,
    pub checks: Vec<ArgCheck>,
    pub body: NativeBody,
}

impl NativeFunction {
    pub fn check_argc(&self, argc: usize) -> Result<(), RuntimeError> {
        if !self.arity.accepts(argc) {
            return Err(RuntimeError::NativeMethodError(format!(
                "'{}' expects {} argument(s), got {}",
                self.name.name(),
                self.arity.describe(),
                argc
            )));
        }
        Ok(())
    }

    /// Check argument types. When there are more arguments than explicit
    /// checks, the last check repeats to cover the tail.
    pub fn check_types(&self, args: &[Value]) -> Result<(), RuntimeError> {
        if self.checks.is_empty() {
            return Ok(());
        }
        for (i, arg) in args.iter().enumerate() {
            let check = self.checks.get(i).unwrap_or_else(|| self.checks.last().unwrap());
            if !check.accepts(arg.kind()) {
                return Err(RuntimeError::NativeMethodError(format!(
                    "'{}': argument {} must be {}, got {}",
                    self.name.name(),
                    i + 1,
                    check.label,
                    arg.kind()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name.name())
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct UserFunction {
    pub name: Option<Symbol>,
    pub info: Rc<ClosureInfo>,
    pub segment: Rc<crate::bytecode::ByteCodeSegment>,
    /// The enclosing closure this function was defined in, captured for
    /// lexical scoping (`function.lexicalEnv` in call
    /// semantics). `None` for a function defined at the top level.
    pub lexical_env: Option<Rc<crate::closure::Closure>>,
}

#[derive(Debug)]
pub enum Function {
    Native(NativeFunction),
    User(UserFunction),
}

impl Function {
    pub fn name(&self) -> String {
        match self {
            Function::Native(n) => n.name.name(),
            Function::User(u) => u.name.map(|s| s.name()).unwrap_or_else(|| "<anonymous>".to_string()),
        }
    }
}
