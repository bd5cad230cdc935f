//! Provides [InterpretationError], the error that most things return.
use thiserror::Error;

/// Any error that can occur while interpreting Scarab source.
///
/// There are exactly two kinds: a [SyntaxError] raised by the compiler, and a
/// [RuntimeError] raised by the VM. Both are fatal to the current phase --
/// there is no recovery and no continuation past the first error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretationError {
    /// A compile-time error. Compilation stops at the first one.
    #[error(transparent)]
    Compile(#[from] SyntaxError),
    /// A runtime error. The VM halts without unwinding its stack.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A syntax error, carrying the offending surface text and its source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] syntax error: {message}")]
pub struct SyntaxError {
    pub message: String,
    /// The surface text of the token the error points at. Empty at end of
    /// input.
    pub text: String,
    /// 1-based source line.
    pub line: usize,
}

/// Everything that can go wrong while the VM is running a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Read of a global that was never defined, or a `=` write to one.
    #[error("undefined name '{0}'")]
    UndefinedName(String),
    #[error("'{operator}' is not defined for {lhs} and {rhs}")]
    TypeMismatch {
        operator: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    /// A byte that does not decode as any opcode. Indicates a bug in the
    /// compiler or a corrupt chunk.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
}

impl InterpretationError {
    /// Returns true for errors produced at compile time.
    pub fn is_compile_time(&self) -> bool {
        matches!(self, InterpretationError::Compile(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn syntax_error_names_the_line() {
        let error = SyntaxError {
            message: "unexpected token ')'".to_owned(),
            text: ")".to_owned(),
            line: 3,
        };
        assert_eq!("[line 3] syntax error: unexpected token ')'", error.to_string());
    }

    #[test]
    fn runtime_error_messages() {
        assert_eq!(
            "undefined name 'breakfast'",
            RuntimeError::UndefinedName("breakfast".to_owned()).to_string()
        );
        assert_eq!(
            "'-' is not defined for str and str",
            RuntimeError::TypeMismatch {
                operator: "-",
                lhs: "str",
                rhs: "str",
            }
            .to_string()
        );
        assert_eq!("unknown opcode 0xf0", RuntimeError::UnknownOpcode(0xF0).to_string());
    }
}
