//! A bytecode interpreter for the Scarab scripting language.
//!
//! Scarab is a small imperative language. Source code is compiled in a
//! single pass -- a [Lexer][lexer::Lexer] feeding a Pratt parser that emits
//! straight into a [Chunk][chunk::Chunk] -- and the chunk is then executed
//! on a stack-based [VM][vm::VM].
//!
//! ```
//! use scarab::value::Value;
//!
//! let printed = scarab::interpret_captured("print 1 + 2 * 3").unwrap();
//! assert_eq!(vec![Value::Int(7)], printed);
//! ```

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod lexer;
pub mod value;
pub mod vm;

use value::Value;
use vm::{Options, VM};

/// The type returned by functions that parse, compile, and run Scarab code.
/// This is the standard [std::result::Result], but the error is always
/// [error::InterpretationError]. This type alias is generic for the return
/// type, however.
///
/// ```
/// fn compile() -> scarab::Result<()> {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, error::InterpretationError>;

/// Re-exports common items.
pub mod prelude {
    pub use crate::chunk::{Chunk, OpCode};
    pub use crate::error::InterpretationError;
    pub use crate::lexer::{Keyword, Lexeme, Lexer, Token};
    pub use crate::value::Value;
    pub use crate::vm::{Options, VM};
}

/// Compile and run some Scarab source code, printing to stdout.
pub fn interpret(source: &str) -> Result<()> {
    let chunk = compiler::compile(source)?;
    VM::new(chunk).run()
}

/// Compile and run some Scarab source code in capture mode, returning the
/// values the program printed.
pub fn interpret_captured(source: &str) -> Result<Vec<Value>> {
    let chunk = compiler::compile(source)?;
    let mut vm = VM::with_options(
        chunk,
        Options {
            capture: true,
            trace: false,
        },
    );
    vm.run()?;
    Ok(vm.into_captured())
}
