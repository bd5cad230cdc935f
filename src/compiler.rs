//! Contains the Scarab parser and bytecode compiler.
//!
//! The compiler is a single pass: it pulls [Lexeme]s from the [Lexer] one at
//! a time and emits bytecode straight into a [Chunk]. There is no AST. The
//! first syntax error aborts compilation.

use tracing::debug;

use crate::chunk::WrittenOpcode;
use crate::error::SyntaxError;
use crate::lexer::{Keyword, LexError, Lexeme, Lexer, Token};
use crate::prelude::*;
use crate::value::Value;

/////////////////////////////////////////// Public API ////////////////////////////////////////////

/// Compiles the given Scarab source code and, if successful, returns one
/// bytecode [Chunk].
pub fn compile(source: &str) -> crate::Result<Chunk> {
    let parser = Parser::new(source)?;
    let chunk = Compiler::new(parser).compile()?;
    debug!(
        code = chunk.len(),
        constants = chunk.constants().len(),
        "compiled"
    );
    Ok(chunk)
}

///////////////////////////////////// Implementation details //////////////////////////////////////

const U8_COUNT: usize = u8::MAX as usize + 1;

/// Contains the compiler state: the [Parser] and the chunk being produced.
struct Compiler<'a> {
    parser: Parser<'a>,
    chunk: Chunk,
    locals: Vec<Local<'a>>,
    scope_depth: u32,
    /// Whether the prefix being parsed is allowed to be an assignment
    /// target. Recomputed at every [Compiler::parse_precedence] entry.
    can_assign: bool,
    /// Set by a local declaration to keep its value on the stack as the
    /// local's storage, suppressing the expression statement's final `Pop`.
    skip_pop: bool,
}

/// A declared local variable. Its index in the compiler's locals vector is
/// its slot on the VM's operand stack.
#[derive(Clone, Copy)]
struct Local<'a> {
    name: &'a str,
    depth: u32,
}

/// Contains the parser state: the token stream plus one lexeme of context on
/// either side. `current` is `None` once the input is exhausted.
#[derive(Debug)]
struct Parser<'a> {
    lexer: Lexer<'a>,
    previous: Option<Lexeme<'a>>,
    current: Option<Lexeme<'a>>,
    /// Line of the most recently consumed lexeme, for positioning errors
    /// and bytecode at the end of input.
    last_line: usize,
}

/// Precedence levels for Scarab expressions, low to high.
///
/// The well-defined ordering ([PartialOrd]) is what drives the Pratt
/// parsing algorithm.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq)]
enum Precedence {
    None,
    /// `:=` `=`
    Assignment,
    /// `or`
    Or,
    /// `and`
    And,
    /// `==` `!=`
    Equality,
    /// `<` `>` `<=` `>=`
    Comparison,
    /// `+` `-`
    Term,
    /// `*` `/`
    Factor,
    /// `not`
    Unary,
    Call,
    /// Literals and groupings
    Primary,
}

///////////////////////////////////////// Implementations /////////////////////////////////////////

impl Precedence {
    /// Returns the next higher level of precedence.
    ///
    /// # Panics
    ///
    /// Panics if trying to obtain a higher level of precedence than the
    /// maximum, [Precedence::Primary].
    #[inline]
    fn higher_precedence(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => panic!("tried to get higher precedence than primary"),
        }
    }
}

/// The precedence an operator token takes in infix position. Operators
/// outside this table bind nothing and terminate the infix loop.
fn operator_precedence(op: &str) -> Precedence {
    match op {
        ":=" | "=" => Precedence::Assignment,
        "==" | "!=" => Precedence::Equality,
        "<" | "<=" | ">" | ">=" => Precedence::Comparison,
        "+" | "-" => Precedence::Term,
        "*" | "/" => Precedence::Factor,
        _ => Precedence::None,
    }
}

/// The opcode a binary operator compiles to. `:=` and `=` are absent on
/// purpose: they are handled at the identifier, not as infix operators.
fn binary_opcode(op: &str) -> Option<OpCode> {
    let opcode = match op {
        "+" => OpCode::Add,
        "-" => OpCode::Subtract,
        "*" => OpCode::Multiply,
        "/" => OpCode::Divide,
        "==" => OpCode::Equal,
        "!=" => OpCode::NotEqual,
        "<" => OpCode::Less,
        "<=" => OpCode::LessEqual,
        ">" => OpCode::Greater,
        ">=" => OpCode::GreaterEqual,
        _ => return None,
    };
    Some(opcode)
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code, pulling the first
    /// token. Fails if the source starts with something unlexable.
    fn new(source: &'a str) -> Result<Parser<'a>, SyntaxError> {
        let mut lexer = Lexer::new(source);
        let current = Self::pull(&mut lexer)?;

        Ok(Parser {
            lexer,
            previous: None,
            current,
            last_line: 1,
        })
    }

    /// Update self.previous and self.current such that they move one token
    /// further in the token stream. Surfaces lexer [Token::Error]s as
    /// syntax errors.
    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.previous = self.current;
        if let Some(lexeme) = self.previous {
            self.last_line = lexeme.line();
        }
        self.current = Self::pull(&mut self.lexer)?;
        Ok(())
    }

    fn pull(lexer: &mut Lexer<'a>) -> Result<Option<Lexeme<'a>>, SyntaxError> {
        let lexeme = match lexer.next() {
            Some(lexeme) => lexeme,
            None => return Ok(None),
        };

        if let Token::Error(reason) = lexeme.token() {
            let message = match reason {
                LexError::UnexpectedCharacter => {
                    format!("unexpected character '{}'", lexeme.text())
                }
                other => other.to_string(),
            };
            return Err(error_at(lexeme, message));
        }

        Ok(Some(lexeme))
    }

    /// The token of the current (not yet consumed) lexeme.
    fn current_token(&self) -> Option<Token<'a>> {
        self.current.map(|lexeme| lexeme.token())
    }
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler with the given [Parser].
    fn new(parser: Parser<'a>) -> Compiler<'a> {
        Compiler {
            parser,
            chunk: Chunk::new(),
            locals: Vec::new(),
            scope_depth: 0,
            can_assign: false,
            skip_pop: false,
        }
    }

    /// Takes ownership of the compiler and returns the finished chunk.
    fn compile(mut self) -> Result<Chunk, SyntaxError> {
        while self.parser.current.is_some() {
            self.statement()?;
        }

        // Print a listing of the bytecode to manually inspect compiled output.
        if cfg!(feature = "print_code") {
            crate::debug::disassemble_chunk(&self.chunk, "code");
        }

        Ok(self.chunk)
    }

    //////////////////////////////////////// Statements ///////////////////////////////////////////

    /// Parse a statement, dispatching on the current token.
    fn statement(&mut self) -> Result<(), SyntaxError> {
        if self.match_keyword(Keyword::Print)? {
            self.print_statement()
        } else if self.match_keyword(Keyword::If)? {
            self.if_statement()
        } else if self.match_keyword(Keyword::While)? {
            self.while_statement()
        } else if self.match_keyword(Keyword::Do)? {
            self.block()
        } else {
            self.expression_statement()
        }
    }

    /// Parse a print statement. Assumes `print` has already been consumed.
    fn print_statement(&mut self) -> Result<(), SyntaxError> {
        self.expression()?;
        self.emit_instruction(OpCode::Print);
        Ok(())
    }

    /// Parse `if <cond> <statement> (else <statement>)?`. Assumes `if` has
    /// been consumed.
    ///
    /// Each arm of the conditional starts with a `Pop` that removes the
    /// condition value, so both paths leave the stack balanced.
    fn if_statement(&mut self) -> Result<(), SyntaxError> {
        self.expression()?;

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_instruction(OpCode::Pop);
        self.statement()?;
        let else_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(then_jump)?;
        self.emit_instruction(OpCode::Pop);
        if self.match_keyword(Keyword::Else)? {
            self.statement()?;
        }
        self.patch_jump(else_jump)
    }

    /// Parse `while <cond> <statement>`. Assumes `while` has been consumed.
    fn while_statement(&mut self) -> Result<(), SyntaxError> {
        let loop_start = self.chunk.len();
        self.expression()?;

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_instruction(OpCode::Pop);
        self.statement()?;
        self.emit_loop(loop_start)?;

        self.patch_jump(exit_jump)?;
        self.emit_instruction(OpCode::Pop);
        Ok(())
    }

    /// Parse a `do ... end` block. Assumes `do` has been consumed. Reaching
    /// the end of input also closes the block.
    fn block(&mut self) -> Result<(), SyntaxError> {
        self.begin_scope();
        loop {
            if self.match_keyword(Keyword::End)? {
                break;
            }
            if self.parser.current.is_none() {
                break;
            }
            self.statement()?;
        }
        self.end_scope();
        Ok(())
    }

    /// Parse an expression statement.
    ///
    /// Expressions have zero net stack effect: the value the expression
    /// produces is popped here, unless a local declaration claimed the
    /// stack slot as its storage.
    fn expression_statement(&mut self) -> Result<(), SyntaxError> {
        self.skip_pop = false;
        self.expression()?;
        if !self.skip_pop {
            self.emit_instruction(OpCode::Pop);
        }
        Ok(())
    }

    ///////////////////////////////////////// Scoping /////////////////////////////////////////////

    /// Create a new block scope. Make sure to decrement it later.
    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Pop one scope from the block.
    ///
    /// The compile-time vector of locals parallels the runtime stack, so
    /// leaving a scope pops the compiler's vector AND emits one `Pop` per
    /// local for the runtime stack.
    fn end_scope(&mut self) {
        assert!(self.scope_depth > 0);
        self.scope_depth -= 1;

        while self.has_locals_beyond_current_scope() {
            self.locals.pop();
            self.emit_instruction(OpCode::Pop);
        }
    }

    /// Returns true if there is a local variable at a scope that is no
    /// longer accessible.
    fn has_locals_beyond_current_scope(&self) -> bool {
        self.locals
            .last()
            .map(|local| local.depth > self.scope_depth)
            .unwrap_or(false)
    }

    /// Finds the stack slot for a local, or returns None if the name is not
    /// a local (either a global or a mistake). Scans from the end so inner
    /// declarations shadow outer ones.
    fn resolve_local(&self, name: &str) -> Option<u8> {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, _)| slot as u8)
    }

    /// Claim the next stack slot for a new local variable.
    fn add_local(&mut self, name: &'a str, lexeme: Lexeme<'a>) -> Result<u8, SyntaxError> {
        if self.locals.len() >= U8_COUNT {
            return Err(error_at(lexeme, "too many local variables in scope".to_owned()));
        }

        self.locals.push(Local {
            name,
            depth: self.scope_depth,
        });
        Ok((self.locals.len() - 1) as u8)
    }

    //////////////////////////////////////// Expressions //////////////////////////////////////////

    /// Parse an expression.
    fn expression(&mut self) -> Result<(), SyntaxError> {
        self.parse_precedence(Precedence::Assignment)
    }

    /// The core of the Pratt parsing algorithm.
    ///
    /// See: <https://en.wikipedia.org/wiki/Operator-precedence_parser#Pratt_parsing>
    fn parse_precedence(&mut self, precedence: Precedence) -> Result<(), SyntaxError> {
        self.parser.advance()?;
        let prefix = match self.parser.previous {
            Some(lexeme) => lexeme,
            None => return Err(self.error_here("unexpected end of input".to_owned())),
        };

        self.can_assign = precedence <= Precedence::Assignment;

        match prefix.token() {
            Token::Int(value) => self.emit_constant(Value::Int(value))?,
            Token::Str(contents) => self.emit_constant(Value::from(contents))?,
            Token::Sym('(') => self.grouping()?,
            Token::Ident(name) => self.variable(name, prefix)?,
            Token::Keyword(Keyword::Not) => {
                self.parse_precedence(Precedence::Unary)?;
                self.emit_instruction(OpCode::Not);
            }
            _ => {
                return Err(error_at(
                    prefix,
                    format!("unexpected token '{}'", prefix.text()),
                ))
            }
        }

        while precedence <= self.current_precedence() {
            self.parser.advance()?;
            let infix = self
                .parser
                .previous
                .expect("the infix loop only runs while a token is current");

            match infix.token() {
                Token::Keyword(Keyword::And) => self.and_operator()?,
                Token::Keyword(Keyword::Or) => self.or_operator()?,
                Token::Op(op) => self.binary(op, infix)?,
                _ => unreachable!("only operators and 'and'/'or' carry a precedence"),
            }
        }

        Ok(())
    }

    /// The precedence the current token would take in infix position.
    fn current_precedence(&self) -> Precedence {
        match self.parser.current_token() {
            Some(Token::Op(op)) => operator_precedence(op),
            Some(Token::Keyword(Keyword::And)) => Precedence::And,
            Some(Token::Keyword(Keyword::Or)) => Precedence::Or,
            _ => Precedence::None,
        }
    }

    /// Parse `(` as a prefix. Assumes `(` has been consumed.
    fn grouping(&mut self) -> Result<(), SyntaxError> {
        self.expression()?;
        self.consume_sym(')', "expected ')' after expression")
    }

    /// Parse a binary operator as an infix. Assumes the operator has been
    /// consumed. The right operand binds one level tighter, making the
    /// operator left-associative.
    fn binary(&mut self, op: &'a str, lexeme: Lexeme<'a>) -> Result<(), SyntaxError> {
        self.parse_precedence(operator_precedence(op).higher_precedence())?;

        match binary_opcode(op) {
            Some(opcode) => {
                self.emit_instruction(opcode);
                Ok(())
            }
            None => Err(error_at(lexeme, format!("unknown operator '{op}'"))),
        }
    }

    /// Parse the right side of `and`. If the left operand is falsy it stays
    /// on the stack as the result and the right operand is skipped.
    fn and_operator(&mut self) -> Result<(), SyntaxError> {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);

        self.emit_instruction(OpCode::Pop);
        self.parse_precedence(Precedence::And)?;

        self.patch_jump(end_jump)
    }

    /// Parse the right side of `or`. If the left operand is truthy it stays
    /// on the stack as the result and the right operand is skipped.
    fn or_operator(&mut self) -> Result<(), SyntaxError> {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(else_jump)?;
        self.emit_instruction(OpCode::Pop);

        self.parse_precedence(Precedence::Or)?;
        self.patch_jump(end_jump)
    }

    /// Parse an identifier. Whether this is a declaration, an assignment,
    /// or a read is decided here, by peeking at the next token.
    fn variable(&mut self, name: &'a str, lexeme: Lexeme<'a>) -> Result<(), SyntaxError> {
        if self.can_assign && self.match_op(":=")? {
            // A declaration. The initializer is compiled before the local
            // exists, so `x := x * x` inside a block reads the outer `x`.
            self.expression()?;
            if self.scope_depth > 0 {
                let slot = self.add_local(name, lexeme)?;
                self.emit_instruction(OpCode::SetLocal).with_operand(slot);
                self.skip_pop = true;
            } else {
                let index = self.identifier_constant(name)?;
                self.emit_instruction(OpCode::DefineGlobal).with_operand(index);
            }
        } else if self.can_assign && self.match_op("=")? {
            // An assignment to an existing binding.
            if let Some(slot) = self.resolve_local(name) {
                self.expression()?;
                self.emit_instruction(OpCode::SetLocal).with_operand(slot);
            } else {
                let index = self.identifier_constant(name)?;
                self.expression()?;
                self.emit_instruction(OpCode::SetGlobal).with_operand(index);
            }
        } else if let Some(slot) = self.resolve_local(name) {
            self.emit_instruction(OpCode::GetLocal).with_operand(slot);
        } else {
            let index = self.identifier_constant(name)?;
            self.emit_instruction(OpCode::GetGlobal).with_operand(index);
        }

        Ok(())
    }

    /// Intern the identifier's name in the chunk's constants pool.
    fn identifier_constant(&mut self, name: &str) -> Result<u8, SyntaxError> {
        self.make_constant(Value::from(name))
    }

    ////////////////////////////////////////// Emission ///////////////////////////////////////////

    /// Writes an [OpCode] to the chunk, attributed to the line of the token
    /// most recently consumed. Returns a [WrittenOpcode], with which you
    /// can write an operand.
    fn emit_instruction(&mut self, opcode: OpCode) -> WrittenOpcode {
        let line = self.parser.last_line;
        self.chunk.write_opcode(opcode, line)
    }

    /// Appends [OpCode::Constant] for the given value.
    fn emit_constant(&mut self, value: Value) -> Result<(), SyntaxError> {
        let index = self.make_constant(value)?;
        self.emit_instruction(OpCode::Constant).with_operand(index);
        Ok(())
    }

    /// Interns a constant in the chunk's pool.
    fn make_constant(&mut self, value: Value) -> Result<u8, SyntaxError> {
        match self.chunk.add_constant(value) {
            Some(index) => Ok(index),
            None => Err(self.error_here("too many constants in one chunk".to_owned())),
        }
    }

    /// Emits a jump instruction with a placeholder operand. Returns the
    /// offset of the placeholder, to hand to [Compiler::patch_jump] once the
    /// target is known.
    fn emit_jump(&mut self, opcode: OpCode) -> usize {
        self.emit_instruction(opcode).with_short_operand(0xFFFF);
        self.chunk.len() - 2
    }

    /// Back-patches a placeholder written by [Compiler::emit_jump] to land
    /// on the next instruction to be emitted.
    fn patch_jump(&mut self, offset: usize) -> Result<(), SyntaxError> {
        // -2 accounts for the operand itself: the VM has read it by the
        // time it applies the jump.
        let jump = self.chunk.len() - offset - 2;
        let operand = match u16::try_from(jump) {
            Ok(operand) => operand,
            Err(_) => return Err(self.error_here("too far to jump".to_owned())),
        };

        self.chunk.patch_u16(offset, operand);
        Ok(())
    }

    /// Emits [OpCode::Loop] jumping backward to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) -> Result<(), SyntaxError> {
        // +3 accounts for this instruction: the opcode and its two operand
        // bytes, all read before the VM applies the jump.
        let jump = self.chunk.len() + 3 - loop_start;
        let operand = match u16::try_from(jump) {
            Ok(operand) => operand,
            Err(_) => return Err(self.error_here("too far to jump".to_owned())),
        };

        self.emit_instruction(OpCode::Loop).with_short_operand(operand);
        Ok(())
    }

    /////////////////////////////////////////// Helpers ///////////////////////////////////////////

    /// Consume the current token if it is the given keyword. Returns
    /// whether it was consumed.
    fn match_keyword(&mut self, keyword: Keyword) -> Result<bool, SyntaxError> {
        if matches!(self.parser.current_token(), Some(Token::Keyword(k)) if k == keyword) {
            self.parser.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume the current token if it is the given operator. Returns
    /// whether it was consumed.
    fn match_op(&mut self, op: &str) -> Result<bool, SyntaxError> {
        if matches!(self.parser.current_token(), Some(Token::Op(o)) if o == op) {
            self.parser.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Consume the current token, which must be the given symbol.
    fn consume_sym(&mut self, symbol: char, message: &str) -> Result<(), SyntaxError> {
        if matches!(self.parser.current_token(), Some(Token::Sym(c)) if c == symbol) {
            return self.parser.advance();
        }
        Err(self.error_at_current(message.to_owned()))
    }

    /// A syntax error located at the current lexeme, or at the end of input.
    fn error_at_current(&self, message: String) -> SyntaxError {
        match self.parser.current {
            Some(lexeme) => error_at(lexeme, message),
            None => self.error_here(message),
        }
    }

    /// A syntax error located at the most recently consumed position.
    fn error_here(&self, message: String) -> SyntaxError {
        SyntaxError {
            message,
            text: String::new(),
            line: self.parser.last_line,
        }
    }
}

/// A syntax error located at the given lexeme.
fn error_at(lexeme: Lexeme, message: String) -> SyntaxError {
    SyntaxError {
        message,
        text: lexeme.text().to_owned(),
        line: lexeme.line(),
    }
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn compile_code(source: &str) -> Chunk {
        compile(source).expect("program should compile")
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match compile(source) {
            Err(InterpretationError::Compile(error)) => error,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    use OpCode::*;

    /// Build the expected byte vector from opcode/operand pairs.
    macro_rules! code {
        ($($byte:expr),* $(,)?) => {
            vec![$($byte as u8),*]
        };
    }

    #[test]
    fn precedence_confidence_check() {
        // High-level precedence (C-like)
        assert!(Precedence::Assignment < Precedence::Or);
        assert!(Precedence::Or < Precedence::And);
        assert!(Precedence::And < Precedence::Equality);
        assert!(Precedence::Equality < Precedence::Comparison);

        // PEDMAS
        assert!(Precedence::Call > Precedence::Factor);
        assert!(Precedence::Factor > Precedence::Term);

        // `and` is one level of precedence higher than `or`
        assert_eq!(Precedence::And, Precedence::Or.higher_precedence());
        assert_eq!(Precedence::Factor, Precedence::Term.higher_precedence());
    }

    #[test]
    fn integer_literal() {
        let chunk = compile_code("123");
        assert_eq!(code![Constant, 0, Pop], chunk.code());
        assert_eq!(&[Value::Int(123)], chunk.constants());
    }

    #[test]
    fn string_literal() {
        let chunk = compile_code("\"Hello, World\"");
        assert_eq!(code![Constant, 0, Pop], chunk.code());
        assert_eq!(&[Value::from("Hello, World")], chunk.constants());
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let chunk = compile_code("1 + 2 * 3");
        assert_eq!(
            code![Constant, 0, Constant, 1, Constant, 2, Multiply, Add, Pop],
            chunk.code()
        );
    }

    #[test]
    fn grouping_overrides_precedence() {
        let chunk = compile_code("(1 + 2) * 3");
        assert_eq!(
            code![Constant, 0, Constant, 1, Add, Constant, 2, Multiply, Pop],
            chunk.code()
        );
    }

    #[test]
    fn assorted_expressions_compile() {
        for source in ["1 + 2 * 3", "(1 + 2) * 3", "2 * 3 + 1", "1 + (2 * 3 + 4)"] {
            assert!(compile(source).is_ok(), "compiling {source:?}");
        }
    }

    #[test]
    fn assorted_syntax_errors() {
        for source in ["1 + - 2", "* 3", "50 + -", "print", "end", "1 ,"] {
            assert!(
                matches!(compile(source), Err(error) if error.is_compile_time()),
                "compiling {source:?}"
            );
        }
    }

    #[test]
    fn missing_close_paren() {
        let error = syntax_error("(1 + 2");
        assert_eq!("expected ')' after expression", error.message);
    }

    #[test]
    fn unlexable_input() {
        let error = syntax_error("1 + 'oops'");
        assert_eq!("unexpected character '''", error.message);
        assert_eq!(1, error.line);
    }

    #[test]
    fn errors_carry_the_line() {
        let error = syntax_error("print 1\nprint 2\nprint do");
        assert_eq!(3, error.line);
        assert_eq!("do", error.text);
    }

    #[test]
    fn assignment_needs_a_name() {
        let error = syntax_error("1 = 2");
        assert_eq!("unknown operator '='", error.message);

        let error = syntax_error("(x) := 2");
        assert_eq!("unknown operator ':='", error.message);
    }

    #[test]
    fn global_declaration() {
        let chunk = compile_code("x := 1");
        assert_eq!(code![Constant, 0, DefineGlobal, 1, Pop], chunk.code());
        assert_eq!(&[Value::Int(1), Value::from("x")], chunk.constants());
    }

    #[test]
    fn global_read_and_reassignment() {
        let chunk = compile_code("x := 1 x = x + 1");
        assert_eq!(
            code![
                Constant, 0, DefineGlobal, 1, Pop, // x := 1
                GetGlobal, 1, Constant, 0, Add, SetGlobal, 1, Pop, // x = x + 1
            ],
            chunk.code()
        );
        // Int(1) is interned once and shared by both statements.
        assert_eq!(&[Value::Int(1), Value::from("x")], chunk.constants());
    }

    #[test]
    fn chained_global_declaration() {
        let chunk = compile_code("x := y := 5");
        assert_eq!(
            code![Constant, 0, DefineGlobal, 1, DefineGlobal, 2, Pop],
            chunk.code()
        );
        assert_eq!(
            &[Value::Int(5), Value::from("y"), Value::from("x")],
            chunk.constants()
        );
    }

    #[test]
    fn block_locals_are_popped_at_end() {
        let chunk = compile_code("do a := 1 b := 2 end");
        assert_eq!(
            code![Constant, 0, SetLocal, 0, Constant, 1, SetLocal, 1, Pop, Pop],
            chunk.code()
        );
    }

    #[test]
    fn local_initializer_reads_the_outer_binding() {
        let chunk = compile_code("x := 5 do x := x * x end");
        assert_eq!(
            code![
                Constant, 0, DefineGlobal, 1, Pop, // x := 5
                GetGlobal, 1, GetGlobal, 1, Multiply, SetLocal, 0, // x := x * x
                Pop, // end
            ],
            chunk.code()
        );
    }

    #[test]
    fn if_else_layout() {
        let chunk = compile_code("if 1 print 2 else print 3");
        assert_eq!(
            code![
                Constant, 0, // condition
                JumpIfFalse, 0, 7, // over the then-branch
                Pop, Constant, 1, Print, // then
                Jump, 0, 4, // over the else-branch
                Pop, Constant, 2, Print, // else
            ],
            chunk.code()
        );
    }

    #[test]
    fn if_without_else_still_pops_the_condition() {
        let chunk = compile_code("if 1 print 2");
        assert_eq!(
            code![
                Constant, 0,
                JumpIfFalse, 0, 7,
                Pop, Constant, 1, Print,
                Jump, 0, 1,
                Pop,
            ],
            chunk.code()
        );
    }

    #[test]
    fn while_layout() {
        let chunk = compile_code("x := 0 while x < 3 x = x + 1");
        assert_eq!(
            code![
                Constant, 0, DefineGlobal, 1, Pop, // x := 0
                GetGlobal, 1, Constant, 2, Less, // x < 3
                JumpIfFalse, 0, 12, // exit
                Pop, // condition value, taken branch
                GetGlobal, 1, Constant, 3, Add, SetGlobal, 1, Pop, // x = x + 1
                Loop, 0, 20, // back to the condition
                Pop, // condition value, exit branch
            ],
            chunk.code()
        );
    }

    #[test]
    fn and_short_circuit_layout() {
        let chunk = compile_code("1 and 2");
        assert_eq!(
            code![Constant, 0, JumpIfFalse, 0, 3, Pop, Constant, 1, Pop],
            chunk.code()
        );
    }

    #[test]
    fn or_short_circuit_layout() {
        let chunk = compile_code("1 or 2");
        assert_eq!(
            code![
                Constant, 0,
                JumpIfFalse, 0, 3,
                Jump, 0, 3,
                Pop, Constant, 1,
                Pop,
            ],
            chunk.code()
        );
    }

    #[test]
    fn constants_are_shared_between_statements() {
        let chunk = compile_code("print 1 print 1");
        assert_eq!(&[Value::Int(1)], chunk.constants());
    }

    #[test]
    fn empty_source_compiles_to_an_empty_chunk() {
        assert!(compile_code("").is_empty());
        assert!(compile_code("  \n \t ").is_empty());
    }

    #[test]
    fn jump_distance_is_bounded() {
        // A then-branch bigger than a u16 jump operand.
        let mut source = String::from("if 1 do ");
        source.push_str(&"print 1 ".repeat(22_000));
        source.push_str("end");

        let error = syntax_error(&source);
        assert_eq!("too far to jump", error.message);
    }

    #[test]
    fn constant_pool_is_bounded() {
        let source: String = (0..300).map(|n| format!("print {n} ")).collect();
        let error = syntax_error(&source);
        assert_eq!("too many constants in one chunk", error.message);
    }
}
