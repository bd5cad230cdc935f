//! The bytecode virtual machine.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::chunk::{Chunk, OpCode};
use crate::error::RuntimeError;
use crate::value::Value;

/// The operand stack is bounded: pushing the 257th value is a stack
/// overflow.
pub const STACK_SIZE: usize = 256;

/// Run options for the [VM].
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Collect printed values instead of writing them to stdout.
    pub capture: bool,
    /// Print every instruction and the value stack as it executes.
    pub trace: bool,
}

/// Maintains state for the Scarab virtual machine: the instruction pointer,
/// the operand stack, and the globals table.
pub struct VM {
    chunk: Chunk,
    /// Index into the chunk for the next byte to be read.
    ip: usize,
    /// Value stack. The bottom region doubles as storage for live locals.
    stack: Vec<Value>,
    /// Globals, keyed by the interned [Value::Str] constants that name them.
    globals: HashMap<Value, Value>,
    options: Options,
    captured: Vec<Value>,
}

impl VM {
    /// A VM that prints to stdout.
    pub fn new(chunk: Chunk) -> VM {
        VM::with_options(chunk, Options::default())
    }

    pub fn with_options(chunk: Chunk, options: Options) -> VM {
        VM {
            chunk,
            ip: 0,
            stack: Vec::with_capacity(STACK_SIZE),
            globals: HashMap::new(),
            options,
            captured: Vec::new(),
        }
    }

    /// The values printed so far while running in capture mode.
    pub fn captured(&self) -> &[Value] {
        &self.captured
    }

    /// Consumes the VM and returns the values printed in capture mode.
    pub fn into_captured(self) -> Vec<Value> {
        self.captured
    }

    /// The main opcode interpreter loop. Runs until the instruction pointer
    /// falls off the end of the code, or an error halts the machine. The
    /// stack is not unwound on error; discard the VM.
    ///
    /// # Panics
    ///
    /// Panics on chunks the compiler could not have produced: an operand
    /// running past the end of the code, a constant index outside the pool,
    /// or a local slot above the top of the stack.
    pub fn run(&mut self) -> crate::Result<()> {
        use OpCode::*;

        debug!(code = self.chunk.len(), "running");

        while self.ip < self.chunk.len() {
            if self.trace_enabled() {
                self.trace_instruction();
            }

            let byte = self.read_byte();
            let opcode = match OpCode::try_from(byte) {
                Ok(opcode) => opcode,
                Err(()) => return Err(RuntimeError::UnknownOpcode(byte).into()),
            };

            match opcode {
                Constant => {
                    let constant = self.read_constant();
                    self.push(constant)?;
                }
                True => self.push(Value::Bool(true))?,
                False => self.push(Value::Bool(false))?,
                Print => {
                    let value = self.pop()?;
                    self.print(value);
                }
                Pop => {
                    self.pop()?;
                }
                Add => self.binary_op(Value::add)?,
                Subtract => self.binary_op(Value::subtract)?,
                Multiply => self.binary_op(Value::multiply)?,
                Divide => self.binary_op(Value::divide)?,
                Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsy()))?;
                }
                Equal => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(Value::Bool(lhs == rhs))?;
                }
                NotEqual => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(Value::Bool(lhs != rhs))?;
                }
                Less => self.comparison("<", Ordering::is_lt)?,
                LessEqual => self.comparison("<=", Ordering::is_le)?,
                Greater => self.comparison(">", Ordering::is_gt)?,
                GreaterEqual => self.comparison(">=", Ordering::is_ge)?,
                DefineGlobal => {
                    let name = self.read_constant();
                    let value = self.peek()?.clone();
                    self.globals.insert(name, value);
                }
                SetGlobal => {
                    let name = self.read_constant();
                    if !self.globals.contains_key(&name) {
                        return Err(RuntimeError::UndefinedName(name.to_string()).into());
                    }
                    let value = self.peek()?.clone();
                    self.globals.insert(name, value);
                }
                GetGlobal => {
                    let name = self.read_constant();
                    match self.globals.get(&name).cloned() {
                        Some(value) => self.push(value)?,
                        None => {
                            return Err(RuntimeError::UndefinedName(name.to_string()).into())
                        }
                    }
                }
                SetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self.peek()?.clone();
                    if slot < self.stack.len() {
                        self.stack[slot] = value;
                    } else if slot == self.stack.len() {
                        // A chained declaration stores through a slot that
                        // does not exist yet; the store itself extends the
                        // stack.
                        self.push(value)?;
                    } else {
                        panic!("local slot {slot} is beyond the top of the stack");
                    }
                }
                GetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self
                        .stack
                        .get(slot)
                        .expect("local slot should be below the top of the stack")
                        .clone();
                    self.push(value)?;
                }
                JumpIfFalse => {
                    let offset = self.read_short() as usize;
                    if self.peek()?.is_falsy() {
                        self.ip += offset;
                    }
                }
                Jump => {
                    let offset = self.read_short() as usize;
                    self.ip += offset;
                }
                Loop => {
                    let offset = self.read_short() as usize;
                    self.ip -= offset;
                }
            }
        }

        debug!(globals = self.globals.len(), "halted");
        Ok(())
    }

    /// Print a value, or capture it when running in capture mode.
    fn print(&mut self, value: Value) {
        if self.options.capture {
            self.captured.push(value);
        } else {
            println!("{value}");
        }
    }

    /// Pops two operands from the stack to perform a binary operation.
    fn binary_op(
        &mut self,
        op: fn(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        self.push(op(&lhs, &rhs)?)
    }

    /// Pops two operands, orders them, and pushes whether `accept` likes
    /// the resulting [Ordering].
    fn comparison(
        &mut self,
        operator: &'static str,
        accept: fn(Ordering) -> bool,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let ordering = lhs.compare(&rhs, operator)?;
        self.push(Value::Bool(accept(ordering)))
    }

    /// Fetches the byte at the instruction pointer and advances past it.
    fn read_byte(&mut self) -> u8 {
        let byte = self
            .chunk
            .byte_at(self.ip)
            .expect("instruction pointer should stay inside the code");
        self.ip += 1;
        byte
    }

    /// Reads a two-byte big-endian operand.
    fn read_short(&mut self) -> u16 {
        let upper = self.read_byte();
        let lower = self.read_byte();
        u16::from_be_bytes([upper, lower])
    }

    /// Reads a one-byte constants index and resolves it in the pool.
    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.chunk
            .constant(index)
            .cloned()
            .expect("constant index should be inside the pool")
    }

    /// Pushes a [Value] onto the value stack.
    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pops and returns the top [Value] on the value stack.
    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Peeks at the top of the stack.
    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or(RuntimeError::StackUnderflow)
    }

    fn trace_enabled(&self) -> bool {
        self.options.trace || cfg!(feature = "trace_execution")
    }

    /// Prints the current stack and the next instruction.
    fn trace_instruction(&self) {
        print!("        ");
        for value in self.stack.iter() {
            print!("[ {value:?} ]");
        }
        println!();

        crate::debug::disassemble_instruction(&self.chunk, self.ip);
    }
}

////////////////////////////////////////////// Tests //////////////////////////////////////////////
