//! Helpers to print a debug representation of compiled bytecode.

use crate::chunk::{Chunk, OpCode};

/// Given a chunk, prints its disassembly to `stdout`.
pub fn disassemble_chunk(c: &Chunk, name: &str) {
    println!("== {name} ==");

    let mut offset = 0;
    while offset < c.len() {
        offset = disassemble_instruction(c, offset);
    }
}

/// Print one instruction from the [Chunk] to `stdout`, taking into account
/// its operands. Returns the offset of the next instruction.
pub fn disassemble_instruction(c: &Chunk, offset: usize) -> usize {
    print!("{:04} ", offset);

    if offset > 0 && at_same_line_as_previous_offset(c, offset) {
        print!("   | ");
    } else {
        let line_no = c.line_number_for(offset).unwrap_or(0);
        print!("{line_no:4} ")
    }

    let instruction = c
        .get(offset)
        .expect("offset too large")
        .as_opcode()
        .expect("invalid byte for opcode");

    use OpCode::*;
    match instruction {
        Constant => constant_instruction("OP_CONSTANT", c, offset),
        DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", c, offset),
        SetGlobal => constant_instruction("OP_SET_GLOBAL", c, offset),
        GetGlobal => constant_instruction("OP_GET_GLOBAL", c, offset),
        SetLocal => byte_instruction("OP_SET_LOCAL", c, offset),
        GetLocal => byte_instruction("OP_GET_LOCAL", c, offset),
        JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, c, offset),
        Jump => jump_instruction("OP_JUMP", 1, c, offset),
        Loop => jump_instruction("OP_LOOP", -1, c, offset),
        True => simple_instruction("OP_TRUE", offset),
        False => simple_instruction("OP_FALSE", offset),
        Print => simple_instruction("OP_PRINT", offset),
        Pop => simple_instruction("OP_POP", offset),
        Add => simple_instruction("OP_ADD", offset),
        Subtract => simple_instruction("OP_SUBTRACT", offset),
        Multiply => simple_instruction("OP_MULTIPLY", offset),
        Divide => simple_instruction("OP_DIVIDE", offset),
        Not => simple_instruction("OP_NOT", offset),
        Equal => simple_instruction("OP_EQUAL", offset),
        NotEqual => simple_instruction("OP_NOT_EQUAL", offset),
        Less => simple_instruction("OP_LESS", offset),
        LessEqual => simple_instruction("OP_LESS_EQUAL", offset),
        Greater => simple_instruction("OP_GREATER", offset),
        GreaterEqual => simple_instruction("OP_GREATER_EQUAL", offset),
    }
}

/////////////////////////////////////// Instruction printers //////////////////////////////////////

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{name:>20}");
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk
        .get(offset + 1)
        .expect("ran out of bytes")
        .as_byte();
    println!("{name:>20} {slot:4}");

    offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let (index, value) = chunk
        .get(offset + 1)
        .expect("ran out of bytes")
        .resolve_constant_with_index()
        .expect("invalid constant index");
    println!("{name:>20} {index:4} '{value}'");

    offset + 2
}

fn jump_instruction(name: &str, sign: isize, chunk: &Chunk, offset: usize) -> usize {
    let jump = chunk.read_u16(offset + 1).expect("ran out of bytes") as isize;
    let target = offset as isize + 3 + sign * jump;
    println!("{name:>20} {jump:4} -> {target:04}");

    offset + 3
}

//////////////////////////////////////////// Utilities ////////////////////////////////////////////

/// Returns true if the given offset is at the same line number as the
/// previous offset.
fn at_same_line_as_previous_offset(chunk: &Chunk, offset: usize) -> bool {
    assert!(offset > 0);

    chunk
        .line_number_for(offset)
        .zip(chunk.line_number_for(offset - 1))
        .map(|(current_line, previous_line)| current_line == previous_line)
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disassembly_covers_every_compiled_instruction() {
        let chunk = crate::compiler::compile(
            "x := 0 while x < 3 do x = x + 1 print not x == 2 end",
        )
        .unwrap();

        // Walk the whole chunk; a desynchronized operand width would trip
        // the opcode decode expect.
        let mut offset = 0;
        while offset < chunk.len() {
            offset = disassemble_instruction(&chunk, offset);
        }
        assert_eq!(chunk.len(), offset);
    }
}
