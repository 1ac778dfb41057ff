// Program -> hex instruction string.
//
// Each opcode emits a fixed two-hex-digit mnemonic byte, followed by its
// immediate operand (if any), also as hex. STORE is the odd one out: its
// 4-byte little-endian float immediate is interleaved with continuation
// marker bytes (13/14/15) between each float byte, terminated by an 80 00
// push marker, rather than being emitted as four contiguous bytes. Branch
// immediates are re-expressed here as byte offsets; `Opcode::Bqz/Bnz/Jmp`
// store an *instruction count*, and walking that many instructions forward
// to sum their byte widths is what this module does that `bytecode.rs`
// does not.

use crate::bytecode::{Opcode, Program};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("instruction {index} ({opcode:?}) could not be serialized: {source}")]
    At {
        index: usize,
        opcode: Opcode,
        #[source]
        source: std::fmt::Error,
    },
}

/// The serialized form of a `Program`, ready for JSON embedding alongside
/// an action/behavior definition (spec §6's `programs.json`).
#[derive(Debug, Clone, Serialize)]
pub struct EmittedProgram {
    pub instructions: String,
    pub local_vars: Vec<String>,
    pub global_vars: Vec<String>,
    pub functions: Vec<String>,
    pub evaluate_once: bool,
}

fn mnemonic(op: Opcode) -> &'static str {
    match op {
        Opcode::Err => "00",
        Opcode::Ret => "01",
        Opcode::LoadLocal(_) => "10",
        Opcode::LoadExternal(_) => "11",
        Opcode::Store(_) => "12",
        Opcode::Add => "20",
        Opcode::Sub => "21",
        Opcode::Mul => "22",
        Opcode::Div => "23",
        Opcode::Mod => "24",
        Opcode::Pow => "25",
        Opcode::BitAnd => "30",
        Opcode::BitOr => "31",
        Opcode::BitXor => "32",
        Opcode::BitNot => "33",
        Opcode::Lshift => "34",
        Opcode::Rshift => "35",
        Opcode::Lt => "40",
        Opcode::Le => "41",
        Opcode::Gt => "42",
        Opcode::Ge => "43",
        Opcode::Eq => "44",
        Opcode::Ne => "45",
        Opcode::LAnd => "50",
        Opcode::LOr => "51",
        Opcode::LNot => "52",
        Opcode::Bqz(_) => "60",
        Opcode::Bnz(_) => "61",
        Opcode::Jmp(_) => "62",
        Opcode::Call(_) => "70",
    }
}

fn byte_to_hex(b: u8) -> String {
    format!("{:02X}", b)
}

fn float_to_hex(f: f64) -> String {
    let bytes = (f as f32).to_le_bytes();
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Byte width of one instruction once serialized, used when resolving
/// branch-offset instruction counts to byte offsets.
fn instruction_byte_width(op: Opcode) -> usize {
    match op {
        Opcode::Store(_) => 10,
        _ => 2,
    }
}

/// Serialize a compiled `Program` to its hex instruction string and
/// accompanying symbol tables.
pub fn emit(program: &Program) -> Result<EmittedProgram, EmitError> {
    let mut instructions = String::new();

    for (index, instruction) in program.instructions.iter().enumerate() {
        instructions.push_str(mnemonic(*instruction));
        match *instruction {
            Opcode::LoadLocal(idx) | Opcode::LoadExternal(idx) | Opcode::Call(idx) => {
                instructions.push_str(&byte_to_hex(idx));
            }
            Opcode::Store(value) => {
                let hex = float_to_hex(value);
                let bytes: Vec<&str> = hex
                    .as_bytes()
                    .chunks(2)
                    .map(|c| std::str::from_utf8(c).unwrap())
                    .collect();
                instructions.push_str(bytes[0]);
                instructions.push_str("13");
                instructions.push_str(bytes[1]);
                instructions.push_str("14");
                instructions.push_str(bytes[2]);
                instructions.push_str("15");
                instructions.push_str(bytes[3]);
                instructions.push_str("8000");
            }
            Opcode::Bqz(count) | Opcode::Bnz(count) | Opcode::Jmp(count) => {
                let count = count as usize;
                let window = program
                    .instructions
                    .get(index + 1..index + count)
                    .unwrap_or(&[]);
                let offset: usize = window.iter().map(|op| instruction_byte_width(*op)).sum();
                instructions.push_str(&byte_to_hex(offset as u8));
            }
            _ => instructions.push_str("00"),
        }
    }

    Ok(EmittedProgram {
        instructions,
        local_vars: program.local_vars.clone(),
        global_vars: program.global_vars.clone(),
        functions: program.functions.clone(),
        evaluate_once: program.evaluate_once,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode;

    fn compile(text: &str) -> Program {
        bytecode::compile(text, Vec::new(), Vec::new(), Vec::new()).unwrap()
    }

    #[test]
    fn literal_emits_store_with_interleaved_markers_then_ret() {
        let program = compile("1");
        let emitted = emit(&program).unwrap();
        // STORE mnemonic "12", then 4 float bytes interleaved with
        // 13/14/15 continuation markers and an 8000 push marker, then
        // RET's "01" + its zero-filled immediate "00".
        assert!(emitted.instructions.starts_with("12"));
        assert!(emitted.instructions.contains("138000") || emitted.instructions.ends_with("800001" .to_owned() + "00"));
        assert!(emitted.instructions.ends_with("0100"));
    }

    #[test]
    fn load_local_emits_one_byte_index() {
        let program = compile("x");
        let emitted = emit(&program).unwrap();
        assert!(emitted.instructions.starts_with("1000"));
    }

    #[test]
    fn ternary_branch_offset_is_byte_width_not_instruction_count() {
        let program = compile("a ? 1 : 2");
        let emitted = emit(&program).unwrap();
        // The BQZ mnemonic "60" must be followed by a byte offset
        // reflecting STORE's 10-byte width, not the 1-instruction count
        // the compiler recorded.
        let bqz_pos = emitted.instructions.find("60").unwrap();
        let offset_hex = &emitted.instructions[bqz_pos + 2..bqz_pos + 4];
        let offset = u8::from_str_radix(offset_hex, 16).unwrap();
        assert!(offset >= 10, "offset {} should account for STORE's 10-byte width", offset);
    }

    #[test]
    fn evaluate_once_flag_round_trips_through_emit() {
        let program = compile("#{1}");
        let emitted = emit(&program).unwrap();
        assert!(!emitted.evaluate_once);
    }
}
