use serde::{Deserialize, Serialize};

pub use crate::cpu::{Gpr, NUM_GPRS};

/// A readable register operand. The stack pointer may be read but never
/// named as a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Src {
    Gpr(Gpr),
    Rsp,
}

/// `disp(base)` displacement operand of `lw`/`sw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemRef {
    pub disp: i64,
    pub base: Src,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Add { rd: Gpr, rs1: Src, rs2: Src },
    Addi { rd: Gpr, rs1: Src, imm: i64 },
    Sub { rd: Gpr, rs1: Src, rs2: Src },
    Subi { rd: Gpr, rs1: Src, imm: i64 },
    Mul { rd: Gpr, rs1: Src, rs2: Src },
    Div { rd: Gpr, rs1: Src, rs2: Src },
    Not { rd: Gpr, rs: Src },
    Or { rd: Gpr, rs1: Src, rs2: Src },
    And { rd: Gpr, rs1: Src, rs2: Src },
    Mov { rd: Gpr, rs: Src },
    Movi { rd: Gpr, imm: i64 },
    Blti { rs: Src, imm: i64, target: i64 },
    Bgti { rs: Src, imm: i64, target: i64 },
    Beqi { rs: Src, imm: i64, target: i64 },
    /// Target is a literal address.
    Blt { rs1: Src, rs2: Src, target: i64 },
    /// Target is read from a register.
    Bgt { rs1: Src, rs2: Src, target: Src },
    /// Target is read from a register.
    Beq { rs1: Src, rs2: Src, target: Src },
    Jr { target: Src },
    Jof { target: Src },
    Jal { target: i64 },
    Ret,
    Lw { rd: Gpr, mem: MemRef },
    Sw { rs: Src, mem: MemRef },
    /// A blank line. Occupies its word and does nothing.
    Nop,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown instruction `{0}`")]
    UnknownInstruction(String),
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("register `{0}` cannot be used here")]
    ReservedRegister(String),
    #[error("malformed operand `{0}`")]
    MalformedOperand(String),
    #[error("`{mnemonic}` takes {expected} operands, got {got}")]
    OperandCount {
        mnemonic: String,
        expected: usize,
        got: usize,
    },
}

/// Split a source line into its mnemonic and comma-separated operand tokens.
///
/// Only the first space separates the mnemonic; no operands when there is
/// none. Tokens are returned as written.
pub fn split(line: &str) -> (&str, Vec<&str>) {
    match line.split_once(' ') {
        Some((op, rest)) => (op, rest.split(',').collect()),
        None => (line, Vec::new()),
    }
}

fn parse_src(tok: &str) -> Result<Src, DecodeError> {
    let t = tok.trim();
    match t.to_ascii_lowercase().as_str() {
        "rsp" => return Ok(Src::Rsp),
        "pc" | "ra" | "of" => return Err(DecodeError::ReservedRegister(t.to_string())),
        _ => {}
    }
    t.strip_prefix('r')
        .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(Gpr::new)
        .map(Src::Gpr)
        .ok_or_else(|| DecodeError::UnknownRegister(t.to_string()))
}

fn parse_dst(tok: &str) -> Result<Gpr, DecodeError> {
    match parse_src(tok)? {
        Src::Gpr(r) => Ok(r),
        Src::Rsp => Err(DecodeError::ReservedRegister(tok.trim().to_string())),
    }
}

fn parse_imm(tok: &str) -> Result<i64, DecodeError> {
    let t = tok.trim();
    t.parse::<i64>()
        .map_err(|_| DecodeError::MalformedOperand(t.to_string()))
}

fn parse_mem(tok: &str) -> Result<MemRef, DecodeError> {
    let t = tok.trim();
    let bad = || DecodeError::MalformedOperand(t.to_string());
    let (disp, rest) = t.split_once('(').ok_or_else(bad)?;
    let base = rest.strip_suffix(')').ok_or_else(bad)?;
    Ok(MemRef {
        disp: parse_imm(disp).map_err(|_| bad())?,
        base: parse_src(base)?,
    })
}

fn expect(mnemonic: &str, ops: &[&str], n: usize) -> Result<(), DecodeError> {
    if ops.len() == n {
        Ok(())
    } else {
        Err(DecodeError::OperandCount {
            mnemonic: mnemonic.to_string(),
            expected: n,
            got: ops.len(),
        })
    }
}

impl Instruction {
    /// Decode one line of assembly text.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        use Instruction::*;
        let (mn, ops) = split(line.trim());
        let o = ops.as_slice();
        let insn = match mn {
            "" => Nop,
            "add" | "sub" | "mul" | "div" | "or" | "and" => {
                expect(mn, o, 3)?;
                let (rd, rs1, rs2) = (parse_dst(o[0])?, parse_src(o[1])?, parse_src(o[2])?);
                match mn {
                    "add" => Add { rd, rs1, rs2 },
                    "sub" => Sub { rd, rs1, rs2 },
                    "mul" => Mul { rd, rs1, rs2 },
                    "div" => Div { rd, rs1, rs2 },
                    "or" => Or { rd, rs1, rs2 },
                    _ => And { rd, rs1, rs2 },
                }
            }
            "addi" | "subi" => {
                expect(mn, o, 3)?;
                let (rd, rs1, imm) = (parse_dst(o[0])?, parse_src(o[1])?, parse_imm(o[2])?);
                if mn == "addi" {
                    Addi { rd, rs1, imm }
                } else {
                    Subi { rd, rs1, imm }
                }
            }
            "not" | "mov" => {
                expect(mn, o, 2)?;
                let (rd, rs) = (parse_dst(o[0])?, parse_src(o[1])?);
                if mn == "not" {
                    Not { rd, rs }
                } else {
                    Mov { rd, rs }
                }
            }
            "movi" => {
                expect(mn, o, 2)?;
                Movi {
                    rd: parse_dst(o[0])?,
                    imm: parse_imm(o[1])?,
                }
            }
            "blti" | "bgti" | "beqi" => {
                expect(mn, o, 3)?;
                let (rs, imm, target) = (parse_src(o[0])?, parse_imm(o[1])?, parse_imm(o[2])?);
                match mn {
                    "blti" => Blti { rs, imm, target },
                    "bgti" => Bgti { rs, imm, target },
                    _ => Beqi { rs, imm, target },
                }
            }
            "blt" => {
                expect(mn, o, 3)?;
                Blt {
                    rs1: parse_src(o[0])?,
                    rs2: parse_src(o[1])?,
                    target: parse_imm(o[2])?,
                }
            }
            "bgt" | "beq" => {
                expect(mn, o, 3)?;
                let (rs1, rs2, target) = (parse_src(o[0])?, parse_src(o[1])?, parse_src(o[2])?);
                if mn == "bgt" {
                    Bgt { rs1, rs2, target }
                } else {
                    Beq { rs1, rs2, target }
                }
            }
            // Only the third operand is read; the first two are placeholders.
            "jr" | "jof" => {
                expect(mn, o, 3)?;
                let target = parse_src(o[2])?;
                if mn == "jr" {
                    Jr { target }
                } else {
                    Jof { target }
                }
            }
            "jal" => {
                expect(mn, o, 1)?;
                Jal {
                    target: parse_imm(o[0])?,
                }
            }
            "ret" => {
                expect(mn, o, 0)?;
                Ret
            }
            "lw" => {
                expect(mn, o, 2)?;
                Lw {
                    rd: parse_dst(o[0])?,
                    mem: parse_mem(o[1])?,
                }
            }
            "sw" => {
                expect(mn, o, 2)?;
                Sw {
                    rs: parse_src(o[0])?,
                    mem: parse_mem(o[1])?,
                }
            }
            other => return Err(DecodeError::UnknownInstruction(other.to_string())),
        };
        Ok(insn)
    }
}

pub trait Decoder {
    fn decode(&self, line: &str) -> Result<Instruction, DecodeError>;
}

/// Decoder for the one-instruction-per-line text form.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextDecoder;

impl TextDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for TextDecoder {
    fn decode(&self, line: &str) -> Result<Instruction, DecodeError> {
        Instruction::parse(line)
    }
}
