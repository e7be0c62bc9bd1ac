use crate::cpu::Gpr;
use crate::decoder::{Instruction, MemRef, Src};
use std::fmt;

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.index())
    }
}

impl fmt::Display for Src {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Src::Gpr(r) => write!(f, "{r}"),
            Src::Rsp => f.write_str("rsp"),
        }
    }
}

impl fmt::Display for MemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.disp, self.base)
    }
}

/// Canonical assembly text, e.g. `add r3,r1,r2` or `lw r1,4(r2)`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match self {
            Add { rd, rs1, rs2 } => write!(f, "add {rd},{rs1},{rs2}"),
            Addi { rd, rs1, imm } => write!(f, "addi {rd},{rs1},{imm}"),
            Sub { rd, rs1, rs2 } => write!(f, "sub {rd},{rs1},{rs2}"),
            Subi { rd, rs1, imm } => write!(f, "subi {rd},{rs1},{imm}"),
            Mul { rd, rs1, rs2 } => write!(f, "mul {rd},{rs1},{rs2}"),
            Div { rd, rs1, rs2 } => write!(f, "div {rd},{rs1},{rs2}"),
            Not { rd, rs } => write!(f, "not {rd},{rs}"),
            Or { rd, rs1, rs2 } => write!(f, "or {rd},{rs1},{rs2}"),
            And { rd, rs1, rs2 } => write!(f, "and {rd},{rs1},{rs2}"),
            Mov { rd, rs } => write!(f, "mov {rd},{rs}"),
            Movi { rd, imm } => write!(f, "movi {rd},{imm}"),
            Blti { rs, imm, target } => write!(f, "blti {rs},{imm},{target}"),
            Bgti { rs, imm, target } => write!(f, "bgti {rs},{imm},{target}"),
            Beqi { rs, imm, target } => write!(f, "beqi {rs},{imm},{target}"),
            Blt { rs1, rs2, target } => write!(f, "blt {rs1},{rs2},{target}"),
            Bgt { rs1, rs2, target } => write!(f, "bgt {rs1},{rs2},{target}"),
            Beq { rs1, rs2, target } => write!(f, "beq {rs1},{rs2},{target}"),
            // The first two operands are never read; r0 fills the slots.
            Jr { target } => write!(f, "jr r0,r0,{target}"),
            Jof { target } => write!(f, "jof r0,r0,{target}"),
            Jal { target } => write!(f, "jal {target}"),
            Ret => f.write_str("ret"),
            Lw { rd, mem } => write!(f, "lw {rd},{mem}"),
            Sw { rs, mem } => write!(f, "sw {rs},{mem}"),
            Nop => Ok(()),
        }
    }
}
