use crate::cpu::{Cpu, Flags, Gpr, Trap};
use crate::decoder::{Instruction, MemRef, Src};
use crate::memory::{Bus, MemError, Word};

/// Overflow bounds. A result below `OVERFLOW_MIN` or at or above
/// `OVERFLOW_MAX` sets OF.
pub const OVERFLOW_MIN: i128 = -(1 << 32);
pub const OVERFLOW_MAX: i128 = (1 << 32) - 1;

/// Where execution continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Jump(u64),
}

pub trait Executor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, insn: Instruction) -> Result<Flow, Trap>;
}

fn wide(cpu: &Cpu, s: Src) -> i128 {
    cpu.regs.read(s) as i128
}

fn jump(target: i64) -> Result<Flow, Trap> {
    u64::try_from(target)
        .map(Flow::Jump)
        .map_err(|_| Trap::BadJumpTarget { target })
}

fn effective(cpu: &Cpu, bus: &impl Bus, m: MemRef) -> Result<u64, Trap> {
    let ea = m.disp.wrapping_add(cpu.regs.read(m.base));
    match u64::try_from(ea) {
        Ok(a) if a < bus.words() => Ok(a),
        _ => Err(MemError::AddressOutOfRange {
            addr: ea,
            words: bus.words(),
        }
        .into()),
    }
}

/// Division rounding toward negative infinity.
fn floor_div(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Integer executor for the whole instruction set.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntExecutor;

impl IntExecutor {
    fn arith(cpu: &mut Cpu, rd: Gpr, wide: i128) {
        cpu.regs.set(rd, wide as i64);
        let of = wide < OVERFLOW_MIN || wide >= OVERFLOW_MAX;
        cpu.regs.flags.set(Flags::OF, of);
    }
}

impl Executor for IntExecutor {
    fn exec<B: Bus>(&self, cpu: &mut Cpu, bus: &mut B, insn: Instruction) -> Result<Flow, Trap> {
        use Instruction::*;
        match insn {
            Add { rd, rs1, rs2 } => {
                let v = wide(cpu, rs1) + wide(cpu, rs2);
                Self::arith(cpu, rd, v);
            }
            Addi { rd, rs1, imm } => {
                let v = wide(cpu, rs1) + imm as i128;
                Self::arith(cpu, rd, v);
            }
            Sub { rd, rs1, rs2 } => {
                let v = wide(cpu, rs1) - wide(cpu, rs2);
                Self::arith(cpu, rd, v);
            }
            Subi { rd, rs1, imm } => {
                let v = wide(cpu, rs1) - imm as i128;
                Self::arith(cpu, rd, v);
            }
            Mul { rd, rs1, rs2 } => {
                let v = wide(cpu, rs1) * wide(cpu, rs2);
                Self::arith(cpu, rd, v);
            }
            Div { rd, rs1, rs2 } => {
                let (a, b) = (wide(cpu, rs1), wide(cpu, rs2));
                if b == 0 {
                    return Err(Trap::DivisionByZero);
                }
                cpu.regs.set(rd, floor_div(a, b) as i64);
            }
            Not { rd, rs } => {
                let v = !cpu.regs.read(rs);
                cpu.regs.set(rd, v);
            }
            Or { rd, rs1, rs2 } => {
                let v = cpu.regs.read(rs1) | cpu.regs.read(rs2);
                cpu.regs.set(rd, v);
            }
            And { rd, rs1, rs2 } => {
                let v = cpu.regs.read(rs1) & cpu.regs.read(rs2);
                cpu.regs.set(rd, v);
            }
            Mov { rd, rs } => {
                let v = cpu.regs.read(rs);
                cpu.regs.set(rd, v);
            }
            Movi { rd, imm } => cpu.regs.set(rd, imm),
            Nop => {}
            Blti { rs, imm, target } => {
                if cpu.regs.read(rs) < imm {
                    return jump(target);
                }
            }
            Bgti { rs, imm, target } => {
                if cpu.regs.read(rs) > imm {
                    return jump(target);
                }
            }
            Beqi { rs, imm, target } => {
                if cpu.regs.read(rs) == imm {
                    return jump(target);
                }
            }
            Blt { rs1, rs2, target } => {
                if cpu.regs.read(rs1) < cpu.regs.read(rs2) {
                    return jump(target);
                }
            }
            Bgt { rs1, rs2, target } => {
                if cpu.regs.read(rs1) > cpu.regs.read(rs2) {
                    return jump(cpu.regs.read(target));
                }
            }
            Beq { rs1, rs2, target } => {
                if cpu.regs.read(rs1) == cpu.regs.read(rs2) {
                    return jump(cpu.regs.read(target));
                }
            }
            Jr { target } => return jump(cpu.regs.read(target)),
            Jof { target } => {
                if cpu.regs.overflow() {
                    return jump(cpu.regs.read(target));
                }
            }
            Jal { target } => {
                let flow = jump(target)?;
                let sp = cpu.regs.rsp.checked_sub(1).ok_or(Trap::StackOverflow)?;
                let pc = cpu.regs.pc;
                // Saves the address of the jal itself; ret resumes one past it.
                bus.store(sp, Word::Data(pc as i64))?;
                cpu.regs.rsp = sp;
                cpu.regs.ra = pc;
                return Ok(flow);
            }
            Ret => {
                let sp = cpu.regs.rsp;
                if sp >= bus.words() {
                    return Err(Trap::StackUnderflow { rsp: sp });
                }
                let saved = match bus.peek(sp)? {
                    Word::Data(v) => v,
                    Word::Instr(_) => return Err(Trap::NotData { addr: sp }),
                };
                let flow = jump(saved.wrapping_add(1))?;
                bus.store(sp, Word::Data(0))?;
                cpu.regs.rsp = sp + 1;
                return Ok(flow);
            }
            Lw { rd, mem } => {
                let addr = effective(cpu, &*bus, mem)?;
                // Cell kind is checked in memory so a bad load never fills a line.
                if let Word::Instr(_) = bus.peek(addr)? {
                    return Err(Trap::NotData { addr });
                }
                if let Word::Data(v) = bus.load(addr)? {
                    cpu.regs.set(rd, v);
                }
            }
            Sw { rs, mem } => {
                let addr = effective(cpu, &*bus, mem)?;
                let v = cpu.regs.read(rs);
                bus.store(addr, Word::Data(v))?;
            }
        }
        Ok(Flow::Next)
    }
}
