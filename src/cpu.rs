use crate::decoder::{DecodeError, Instruction, Src};
use crate::memory::MemError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const NUM_GPRS: usize = 32;

/// General-purpose register index, always in `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gpr(u8);

impl Gpr {
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < NUM_GPRS).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags: u8 {
const OF = 1 << 0; // Overflow from the last arithmetic instruction
}
}

/// Register file: 32 general-purpose registers plus the control registers.
///
/// Control registers live in their own fields so no instruction can name
/// them as a general destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub gpr: [i64; NUM_GPRS],
    pub pc: u64,  // Program counter (word address)
    pub rsp: u64, // Stack pointer, grows down from the end of memory
    pub ra: u64,  // Return address of the last `jal`
    pub flags: Flags,
}

impl Registers {
    pub fn new(memory_words: u64) -> Self {
        Self {
            gpr: [0; NUM_GPRS],
            pc: 0,
            rsp: memory_words,
            ra: 0,
            flags: Flags::empty(),
        }
    }

    pub fn get(&self, r: Gpr) -> i64 {
        self.gpr[r.index()]
    }

    pub fn set(&mut self, r: Gpr, v: i64) {
        self.gpr[r.index()] = v;
    }

    pub fn read(&self, s: Src) -> i64 {
        match s {
            Src::Gpr(r) => self.get(r),
            Src::Rsp => self.rsp as i64,
        }
    }

    pub fn overflow(&self) -> bool {
        self.flags.contains(Flags::OF)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub regs: Registers,
}

impl Cpu {
    pub fn new(memory_words: u64) -> Self {
        Self {
            regs: Registers::new(memory_words),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Mem(#[from] MemError),
    #[error("division by zero")]
    DivisionByZero,
    #[error("stack underflow: ret with RSP = {rsp}")]
    StackUnderflow { rsp: u64 },
    #[error("stack overflow: jal with RSP = 0")]
    StackOverflow,
    #[error("word at {addr} is data, not an instruction")]
    NotAnInstruction { addr: u64 },
    #[error("word at {addr} is an instruction, not data")]
    NotData { addr: u64 },
    #[error("jump to negative address {target}")]
    BadJumpTarget { target: i64 },
}

/// A trap tagged with the instruction that raised it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("fault at {pc} (`{text}`{}): {trap}", decoded_suffix(.decoded))]
pub struct Fault {
    pub pc: u64,
    pub text: String,
    pub decoded: Option<Instruction>,
    #[source]
    pub trap: Trap,
}

fn decoded_suffix(d: &Option<Instruction>) -> String {
    match d {
        Some(i) => format!(" decoded as `{i}`"),
        None => String::new(),
    }
}
