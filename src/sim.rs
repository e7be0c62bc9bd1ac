//! The fetch-decode-execute loop.

use crate::cache::{Access, Cache, CachedBus};
use crate::config::{ConfigError, Geometry, SimConfig};
use crate::cpu::{Cpu, Fault, Registers, Trap};
use crate::decoder::{Decoder, Instruction, TextDecoder};
use crate::exec::{Executor, Flow, IntExecutor};
use crate::memory::{MainMemory, MemError, Word};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Address the instruction was fetched from.
    pub pc: u64,
    pub text: String,
    pub insn: Instruction,
    pub fetch: Access,
    /// Data cache outcome for `lw`.
    pub data: Option<Access>,
    /// PC after the cycle.
    pub next_pc: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// PC reached the end-of-program address.
    Halted { cycles: u64 },
    /// The step limit ran out first.
    StepLimit { cycles: u64 },
}

/// Post-cycle machine state for presentation layers.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub cycle: u64,
    pub fetch: Option<Access>,
    pub registers: &'a Registers,
    pub icache: &'a Cache,
    pub dcache: &'a Cache,
    /// Memory cells that are not integer zero.
    pub memory: Vec<(u64, &'a Word)>,
}

/// A CPU with split instruction and data caches over one main memory.
#[derive(Debug, Clone)]
pub struct Machine {
    cpu: Cpu,
    icache: Cache,
    dcache: Cache,
    mem: MainMemory,
    geometry: Geometry,
    end: u64,
    cycles: u64,
    last_fetch: Option<Access>,
}

impl Machine {
    pub fn new(cfg: &SimConfig) -> Result<Self, ConfigError> {
        let geometry = cfg.validate()?;
        Ok(Self {
            cpu: Cpu::new(geometry.memory_words),
            icache: Cache::new(geometry),
            dcache: Cache::new(geometry),
            mem: MainMemory::new(geometry.memory_words),
            geometry,
            end: 0,
            cycles: 0,
            last_fetch: None,
        })
    }

    /// Load program text at address 0 and set the end-of-program address.
    pub fn load_program(&mut self, src: &str) -> Result<u64, MemError> {
        self.end = self.mem.load_program(src)?;
        info!(instructions = self.end, "program loaded");
        Ok(self.end)
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn regs(&self) -> &Registers {
        &self.cpu.regs
    }

    pub fn icache(&self) -> &Cache {
        &self.icache
    }

    pub fn dcache(&self) -> &Cache {
        &self.dcache
    }

    pub fn memory(&self) -> &MainMemory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut MainMemory {
        &mut self.mem
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// End-of-program address.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn halted(&self) -> bool {
        self.cpu.regs.pc >= self.end
    }

    /// Run one cycle with the built-in decoder and executor.
    ///
    /// Returns `Ok(None)` once PC has reached the end of the program.
    pub fn step(&mut self) -> Result<Option<CycleReport>, Fault> {
        self.step_with(&TextDecoder, &IntExecutor)
    }

    pub fn step_with<D: Decoder, X: Executor>(
        &mut self,
        dec: &D,
        exec: &X,
    ) -> Result<Option<CycleReport>, Fault> {
        let pc = self.cpu.regs.pc;
        if pc >= self.end {
            return Ok(None);
        }
        let fault = |text: &str, decoded: Option<Instruction>, trap: Trap| Fault {
            pc,
            text: text.to_string(),
            decoded,
            trap,
        };

        let (word, fetch) = self
            .icache
            .lookup_or_fetch(pc, &self.mem)
            .map_err(|e| fault("", None, e.into()))?;
        self.last_fetch = Some(fetch);
        let text = match word {
            Word::Instr(text) => text,
            Word::Data(v) => {
                return Err(fault(&v.to_string(), None, Trap::NotAnInstruction { addr: pc }))
            }
        };
        let insn = dec
            .decode(&text)
            .map_err(|e| fault(&text, None, e.into()))?;

        let mut bus = CachedBus::new(&mut self.dcache, &mut self.mem);
        let flow = exec
            .exec(&mut self.cpu, &mut bus, insn)
            .map_err(|e| fault(&text, Some(insn), e))?;
        let data = bus.last;

        let next_pc = match flow {
            Flow::Next => pc + 1,
            Flow::Jump(target) => target,
        };
        self.cpu.regs.pc = next_pc;
        self.cycles += 1;
        debug!(pc, insn = %text, ?fetch, ?data, next_pc, "cycle");

        Ok(Some(CycleReport {
            pc,
            text,
            insn,
            fetch,
            data,
            next_pc,
        }))
    }

    /// Step until the program ends or `limit` cycles have run.
    pub fn run(&mut self, limit: Option<u64>) -> Result<RunOutcome, Fault> {
        let mut cycles = 0u64;
        loop {
            if limit.is_some_and(|l| cycles >= l) && !self.halted() {
                warn!(cycles, pc = self.cpu.regs.pc, "step limit reached");
                return Ok(RunOutcome::StepLimit { cycles });
            }
            match self.step()? {
                Some(_) => cycles += 1,
                None => {
                    info!(cycles, "halted");
                    return Ok(RunOutcome::Halted { cycles });
                }
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            cycle: self.cycles,
            fetch: self.last_fetch,
            registers: &self.cpu.regs,
            icache: &self.icache,
            dcache: &self.dcache,
            memory: self.mem.occupied().collect(),
        }
    }
}
