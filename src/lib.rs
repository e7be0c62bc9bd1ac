pub mod addr;
pub mod cache;
pub mod config;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod memory;
pub mod sim;

pub use cache::{Access, Cache, CacheLine, CacheStats};
pub use config::{ConfigError, Geometry, SimConfig};
pub use cpu::{Cpu, Fault, Flags, Registers, Trap};
pub use decoder::{DecodeError, Instruction};
pub use memory::{Bus, MainMemory, MemError, Word};
pub use sim::{CycleReport, Machine, RunOutcome, Snapshot};
