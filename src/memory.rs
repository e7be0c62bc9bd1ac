use serde::{Deserialize, Serialize};
use std::fmt;

/// One 8-byte memory cell: either an integer or an instruction's source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Word {
    Data(i64),
    Instr(String),
}

impl Default for Word {
    fn default() -> Self {
        Word::Data(0)
    }
}

impl Word {
    pub fn is_zero(&self) -> bool {
        matches!(self, Word::Data(0))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Data(v) => write!(f, "{v}"),
            Word::Instr(s) => f.write_str(s),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("address {addr} outside memory of {words} words")]
    AddressOutOfRange { addr: i64, words: u64 },
    #[error("program of {size} instructions does not fit in {words} words")]
    ProgramTooLarge { size: usize, words: u64 },
}

/// Word-addressed access path used by the executor.
pub trait Bus {
    /// Read a word for the program, going through any cache in front.
    fn load(&mut self, addr: u64) -> Result<Word, MemError>;
    /// Write a word through to memory.
    fn store(&mut self, addr: u64, val: Word) -> Result<(), MemError>;
    /// Read main memory directly, bypassing any cache.
    fn peek(&self, addr: u64) -> Result<Word, MemError>;
    /// Number of addressable words.
    fn words(&self) -> u64;
}

/// Flat main memory of word cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct MainMemory {
    cells: Vec<Word>,
}

impl MainMemory {
    pub fn new(words: u64) -> Self {
        Self {
            cells: vec![Word::default(); words as usize],
        }
    }

    pub fn len(&self) -> u64 {
        self.cells.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, addr: u64) -> Result<usize, MemError> {
        if addr < self.len() {
            Ok(addr as usize)
        } else {
            Err(MemError::AddressOutOfRange {
                addr: addr as i64,
                words: self.len(),
            })
        }
    }

    pub fn read(&self, addr: u64) -> Result<&Word, MemError> {
        let i = self.index(addr)?;
        Ok(&self.cells[i])
    }

    pub fn write(&mut self, addr: u64, val: Word) -> Result<(), MemError> {
        let i = self.index(addr)?;
        self.cells[i] = val;
        Ok(())
    }

    /// Copy out `len` words starting at `base`. Words past the end of memory
    /// read as integer zero.
    pub fn block(&self, base: u64, len: u64) -> Vec<Word> {
        (base..base + len)
            .map(|a| self.cells.get(a as usize).cloned().unwrap_or_default())
            .collect()
    }

    /// Store program text one instruction per word from address 0.
    ///
    /// Returns the number of instructions loaded, i.e. the end-of-program
    /// address.
    pub fn load_program(&mut self, src: &str) -> Result<u64, MemError> {
        let mut lines: Vec<&str> = src.lines().map(str::trim).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        if lines.len() as u64 > self.len() {
            return Err(MemError::ProgramTooLarge {
                size: lines.len(),
                words: self.len(),
            });
        }
        for (cell, line) in self.cells.iter_mut().zip(&lines) {
            *cell = Word::Instr((*line).to_string());
        }
        Ok(lines.len() as u64)
    }

    /// Cells holding anything other than integer zero.
    pub fn occupied(&self) -> impl Iterator<Item = (u64, &Word)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.is_zero())
            .map(|(a, w)| (a as u64, w))
    }
}

impl Bus for MainMemory {
    fn load(&mut self, addr: u64) -> Result<Word, MemError> {
        self.read(addr).cloned()
    }
    fn store(&mut self, addr: u64, val: Word) -> Result<(), MemError> {
        self.write(addr, val)
    }
    fn peek(&self, addr: u64) -> Result<Word, MemError> {
        self.read(addr).cloned()
    }
    fn words(&self) -> u64 {
        self.len()
    }
}

impl fmt::Debug for MainMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainMemory")
            .field("words", &self.cells.len())
            .field("occupied", &self.occupied().count())
            .finish()
    }
}
