use crate::config::Geometry;
use serde::{Deserialize, Serialize};

/// Where a word address lands in a set-associative cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Block id, also used as the line tag.
    pub block: u64,
    /// Set the block maps to (`block % sets`).
    pub set: usize,
    /// Word index inside the line.
    pub offset: usize,
}

impl Geometry {
    /// Split a word address into block, set and word offset.
    pub fn locate(&self, addr: u64) -> Location {
        let block = addr / self.words_per_line;
        Location {
            block,
            set: (block % self.sets) as usize,
            offset: (addr % self.words_per_line) as usize,
        }
    }

    /// First word address of `block`.
    pub fn block_base(&self, block: u64) -> u64 {
        block * self.words_per_line
    }
}
