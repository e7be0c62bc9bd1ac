//! Set-associative cache with least-frequently-used replacement.
//!
//! Lines hold full copies of memory blocks. Stores are write-through with no
//! write-allocate, so main memory is always current and a cache line is only
//! ever filled by a read miss.

use crate::addr::Location;
use crate::config::Geometry;
use crate::memory::{Bus, MainMemory, MemError, Word};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Hit,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLine {
    /// Block id held by this line, `None` while empty.
    pub tag: Option<u64>,
    /// Accesses since the block was filled; 1 on fill, +1 per hit.
    pub accesses: u64,
    pub data: Vec<Word>,
}

impl CacheLine {
    fn empty(words: u64) -> Self {
        Self {
            tag: None,
            accesses: 0,
            data: vec![Word::default(); words as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cache {
    geometry: Geometry,
    sets: Vec<Vec<CacheLine>>, // [set][line]
    stats: CacheStats,
}

impl Cache {
    pub fn new(geometry: Geometry) -> Self {
        let set = vec![CacheLine::empty(geometry.words_per_line); geometry.lines_per_set as usize];
        Self {
            geometry,
            sets: vec![set; geometry.sets as usize],
            stats: CacheStats::default(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn sets(&self) -> &[Vec<CacheLine>] {
        &self.sets
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn find(&self, loc: Location) -> Option<usize> {
        self.sets[loc.set]
            .iter()
            .position(|l| l.tag == Some(loc.block))
    }

    /// Read the word at `addr`, filling its block from `mem` on a miss.
    pub fn lookup_or_fetch(
        &mut self,
        addr: u64,
        mem: &MainMemory,
    ) -> Result<(Word, Access), MemError> {
        if addr >= mem.len() {
            return Err(MemError::AddressOutOfRange {
                addr: addr as i64,
                words: mem.len(),
            });
        }
        let loc = self.geometry.locate(addr);

        if let Some(i) = self.find(loc) {
            let line = &mut self.sets[loc.set][i];
            line.accesses += 1;
            self.stats.hits += 1;
            return Ok((line.data[loc.offset].clone(), Access::Hit));
        }

        self.stats.misses += 1;
        let data = mem.block(self.geometry.block_base(loc.block), self.geometry.words_per_line);
        let victim = self.victim(loc.set);
        let line = &mut self.sets[loc.set][victim];
        if let Some(old) = line.tag {
            self.stats.evictions += 1;
            trace!(set = loc.set, line = victim, old, new = loc.block, "evict");
        } else {
            trace!(set = loc.set, line = victim, block = loc.block, "fill");
        }
        line.tag = Some(loc.block);
        line.accesses = 1;
        line.data = data;
        Ok((line.data[loc.offset].clone(), Access::Miss))
    }

    /// Line to fill in `set`: the first empty line, otherwise the line with
    /// the fewest accesses (lowest index on ties).
    fn victim(&self, set: usize) -> usize {
        let lines = &self.sets[set];
        if let Some(i) = lines.iter().position(|l| l.tag.is_none()) {
            return i;
        }
        let mut best = 0;
        for (i, l) in lines.iter().enumerate() {
            if l.accesses < lines[best].accesses {
                best = i;
            }
        }
        best
    }

    /// Update a resident copy of `addr` in place. Returns whether the block was
    /// resident. Access counts are left alone.
    pub fn update(&mut self, addr: u64, val: &Word) -> bool {
        let loc = self.geometry.locate(addr);
        match self.find(loc) {
            Some(i) => {
                self.sets[loc.set][i].data[loc.offset] = val.clone();
                true
            }
            None => false,
        }
    }

    /// Write-through store: update the resident line if any, then memory.
    pub fn write(&mut self, addr: u64, val: Word, mem: &mut MainMemory) -> Result<(), MemError> {
        // Check bounds first so a failed store touches nothing.
        mem.read(addr)?;
        let resident = self.update(addr, &val);
        trace!(addr, resident, %val, "write-through");
        mem.write(addr, val)
    }
}

/// A data path: `cache` in front of `mem`.
#[derive(Debug)]
pub struct CachedBus<'a> {
    pub cache: &'a mut Cache,
    pub mem: &'a mut MainMemory,
    /// Outcome of the most recent `load`.
    pub last: Option<Access>,
}

impl<'a> CachedBus<'a> {
    pub fn new(cache: &'a mut Cache, mem: &'a mut MainMemory) -> Self {
        Self {
            cache,
            mem,
            last: None,
        }
    }
}

impl Bus for CachedBus<'_> {
    fn load(&mut self, addr: u64) -> Result<Word, MemError> {
        let (w, access) = self.cache.lookup_or_fetch(addr, self.mem)?;
        self.last = Some(access);
        Ok(w)
    }
    fn store(&mut self, addr: u64, val: Word) -> Result<(), MemError> {
        self.cache.write(addr, val, self.mem)
    }
    fn peek(&self, addr: u64) -> Result<Word, MemError> {
        self.mem.read(addr).cloned()
    }
    fn words(&self) -> u64 {
        self.mem.len()
    }
}
