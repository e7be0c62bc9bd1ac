use std::fmt::{self, Write};

use cachesim_rs::{Access, Cache, CycleReport, Snapshot};

fn access(a: Access) -> &'static str {
    match a {
        Access::Hit => "hit",
        Access::Miss => "miss",
    }
}

fn cache(out: &mut String, name: &str, c: &Cache) -> fmt::Result {
    writeln!(out, "== {name} ==")?;
    for (i, set) in c.sets().iter().enumerate() {
        writeln!(out, "-- set {i} --")?;
        for line in set {
            let block = line.tag.map_or_else(|| "empty".to_string(), |b| b.to_string());
            let words: Vec<String> = line.data.iter().map(|w| w.to_string()).collect();
            writeln!(
                out,
                "block {block:>6} | accesses {:>4} | [{}]",
                line.accesses,
                words.join(", ")
            )?;
        }
    }
    let s = c.stats();
    writeln!(out, "hits {} misses {} evictions {}", s.hits, s.misses, s.evictions)
}

/// Text dump of one cycle.
pub fn cycle(out: &mut String, r: &CycleReport, s: &Snapshot<'_>) -> fmt::Result {
    writeln!(out, "------ cycle {} | PC {} -> {} ------", s.cycle, r.pc, r.next_pc)?;
    write!(out, "{}  (fetch {}", r.text, access(r.fetch))?;
    if let Some(d) = r.data {
        write!(out, ", data {}", access(d))?;
    }
    writeln!(out, ")")?;

    let regs = s.registers;
    writeln!(
        out,
        "RSP = {} | RA = {} | OF = {}",
        regs.rsp,
        regs.ra,
        u8::from(regs.overflow())
    )?;
    for row in 0..8 {
        let cols: Vec<String> = (0..4)
            .map(|c| row + 8 * c)
            .map(|i| format!("r{i:<2} = {:<12}", regs.gpr[i]))
            .collect();
        writeln!(out, "{}", cols.join(" | "))?;
    }

    cache(out, "data cache", s.dcache)?;
    cache(out, "instruction cache", s.icache)?;

    writeln!(out, "== main memory ==")?;
    for (addr, w) in &s.memory {
        writeln!(out, "{addr:>6}: {w}")?;
    }
    writeln!(out)
}
