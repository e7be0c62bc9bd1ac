use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cachesim_rs::{Machine, RunOutcome, SimConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an assembly program on the cachesim-rs simulator"
)]
struct Opts {
    /// Configuration file (`key = value` lines, or JSON when it ends in .json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    memory_bytes: Option<u64>,
    #[arg(long)]
    line_bytes: Option<u64>,
    #[arg(long)]
    lines_per_set: Option<u64>,
    #[arg(long)]
    sets: Option<u64>,
    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,
    #[arg(value_name = "PROGRAM")]
    input: PathBuf,
}

fn load_config(opts: &Opts) -> Result<SimConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            if path.extension().is_some_and(|e| e == "json") {
                SimConfig::from_json(&text)?
            } else {
                SimConfig::from_kv_str(&text)?
            }
        }
        None => SimConfig::default(),
    };
    if let Some(v) = opts.memory_bytes {
        cfg.memory_bytes = v;
    }
    if let Some(v) = opts.line_bytes {
        cfg.line_bytes = v;
    }
    if let Some(v) = opts.lines_per_set {
        cfg.lines_per_set = v;
    }
    if let Some(v) = opts.sets {
        cfg.sets = v;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let cfg = load_config(&opts)?;
    let mut machine = Machine::new(&cfg)?;

    let src = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading program {}", opts.input.display()))?;
    machine.load_program(&src)?;

    match machine.run(opts.max_cycles)? {
        RunOutcome::Halted { cycles } => println!("halted after {cycles} cycles"),
        RunOutcome::StepLimit { cycles } => println!("stopped at step limit after {cycles} cycles"),
    }

    let regs = machine.regs();
    println!(
        "PC = {}  RSP = {}  RA = {}  OF = {}",
        regs.pc,
        regs.rsp,
        regs.ra,
        u8::from(regs.overflow())
    );
    for (i, v) in regs.gpr.iter().enumerate().filter(|(_, v)| **v != 0) {
        println!("r{i} = {v}");
    }
    for (name, cache) in [("icache", machine.icache()), ("dcache", machine.dcache())] {
        let s = cache.stats();
        println!("{name}: {} hits, {} misses, {} evictions", s.hits, s.misses, s.evictions);
    }
    Ok(())
}
