use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cachesim_rs::{Instruction, Machine, SimConfig};

mod render;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-by-cycle state dumps for cachesim-rs", long_about = None)]
struct Cli {
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
    /// Program file, one instruction per line
    #[arg(value_name = "PROGRAM")]
    input: PathBuf,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute the program and dump machine state after every cycle
    Run {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Stop after this many cycles
        #[arg(long, default_value_t = 10_000u64)]
        max_cycles: u64,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Decode every loaded line and print it in canonical form
    Listing,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(cli: &Cli) -> Result<SimConfig> {
    let mut cfg = match &cli.config {
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
    for (slot, v) in [
        (&mut cfg.memory_bytes, cli.memory_bytes),
        (&mut cfg.line_bytes, cli.line_bytes),
        (&mut cfg.lines_per_set, cli.lines_per_set),
        (&mut cfg.sets, cli.sets),
    ] {
        if let Some(v) = v {
            *slot = v;
        }
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    let src = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading program {}", cli.input.display()))?;
    let mut machine = Machine::new(&cfg)?;
    let end = machine.load_program(&src)?;

    match cli.cmd {
        Command::Listing => {
            for (pc, line) in src.lines().map(str::trim).take(end as usize).enumerate() {
                match Instruction::parse(line) {
                    Ok(insn) => println!("{pc:>5}: {insn}"),
                    Err(e) => println!("{pc:>5}: <{e}>  {line}"),
                }
            }
        }
        Command::Run { format, max_cycles, out } => {
            let mut buf = String::new();
            let mut result = Ok(());
            while machine.cycles() < max_cycles {
                match machine.step() {
                    Ok(Some(report)) => {
                        let snap = machine.snapshot();
                        match format {
                            OutputFormat::Text => render::cycle(&mut buf, &report, &snap)?,
                            OutputFormat::Json => {
                                let line = serde_json::json!({ "report": report, "state": snap });
                                writeln!(buf, "{}", serde_json::to_string(&line)?)?;
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(fault) => {
                        result = Err(fault);
                        break;
                    }
                }
            }
            if let Some(path) = out {
                std::fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))?;
            } else {
                print!("{buf}");
            }
            result?;
        }
    }
    Ok(())
}
