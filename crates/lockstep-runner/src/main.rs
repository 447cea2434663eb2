//! Runs a program image on the lockstep CPU and prints the final machine
//! state.
//!
//! ```text
//! lockstep program.hex --reg r1=2 --max-ticks 200
//! lockstep program.bin --latency 3 --config cpu.json --json
//! ```
//!
//! Logging goes through `env_logger`; `RUST_LOG=lockstep_cpu=debug` shows
//! every retired instruction, `trace` every bus handshake.

mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use lockstep_core::{Cpu, Observable};
use lockstep_cpu::{
    CpuConfig, LatencyMemory, LockstepCpu, ProgramImage, RunOutcome, SimpleMemory,
};
use log::info;
use serde::Serialize;

use crate::error::RunError;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Run a program image on the lockstep CPU.
#[derive(Parser, Debug)]
#[command(name = "lockstep", version, about, long_about = None)]
struct Args {
    /// Program image: `.hex` text (one halfword per line) or raw
    /// little-endian binary.
    image: PathBuf,

    /// Halfword address to start executing at.
    #[arg(long, value_parser = parse_number, default_value = "0")]
    entry: u32,

    /// Stop after this many ticks if the program has not halted.
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,

    /// Ticks a request must be held before memory acknowledges it.
    #[arg(long, default_value_t = 0)]
    latency: u32,

    /// Memory size in 32-bit words.
    #[arg(long, value_parser = parse_number, default_value = "0x10000")]
    memory_words: u32,

    /// Register preset applied after reset, e.g. `--reg r1=0x20`.
    #[arg(long = "reg", value_name = "rN=VALUE")]
    presets: Vec<String>,

    /// JSON CPU configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Drive the optional counters (retired, reads, writes, prefetch-blocked).
    #[arg(long)]
    extended_counters: bool,

    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_number(text: &str) -> Result<u32, String> {
    let text = text.replace('_', "");
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("{text:?}: {e}"))
}

/// `rN=VALUE`
fn parse_preset(text: &str) -> Result<(u8, u32), RunError> {
    let bad = || RunError::BadPreset(text.to_string());
    let (reg, value) = text.split_once('=').ok_or_else(bad)?;
    let index: u8 = reg
        .trim()
        .strip_prefix('r')
        .and_then(|n| n.parse().ok())
        .filter(|&n| n < 16)
        .ok_or_else(bad)?;
    let value = parse_number(value.trim()).map_err(|_| bad())?;
    Ok((index, value))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_config(args: &Args) -> Result<CpuConfig, RunError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| RunError::io(path, e))?;
            serde_json::from_str(&text)?
        }
        None => CpuConfig::default(),
    };
    config.extended_counters |= args.extended_counters;
    Ok(config)
}

fn load_image(path: &Path) -> Result<ProgramImage, RunError> {
    let is_hex = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex"));
    let image = if is_hex {
        let text = fs::read_to_string(path).map_err(|e| RunError::io(path, e))?;
        ProgramImage::from_hex(&text)?
    } else {
        let bytes = fs::read(path).map_err(|e| RunError::io(path, e))?;
        ProgramImage::from_bytes(&bytes)?
    };
    info!("loaded {} halves from {}", image.halves().len(), path.display());
    Ok(image)
}

fn build_memory(image: &ProgramImage, words: usize) -> Result<SimpleMemory, RunError> {
    let needed = image.words().len();
    if needed > words {
        return Err(RunError::ImageTooLarge {
            words: needed,
            capacity: words,
        });
    }
    let mut memory = SimpleMemory::new(words);
    image.load_into(&mut memory, 0);
    Ok(memory)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Report {
    outcome: &'static str,
    trap: Option<String>,
    pc: u32,
    registers: [u32; 16],
    flags: String,
    counters: CounterReport,
}

#[derive(Serialize)]
struct CounterReport {
    cycles: u64,
    retired: u64,
    fetch_stalls: u64,
    fills: u64,
    reads: u64,
    writes: u64,
    prefetch_blocked: u64,
}

impl Report {
    fn new(cpu: &LockstepCpu, outcome: RunOutcome) -> Self {
        let regs = cpu.registers();
        let counters = cpu.counters();
        Self {
            outcome: match outcome {
                RunOutcome::Halted(_) => "halted",
                RunOutcome::BudgetExhausted => "budget-exhausted",
            },
            trap: cpu.trap().map(|t| t.to_string()),
            pc: regs.pc,
            registers: regs.r,
            flags: regs.flags.to_string(),
            counters: CounterReport {
                cycles: counters.cycles.get(),
                retired: counters.retired.get(),
                fetch_stalls: counters.fetch_stalls.get(),
                fills: counters.fills.get(),
                reads: counters.reads.get(),
                writes: counters.writes.get(),
                prefetch_blocked: counters.prefetch_blocked.get(),
            },
        }
    }
}

fn print_state(cpu: &LockstepCpu) {
    for path in cpu.query_paths() {
        if let Some(value) = cpu.query(path) {
            println!("{path:<26} {value}");
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn run(args: &Args) -> Result<(), RunError> {
    let config = load_config(args)?;
    let presets = args
        .presets
        .iter()
        .map(|p| parse_preset(p))
        .collect::<Result<Vec<_>, _>>()?;

    let image = load_image(&args.image)?;
    let memory = build_memory(&image, args.memory_words as usize)?;
    let mut memory = LatencyMemory::new(memory, args.latency);

    let mut cpu = LockstepCpu::with_config(config)?;
    cpu.reset_to(args.entry);
    for (index, value) in presets {
        cpu.set_register(index, value);
    }

    let outcome = cpu.run(&mut memory, args.max_ticks);
    match outcome {
        RunOutcome::Halted(trap) => info!("halted after {} ticks: {trap}", cpu.cycles()),
        RunOutcome::BudgetExhausted => info!("tick budget of {} exhausted", args.max_ticks),
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&Report::new(&cpu, outcome))?);
    } else {
        print_state(&cpu);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("lockstep: {e}");
        process::exit(1);
    }
}
