//! TLB simulator CLI.
//!
//! This binary replays operation traces against the translation layer. It performs:
//! 1. **Trace run:** Spawn one thread per traced process, all sharing one TLB, and print each outcome.
//! 2. **Config dump:** Print the configuration as resolved from defaults and an optional JSON file.

mod trace;

use clap::{Parser, Subcommand};
use std::{fs, process, thread};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tlbsim_core::{Config, Machine};

use crate::trace::Trace;

#[derive(Parser, Debug)]
#[command(
    name = "tlbsim",
    author,
    version,
    about = "TLB and translation-layer simulator",
    long_about = "Replay a JSON trace of alloc/free/read/write operations from several processes against a shared TLB.\n\nExamples:\n  tlbsim run traces/basic.json\n  tlbsim run traces/basic.json --config tlb64.json -v\n  RUST_LOG=tlb=trace tlbsim run traces/basic.json"
)]
struct Cli {
    /// Configuration file (JSON); built-in defaults otherwise.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log TLB hits and misses.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a trace file.
    Run {
        /// Trace path.
        trace: String,
    },

    /// Print the resolved configuration.
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    match cli.command {
        Commands::Run { trace } => cmd_run(config, &trace),
        Commands::Config => println!("{config:#?}"),
    }
}

/// Installs the `tracing` subscriber; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads and validates the configuration, exiting with code 1 on failure.
fn load_config(path: Option<&str>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config {path}: {e}");
        process::exit(1);
    });
    Config::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Error loading {path}: {e}");
        process::exit(1);
    })
}

/// Replays `trace_path`: one thread per process, all sharing the machine's TLB.
///
/// Operation failures are printed and the trace continues. Exits with code 1 if
/// the trace cannot be read or a process cannot be created.
fn cmd_run(config: Config, trace_path: &str) {
    let text = fs::read_to_string(trace_path).unwrap_or_else(|e| {
        eprintln!("Error reading trace {trace_path}: {e}");
        process::exit(1);
    });
    let trace = Trace::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Invalid trace {trace_path}: {e}");
        process::exit(1);
    });
    let machine = Machine::new(config).unwrap_or_else(|e| {
        eprintln!("Error building machine: {e}");
        process::exit(1);
    });

    let mut procs = Vec::with_capacity(trace.processes.len());
    for p in &trace.processes {
        match machine.spawn(p.pid) {
            Ok(proc) => procs.push((proc, p.ops.clone())),
            Err(e) => {
                eprintln!("Error spawning pid {}: {e}", p.pid);
                process::exit(1);
            }
        }
    }
    info!(processes = procs.len(), "replaying {trace_path}");

    let logs: Vec<Vec<String>> = thread::scope(|s| {
        let handles: Vec<_> = procs
            .iter_mut()
            .map(|(proc, ops)| {
                let mmu = machine.mmu().clone();
                s.spawn(move || {
                    let lines = ops
                        .iter()
                        .map(|&op| trace::apply(&mmu, proc, op))
                        .collect::<Vec<_>>();
                    let _ = mmu.release(proc);
                    lines
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    eprintln!("Process thread panicked");
                    process::exit(1);
                })
            })
            .collect()
    });

    for line in logs.iter().flatten() {
        println!("{line}");
    }
    println!();
    println!("{}", machine.mmu().stats());
}
