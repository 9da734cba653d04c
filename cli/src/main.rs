mod interactive;

use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

use anyhow::Result;
use cache_sim::sim::Simulator;
use clap::Parser;

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File path to a command script (reads commands from stdin when omitted)
    #[arg(short, long)]
    script: Option<PathBuf>,
    /// Write the final cache contents as JSON
    #[arg(long = "dump-json")]
    dump_json: Option<PathBuf>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
    let mut sim = Simulator::new();
    match args.script {
        Some(path) => {
            let file = File::open(path)?;
            interactive::execute_commands(&mut sim, BufReader::new(file), false)?;
        }
        None => {
            let stdin = io::stdin();
            interactive::execute_commands(&mut sim, stdin.lock(), true)?;
        }
    }
    log::info!("finished simulation.");
    output_stat(&sim);
    if let Some(path) = args.dump_json {
        let out = File::create(path)?;
        serde_json::to_writer_pretty(out, &sim.dump())?;
    }
    Ok(())
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Simulator) {}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

#[cfg(feature = "stat")]
fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0 - 20)
}
