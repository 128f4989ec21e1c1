//! Tejer CLI — declarative resource-graph synthesis.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "tejer",
    version,
    about = "Declarative resource-graph synthesis — deterministic plans, deferred values, provenance tracing"
)]
struct Cli {
    #[command(subcommand)]
    command: tejer::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = tejer::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
