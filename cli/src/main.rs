mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{fragmentation, hierarchy, rankings, regions, sample, summary};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise the level follows the `-v` count.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("openparcel={level},openparcel_cli={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Hierarchy(args) => hierarchy::run(&cli, args),
        Commands::Summary(args) => summary::run(&cli, args),
        Commands::Rankings(args) => rankings::run(&cli, args),
        Commands::Regions(args) => regions::run(&cli, args),
        Commands::Fragmentation(args) => fragmentation::run(&cli, args),
        Commands::Sample(args) => sample::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
