use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod columns;
mod config;
mod generate;
mod http;
mod normalize;
mod pipeline;
mod prompt;
mod records;
mod sheets;
#[cfg(test)]
mod test_support;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());
    match args.command {
        Command::Fill(args) => workflow::run_fill(args),
        Command::Search(args) => workflow::run_search(args),
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or crate-level `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "sheet_enrich=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
