//! CLI argument parsing for the sheet enrichment jobs.
//!
//! The CLI only selects a job and its switches; everything else comes from the
//! JSON config file.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "sheet-enrich",
    version,
    about = "Fill company rows in a Google Sheet with LM-generated research and sales letters",
    after_help = "Commands:\n  fill --config <file>     Generate 検索結果 then セールスレター for each row\n  search --config <file>   Generate 検索結果 only\n\nExamples:\n  sheet-enrich fill --config config.json --web-search --limit 5\n  sheet-enrich search --config config.json --dry-run\n  sheet-enrich search --config config.json --query \"Acme Holdings 会社概要\"",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Fill(FillArgs),
    Search(SearchArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Fill(args) => args.job.verbose,
            Command::Search(args) => args.job.verbose,
        }
    }
}

/// Switches shared by both jobs.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Path to the JSON config file
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Process only the first N company rows
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Regenerate result cells even when they already have text
    #[arg(long)]
    pub overwrite: bool,

    /// Print the ranges that would be written without updating the sheet
    #[arg(long)]
    pub dry_run: bool,

    /// Use the OpenAI web-search tool for the research stage
    #[arg(long)]
    pub web_search: bool,

    /// Emit debug logs (prompts, timings) to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Two-stage job: research, then a sales letter built from it.
#[derive(Parser, Debug)]
#[command(about = "Generate search results and sales letters for each row")]
pub struct FillArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

/// Research-only job, or a one-off web-search query.
#[derive(Parser, Debug)]
#[command(about = "Generate search results for each row")]
pub struct SearchArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Run a single web-search query instead of processing the sheet
    #[arg(long, value_name = "TEXT", conflicts_with_all = ["limit", "overwrite", "dry_run"])]
    pub query: Option<String>,

    /// Print the raw API payload for --query
    #[arg(long, requires = "query")]
    pub debug_payload: bool,
}
