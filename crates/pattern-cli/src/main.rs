//! Command-line front end for garment mesh flattening.

mod commands;
mod svg;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Parser)]
#[command(
    name = "patternfold",
    about = "Unfold seam-marked garment meshes into 2D pattern pieces",
    version
)]
struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a mesh: conditioning and seam statistics.
    Info(commands::info::InfoArgs),

    /// Flatten a mesh into packed pattern pieces.
    Flatten(commands::flatten::FlattenArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info(args) => commands::info::run(&args, cli.format, cli.quiet),
        Commands::Flatten(args) => commands::flatten::run(&args, cli.format, cli.quiet),
    }
}
