// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

mod check;
mod config;
mod edid;
mod error;
mod formats;
mod modes;
mod parse;
mod utils;

use clap::{Parser, Subcommand};
use error::result_to_exit_code;
use std::process::ExitCode;

/// DPI DAC CLI - Display mode catalogs and EDID synthesis for DPI-to-VGA bridges
#[derive(Parser)]
#[command(name = "dpidac")]
#[command(version)]
#[command(about = "DPI DAC CLI - Display mode catalogs and EDID synthesis for DPI-to-VGA bridges")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (use RUST_LOG=debug for more)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and list the mode catalog
    Modes(modes::Args),

    /// Synthesize the EDID the bridge would publish
    Edid(edid::Args),

    /// Validate a timings document line by line
    Check(check::Args),

    /// Show how a mode descriptor resolves
    Parse(parse::Args),

    /// List supported pixel bus formats
    Formats(formats::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Modes(args) => modes::execute(args, cli.json),
        Commands::Edid(args) => edid::execute(args, cli.json),
        Commands::Check(args) => check::execute(args, cli.json),
        Commands::Parse(args) => parse::execute(args, cli.json),
        Commands::Formats(args) => formats::execute(args, cli.json),
    };

    result_to_exit_code(result)
}

/// Initialize env_logger based on verbosity flags
fn init_logging(verbose: bool, quiet: bool) {
    let env = env_logger::Env::default();

    let env = if quiet {
        env.default_filter_or("error")
    } else if verbose {
        env.default_filter_or("debug")
    } else {
        env.default_filter_or("info")
    };

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("Logging initialized");
}
