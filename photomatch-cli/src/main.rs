//! Photomatch CLI - perceptual image fingerprints and catalog search.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use photomatch_core::{HashAlgorithm, DEFAULT_CONCURRENCY, DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD};
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;

use exit_codes::{ExitCode, EXIT_CODES_HELP};

#[derive(Parser)]
#[command(name = "photomatch")]
#[command(author, version, about = "Search a product catalog by photo", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Print only errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colored output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the perceptual fingerprint of an image
    Hash {
        /// Path to the image
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Hash algorithm: phash, dhash or blockhash
        #[arg(short, long, default_value = "phash")]
        algorithm: HashAlgorithm,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Hamming distance between two images
    Compare {
        /// First image
        #[arg(value_name = "A")]
        first: PathBuf,

        /// Second image
        #[arg(value_name = "B")]
        second: PathBuf,

        /// Hash algorithm: phash, dhash or blockhash
        #[arg(short, long, default_value = "phash")]
        algorithm: HashAlgorithm,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Find catalog products that look like an image
    Search {
        /// Path to the query image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// JSON catalog: an array of {id, name?, thumbnail_url?}
        #[arg(short, long, value_name = "CATALOG")]
        catalog: PathBuf,

        /// Maximum Hamming distance for a match (0-64)
        #[arg(short, long, default_value_t = DEFAULT_THRESHOLD,
              value_parser = clap::value_parser!(u32).range(0..=64))]
        threshold: u32,

        /// Maximum number of matches to print
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,

        /// Simultaneous thumbnail fetches
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Per-thumbnail fetch timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        /// Hash algorithm: phash, dhash or blockhash
        #[arg(short, long, default_value = "phash")]
        algorithm: HashAlgorithm,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "photomatch=debug,photomatch_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    init_tracing(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    let result: Result<()> = match cli.command {
        Commands::Hash {
            file,
            algorithm,
            json,
        } => commands::hash::execute(file, algorithm, json, quiet),
        Commands::Compare {
            first,
            second,
            algorithm,
            json,
        } => commands::compare::execute(first, second, algorithm, json, quiet),
        Commands::Search {
            image,
            catalog,
            threshold,
            max_results,
            concurrency,
            timeout_secs,
            algorithm,
            json,
        } => {
            commands::search::execute(commands::search::SearchArgs {
                image,
                catalog,
                threshold,
                max_results,
                concurrency,
                timeout_secs,
                algorithm,
                json,
                quiet,
            })
            .await
        }
    };

    if let Err(err) = result {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = exit.message {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
        std::process::exit(exit.code);
    }
}
