//! Lookalike CLI - reverse image search over a product catalog snapshot.

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use commands::fingerprint::FingerprintArgs;
use commands::search::SearchArgs;
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Invalid arguments
  65  Invalid data (undecodable image, malformed catalog)
  66  Input file not found
  69  Catalog or image source unavailable
  74  Cannot write output file";

#[derive(Parser)]
#[command(name = "lookalike")]
#[command(author, version, about = "Reverse image search for product catalogs", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print results, no decorative output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and store fingerprints for catalog images
    Fingerprint(FingerprintArgs),

    /// Find catalog items that look like an image
    Search(SearchArgs),

    /// Print the fingerprint of an image
    Hash {
        /// Path to the image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Print every orientation variant
        #[arg(long)]
        all_variants: bool,

        /// Print a color histogram summary
        #[arg(long)]
        histogram: bool,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two images
    Compare {
        #[arg(value_name = "IMAGE_A")]
        image_a: PathBuf,

        #[arg(value_name = "IMAGE_B")]
        image_b: PathBuf,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show fingerprint coverage of a catalog
    Stats {
        /// Path to the catalog snapshot (JSON or CBOR)
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// Print the stats as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("lookalike_core=debug,lookalike=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("lookalike_core=info,lookalike=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Fingerprint(args) => commands::fingerprint::execute(args, quiet).await,
        Commands::Search(args) => commands::search::execute(args, quiet).await,
        Commands::Hash {
            image,
            all_variants,
            histogram,
            json,
        } => commands::hash::execute(image, all_variants, histogram, json),
        Commands::Compare {
            image_a,
            image_b,
            json,
        } => commands::compare::execute(image_a, image_b, json, quiet),
        Commands::Stats { catalog, json } => commands::stats::execute(catalog, json, quiet).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(exit_codes::USAGE_ERROR);
            }
        },
    };

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = &exit.message {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
        std::process::exit(exit.code);
    }
}
