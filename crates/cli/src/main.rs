//! `cardreader` command-line tool

use clap::{Parser, Subcommand};
use tracing::info;

mod commands;
mod utils;

use commands::{list_command, read_command, watch_command};
use utils::DecoderArgs;

#[derive(Parser)]
#[command(version, about = "Read ID and health cards from smart-card readers")]
struct Cli {
    /// Reader name, or part of it (uses the first reader if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Wait for a card, read it once and exit
    Read {
        /// Seconds to wait for a card
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        decoders: DecoderArgs,
    },

    /// Read every card presented until the reader goes away
    Watch {
        #[command(flatten)]
        decoders: DecoderArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::List => list_command()?,
        Commands::Read { timeout, decoders } => {
            let reader = utils::resolve_reader(cli.reader)?;
            info!("Using reader: {}", reader);
            read_command(&reader, &decoders, std::time::Duration::from_secs(timeout))?;
        }
        Commands::Watch { decoders } => {
            let reader = utils::resolve_reader(cli.reader)?;
            info!("Using reader: {}", reader);
            watch_command(&reader, &decoders)?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
