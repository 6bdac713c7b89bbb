use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tiger_cli::{CommandContext, OutputFormat, StoreArgs, commands};

#[derive(Parser)]
#[command(
    name = "tiger",
    about = "Inspect Tiger engine package sets",
    version,
    long_about = "A command-line tool for decoding tag hashes, looking up package entries and resolving entity graphs from a directory of Tiger packages."
)]
struct Cli {
    /// Set the logging level (overridden by RUST_LOG)
    #[arg(short, long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a hash from its text form
    Hash {
        /// Hexadecimal hash, or a name with --string
        text: String,

        /// Treat the text as big-endian regardless of its suffix
        #[arg(short, long)]
        big_endian: bool,

        /// Hash the text as a string name instead of decoding it
        #[arg(short, long, conflicts_with = "big_endian")]
        string: bool,
    },

    /// Show package entry metadata for a hash
    Meta {
        /// Package hash or 16-digit global hash
        text: String,

        /// Treat the text as big-endian regardless of its suffix
        #[arg(short, long)]
        big_endian: bool,
    },

    /// Resolve an entity and print its resource graph
    Entity {
        /// Package hash or 16-digit global hash
        text: String,

        /// Treat the text as big-endian regardless of its suffix
        #[arg(short, long)]
        big_endian: bool,
    },

    /// Summarize the package set
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext {
        format: cli.format,
        no_color: cli.no_color,
    };

    match &cli.command {
        Commands::Hash {
            text,
            big_endian,
            string,
        } => commands::hash::handle(text, *big_endian, *string, &ctx)?,
        Commands::Meta { text, big_endian } => {
            commands::meta::handle(text, *big_endian, &cli.store, &ctx).await?;
        }
        Commands::Entity { text, big_endian } => {
            commands::entity::handle(text, *big_endian, &cli.store, &ctx).await?;
        }
        Commands::Stats => commands::stats::handle(&cli.store, &ctx).await?,
    }

    Ok(())
}
