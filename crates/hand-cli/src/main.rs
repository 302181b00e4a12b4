mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{gesture::GestureSubcommand, sequence::SequenceSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "handctl",
    about = "Robotic hand controller: serve the HTTP gateway and inspect the gesture document",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to gestures.json (default: search upward from the current directory)
    #[arg(long, global = true, env = "HAND_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway and drive the hand over the serial bus
    Serve {
        /// Address to bind
        #[arg(long, env = "HAND_BIND", default_value = "0.0.0.0")]
        bind: String,

        /// Port to listen on (0 = OS-assigned)
        #[arg(long, env = "HAND_PORT", default_value = "8000")]
        port: u16,

        /// Open the browser once listening
        #[arg(long)]
        open: bool,
    },

    /// List serial ports present on this host
    Ports,

    /// Inspect stored gestures
    Gesture {
        #[command(subcommand)]
        subcommand: GestureSubcommand,
    },

    /// Inspect stored sequences
    Sequence {
        #[command(subcommand)]
        subcommand: SequenceSubcommand,
    },

    /// Validate the gesture document
    Check,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let document = root::resolve_document(cli.config.as_deref());

    let result = match cli.command {
        Commands::Serve { bind, port, open } => cmd::serve::run(&document, &bind, port, open),
        Commands::Ports => cmd::ports::run(cli.json),
        Commands::Gesture { subcommand } => cmd::gesture::run(&document, subcommand, cli.json),
        Commands::Sequence { subcommand } => cmd::sequence::run(&document, subcommand, cli.json),
        Commands::Check => cmd::check::run(&document, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
