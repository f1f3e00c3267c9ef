mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "progress",
    about = "View and edit markdown progress documents with conflict-safe writes",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "PROGRESS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the web UI on a loopback port
    Serve {
        /// Port to listen on (default: first free port in the configured range; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,

        /// Don't open browser automatically
        #[arg(long)]
        no_open: bool,
    },

    /// List progress documents
    Files,

    /// Show the checkbox lines of a document
    Show {
        /// Document path relative to the project root
        path: String,
    },

    /// Set the status of one checkbox line
    Set {
        /// Document path relative to the project root
        path: String,
        /// Zero-based line index
        line: usize,
        /// Marker (" ", "/", "x", "-", "!", "?"), key 1-6, or "next"
        value: String,
    },
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

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Serve { port, no_open } => cmd::serve::run(&root, port, no_open),
        Commands::Files => cmd::files::run(&root, cli.json),
        Commands::Show { path } => cmd::show::run(&root, &path, cli.json),
        Commands::Set { path, line, value } => cmd::set::run(&root, &path, line, &value, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
