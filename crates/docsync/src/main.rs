//! docsync CLI - publish documentation trees to Confluence.
//!
//! Provides commands for:
//! - `publish`: Mirror the navigation tree and update every page
//! - `sync`: Mirror the navigation tree only
//! - `render`: Convert one page to storage markup offline

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PublishArgs, RenderArgs, SyncArgs};
use output::Output;

/// docsync - Markdown to Confluence publisher.
#[derive(Parser)]
#[command(name = "docsync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the page hierarchy and update page content.
    Publish(PublishArgs),
    /// Synchronize the page hierarchy without touching content.
    Sync(SyncArgs),
    /// Render one Markdown file to storage markup on stdout.
    Render(RenderArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Publish(args) => args.common.verbose,
            Self::Sync(args) => args.common.verbose,
            Self::Render(args) => args.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Publish(args) => args.execute(),
        Commands::Sync(args) => args.execute(),
        Commands::Render(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
