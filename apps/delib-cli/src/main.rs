//! delib CLI binary entry point.
//!
//! Initializes the tracing subscriber, parses command-line arguments with
//! clap, and dispatches to the selected subcommand via [`Cli::run`].

mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with an optional file layer for export runs.
    let _guard = logging::init_tracing(cli.log_dir().as_deref())?;

    cli.run().await
}
