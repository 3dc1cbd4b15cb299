//! WikiTrigger CLI: evaluate wiki feed triggers from the command line.
//!
//! Polls a trigger once and prints the platform JSON response, so a
//! scheduler or a shell loop can thread the cursor between runs.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
