//! LinkScout CLI — backlink opportunity discovery.
//!
//! Finds candidate community pages for a set of keywords, profiles each
//! page, and asks a local language model whether it is worth a backlink.

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
