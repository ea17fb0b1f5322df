//! AdoptedTexts CLI: harvests the Dutch adopted texts of the European Parliament.
//!
//! Follows the plenary table-of-contents chain from the first sitting, writes
//! the texts to a local JSON Lines file and publishes them as a Hugging Face
//! dataset when a token is configured.

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
