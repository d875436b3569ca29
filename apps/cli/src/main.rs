//! Confex CLI — storage-format document extraction tool.
//!
//! Reads a wiki storage-format document from a file and prints its
//! normalized extraction (plain text, table records, links, attachments)
//! as JSON or combined text.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
