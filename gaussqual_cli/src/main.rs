//! gaussqual CLI: Gaussian mixture image quality assessment for single images
//! and image sequences.

mod args;
mod run;
mod run_config;

use anyhow::Result;
use clap::Parser;

use crate::args::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::log_setup::setup_logging(&cli.log_level, cli.log_dir.as_deref());

    let written = match &cli.command {
        Command::Single(args) => run::run_single(args),
        Command::Stack(args) => run::run_stack(args),
    }
    .inspect_err(|err| tracing::error!("{err:#}"))?;

    for path in written {
        println!("Saved {}", path.display());
    }
    Ok(())
}
