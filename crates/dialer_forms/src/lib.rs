//! Dialer settings forms on top of `schema_form`: the bundled schemas, the
//! layered configuration with the admin-only paths, backend validation rules
//! and the `dialer-forms` command line.

pub mod catalog;
pub mod cli;
pub mod config;
mod errors;
mod logging;
pub mod validation;

use clap::Parser;
use color_eyre::Result;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
pub async fn run() -> Result<()> {
    crate::errors::init()?;
    let cli = Cli::parse();
    crate::logging::init(cli.verbose)?;

    crate::cli::execute(cli).await
}
