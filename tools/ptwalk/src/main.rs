use anyhow::Result;
use clap::Parser;

mod app;
mod cli;

fn main() -> Result<()> {
    let cli = crate::cli::Cli::parse();
    crate::app::init_logging(cli.verbose);
    crate::app::run(cli)
}
