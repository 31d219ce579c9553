use anyhow::Result;
use clap::Parser;

mod cli;
mod walkthrough;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Args::parse();
    walkthrough::execute(args)
}
