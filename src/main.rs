use anyhow::Result;
use clap::Parser;

use nvdb2osm::cli::Cli;

fn main() -> Result<()> {
    Cli::parse().run()
}
