//! CLI commands for nvdb2osm

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::driver::{run_partition, PartitionConfig};
use crate::input;
use crate::model::SimplifyMethod;
use crate::pipeline::{run_conversion, ConvertOptions};

#[derive(Parser)]
#[command(name = "nvdb2osm")]
#[command(about = "Convert Swedish NVDB road networks to OSM PBF", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one ordered segment stream into a single PBF file
    Convert {
        /// Input NDJSON segments (hex WKB + properties per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output .osm.pbf file
        #[arg(short, long)]
        output: PathBuf,

        /// Way join policy (refname, connected, route)
        #[arg(short, long, default_value = "refname")]
        method: String,

        /// First node id to allocate
        #[arg(long, default_value = "1")]
        node_id_start: i64,

        /// First way id to allocate
        #[arg(long, default_value = "1")]
        way_id_start: i64,
    },

    /// Partition by municipality and convert the chunks in parallel
    Partition {
        /// Input NDJSON segments (hex WKB + properties per line)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for chunk files and the run summary
        #[arg(short, long)]
        outdir: PathBuf,

        /// Way join policy (refname, connected, route)
        #[arg(short, long, default_value = "refname")]
        method: String,

        /// Base of the id space; chunk i gets base + i * 10^7
        #[arg(long, default_value = "1")]
        id_base: i64,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Convert {
                input,
                output,
                method,
                node_id_start,
                way_id_start,
            } => {
                let method = SimplifyMethod::from_str(&method).map_err(|e| anyhow!("{e}"))?;
                if node_id_start < 1 || way_id_start < 1 {
                    bail!("Id starts must be >= 1");
                }

                println!("🦋 Converting {}", input.display());

                let mut input_errors = 0u64;
                let reader = input::read_segments(&input)?;
                let records = reader.filter_map(|result| match result {
                    Ok(record) => Some(record),
                    Err(err) => {
                        if input_errors == 0 {
                            eprintln!("Warning: skipping malformed input ({err:#})");
                        }
                        input_errors += 1;
                        None
                    }
                });

                let options = ConvertOptions {
                    method,
                    node_id_start,
                    way_id_start,
                };
                let summary = run_conversion(records, &output, &options)?;

                println!(
                    "  ✓ {} segments read, {} dropped",
                    summary.segments_read, summary.segments_dropped
                );
                if input_errors > 0 {
                    println!("  ⚠ {input_errors} malformed input line(s) skipped");
                }
                println!(
                    "  ✓ {} nodes, {} ways",
                    summary.nodes_written, summary.ways_written
                );
                println!("✅ Wrote {}", output.display());

                Ok(())
            }
            Commands::Partition {
                input,
                outdir,
                method,
                id_base,
            } => {
                let method = SimplifyMethod::from_str(&method).map_err(|e| anyhow!("{e}"))?;
                if id_base < 1 {
                    bail!("Id base must be >= 1");
                }

                let config = PartitionConfig {
                    input,
                    outdir,
                    method,
                    id_base,
                };
                run_partition(config)?;
                Ok(())
            }
        }
    }
}
