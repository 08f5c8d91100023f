//! Partitioning driver
//!
//! Slices the input by municipality code, converts the chunks in parallel
//! with one independent pipeline each, and gives every chunk an exclusive
//! 10^7-wide band of the node and way id spaces. Chunk outputs are left
//! as separate files; unifying them is the job of standard OSM sort-merge
//! tooling, which the id discipline here makes collision-free.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::PathBuf;

use nvdb_common::Error;

use crate::input;
use crate::model::{SegmentRecord, SimplifyMethod};
use crate::pipeline::{run_conversion, ConversionSummary, ConvertOptions};

/// Width of the id band allotted to each chunk, nodes and ways alike.
pub const ID_BAND: i64 = 10_000_000;

pub struct PartitionConfig {
    pub input: PathBuf,
    pub outdir: PathBuf,
    pub method: SimplifyMethod,
    /// Base of the id space; chunk i starts at `id_base + i * ID_BAND`.
    pub id_base: i64,
}

#[derive(Debug, Serialize)]
pub struct ChunkSummary {
    pub admin_code: String,
    pub output: String,
    pub node_id_start: i64,
    pub way_id_start: i64,
    #[serde(flatten)]
    pub counts: ConversionSummary,
}

#[derive(Debug, Serialize)]
pub struct PartitionSummary {
    pub method: &'static str,
    pub input_errors: u64,
    pub chunks: Vec<ChunkSummary>,
}

pub struct PartitionResult {
    pub summary_path: PathBuf,
    pub chunk_count: usize,
}

/// Run the partitioned conversion.
pub fn run_partition(config: PartitionConfig) -> Result<PartitionResult> {
    println!("🦋 Starting partitioned conversion");
    println!("📂 Input: {}", config.input.display());
    println!("📂 Output: {}", config.outdir.display());
    println!();

    std::fs::create_dir_all(&config.outdir).context("Failed to create output directory")?;

    println!("Reading segments...");
    let (groups, input_errors) = read_groups(&config)?;
    let total: usize = groups.iter().map(|(_, records)| records.len()).sum();
    println!("  ✓ {} segments in {} chunks", total, groups.len());

    let stem = config
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "segments".to_string());

    println!("Converting chunks...");
    let pb = ProgressBar::new(groups.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} chunks")
            .expect("Failed to create progress style")
            .progress_chars("#>-"),
    );

    let chunks: Result<Vec<ChunkSummary>> = groups
        .into_par_iter()
        .enumerate()
        .map(|(i, (code, records))| {
            let node_id_start = config.id_base + (i as i64) * ID_BAND;
            let way_id_start = config.id_base + (i as i64) * ID_BAND;
            let output = config.outdir.join(format!("{stem}-{code}.osm.pbf"));

            let options = ConvertOptions {
                method: config.method,
                node_id_start,
                way_id_start,
            };
            let counts = run_conversion(records, &output, &options)?;

            if counts.nodes_written as i64 > ID_BAND || counts.ways_written as i64 > ID_BAND {
                return Err(Error::IdBandOverflow(format!(
                    "chunk {code}: {} nodes / {} ways exceed the {ID_BAND}-id slot",
                    counts.nodes_written, counts.ways_written
                ))
                .into());
            }

            pb.inc(1);
            Ok(ChunkSummary {
                admin_code: code,
                output: output.display().to_string(),
                node_id_start,
                way_id_start,
                counts,
            })
        })
        .collect();
    pb.finish_and_clear();
    let chunks = chunks?;

    for chunk in &chunks {
        println!(
            "  ✓ chunk {}: {} nodes, {} ways → {}",
            chunk.admin_code, chunk.counts.nodes_written, chunk.counts.ways_written, chunk.output
        );
    }

    let summary = PartitionSummary {
        method: config.method.name(),
        input_errors,
        chunks,
    };
    let summary_path = config.outdir.join("partition-summary.json");
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    println!();
    println!("✅ Partitioned conversion complete!");
    println!("📋 Summary: {}", summary_path.display());

    Ok(PartitionResult {
        summary_path,
        chunk_count: summary.chunks.len(),
    })
}

/// Group records by municipality code, preserving input order inside each
/// group. Band assignment is by sorted code so reruns are stable.
fn read_groups(config: &PartitionConfig) -> Result<(Vec<(String, Vec<SegmentRecord>)>, u64)> {
    let mut input_errors = 0u64;
    let mut groups: Vec<(String, Vec<SegmentRecord>)> = Vec::new();
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();

    for result in input::read_segments(&config.input)? {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                if input_errors == 0 {
                    eprintln!("Warning: skipping malformed input ({err:#})");
                }
                input_errors += 1;
                continue;
            }
        };

        let code = record
            .properties
            .get("Kommu_141")
            .map(|v| v.as_text())
            .unwrap_or_default();
        let code = if code.trim().is_empty() {
            "0".to_string()
        } else {
            code.trim().to_string()
        };

        let slot = *slots.entry(code.clone()).or_insert_with(|| {
            groups.push((code, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));
    Ok((groups, input_errors))
}
