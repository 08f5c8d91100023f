//! Core conversion pipeline
//!
//! One forward pass over the ordered segment stream: derive tags, intern
//! nodes, grow ways, and encode the PBF. Only the node table and the
//! open-way index are materialized; finalized ways stream into the
//! encoder's spill file as they close.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::interner::NodeInterner;
use crate::model::{tag_fingerprint, SegmentRecord, SimplifyMethod, Way, WayKey};
use crate::pbf::{Bbox, PbfWriter, WaySpill};
use crate::simplify::WayBuilder;
use crate::tags;
use crate::wkb;

/// Parameters of one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub method: SimplifyMethod,
    /// First node id to allocate (≥ 1).
    pub node_id_start: i64,
    /// First way id to allocate (≥ 1).
    pub way_id_start: i64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            method: SimplifyMethod::default(),
            node_id_start: 1,
            way_id_start: 1,
        }
    }
}

/// Counts reported by a conversion run. Warnings are aggregated; the
/// first malformed record is described once, not per record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionSummary {
    pub segments_read: u64,
    pub segments_dropped: u64,
    pub nodes_written: u64,
    pub ways_written: u64,
    pub wkb_errors: u64,
}

/// Convert an ordered segment stream into one `.osm.pbf` file.
///
/// The stream must be sorted by `(ROUTE_ID, FROM_MEASURE)`; way joining
/// depends on that order. Output is a deterministic function of the
/// input order, the method, and the id starts.
pub fn run_conversion<I>(
    segments: I,
    output_path: &Path,
    options: &ConvertOptions,
) -> Result<ConversionSummary>
where
    I: IntoIterator<Item = SegmentRecord>,
{
    let mut summary = ConversionSummary::default();
    let mut interner = NodeInterner::new(options.node_id_start);
    let mut builder = WayBuilder::new(options.method);
    let mut spill = WaySpill::new()?;
    let mut next_way_id = options.way_id_start;
    let mut first_wkb_error: Option<String> = None;

    for (index, record) in segments.into_iter().enumerate() {
        summary.segments_read += 1;

        let line = match wkb::parse_linestring(&record.wkb) {
            Ok(line) => line,
            Err(err) => {
                summary.wkb_errors += 1;
                summary.segments_dropped += 1;
                first_wkb_error.get_or_insert_with(|| format!("record {index}: {err}"));
                continue;
            }
        };

        let mapped = tags::derive_tags(&record.properties);
        if mapped.drop {
            summary.segments_dropped += 1;
            continue;
        }

        let mut tag_pairs: Vec<(String, String)> = mapped.tags.into_iter().collect();
        tag_pairs.sort();
        let way_key = way_key_for(&tag_pairs, &record);

        let node_ids: Vec<i64> = line
            .0
            .iter()
            .map(|coord| interner.intern(coord.x, coord.y))
            .collect();

        let result = builder.push(node_ids, tag_pairs, &way_key);
        if result.skipped {
            summary.segments_dropped += 1;
        }
        for way in result.closed {
            emit_way(&mut spill, &interner, &mut next_way_id, way)?;
        }
    }

    for way in builder.finish() {
        emit_way(&mut spill, &interner, &mut next_way_id, way)?;
    }

    summary.nodes_written = interner.len() as u64;
    summary.ways_written = spill.count();

    let mut writer = PbfWriter::create(output_path)?;
    writer.write_header(Bbox::from_quantized(interner.coords()).as_ref())?;
    writer.write_dense_nodes(interner.coords(), interner.id_start())?;
    writer.append_way_blocks(spill)?;
    writer
        .finish()
        .with_context(|| format!("Failed to finish {}", output_path.display()))?;

    if summary.wkb_errors > 0 {
        eprintln!(
            "Warning: {} segment(s) dropped for malformed WKB (first: {})",
            summary.wkb_errors,
            first_wkb_error.as_deref().unwrap_or("unknown")
        );
    }

    Ok(summary)
}

fn way_key_for(tags: &[(String, String)], record: &SegmentRecord) -> WayKey {
    let tag = |key: &str| {
        tags.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };
    WayKey {
        highway: tag("highway"),
        ref_: tag("ref"),
        name: tag("name"),
        route_id: record
            .properties
            .get("ROUTE_ID")
            .map(|v| v.as_text())
            .unwrap_or_default(),
        fingerprint: tag_fingerprint(tags, false),
        full_fingerprint: tag_fingerprint(tags, true),
    }
}

fn emit_way(
    spill: &mut WaySpill,
    interner: &NodeInterner,
    next_way_id: &mut i64,
    way: Way,
) -> Result<()> {
    // A ref outside the interner's band is a bug, not bad data.
    for &node in &way.refs {
        assert!(
            node >= interner.id_start() && node < interner.id_end(),
            "way {} references unknown node {node}",
            *next_way_id
        );
    }
    spill.push(*next_way_id, way)?;
    *next_way_id += 1;
    Ok(())
}
