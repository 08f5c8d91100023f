//! nvdb2osm: convert Swedish NVDB road-network extracts to OSM PBF
//!
//! Pipeline:
//! - Tag mapping: per-segment NVDB attributes → OSM tag set (pure, stateless)
//! - Node interning: quantize coordinates to the 1e-7° grid, dedupe into dense ids
//! - Way building: merge runs of joinable segments into ways (refname/connected/route)
//! - PBF encoding: string tables, dense nodes, ways → zlib fileblocks
//!
//! The driver partitions input by municipality, runs one independent
//! pipeline per chunk inside an exclusive 10^7-wide id band, and leaves
//! chunk unification to standard OSM tooling.
//!
//! Key principle: output is a deterministic function of input order, the
//! join policy, and the id starts. Two identical runs produce
//! byte-identical files.

pub mod cli;
pub mod driver;
pub mod input;
pub mod interner;
pub mod model;
pub mod pbf;
pub mod pipeline;
pub mod simplify;
pub mod tags;
pub mod wkb;

pub use model::{PropertyValue, SegmentRecord, SimplifyMethod};
pub use pipeline::{run_conversion, ConversionSummary, ConvertOptions};
