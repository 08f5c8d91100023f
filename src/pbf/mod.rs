//! OSM PBF container encoding
//!
//! `proto` carries the protobuf wire primitives, `writer` assembles them
//! into the fileblock framing, header block and primitive blocks of the
//! `.osm.pbf` format.

pub mod proto;
pub mod writer;

pub use writer::{Bbox, PbfWriter, WaySpill};
