//! OSM PBF file writer
//!
//! Format: a sequence of fileblocks, each framed as
//!
//! ```text
//! len:        4 bytes, big-endian size of the BlobHeader
//! BlobHeader: protobuf { type: string, datasize: int32 }
//! Blob:       protobuf { raw | raw_size + zlib_data }
//! ```
//!
//! The first fileblock is an `OSMHeader` declaring the schema features,
//! the rest are `OSMData` PrimitiveBlocks: granularity 100 (1e-7
//! degrees), a per-block string table with index 0 reserved for the empty
//! string, and either one dense-node group or one way group of at most
//! 8000 elements. Ids, coordinates and way refs are delta- plus zig-zag
//! encoded.
//!
//! All node blocks must precede all way blocks; way blocks are therefore
//! spilled to a temp file as ways finalize and copied over once the node
//! table is complete.

use anyhow::{Context, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::proto;
use crate::model::Way;

/// Elements per PrimitiveBlock.
const BLOCK_ELEMENTS: usize = 8000;

/// Payloads under this size are stored raw; zlib overhead beats the
/// savings on tiny blocks.
const RAW_LIMIT: usize = 128;

/// PrimitiveBlock granularity in nanodegrees.
const GRANULARITY: u64 = 100;

const ZLIB_LEVEL: u32 = 6;

/// Bounding box in nanodegrees for the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bbox {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl Bbox {
    /// Bbox of quantized (1e-7 degree) coordinates; `None` when there are
    /// no nodes.
    pub fn from_quantized(coords: &[(i32, i32)]) -> Option<Self> {
        let mut iter = coords.iter();
        let &(lon0, lat0) = iter.next()?;
        let (mut min_lon, mut max_lon) = (lon0, lon0);
        let (mut min_lat, mut max_lat) = (lat0, lat0);
        for &(lon, lat) in iter {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }
        Some(Bbox {
            left: i64::from(min_lon) * 100,
            right: i64::from(max_lon) * 100,
            top: i64::from(max_lat) * 100,
            bottom: i64::from(min_lat) * 100,
        })
    }
}

/// Per-block string table. Index 0 is reserved for the empty string.
struct StringTable {
    ids: FxHashMap<String, u32>,
    entries: Vec<String>,
}

impl StringTable {
    fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            entries: vec![String::new()],
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.ids.insert(s.to_string(), id);
        self.entries.push(s.to_string());
        id
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in &self.entries {
            proto::write_bytes_field(&mut buf, 1, entry.as_bytes());
        }
        buf
    }
}

/// Encode one dense-node PrimitiveBlock. Ids run from `first_id`,
/// coordinates are already in granularity units.
fn encode_dense_block(coords: &[(i32, i32)], first_id: i64) -> Vec<u8> {
    let mut ids = Vec::with_capacity(coords.len());
    let mut lats = Vec::with_capacity(coords.len());
    let mut lons = Vec::with_capacity(coords.len());

    let (mut prev_id, mut prev_lat, mut prev_lon) = (0i64, 0i64, 0i64);
    for (i, &(lon, lat)) in coords.iter().enumerate() {
        let id = first_id + i as i64;
        let lat = i64::from(lat);
        let lon = i64::from(lon);
        ids.push(id - prev_id);
        lats.push(lat - prev_lat);
        lons.push(lon - prev_lon);
        prev_id = id;
        prev_lat = lat;
        prev_lon = lon;
    }

    let mut dense = Vec::new();
    proto::write_packed_sint64(&mut dense, 1, &ids);
    proto::write_packed_sint64(&mut dense, 8, &lats);
    proto::write_packed_sint64(&mut dense, 9, &lons);

    let mut group = Vec::new();
    proto::write_bytes_field(&mut group, 2, &dense);

    let table = StringTable::new();
    encode_primitive_block(&table, &group)
}

/// Encode one way PrimitiveBlock. Ids must be strictly increasing.
fn encode_ways_block(ways: &[(i64, Way)]) -> Vec<u8> {
    let mut table = StringTable::new();
    let mut group = Vec::new();

    let mut prev_id = i64::MIN;
    for (id, way) in ways {
        assert!(*id > prev_id, "way ids must be strictly increasing");
        prev_id = *id;

        let keys: Vec<u32> = way.tags.iter().map(|(k, _)| table.intern(k)).collect();
        let vals: Vec<u32> = way.tags.iter().map(|(_, v)| table.intern(v)).collect();

        let mut refs = Vec::with_capacity(way.refs.len());
        let mut prev_ref = 0i64;
        for &node in &way.refs {
            refs.push(node - prev_ref);
            prev_ref = node;
        }

        let mut message = Vec::new();
        proto::write_uint_field(&mut message, 1, *id as u64);
        proto::write_packed_uint32(&mut message, 2, &keys);
        proto::write_packed_uint32(&mut message, 3, &vals);
        proto::write_packed_sint64(&mut message, 8, &refs);

        proto::write_bytes_field(&mut group, 3, &message);
    }

    encode_primitive_block(&table, &group)
}

fn encode_primitive_block(table: &StringTable, group: &[u8]) -> Vec<u8> {
    let mut block = Vec::new();
    proto::write_bytes_field(&mut block, 1, &table.encode());
    proto::write_bytes_field(&mut block, 2, group);
    proto::write_uint_field(&mut block, 17, GRANULARITY);
    block
}

/// Frame a payload as a fileblock: length-prefixed BlobHeader, then the
/// Blob (zlib-deflated unless tiny).
fn write_fileblock<W: Write>(out: &mut W, block_type: &str, payload: &[u8]) -> Result<()> {
    let mut blob = Vec::new();
    if payload.len() < RAW_LIMIT {
        proto::write_bytes_field(&mut blob, 1, payload);
    } else {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(ZLIB_LEVEL));
        encoder.write_all(payload)?;
        let compressed = encoder.finish()?;
        proto::write_uint_field(&mut blob, 2, payload.len() as u64);
        proto::write_bytes_field(&mut blob, 3, &compressed);
    }

    let mut header = Vec::new();
    proto::write_string_field(&mut header, 1, block_type);
    proto::write_uint_field(&mut header, 3, blob.len() as u64);

    out.write_all(&(header.len() as u32).to_be_bytes())?;
    out.write_all(&header)?;
    out.write_all(&blob)?;
    Ok(())
}

/// Writer for one `.osm.pbf` output file.
pub struct PbfWriter<W: Write> {
    out: W,
}

impl PbfWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> PbfWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write the leading OSMHeader fileblock.
    pub fn write_header(&mut self, bbox: Option<&Bbox>) -> Result<()> {
        let mut block = Vec::new();
        if let Some(bbox) = bbox {
            let mut b = Vec::new();
            proto::write_sint_field(&mut b, 1, bbox.left);
            proto::write_sint_field(&mut b, 2, bbox.right);
            proto::write_sint_field(&mut b, 3, bbox.top);
            proto::write_sint_field(&mut b, 4, bbox.bottom);
            proto::write_bytes_field(&mut block, 1, &b);
        }
        proto::write_string_field(&mut block, 4, "OsmSchema-V0.6");
        proto::write_string_field(&mut block, 4, "DenseNodes");
        proto::write_string_field(
            &mut block,
            16,
            concat!("nvdb2osm/", env!("CARGO_PKG_VERSION")),
        );
        write_fileblock(&mut self.out, "OSMHeader", &block)
    }

    /// Write the node table as dense-node blocks, ids ascending from
    /// `id_start`.
    pub fn write_dense_nodes(&mut self, coords: &[(i32, i32)], id_start: i64) -> Result<()> {
        for (i, chunk) in coords.chunks(BLOCK_ELEMENTS).enumerate() {
            let first_id = id_start + (i * BLOCK_ELEMENTS) as i64;
            let block = encode_dense_block(chunk, first_id);
            write_fileblock(&mut self.out, "OSMData", &block)?;
        }
        Ok(())
    }

    /// Append the spilled way blocks after the node blocks.
    pub fn append_way_blocks(&mut self, spill: WaySpill) -> Result<()> {
        let mut reader = spill.into_reader()?;
        io::copy(&mut reader, &mut self.out).context("Failed to copy way blocks")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush().context("Failed to flush output")?;
        Ok(())
    }
}

/// Collects finalized ways into encoded PrimitiveBlocks in a temp file,
/// so ways can stream out while the node table is still growing.
pub struct WaySpill {
    tmp: File,
    buf: Vec<(i64, Way)>,
    count: u64,
}

impl WaySpill {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tmp: tempfile::tempfile().context("Failed to create way spill file")?,
            buf: Vec::new(),
            count: 0,
        })
    }

    pub fn push(&mut self, id: i64, way: Way) -> Result<()> {
        self.buf.push((id, way));
        self.count += 1;
        if self.buf.len() >= BLOCK_ELEMENTS {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Ways spilled so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let block = encode_ways_block(&self.buf);
        write_fileblock(&mut self.tmp, "OSMData", &block)?;
        self.buf.clear();
        Ok(())
    }

    fn into_reader(mut self) -> Result<File> {
        self.flush_block()?;
        self.tmp.seek(SeekFrom::Start(0))?;
        Ok(self.tmp)
    }
}
