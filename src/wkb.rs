//! WKB (Well-Known Binary) geometry parsing
//!
//! Accepts the linestring encodings that NVDB extracts show up with in
//! practice: plain ISO WKB, ISO Z/M/ZM variants, and PostGIS-style EWKB
//! with SRID and dimension flags. Multilinestrings are tolerated by taking
//! their first part (NVDB measure segments are single-part; the multi
//! wrapper appears only as a container artifact).
//!
//! ## Layout
//!
//! ```text
//! byte order: 1 byte (0 = big-endian, 1 = little-endian)
//! type:       4 bytes (2 = linestring, 5 = multilinestring, + flags)
//! [srid:      4 bytes, only when the EWKB SRID flag is set]
//! num_points: 4 bytes
//! for each point:
//!   x: 8 bytes (f64, longitude)
//!   y: 8 bytes (f64, latitude)
//!   [z / m: 8 bytes each when the dimension flags say so — skipped]
//! ```

use geo_types::{Coord, LineString};
use std::fmt;

const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;

/// Reasons a WKB payload is rejected. The pipeline drops the segment and
/// counts the warning; parsing never panics on foreign bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WkbError {
    Truncated,
    BadByteOrder(u8),
    UnsupportedType(u32),
    EmptyGeometry,
}

impl fmt::Display for WkbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WkbError::Truncated => write!(f, "truncated payload"),
            WkbError::BadByteOrder(b) => write!(f, "unknown byte order marker {b}"),
            WkbError::UnsupportedType(t) => write!(f, "unsupported geometry type {t}"),
            WkbError::EmptyGeometry => write!(f, "geometry has no parts"),
        }
    }
}

impl std::error::Error for WkbError {}

/// Parse a WKB payload into a 2D linestring, dropping Z/M ordinates.
pub fn parse_linestring(wkb: &[u8]) -> Result<LineString<f64>, WkbError> {
    let (geom, _) = parse_geometry(wkb)?;
    Ok(geom)
}

/// Parse one geometry starting at the beginning of `wkb`. Returns the
/// geometry and the number of bytes consumed (needed to walk the parts of
/// a multilinestring).
fn parse_geometry(wkb: &[u8]) -> Result<(LineString<f64>, usize), WkbError> {
    if wkb.len() < 9 {
        return Err(WkbError::Truncated);
    }

    let little_endian = match wkb[0] {
        0 => false,
        1 => true,
        other => return Err(WkbError::BadByteOrder(other)),
    };

    let raw_type = read_u32(wkb, 1, little_endian)?;

    // EWKB flags, then ISO-style type offsets (1000 = Z, 2000 = M, 3000 = ZM)
    let has_srid = raw_type & EWKB_SRID != 0;
    let ewkb_z = raw_type & EWKB_Z != 0;
    let ewkb_m = raw_type & EWKB_M != 0;
    let clean_type = raw_type & 0x1FFF_FFFF;
    let base_type = clean_type % 1000;
    let iso_dim = clean_type / 1000;

    let has_z = ewkb_z || iso_dim == 1 || iso_dim == 3;
    let has_m = ewkb_m || iso_dim == 2 || iso_dim == 3;
    let point_size = 16 + if has_z { 8 } else { 0 } + if has_m { 8 } else { 0 };

    let mut offset = 5;
    if has_srid {
        offset += 4;
    }

    match base_type {
        2 => parse_points(wkb, offset, little_endian, point_size),
        5 => {
            // Multilinestring: num_parts, then each part is a full WKB
            // geometry with its own byte-order marker. Take the first part.
            let num_parts = read_u32(wkb, offset, little_endian)? as usize;
            if num_parts == 0 {
                return Err(WkbError::EmptyGeometry);
            }
            let part_start = offset + 4;
            if part_start >= wkb.len() {
                return Err(WkbError::Truncated);
            }
            parse_geometry(&wkb[part_start..])
        }
        other => Err(WkbError::UnsupportedType(other)),
    }
}

fn parse_points(
    wkb: &[u8],
    offset: usize,
    little_endian: bool,
    point_size: usize,
) -> Result<(LineString<f64>, usize), WkbError> {
    let num_points = read_u32(wkb, offset, little_endian)? as usize;
    let points_start = offset + 4;
    let end = points_start
        .checked_add(num_points.checked_mul(point_size).ok_or(WkbError::Truncated)?)
        .ok_or(WkbError::Truncated)?;
    if wkb.len() < end {
        return Err(WkbError::Truncated);
    }

    let mut coords = Vec::with_capacity(num_points);
    for i in 0..num_points {
        let base = points_start + i * point_size;
        let x = read_f64(wkb, base, little_endian)?;
        let y = read_f64(wkb, base + 8, little_endian)?;
        coords.push(Coord { x, y });
    }

    Ok((LineString::from(coords), end))
}

fn read_u32(wkb: &[u8], offset: usize, little_endian: bool) -> Result<u32, WkbError> {
    let bytes: [u8; 4] = wkb
        .get(offset..offset + 4)
        .ok_or(WkbError::Truncated)?
        .try_into()
        .unwrap();
    Ok(if little_endian {
        u32::from_le_bytes(bytes)
    } else {
        u32::from_be_bytes(bytes)
    })
}

fn read_f64(wkb: &[u8], offset: usize, little_endian: bool) -> Result<f64, WkbError> {
    let bytes: [u8; 8] = wkb
        .get(offset..offset + 8)
        .ok_or(WkbError::Truncated)?
        .try_into()
        .unwrap();
    Ok(if little_endian {
        f64::from_le_bytes(bytes)
    } else {
        f64::from_be_bytes(bytes)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian 2D linestring from coordinate pairs.
    pub fn encode_linestring(coords: &[(f64, f64)]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + coords.len() * 16);
        buf.push(1u8);
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&(coords.len() as u32).to_le_bytes());
        for &(x, y) in coords {
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_parse_plain_linestring() {
        let wkb = encode_linestring(&[(17.0, 62.0), (17.01, 62.005)]);
        let line = parse_linestring(&wkb).unwrap();
        assert_eq!(line.0.len(), 2);
        assert_eq!(line.0[0], Coord { x: 17.0, y: 62.0 });
        assert_eq!(line.0[1], Coord { x: 17.01, y: 62.005 });
    }

    #[test]
    fn test_parse_big_endian() {
        let mut buf = vec![0u8];
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        for &(x, y) in &[(11.97, 57.70), (11.98, 57.71)] {
            buf.extend_from_slice(&f64::to_be_bytes(x));
            buf.extend_from_slice(&f64::to_be_bytes(y));
        }
        let line = parse_linestring(&buf).unwrap();
        assert_eq!(line.0[1], Coord { x: 11.98, y: 57.71 });
    }

    #[test]
    fn test_parse_ewkb_with_srid_and_z() {
        // EWKB: little-endian, linestring | SRID | Z flags, SRID 4326, one
        // 3D point pair
        let mut buf = vec![1u8];
        buf.extend_from_slice(&(2u32 | EWKB_SRID | EWKB_Z).to_le_bytes());
        buf.extend_from_slice(&4326u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        for &(x, y) in &[(17.0f64, 62.0f64), (17.1, 62.1)] {
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
            buf.extend_from_slice(&0.0f64.to_le_bytes()); // z, skipped
        }
        let line = parse_linestring(&buf).unwrap();
        assert_eq!(line.0.len(), 2);
        assert_eq!(line.0[1], Coord { x: 17.1, y: 62.1 });
    }

    #[test]
    fn test_parse_iso_zm_linestring() {
        // ISO type 3002 = linestring ZM
        let mut buf = vec![1u8];
        buf.extend_from_slice(&3002u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        for &(x, y) in &[(17.0f64, 62.0f64), (17.1, 62.1)] {
            buf.extend_from_slice(&x.to_le_bytes());
            buf.extend_from_slice(&y.to_le_bytes());
            buf.extend_from_slice(&1.0f64.to_le_bytes()); // z
            buf.extend_from_slice(&2.0f64.to_le_bytes()); // m
        }
        let line = parse_linestring(&buf).unwrap();
        assert_eq!(line.0.len(), 2);
        assert_eq!(line.0[0], Coord { x: 17.0, y: 62.0 });
    }

    #[test]
    fn test_parse_multilinestring_takes_first_part() {
        let part = encode_linestring(&[(17.0, 62.0), (17.01, 62.005)]);
        let mut buf = vec![1u8];
        buf.extend_from_slice(&5u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&part);
        let line = parse_linestring(&buf).unwrap();
        assert_eq!(line.0.len(), 2);
    }

    #[test]
    fn test_reject_malformed() {
        assert_eq!(parse_linestring(&[]), Err(WkbError::Truncated));
        assert_eq!(
            parse_linestring(&[7, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(WkbError::BadByteOrder(7))
        );

        // Point geometry (type 1) is not a linestring
        let mut point = vec![1u8];
        point.extend_from_slice(&1u32.to_le_bytes());
        point.extend_from_slice(&17.0f64.to_le_bytes());
        point.extend_from_slice(&62.0f64.to_le_bytes());
        assert_eq!(
            parse_linestring(&point),
            Err(WkbError::UnsupportedType(1))
        );

        // Declared 5 points, provided 1
        let mut short = vec![1u8];
        short.extend_from_slice(&2u32.to_le_bytes());
        short.extend_from_slice(&5u32.to_le_bytes());
        short.extend_from_slice(&17.0f64.to_le_bytes());
        short.extend_from_slice(&62.0f64.to_le_bytes());
        assert_eq!(parse_linestring(&short), Err(WkbError::Truncated));
    }

    #[test]
    fn test_empty_multilinestring_rejected() {
        let mut buf = vec![1u8];
        buf.extend_from_slice(&5u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(parse_linestring(&buf), Err(WkbError::EmptyGeometry));
    }
}
