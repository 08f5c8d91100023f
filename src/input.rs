//! NDJSON segment input
//!
//! One record per line: `{"wkb": "<hex>", "properties": {...}}`.
//! Geometry is hex-encoded WKB; property values keep their JSON types
//! (string, integer, float, boolean, null). Records must already be
//! sorted by `(ROUTE_ID, FROM_MEASURE)` — the reader does not sort.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::model::{Properties, SegmentRecord};

#[derive(Deserialize)]
struct RawRecord {
    wkb: String,
    #[serde(default)]
    properties: Properties,
}

/// Parse one NDJSON line into a segment record.
pub fn parse_line(line: &str) -> Result<SegmentRecord> {
    let raw: RawRecord = serde_json::from_str(line).context("Malformed record")?;
    let wkb = hex::decode(raw.wkb.trim()).context("Malformed WKB hex")?;
    Ok(SegmentRecord {
        wkb,
        properties: raw.properties,
    })
}

/// Streaming reader over an NDJSON segment file. Yields one result per
/// non-empty line; a bad line is an error item, not a stop.
pub struct SegmentReader {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl Iterator for SegmentReader {
    type Item = Result<SegmentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    return Some(Err(err).context(format!("Failed to read line {}", self.line_no)))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                parse_line(&line).with_context(|| format!("line {}", self.line_no)),
            );
        }
    }
}

/// Open an NDJSON segment file for streaming.
pub fn read_segments<P: AsRef<Path>>(path: P) -> Result<SegmentReader> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
    Ok(SegmentReader {
        lines: BufReader::new(file).lines(),
        line_no: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_line_types() {
        let record = parse_line(
            r#"{"wkb": "01", "properties": {"Motorvag": 1, "Namn_130": "Storgatan", "FROM_MEASURE": 0.25, "Farjeled": true, "Lever_292": null}}"#,
        )
        .unwrap();
        assert_eq!(record.wkb, vec![0x01]);
        assert_eq!(
            record.properties.get("Motorvag"),
            Some(&PropertyValue::Integer(1))
        );
        assert_eq!(
            record.properties.get("Namn_130"),
            Some(&PropertyValue::String("Storgatan".to_string()))
        );
        assert_eq!(
            record.properties.get("FROM_MEASURE"),
            Some(&PropertyValue::Float(0.25))
        );
        assert_eq!(
            record.properties.get("Farjeled"),
            Some(&PropertyValue::Boolean(true))
        );
        assert_eq!(record.properties.get("Lever_292"), Some(&PropertyValue::Null));
    }

    #[test]
    fn test_parse_line_rejects_bad_hex() {
        assert!(parse_line(r#"{"wkb": "zz", "properties": {}}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"wkb": "01", "properties": {{}}}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, r#"{{"wkb": "02", "properties": {{}}}}"#).unwrap();

        let results: Vec<_> = read_segments(file.path()).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(format!("{:#}", results[1].as_ref().unwrap_err()).contains("line 3"));
        assert!(results[2].is_ok());
    }
}
