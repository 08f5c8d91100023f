//! Shared data model for the conversion pipeline

use rustc_hash::{FxHashMap, FxHasher};
use serde::Deserialize;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use nvdb_common::Error;

/// Property map of one input segment: NVDB column name → value.
pub type Properties = FxHashMap<String, PropertyValue>;

/// NVDB attribute value. The input is schema-free at the value level, so
/// every column value is one of these variants; coercion happens per rule
/// in the tag mapper.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Flag semantics: `1`, `-1` (ESRI GDB true), `true` and their string
    /// forms all count as set.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropertyValue::Null => false,
            PropertyValue::Boolean(b) => *b,
            PropertyValue::Integer(i) => *i != 0,
            PropertyValue::Float(f) => *f != 0.0,
            PropertyValue::String(s) => {
                matches!(s.trim(), "1" | "-1" | "true" | "yes")
            }
        }
    }

    /// Numeric coercion. Malformed strings yield `None`, never zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::Float(f) => Some(*f as i64),
            PropertyValue::Boolean(b) => Some(i64::from(*b)),
            PropertyValue::String(s) => s.trim().parse().ok(),
            PropertyValue::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::String(s) => s.trim().parse().ok(),
            PropertyValue::Boolean(_) | PropertyValue::Null => None,
        }
    }

    /// Text rendering for name/ref columns. Numbers render in canonical
    /// decimal form; null renders empty.
    pub fn as_text(&self) -> String {
        match self {
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Null => String::new(),
        }
    }
}

/// One input record: raw WKB geometry plus its property map.
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    pub wkb: Vec<u8>,
    pub properties: Properties,
}

/// A segment after tag derivation, ready for node interning and way
/// building. Tags are kept sorted by key so fingerprints and PBF output
/// are deterministic.
#[derive(Debug, Clone)]
pub struct TaggedSegment {
    pub coords: Vec<(f64, f64)>,
    pub tags: Vec<(String, String)>,
    pub way_key: WayKey,
}

/// Join-decision fields for one segment. The simplify policies consult
/// different subsets of this key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WayKey {
    pub highway: String,
    pub ref_: String,
    pub name: String,
    pub route_id: String,
    /// Stable hash of the sorted tag pairs excluding name/ref.
    pub fingerprint: u64,
    /// Same hash including name/ref; the `connected` policy keys on this.
    pub full_fingerprint: u64,
}

/// Stable hash over sorted `(key, value)` tag pairs.
///
/// FxHasher is unkeyed, so the value is reproducible across runs and
/// processes. `name` and `ref` are skipped unless `include_name_ref`.
pub fn tag_fingerprint(tags: &[(String, String)], include_name_ref: bool) -> u64 {
    let mut hasher = FxHasher::default();
    for (key, value) in tags {
        if !include_name_ref && (key == "name" || key == "ref") {
            continue;
        }
        key.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    hasher.finish()
}

/// A finalized output way: interned node refs plus tags.
#[derive(Debug, Clone)]
pub struct Way {
    pub refs: Vec<i64>,
    pub tags: Vec<(String, String)>,
}

/// Join policy for the way builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimplifyMethod {
    /// Join on highway + ref + name + tag fingerprint (default).
    #[default]
    Refname,
    /// Join on full tag equality and endpoint connectivity.
    Connected,
    /// Join on route id; tags union with first-wins.
    Route,
}

impl SimplifyMethod {
    pub fn name(self) -> &'static str {
        match self {
            SimplifyMethod::Refname => "refname",
            SimplifyMethod::Connected => "connected",
            SimplifyMethod::Route => "route",
        }
    }
}

impl FromStr for SimplifyMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "refname" => Ok(SimplifyMethod::Refname),
            "connected" => Ok(SimplifyMethod::Connected),
            "route" => Ok(SimplifyMethod::Route),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_truthy_coercion() {
        assert!(PropertyValue::Integer(1).is_truthy());
        assert!(PropertyValue::Integer(-1).is_truthy());
        assert!(PropertyValue::Boolean(true).is_truthy());
        assert!(PropertyValue::String("1".to_string()).is_truthy());
        assert!(!PropertyValue::Integer(0).is_truthy());
        assert!(!PropertyValue::String("0".to_string()).is_truthy());
        assert!(!PropertyValue::Null.is_truthy());
    }

    #[test]
    fn test_malformed_numeric_string_is_absent() {
        assert_eq!(PropertyValue::String("70".to_string()).as_i64(), Some(70));
        assert_eq!(PropertyValue::String("7O".to_string()).as_i64(), None);
        assert_eq!(PropertyValue::String("".to_string()).as_i64(), None);
    }

    #[test]
    fn test_fingerprint_ignores_name_and_ref() {
        let a = tags(&[("highway", "primary"), ("name", "Storgatan")]);
        let b = tags(&[("highway", "primary"), ("name", "Lillgatan")]);
        assert_eq!(tag_fingerprint(&a, false), tag_fingerprint(&b, false));
        assert_ne!(tag_fingerprint(&a, true), tag_fingerprint(&b, true));
    }

    #[test]
    fn test_fingerprint_sensitive_to_values() {
        let a = tags(&[("highway", "primary")]);
        let b = tags(&[("highway", "secondary")]);
        assert_ne!(tag_fingerprint(&a, false), tag_fingerprint(&b, false));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "refname".parse::<SimplifyMethod>().unwrap(),
            SimplifyMethod::Refname
        );
        assert_eq!(
            "ROUTE".parse::<SimplifyMethod>().unwrap(),
            SimplifyMethod::Route
        );
        assert!("linear".parse::<SimplifyMethod>().is_err());
    }
}
