//! Coordinate quantization and node id interning
//!
//! Coordinates are quantized to the OSM grid (1e-7 degrees, matching a
//! PBF granularity of 100 nanodegrees) and deduplicated: the first
//! observation of a grid point allocates the next dense id, every later
//! observation returns the same id. Two segments whose endpoints round to
//! the same grid point therefore share a node, which is what lets the way
//! builder join them.

use rustc_hash::FxHashMap;

/// Quantization scale: decimal degrees × 1e7, rounded to nearest.
const SCALE: f64 = 10_000_000.0;

/// Quantize a coordinate to 1e-7-degree integer units.
pub fn quantize(lon: f64, lat: f64) -> (i32, i32) {
    (
        (lon * SCALE).round() as i32,
        (lat * SCALE).round() as i32,
    )
}

/// Pack a quantized coordinate pair into one hash key.
fn pack(lon: i32, lat: i32) -> i64 {
    ((lon as u32 as i64) << 32) | (lat as u32 as i64)
}

/// Interns quantized coordinates to dense node ids.
pub struct NodeInterner {
    ids: FxHashMap<i64, i64>,
    /// Quantized coordinates indexed by `id - id_start`.
    coords: Vec<(i32, i32)>,
    id_start: i64,
}

impl NodeInterner {
    pub fn new(id_start: i64) -> Self {
        Self {
            ids: FxHashMap::default(),
            coords: Vec::new(),
            id_start,
        }
    }

    /// Intern a coordinate; idempotent on the quantized grid point.
    pub fn intern(&mut self, lon: f64, lat: f64) -> i64 {
        let (qlon, qlat) = quantize(lon, lat);
        let key = pack(qlon, qlat);
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.id_start + self.coords.len() as i64;
        self.ids.insert(key, id);
        self.coords.push((qlon, qlat));
        id
    }

    /// Number of distinct nodes interned so far.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn id_start(&self) -> i64 {
        self.id_start
    }

    /// One past the highest allocated id.
    pub fn id_end(&self) -> i64 {
        self.id_start + self.coords.len() as i64
    }

    /// Quantized coordinates in id order.
    pub fn coords(&self) -> &[(i32, i32)] {
        &self.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut interner = NodeInterner::new(1);
        let a = interner.intern(17.0, 62.0);
        let b = interner.intern(17.0, 62.0);
        assert_eq!(a, 1);
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_dense_ids_from_start() {
        let mut interner = NodeInterner::new(5_000_001);
        assert_eq!(interner.intern(17.0, 62.0), 5_000_001);
        assert_eq!(interner.intern(17.01, 62.005), 5_000_002);
        assert_eq!(interner.intern(18.0, 63.0), 5_000_003);
        assert_eq!(interner.id_end(), 5_000_004);
    }

    #[test]
    fn test_sub_grid_coordinates_collapse() {
        // Differences below 5e-8 degrees round to the same grid point
        let mut interner = NodeInterner::new(1);
        let a = interner.intern(17.000_000_01, 62.0);
        let b = interner.intern(17.000_000_04, 62.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_coordinates_do_not_collide() {
        let mut interner = NodeInterner::new(1);
        let a = interner.intern(-17.0, 62.0);
        let b = interner.intern(17.0, -62.0);
        let c = interner.intern(17.0, 62.0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_quantize_rounds_to_nearest() {
        assert_eq!(quantize(17.0, 62.0), (170_000_000, 620_000_000));
        assert_eq!(quantize(17.000_000_06, 62.0).0, 170_000_001);
        assert_eq!(quantize(-17.000_000_06, -62.0).0, -170_000_001);
    }

    #[test]
    fn test_coords_in_id_order() {
        let mut interner = NodeInterner::new(10);
        interner.intern(1.0, 2.0);
        interner.intern(3.0, 4.0);
        assert_eq!(
            interner.coords(),
            &[(10_000_000, 20_000_000), (30_000_000, 40_000_000)]
        );
    }
}
