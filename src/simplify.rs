//! Way building and simplification
//!
//! Consumes tagged segments in input order and merges runs of joinable
//! segments into longer OSM ways. The input arrives sorted by
//! `(ROUTE_ID, FROM_MEASURE)`, so the continuation of an open way is
//! almost always the very next segment; the builder keeps one open way
//! per join key and closes it the moment a segment with that key fails to
//! attach.
//!
//! Join policies:
//!
//! | policy      | key                                   | extra condition      |
//! |-------------|---------------------------------------|----------------------|
//! | `refname`   | highway + ref + name + fingerprint    | endpoint continuity  |
//! | `connected` | fingerprint including name/ref        | endpoint continuity  |
//! | `route`     | route id                              | endpoint continuity; tags union, first wins |

use rustc_hash::FxHashMap;

use crate::model::{SimplifyMethod, Way, WayKey};

/// OSM caps ways at 2000 nodes; an over-long run is force-closed and
/// restarted at the shared node.
const MAX_WAY_NODES: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    RefName(String, String, String, u64),
    Connected(u64),
    Route(String),
}

fn join_key(method: SimplifyMethod, key: &WayKey) -> JoinKey {
    match method {
        SimplifyMethod::Refname => JoinKey::RefName(
            key.highway.clone(),
            key.ref_.clone(),
            key.name.clone(),
            key.fingerprint,
        ),
        SimplifyMethod::Connected => JoinKey::Connected(key.full_fingerprint),
        SimplifyMethod::Route => JoinKey::Route(key.route_id.clone()),
    }
}

struct OpenWay {
    refs: Vec<i64>,
    tags: Vec<(String, String)>,
}

/// Outcome of pushing one segment.
#[derive(Default)]
pub struct PushResult {
    /// Ways closed by this push, in close order.
    pub closed: Vec<Way>,
    /// Segment collapsed below two distinct nodes and was skipped.
    pub skipped: bool,
}

/// Streaming way builder; one instance per conversion run.
pub struct WayBuilder {
    method: SimplifyMethod,
    /// Open ways in insertion order; closed slots become `None`.
    open: Vec<Option<OpenWay>>,
    index: FxHashMap<JoinKey, usize>,
}

impl WayBuilder {
    pub fn new(method: SimplifyMethod) -> Self {
        Self {
            method,
            open: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Push one segment's interned node ids. Consecutive equal ids are
    /// collapsed first; a segment left with fewer than two nodes is
    /// skipped.
    pub fn push(
        &mut self,
        mut node_ids: Vec<i64>,
        tags: Vec<(String, String)>,
        way_key: &WayKey,
    ) -> PushResult {
        let mut result = PushResult::default();

        node_ids.dedup();
        if node_ids.len() < 2 {
            result.skipped = true;
            return result;
        }

        // Self-loops stand alone and never join their neighbors.
        if node_ids.first() == node_ids.last() {
            result.closed.push(Way {
                refs: node_ids,
                tags,
            });
            return result;
        }

        let key = join_key(self.method, way_key);

        if let Some(&slot) = self.index.get(&key) {
            let open = self.open[slot]
                .as_mut()
                .unwrap_or_else(|| unreachable!("index points at closed slot"));

            let continues = open.refs.last() == node_ids.first();
            let fits = open.refs.len() + node_ids.len() - 1 <= MAX_WAY_NODES;

            if continues && fits {
                open.refs.extend_from_slice(&node_ids[1..]);
                if self.method == SimplifyMethod::Route {
                    merge_tags_first_wins(&mut open.tags, &tags);
                }
                return result;
            }

            // Either a gap in the run or the node cap: close and restart.
            let closed = self.open[slot].take().unwrap();
            result.closed.push(Way {
                refs: closed.refs,
                tags: closed.tags,
            });
            self.index.remove(&key);
        }

        let slot = self.open.len();
        self.open.push(Some(OpenWay {
            refs: node_ids,
            tags,
        }));
        self.index.insert(key, slot);

        result
    }

    /// Close every remaining open way, in insertion order.
    pub fn finish(self) -> Vec<Way> {
        self.open
            .into_iter()
            .flatten()
            .map(|open| Way {
                refs: open.refs,
                tags: open.tags,
            })
            .collect()
    }
}

/// Union the incoming tags into the open way's tags; on conflict the
/// first segment's value stands.
fn merge_tags_first_wins(into: &mut Vec<(String, String)>, from: &[(String, String)]) {
    for (key, value) in from {
        match into.binary_search_by(|(k, _)| k.cmp(key)) {
            Ok(_) => {}
            Err(pos) => into.insert(pos, (key.clone(), value.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tag_fingerprint;

    fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn key_for(tags: &[(String, String)], route_id: &str) -> WayKey {
        let highway = tags
            .iter()
            .find(|(k, _)| k == "highway")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let ref_ = tags
            .iter()
            .find(|(k, _)| k == "ref")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let name = tags
            .iter()
            .find(|(k, _)| k == "name")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        WayKey {
            highway,
            ref_,
            name,
            route_id: route_id.to_string(),
            fingerprint: tag_fingerprint(tags, false),
            full_fingerprint: tag_fingerprint(tags, true),
        }
    }

    #[test]
    fn test_refname_joins_continuous_run() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "motorway"), ("ref", "E4")]);
        let k = key_for(&t, "r1");

        assert!(builder.push(vec![1, 2], t.clone(), &k).closed.is_empty());
        assert!(builder.push(vec![2, 3], t.clone(), &k).closed.is_empty());
        let ways = builder.finish();
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].refs, vec![1, 2, 3]);
    }

    #[test]
    fn test_refname_splits_on_ref_change() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let a = tags(&[("highway", "motorway"), ("ref", "E4")]);
        let b = tags(&[("highway", "motorway"), ("ref", "E45")]);
        let ka = key_for(&a, "r1");
        let kb = key_for(&b, "r1");

        builder.push(vec![1, 2], a, &ka);
        builder.push(vec![2, 3], b, &kb);
        let ways = builder.finish();
        assert_eq!(ways.len(), 2);
        assert_eq!(ways[0].refs, vec![1, 2]);
        assert_eq!(ways[1].refs, vec![2, 3]);
    }

    #[test]
    fn test_gap_closes_open_way() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "primary")]);
        let k = key_for(&t, "r1");

        builder.push(vec![1, 2], t.clone(), &k);
        // Node 5 does not continue node 2: the open way closes first
        let result = builder.push(vec![5, 6], t.clone(), &k);
        assert_eq!(result.closed.len(), 1);
        assert_eq!(result.closed[0].refs, vec![1, 2]);
        let ways = builder.finish();
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].refs, vec![5, 6]);
    }

    #[test]
    fn test_reversed_segment_not_joined() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "primary")]);
        let k = key_for(&t, "r1");

        builder.push(vec![1, 2], t.clone(), &k);
        // A reversed continuation starts at its own last node; 3 != 2
        let result = builder.push(vec![3, 2], t.clone(), &k);
        assert_eq!(result.closed.len(), 1);
    }

    #[test]
    fn test_connected_requires_full_tag_equality() {
        let mut builder = WayBuilder::new(SimplifyMethod::Connected);
        let a = tags(&[("highway", "primary"), ("name", "Storgatan")]);
        let b = tags(&[("highway", "primary"), ("name", "Lillgatan")]);
        let ka = key_for(&a, "r1");
        let kb = key_for(&b, "r1");

        builder.push(vec![1, 2], a, &ka);
        builder.push(vec![2, 3], b, &kb);
        assert_eq!(builder.finish().len(), 2);
    }

    #[test]
    fn test_route_unions_tags_first_wins() {
        let mut builder = WayBuilder::new(SimplifyMethod::Route);
        let a = tags(&[("highway", "primary"), ("maxspeed", "80")]);
        let b = tags(&[("highway", "secondary"), ("surface", "paved")]);
        let ka = key_for(&a, "route-9");
        let kb = key_for(&b, "route-9");

        builder.push(vec![1, 2], a, &ka);
        builder.push(vec![2, 3], b, &kb);
        let ways = builder.finish();
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].refs, vec![1, 2, 3]);
        let tag = |k: &str| {
            ways[0]
                .tags
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(tag("highway"), Some("primary")); // first wins
        assert_eq!(tag("maxspeed"), Some("80"));
        assert_eq!(tag("surface"), Some("paved")); // union
    }

    #[test]
    fn test_self_loop_stands_alone() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "residential")]);
        let k = key_for(&t, "r1");

        builder.push(vec![1, 2], t.clone(), &k);
        let result = builder.push(vec![2, 3, 4, 2], t.clone(), &k);
        // Loop emitted immediately, open way untouched
        assert_eq!(result.closed.len(), 1);
        assert_eq!(result.closed[0].refs, vec![2, 3, 4, 2]);
        let ways = builder.finish();
        assert_eq!(ways.len(), 1);
        assert_eq!(ways[0].refs, vec![1, 2]);
    }

    #[test]
    fn test_adjacent_duplicate_ids_collapse() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "residential")]);
        let k = key_for(&t, "r1");

        builder.push(vec![1, 1, 2, 2, 3], t.clone(), &k);
        let ways = builder.finish();
        assert_eq!(ways[0].refs, vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_length_segment_skipped() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "residential")]);
        let k = key_for(&t, "r1");

        let result = builder.push(vec![7, 7], t.clone(), &k);
        assert!(result.skipped);
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_node_cap_forces_close() {
        let mut builder = WayBuilder::new(SimplifyMethod::Refname);
        let t = tags(&[("highway", "primary")]);
        let k = key_for(&t, "r1");

        let mut closed = 0;
        let mut next = 1i64;
        for _ in 0..1500 {
            // Each segment contributes two new nodes to the run
            let result = builder.push(vec![next, next + 1, next + 2], t.clone(), &k);
            closed += result.closed.len();
            next += 2;
        }
        let ways: Vec<Way> = builder.finish();
        assert_eq!(closed + ways.len(), 2);
        for way in &ways {
            assert!(way.refs.len() <= MAX_WAY_NODES);
        }
    }
}
