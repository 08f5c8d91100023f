//! Attribute → OSM tag derivation
//!
//! A deterministic rule pipeline from one segment's NVDB property map to
//! its OSM tag set. The mapping is purely functional of the properties:
//! no state is carried between segments, and nothing here performs I/O.
//!
//! Rule order matters: classification runs first, and the oneway rule
//! runs before every directional rule.

pub mod tables;

use rustc_hash::FxHashMap;

use crate::model::Properties;

/// Result of mapping one segment's properties.
#[derive(Debug, Default)]
pub struct MappedTags {
    pub tags: FxHashMap<String, String>,
    /// Segment should not appear in the output at all.
    pub drop: bool,
}

/// Travel direction permitted on the segment, derived from the oneway
/// rule. Directional rules collapse onto the bare key when only the open
/// direction carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Oneway {
    Both,
    /// `oneway=yes`: only the digitized direction is open.
    Forward,
    /// `oneway=-1`: only the direction against the geometry is open.
    Backward,
}

/// Derive the OSM tag set for one segment.
pub fn derive_tags(props: &Properties) -> MappedTags {
    let mut out = MappedTags::default();

    // GCM-network ferry stubs duplicate the ferry connection they belong
    // to; without one they are redundant in the output.
    let gcm_type = int(props, "GCM_t_502");
    if gcm_type == Some(tables::GCM_FERRY) && !truthy(props, "Farjeled") {
        out.drop = true;
        return out;
    }

    if truthy(props, "Farjeled") {
        map_ferry(props, &mut out.tags);
        return out;
    }

    map_highway(props, gcm_type, &mut out.tags);
    map_link(props, &mut out.tags);
    let oneway = map_oneway(props, &mut out.tags);
    map_access(props, oneway, &mut out.tags);
    map_dimensions(props, &mut out.tags);
    map_speed(props, oneway, &mut out.tags);
    map_surface_lanes(props, &mut out.tags);
    map_structures(props, &mut out.tags);
    map_name_ref(props, &mut out.tags);
    map_misc(props, oneway, &mut out.tags);

    out
}

/// Ferry connections carry `route=ferry` and no `highway` key.
fn map_ferry(props: &Properties, tags: &mut FxHashMap<String, String>) {
    put(tags, "route", "ferry");
    put(tags, "foot", "yes");

    if let Some(name) = text(props, "Farje_139") {
        put(tags, "name", &name);
    }
    if let Some(r) = build_ref(props) {
        put(tags, "ref", &r);
    }
}

/// Highway classification cascade.
fn map_highway(
    props: &Properties,
    gcm_type: Option<i64>,
    tags: &mut FxHashMap<String, String>,
) {
    // Foot/cycle network, pedestrian streets and living streets override
    // any motor classification.
    if truthy(props, "L_Gagata") || truthy(props, "R_Gagata") {
        put(tags, "highway", "pedestrian");
        return;
    }
    if truthy(props, "L_Gangfartsomrade") || truthy(props, "R_Gangfartsomrade") {
        put(tags, "highway", "living_street");
        return;
    }
    if let Some(gcm) = gcm_type {
        let highway = if truthy(props, "C_Cykelled") {
            "cycleway"
        } else {
            // Unknown codes keep the network membership; a footway is the
            // conservative rendering.
            tables::highway_for_gcm_type(gcm).unwrap_or("footway")
        };
        put(tags, "highway", highway);
        if gcm == 12 {
            put(tags, "footway", "sidewalk");
        }
        return;
    }

    if truthy(props, "Motorvag") {
        put(tags, "highway", "motorway");
        return;
    }
    if truthy(props, "Motortrafikled") {
        put(tags, "highway", "trunk");
        return;
    }

    if let Some(highway) = int(props, "Kateg_380").and_then(tables::highway_for_category) {
        put(tags, "highway", highway);
        return;
    }
    if let Some(highway) = int(props, "Klass_181").and_then(tables::highway_for_functional_class) {
        put(tags, "highway", highway);
        return;
    }
    if let Some(highway) = int(props, "Vagty_41").and_then(tables::highway_for_road_type) {
        put(tags, "highway", highway);
        return;
    }

    // Nothing classified the segment; fall back on the built-up-area flag.
    if truthy(props, "TattbebyggtOmrade") {
        put(tags, "highway", "residential");
    } else {
        put(tags, "highway", "unclassified");
    }
}

/// Promote ramps to the `_link` variant. A ramp is recognized when the
/// delivery-quality class marks it and the segment is off the functional
/// priority network; roundabout legs are exempt.
fn map_link(props: &Properties, tags: &mut FxHashMap<String, String>) {
    let highway = match tags.get("highway").map(String::as_str) {
        Some(h @ ("motorway" | "trunk" | "primary")) => h.to_string(),
        _ => return,
    };

    if int(props, "FPV_k_309").is_some() {
        return;
    }
    match int(props, "Lever_292") {
        Some(class) if class < 4 => {}
        _ => return,
    }
    if truthy(props, "F_Cirkulationsplats") || truthy(props, "B_Cirkulationsplats") {
        return;
    }

    put(tags, "highway", &format!("{highway}_link"));
}

/// Direction-of-travel prohibitions: a forward prohibition record yields
/// `oneway=yes`, a backward one `oneway=-1`, and both together shut the
/// segment for traffic entirely.
fn map_oneway(props: &Properties, tags: &mut FxHashMap<String, String>) -> Oneway {
    let forward_forbidden = truthy(props, "F_ForbjudenFardriktning");
    let backward_forbidden = truthy(props, "B_ForbjudenFardriktning");

    if forward_forbidden && backward_forbidden {
        put(tags, "access", "no");
        return Oneway::Both;
    }
    if forward_forbidden {
        put(tags, "oneway", "yes");
        return Oneway::Forward;
    }
    if backward_forbidden {
        put(tags, "oneway", "-1");
        return Oneway::Backward;
    }

    // Motorway carriageways are directed even without an explicit
    // prohibition record.
    if tags.get("highway").map(String::as_str) == Some("motorway") {
        put(tags, "oneway", "yes");
        return Oneway::Forward;
    }

    Oneway::Both
}

/// General and vehicle-type traffic prohibitions.
fn map_access(props: &Properties, oneway: Oneway, tags: &mut FxHashMap<String, String>) {
    tag_direction(
        tags,
        oneway,
        "motor_vehicle",
        bool_value(props, "F_ForbudTrafik", "no"),
        bool_value(props, "B_ForbudTrafik", "no"),
    );

    // Vehicle-type-restricted prohibitions emit the narrowest matching key.
    let forward_key = int(props, "F_Gallar_135").and_then(tables::access_key_for_vehicle);
    let backward_key = int(props, "B_Gallar_135").and_then(tables::access_key_for_vehicle);
    match (forward_key, backward_key) {
        (Some(f), Some(b)) if f == b => {
            tag_direction(tags, oneway, f, Some("no".to_string()), Some("no".to_string()));
        }
        (f, b) => {
            if let Some(key) = f {
                tag_direction(tags, oneway, key, Some("no".to_string()), None);
            }
            if let Some(key) = b {
                tag_direction(tags, oneway, key, None, Some("no".to_string()));
            }
        }
    }
}

/// Weight, axle-load, height and length restrictions. Source values are
/// already in tonnes/metres; units are never rendered.
fn map_dimensions(props: &Properties, tags: &mut FxHashMap<String, String>) {
    if let Some(weight) = float_in(props, "Hogst_46", 0.0..100.0) {
        put(tags, "maxweight", &fmt_decimal(weight));
    }
    if let Some(axle) = float_in(props, "Hogst_55_30", 0.0..100.0) {
        put(tags, "maxaxleload", &fmt_decimal(axle));
    }
    if let Some(height) = float_in(props, "Fri_h_143", 0.0..10.0) {
        put(tags, "maxheight", &fmt_decimal(height));
    }
    if let Some(width) = float_in(props, "Bredd_156", 0.0..50.0) {
        put(tags, "width", &fmt_decimal(width));
    }

    // Directional gross-weight limits collapse when both directions agree.
    let forward = float_in(props, "F_Hogst_24", 0.0..100.0);
    let backward = float_in(props, "B_Hogst_24", 0.0..100.0);
    match (forward, backward) {
        (Some(f), Some(b)) if (f - b).abs() < 0.05 => {
            put(tags, "maxweight", &fmt_decimal(f));
        }
        (f, b) => {
            if let Some(f) = f {
                put(tags, "maxweight:forward", &fmt_decimal(f));
            }
            if let Some(b) = b {
                put(tags, "maxweight:backward", &fmt_decimal(b));
            }
        }
    }
}

/// Speed limits in km/h. Zero and out-of-range values are omitted; the
/// non-directional column is a fallback only.
fn map_speed(props: &Properties, oneway: Oneway, tags: &mut FxHashMap<String, String>) {
    let speed = |key: &str| {
        int(props, key)
            .filter(|&v| v > 0 && v <= 120)
            .map(|v| v.to_string())
    };

    let forward = speed("F_Hogst_225");
    let backward = speed("B_Hogst_225");
    if forward.is_some() || backward.is_some() {
        tag_direction(tags, oneway, "maxspeed", forward, backward);
    } else if let Some(fallback) = speed("Hogst_36") {
        put(tags, "maxspeed", &fallback);
    }
}

fn map_surface_lanes(props: &Properties, tags: &mut FxHashMap<String, String>) {
    if let Some(surface) = int(props, "Slitl_152").and_then(tables::surface_for_code) {
        put(tags, "surface", surface);
    }
    if let Some(lanes) = int(props, "Korfa_497").filter(|&n| n > 0) {
        put(tags, "lanes", &lanes.to_string());
    }
    // Bus lanes sit on the right of the digitized direction in right-hand
    // traffic; the backward column describes the opposite curb.
    if truthy(props, "F_Korfa_517") {
        put(tags, "busway:right", "lane");
    }
    if truthy(props, "B_Korfa_517") {
        put(tags, "busway:left", "lane");
    }
}

/// Bridge and tunnel construction. The layer defaults to +1/-1 when the
/// data carries no explicit level.
fn map_structures(props: &Properties, tags: &mut FxHashMap<String, String>) {
    let construction = match props.get("Konst_190") {
        Some(value) => value,
        None => return,
    };

    let kind = match construction.as_i64() {
        Some(1 | 4) => Some("bridge"),
        Some(2 | 3) => Some("tunnel"),
        _ => {
            let text = construction.as_text().trim().to_lowercase();
            if text.starts_with("bro") {
                Some("bridge")
            } else if text.contains("tunnel") || text.contains("port") {
                Some("tunnel")
            } else {
                None
            }
        }
    };

    let kind = match kind {
        Some(kind) => kind,
        None => return,
    };

    put(tags, kind, "yes");
    let layer = if kind == "bridge" { "1" } else { "-1" };
    put(tags, "layer", layer);

    if let Some(name) = text(props, "Namn_193") {
        put(tags, &format!("{kind}:name"), &name);
    }
}

fn map_name_ref(props: &Properties, tags: &mut FxHashMap<String, String>) {
    if let Some(name) = text(props, "Namn_130") {
        put(tags, "name", &name);
    }
    if let Some(r) = build_ref(props) {
        put(tags, "ref", &r);
    }
}

/// Assemble the road reference from its number components, in the order
/// European; national; county. The county form replaces the plain
/// national number for county-range numbers so the ref is not doubled.
fn build_ref(props: &Properties) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(evag) = text(props, "Evag_555").filter(|v| v != "0") {
        if evag.starts_with('E') || evag.starts_with('e') {
            parts.push(evag.to_uppercase());
        } else {
            parts.push(format!("E{evag}"));
        }
    }

    if let Some(vagnr) = text(props, "Vagnr_10370").filter(|v| v != "0") {
        let county = int(props, "Lan_558").and_then(tables::county_letter);
        let number: Option<i64> = vagnr.parse().ok();
        match (parts.is_empty(), county, number) {
            (true, Some(letter), Some(n)) if n >= 500 => {
                parts.push(format!("{letter} {n}"));
            }
            _ => parts.push(vagnr),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(";"))
    }
}

fn map_misc(props: &Properties, oneway: Oneway, tags: &mut FxHashMap<String, String>) {
    if truthy(props, "F_Cirkulationsplats") || truthy(props, "B_Cirkulationsplats") {
        put(tags, "junction", "roundabout");
    }
    if truthy(props, "GCM_belyst") {
        put(tags, "lit", "yes");
    }

    if truthy(props, "Rekom_185") {
        put(tags, "hazmat", "designated");
    }
    tag_direction(
        tags,
        oneway,
        "hazmat",
        bool_value(props, "F_Beskr_124", "no"),
        bool_value(props, "B_Beskr_124", "no"),
    );

    // Environmental zone classes 2 and 3 bind heavy vehicles only.
    match int(props, "Miljozon") {
        Some(1) => put(tags, "low_emission_zone", "yes"),
        Some(zone @ (2 | 3)) => {
            put(tags, "low_emission_zone", &zone.to_string());
            put(tags, "maxweight:hgv", "3.5");
        }
        _ => {}
    }

    tag_direction(
        tags,
        oneway,
        "overtaking",
        bool_value(props, "F_Omkorningsforbud", "no"),
        bool_value(props, "B_Omkorningsforbud", "no"),
    );
}

/// Apply a forward/backward value pair with oneway awareness: equal values
/// collapse to the bare key, a oneway road takes only its open direction's
/// value on the bare key, and two-way roads get `:forward`/`:backward`
/// suffixes.
fn tag_direction(
    tags: &mut FxHashMap<String, String>,
    oneway: Oneway,
    key: &str,
    forward: Option<String>,
    backward: Option<String>,
) {
    if forward.is_some() && forward == backward {
        put(tags, key, &forward.unwrap());
        return;
    }

    if let Some(value) = forward {
        match oneway {
            Oneway::Backward => {}
            Oneway::Forward => put(tags, key, &value),
            Oneway::Both => put(tags, &format!("{key}:forward"), &value),
        }
    }
    if let Some(value) = backward {
        match oneway {
            Oneway::Forward => {}
            Oneway::Backward => put(tags, key, &value),
            Oneway::Both => put(tags, &format!("{key}:backward"), &value),
        }
    }
}

/// Insert a tag, trimming the value and skipping empties.
fn put(tags: &mut FxHashMap<String, String>, key: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        tags.insert(key.to_string(), value.to_string());
    }
}

fn truthy(props: &Properties, key: &str) -> bool {
    props.get(key).is_some_and(|v| v.is_truthy())
}

fn int(props: &Properties, key: &str) -> Option<i64> {
    props.get(key).and_then(|v| v.as_i64())
}

fn float_in(props: &Properties, key: &str, range: std::ops::Range<f64>) -> Option<f64> {
    props
        .get(key)
        .and_then(|v| v.as_f64())
        .filter(|v| *v > range.start && *v < range.end)
}

/// Trimmed text value; empty, `NA` and sentinel `-1` count as absent.
fn text(props: &Properties, key: &str) -> Option<String> {
    props.get(key).and_then(|v| {
        let s = v.as_text();
        let t = s.trim();
        if t.is_empty() || t == "NA" || t == "-1" {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn bool_value(props: &Properties, key: &str, value: &str) -> Option<String> {
    if truthy(props, key) {
        Some(value.to_string())
    } else {
        None
    }
}

/// Canonical decimal rendering: integral values lose the fraction.
fn fmt_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
