//! Fixed lookup tables for the tag mapper
//!
//! All tables reject unknown codes with `None`; unrecognized enum values
//! drop silently upstream.

/// Functional road class (0–9) → highway value.
///
/// Monotone bucketing over the official class scale: the top classes are
/// the national through-network, the bottom is forestry access.
pub fn highway_for_functional_class(class: i64) -> Option<&'static str> {
    match class {
        0..=2 => Some("primary"),
        3 => Some("secondary"),
        4 => Some("tertiary"),
        5 | 6 => Some("unclassified"),
        7 => Some("residential"),
        8 => Some("service"),
        9 => Some("track"),
        _ => None,
    }
}

/// Road category (Vägkategori) → highway value for the categories above
/// the functional-class scale.
pub fn highway_for_category(category: i64) -> Option<&'static str> {
    match category {
        1 | 2 => Some("trunk"),    // European / national road
        3 => Some("primary"),      // primary county road
        4 => Some("secondary"),    // other county road
        _ => None,
    }
}

/// Road type (Vägtyp) → highway value, consulted only when neither the
/// category nor the functional class is present.
pub fn highway_for_road_type(road_type: i64) -> Option<&'static str> {
    match road_type {
        1 => Some("unclassified"),
        2 => Some("residential"),
        3 => Some("service"),
        4 => Some("track"),
        _ => None,
    }
}

/// GCM (foot/cycle network) type code → highway value.
///
/// The full code list distinguishes many structures (elevators, quays,
/// platforms, stairs); only the classes with a linear OSM rendering are
/// kept, the rest fall back to the mapper's footway default.
/// Code 27 (GCM ferry) is handled by the ferry rule, not here.
pub fn highway_for_gcm_type(gcm: i64) -> Option<&'static str> {
    match gcm {
        1 | 2 | 3 | 5 | 8 | 9 | 13 | 15 | 28 | 29 => Some("cycleway"),
        4 | 10 | 11 | 12 | 14 | 25 => Some("footway"),
        18 | 19 => Some("path"),
        24 | 26 => Some("pedestrian"),
        _ => None,
    }
}

/// GCM ferry code inside the foot/cycle network type column.
pub const GCM_FERRY: i64 = 27;

/// County number → county letter code used in road references.
pub fn county_letter(county: i64) -> Option<&'static str> {
    match county {
        1 => Some("AB"),  // Stockholm
        3 => Some("C"),   // Uppsala
        4 => Some("D"),   // Södermanland
        5 => Some("E"),   // Östergötland
        6 => Some("F"),   // Jönköping
        7 => Some("G"),   // Kronoberg
        8 => Some("H"),   // Kalmar
        9 => Some("I"),   // Gotland
        10 => Some("K"),  // Blekinge
        11 => Some("L"),  // Kristianstad (f.d.)
        12 => Some("M"),  // Skåne
        13 => Some("N"),  // Halland
        14 => Some("O"),  // Västra Götaland
        15 => Some("P"),  // Älvsborg (f.d.)
        16 => Some("R"),  // Skaraborg (f.d.)
        17 => Some("S"),  // Värmland
        18 => Some("T"),  // Örebro
        19 => Some("U"),  // Västmanland
        20 => Some("W"),  // Dalarna
        21 => Some("X"),  // Gävleborg
        22 => Some("Y"),  // Västernorrland
        23 => Some("Z"),  // Jämtland
        24 => Some("AC"), // Västerbotten
        25 => Some("BD"), // Norrbotten
        _ => None,
    }
}

/// Vehicle type code from a traffic prohibition → the narrowest matching
/// OSM access key. Codes whose narrowest key falls outside the supported
/// set (buses, mopeds, tractors) drop silently rather than over-restrict.
pub fn access_key_for_vehicle(vehicle: i64) -> Option<&'static str> {
    match vehicle {
        10 | 40 | 170 | 180 | 210 => Some("motor_vehicle"),
        90 | 100 | 280 => Some("hgv"),
        30 => Some("bicycle"),
        80 => Some("foot"),
        _ => None,
    }
}

/// Pavement code → surface value.
pub fn surface_for_code(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("paved"),
        2 => Some("unpaved"),
        _ => None,
    }
}
