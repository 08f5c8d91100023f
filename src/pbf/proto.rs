//! Protobuf wire-format primitives
//!
//! The OSM PBF payloads are small, fixed protobuf schemas; the messages
//! are composed by hand instead of through generated code. Wire types
//! used here: 0 = varint, 2 = length-delimited.
//!
//! Signed values (coordinates, ids, deltas) are zig-zag encoded before
//! varint serialization, per the protobuf `sint64` convention.

/// Append a base-128 varint.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// Zig-zag encode a signed value: small magnitudes stay small.
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn write_key(buf: &mut Vec<u8>, field: u32, wire_type: u32) {
    write_varint(buf, u64::from(field << 3 | wire_type));
}

/// Varint-typed field (int32/int64/uint64).
pub fn write_uint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    write_key(buf, field, 0);
    write_varint(buf, value);
}

/// Varint-typed field with zig-zag (sint64).
pub fn write_sint_field(buf: &mut Vec<u8>, field: u32, value: i64) {
    write_key(buf, field, 0);
    write_varint(buf, zigzag(value));
}

/// Length-delimited field: bytes, strings and embedded messages.
pub fn write_bytes_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    write_key(buf, field, 2);
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn write_string_field(buf: &mut Vec<u8>, field: u32, value: &str) {
    write_bytes_field(buf, field, value.as_bytes());
}

/// Packed repeated sint64, zig-zag encoded. Delta encoding is the
/// caller's business; this writes the values it is handed.
pub fn write_packed_sint64(buf: &mut Vec<u8>, field: u32, values: &[i64]) {
    if values.is_empty() {
        return;
    }
    let mut packed = Vec::with_capacity(values.len() * 2);
    for &value in values {
        write_varint(&mut packed, zigzag(value));
    }
    write_bytes_field(buf, field, &packed);
}

/// Packed repeated uint32.
pub fn write_packed_uint32(buf: &mut Vec<u8>, field: u32, values: &[u32]) {
    if values.is_empty() {
        return;
    }
    let mut packed = Vec::with_capacity(values.len());
    for &value in values {
        write_varint(&mut packed, u64::from(value));
    }
    write_bytes_field(buf, field, &packed);
}
