//! Canonical hashing and seed derivation.
//!
//! Parameters are hashed as `hex(BLAKE3(JCS(params_json)))` so that two
//! documents that differ only in key order or whitespace hash identically.
//! Tensor outputs are hashed over their little-endian `f32` bytes.

use std::fmt::Write as _;

use crate::band::BandName;
use crate::error::SpecError;
use crate::params::ComposeParams;

/// Computes the canonical BLAKE3 hash of composition parameters.
///
/// # Example
/// ```
/// use stylemix_spec::hash::canonical_params_hash;
/// use stylemix_spec::ComposeParams;
///
/// let hash = canonical_params_hash(&ComposeParams::default()).unwrap();
/// assert_eq!(hash.len(), 64);
/// ```
pub fn canonical_params_hash(params: &ComposeParams) -> Result<String, SpecError> {
    let value = serde_json::to_value(params)?;
    Ok(canonical_value_hash(&value))
}

/// Computes the canonical BLAKE3 hash of any JSON value.
pub fn canonical_value_hash(value: &serde_json::Value) -> String {
    blake3_hash(canonicalize_json(value).as_bytes())
}

/// Renders a JSON value in RFC 8785 (JCS) canonical form.
///
/// Object keys are sorted, no whitespace is emitted, and integral floats are
/// written without a fractional part.
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&jcs_number(n)),
        Value::String(s) => write_jcs_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_jcs_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

fn jcs_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if !f.is_finite() => "null".to_string(),
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        // Rust's shortest round-trip formatting never emits trailing zeros.
        Some(f) => format!("{}", f),
        None => "null".to_string(),
    }
}

fn write_jcs_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c < '\x20' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Derives an independent seed for one band's projection from a base seed.
///
/// ```text
/// band_seed = truncate_u32(BLAKE3(base_seed_le || band_name))
/// ```
///
/// # Example
/// ```
/// use stylemix_spec::hash::derive_band_seed;
/// use stylemix_spec::BandName;
///
/// assert_ne!(
///     derive_band_seed(7, BandName::Style),
///     derive_band_seed(7, BandName::Color),
/// );
/// ```
pub fn derive_band_seed(base_seed: u32, band: BandName) -> u32 {
    let mut input = Vec::with_capacity(4 + band.as_str().len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(band.as_str().as_bytes());

    let hash = blake3::hash(&input);
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&hash.as_bytes()[..4]);
    u32::from_le_bytes(bytes)
}

/// Computes a BLAKE3 hash of arbitrary bytes as lowercase hex.
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Hashes `f32` values over their little-endian byte representation.
pub fn f32_slice_hash(values: &[f32]) -> String {
    let mut hasher = blake3::Hasher::new();
    for v in values {
        hasher.update(&v.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
