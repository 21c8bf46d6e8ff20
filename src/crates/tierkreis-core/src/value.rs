//! Byte-level helpers for the handful of places the controller is allowed to
//! look inside a value's bytes: booleans at predicate/continue ports, and the
//! map-index suffix on an output port name. Everywhere else a `Value` is an
//! opaque `Vec<u8>` the engine moves around but never interprets.

use serde::{de::DeserializeOwned, Serialize};

/// Encode a value as its JSON byte representation.
///
/// Booleans encode to the literal bytes `b"true"` / `b"false"`, which is what
/// lets [`decode_bool`] read a predicate or `continue` port without any
/// bespoke boolean wire format.
pub fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("value is JSON-serializable")
}

/// Decode bytes previously produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Interpret a value's bytes as the boolean carried by a predicate or
/// `continue` port.
pub fn decode_bool(bytes: &[u8]) -> Result<bool, serde_json::Error> {
    decode(bytes)
}

/// The reserved output port name a `Map` node's `j`th element's port `p`
/// is recorded under: `"<p>-<j>"`.
pub fn map_element_port(port: &str, idx: usize) -> String {
    format!("{port}-{idx}")
}

/// The inverse of [`map_element_port`]: split a map node's output port name
/// back into its logical port and element index, if it has the `-<idx>`
/// suffix.
pub fn split_map_element_port(name: &str) -> Option<(&str, usize)> {
    let (port, idx) = name.rsplit_once('-')?;
    let idx: usize = idx.parse().ok()?;
    Some((port, idx))
}
