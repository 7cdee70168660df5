// Canonical JSON used as the hashing preimage for blocks
use crate::error::Result;
use serde::Serialize;

/// Render `data` as JSON with object keys in sorted order.
///
/// `serde_json::Value` stores objects in a `BTreeMap`, so going through it
/// fixes key order regardless of struct field order or map insertion order.
pub fn to_canonical_json<T: Serialize>(data: &T) -> Result<String> {
    let value = serde_json::to_value(data)?;
    Ok(serde_json::to_string(&value)?)
}
