//! Hashing System - SHA-256 Fingerprints
//!
//! Fingerprints are stable across runs and platforms: the attribute set is
//! rendered as canonical JSON (sorted keys, no whitespace) and hashed.

use sha2::{Sha256, Digest};
use serde::{Deserialize, Serialize};
use serde_json::{Value, to_string};
use std::fmt;

use crate::resolver::AttributeSet;

/// Deduplication key of an attribute set, lowercase hex SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => {
            Value::Array(arr.iter().map(sort_value).collect())
        }
        _ => v.clone()
    }
}

/// Fingerprint of an attribute set
pub fn fingerprint(attributes: &AttributeSet) -> Result<Fingerprint, serde_json::Error> {
    let canonical = canonical_json(attributes)?;
    Ok(Fingerprint(sha256_hex(canonical.as_bytes())))
}

/// Hash of a whole manifest, reported alongside a batch so it can be reproduced
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_is_hash_of_canonical_form() {
        let set = AttributeSet::new("Great wave.png", "Treetops.png", "Frog.png");
        let canonical = canonical_json(&set).unwrap();
        assert_eq!(
            canonical,
            r#"{"background":"Great wave.png","foreground":"Treetops.png","object":"Frog.png"}"#
        );
        let fp = fingerprint(&set).unwrap();
        assert_eq!(fp.as_str(), sha256_hex(canonical.as_bytes()));
        assert_eq!(fp.as_str().len(), 64);
    }

    #[test]
    fn test_equal_sets_equal_fingerprints() {
        let a = AttributeSet::new("Great wave.png", "Treetops.png", "Frog.png");
        let b: AttributeSet = serde_json::from_value(json!({
            "object": "Frog.png",
            "foreground": "Treetops.png",
            "background": "Great wave.png"
        }))
        .unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_different_sets_different_fingerprints() {
        let base = AttributeSet::new("Great wave.png", "Treetops.png", "Frog.png");
        let variants = [
            AttributeSet::new("Pine forest.png", "Treetops.png", "Frog.png"),
            AttributeSet::new("Great wave.png", "Cloud world.png", "Frog.png"),
            AttributeSet::new("Great wave.png", "Treetops.png", "Heron.png"),
            AttributeSet::new("Treetops.png", "Great wave.png", "Frog.png"),
        ];
        let base_fp = fingerprint(&base).unwrap();
        for variant in &variants {
            assert_ne!(fingerprint(variant).unwrap(), base_fp);
        }
    }

    #[test]
    fn test_manifest_hash_stable() {
        let manifest = json!({"manifestVersion": "1.0.0", "tables": {}});
        let h1 = compute_manifest_hash(&manifest).unwrap();
        let h2 = compute_manifest_hash(&manifest).unwrap();
        assert_eq!(h1, h2);
    }
}
