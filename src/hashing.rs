//! Hashing - SHA-256 Fingerprints for Run Reports
//!
//! Identical inputs with a pinned timestamp produce identical hashes.

use image::RgbaImage;
use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Dimensions and raw RGBA bytes, so equal hashes mean pixel-identical rasters.
pub fn raster_hash(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_be_bytes());
    hasher.update(image.height().to_be_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

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
    use image::Rgba;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": {"y": [{"b": 1, "a": 0}], "x": null}});
        assert_eq!(
            canonical_json(&obj).unwrap(),
            r#"{"a":2,"m":{"x":null,"y":[{"a":0,"b":1}]},"z":1}"#
        );
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_raster_hash_sees_pixels_and_shape() {
        let a = RgbaImage::from_pixel(4, 2, Rgba([1, 2, 3, 4]));
        let b = RgbaImage::from_pixel(2, 4, Rgba([1, 2, 3, 4]));
        let mut c = a.clone();
        c.put_pixel(3, 1, Rgba([1, 2, 3, 5]));

        assert_eq!(raster_hash(&a), raster_hash(&a.clone()));
        assert_ne!(raster_hash(&a), raster_hash(&b));
        assert_ne!(raster_hash(&a), raster_hash(&c));
    }
}
