//! Lossless JSON encoding for `f32` vectors.
//!
//! Values are widened to `f64` before serialization. Every `f32` is exactly
//! representable as an `f64`, and serde_json's `float_roundtrip` parser reads
//! the shortest `f64` representation back bit-for-bit, so narrowing on load
//! restores the original `f32` exactly.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for v in values {
        seq.serialize_element(&f64::from(*v))?;
    }
    seq.end()
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
    let wide = Vec::<f64>::deserialize(deserializer)?;
    Ok(wide.into_iter().map(|v| v as f32).collect())
}

/// Newtype for places where `#[serde(with)]` can't reach, e.g. map values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExactVector(#[serde(with = "crate::shared::exact_float")] pub Vec<f32>);
