use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::embedding;
use crate::shared::face_record::FaceRecord;

/// How a cluster's single search vector is derived from its members.
///
/// The registry records which policy built it, since match quality
/// depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativePolicy {
    /// Embedding of the lowest-indexed member. Cheap, but depends on which
    /// face happened to be ingested first.
    FirstMember,
    /// Element-wise mean of every member embedding.
    #[default]
    Centroid,
}

impl RepresentativePolicy {
    /// `members` must be in record order. `None` when there are no members
    /// or their dimensions disagree.
    pub fn representative(&self, members: &[&FaceRecord]) -> Option<Vec<f32>> {
        match self {
            Self::FirstMember => members.first().map(|r| r.embedding.clone()),
            Self::Centroid => embedding::mean(members.iter().map(|r| r.embedding.as_slice())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstMember => "first_member",
            Self::Centroid => "centroid",
        }
    }
}

impl fmt::Display for RepresentativePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepresentativePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "first_member" | "first" => Ok(Self::FirstMember),
            "centroid" | "mean" => Ok(Self::Centroid),
            other => Err(format!(
                "unknown representative policy '{other}' (expected first_member or centroid)"
            )),
        }
    }
}
