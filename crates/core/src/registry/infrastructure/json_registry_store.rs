use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::clustering::domain::clustering_params::ClusteringParams;
use crate::registry::domain::cluster::Cluster;
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::registry_store::RegistryStore;
use crate::registry::domain::representative_policy::RepresentativePolicy;
use crate::shared::constants::{MANIFEST_FILE_NAME, MEMBERS_FILE_NAME, REPRESENTATIVES_FILE_NAME};
use crate::shared::exact_float::ExactVector;
use crate::shared::face_record::FaceRef;
use crate::shared::json_store::{self, StoreError};

#[derive(Serialize, Deserialize)]
struct Manifest {
    policy: RepresentativePolicy,
    #[serde(default)]
    clustering: Option<ClusteringParams>,
    dimension: usize,
    cluster_count: usize,
    face_count: usize,
    representatives_sha256: String,
    members_sha256: String,
    clusters: BTreeMap<ClusterId, ManifestEntry>,
}

#[derive(Serialize, Deserialize)]
struct ManifestEntry {
    exemplar: FaceRef,
    record_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thumbnail: Option<PathBuf>,
}

/// Registry as three JSON files in one directory:
///
/// - `representatives.json`: `{ "<id>": [f32; D] }`
/// - `members.json`: `{ "<id>": ["filename", ...] }`, filenames sorted
/// - `manifest.json`: policy, clustering parameters, counts, the SHA-256 of
///   the other two files, and per-cluster exemplar, record indices and
///   thumbnail
///
/// Each file is replaced atomically and the manifest is written last. A load
/// verifies both digests against the manifest, so a save interrupted between
/// files fails to load instead of pairing one build's vectors with another
/// build's members.
pub struct JsonRegistryStore {
    dir: PathBuf,
}

impl JsonRegistryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.manifest_path().exists()
    }

    fn representatives_path(&self) -> PathBuf {
        self.dir.join(REPRESENTATIVES_FILE_NAME)
    }

    fn members_path(&self) -> PathBuf {
        self.dir.join(MEMBERS_FILE_NAME)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }
}

impl RegistryStore for JsonRegistryStore {
    fn save(&self, registry: &ClusterRegistry) -> Result<(), StoreError> {
        let representatives: BTreeMap<ClusterId, ExactVector> = registry
            .clusters()
            .map(|c| (c.id, ExactVector(c.representative.clone())))
            .collect();
        let representatives_path = self.representatives_path();
        let members_path = self.members_path();
        let representatives_bytes =
            json_store::to_json_bytes(&representatives_path, &representatives)?;
        let members_bytes = json_store::to_json_bytes(&members_path, &registry.members())?;

        let manifest = Manifest {
            policy: registry.policy(),
            clustering: registry.clustering_params(),
            dimension: registry.dimension(),
            cluster_count: registry.len(),
            face_count: registry.face_count(),
            representatives_sha256: sha256_hex(&representatives_bytes),
            members_sha256: sha256_hex(&members_bytes),
            clusters: registry
                .clusters()
                .map(|c| {
                    let entry = ManifestEntry {
                        exemplar: c.exemplar.clone(),
                        record_indices: c.record_indices.clone(),
                        thumbnail: c.thumbnail.clone(),
                    };
                    (c.id, entry)
                })
                .collect(),
        };

        json_store::write_atomic(&representatives_path, &representatives_bytes)?;
        json_store::write_atomic(&members_path, &members_bytes)?;
        json_store::write_json(&self.manifest_path(), &manifest)?;
        log::debug!(
            "Saved registry of {} clusters to {}",
            registry.len(),
            self.dir.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<ClusterRegistry, StoreError> {
        let manifest: Manifest = json_store::read_json(&self.manifest_path())?;
        let mut representatives: BTreeMap<ClusterId, ExactVector> =
            read_verified(&self.representatives_path(), &manifest.representatives_sha256)?;
        let mut members: BTreeMap<ClusterId, BTreeSet<String>> =
            read_verified(&self.members_path(), &manifest.members_sha256)?;

        if manifest.cluster_count != manifest.clusters.len() {
            return Err(StoreError::Format(format!(
                "manifest declares {} clusters but lists {}",
                manifest.cluster_count,
                manifest.clusters.len()
            )));
        }
        check_same_ids(&manifest.clusters, &representatives, REPRESENTATIVES_FILE_NAME)?;
        check_same_ids(&manifest.clusters, &members, MEMBERS_FILE_NAME)?;

        let mut clusters = Vec::with_capacity(manifest.clusters.len());
        for (id, entry) in manifest.clusters {
            let (Some(representative), Some(member_set)) =
                (representatives.remove(&id), members.remove(&id))
            else {
                return Err(StoreError::Format(format!("cluster {id} is incomplete")));
            };
            clusters.push(Cluster {
                id,
                representative: representative.0,
                members: member_set,
                record_indices: entry.record_indices,
                exemplar: entry.exemplar,
                thumbnail: entry.thumbnail,
            });
        }

        let registry = ClusterRegistry::from_clusters(
            clusters,
            manifest.policy,
            manifest.clustering,
            manifest.face_count,
        )
        .map_err(|e| StoreError::Format(e.to_string()))?;
        if !registry.is_empty() && registry.dimension() != manifest.dimension {
            return Err(StoreError::Format(format!(
                "manifest dimension {} does not match representatives ({})",
                manifest.dimension,
                registry.dimension()
            )));
        }
        Ok(registry)
    }

    fn load_members(&self) -> Result<BTreeMap<ClusterId, BTreeSet<String>>, StoreError> {
        json_store::read_json(&self.members_path())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Reads an artifact and checks it is the one the manifest was written with.
fn read_verified<T: serde::de::DeserializeOwned>(
    path: &Path,
    expected_sha256: &str,
) -> Result<T, StoreError> {
    let bytes = json_store::read_bytes(path)?;
    if sha256_hex(&bytes) != expected_sha256 {
        return Err(StoreError::Format(format!(
            "{} does not belong to the build recorded in {MANIFEST_FILE_NAME}",
            path.display()
        )));
    }
    json_store::parse_json(path, &bytes)
}

fn check_same_ids<A, B>(
    manifest: &BTreeMap<ClusterId, A>,
    artifact: &BTreeMap<ClusterId, B>,
    name: &str,
) -> Result<(), StoreError> {
    if manifest.keys().eq(artifact.keys()) {
        Ok(())
    } else {
        Err(StoreError::Format(format!(
            "{name} does not list the same clusters as {MANIFEST_FILE_NAME}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::domain::cluster_assignment::ClusterAssignment;
    use crate::shared::face_record::{BoundingBox, FaceRecord};
    use std::fs;

    fn registry() -> ClusterRegistry {
        let records = vec![
            FaceRecord::new("a.jpg", BoundingBox::new(1.0, 2.0, 30.0, 40.0), vec![0.1, 0.7, 0.3]),
            FaceRecord::new("b.jpg", BoundingBox::new(5.0, 5.0, 9.0, 9.0), vec![0.9, -0.2, 0.1]),
            FaceRecord::new("c.jpg", BoundingBox::new(0.5, 0.5, 8.0, 8.0), vec![0.2, 0.6, 0.35]),
        ];
        let assignment = ClusterAssignment::from_labels([0, 1, 0]);
        ClusterRegistry::build(&records, &assignment, RepresentativePolicy::Centroid)
            .unwrap()
            .with_clustering_params(ClusteringParams::default())
            .with_thumbnails(BTreeMap::from([(0, PathBuf::from("thumbs/person_0.jpg"))]))
    }

    #[test]
    fn test_save_then_load_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("registry"));
        let original = registry();

        store.save(&original).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, original);
        let bits = |r: &ClusterRegistry| {
            r.clusters()
                .flat_map(|c| c.representative.iter().map(|x| x.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&loaded), bits(&original));
    }

    #[test]
    fn test_members_load_on_their_own() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path());
        store.save(&registry()).unwrap();
        fs::remove_file(dir.path().join(REPRESENTATIVES_FILE_NAME)).unwrap();

        let members = store.load_members().unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(
            members[&0].iter().collect::<Vec<_>>(),
            vec!["a.jpg", "c.jpg"]
        );
    }

    #[test]
    fn test_artifacts_are_plain_id_maps() {
        let dir = tempfile::tempdir().unwrap();
        JsonRegistryStore::new(dir.path()).save(&registry()).unwrap();

        let members: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(MEMBERS_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(members["1"], serde_json::json!(["b.jpg"]));

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(MANIFEST_FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(manifest["policy"], "centroid");
        assert_eq!(manifest["cluster_count"], 2);
        assert_eq!(manifest["dimension"], 3);
    }

    #[test]
    fn test_mismatched_artifacts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path());
        store.save(&registry()).unwrap();
        fs::write(
            dir.path().join(MEMBERS_FILE_NAME),
            r#"{"0": ["a.jpg"], "7": ["z.jpg"]}"#,
        )
        .unwrap();

        assert!(matches!(store.load(), Err(StoreError::Format(_))));
    }

    fn other_build() -> ClusterRegistry {
        let records = vec![
            FaceRecord::new("x.jpg", BoundingBox::new(0.0, 0.0, 9.0, 9.0), vec![0.0, 1.0, 0.0]),
            FaceRecord::new("y.jpg", BoundingBox::new(0.0, 0.0, 9.0, 9.0), vec![1.0, 0.0, 0.0]),
        ];
        let assignment = ClusterAssignment::from_labels([0, 1]);
        ClusterRegistry::build(&records, &assignment, RepresentativePolicy::FirstMember).unwrap()
    }

    #[test]
    fn test_save_interrupted_after_representatives_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("live"));
        store.save(&registry()).unwrap();

        // The next build reuses ids 0 and 1; only its first artifact lands.
        let staging = JsonRegistryStore::new(dir.path().join("staging"));
        staging.save(&other_build()).unwrap();
        fs::copy(
            staging.dir().join(REPRESENTATIVES_FILE_NAME),
            store.dir().join(REPRESENTATIVES_FILE_NAME),
        )
        .unwrap();

        assert!(matches!(store.load(), Err(StoreError::Format(_))));
    }

    #[test]
    fn test_save_interrupted_before_manifest_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("live"));
        store.save(&registry()).unwrap();

        let staging = JsonRegistryStore::new(dir.path().join("staging"));
        staging.save(&other_build()).unwrap();
        for name in [REPRESENTATIVES_FILE_NAME, MEMBERS_FILE_NAME] {
            fs::copy(staging.dir().join(name), store.dir().join(name)).unwrap();
        }

        assert!(matches!(store.load(), Err(StoreError::Format(_))));
    }

    #[test]
    fn test_completed_rebuild_replaces_previous_build() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path());
        store.save(&registry()).unwrap();

        store.save(&other_build()).unwrap();

        assert_eq!(store.load().unwrap(), other_build());
    }

    #[test]
    fn test_missing_registry_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("nope"));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_empty_registry_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path());
        let empty = ClusterRegistry::empty(RepresentativePolicy::FirstMember);
        store.save(&empty).unwrap();
        assert_eq!(store.load().unwrap(), empty);
    }
}
