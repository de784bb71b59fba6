use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::registry::domain::representative_policy::RepresentativePolicy;

/// Current registry, replaceable while queries are in flight.
///
/// Readers hold an `Arc` to a complete snapshot for as long as they need
/// it; a rebuild publishes a new snapshot in one pointer swap, so no reader
/// sees clusters from two builds.
pub struct RegistryHandle {
    current: ArcSwap<ClusterRegistry>,
}

impl RegistryHandle {
    pub fn new(registry: ClusterRegistry) -> Self {
        Self {
            current: ArcSwap::from_pointee(registry),
        }
    }

    pub fn snapshot(&self) -> Arc<ClusterRegistry> {
        self.current.load_full()
    }

    /// Swaps in `registry` and returns the snapshot it replaced.
    pub fn publish(&self, registry: ClusterRegistry) -> Arc<ClusterRegistry> {
        self.current.swap(Arc::new(registry))
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(ClusterRegistry::empty(RepresentativePolicy::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::domain::cluster_assignment::ClusterAssignment;
    use crate::shared::face_record::{BoundingBox, FaceRecord};
    use std::thread;

    /// Registry whose every representative is filled with `generation`.
    fn generation(generation: f32, clusters: usize) -> ClusterRegistry {
        let records: Vec<FaceRecord> = (0..clusters)
            .map(|i| {
                FaceRecord::new(
                    format!("{i}.jpg"),
                    BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                    vec![generation; 4],
                )
            })
            .collect();
        let assignment = ClusterAssignment::from_labels(0..clusters as u32);
        ClusterRegistry::build(&records, &assignment, RepresentativePolicy::FirstMember)
            .unwrap()
    }

    #[test]
    fn test_default_is_empty() {
        assert!(RegistryHandle::default().snapshot().is_empty());
    }

    #[test]
    fn test_publish_returns_previous() {
        let handle = RegistryHandle::new(generation(1.0, 2));
        let old = handle.publish(generation(2.0, 3));
        assert_eq!(old.len(), 2);
        assert_eq!(handle.snapshot().len(), 3);
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let handle = RegistryHandle::new(generation(1.0, 2));
        let held = handle.snapshot();
        handle.publish(generation(2.0, 5));
        assert_eq!(held.len(), 2);
        assert!(held.clusters().all(|c| c.representative[0] == 1.0));
    }

    #[test]
    fn test_readers_never_see_mixed_builds() {
        let handle = RegistryHandle::new(generation(0.0, 8));

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = handle.snapshot();
                        let first = snapshot.get(0).unwrap().representative[0];
                        assert!(snapshot.clusters().all(|c| c.representative[0] == first));
                        assert_eq!(snapshot.len(), 8 + first as usize);
                    }
                });
            }
            s.spawn(|| {
                for g in 1..50 {
                    handle.publish(generation(g as f32, 8 + g));
                }
            });
        });

        assert_eq!(handle.snapshot().len(), 8 + 49);
    }
}
