use std::collections::{BTreeMap, BTreeSet};

use crate::clustering::domain::cluster_assignment::ClusterId;
use crate::registry::domain::cluster_registry::ClusterRegistry;
use crate::shared::json_store::StoreError;

/// Durable home for a built registry.
///
/// Representatives and member sets are kept as separate artifacts so a
/// gallery can list members without loading any vectors.
pub trait RegistryStore: Send + Sync {
    fn save(&self, registry: &ClusterRegistry) -> Result<(), StoreError>;

    fn load(&self) -> Result<ClusterRegistry, StoreError>;

    fn load_members(&self) -> Result<BTreeMap<ClusterId, BTreeSet<String>>, StoreError>;
}
