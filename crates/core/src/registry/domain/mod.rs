pub mod cluster;
pub mod cluster_registry;
pub mod registry_handle;
pub mod registry_store;
pub mod representative_policy;
