pub mod json_registry_store;
