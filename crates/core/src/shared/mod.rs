pub mod config;
pub mod constants;
pub mod embedding;
pub mod exact_float;
pub mod face_record;
pub mod json_store;
pub mod raster;
