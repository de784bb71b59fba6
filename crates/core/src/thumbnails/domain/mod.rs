pub mod thumbnail_extractor;
