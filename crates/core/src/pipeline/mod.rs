pub mod cluster_corpus_use_case;
pub mod extract_thumbnails_use_case;
pub mod face_search_service;
pub mod infrastructure;
pub mod ingest_corpus_use_case;
pub mod pipeline_logger;
#[cfg(test)]
mod test_support;
