pub mod json_corpus_store;
