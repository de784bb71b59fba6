pub mod corpus_store;
pub mod embedding_repository;
