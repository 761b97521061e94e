//! Vector index contract consumed by ingestion and retrieval, with a
//! Qdrant-backed implementation and an in-memory store for tests.

pub mod memory;
pub mod qdrant;
pub mod vector_store;

pub use memory::InMemoryVectorStore;
pub use qdrant::QdrantStore;
pub use vector_store::{
    FieldCondition, FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore,
    VectorStoreError,
};
