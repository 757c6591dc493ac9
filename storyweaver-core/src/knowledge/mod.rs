//! Knowledge Store - a small, fixed reference corpus searched by embedding similarity.
//!
//! Documents are embedded once at load time and never change afterwards.
//! Each turn embeds the user's directive and asks the store for the closest
//! passages, which the narrator folds into its prompt.

mod corpus;
mod index;
mod store;

pub use corpus::default_corpus;
pub use index::{cosine_similarity, IndexHit, InMemoryIndex, VectorIndex};
pub use store::{KnowledgeDocument, KnowledgeStore, RetrievalResult, RetrievedDocument, SourceDocument};

use thiserror::Error;

/// Errors from loading or querying the knowledge store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum KnowledgeError {
    #[error("Embedding unavailable: {reason}")]
    EmbeddingUnavailable { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate document id: {0}")]
    DuplicateId(String),

    #[error("k must be at least 1")]
    InvalidK,
}
