//! The loaded, read-only knowledge store.

use super::index::{InMemoryIndex, VectorIndex};
use super::KnowledgeError;
use crate::services::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A reference passage before it has been embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A reference passage with its embedding attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// One document returned by a similarity query.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedDocument<'a> {
    pub document: &'a KnowledgeDocument,
    pub similarity: f32,
}

/// Documents ranked by descending similarity, at most `k` long.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult<'a> {
    pub matches: Vec<RetrievedDocument<'a>>,
}

impl<'a> RetrievalResult<'a> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievedDocument<'a>> {
        self.matches.iter()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.matches.iter().map(|m| m.document.id.as_str()).collect()
    }
}

/// Fixed set of embedded documents answering top-k similarity queries.
///
/// The store is immutable once loaded. Loading is all-or-nothing: if any
/// document fails to embed, no store is produced.
pub struct KnowledgeStore<I: VectorIndex = InMemoryIndex> {
    documents: Vec<KnowledgeDocument>,
    positions: HashMap<String, usize>,
    index: I,
}

impl KnowledgeStore<InMemoryIndex> {
    /// Embed `documents` and build an in-memory store of the given dimension.
    pub async fn load(
        documents: Vec<SourceDocument>,
        embedder: &dyn Embedder,
        dimension: usize,
    ) -> Result<Self, KnowledgeError> {
        Self::load_into(InMemoryIndex::new(dimension), documents, embedder).await
    }

    /// Build a store from documents whose embeddings are already known.
    pub fn from_embedded(
        documents: Vec<KnowledgeDocument>,
        dimension: usize,
    ) -> Result<Self, KnowledgeError> {
        Self::build(InMemoryIndex::new(dimension), documents)
    }
}

impl<I: VectorIndex> KnowledgeStore<I> {
    /// Embed `documents` and add them to an empty `index`.
    pub async fn load_into(
        index: I,
        documents: Vec<SourceDocument>,
        embedder: &dyn Embedder,
    ) -> Result<Self, KnowledgeError> {
        let dimension = index.dimension();
        if let Some(advertised) = embedder.dimension() {
            if advertised != dimension {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: dimension,
                    actual: advertised,
                });
            }
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| KnowledgeError::EmbeddingUnavailable {
                reason: e.to_string(),
            })?;

        if vectors.len() != documents.len() {
            return Err(KnowledgeError::EmbeddingUnavailable {
                reason: format!(
                    "expected {} embeddings, got {}",
                    documents.len(),
                    vectors.len()
                ),
            });
        }

        let mut embedded = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents.into_iter().zip(vectors) {
            if embedding.len() != dimension {
                return Err(KnowledgeError::EmbeddingUnavailable {
                    reason: format!(
                        "document {} embedded to dimension {}, expected {}",
                        doc.id,
                        embedding.len(),
                        dimension
                    ),
                });
            }
            embedded.push(KnowledgeDocument {
                id: doc.id,
                text: doc.text,
                embedding,
            });
        }

        let store = Self::build(index, embedded)?;
        tracing::info!(documents = store.len(), dimension, "knowledge store loaded");
        Ok(store)
    }

    fn build(mut index: I, documents: Vec<KnowledgeDocument>) -> Result<Self, KnowledgeError> {
        let mut positions = HashMap::with_capacity(documents.len());
        for (i, doc) in documents.iter().enumerate() {
            if positions.insert(doc.id.clone(), i).is_some() {
                return Err(KnowledgeError::DuplicateId(doc.id.clone()));
            }
            index.add(&doc.id, doc.embedding.clone(), &doc.text)?;
        }

        Ok(Self {
            documents,
            positions,
            index,
        })
    }

    /// Return the `k` documents most similar to `query`.
    ///
    /// Fewer than `k` documents are returned only when the store holds fewer.
    pub fn query(&self, query: &[f32], k: usize) -> Result<RetrievalResult<'_>, KnowledgeError> {
        let hits = self.index.query(query, k)?;

        let matches = hits
            .into_iter()
            .filter_map(|hit| {
                let position = *self.positions.get(&hit.id)?;
                Some(RetrievedDocument {
                    document: &self.documents[position],
                    similarity: hit.similarity,
                })
            })
            .collect();

        Ok(RetrievalResult { matches })
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in load order.
    pub fn documents(&self) -> &[KnowledgeDocument] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeDocument> {
        self.positions.get(id).map(|&i| &self.documents[i])
    }
}
