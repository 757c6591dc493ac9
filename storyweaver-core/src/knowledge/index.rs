//! Exact nearest-neighbour search over a handful of vectors.

use super::KnowledgeError;
use std::collections::HashSet;

/// A ranked match returned by a [`VectorIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub text: String,
    pub similarity: f32,
}

/// A store of `(id, vector, text)` triples answering top-k similarity queries.
///
/// Results are ordered by descending similarity; equal scores keep insertion
/// order.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and queried vector must have.
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), KnowledgeError>;

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, KnowledgeError>;
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    text: String,
    vector: Vec<f32>,
}

/// Brute-force cosine index held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), KnowledgeError> {
        if vector.len() != self.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for InMemoryIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn add(&mut self, id: &str, vector: Vec<f32>, text: &str) -> Result<(), KnowledgeError> {
        self.check_dimension(&vector)?;
        if !self.ids.insert(id.to_string()) {
            return Err(KnowledgeError::DuplicateId(id.to_string()));
        }
        self.entries.push(IndexEntry {
            id: id.to_string(),
            text: text.to_string(),
            vector,
        });
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, KnowledgeError> {
        if k == 0 {
            return Err(KnowledgeError::InvalidK);
        }
        self.check_dimension(vector)?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(vector, &entry.vector)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, similarity)| {
                let entry = &self.entries[i];
                IndexHit {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    similarity,
                }
            })
            .collect())
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// Returns 0.0 when the lengths differ, either vector has zero norm, or a
/// component is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom <= f64::EPSILON {
        return 0.0;
    }
    let similarity = (dot / denom) as f32;
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}
