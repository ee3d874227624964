#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vectors must have at least one dimension")]
    EmptyVector,
}

/// One search result: the insertion position of the stored vector and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub score: f32,
}

/// Fixed-dimension vector index answering k-nearest queries.
///
/// Positions are assigned in insertion order starting at zero and never change.
pub trait VectorIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors, assigning consecutive positions.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if any vector has the wrong
    /// length; nothing is added in that case.
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), IndexError>;

    /// Return up to `k` hits, best first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong length.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;
}

/// Exhaustive inner-product index over a flat row-major buffer.
///
/// Ties keep insertion order.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyVector`] if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::EmptyVector);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    fn check(&self, actual: usize) -> Result<(), IndexError> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            })
        }
    }
}

impl VectorIndex for FlatIpIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), IndexError> {
        for v in &vectors {
            self.check(v.len())?;
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.check(query.len())?;
        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| SearchHit {
                position,
                score: scriptor_llm::embedding::dot(row, query),
            })
            .collect();
        // sort_by is stable, so equal scores stay in insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
