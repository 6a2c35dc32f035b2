//! Flat vector index: exact k-NN by cosine similarity.
//!
//! Vectors are L2-normalized once when the index is built and stored
//! contiguously (`n × d` floats). A query is normalized on every call and
//! ranked against all entries by squared Euclidean distance; on unit vectors
//! `‖a - b‖² = 2 - 2·cos(a, b)`, so ascending distance is descending cosine.

use docqa_core::error::{DocQaError, Result};

/// One search result. `position` is the join key into the metadata store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    /// Squared L2 distance between unit vectors, in `[0, 4]`.
    pub distance: f32,
    /// Cosine similarity, `1 - distance / 2`.
    pub score: f32,
}

/// Append-only flat index of unit vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    data: Vec<f32>,
}

/// Scale `v` to unit L2 norm in place.
///
/// Zero and non-finite norms are rejected: a zero vector has no direction,
/// so its cosine similarity to anything is undefined.
pub fn normalize(v: &mut [f32]) -> Result<()> {
    let norm = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(DocQaError::ZeroVector { position: None });
    }
    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Ok(())
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl VectorIndex {
    /// Build an index from raw embeddings. The first vector fixes the dimension.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(dimensions * vectors.len());

        for (position, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimensions {
                return Err(DocQaError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector).map_err(|_| DocQaError::ZeroVector {
                position: Some(position),
            })?;
            data.extend_from_slice(&vector);
        }

        Ok(Self { dimensions, data })
    }

    /// Rebuild from vectors that were already normalized (persisted data).
    /// Stored bits are kept as-is so a reload searches identically.
    pub fn from_unit_vectors(dimensions: usize, data: Vec<f32>) -> Result<Self> {
        if dimensions == 0 {
            if !data.is_empty() {
                return Err(DocQaError::CorruptIndex(
                    "vector data present for a zero-dimension index".into(),
                ));
            }
            return Ok(Self::default());
        }
        if data.len() % dimensions != 0 {
            return Err(DocQaError::CorruptIndex(format!(
                "{} floats is not a multiple of dimension {dimensions}",
                data.len()
            )));
        }
        Ok(Self { dimensions, data })
    }

    /// Exact k nearest neighbours of `query`, best first.
    ///
    /// Equal distances keep insertion order, so repeated queries return the
    /// same ranking.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(DocQaError::InvalidTopK);
        }
        if self.is_empty() {
            return Err(DocQaError::EmptyIndex);
        }
        if query.len() != self.dimensions {
            return Err(DocQaError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut q = query.to_vec();
        normalize(&mut q)?;

        let mut ranked: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimensions)
            .map(|v| squared_l2(&q, v))
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(position, distance)| SearchHit {
                position,
                distance,
                score: 1.0 - distance / 2.0,
            })
            .collect())
    }

    /// All stored unit vectors in position order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0; an empty index yields nothing either way.
        self.data.chunks_exact(self.dimensions.max(1))
    }

    /// Dimension `d`, or 0 for an index built from no vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        if self.dimensions == 0 { 0 } else { self.data.len() / self.dimensions }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
