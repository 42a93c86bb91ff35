//! Similarity computation for embeddings.

use ordered_float::OrderedFloat;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors
/// - -1.0 means opposite vectors
///
/// Both vectors must be non-empty and of equal length. A zero vector on
/// either side yields 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() || a.is_empty() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Find the `k` candidates most similar to `query`, scored by cosine
/// similarity and sorted descending.
///
/// Ties keep the candidates' original order (the sort is stable). Fails
/// with `DimensionMismatch` if any candidate's length differs from the
/// query's.
pub fn top_k(
    query: &Embedding,
    candidates: &[(String, Embedding)],
    k: usize,
) -> Result<Vec<(String, f32)>> {
    let mut scores: Vec<(String, f32)> = Vec::with_capacity(candidates.len());

    for (id, embedding) in candidates {
        let score = cosine_similarity(query, embedding)?;
        scores.push((id.clone(), score));
    }

    scores.sort_by_key(|(_, score)| std::cmp::Reverse(OrderedFloat(*score)));
    scores.truncate(k);

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_symmetric() {
        let a = vec![0.2, -0.4, 0.9];
        let b = vec![0.5, 0.1, -0.3];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_empty_vectors_rejected() {
        let empty: Vec<f32> = Vec::new();
        assert!(cosine_similarity(&empty, &empty).is_err());
    }

    #[test]
    fn test_top_k() {
        let query = vec![1.0, 0.0, 0.0];
        let candidates = vec![
            ("a".to_string(), vec![1.0, 0.0, 0.0]), // similarity 1.0
            ("b".to_string(), vec![0.0, 1.0, 0.0]), // similarity 0.0
            ("c".to_string(), vec![0.7, 0.7, 0.0]), // similarity ~0.7
        ];

        let results = top_k(&query, &candidates, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "c");
    }

    #[test]
    fn test_top_k_ties_keep_scan_order() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            ("first".to_string(), vec![0.0, 1.0]),
            ("second".to_string(), vec![0.0, 2.0]),
            ("best".to_string(), vec![1.0, 0.0]),
        ];

        let results = top_k(&query, &candidates, 3).unwrap();
        assert_eq!(results[0].0, "best");
        assert_eq!(results[1].0, "first");
        assert_eq!(results[2].0, "second");
    }
}
