// src/vector/mod.rs

//! Pure vector math for similarity ranking.
//!
//! All functions are side-effect free and total over same-length inputs.
//! Zero-magnitude vectors produce 0.0 similarity instead of NaN so a
//! degenerate feature vector can never poison a ranking.

use crate::core::VectorError;

/// Scale to unit length. An all-zero vector stays all-zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mag = magnitude(v);
    if mag == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / mag).collect()
}

pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity in [-1, 1]. Returns 0.0 when either magnitude is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    let dot = dot_product(a, b)?;
    let norm_a = magnitude(a);
    let norm_b = magnitude(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

/// Cosine similarity after element-wise multiplying both vectors by
/// `weights`, so high-weight dimensions dominate the angle.
pub fn weighted_cosine_similarity(
    a: &[f32],
    b: &[f32],
    weights: &[f32],
) -> Result<f32, VectorError> {
    if a.len() != weights.len() {
        return Err(VectorError::DimensionMismatch {
            left: a.len(),
            right: weights.len(),
        });
    }
    let wa: Vec<f32> = a.iter().zip(weights.iter()).map(|(x, w)| x * w).collect();
    let wb: Vec<f32> = b.iter().zip(weights.iter()).map(|(x, w)| x * w).collect();
    cosine_similarity(&wa, &wb)
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, VectorError> {
    if a.len() != b.len() {
        return Err(VectorError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt())
}

pub fn mean(v: &[f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f32>() / v.len() as f32
}

pub fn std_deviation(v: &[f32]) -> f32 {
    if v.is_empty() {
        return 0.0;
    }
    let m = mean(v);
    let variance = v.iter().map(|x| (x - m).powi(2)).sum::<f32>() / v.len() as f32;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_self_is_one() {
        let v = vec![0.3, 0.7, 0.1, 0.9];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let v = vec![0.5, 0.5, 0.5];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn weighted_cosine_of_identical_vectors_is_one() {
        let v = vec![0.2, 0.8, 0.5, 0.1];
        let weights = vec![1.0, 2.0, 1.5, 0.8];
        let sim = weighted_cosine_similarity(&v, &v, &weights).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(
            dot_product(&a, &b),
            Err(VectorError::DimensionMismatch { left: 2, right: 3 })
        );
        assert!(cosine_similarity(&a, &b).is_err());
        assert!(euclidean_distance(&a, &b).is_err());
    }

    #[test]
    fn normalize_zero_vector_stays_zero() {
        let zero = vec![0.0, 0.0];
        let n = normalize(&zero);
        assert_eq!(n, zero);
        assert!(!n.iter().any(|x| x.is_nan()));
    }

    #[test]
    fn normalize_produces_unit_length() {
        let v = vec![3.0, 4.0];
        let n = normalize(&v);
        assert!((magnitude(&n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn euclidean_distance_basic() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn mean_and_std_deviation() {
        let v = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-6);
        assert!((std_deviation(&v) - 2.0).abs() < 1e-6);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_deviation(&[]), 0.0);
    }
}
