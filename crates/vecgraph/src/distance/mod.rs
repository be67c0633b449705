//! Distance functions for vector similarity.
//!
//! By default the kernels use `wide` for portable SIMD (SSE/AVX, NEON,
//! SIMD128). Enable the `scalar` feature to force plain loops, which is
//! handy when validating the SIMD path.

#[cfg(not(feature = "scalar"))]
mod simd;

#[cfg(feature = "scalar")]
mod scalar;

#[cfg(not(feature = "scalar"))]
pub use simd::{dot_product, euclidean_distance_squared, sum_of_squares};

#[cfg(feature = "scalar")]
pub use scalar::{dot_product, euclidean_distance_squared, sum_of_squares};

use serde::{Deserialize, Serialize};

/// Distance metric used by an index.
///
/// Smaller is always closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance. The square root is never taken since it
    /// does not change the ordering.
    #[default]
    Euclidean,
    /// Angular distance, `1 - cos(a, b)`, in `[0, 2]`.
    Cosine,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors using this metric.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Euclidean => euclidean_distance_squared(a, b),
            Self::Cosine => cosine_distance(a, b),
        }
    }

    /// Stable tag used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Cosine => "cosine",
        }
    }
}

/// Cosine distance, `1 - cosine similarity`.
///
/// Zero-magnitude vectors are treated as orthogonal to everything
/// (distance 1). The result is clamped to `[0, 2]`.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    // Each norm on its own: the product of two squared norms overflows long
    // before either norm does.
    let norm = sum_of_squares(a).sqrt() * sum_of_squares(b).sqrt();
    if norm == 0.0 {
        return 1.0;
    }
    (1.0 - dot_product(a, b) / norm).clamp(0.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_euclidean_is_squared() {
        let d = DistanceMetric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 25.0).abs() < EPSILON);
    }

    #[test]
    fn test_cosine() {
        let same = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[5.0, 0.0]);
        let orth = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[0.0, 2.0]);
        let opposite = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[-1.0, 0.0]);

        assert!(same.abs() < EPSILON);
        assert!((orth - 1.0).abs() < EPSILON);
        assert!((opposite - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_cosine_large_magnitudes() {
        let opposite = cosine_distance(&[1e18, 0.0], &[-1e18, 0.0]);
        let orth = cosine_distance(&[0.0, 1e18], &[-1e18, 0.0]);
        assert!((opposite - 2.0).abs() < EPSILON);
        assert!((orth - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_euclidean_near_magnitude_bound() {
        let far = DistanceMetric::Euclidean.distance(&[6e18, 0.0], &[-6e18, 0.0]);
        let near = DistanceMetric::Euclidean.distance(&[-5e18, 0.0], &[-6e18, 0.0]);
        assert!(far.is_finite());
        assert!(near < far);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_default_metric() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Euclidean);
        assert_eq!(DistanceMetric::Cosine.name(), "cosine");
    }
}
