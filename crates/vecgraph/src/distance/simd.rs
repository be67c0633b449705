//! Distance kernels on `wide::f32x8` lanes.
//!
//! Inputs are consumed eight floats at a time through `chunks_exact`; the
//! remainder is folded in scalar.

use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn lane(chunk: &[f32]) -> f32x8 {
    let arr: [f32; LANES] = chunk.try_into().unwrap_or([0.0; LANES]);
    f32x8::new(arr)
}

#[inline]
fn reduce(v: f32x8) -> f32 {
    v.to_array().iter().sum()
}

/// Squared Euclidean (L2) distance.
///
/// Debug-panics if the slices differ in length.
#[inline]
#[must_use]
pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");

    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    let mut acc = f32x8::ZERO;
    for (ca, cb) in a_chunks.zip(b_chunks) {
        let diff = lane(ca) - lane(cb);
        acc += diff * diff;
    }
    reduce(acc) + tail
}

/// Dot product.
///
/// Debug-panics if the slices differ in length.
#[inline]
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");

    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let tail: f32 = a_chunks.remainder().iter().zip(b_chunks.remainder()).map(|(x, y)| x * y).sum();

    let mut acc = f32x8::ZERO;
    for (ca, cb) in a_chunks.zip(b_chunks) {
        acc += lane(ca) * lane(cb);
    }
    reduce(acc) + tail
}

/// Squared L2 norm.
#[inline]
#[must_use]
pub fn sum_of_squares(v: &[f32]) -> f32 {
    let chunks = v.chunks_exact(LANES);
    let tail: f32 = chunks.remainder().iter().map(|x| x * x).sum();

    let mut acc = f32x8::ZERO;
    for c in chunks {
        let x = lane(c);
        acc += x * x;
    }
    reduce(acc) + tail
}
