//! Vector value validation.

use crate::error::{IndexError, IndexResult};

/// Largest squared L2 norm a vector may have.
///
/// For two vectors within this bound the squared Euclidean distance stays
/// below `4 * MAX_SQUARED_NORM`, which is finite in `f32`, and so do the
/// norms and dot product used by cosine distance.
pub const MAX_SQUARED_NORM: f64 = 4.0e37;

/// Check that a vector is non-empty, every component is finite and its
/// magnitude is within [`MAX_SQUARED_NORM`].
///
/// NaN would break the total order used by search, so it is rejected at the
/// boundary rather than tolerated inside the graph. Oversized magnitudes are
/// rejected because two overflowing distances both become infinity and then
/// compare equal.
///
/// # Errors
///
/// Returns [`IndexError::InvalidDimension`] for an empty slice and
/// [`IndexError::InvalidValue`] for the first NaN or infinite component, or
/// for the largest component of a vector whose norm is too large.
pub fn validate_values(values: &[f32]) -> IndexResult<()> {
    if values.is_empty() {
        return Err(IndexError::InvalidDimension { expected: 1, actual: 0 });
    }

    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(IndexError::InvalidValue {
            index,
            value,
            reason: if value.is_nan() {
                "NaN values are not allowed"
            } else {
                "Infinite values are not allowed"
            },
        });
    }

    let squared_norm: f64 = values.iter().map(|&v| f64::from(v) * f64::from(v)).sum();
    if squared_norm > MAX_SQUARED_NORM {
        let (index, &value) = values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .unwrap_or((0, &values[0]));
        return Err(IndexError::InvalidValue { index, value, reason: "Vector magnitude too large" });
    }

    Ok(())
}
