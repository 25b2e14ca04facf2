//! Vector math shared by the orchestrator, the dense index and the experiment.

use crate::error::{HydeError, Result};

/// Cosine similarity between two vectors of equal length.
///
/// Returns 0.0 when either vector has zero magnitude. The result is clamped to
/// [-1, 1] so rounding never pushes a self-comparison above 1.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same length for cosine similarity");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)).clamp(-1.0, 1.0)
}

/// Checked cosine similarity: errors on dimension mismatch instead of asserting.
pub fn try_cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(HydeError::InvalidInput(format!(
            "Cannot compare vectors of dimension {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(cosine_similarity(a, b))
}

/// Component-wise arithmetic mean of a non-empty set of equal-length vectors.
pub fn mean(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| HydeError::InvalidInput("Cannot combine an empty vector set".to_string()))?;
    let dim = first.len();

    let mut sum = vec![0.0f64; dim];
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(HydeError::InvalidInput(format!(
                "Vector {} has dimension {}, expected {}",
                i,
                v.len(),
                dim
            )));
        }
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += f64::from(*x);
        }
    }

    let n = vectors.len() as f64;
    Ok(sum.into_iter().map(|s| (s / n) as f32).collect())
}
