//! L2 normalization of accumulated feature vectors.

/// Euclidean norm, accumulated in `f64`.
pub fn l2_norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Rescales `vector` to unit length in place.
///
/// The zero vector is returned unchanged: it means "no comparable content" and
/// is never matched by the ranker.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    // Divide in f32 by the f32-rounded norm so output matches vectors written
    // by earlier float32 pipelines bit for bit.
    let norm = l2_norm(&vector) as f32;
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

/// True when every component is zero.
pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|&x| x == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_to_unit_length() {
        let v = normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_left_alone() {
        let v = normalize(vec![0.0; 8]);
        assert!(is_zero(&v));
        assert_eq!(v.len(), 8);
    }
}
