//! Vector helpers shared by index-build and query-time embedding.

/// L2-normalize `vector` in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Return an L2-normalized copy of every vector.
#[must_use]
pub fn normalized(mut vectors: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    for v in &mut vectors {
        normalize(v);
    }
    vectors
}

#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
