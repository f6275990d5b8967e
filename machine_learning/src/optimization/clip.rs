/// Returns the euclidean norm of a flat gradient.
pub fn grad_norm(grad: &[f32]) -> f32 {
    grad.iter().map(|g| g * g).sum::<f32>().sqrt()
}

/// Rescales `grad` in place so its global norm doesn't exceed `max_norm`.
///
/// # Arguments
/// * `grad` - The flat gradient of every parameter.
/// * `max_norm` - The maximum allowed norm.
///
/// # Returns
/// The norm the gradient had before clipping.
pub fn clip_grad_norm(grad: &mut [f32], max_norm: f32) -> f32 {
    let norm = grad_norm(grad);
    let coef = max_norm / (norm + 1e-6);

    if coef < 1. {
        grad.iter_mut().for_each(|g| *g *= coef);
    }

    norm
}
