//! Gradient clipping utilities

use crate::layers::parameter::Parameter;

/// Clip gradients by global norm
///
/// Computes the global norm of all gradients and scales them down if the norm
/// exceeds `max_norm`, preserving the relative magnitudes across parameters.
///
/// Returns the global norm before clipping.
pub fn clip_grad_norm(params: &mut [&mut Parameter], max_norm: f64) -> f64 {
    let global_norm = params.iter().map(|p| p.grad.squared_norm()).sum::<f64>().sqrt();

    if global_norm > max_norm {
        let clip_coef = max_norm / (global_norm + 1e-6);
        for p in params.iter_mut() {
            p.grad.scale_in_place(clip_coef);
        }
    }

    global_norm
}
