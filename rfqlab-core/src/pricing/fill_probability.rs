//! Logistic fill-probability link.

use crate::domain::ModelParameters;

/// Logistic function evaluated without overflow for any finite or infinite input.
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// `sigmoid(beta_0 + beta_1 * spread_bps + beta_2 * size)`.
pub fn fill_probability(params: &ModelParameters, spread_bps: f64, size: f64) -> f64 {
    let z = params.beta_0() + params.beta_1() * spread_bps + params.beta_2() * size;
    logistic(z)
}
