//! Model parameters: the immutable coefficient bundle shared by every quote.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a coefficient violates the model's positivity or finiteness invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{name} must be strictly positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be finite (got {value})")]
    NotFinite { name: &'static str, value: f64 },
}

/// Risk and behavioral coefficients of the quoting model.
///
/// Validated once at construction: `gamma`, `A` and `k_paper` are strictly
/// positive and every coefficient is finite. Fields are private so a value of
/// this type always satisfies those invariants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModelParameters", into = "RawModelParameters")]
pub struct ModelParameters {
    gamma: f64,
    a: f64,
    k_paper: f64,
    beta_0: f64,
    beta_1: f64,
    beta_2: f64,
}

impl ModelParameters {
    pub fn new(
        gamma: f64,
        a: f64,
        k_paper: f64,
        beta_0: f64,
        beta_1: f64,
        beta_2: f64,
    ) -> Result<Self, ParamError> {
        for (name, value) in [
            ("gamma", gamma),
            ("A", a),
            ("k_paper", k_paper),
            ("beta_0", beta_0),
            ("beta_1", beta_1),
            ("beta_2", beta_2),
        ] {
            if !value.is_finite() {
                return Err(ParamError::NotFinite { name, value });
            }
        }
        for (name, value) in [("gamma", gamma), ("A", a), ("k_paper", k_paper)] {
            if value <= 0.0 {
                return Err(ParamError::NotPositive { name, value });
            }
        }
        Ok(Self {
            gamma,
            a,
            k_paper,
            beta_0,
            beta_1,
            beta_2,
        })
    }

    /// Risk aversion.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Base order-arrival intensity.
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Demand decay with quoted distance.
    pub fn k_paper(&self) -> f64 {
        self.k_paper
    }

    pub fn beta_0(&self) -> f64 {
        self.beta_0
    }

    pub fn beta_1(&self) -> f64 {
        self.beta_1
    }

    pub fn beta_2(&self) -> f64 {
        self.beta_2
    }

    /// Theoretical arrival intensity at `delta` price units from the reservation
    /// price: `A * exp(-k_paper * delta)`.
    pub fn arrival_intensity(&self, delta: f64) -> f64 {
        self.a * (-self.k_paper * delta.max(0.0)).exp()
    }
}

impl Default for ModelParameters {
    /// Desk defaults: slow inventory unwind, sigmoid(0) = 50% intercept.
    fn default() -> Self {
        Self {
            gamma: 0.001,
            a: 0.5,
            k_paper: 1.0,
            beta_0: 0.0,
            beta_1: -0.5,
            beta_2: -0.0001,
        }
    }
}

/// Unvalidated wire form used by serde. Omitted fields take the defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct RawModelParameters {
    gamma: f64,
    #[serde(rename = "A", alias = "a")]
    a: f64,
    k_paper: f64,
    beta_0: f64,
    beta_1: f64,
    beta_2: f64,
}

impl Default for RawModelParameters {
    fn default() -> Self {
        ModelParameters::default().into()
    }
}

impl TryFrom<RawModelParameters> for ModelParameters {
    type Error = ParamError;

    fn try_from(raw: RawModelParameters) -> Result<Self, Self::Error> {
        Self::new(
            raw.gamma, raw.a, raw.k_paper, raw.beta_0, raw.beta_1, raw.beta_2,
        )
    }
}

impl From<ModelParameters> for RawModelParameters {
    fn from(p: ModelParameters) -> Self {
        Self {
            gamma: p.gamma,
            a: p.a,
            k_paper: p.k_paper,
            beta_0: p.beta_0,
            beta_1: p.beta_1,
            beta_2: p.beta_2,
        }
    }
}
