//! Short-horizon volatility proxy derived from the intraday high/low range.

use serde::{Deserialize, Serialize};

use crate::domain::MarketSnapshot;

/// Lower bound on the volatility proxy, in price units.
///
/// Keeps the volatility term of the spread and the inventory skew defined
/// for flat-range snapshots (high == low).
pub const SIGMA_FLOOR: f64 = 1e-8;

/// Upper bound on the volatility proxy, in price units.
///
/// A range whose `high / low` ratio overflows is priced at this ceiling
/// rather than falling through to the floor. `sigma²` stays finite.
pub const SIGMA_CEILING: f64 = 1e150;

/// sqrt(4 ln 2), the Parkinson range normaliser.
const PARKINSON_DENOM: f64 = 1.665_109_222_315_395_4;

/// Range-based volatility estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolatilityProxy {
    /// Parkinson single-bar estimator scaled back to price units:
    /// `mid * ln(high / low) / sqrt(4 ln 2)`.
    #[default]
    Parkinson,
    /// Raw range scaled by a constant: `(high - low) * scale`.
    RelativeRange { scale: f64 },
}

impl VolatilityProxy {
    /// Volatility in price units, clamped to [`SIGMA_FLOOR`, `SIGMA_CEILING`].
    ///
    /// Assumes the snapshot has already been validated.
    pub fn sigma(&self, snapshot: &MarketSnapshot) -> f64 {
        let raw = match *self {
            VolatilityProxy::Parkinson if snapshot.low > 0.0 => {
                snapshot.mid * (snapshot.high / snapshot.low).ln() / PARKINSON_DENOM
            }
            // log range undefined at a zero low
            VolatilityProxy::Parkinson => snapshot.high - snapshot.low,
            VolatilityProxy::RelativeRange { scale } => (snapshot.high - snapshot.low) * scale,
        };
        if raw.is_nan() {
            SIGMA_FLOOR
        } else {
            raw.clamp(SIGMA_FLOOR, SIGMA_CEILING)
        }
    }
}
