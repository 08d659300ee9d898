//! Pricing engine: inventory-aware optimal quoting for a single RFQ.
//!
//! Pure functions of (parameters, snapshot, inventory, RFQ). Each call:
//!
//! 1. Derives a volatility proxy `sigma` from the intraday range
//! 2. Skews the reservation price away from mid by `inventory * gamma * sigma²`
//! 3. Adds the closed-form optimal half-spread on the dealer's side
//! 4. Maps the resulting distance from mid to a logistic fill probability

pub mod fill_probability;
pub mod pricer;
pub mod volatility;

pub use fill_probability::{fill_probability, logistic};
pub use pricer::RfqPricer;
pub use volatility::{VolatilityProxy, SIGMA_CEILING, SIGMA_FLOOR};

use crate::domain::{
    DealerSide, InventoryState, MarketSnapshot, ModelParameters, QuoteResult, RfqEvent,
    SnapshotError,
};

const BPS: f64 = 10_000.0;

/// Requested sizes must be finite and non-negative.
pub fn validate_size(size: f64) -> Result<(), SnapshotError> {
    if !size.is_finite() || size < 0.0 {
        return Err(SnapshotError::InvalidSize(size));
    }
    Ok(())
}

/// Price an RFQ with the default (Parkinson) volatility proxy.
pub fn quote(
    params: &ModelParameters,
    snapshot: &MarketSnapshot,
    inventory: InventoryState,
    event: &RfqEvent,
) -> Result<QuoteResult, SnapshotError> {
    quote_with_proxy(
        params,
        VolatilityProxy::default(),
        snapshot,
        inventory,
        event,
    )
}

/// Price an RFQ with an explicit volatility proxy.
pub fn quote_with_proxy(
    params: &ModelParameters,
    proxy: VolatilityProxy,
    snapshot: &MarketSnapshot,
    inventory: InventoryState,
    event: &RfqEvent,
) -> Result<QuoteResult, SnapshotError> {
    snapshot.validate()?;
    validate_size(event.size)?;

    let mid = snapshot.mid;
    let sigma = proxy.sigma(snapshot);
    let sigma_sq = sigma * sigma;

    let inventory_skew = inventory.position * params.gamma() * sigma_sq;
    let reservation_price = mid - inventory_skew;
    let half_spread = optimal_half_spread(params, sigma);

    let dealer_side = event.client_side.dealer_side();
    let quoted_price = match dealer_side {
        DealerSide::Sell => reservation_price + half_spread,
        DealerSide::Buy => reservation_price - half_spread,
    };

    let spread_bps = (quoted_price - mid).abs() / mid * BPS;
    let fill_probability = fill_probability(params, spread_bps, event.size);
    let edge = dealer_side.edge_sign() * (quoted_price - mid);

    Ok(QuoteResult {
        dealer_side,
        size: event.size,
        sigma,
        inventory_skew,
        reservation_price,
        quoted_price,
        half_spread,
        half_spread_bps: half_spread / mid * BPS,
        spread_bps,
        fill_probability,
        expected_pnl: fill_probability * edge * event.size,
        expected_arrival_rate: params.arrival_intensity(half_spread),
        dv01: snapshot.mod_duration * quoted_price * event.size / BPS,
    })
}

/// `(1/gamma) * ln(1 + gamma/k_paper) + gamma * sigma² / 2`.
///
/// Independent of inventory. `ln_1p` keeps the log term accurate as
/// `gamma / k_paper` approaches zero.
pub fn optimal_half_spread(params: &ModelParameters, sigma: f64) -> f64 {
    let gamma = params.gamma();
    (gamma / params.k_paper()).ln_1p() / gamma + gamma * sigma * sigma / 2.0
}
