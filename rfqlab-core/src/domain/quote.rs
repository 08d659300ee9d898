//! QuoteResult: the pricing engine's output for one RFQ.

use serde::{Deserialize, Serialize};

use super::rfq::DealerSide;

/// Everything the pricing engine derives for a single RFQ.
///
/// Serializes as a flat mapping of named fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub dealer_side: DealerSide,
    pub size: f64,
    /// Volatility proxy in price units, after flooring.
    pub sigma: f64,
    pub inventory_skew: f64,
    pub reservation_price: f64,
    pub quoted_price: f64,
    /// Half-spread in price units.
    pub half_spread: f64,
    pub half_spread_bps: f64,
    /// Distance of the quote from mid, in bps.
    pub spread_bps: f64,
    pub fill_probability: f64,
    pub expected_pnl: f64,
    /// `A * exp(-k_paper * half_spread)`.
    pub expected_arrival_rate: f64,
    /// Rate risk per bp taken on if the full size fills.
    pub dv01: f64,
}

impl QuoteResult {
    /// Dealer's edge per unit versus `mid` (positive = favourable).
    pub fn edge_per_unit(&self, mid: f64) -> f64 {
        self.dealer_side.edge_sign() * (self.quoted_price - mid)
    }

    /// Named numeric fields, in display order.
    pub fn fields(&self) -> [(&'static str, f64); 12] {
        [
            ("size", self.size),
            ("sigma", self.sigma),
            ("inventory_skew", self.inventory_skew),
            ("reservation_price", self.reservation_price),
            ("quoted_price", self.quoted_price),
            ("half_spread", self.half_spread),
            ("half_spread_bps", self.half_spread_bps),
            ("spread_bps", self.spread_bps),
            ("fill_probability", self.fill_probability),
            ("expected_pnl", self.expected_pnl),
            ("expected_arrival_rate", self.expected_arrival_rate),
            ("dv01", self.dv01),
        ]
    }
}
