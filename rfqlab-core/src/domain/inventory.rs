use serde::{Deserialize, Serialize};

use super::rfq::DealerSide;

/// Signed dealer position in units. Positive = long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryState {
    pub position: f64,
}

impl InventoryState {
    pub fn new(position: f64) -> Self {
        Self { position }
    }

    pub fn flat() -> Self {
        Self::default()
    }

    /// Apply a (possibly fractional) fill on the dealer's side.
    pub fn apply_fill(&mut self, side: DealerSide, filled_size: f64) {
        self.position += side.inventory_sign() * filled_size;
    }

    pub fn is_flat(&self) -> bool {
        self.position.abs() < 1e-12
    }
}
