//! Single-quote simulation around a caller-held inventory.

use crate::domain::{
    ClientSide, DealerSide, InventoryState, MarketSnapshot, ModelParameters, QuoteResult,
    RfqEvent, SnapshotError,
};

use super::{quote_with_proxy, VolatilityProxy};

/// Prices RFQs against a standing inventory position.
///
/// Used for what-if quoting outside the backtest: the inventory only moves
/// when the caller reports a fill through [`RfqPricer::apply_fill`].
#[derive(Debug, Clone)]
pub struct RfqPricer {
    params: ModelParameters,
    proxy: VolatilityProxy,
    inventory: InventoryState,
}

impl RfqPricer {
    pub fn new(params: ModelParameters, current_inventory: f64) -> Self {
        Self {
            params,
            proxy: VolatilityProxy::default(),
            inventory: InventoryState::new(current_inventory),
        }
    }

    pub fn with_volatility_proxy(mut self, proxy: VolatilityProxy) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn inventory(&self) -> InventoryState {
        self.inventory
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    pub fn price(
        &self,
        snapshot: &MarketSnapshot,
        size: f64,
        client_side: ClientSide,
    ) -> Result<QuoteResult, SnapshotError> {
        let event = RfqEvent::new(snapshot.instrument.clone(), size, client_side);
        quote_with_proxy(&self.params, self.proxy, snapshot, self.inventory, &event)
    }

    pub fn apply_fill(&mut self, dealer_side: DealerSide, filled_size: f64) {
        self.inventory.apply_fill(dealer_side, filled_size);
    }
}
