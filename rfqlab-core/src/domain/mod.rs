//! Domain types for RFQLab

pub mod inventory;
pub mod params;
pub mod quote;
pub mod rfq;
pub mod snapshot;

pub use inventory::InventoryState;
pub use params::{ModelParameters, ParamError};
pub use quote::QuoteResult;
pub use rfq::{ClientSide, DealerSide, ParseSideError, RfqEvent};
pub use snapshot::{MarketSnapshot, SnapshotError};
