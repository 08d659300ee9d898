//! RFQ events and trade sides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The client's action on an RFQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientSide {
    Buy,
    Sell,
}

/// The dealer's side, always opposite the client's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealerSide {
    Buy,
    Sell,
}

impl ClientSide {
    pub fn dealer_side(self) -> DealerSide {
        match self {
            ClientSide::Buy => DealerSide::Sell,
            ClientSide::Sell => DealerSide::Buy,
        }
    }
}

impl DealerSide {
    /// +1 when the dealer buys (inventory grows), -1 when it sells.
    pub fn inventory_sign(self) -> f64 {
        match self {
            DealerSide::Buy => 1.0,
            DealerSide::Sell => -1.0,
        }
    }

    /// +1 when a quote above mid is favourable to the dealer.
    pub fn edge_sign(self) -> f64 {
        -self.inventory_sign()
    }
}

impl fmt::Display for ClientSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientSide::Buy => f.write_str("BUY"),
            ClientSide::Sell => f.write_str("SELL"),
        }
    }
}

impl fmt::Display for DealerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealerSide::Buy => f.write_str("BUY"),
            DealerSide::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown client side '{0}' (expected BUY or SELL)")]
pub struct ParseSideError(pub String);

impl FromStr for ClientSide {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Ok(ClientSide::Buy),
            "SELL" | "S" => Ok(ClientSide::Sell),
            _ => Err(ParseSideError(s.to_string())),
        }
    }
}

/// A client's request for a one-way price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfqEvent {
    pub instrument: String,
    pub size: f64,
    pub client_side: ClientSide,
}

impl RfqEvent {
    pub fn new(instrument: impl Into<String>, size: f64, client_side: ClientSide) -> Self {
        Self {
            instrument: instrument.into(),
            size,
            client_side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dealer_takes_opposite_side() {
        assert_eq!(ClientSide::Buy.dealer_side(), DealerSide::Sell);
        assert_eq!(ClientSide::Sell.dealer_side(), DealerSide::Buy);
    }

    #[test]
    fn parses_side_codes() {
        assert_eq!("BUY".parse::<ClientSide>().unwrap(), ClientSide::Buy);
        assert_eq!(" s ".parse::<ClientSide>().unwrap(), ClientSide::Sell);
        assert!("HOLD".parse::<ClientSide>().is_err());
    }

    #[test]
    fn side_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&ClientSide::Sell).unwrap(), "\"SELL\"");
    }
}
