//! Domain types for the Matching Engine
//!
//! Identifiers, prices and quantities are plain integers wrapped in newtypes.
//! Prices are integer ticks so that level lookup never compares floats.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MatchingError;

// ============================================================================
// Identifiers
// ============================================================================

/// Caller-assigned, globally unique order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

/// Tradable instrument identifier; each instrument has its own book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub u64);

/// Opaque client correlation token, echoed back but never used for lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSequence(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClientSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Price / Quantity
// ============================================================================

/// Price in integer ticks
///
/// Signed so that a non-positive price coming off the wire can be reported
/// as [`MatchingError::InvalidPrice`] instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub i64);

impl Price {
    /// Raw tick count
    pub fn ticks(&self) -> i64 {
        self.0
    }

    /// Returns the price if it is a positive tick count
    pub fn validate(self) -> Result<Self, MatchingError> {
        if self.0 > 0 {
            Ok(self)
        } else {
            Err(MatchingError::InvalidPrice(self))
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(pub u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the quantity if it is strictly positive
    pub fn validate(self) -> Result<Self, MatchingError> {
        if self.0 > 0 {
            Ok(self)
        } else {
            Err(MatchingError::InvalidQuantity(0))
        }
    }

    /// Convert a signed wire quantity, rejecting anything that is not positive
    ///
    /// Negative values are reported as-is; they are never clamped to zero.
    pub fn from_signed(raw: i64) -> Result<Self, MatchingError> {
        if raw > 0 {
            Ok(Quantity(raw as u64))
        } else {
            Err(MatchingError::InvalidQuantity(raw))
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Side
// ============================================================================

/// Book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy interest, best (highest) price first
    Bid,
    /// Sell interest, best (lowest) price first
    Ask,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Bid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order
// ============================================================================

/// Immutable identity of an order, fixed once the order is admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderIdentity {
    pub order_id: OrderId,
    pub client_sequence: ClientSequence,
    pub instrument_id: InstrumentId,
}

impl OrderIdentity {
    pub fn new(order_id: u64, client_sequence: u64, instrument_id: u64) -> Self {
        Self {
            order_id: OrderId(order_id),
            client_sequence: ClientSequence(client_sequence),
            instrument_id: InstrumentId(instrument_id),
        }
    }
}

/// A limit order as it rests in a book
///
/// The level it belongs to is named by `(side, price)`; the book resolves
/// that key through its own ladder rather than holding a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub identity: OrderIdentity,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl Order {
    /// Create a new order
    pub fn new(identity: OrderIdentity, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            identity,
            side,
            price,
            quantity,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.identity.order_id
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.identity.instrument_id
    }

    pub fn client_sequence(&self) -> ClientSequence {
        self.identity.client_sequence
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Request to change the price and/or quantity of a resting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub order_id: OrderId,
    pub instrument_id: InstrumentId,
    pub client_sequence: ClientSequence,
    /// Side change is applied as cancel + add of a new resting order
    #[serde(default)]
    pub new_side: Option<Side>,
    pub new_price: Price,
    pub new_quantity: Quantity,
}

impl ModifyRequest {
    pub fn new(
        order_id: OrderId,
        instrument_id: InstrumentId,
        client_sequence: ClientSequence,
        new_price: Price,
        new_quantity: Quantity,
    ) -> Self {
        Self {
            order_id,
            instrument_id,
            client_sequence,
            new_side: None,
            new_price,
            new_quantity,
        }
    }

    /// Move the order to another side
    pub fn with_side(mut self, side: Side) -> Self {
        self.new_side = Some(side);
        self
    }
}

/// Request to remove a resting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub order_id: OrderId,
    pub instrument_id: InstrumentId,
    pub client_sequence: ClientSequence,
}

impl CancelRequest {
    pub fn new(order_id: OrderId, instrument_id: InstrumentId, client_sequence: ClientSequence) -> Self {
        Self {
            order_id,
            instrument_id,
            client_sequence,
        }
    }
}

impl From<&Order> for CancelRequest {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id(),
            instrument_id: order.instrument_id(),
            client_sequence: order.client_sequence(),
        }
    }
}

/// One typed operation from the order-entry stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OrderOperation {
    Add(Order),
    Modify(ModifyRequest),
    Cancel(CancelRequest),
}

impl OrderOperation {
    /// Instrument the operation is routed to
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            OrderOperation::Add(order) => order.instrument_id(),
            OrderOperation::Modify(req) => req.instrument_id,
            OrderOperation::Cancel(req) => req.instrument_id,
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderOperation::Add(order) => order.order_id(),
            OrderOperation::Modify(req) => req.order_id,
            OrderOperation::Cancel(req) => req.order_id,
        }
    }

    pub fn client_sequence(&self) -> ClientSequence {
        match self {
            OrderOperation::Add(order) => order.client_sequence(),
            OrderOperation::Modify(req) => req.client_sequence,
            OrderOperation::Cancel(req) => req.client_sequence,
        }
    }

    /// Short operation name for logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            OrderOperation::Add(_) => "add",
            OrderOperation::Modify(_) => "modify",
            OrderOperation::Cancel(_) => "cancel",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert!(Side::Bid.is_bid());
    }

    #[test]
    fn test_price_validation() {
        assert_eq!(Price(1).validate(), Ok(Price(1)));
        assert_matches!(Price(0).validate(), Err(MatchingError::InvalidPrice(Price(0))));
        assert_matches!(Price(-10).validate(), Err(MatchingError::InvalidPrice(Price(-10))));
    }

    #[test]
    fn test_quantity_from_signed_never_clamps() {
        assert_eq!(Quantity::from_signed(25), Ok(Quantity(25)));
        assert_matches!(Quantity::from_signed(0), Err(MatchingError::InvalidQuantity(0)));
        assert_matches!(Quantity::from_signed(-3), Err(MatchingError::InvalidQuantity(-3)));
        assert_matches!(Quantity(0).validate(), Err(MatchingError::InvalidQuantity(0)));
    }

    #[test]
    fn test_operation_routing_keys() {
        let order = Order::new(OrderIdentity::new(11, 3, 42), Side::Ask, Price(100), Quantity(5));
        let add = OrderOperation::Add(order);
        assert_eq!(add.instrument_id(), InstrumentId(42));
        assert_eq!(add.order_id(), OrderId(11));
        assert_eq!(add.name(), "add");

        let cancel = OrderOperation::Cancel(CancelRequest::from(&order));
        assert_eq!(cancel.instrument_id(), InstrumentId(42));
        assert_eq!(cancel.client_sequence(), ClientSequence(3));
    }

    #[test]
    fn test_side_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Bid).unwrap(), "\"bid\"");
        let side: Side = serde_json::from_str("\"ask\"").unwrap();
        assert_eq!(side, Side::Ask);
    }
}
