//! Matching engine error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{InstrumentId, OrderId, Price};

/// Errors that can occur while routing or applying an order operation
///
/// Every variant is a recoverable condition reported to the immediate caller.
/// None of them leaves a partially applied mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchingError {
    /// A book already exists for this instrument
    #[error("Order book already exists for instrument {0}")]
    DuplicateInstrument(InstrumentId),

    /// No book has been created for this instrument
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    /// The order id is already resting
    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(OrderId),

    /// The order id is not resting (never added, cancelled, or moved out)
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Prices are positive integer ticks
    #[error("Invalid price: {0} (must be a positive number of ticks)")]
    InvalidPrice(Price),

    /// Quantities are strictly positive
    #[error("Invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),
}

/// Stable, machine-readable classification of a [`MatchingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateInstrument,
    UnknownInstrument,
    DuplicateOrderId,
    OrderNotFound,
    InvalidPrice,
    InvalidQuantity,
}

impl ErrorKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateInstrument => "duplicate_instrument",
            ErrorKind::UnknownInstrument => "unknown_instrument",
            ErrorKind::DuplicateOrderId => "duplicate_order_id",
            ErrorKind::OrderNotFound => "order_not_found",
            ErrorKind::InvalidPrice => "invalid_price",
            ErrorKind::InvalidQuantity => "invalid_quantity",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MatchingError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchingError::DuplicateInstrument(_) => ErrorKind::DuplicateInstrument,
            MatchingError::UnknownInstrument(_) => ErrorKind::UnknownInstrument,
            MatchingError::DuplicateOrderId(_) => ErrorKind::DuplicateOrderId,
            MatchingError::OrderNotFound(_) => ErrorKind::OrderNotFound,
            MatchingError::InvalidPrice(_) => ErrorKind::InvalidPrice,
            MatchingError::InvalidQuantity(_) => ErrorKind::InvalidQuantity,
        }
    }

    /// Engine errors never require tearing the process down
    pub fn is_recoverable(&self) -> bool {
        true
    }

    /// Caller contract violations, as opposed to state races
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MatchingError::InvalidPrice(_)
                | MatchingError::InvalidQuantity(_)
                | MatchingError::UnknownInstrument(_)
        )
    }
}
