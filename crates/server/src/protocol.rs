//! Order-entry wire protocol
//!
//! One JSON request per WebSocket text frame, tagged by `"type"`:
//!
//! ```json
//! {"type":"add_order","order_id":1,"instrument_id":0,"client_sequence":7,"side":"bid","price":100,"quantity":10}
//! {"type":"modify_order","order_id":1,"instrument_id":0,"client_sequence":8,"new_price":101,"new_quantity":5}
//! {"type":"cancel_order","order_id":1,"instrument_id":0,"client_sequence":9}
//! ```
//!
//! Every request gets exactly one response frame, also tagged by `"type"`.
//! Quantities are signed on the wire so that negative values can be reported
//! back rather than wrapped.

use matching_engine::{
    CancelRequest, ClientSequence, InstrumentId, MatchingError, ModifyRequest, Order, OrderId, OrderIdentity,
    OrderOperation, OrderOutcome, Price, Quantity, QueuePriority, Side,
};
use serde::{Deserialize, Serialize};

/// Reject reason for a frame that is not a valid request
pub const MALFORMED_REQUEST: &str = "malformed_request";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEntryRequest {
    AddOrder {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
        side: Side,
        price: i64,
        quantity: i64,
    },
    ModifyOrder {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
        new_price: i64,
        new_quantity: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_side: Option<Side>,
    },
    CancelOrder {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
    },
}

impl OrderEntryRequest {
    /// Operation label used in logs and metrics
    pub fn operation_name(&self) -> &'static str {
        match self {
            OrderEntryRequest::AddOrder { .. } => "add_order",
            OrderEntryRequest::ModifyOrder { .. } => "modify_order",
            OrderEntryRequest::CancelOrder { .. } => "cancel_order",
        }
    }

    pub fn order_id(&self) -> u64 {
        match self {
            OrderEntryRequest::AddOrder { order_id, .. }
            | OrderEntryRequest::ModifyOrder { order_id, .. }
            | OrderEntryRequest::CancelOrder { order_id, .. } => *order_id,
        }
    }

    pub fn instrument_id(&self) -> u64 {
        match self {
            OrderEntryRequest::AddOrder { instrument_id, .. }
            | OrderEntryRequest::ModifyOrder { instrument_id, .. }
            | OrderEntryRequest::CancelOrder { instrument_id, .. } => *instrument_id,
        }
    }

    pub fn client_sequence(&self) -> u64 {
        match self {
            OrderEntryRequest::AddOrder { client_sequence, .. }
            | OrderEntryRequest::ModifyOrder { client_sequence, .. }
            | OrderEntryRequest::CancelOrder { client_sequence, .. } => *client_sequence,
        }
    }

    /// Convert to an engine operation
    ///
    /// Fails with `InvalidQuantity` carrying the raw value when a wire
    /// quantity is zero or negative. Prices are checked by the book.
    pub fn into_operation(self) -> Result<OrderOperation, MatchingError> {
        let operation = match self {
            OrderEntryRequest::AddOrder {
                order_id,
                instrument_id,
                client_sequence,
                side,
                price,
                quantity,
            } => OrderOperation::Add(Order::new(
                OrderIdentity::new(order_id, client_sequence, instrument_id),
                side,
                Price(price),
                Quantity::from_signed(quantity)?,
            )),
            OrderEntryRequest::ModifyOrder {
                order_id,
                instrument_id,
                client_sequence,
                new_price,
                new_quantity,
                new_side,
            } => {
                let request = ModifyRequest::new(
                    OrderId(order_id),
                    InstrumentId(instrument_id),
                    ClientSequence(client_sequence),
                    Price(new_price),
                    Quantity::from_signed(new_quantity)?,
                );
                OrderOperation::Modify(match new_side {
                    Some(side) => request.with_side(side),
                    None => request,
                })
            }
            OrderEntryRequest::CancelOrder {
                order_id,
                instrument_id,
                client_sequence,
            } => OrderOperation::Cancel(CancelRequest::new(
                OrderId(order_id),
                InstrumentId(instrument_id),
                ClientSequence(client_sequence),
            )),
        };
        Ok(operation)
    }
}

/// Parse one text frame
pub fn parse_request(text: &str) -> Result<OrderEntryRequest, serde_json::Error> {
    serde_json::from_str(text)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEntryResponse {
    /// The order rests in the book
    Accepted {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
        side: Side,
        price: i64,
        quantity: u64,
    },
    Modified {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
        side: Side,
        price: i64,
        quantity: u64,
        priority: QueuePriority,
    },
    Cancelled {
        order_id: u64,
        instrument_id: u64,
        client_sequence: u64,
        /// Quantity resting at the time of the cancel
        cancelled_quantity: u64,
    },
    Rejected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_id: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_sequence: Option<u64>,
        reason: String,
        message: String,
    },
}

impl OrderEntryResponse {
    pub fn from_outcome(outcome: OrderOutcome) -> Self {
        match outcome {
            OrderOutcome::Resting(order) => OrderEntryResponse::Accepted {
                order_id: order.order_id().0,
                instrument_id: order.instrument_id().0,
                client_sequence: order.client_sequence().0,
                side: order.side,
                price: order.price.ticks(),
                quantity: order.quantity.value(),
            },
            OrderOutcome::Modified(outcome) => OrderEntryResponse::Modified {
                order_id: outcome.order.order_id().0,
                instrument_id: outcome.order.instrument_id().0,
                client_sequence: outcome.request_sequence.0,
                side: outcome.order.side,
                price: outcome.order.price.ticks(),
                quantity: outcome.order.quantity.value(),
                priority: outcome.priority,
            },
            OrderOutcome::Cancelled(confirmation) => OrderEntryResponse::Cancelled {
                order_id: confirmation.order_id().0,
                instrument_id: confirmation.order.instrument_id().0,
                client_sequence: confirmation.request_sequence.0,
                cancelled_quantity: confirmation.order.quantity.value(),
            },
        }
    }

    /// Reject a well-formed request the engine refused
    pub fn rejected(request: &OrderEntryRequest, error: &MatchingError) -> Self {
        OrderEntryResponse::Rejected {
            order_id: Some(request.order_id()),
            client_sequence: Some(request.client_sequence()),
            reason: error.kind().as_str().to_string(),
            message: error.to_string(),
        }
    }

    /// Reject a frame that could not be parsed
    pub fn malformed(message: impl Into<String>) -> Self {
        OrderEntryResponse::Rejected {
            order_id: None,
            client_sequence: None,
            reason: MALFORMED_REQUEST.to_string(),
            message: message.into(),
        }
    }

    /// Metrics label: the response type, or the reject reason
    pub fn outcome_label(&self) -> &'static str {
        match self {
            OrderEntryResponse::Accepted { .. } => "accepted",
            OrderEntryResponse::Modified { .. } => "modified",
            OrderEntryResponse::Cancelled { .. } => "cancelled",
            OrderEntryResponse::Rejected { .. } => "rejected",
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, OrderEntryResponse::Rejected { .. })
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
