//! Result types for order operations

use serde::{Deserialize, Serialize};

use crate::domain::{ClientSequence, Order, OrderId};

/// Whether a modified order kept its place in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    /// Same price, quantity not increased: position unchanged
    Retained,
    /// Re-queued at the tail of its (possibly new) level
    Lost,
}

impl QueuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuePriority::Retained => "retained",
            QueuePriority::Lost => "lost",
        }
    }
}

/// Result of a modify operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOutcome {
    /// New resting state
    pub order: Order,
    /// Resting state before the modify
    pub previous: Order,
    pub priority: QueuePriority,
    /// Correlation token from the modify request
    pub request_sequence: ClientSequence,
}

impl ModifyOutcome {
    pub fn retained(order: Order, previous: Order, request_sequence: ClientSequence) -> Self {
        Self {
            order,
            previous,
            priority: QueuePriority::Retained,
            request_sequence,
        }
    }

    pub fn lost(order: Order, previous: Order, request_sequence: ClientSequence) -> Self {
        Self {
            order,
            previous,
            priority: QueuePriority::Lost,
            request_sequence,
        }
    }

    pub fn priority_retained(&self) -> bool {
        self.priority == QueuePriority::Retained
    }

    /// Side changed as part of the modify
    pub fn side_changed(&self) -> bool {
        self.order.side != self.previous.side
    }
}

/// Result of a cancel operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelConfirmation {
    /// The order as it rested when removed; its quantity is the cancelled quantity
    pub order: Order,
    /// Correlation token from the cancel request
    pub request_sequence: ClientSequence,
}

impl CancelConfirmation {
    pub fn new(order: Order, request_sequence: ClientSequence) -> Self {
        Self {
            order,
            request_sequence,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order.order_id()
    }
}

/// Outcome of any [`OrderOperation`](crate::domain::OrderOperation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrderOutcome {
    /// The order now rests in the book
    Resting(Order),
    Modified(ModifyOutcome),
    Cancelled(CancelConfirmation),
}

impl OrderOutcome {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderOutcome::Resting(order) => order.order_id(),
            OrderOutcome::Modified(outcome) => outcome.order.order_id(),
            OrderOutcome::Cancelled(confirmation) => confirmation.order_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderIdentity, Price, Quantity, Side};

    fn order(side: Side, price: i64, qty: u64) -> Order {
        Order::new(OrderIdentity::new(1, 9, 3), side, Price(price), Quantity(qty))
    }

    #[test]
    fn test_modify_outcome_flags() {
        let before = order(Side::Bid, 100, 50);
        let after = order(Side::Bid, 100, 40);
        let outcome = ModifyOutcome::retained(after, before, ClientSequence(10));
        assert!(outcome.priority_retained());
        assert!(!outcome.side_changed());

        let moved = order(Side::Ask, 101, 40);
        let outcome = ModifyOutcome::lost(moved, before, ClientSequence(11));
        assert!(!outcome.priority_retained());
        assert!(outcome.side_changed());
        assert_eq!(outcome.priority.as_str(), "lost");
    }

    #[test]
    fn test_outcome_order_id() {
        let resting = order(Side::Ask, 100, 5);
        assert_eq!(OrderOutcome::Resting(resting).order_id(), OrderId(1));
        let cancelled = CancelConfirmation::new(resting, ClientSequence(4));
        assert_eq!(OrderOutcome::Cancelled(cancelled).order_id(), OrderId(1));
    }
}
