//! Order book for a single instrument
//!
//! Two price ladders (bids, asks) keyed by price, an arena holding every
//! resting order, and an index from order id to arena key. The ladders only
//! ever contain non-empty levels.

use serde::{Deserialize, Serialize};
use slab::Slab;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;
use std::iter::Rev;
use tracing::debug;

use crate::domain::{CancelRequest, InstrumentId, ModifyRequest, Order, OrderId, Price, Quantity, Side};
use crate::error::MatchingError;
use crate::price_level::{LevelIter, OrderKey, OrderNode, PriceLevel};
use crate::result::{CancelConfirmation, ModifyOutcome};
use crate::Result;

// ============================================================================
// Depth
// ============================================================================

/// Aggregated view of one price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

impl From<&PriceLevel> for DepthLevel {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price(),
            quantity: level.total_quantity(),
            order_count: level.len(),
        }
    }
}

#[derive(Debug, Clone)]
enum LadderIter<'a> {
    Bids(Rev<btree_map::Values<'a, Price, PriceLevel>>),
    Asks(btree_map::Values<'a, Price, PriceLevel>),
}

/// Lazy depth sequence, best price first
///
/// Borrowing the book, so it cannot outlive a mutation. Clone it to restart.
#[derive(Debug, Clone)]
pub struct Depth<'a> {
    levels: LadderIter<'a>,
    remaining: usize,
}

impl Iterator for Depth<'_> {
    type Item = DepthLevel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let level = match &mut self.levels {
            LadderIter::Bids(iter) => iter.next(),
            LadderIter::Asks(iter) => iter.next(),
        }?;
        self.remaining -= 1;
        Some(DepthLevel::from(level))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let available = match &self.levels {
            LadderIter::Bids(iter) => iter.len(),
            LadderIter::Asks(iter) => iter.len(),
        };
        let n = available.min(self.remaining);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Depth<'_> {}

/// Point-in-time copy of both sides of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub instrument_id: InstrumentId,
    /// Bid levels, highest price first
    pub bids: Vec<DepthLevel>,
    /// Ask levels, lowest price first
    pub asks: Vec<DepthLevel>,
    pub order_count: usize,
    /// Number of mutations applied to the book
    pub sequence: u64,
}

impl OrderBookSnapshot {
    pub fn from_book(book: &OrderBook, levels: usize) -> Self {
        Self {
            instrument_id: book.instrument_id,
            bids: book.depth(Side::Bid, levels).collect(),
            asks: book.depth(Side::Ask, levels).collect(),
            order_count: book.order_count(),
            sequence: book.sequence,
        }
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Price-time priority book for one instrument
#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument_id: InstrumentId,
    bids: BTreeMap<Price, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    orders: Slab<OrderNode>,
    index: HashMap<OrderId, OrderKey>,
    sequence: u64,
}

impl OrderBook {
    /// Create an empty order book
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self::with_capacity(instrument_id, 0)
    }

    /// Create an empty book with room for `orders` resting orders
    pub fn with_capacity(instrument_id: InstrumentId, orders: usize) -> Self {
        Self {
            instrument_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: Slab::with_capacity(orders),
            index: HashMap::with_capacity(orders),
            sequence: 0,
        }
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    /// Number of mutations applied so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn ladder(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn check_instrument(&self, instrument_id: InstrumentId) -> Result<()> {
        if instrument_id == self.instrument_id {
            Ok(())
        } else {
            Err(MatchingError::UnknownInstrument(instrument_id))
        }
    }

    fn locate(&self, order_id: OrderId) -> Result<OrderKey> {
        self.index
            .get(&order_id)
            .copied()
            .ok_or(MatchingError::OrderNotFound(order_id))
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Rest a new order at the tail of its level
    ///
    /// Nothing is touched unless every check passes.
    pub fn add_order(&mut self, order: Order) -> Result<Order> {
        self.check_instrument(order.instrument_id())?;
        order.price.validate()?;
        order.quantity.validate()?;
        if self.index.contains_key(&order.order_id()) {
            return Err(MatchingError::DuplicateOrderId(order.order_id()));
        }
        self.check_level_capacity(order.side, order.price, order.quantity, Quantity(0))?;

        let key = self.orders.insert(OrderNode::new(order));
        self.attach(key);
        self.index.insert(order.order_id(), key);
        self.sequence += 1;

        debug!(
            instrument_id = %self.instrument_id,
            order_id = %order.order_id(),
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            "Order resting"
        );

        Ok(order)
    }

    /// Remove a resting order
    pub fn cancel_order(&mut self, request: &CancelRequest) -> Result<CancelConfirmation> {
        self.check_instrument(request.instrument_id)?;
        let key = self.locate(request.order_id)?;

        self.detach(key);
        let node = self.orders.remove(key);
        self.index.remove(&request.order_id);
        self.sequence += 1;

        debug!(
            instrument_id = %self.instrument_id,
            order_id = %request.order_id,
            side = %node.order.side,
            price = %node.order.price,
            quantity = %node.order.quantity,
            "Order cancelled"
        );

        Ok(CancelConfirmation::new(node.order, request.client_sequence))
    }

    /// Change price, quantity and optionally side of a resting order
    ///
    /// Staying at the same price with no quantity increase keeps the queue
    /// position. Any other change re-queues the order at the tail of its
    /// target level. Identity is never altered.
    pub fn modify_order(&mut self, request: &ModifyRequest) -> Result<ModifyOutcome> {
        self.check_instrument(request.instrument_id)?;
        let price = request.new_price.validate()?;
        let quantity = request.new_quantity.validate()?;
        let key = self.locate(request.order_id)?;

        let previous = self.orders[key].order;
        let side = request.new_side.unwrap_or(previous.side);

        let outcome = if side == previous.side && price == previous.price && quantity <= previous.quantity {
            let levels = match side {
                Side::Bid => &mut self.bids,
                Side::Ask => &mut self.asks,
            };
            if let Some(level) = levels.get_mut(&price) {
                level.resize(&mut self.orders, key, quantity);
            }
            ModifyOutcome::retained(self.orders[key].order, previous, request.client_sequence)
        } else {
            let freed = if side == previous.side && price == previous.price {
                previous.quantity
            } else {
                Quantity(0)
            };
            self.check_level_capacity(side, price, quantity, freed)?;

            self.detach(key);
            let order = Order {
                side,
                price,
                quantity,
                ..previous
            };
            self.orders[key].order = order;
            self.attach(key);
            ModifyOutcome::lost(order, previous, request.client_sequence)
        };
        self.sequence += 1;

        debug!(
            instrument_id = %self.instrument_id,
            order_id = %request.order_id,
            side = %outcome.order.side,
            price = %outcome.order.price,
            quantity = %outcome.order.quantity,
            priority = outcome.priority.as_str(),
            "Order modified"
        );

        Ok(outcome)
    }

    /// Reject a quantity that would overflow the target level's total
    ///
    /// `freed` is the part of the current total that leaves the level first.
    fn check_level_capacity(&self, side: Side, price: Price, quantity: Quantity, freed: Quantity) -> Result<()> {
        let resting = self
            .ladder(side)
            .get(&price)
            .map_or(0, |level| level.total_quantity().value());
        match resting.saturating_sub(freed.value()).checked_add(quantity.value()) {
            Some(_) => Ok(()),
            None => Err(MatchingError::InvalidQuantity(
                i64::try_from(quantity.value()).unwrap_or(i64::MAX),
            )),
        }
    }

    /// Push an allocated node onto the tail of the level its order names,
    /// creating the level if needed
    fn attach(&mut self, key: OrderKey) {
        let Order { side, price, .. } = self.orders[key].order;
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(&mut self.orders, key);
    }

    /// Unlink a node from its level, erasing the level once it is empty
    fn detach(&mut self, key: OrderKey) {
        let Order { side, price, .. } = self.orders[key].order;
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        if let btree_map::Entry::Occupied(mut entry) = levels.entry(price) {
            entry.get_mut().unlink(&mut self.orders, key);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Highest bid level
    pub fn best_bid(&self) -> Option<DepthLevel> {
        self.bids.values().next_back().map(DepthLevel::from)
    }

    /// Lowest ask level
    pub fn best_ask(&self) -> Option<DepthLevel> {
        self.asks.values().next().map(DepthLevel::from)
    }

    /// Best ask minus best bid, in ticks
    pub fn spread(&self) -> Option<i64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price.ticks() - bid.price.ticks()),
            _ => None,
        }
    }

    /// Adds never match, so a bid at or above the best ask simply rests
    pub fn is_crossed(&self) -> bool {
        matches!(self.spread(), Some(spread) if spread <= 0)
    }

    /// Up to `levels` levels of one side, best price first
    pub fn depth(&self, side: Side, levels: usize) -> Depth<'_> {
        let iter = match side {
            Side::Bid => LadderIter::Bids(self.bids.values().rev()),
            Side::Ask => LadderIter::Asks(self.asks.values()),
        };
        Depth {
            levels: iter,
            remaining: levels,
        }
    }

    pub fn snapshot(&self, levels: usize) -> OrderBookSnapshot {
        OrderBookSnapshot::from_book(self, levels)
    }

    pub fn level(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        self.ladder(side).get(&price)
    }

    /// Orders queued at one price, oldest first
    pub fn queue(&self, side: Side, price: Price) -> LevelIter<'_> {
        match self.level(side, price) {
            Some(level) => level.iter(&self.orders),
            None => LevelIter::empty(&self.orders),
        }
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.index.get(&order_id).map(|&key| &self.orders[key].order)
    }

    pub fn contains_order(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Zero-based position of an order within its level
    pub fn queue_position(&self, order_id: OrderId) -> Option<usize> {
        let order = self.get_order(order_id)?;
        self.queue(order.side, order.price)
            .position(|queued| queued.order_id() == order_id)
    }

    /// Every resting order, in no particular order
    pub fn orders(&self) -> impl Iterator<Item = &Order> + '_ {
        self.orders.iter().map(|(_, node)| &node.order)
    }

    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.ladder(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Walk every level and check it against the index
    ///
    /// Returns a description of the first inconsistency found.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut seen = 0usize;
        for side in [Side::Bid, Side::Ask] {
            for (price, level) in self.ladder(side) {
                if level.is_empty() {
                    return Err(format!("empty {} level at {}", side, price));
                }
                if level.price() != *price {
                    return Err(format!("level keyed {} reports price {}", price, level.price()));
                }
                let mut count = 0usize;
                let mut total = 0u64;
                for order in level.iter(&self.orders) {
                    if order.side != side || order.price != *price {
                        return Err(format!("order {} queued at wrong level", order.order_id()));
                    }
                    match self.index.get(&order.order_id()) {
                        Some(&key) if self.orders[key].order.order_id() == order.order_id() => {}
                        _ => return Err(format!("order {} missing from index", order.order_id())),
                    }
                    count += 1;
                    total += order.quantity.value();
                }
                if count != level.len() {
                    return Err(format!("level {} holds {} orders, reports {}", price, count, level.len()));
                }
                if total != level.total_quantity().value() {
                    return Err(format!("level {} total {} != sum {}", price, level.total_quantity(), total));
                }
                seen += count;
            }
        }
        if seen != self.index.len() || seen != self.orders.len() {
            return Err(format!(
                "levels hold {} orders, index {}, arena {}",
                seen,
                self.index.len(),
                self.orders.len()
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientSequence, OrderIdentity};
    use crate::result::QueuePriority;
    use assert_matches::assert_matches;

    const INSTRUMENT: u64 = 1;

    fn book() -> OrderBook {
        OrderBook::new(InstrumentId(INSTRUMENT))
    }

    fn order(id: u64, side: Side, price: i64, qty: u64) -> Order {
        Order::new(OrderIdentity::new(id, id * 10, INSTRUMENT), side, Price(price), Quantity(qty))
    }

    fn cancel(id: u64) -> CancelRequest {
        CancelRequest::new(OrderId(id), InstrumentId(INSTRUMENT), ClientSequence(0))
    }

    fn modify(id: u64, price: i64, qty: u64) -> ModifyRequest {
        ModifyRequest::new(
            OrderId(id),
            InstrumentId(INSTRUMENT),
            ClientSequence(99),
            Price(price),
            Quantity(qty),
        )
    }

    fn queue_ids(book: &OrderBook, side: Side, price: i64) -> Vec<u64> {
        book.queue(side, Price(price)).map(|o| o.order_id().0).collect()
    }

    #[test]
    fn test_add_and_best_prices() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        book.add_order(order(2, Side::Bid, 101, 5)).unwrap();
        book.add_order(order(3, Side::Ask, 105, 7)).unwrap();
        book.add_order(order(4, Side::Ask, 103, 3)).unwrap();

        let bid = book.best_bid().unwrap();
        assert_eq!(bid.price, Price(101));
        assert_eq!(bid.quantity, Quantity(5));
        let ask = book.best_ask().unwrap();
        assert_eq!(ask.price, Price(103));
        assert_eq!(book.spread(), Some(2));
        assert!(!book.is_crossed());
        assert_eq!(book.order_count(), 4);
        assert_eq!(book.sequence(), 4);
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_empty_book_queries() {
        let book = book();
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.depth(Side::Bid, 10).count(), 0);
        assert_eq!(book.queue(Side::Ask, Price(1)).count(), 0);
    }

    #[test]
    fn test_duplicate_order_id_rejected() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();

        let result = book.add_order(order(1, Side::Ask, 110, 3));
        assert_matches!(result, Err(MatchingError::DuplicateOrderId(OrderId(1))));
        assert_eq!(book.order_count(), 1);
        assert_eq!(book.level_count(Side::Ask), 0);
        assert_eq!(book.get_order(OrderId(1)).unwrap().side, Side::Bid);
    }

    #[test]
    fn test_invalid_inputs_do_not_mutate() {
        let mut book = book();
        assert_matches!(
            book.add_order(order(1, Side::Bid, 0, 10)),
            Err(MatchingError::InvalidPrice(Price(0)))
        );
        assert_matches!(
            book.add_order(order(1, Side::Bid, -5, 10)),
            Err(MatchingError::InvalidPrice(Price(-5)))
        );
        assert_matches!(
            book.add_order(order(1, Side::Bid, 100, 0)),
            Err(MatchingError::InvalidQuantity(0))
        );
        assert!(book.is_empty());
        assert_eq!(book.sequence(), 0);
    }

    #[test]
    fn test_wrong_instrument_rejected() {
        let mut book = book();
        let foreign = Order::new(OrderIdentity::new(1, 1, 77), Side::Bid, Price(100), Quantity(1));
        assert_matches!(
            book.add_order(foreign),
            Err(MatchingError::UnknownInstrument(InstrumentId(77)))
        );
        assert!(book.is_empty());
    }

    #[test]
    fn test_fifo_priority_within_level() {
        let mut book = book();
        for id in 1..=3 {
            book.add_order(order(id, Side::Bid, 100, 10)).unwrap();
        }
        assert_eq!(queue_ids(&book, Side::Bid, 100), vec![1, 2, 3]);
        assert_eq!(book.queue_position(OrderId(3)), Some(2));

        book.cancel_order(&cancel(2)).unwrap();
        assert_eq!(queue_ids(&book, Side::Bid, 100), vec![1, 3]);
        assert_eq!(book.queue_position(OrderId(3)), Some(1));
        assert_eq!(book.best_bid().unwrap().quantity, Quantity(20));
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_last_cancel_erases_level() {
        let mut book = book();
        book.add_order(order(1, Side::Ask, 105, 10)).unwrap();
        book.add_order(order(2, Side::Ask, 106, 10)).unwrap();

        let confirmation = book.cancel_order(&cancel(1)).unwrap();
        assert_eq!(confirmation.order.price, Price(105));
        assert_eq!(confirmation.order.quantity, Quantity(10));

        assert!(book.level(Side::Ask, Price(105)).is_none());
        let prices: Vec<_> = book.depth(Side::Ask, 10).map(|l| l.price).collect();
        assert_eq!(prices, vec![Price(106)]);
        assert_eq!(book.level_count(Side::Ask), 1);
    }

    #[test]
    fn test_cancel_unknown_order() {
        let mut book = book();
        assert_matches!(
            book.cancel_order(&cancel(42)),
            Err(MatchingError::OrderNotFound(OrderId(42)))
        );

        book.add_order(order(1, Side::Bid, 100, 1)).unwrap();
        book.cancel_order(&cancel(1)).unwrap();
        assert_matches!(
            book.cancel_order(&cancel(1)),
            Err(MatchingError::OrderNotFound(OrderId(1)))
        );
    }

    #[test]
    fn test_quantity_reduction_keeps_priority() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 100)).unwrap();
        book.add_order(order(2, Side::Bid, 100, 50)).unwrap();

        let outcome = book.modify_order(&modify(1, 100, 60)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Retained);
        assert_eq!(outcome.previous.quantity, Quantity(100));
        assert_eq!(outcome.order.quantity, Quantity(60));
        assert_eq!(queue_ids(&book, Side::Bid, 100), vec![1, 2]);
        assert_eq!(book.best_bid().unwrap().quantity, Quantity(110));
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_same_quantity_same_price_keeps_priority() {
        let mut book = book();
        book.add_order(order(1, Side::Ask, 100, 100)).unwrap();
        book.add_order(order(2, Side::Ask, 100, 50)).unwrap();

        let outcome = book.modify_order(&modify(1, 100, 100)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Retained);
        assert_eq!(queue_ids(&book, Side::Ask, 100), vec![1, 2]);
    }

    #[test]
    fn test_quantity_increase_loses_priority() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 100)).unwrap();
        book.add_order(order(2, Side::Bid, 100, 50)).unwrap();

        let outcome = book.modify_order(&modify(1, 100, 150)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Lost);
        assert_eq!(queue_ids(&book, Side::Bid, 100), vec![2, 1]);
        assert_eq!(book.best_bid().unwrap().quantity, Quantity(200));
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_price_change_moves_order() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        book.add_order(order(2, Side::Bid, 99, 10)).unwrap();

        let outcome = book.modify_order(&modify(1, 99, 5)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Lost);
        assert!(book.level(Side::Bid, Price(100)).is_none());
        assert_eq!(queue_ids(&book, Side::Bid, 99), vec![2, 1]);
        assert_eq!(book.level_count(Side::Bid), 1);
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_modify_keeps_identity() {
        let mut book = book();
        let original = order(1, Side::Ask, 100, 10);
        book.add_order(original).unwrap();

        let outcome = book.modify_order(&modify(1, 101, 20)).unwrap();
        assert_eq!(outcome.order.identity, original.identity);
        assert_eq!(outcome.request_sequence, ClientSequence(99));
        assert_eq!(book.get_order(OrderId(1)).unwrap().client_sequence(), ClientSequence(10));
    }

    #[test]
    fn test_modify_side_change() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        book.add_order(order(2, Side::Ask, 100, 10)).unwrap();

        let outcome = book.modify_order(&modify(1, 100, 10).with_side(Side::Ask)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Lost);
        assert!(outcome.side_changed());
        assert_eq!(book.level_count(Side::Bid), 0);
        assert_eq!(queue_ids(&book, Side::Ask, 100), vec![2, 1]);
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_modify_validation_precedes_mutation() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        let before = book.snapshot(10);

        assert_matches!(
            book.modify_order(&modify(1, 0, 10)),
            Err(MatchingError::InvalidPrice(Price(0)))
        );
        assert_matches!(
            book.modify_order(&modify(1, 100, 0)),
            Err(MatchingError::InvalidQuantity(0))
        );
        assert_matches!(
            book.modify_order(&modify(9, 100, 10)),
            Err(MatchingError::OrderNotFound(OrderId(9)))
        );
        assert_eq!(book.snapshot(10), before);
    }

    #[test]
    fn test_add_cancel_round_trip() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        book.add_order(order(2, Side::Ask, 105, 4)).unwrap();
        let bids_before: Vec<_> = book.depth(Side::Bid, usize::MAX).collect();
        let asks_before: Vec<_> = book.depth(Side::Ask, usize::MAX).collect();

        book.add_order(order(3, Side::Bid, 101, 7)).unwrap();
        book.cancel_order(&cancel(3)).unwrap();

        assert_eq!(book.depth(Side::Bid, usize::MAX).collect::<Vec<_>>(), bids_before);
        assert_eq!(book.depth(Side::Ask, usize::MAX).collect::<Vec<_>>(), asks_before);
        assert!(!book.contains_order(OrderId(3)));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_crossed_book_rests() {
        let mut book = book();
        book.add_order(order(1, Side::Ask, 100, 10)).unwrap();
        book.add_order(order(2, Side::Bid, 101, 10)).unwrap();

        assert!(book.is_crossed());
        assert_eq!(book.spread(), Some(-1));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_depth_is_bounded_and_restartable() {
        let mut book = book();
        for (id, price) in [(1, 98), (2, 100), (3, 99), (4, 100)] {
            book.add_order(order(id, Side::Bid, price, 5)).unwrap();
        }

        let depth = book.depth(Side::Bid, 2);
        assert_eq!(depth.len(), 2);
        let first: Vec<_> = depth.clone().collect();
        let second: Vec<_> = depth.collect();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                DepthLevel { price: Price(100), quantity: Quantity(10), order_count: 2 },
                DepthLevel { price: Price(99), quantity: Quantity(5), order_count: 1 },
            ]
        );
    }

    #[test]
    fn test_snapshot() {
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, 10)).unwrap();
        book.add_order(order(2, Side::Ask, 102, 3)).unwrap();
        book.add_order(order(3, Side::Ask, 101, 4)).unwrap();

        let snapshot = book.snapshot(1);
        assert_eq!(snapshot.instrument_id, InstrumentId(INSTRUMENT));
        assert_eq!(snapshot.bids.len(), 1);
        assert_eq!(snapshot.asks, vec![DepthLevel { price: Price(101), quantity: Quantity(4), order_count: 1 }]);
        assert_eq!(snapshot.order_count, 3);
        assert_eq!(snapshot.sequence, 3);
    }

    #[test]
    fn test_add_rejects_level_total_overflow() {
        let max = i64::MAX as u64;
        let mut book = book();
        book.add_order(order(1, Side::Bid, 100, max)).unwrap();
        book.add_order(order(2, Side::Bid, 100, max)).unwrap();

        assert_matches!(
            book.add_order(order(3, Side::Bid, 100, max)),
            Err(MatchingError::InvalidQuantity(q)) if q == i64::MAX
        );
        assert!(!book.contains_order(OrderId(3)));
        assert_eq!(queue_ids(&book, Side::Bid, 100), vec![1, 2]);
        assert_eq!(book.best_bid().unwrap().quantity, Quantity(2 * max));
        book.check_invariants().unwrap();

        // Other levels are unaffected
        book.add_order(order(3, Side::Bid, 99, max)).unwrap();
        book.check_invariants().unwrap();
    }

    #[test]
    fn test_modify_rejects_level_total_overflow() {
        let max = i64::MAX as u64;
        let mut book = book();
        book.add_order(order(1, Side::Ask, 100, max)).unwrap();
        book.add_order(order(2, Side::Ask, 100, max)).unwrap();
        book.add_order(order(3, Side::Ask, 100, 1)).unwrap();
        book.add_order(order(4, Side::Ask, 101, 5)).unwrap();
        let sequence = book.sequence();

        // Quantity increase in place
        assert_matches!(book.modify_order(&modify(3, 100, 2)), Err(MatchingError::InvalidQuantity(2)));
        // Re-queue into the full level from another price
        assert_matches!(book.modify_order(&modify(4, 100, 5)), Err(MatchingError::InvalidQuantity(5)));

        assert_eq!(book.sequence(), sequence);
        assert_eq!(queue_ids(&book, Side::Ask, 100), vec![1, 2, 3]);
        assert_eq!(queue_ids(&book, Side::Ask, 101), vec![4]);
        assert_eq!(book.get_order(OrderId(3)).unwrap().quantity, Quantity(1));
        book.check_invariants().unwrap();

        // Replacing an order's own quantity frees its share of the total
        let outcome = book.modify_order(&modify(2, 100, max)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Retained);
        book.cancel_order(&cancel(3)).unwrap();
        let outcome = book.modify_order(&modify(2, 100, max + 1)).unwrap();
        assert_eq!(outcome.priority, QueuePriority::Lost);
        assert_eq!(queue_ids(&book, Side::Ask, 100), vec![1, 2]);
        book.check_invariants().unwrap();
    }
}
