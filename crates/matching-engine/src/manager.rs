//! Order book registry
//!
//! Routes every operation to the book of its instrument. The registry lock is
//! held only while cloning a book handle; the mutation itself runs under that
//! book's own mutex, so different instruments never contend.

use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::{Entry, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{CancelRequest, InstrumentId, ModifyRequest, Order, OrderOperation, Side};
use crate::error::MatchingError;
use crate::metrics::EngineMetrics;
use crate::order_book::{DepthLevel, OrderBook, OrderBookSnapshot};
use crate::result::{CancelConfirmation, ModifyOutcome, OrderOutcome};
use crate::Result;

/// Handle to a book shared between the registry and in-flight operations
///
/// Destroying a book takes it out of the slot, so an operation that cloned
/// the handle before removal finds the slot empty.
pub type SharedOrderBook = Arc<Mutex<Option<OrderBook>>>;

/// Owns every order book, keyed by instrument
#[derive(Debug, Default)]
pub struct OrderBookManager {
    books: RwLock<HashMap<InstrumentId, SharedOrderBook>>,
    metrics: Arc<EngineMetrics>,
}

impl OrderBookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager reporting into an existing metrics sink
    pub fn with_metrics(metrics: Arc<EngineMetrics>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    // ------------------------------------------------------------------------
    // Book lifecycle
    // ------------------------------------------------------------------------

    pub fn create_order_book(&self, instrument_id: InstrumentId) -> Result<()> {
        match self.books.write().entry(instrument_id) {
            Entry::Occupied(_) => {
                warn!(instrument_id = %instrument_id, "Order book already exists");
                Err(MatchingError::DuplicateInstrument(instrument_id))
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Some(OrderBook::new(instrument_id)))));
                self.metrics.book_created();
                info!(instrument_id = %instrument_id, "Order book created");
                Ok(())
            }
        }
    }

    /// Remove a book and return its final state
    pub fn destroy_order_book(&self, instrument_id: InstrumentId) -> Result<OrderBook> {
        let shared = self
            .books
            .write()
            .remove(&instrument_id)
            .ok_or(MatchingError::UnknownInstrument(instrument_id))?;

        let book = shared
            .lock()
            .take()
            .ok_or(MatchingError::UnknownInstrument(instrument_id))?;
        self.metrics.book_destroyed(book.order_count());
        info!(
            instrument_id = %instrument_id,
            resting = book.order_count(),
            "Order book destroyed"
        );
        Ok(book)
    }

    pub fn has_book(&self, instrument_id: InstrumentId) -> bool {
        self.books.read().contains_key(&instrument_id)
    }

    /// Instruments with a book, ascending
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<_> = self.books.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn book_count(&self) -> usize {
        self.books.read().len()
    }

    fn book(&self, instrument_id: InstrumentId) -> Result<SharedOrderBook> {
        self.books
            .read()
            .get(&instrument_id)
            .cloned()
            .ok_or(MatchingError::UnknownInstrument(instrument_id))
    }

    /// Run a mutation against one book, timing it and counting rejects
    fn route<T>(
        &self,
        op: &'static str,
        instrument_id: InstrumentId,
        apply: impl FnOnce(&mut OrderBook) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = self.book(instrument_id).and_then(|book| {
            let mut guard = book.lock();
            let book = guard
                .as_mut()
                .ok_or(MatchingError::UnknownInstrument(instrument_id))?;
            apply(book)
        });
        self.metrics.record_latency(start.elapsed());

        if let Err(e) = &result {
            self.metrics.record_rejected();
            debug!(op, instrument_id = %instrument_id, error = %e, "Operation rejected");
        }
        result
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    pub fn add_order(&self, order: Order) -> Result<Order> {
        let resting = self.route("add", order.instrument_id(), |book| book.add_order(order))?;
        self.metrics.record_added();
        Ok(resting)
    }

    pub fn modify_order(&self, request: &ModifyRequest) -> Result<ModifyOutcome> {
        let outcome = self.route("modify", request.instrument_id, |book| book.modify_order(request))?;
        self.metrics.record_modified(outcome.priority);
        Ok(outcome)
    }

    pub fn cancel_order(&self, request: &CancelRequest) -> Result<CancelConfirmation> {
        let confirmation = self.route("cancel", request.instrument_id, |book| book.cancel_order(request))?;
        self.metrics.record_cancelled();
        Ok(confirmation)
    }

    /// Dispatch one typed operation
    pub fn process(&self, operation: OrderOperation) -> Result<OrderOutcome> {
        match operation {
            OrderOperation::Add(order) => self.add_order(order).map(OrderOutcome::Resting),
            OrderOperation::Modify(request) => self.modify_order(&request).map(OrderOutcome::Modified),
            OrderOperation::Cancel(request) => self.cancel_order(&request).map(OrderOutcome::Cancelled),
        }
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    /// Inspect a book under its lock
    pub fn with_book<R>(&self, instrument_id: InstrumentId, f: impl FnOnce(&OrderBook) -> R) -> Result<R> {
        let book = self.book(instrument_id)?;
        let guard = book.lock();
        let result = guard.as_ref().map(f);
        result.ok_or(MatchingError::UnknownInstrument(instrument_id))
    }

    pub fn best_bid(&self, instrument_id: InstrumentId) -> Result<Option<DepthLevel>> {
        self.with_book(instrument_id, OrderBook::best_bid)
    }

    pub fn best_ask(&self, instrument_id: InstrumentId) -> Result<Option<DepthLevel>> {
        self.with_book(instrument_id, OrderBook::best_ask)
    }

    /// Depth copied out under the lock
    pub fn depth(&self, instrument_id: InstrumentId, side: Side, levels: usize) -> Result<Vec<DepthLevel>> {
        self.with_book(instrument_id, |book| book.depth(side, levels).collect())
    }

    pub fn snapshot(&self, instrument_id: InstrumentId, levels: usize) -> Result<OrderBookSnapshot> {
        self.with_book(instrument_id, |book| book.snapshot(levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientSequence, OrderId, OrderIdentity, Price, Quantity};
    use crate::result::QueuePriority;
    use assert_matches::assert_matches;

    fn order(id: u64, instrument: u64, side: Side, price: i64, qty: u64) -> Order {
        Order::new(OrderIdentity::new(id, id, instrument), side, Price(price), Quantity(qty))
    }

    fn manager_with(instruments: &[u64]) -> OrderBookManager {
        let manager = OrderBookManager::new();
        for &id in instruments {
            manager.create_order_book(InstrumentId(id)).unwrap();
        }
        manager
    }

    #[test]
    fn test_create_duplicate_book() {
        let manager = manager_with(&[1]);
        assert_matches!(
            manager.create_order_book(InstrumentId(1)),
            Err(MatchingError::DuplicateInstrument(InstrumentId(1)))
        );
        assert_eq!(manager.book_count(), 1);
        assert_eq!(manager.metrics().snapshot().books, 1);
    }

    #[test]
    fn test_unknown_instrument_mutates_nothing() {
        let manager = manager_with(&[1, 2]);
        let result = manager.add_order(order(1, 9, Side::Bid, 100, 10));
        assert_matches!(result, Err(MatchingError::UnknownInstrument(InstrumentId(9))));

        for id in manager.instruments() {
            assert!(manager.with_book(id, OrderBook::is_empty).unwrap());
        }
        assert!(!manager.has_book(InstrumentId(9)));
        assert_eq!(manager.metrics().snapshot().orders_rejected, 1);
        assert_eq!(manager.metrics().snapshot().resting_orders, 0);
    }

    #[test]
    fn test_cross_instrument_isolation() {
        let manager = manager_with(&[1, 2]);
        manager.add_order(order(1, 1, Side::Bid, 100, 10)).unwrap();
        manager.add_order(order(2, 2, Side::Ask, 200, 5)).unwrap();

        assert_eq!(manager.best_bid(InstrumentId(2)).unwrap(), None);
        manager
            .cancel_order(&CancelRequest::new(OrderId(2), InstrumentId(2), ClientSequence(0)))
            .unwrap();

        let bid = manager.best_bid(InstrumentId(1)).unwrap().unwrap();
        assert_eq!(bid.price, Price(100));
        assert_eq!(bid.quantity, Quantity(10));

        // Order 1 lives in book 1; routing its cancel to book 2 does not find it
        assert_matches!(
            manager.cancel_order(&CancelRequest::new(OrderId(1), InstrumentId(2), ClientSequence(0))),
            Err(MatchingError::OrderNotFound(OrderId(1)))
        );
    }

    #[test]
    fn test_process_dispatch() {
        let manager = manager_with(&[3]);
        let resting = manager
            .process(OrderOperation::Add(order(1, 3, Side::Ask, 50, 10)))
            .unwrap();
        assert_matches!(resting, OrderOutcome::Resting(_));

        let modify = ModifyRequest::new(OrderId(1), InstrumentId(3), ClientSequence(2), Price(50), Quantity(4));
        let outcome = manager.process(OrderOperation::Modify(modify)).unwrap();
        assert_matches!(outcome, OrderOutcome::Modified(m) if m.priority == QueuePriority::Retained);

        let cancel = CancelRequest::new(OrderId(1), InstrumentId(3), ClientSequence(3));
        let outcome = manager.process(OrderOperation::Cancel(cancel)).unwrap();
        assert_matches!(outcome, OrderOutcome::Cancelled(c) if c.order.quantity == Quantity(4));

        let metrics = manager.metrics().snapshot();
        assert_eq!(metrics.orders_added, 1);
        assert_eq!(metrics.orders_modified, 1);
        assert_eq!(metrics.priority_retained, 1);
        assert_eq!(metrics.orders_cancelled, 1);
        assert_eq!(metrics.resting_orders, 0);
        assert_eq!(metrics.latency.count, 3);
    }

    #[test]
    fn test_destroy_book() {
        let manager = manager_with(&[1]);
        manager.add_order(order(1, 1, Side::Bid, 100, 10)).unwrap();

        let book = manager.destroy_order_book(InstrumentId(1)).unwrap();
        assert_eq!(book.order_count(), 1);
        assert!(!manager.has_book(InstrumentId(1)));
        assert_matches!(
            manager.destroy_order_book(InstrumentId(1)),
            Err(MatchingError::UnknownInstrument(_))
        );
        assert_eq!(manager.metrics().snapshot().resting_orders, 0);
        assert_eq!(manager.metrics().snapshot().books, 0);
    }

    #[test]
    fn test_destroy_closes_in_flight_handles() {
        let manager = manager_with(&[1]);
        manager.add_order(order(1, 1, Side::Bid, 100, 10)).unwrap();
        let handle = manager.book(InstrumentId(1)).unwrap();

        let book = manager.destroy_order_book(InstrumentId(1)).unwrap();
        assert_eq!(book.order_count(), 1);

        // A late operation on the old handle cannot land in a detached book
        assert!(handle.lock().is_none());
        assert_matches!(
            manager.add_order(order(2, 1, Side::Bid, 100, 5)),
            Err(MatchingError::UnknownInstrument(InstrumentId(1)))
        );
        assert_eq!(manager.metrics().snapshot().resting_orders, 0);
    }

    #[test]
    fn test_instruments_sorted() {
        let manager = manager_with(&[5, 1, 3]);
        assert_eq!(manager.instruments(), vec![InstrumentId(1), InstrumentId(3), InstrumentId(5)]);
    }

    #[test]
    fn test_concurrent_instruments() {
        let manager = manager_with(&[0, 1, 2, 3]);

        std::thread::scope(|scope| {
            for instrument in 0..4u64 {
                let manager = &manager;
                scope.spawn(move || {
                    for n in 0..500u64 {
                        let id = instrument * 1_000 + n;
                        let side = if n % 2 == 0 { Side::Bid } else { Side::Ask };
                        manager
                            .add_order(order(id, instrument, side, 100 + (n % 7) as i64, 1 + n))
                            .unwrap();
                    }
                });
            }
        });

        for instrument in manager.instruments() {
            manager
                .with_book(instrument, |book| {
                    assert_eq!(book.order_count(), 500);
                    book.check_invariants().unwrap();
                })
                .unwrap();
        }
        assert_eq!(manager.metrics().snapshot().resting_orders, 2_000);
    }
}
