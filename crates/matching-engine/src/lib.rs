//! Order Matching Engine for TradeServer
//!
//! In-memory limit order books with strict price-time priority, one per
//! instrument, behind an [`OrderBookManager`] that routes add, modify and
//! cancel operations to the right book.
//!
//! # Architecture
//!
//! ```text
//! OrderBookManager
//!   └── InstrumentId → Arc<Mutex<OrderBook>>
//!         ├── bids: BTreeMap<Price, PriceLevel>   (best = highest)
//!         ├── asks: BTreeMap<Price, PriceLevel>   (best = lowest)
//!         ├── arena: Slab<order node>             (intrusive FIFO per level)
//!         └── index: OrderId → arena key
//! ```
//!
//! Adds never match against the opposite side; a crossed book is reported by
//! [`OrderBook::is_crossed`] and left as is.
//!
//! # Example
//!
//! ```
//! use matching_engine::{InstrumentId, Order, OrderBookManager, OrderIdentity, Price, Quantity, Side};
//!
//! let manager = OrderBookManager::new();
//! manager.create_order_book(InstrumentId(1)).unwrap();
//!
//! let order = Order::new(OrderIdentity::new(1, 1, 1), Side::Bid, Price(100), Quantity(10));
//! manager.add_order(order).unwrap();
//!
//! let best = manager.best_bid(InstrumentId(1)).unwrap().unwrap();
//! assert_eq!(best.price, Price(100));
//! ```

pub mod domain;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod order_book;
pub mod price_level;
pub mod result;

pub use domain::{
    CancelRequest, ClientSequence, InstrumentId, ModifyRequest, Order, OrderId, OrderIdentity, OrderOperation,
    Price, Quantity, Side,
};
pub use error::{ErrorKind, MatchingError};
pub use manager::{OrderBookManager, SharedOrderBook};
pub use metrics::{EngineMetrics, EngineMetricsSnapshot};
pub use order_book::{Depth, DepthLevel, OrderBook, OrderBookSnapshot};
pub use price_level::{LevelIter, PriceLevel};
pub use result::{CancelConfirmation, ModifyOutcome, OrderOutcome, QueuePriority};

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
