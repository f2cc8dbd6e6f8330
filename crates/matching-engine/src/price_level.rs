//! Price levels
//!
//! A level is an intrusive FIFO of arena keys. Orders themselves live in the
//! book's [`Slab`]; each node carries its neighbours' keys so that unlinking
//! from the middle of a queue is O(1).

use slab::Slab;

use crate::domain::{Order, Price, Quantity};

/// Key of an order in its book's arena
pub(crate) type OrderKey = usize;

/// Arena node: the order plus its links inside the level queue
#[derive(Debug, Clone)]
pub(crate) struct OrderNode {
    pub(crate) order: Order,
    prev: Option<OrderKey>,
    next: Option<OrderKey>,
}

impl OrderNode {
    pub(crate) fn new(order: Order) -> Self {
        Self {
            order,
            prev: None,
            next: None,
        }
    }
}

/// All resting orders at one price on one side
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    head: Option<OrderKey>,
    tail: Option<OrderKey>,
    len: usize,
    total_quantity: u64,
}

impl PriceLevel {
    pub(crate) fn new(price: Price) -> Self {
        Self {
            price,
            head: None,
            tail: None,
            len: 0,
            total_quantity: 0,
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Number of orders queued at this level
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sum of the quantities of every queued order
    pub fn total_quantity(&self) -> Quantity {
        Quantity(self.total_quantity)
    }

    /// Append an already-allocated node at the tail (lowest time priority)
    pub(crate) fn push_back(&mut self, arena: &mut Slab<OrderNode>, key: OrderKey) {
        let quantity = {
            let node = &mut arena[key];
            node.prev = self.tail;
            node.next = None;
            node.order.quantity.value()
        };

        match self.tail {
            Some(tail) => arena[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.len += 1;
        self.total_quantity += quantity;
    }

    /// Detach a node from anywhere in the queue
    ///
    /// The node stays allocated in the arena; the caller decides whether to
    /// free it or push it onto another level.
    pub(crate) fn unlink(&mut self, arena: &mut Slab<OrderNode>, key: OrderKey) {
        let (prev, next, quantity) = {
            let node = &arena[key];
            (node.prev, node.next, node.order.quantity.value())
        };

        match prev {
            Some(prev) => arena[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => arena[next].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut arena[key];
        node.prev = None;
        node.next = None;

        self.len -= 1;
        self.total_quantity -= quantity;
    }

    /// Change a queued order's quantity without moving it
    pub(crate) fn resize(&mut self, arena: &mut Slab<OrderNode>, key: OrderKey, quantity: Quantity) {
        let node = &mut arena[key];
        self.total_quantity = self.total_quantity - node.order.quantity.value() + quantity.value();
        node.order.quantity = quantity;
    }

    /// Orders in time priority, oldest first
    pub(crate) fn iter<'a>(&self, arena: &'a Slab<OrderNode>) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

/// FIFO iterator over a level's orders
#[derive(Debug, Clone)]
pub struct LevelIter<'a> {
    arena: &'a Slab<OrderNode>,
    cursor: Option<OrderKey>,
    remaining: usize,
}

impl<'a> LevelIter<'a> {
    pub(crate) fn empty(arena: &'a Slab<OrderNode>) -> Self {
        Self {
            arena,
            cursor: None,
            remaining: 0,
        }
    }
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = &'a Order;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.cursor?;
        let node = self.arena.get(key)?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.order)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for LevelIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderIdentity, Side};

    fn node(id: u64, qty: u64) -> OrderNode {
        OrderNode::new(Order::new(
            OrderIdentity::new(id, id, 1),
            Side::Bid,
            Price(100),
            Quantity(qty),
        ))
    }

    fn ids(level: &PriceLevel, arena: &Slab<OrderNode>) -> Vec<OrderId> {
        level.iter(arena).map(|o| o.order_id()).collect()
    }

    #[test]
    fn test_push_back_keeps_fifo() {
        let mut arena = Slab::new();
        let mut level = PriceLevel::new(Price(100));

        for (id, qty) in [(1, 10), (2, 20), (3, 30)] {
            let key = arena.insert(node(id, qty));
            level.push_back(&mut arena, key);
        }

        assert_eq!(level.len(), 3);
        assert_eq!(level.total_quantity(), Quantity(60));
        assert_eq!(ids(&level, &arena), vec![OrderId(1), OrderId(2), OrderId(3)]);
        assert_eq!(level.iter(&arena).len(), 3);
    }

    #[test]
    fn test_unlink_head_middle_tail() {
        let mut arena = Slab::new();
        let mut level = PriceLevel::new(Price(100));
        let keys: Vec<_> = (1..=4)
            .map(|id| {
                let key = arena.insert(node(id, 5));
                level.push_back(&mut arena, key);
                key
            })
            .collect();

        level.unlink(&mut arena, keys[1]);
        assert_eq!(ids(&level, &arena), vec![OrderId(1), OrderId(3), OrderId(4)]);

        level.unlink(&mut arena, keys[0]);
        assert_eq!(ids(&level, &arena), vec![OrderId(3), OrderId(4)]);

        level.unlink(&mut arena, keys[3]);
        assert_eq!(ids(&level, &arena), vec![OrderId(3)]);
        assert_eq!(level.total_quantity(), Quantity(5));

        level.unlink(&mut arena, keys[2]);
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), Quantity::ZERO);
        assert_eq!(level.iter(&arena).next(), None);
    }

    #[test]
    fn test_resize_in_place() {
        let mut arena = Slab::new();
        let mut level = PriceLevel::new(Price(100));
        let first = arena.insert(node(1, 100));
        level.push_back(&mut arena, first);
        let second = arena.insert(node(2, 50));
        level.push_back(&mut arena, second);

        level.resize(&mut arena, first, Quantity(60));

        assert_eq!(level.total_quantity(), Quantity(110));
        assert_eq!(ids(&level, &arena), vec![OrderId(1), OrderId(2)]);
        assert_eq!(arena[first].order.quantity, Quantity(60));
    }
}
