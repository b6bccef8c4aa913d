use serde::{Deserialize, Serialize};

use crate::define_map;

use super::ids::{FactoryId, ItemId, OrderId};

/// Immutable record for one order item, per spec.md §3.
///
/// Times (`committed_completion_time`, `load_time`, `unload_time`) are plain
/// second counts rather than `chrono` types: the discrete-event evaluator
/// (`dispatch::evaluator`) is invoked thousands of times inside the local-search
/// loop and must stay allocation- and conversion-light, so the whole dispatch core
/// works in integer seconds, exactly like the reference Python implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: ItemId,
    pub order_id: OrderId,
    pub demand: f64,
    pub pickup_factory: FactoryId,
    pub delivery_factory: FactoryId,
    pub committed_completion_time: i64,
    pub load_time: i64,
    pub unload_time: i64,
}

define_map!(ItemId, OrderItem, OrderItemMap);

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, order: &str, demand: f64) -> OrderItem {
        OrderItem {
            item_id: ItemId::new(id),
            order_id: OrderId::new(order),
            demand,
            pickup_factory: FactoryId::new("f1"),
            delivery_factory: FactoryId::new("f2"),
            committed_completion_time: 10_000,
            load_time: 10,
            unload_time: 10,
        }
    }

    #[test]
    fn items_of_one_order_share_factories() {
        let a = item("i1", "o1", 1.0);
        let b = item("i2", "o1", 2.0);
        assert_eq!(a.pickup_factory, b.pickup_factory);
        assert_eq!(a.delivery_factory, b.delivery_factory);
    }
}
