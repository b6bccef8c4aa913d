use serde::{Deserialize, Serialize};

use super::ids::{FactoryId, ItemId};

/// Boundary form of one factory stop, per spec.md §3.
///
/// Invariant (enforced by construction in `dispatch::bootstrap` and
/// `dispatch::serialize`, not by this type): items of one `order_id` are
/// contiguous, and `delivery_items` for an order is the reverse of `pickup_items`
/// for the same order (LIFO unload order).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Visit {
    pub factory_id: FactoryId,
    #[serde(default)]
    pub pickup_items: Vec<ItemId>,
    #[serde(default)]
    pub delivery_items: Vec<ItemId>,
    pub arrive_time: Option<i64>,
    pub leave_time: Option<i64>,
}

impl Visit {
    pub fn new(factory_id: FactoryId) -> Self {
        Self {
            factory_id,
            pickup_items: Vec::new(),
            delivery_items: Vec::new(),
            arrive_time: None,
            leave_time: None,
        }
    }

    /// Concatenates `other`'s item lists onto `self`. Used by the output
    /// serializer (spec.md §6) to merge adjacent Visits at the same factory.
    pub fn merge(&mut self, other: Visit) {
        debug_assert_eq!(self.factory_id, other.factory_id);
        self.pickup_items.extend(other.pickup_items);
        self.delivery_items.extend(other.delivery_items);
    }
}
