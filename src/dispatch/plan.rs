//! Plan (spec.md §4.2): `V` RouteLists plus the per-vehicle state the
//! constraint checker and evaluator need (capacity, carrying_items, committed
//! destination), all sharing one [`StepArena`] so Steps can migrate between
//! vehicles' routes.

use std::rc::Rc;

use crate::dispatch::metadata::Metadata;
use crate::dispatch::route_list::{Route, StepArena, StepHandle, StepKind};
use crate::model::{ItemId, Map, OrderItemMap, VehicleId};

/// Per-vehicle fields the dispatch core actually reads, indexed by
/// `Metadata::vehicle_index`. Distinct from `model::Vehicle`: boundary fields
/// (ids, timestamps) are kept, but `carrying_items`/`destination` are tracked
/// as indices and pinned Steps rather than boundary `Visit`s.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub vehicle_id: VehicleId,
    pub capacity: f64,
    /// `Some` when the vehicle is currently parked at a factory.
    pub current_factory: Option<usize>,
    pub leave_time_at_current_factory: i64,
    pub gps_update_time: i64,
    /// Bottom-first: the item loaded earliest is at index 0.
    pub carrying_items: Vec<ItemId>,
    /// Factory index of the committed destination, if any (Destination constraint).
    pub destination_factory: Option<usize>,
    /// `arrive_time` of the incoming committed destination, preserved verbatim
    /// into the output per spec.md §6.
    pub destination_arrive_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub meta: Rc<Metadata>,
    pub items: Rc<OrderItemMap>,
    arena: StepArena,
    routes: Vec<Route>,
    vehicles: Vec<VehicleState>,
}

impl Plan {
    pub fn new(meta: Rc<Metadata>, items: Rc<OrderItemMap>, vehicles: Vec<VehicleState>) -> Self {
        let mut arena = StepArena::new();
        let routes = (0..vehicles.len()).map(|_| arena.new_route()).collect();
        Self {
            meta,
            items,
            arena,
            routes,
            vehicles,
        }
    }

    pub fn num_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    pub fn vehicle(&self, v: usize) -> &VehicleState {
        &self.vehicles[v]
    }

    pub fn route(&self, v: usize) -> Route {
        self.routes[v]
    }

    pub fn arena(&self) -> &StepArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut StepArena {
        &mut self.arena
    }

    pub fn demand_of(&self, item_id: &ItemId) -> f64 {
        self.items.get(item_id).map(|i| i.demand).unwrap_or(0.0)
    }

    /// Sum of demand over a route's `carrying_items`, independent of current Steps.
    pub fn carried_demand(&self, v: usize) -> f64 {
        self.vehicles[v]
            .carrying_items
            .iter()
            .map(|id| self.demand_of(id))
            .sum()
    }

    /// Allocates a detached PICKUP/DELIVERY pair (not yet spliced into any route).
    /// DELIVERY's items are the reverse of PICKUP's, per spec.md §3.
    pub fn alloc_pair(
        &mut self,
        factory_pickup: usize,
        factory_delivery: usize,
        items: Vec<ItemId>,
        pinned: bool,
    ) -> (StepHandle, StepHandle) {
        let mut reversed = items.clone();
        reversed.reverse();
        let pickup = self.arena.alloc(StepKind::Pickup, factory_pickup, items, pinned);
        let delivery = self.arena.alloc(StepKind::Delivery, factory_delivery, reversed, pinned);
        self.arena.set_partner(pickup, delivery);
        (pickup, delivery)
    }

    pub fn insert_after(&mut self, step: StepHandle, anchor: StepHandle) {
        self.arena.insert_after(step, anchor);
    }

    pub fn insert_segment_after(&mut self, first: StepHandle, last: StepHandle, anchor: StepHandle) {
        self.arena.insert_segment_after(first, last, anchor);
    }

    pub fn remove(&mut self, step: StepHandle) {
        self.arena.remove(step);
    }

    pub fn remove_segment(&mut self, first: StepHandle, last: StepHandle) {
        self.arena.remove_segment(first, last);
    }

    /// Which vehicle's route `step` currently belongs to, by scanning from it
    /// to the nearest sentinel. Only used off the hot path (error reporting,
    /// tests) — neighborhood operators always know the vehicle index already.
    pub fn vehicle_of(&self, mut step: StepHandle) -> Option<usize> {
        loop {
            match self.arena.kind(step) {
                StepKind::Begin => return self.routes.iter().position(|r| r.begin == step),
                StepKind::End => return self.routes.iter().position(|r| r.end == step),
                _ => step = self.arena.succ(step),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Factory, FactoryId, FactoryMap};

    fn meta() -> Rc<Metadata> {
        let mut factories = FactoryMap::default();
        factories.insert(
            FactoryId::new("f1"),
            Factory {
                factory_id: FactoryId::new("f1"),
                dock_num: 1,
            },
        );
        factories.insert(
            FactoryId::new("f2"),
            Factory {
                factory_id: FactoryId::new("f2"),
                dock_num: 1,
            },
        );
        Rc::new(
            Metadata::build(
                &factories,
                vec![VehicleId::new("v1")],
                vec![vec![0.0, 5.0], vec![5.0, 0.0]],
                vec![vec![0, 50], vec![50, 0]],
            )
            .unwrap(),
        )
    }

    fn vehicle() -> VehicleState {
        VehicleState {
            vehicle_id: VehicleId::new("v1"),
            capacity: 10.0,
            current_factory: Some(0),
            leave_time_at_current_factory: 0,
            gps_update_time: 0,
            carrying_items: vec![],
            destination_factory: None,
            destination_arrive_time: None,
        }
    }

    #[test]
    fn alloc_pair_reverses_delivery_items() {
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle()]);
        let items = vec![ItemId::new("i1"), ItemId::new("i2")];
        let (p, d) = plan.alloc_pair(0, 1, items.clone(), false);
        assert_eq!(plan.arena().items(p), &items[..]);
        let mut rev = items;
        rev.reverse();
        assert_eq!(plan.arena().items(d), &rev[..]);
    }

    #[test]
    fn vehicle_of_resolves_via_nearest_sentinel() {
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle()]);
        let route = plan.route(0);
        let (p, d) = plan.alloc_pair(0, 1, vec![ItemId::new("i1")], false);
        plan.insert_after(p, route.begin);
        plan.insert_after(d, p);
        assert_eq!(plan.vehicle_of(p), Some(0));
        assert_eq!(plan.vehicle_of(d), Some(0));
    }
}
