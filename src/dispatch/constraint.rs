//! ConstraintChecker (spec.md §4.3): three cheap predicates over `(Plan, vehicle)`,
//! invoked in the innermost loop of every neighborhood operator, so each is a
//! single linear pass with no allocation beyond a LIFO scratch stack.

use crate::dispatch::plan::Plan;
use crate::dispatch::route_list::StepKind;
use crate::model::ItemId;

/// If the vehicle has a committed destination, the first interior Step's
/// factory must equal it; otherwise trivially satisfied.
pub fn check_destination(plan: &Plan, v: usize) -> bool {
    let Some(dest) = plan.vehicle(v).destination_factory else {
        return true;
    };
    let route = plan.route(v);
    match route.first(plan.arena()) {
        Some(first) => plan.arena().factory(first) == dest,
        None => false,
    }
}

/// Single linear pass accumulating net load from `carrying_items`; rejects as
/// soon as load exceeds capacity.
pub fn check_capacity(plan: &Plan, v: usize) -> bool {
    let route = plan.route(v);
    let capacity = plan.vehicle(v).capacity;
    let mut load = plan.carried_demand(v);
    if load > capacity {
        return false;
    }
    for step in route.interior(plan.arena()) {
        let demand: f64 = plan.arena().items(step).iter().map(|id| plan.demand_of(id)).sum();
        match plan.arena().kind(step) {
            StepKind::Pickup => {
                load += demand;
                if load > capacity {
                    return false;
                }
            }
            StepKind::Delivery => load -= demand,
            _ => unreachable!("interior() never yields sentinels"),
        }
    }
    true
}

/// Single linear pass maintaining a stack seeded with `carrying_items`
/// (bottom-first); PICKUP pushes its items in listed order, DELIVERY pops
/// `len(items)` entries and requires the popped (top-first) sequence to equal
/// the DELIVERY Step's items. A trailing empty stack is required.
pub fn check_lifo(plan: &Plan, v: usize) -> bool {
    let route = plan.route(v);
    let mut stack: Vec<ItemId> = plan.vehicle(v).carrying_items.clone();
    for step in route.interior(plan.arena()) {
        let items = plan.arena().items(step);
        match plan.arena().kind(step) {
            StepKind::Pickup => stack.extend(items.iter().cloned()),
            StepKind::Delivery => {
                if items.len() > stack.len() {
                    return false;
                }
                let split = stack.len() - items.len();
                let popped = &stack[split..];
                if !popped.iter().rev().eq(items.iter()) {
                    return false;
                }
                stack.truncate(split);
            }
            _ => unreachable!("interior() never yields sentinels"),
        }
    }
    stack.is_empty()
}

/// Composite check: true iff destination, capacity and LIFO all hold.
pub fn check(plan: &Plan, v: usize) -> bool {
    check_destination(plan, v) && check_capacity(plan, v) && check_lifo(plan, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::metadata::Metadata;
    use crate::dispatch::plan::{Plan, VehicleState};
    use crate::model::{Factory, FactoryId, FactoryMap, OrderItemMap, VehicleId};
    use std::rc::Rc;

    fn meta() -> Rc<Metadata> {
        let mut factories = FactoryMap::default();
        for id in ["f1", "f2", "f3", "f4"] {
            factories.insert(
                FactoryId::new(id),
                Factory {
                    factory_id: FactoryId::new(id),
                    dock_num: 1,
                },
            );
        }
        let n = 4;
        Rc::new(
            Metadata::build(
                &factories,
                vec![VehicleId::new("v1")],
                vec![vec![0.0; n]; n],
                vec![vec![0; n]; n],
            )
            .unwrap(),
        )
    }

    fn vehicle(capacity: f64, destination_factory: Option<usize>) -> VehicleState {
        VehicleState {
            vehicle_id: VehicleId::new("v1"),
            capacity,
            current_factory: Some(0),
            leave_time_at_current_factory: 0,
            gps_update_time: 0,
            carrying_items: vec![],
            destination_factory,
            destination_arrive_time: None,
        }
    }

    #[test]
    fn empty_route_satisfies_all_three() {
        let plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(10.0, None)]);
        assert!(check(&plan, 0));
    }

    #[test]
    fn capacity_violation_is_rejected() {
        let mut items = OrderItemMap::default();
        use crate::model::{Map, OrderId, OrderItem};
        for id in ["i1", "i2"] {
            items.insert(
                ItemId::new(id),
                OrderItem {
                    item_id: ItemId::new(id),
                    order_id: OrderId::new("o1"),
                    demand: 1.0,
                    pickup_factory: FactoryId::new("f1"),
                    delivery_factory: FactoryId::new("f2"),
                    committed_completion_time: 0,
                    load_time: 0,
                    unload_time: 0,
                },
            );
        }
        let mut plan = Plan::new(meta(), Rc::new(items), vec![vehicle(1.0, None)]);
        let route = plan.route(0);
        let (p, d) = plan.alloc_pair(0, 1, vec![ItemId::new("i1"), ItemId::new("i2")], false);
        plan.insert_after(p, route.begin);
        plan.insert_after(d, p);
        assert!(!check_capacity(&plan, 0));
    }

    #[test]
    fn lifo_violation_is_rejected() {
        // PICKUP(A) -> PICKUP(B) -> DELIVERY(A) -> DELIVERY(B) must fail LIFO,
        // per spec.md §8 scenario 4.
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(100.0, None)]);
        let route = plan.route(0);
        let (pa, da) = plan.alloc_pair(0, 1, vec![ItemId::new("a")], false);
        let (pb, db) = plan.alloc_pair(0, 1, vec![ItemId::new("b")], false);
        plan.insert_after(pa, route.begin);
        plan.insert_after(pb, pa);
        plan.insert_after(da, pb);
        plan.insert_after(db, da);
        assert!(!check_lifo(&plan, 0));
    }

    #[test]
    fn destination_mismatch_is_rejected() {
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(100.0, Some(2))]);
        let route = plan.route(0);
        let (p, d) = plan.alloc_pair(0, 1, vec![ItemId::new("i1")], true);
        plan.insert_after(p, route.begin);
        plan.insert_after(d, p);
        assert!(!check_destination(&plan, 0));
    }
}
