//! Output serialization (spec.md §6): converts a [`Plan`]'s RouteLists back into
//! boundary `Visit`s, splitting each vehicle's sequence into a committed
//! `destination` and a trailing `planned_route`.
//!
//! Grounded on `algorithm_best_insert.py::convert_solution` and its
//! `__combine_duplicated_nodes` helper.

use crate::dispatch::plan::Plan;
use crate::dispatch::route_list::StepKind;
use crate::model::{Map, VehicleId, Visit};

/// One vehicle's output: its new committed destination (if any) and the tail
/// of still-pending stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleOutput {
    pub destination: Option<Visit>,
    pub planned_route: Vec<Visit>,
}

/// Serializes every vehicle's RouteList into the spec.md §6 output shape.
///
/// For each RouteList: one Visit per interior Step (factory index resolved back
/// to a `FactoryId`, `pickup_items`/`delivery_items` populated from PICKUP/DELIVERY
/// Steps respectively), then adjacent Visits sharing a `factory_id` are merged by
/// concatenating their item lists. If the vehicle had an incoming committed
/// destination, the first resulting Visit becomes the output destination (with
/// its `arrive_time` preserved from the input); otherwise every Visit becomes
/// part of `planned_route` and no destination is emitted.
pub fn serialize(plan: &Plan) -> std::collections::BTreeMap<VehicleId, VehicleOutput> {
    let mut out = std::collections::BTreeMap::new();

    for v in 0..plan.num_vehicles() {
        let route = plan.route(v);
        let vehicle = plan.vehicle(v);

        let mut visits: Vec<Visit> = Vec::new();
        for step in route.interior(plan.arena()) {
            let factory_id = plan.meta.factory_id(plan.arena().factory(step)).clone();
            let mut visit = Visit::new(factory_id);
            match plan.arena().kind(step) {
                StepKind::Pickup => visit.pickup_items = plan.arena().items(step).to_vec(),
                StepKind::Delivery => visit.delivery_items = plan.arena().items(step).to_vec(),
                _ => unreachable!("interior() never yields sentinels"),
            }
            visits.push(visit);
        }

        let merged = merge_adjacent(visits);

        let output = if vehicle.destination_factory.is_some() {
            let mut iter = merged.into_iter();
            match iter.next() {
                Some(mut destination) => {
                    destination.arrive_time = vehicle.destination_arrive_time;
                    VehicleOutput {
                        destination: Some(destination),
                        planned_route: iter.collect(),
                    }
                }
                None => {
                    tracing::warn!(
                        vehicle_id = %vehicle.vehicle_id,
                        "vehicle has a committed destination but an empty route after serialization"
                    );
                    VehicleOutput::default()
                }
            }
        } else {
            VehicleOutput {
                destination: None,
                planned_route: merged,
            }
        };

        out.insert(vehicle.vehicle_id.clone(), output);
    }

    out
}

/// Concatenates consecutive Visits that share a `factory_id`, mirroring
/// `__combine_duplicated_nodes`.
fn merge_adjacent(visits: Vec<Visit>) -> Vec<Visit> {
    let mut merged: Vec<Visit> = Vec::with_capacity(visits.len());
    for visit in visits {
        match merged.last_mut() {
            Some(last) if last.factory_id == visit.factory_id => last.merge(visit),
            _ => merged.push(visit),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::metadata::Metadata;
    use crate::dispatch::plan::VehicleState;
    use crate::model::{Factory, FactoryId, FactoryMap, ItemId, OrderItemMap};
    use std::rc::Rc;

    fn meta() -> Rc<Metadata> {
        let mut factories = FactoryMap::default();
        for id in ["f0", "f1", "f2"] {
            factories.insert(
                FactoryId::new(id),
                Factory {
                    factory_id: FactoryId::new(id),
                    dock_num: 1,
                },
            );
        }
        Rc::new(
            Metadata::build(
                &factories,
                vec![VehicleId::new("v1")],
                vec![vec![0.0; 3]; 3],
                vec![vec![0; 3]; 3],
            )
            .unwrap(),
        )
    }

    fn vehicle(destination_factory: Option<usize>, arrive_time: Option<i64>) -> VehicleState {
        VehicleState {
            vehicle_id: VehicleId::new("v1"),
            capacity: 10.0,
            current_factory: Some(0),
            leave_time_at_current_factory: 0,
            gps_update_time: 0,
            carrying_items: vec![],
            destination_factory,
            destination_arrive_time: arrive_time,
        }
    }

    #[test]
    fn adjacent_same_factory_steps_are_merged_into_one_visit() {
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(None, None)]);
        let route = plan.route(0);
        let (p1, d1) = plan.alloc_pair(1, 2, vec![ItemId::new("i1")], false);
        let (p2, d2) = plan.alloc_pair(1, 2, vec![ItemId::new("i2")], false);
        plan.insert_after(p1, route.begin);
        plan.insert_after(p2, p1);
        plan.insert_after(d1, p2);
        plan.insert_after(d2, d1);

        let out = serialize(&plan);
        let output = &out[&VehicleId::new("v1")];
        assert!(output.destination.is_none());
        assert_eq!(output.planned_route.len(), 2);
        assert_eq!(
            output.planned_route[0].pickup_items,
            vec![ItemId::new("i1"), ItemId::new("i2")]
        );
        assert_eq!(
            output.planned_route[1].delivery_items,
            vec![ItemId::new("i1"), ItemId::new("i2")]
        );
    }

    #[test]
    fn committed_destination_splits_off_first_visit_and_preserves_arrive_time() {
        let mut plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(Some(1), Some(5_000))]);
        let route = plan.route(0);
        let (p, d) = plan.alloc_pair(1, 2, vec![ItemId::new("i1")], true);
        plan.insert_after(p, route.begin);
        plan.insert_after(d, p);

        let out = serialize(&plan);
        let output = &out[&VehicleId::new("v1")];
        let destination = output.destination.as_ref().unwrap();
        assert_eq!(destination.factory_id, FactoryId::new("f1"));
        assert_eq!(destination.arrive_time, Some(5_000));
        assert_eq!(output.planned_route.len(), 1);
        assert_eq!(output.planned_route[0].factory_id, FactoryId::new("f2"));
    }

    #[test]
    fn empty_route_yields_no_destination_and_empty_planned_route() {
        let plan = Plan::new(meta(), Rc::new(OrderItemMap::default()), vec![vehicle(None, None)]);
        let out = serialize(&plan);
        let output = &out[&VehicleId::new("v1")];
        assert!(output.destination.is_none());
        assert!(output.planned_route.is_empty());
    }
}
