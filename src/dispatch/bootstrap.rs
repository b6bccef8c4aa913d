//! Bootstrap (spec.md §4.7): converts the inbound fleet snapshot into the
//! initial Plan so the ConstructiveInserter can proceed.
//!
//! Grounded on `algorithm_best_insert.py`'s "NEW METHOD: RECONSTRUCT ROUTE
//! PLAN FROM PREVIOUS ITERATION" block (`extend_LLRoute_with_node` +
//! `set_partner_nodes`).

use std::collections::HashSet;
use std::rc::Rc;

use crate::dispatch::error::DispatchError;
use crate::dispatch::metadata::Metadata;
use crate::dispatch::plan::{Plan, VehicleState};
use crate::dispatch::route_list::{Route, StepHandle, StepKind};
use crate::model::{FactoryMap, ItemId, Map, OrderId, OrderItemMap, VehicleMap, Visit};

/// Splits a Visit's item list into contiguous runs sharing one order_id,
/// mirroring `extend_LLRoute_with_node`'s `curr_order_id`/`curr_package` loop.
fn partition_by_order(item_ids: &[ItemId], items: &OrderItemMap) -> Vec<Vec<ItemId>> {
    let mut runs: Vec<Vec<ItemId>> = Vec::new();
    let mut current: Option<OrderId> = None;
    for id in item_ids {
        let order_id = items.get(id).map(|item| item.order_id.clone());
        if runs.is_empty() || order_id != current {
            runs.push(Vec::new());
            current = order_id;
        }
        runs.last_mut().unwrap().push(id.clone());
    }
    runs
}

fn append_step(plan: &mut Plan, route: Route, kind: StepKind, factory: usize, items: Vec<ItemId>) -> StepHandle {
    let handle = plan.arena_mut().alloc(kind, factory, items, true);
    let anchor = route.last(plan.arena()).unwrap_or(route.begin);
    plan.insert_after(handle, anchor);
    handle
}

/// Replays one Visit's items into `route`: DELIVERY runs first, then PICKUP
/// runs (each partitioned by contiguous order_id), per spec.md §4.7 step 2.
fn replay_visit(plan: &mut Plan, route: Route, visit: &Visit) -> Result<(), DispatchError> {
    let factory = plan
        .meta
        .factory_index(&visit.factory_id)
        .ok_or_else(|| DispatchError::MalformedInput(format!("unknown factory {}", visit.factory_id)))?;

    for run in partition_by_order(&visit.delivery_items, &plan.items.clone()) {
        append_step(plan, route, StepKind::Delivery, factory, run);
    }
    for run in partition_by_order(&visit.pickup_items, &plan.items.clone()) {
        append_step(plan, route, StepKind::Pickup, factory, run);
    }
    Ok(())
}

/// Stack-based re-pairing over one vehicle's freshly-replayed route (spec.md
/// §4.7 step 3): a DELIVERY whose items are the reverse of the top-of-stack
/// PICKUP's items is paired and popped; everything else is pushed.
///
/// A PICKUP left unpaired after the scan means its partner DELIVERY was never
/// part of the prior-round planned_route — this happens for a freshly
/// committed destination's pickup items, which have no downstream Visit yet.
/// Rather than treat that as `InvariantViolation` (the reference's literal
/// `assert not node.is_pickup` would), synthesize the missing DELIVERY at the
/// item's own `delivery_factory`, appended at the route's tail and pinned like
/// every other Bootstrap Step.
fn repair_partners(plan: &mut Plan, v: usize) -> Result<(), DispatchError> {
    let route = plan.route(v);
    let interior: Vec<StepHandle> = route.interior(plan.arena()).collect();
    let mut stack: Vec<StepHandle> = Vec::new();

    for step in interior {
        if plan.arena().kind(step) == StepKind::Delivery {
            if let Some(&top) = stack.last() {
                if plan.arena().kind(top) == StepKind::Pickup {
                    let mut reversed = plan.arena().items(step).to_vec();
                    reversed.reverse();
                    if plan.arena().items(top) == reversed.as_slice() {
                        plan.arena_mut().set_partner(top, step);
                        stack.pop();
                        continue;
                    }
                }
            }
        }
        stack.push(step);
    }

    for step in stack {
        if plan.arena().kind(step) != StepKind::Pickup || plan.arena().partner(step).is_some() {
            continue;
        }
        let items = plan.arena().items(step).to_vec();
        let delivery_factory_id = items
            .first()
            .and_then(|id| plan.items.get(id))
            .map(|item| item.delivery_factory.clone())
            .ok_or_else(|| {
                DispatchError::InvariantViolation("pickup step's items are absent from the item map".to_string())
            })?;
        let delivery_factory = plan.meta.factory_index(&delivery_factory_id).ok_or_else(|| {
            DispatchError::MalformedInput(format!("unknown delivery factory {delivery_factory_id}"))
        })?;
        let mut reversed = items;
        reversed.reverse();
        let delivery = append_step(plan, route, StepKind::Delivery, delivery_factory, reversed);
        plan.arena_mut().set_partner(step, delivery);
    }

    Ok(())
}

/// Trims a prior-round `planned_route` against the vehicle's current committed
/// destination, per spec.md §9's "destination reconciliation" Open Question.
///
/// Grounded on `algorithm_best_insert.py: __read_input_json`'s post-first-iteration
/// branch: a Visit is the destination's former self if its `pickup_items` and
/// `delivery_items` match exactly; everything up to and including the first such
/// Visit is dropped (it already happened), leaving only the still-pending tail.
/// If no Visit matches — the reference's destination was set some other way since
/// the prior round wrote this route — the whole prior-round route is stale and is
/// discarded, but the anomaly is logged rather than silently dropped as the
/// original Python does.
fn reconcile_planned_route(vehicle_id: &crate::model::VehicleId, destination: &Visit, planned_route: Vec<Visit>) -> Vec<Visit> {
    match planned_route
        .iter()
        .position(|v| v.pickup_items == destination.pickup_items && v.delivery_items == destination.delivery_items)
    {
        Some(idx) => planned_route.into_iter().skip(idx + 1).collect(),
        None => {
            if !planned_route.is_empty() {
                tracing::warn!(
                    %vehicle_id,
                    "prior-round planned_route contains no Visit matching the committed destination; discarding it"
                );
            }
            Vec::new()
        }
    }
}

/// Builds the initial Plan from the inbound fleet snapshot and returns it
/// alongside the item ids still needing a fresh placement (i.e. not already
/// covered by a pinned Step).
pub fn run(
    factories: &FactoryMap,
    vehicles: &VehicleMap,
    all_items: Rc<OrderItemMap>,
    distance_mtx: Vec<Vec<f64>>,
    time_mtx: Vec<Vec<i64>>,
    unallocated_order_items: &[ItemId],
    first_iteration_flag: bool,
) -> Result<(Plan, Vec<ItemId>), DispatchError> {
    let meta = Rc::new(Metadata::build(factories, vehicles.keys().cloned(), distance_mtx, time_mtx)?);

    let mut vehicle_states = Vec::with_capacity(meta.num_vehicles());
    for idx in 0..meta.num_vehicles() {
        let vehicle_id = meta.vehicle_id(idx).clone();
        let vehicle = vehicles.gets(&vehicle_id);

        let current_factory = match &vehicle.current_factory {
            Some(id) => Some(
                meta.factory_index(id)
                    .ok_or_else(|| DispatchError::MalformedInput(format!("unknown factory {id}")))?,
            ),
            None => None,
        };
        let destination_factory = match &vehicle.destination {
            Some(visit) => Some(
                meta.factory_index(&visit.factory_id)
                    .ok_or_else(|| DispatchError::MalformedInput(format!("unknown factory {}", visit.factory_id)))?,
            ),
            None => None,
        };

        vehicle_states.push(VehicleState {
            vehicle_id: vehicle.vehicle_id.clone(),
            capacity: vehicle.capacity,
            current_factory,
            leave_time_at_current_factory: vehicle.leave_time_at_current_factory,
            gps_update_time: vehicle.gps_update_time,
            carrying_items: vehicle.carrying_items.clone(),
            destination_factory,
            destination_arrive_time: vehicle.destination.as_ref().and_then(|v| v.arrive_time),
        });
    }

    let mut plan = Plan::new(meta, all_items, vehicle_states);
    let mut pinned_item_ids: HashSet<ItemId> = HashSet::new();

    for idx in 0..plan.num_vehicles() {
        let vehicle_id = plan.vehicle(idx).vehicle_id.clone();
        let vehicle = vehicles.gets(&vehicle_id);

        let mut route_plan: Vec<Visit> = Vec::new();
        if let Some(destination) = &vehicle.destination {
            route_plan.push(destination.clone());
            if first_iteration_flag {
                let tail = reconcile_planned_route(&vehicle_id, destination, vehicle.planned_route.clone());
                route_plan.extend(tail);
            }
        }
        // A vehicle with no committed destination has no anchor to reconcile a
        // prior-round planned_route against, so any such route is already obsolete
        // (mirrors `vehicle.planned_route = ... if vehicle.destination else []`).

        let route = plan.route(idx);
        for visit in &route_plan {
            replay_visit(&mut plan, route, visit)?;
        }
        repair_partners(&mut plan, idx)?;

        for step in route.interior(plan.arena()) {
            pinned_item_ids.extend(plan.arena().items(step).iter().cloned());
        }
    }

    let unallocated = unallocated_order_items
        .iter()
        .filter(|id| !pinned_item_ids.contains(id))
        .cloned()
        .collect();

    Ok((plan, unallocated))
}
