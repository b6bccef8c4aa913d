//! Round-level orchestration: Bootstrap → ConstructiveInserter → LocalSearch →
//! serialize, wired together the way `localsearch_solver.py::scheduling` chains
//! `__init_problemdata` / `dispatch_orders_to_vehicles` / `improve` /
//! `__output_solution`.
//!
//! This is the one entry point external collaborators (JSON ingestion, the
//! simulator, CLI plumbing — all out of scope per spec.md §1) are expected to
//! call once per decision round.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::Config;
use crate::dispatch::error::DispatchError;
use crate::dispatch::serialize::{self, VehicleOutput};
use crate::dispatch::{bootstrap, local_search};
use crate::model::{FactoryMap, ItemId, Map, OrderId, OrderItemMap, VehicleId, VehicleMap};

/// Everything one dispatch round needs, already deserialized from the boundary.
pub struct RoundInput {
    pub factories: FactoryMap,
    pub vehicles: VehicleMap,
    pub unallocated_order_items: OrderItemMap,
    pub ongoing_order_items: OrderItemMap,
    pub distance_mtx: Vec<Vec<f64>>,
    pub time_mtx: Vec<Vec<i64>>,
    pub first_iteration_flag: bool,
}

/// Runs one full dispatch round and returns the per-vehicle output.
///
/// Errors surface the spec.md §7 taxonomy verbatim; the caller decides what to
/// do with `MalformedInput`/`InfeasibleConstruction`/`InvariantViolation` (see
/// [`run_round_or_empty`] for the propagation policy §7 prescribes).
pub fn run_round(input: RoundInput, config: &Config) -> Result<BTreeMap<VehicleId, VehicleOutput>, DispatchError> {
    let RoundInput {
        factories,
        vehicles,
        unallocated_order_items,
        ongoing_order_items,
        distance_mtx,
        time_mtx,
        first_iteration_flag,
    } = input;

    let unallocated_ids: Vec<ItemId> = unallocated_order_items.keys().cloned().collect();

    let mut all_items = unallocated_order_items.into_iter().collect::<std::collections::BTreeMap<_, _>>();
    for (id, item) in ongoing_order_items.into_iter() {
        all_items.entry(id).or_insert(item);
    }
    let all_items: Rc<OrderItemMap> = Rc::new(all_items.into());

    let (mut plan, unallocated_ids) = bootstrap::run(
        &factories,
        &vehicles,
        all_items,
        distance_mtx,
        time_mtx,
        &unallocated_ids,
        first_iteration_flag,
    )?;

    for item_ids in group_by_order(&plan.items, &unallocated_ids) {
        crate::dispatch::inserter::insert_order(&mut plan, config, &item_ids)?;
    }

    let iterations = local_search::run(&mut plan, config);
    tracing::info!(iterations, "local search descent finished");

    Ok(serialize::serialize(&plan))
}

/// Groups item ids by `order_id`, preserving each order's first-seen item
/// order — `ConstructiveInserter` needs one call per order (spec.md §4.5), not
/// per item.
fn group_by_order(items: &OrderItemMap, item_ids: &[ItemId]) -> Vec<Vec<ItemId>> {
    let mut order_ids: Vec<OrderId> = Vec::new();
    let mut grouped: std::collections::HashMap<OrderId, Vec<ItemId>> = std::collections::HashMap::new();
    for id in item_ids {
        let Some(item) = items.get(id) else { continue };
        grouped.entry(item.order_id.clone()).or_insert_with(|| {
            order_ids.push(item.order_id.clone());
            Vec::new()
        });
        grouped.get_mut(&item.order_id).unwrap().push(id.clone());
    }
    order_ids.into_iter().map(|id| grouped.remove(&id).unwrap()).collect()
}

/// Propagation policy of spec.md §7: on any `DispatchError`, log it and emit an
/// empty plan (no destination changes, no planned_route for any vehicle) so the
/// caller preserves whatever state the previous round already committed.
pub fn run_round_or_empty(input: RoundInput, config: &Config) -> BTreeMap<VehicleId, VehicleOutput> {
    let vehicle_ids: Vec<VehicleId> = input.vehicles.keys().cloned().collect();
    match run_round(input, config) {
        Ok(output) => output,
        Err(err) => {
            tracing::error!(error = %err, "dispatch round failed; emitting an empty plan");
            vehicle_ids.into_iter().map(|id| (id, VehicleOutput::default())).collect()
        }
    }
}
