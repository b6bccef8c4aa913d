//! EventEvaluator (spec.md §4.4): computes the scalar objective of a Plan by
//! running a deterministic discrete-event simulation of vehicle arrivals,
//! dock-queue waiting, loading/unloading and deliveries.
//!
//! Grounded on `LLSolution.eval2` in the reference implementation — the
//! *only* evaluation path ported (spec.md §9's "commit-time semantics" open
//! question: the straight-line `evaluate`/`overall_time_no_queuing` path is
//! deliberately not carried over, since it ignores dock contention).

use std::collections::HashMap;

use crate::config::Config;
use crate::dispatch::plan::Plan;
use crate::dispatch::route_list::{StepHandle, StepKind};
use crate::model::{Map, OrderId};
use crate::dispatch::event_queue::{Event, EventQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Arrival,
    Departure,
}

#[derive(Debug, Clone, Copy)]
struct SimEvent {
    time: i64,
    kind: EventKind,
    factory: usize,
    vehicle: usize,
    step: StepHandle,
}

impl Event for SimEvent {
    type Time = i64;

    fn time(&self) -> i64 {
        self.time
    }
}

/// One factory's set of vehicles currently occupying or waiting for a dock,
/// kept sorted ascending by departure time (spec.md §4.4 "dock queue").
#[derive(Debug, Default)]
struct DockQueue {
    entries: Vec<(i64, usize)>,
}

impl DockQueue {
    fn insert(&mut self, departure_time: i64, vehicle: usize) {
        let pos = self.entries.partition_point(|&(t, _)| t <= departure_time);
        self.entries.insert(pos, (departure_time, vehicle));
    }

    fn remove_vehicle(&mut self, vehicle: usize) {
        if let Some(pos) = self.entries.iter().position(|&(_, v)| v == vehicle) {
            self.entries.remove(pos);
        }
    }

    /// Waiting time for a vehicle arriving `now` at a factory with `dock_num` docks,
    /// given the queue's state *before* this vehicle joins it.
    fn waiting_time(&self, dock_num: u32, now: i64) -> i64 {
        let queue_size = self.entries.len();
        let dock_num = dock_num as usize;
        if dock_num > queue_size {
            0
        } else {
            (self.entries[queue_size - dock_num].0 - now).max(0)
        }
    }
}

/// Computes `score = total_distance / V + (lamda / 3600) * total_tardiness`
/// by simulating every vehicle's route to completion. Pure: never mutates `plan`.
pub fn score(plan: &Plan, config: &Config) -> f64 {
    let meta = &plan.meta;
    let num_factories = meta.num_factories();
    let num_vehicles = plan.num_vehicles();

    let mut dock_queues: Vec<DockQueue> = (0..num_factories).map(|_| DockQueue::default()).collect();
    let mut events: EventQueue<SimEvent> = EventQueue::with_capacity(num_vehicles * 2);

    for v in 0..num_vehicles {
        let vehicle = plan.vehicle(v);
        let route = plan.route(v);
        if let Some(current_factory) = vehicle.current_factory {
            let dep_time = vehicle.leave_time_at_current_factory;
            if dep_time > vehicle.gps_update_time {
                dock_queues[current_factory].insert(dep_time, v);
            }
            events.push(SimEvent {
                time: dep_time,
                kind: EventKind::Departure,
                factory: current_factory,
                vehicle: v,
                step: route.begin,
            });
        } else {
            let first = route.first(plan.arena()).expect(
                "a vehicle with no current_factory must be en route to a pinned destination Step",
            );
            let arrive_time = plan
                .vehicle(v)
                .destination_arrive_time
                .expect("a vehicle en route must have a committed destination arrive_time");
            events.push(SimEvent {
                time: arrive_time,
                kind: EventKind::Arrival,
                factory: plan.arena().factory(first),
                vehicle: v,
                step: first,
            });
        }
    }

    let mut total_distance = 0.0_f64;
    let mut order_tardiness: HashMap<OrderId, i64> = HashMap::new();

    while let Some(event) = events.pop() {
        let route = plan.route(event.vehicle);
        let vehicle = plan.vehicle(event.vehicle);

        match event.kind {
            EventKind::Departure => {
                dock_queues[event.factory].remove_vehicle(event.vehicle);

                let next = plan.arena().succ(event.step);
                if next == route.end {
                    continue;
                }
                let from_factory = if event.step == route.begin {
                    vehicle
                        .current_factory
                        .expect("a departure from `begin` requires a current_factory")
                } else {
                    plan.arena().factory(event.step)
                };
                let to_factory = plan.arena().factory(next);
                let arrive_time = event.time + meta.travel_time(from_factory, to_factory);
                events.push(SimEvent {
                    time: arrive_time,
                    kind: EventKind::Arrival,
                    factory: to_factory,
                    vehicle: event.vehicle,
                    step: next,
                });
            }

            EventKind::Arrival => {
                let first = route.first(plan.arena());
                if Some(event.step) == first {
                    if let Some(current_factory) = vehicle.current_factory {
                        total_distance += meta.distance(current_factory, plan.arena().factory(event.step));
                    }
                } else {
                    let pred = plan.arena().pred(event.step);
                    total_distance += meta.distance(plan.arena().factory(pred), plan.arena().factory(event.step));
                }

                let run = merged_run(plan, &route, event.step);

                for &step in &run {
                    if plan.arena().kind(step) == StepKind::Delivery {
                        for item_id in plan.arena().items(step) {
                            let Some(item) = plan.items.get(item_id) else {
                                continue;
                            };
                            let tardiness = (event.time - item.committed_completion_time).max(0);
                            order_tardiness
                                .entry(item.order_id.clone())
                                .and_modify(|t| *t = (*t).max(tardiness))
                                .or_insert(tardiness);
                        }
                    }
                }

                let dock_num = meta.dock_num(event.factory);
                let waiting_time = dock_queues[event.factory].waiting_time(dock_num, event.time);
                let service_time: i64 = run
                    .iter()
                    .map(|&step| match plan.arena().kind(step) {
                        StepKind::Pickup => plan.arena().items(step).iter().filter_map(|id| plan.items.get(id)).map(|i| i.load_time).sum(),
                        StepKind::Delivery => plan.arena().items(step).iter().filter_map(|id| plan.items.get(id)).map(|i| i.unload_time).sum(),
                        _ => unreachable!("a merged run never contains sentinels"),
                    })
                    .sum();
                let dep_time = event.time + waiting_time + config.dock_approaching_time + service_time;
                let last = *run.last().expect("merged_run always yields at least the arrived step");

                dock_queues[event.factory].insert(dep_time, event.vehicle);
                events.push(SimEvent {
                    time: dep_time,
                    kind: EventKind::Departure,
                    factory: event.factory,
                    vehicle: event.vehicle,
                    step: last,
                });
            }
        }
    }

    let total_tardiness: i64 = order_tardiness.values().sum();
    total_distance / num_vehicles as f64 + (config.lamda / 3600.0) * total_tardiness as f64
}

/// Steps from `start` through the longest contiguous run sharing one factory,
/// stopping before the route's `end` sentinel — mirrors the `while
/// node.succ.factory == node.factory` loops in `eval2`.
fn merged_run(plan: &Plan, route: &crate::dispatch::route_list::Route, start: StepHandle) -> Vec<StepHandle> {
    let arena = plan.arena();
    let factory = arena.factory(start);
    let mut run = vec![start];
    let mut node = start;
    loop {
        let next = arena.succ(node);
        if next == route.end || arena.factory(next) != factory {
            break;
        }
        run.push(next);
        node = next;
    }
    run
}
