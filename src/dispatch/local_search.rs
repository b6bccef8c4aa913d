//! LocalSearch (spec.md §4.6): four neighborhood operators, each "find the
//! single best improving move in the entire neighborhood, then apply it",
//! run in a fixed-order descent loop until none improves or a wall-clock
//! budget expires.
//!
//! Grounded on `localsearch.py`'s four `improve_by_*` functions and its
//! `swap_nodes`/`couple_is_removeable` helpers, translated from object
//! pointers to arena handles.

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::dispatch::constraint;
use crate::dispatch::evaluator;
use crate::dispatch::inserter;
use crate::dispatch::plan::Plan;
use crate::dispatch::route_list::{StepHandle, StepKind};

fn is_pickup(plan: &Plan, step: StepHandle) -> bool {
    plan.arena().kind(step) == StepKind::Pickup
}

fn partner(plan: &Plan, step: StepHandle) -> StepHandle {
    plan.arena()
        .partner(step)
        .expect("every interior PICKUP/DELIVERY has a partner (spec.md §3 Pairing invariant)")
}

/// `n1.remove(); n1.insert_after(n2); n2.remove(); n2.insert_after(n1_pred)`,
/// with the neighboring-node special cases `localsearch.py`'s `swap_nodes` handles.
fn swap_steps(plan: &mut Plan, a: StepHandle, b: StepHandle) {
    if a == b {
        return;
    }
    let a_succ = plan.arena().succ(a);
    if a_succ == b {
        plan.remove(a);
        plan.insert_after(a, b);
        return;
    }
    let b_succ = plan.arena().succ(b);
    if b_succ == a {
        plan.remove(b);
        plan.insert_after(b, a);
        return;
    }
    let a_pred = plan.arena().pred(a);
    plan.remove(a);
    plan.insert_after(a, b);
    plan.remove(b);
    plan.insert_after(b, a_pred);
}

/// Whether removing `pickup`'s couple from vehicle `v` would still satisfy the
/// destination constraint (capacity/LIFO cannot be violated by a pure removal).
fn couple_is_removable(plan: &mut Plan, v: usize, pickup: StepHandle) -> bool {
    let delivery = partner(plan, pickup);
    let pred_pickup = plan.arena().pred(pickup);
    let pred_delivery = plan.arena().pred(delivery);
    plan.remove(pickup);
    plan.remove(delivery);
    let ok = constraint::check_destination(plan, v);
    plan.insert_after(pickup, pred_pickup);
    plan.insert_after(delivery, pred_delivery);
    ok
}

/// Removes a PICKUP/DELIVERY couple and re-inserts it anywhere (any vehicle),
/// reusing the constructive search. Spec.md §4.6 couple-relocation.
pub fn couple_relocation(plan: &mut Plan, config: &Config) -> bool {
    let initial_score = evaluator::score(plan, config);
    let mut best_score = initial_score;
    let mut best: Option<(StepHandle, StepHandle, StepHandle, StepHandle)> = None;

    for v in 0..plan.num_vehicles() {
        let route = plan.route(v);
        let pickups: Vec<StepHandle> = route
            .interior(plan.arena())
            .filter(|&s| is_pickup(plan, s))
            .collect();

        for pickup in pickups {
            if plan.arena().pinned(pickup) {
                continue;
            }
            let delivery = partner(plan, pickup);
            let orig_pred_pickup = plan.arena().pred(pickup);
            let orig_pred_delivery = plan.arena().pred(delivery);
            plan.remove(pickup);
            plan.remove(delivery);

            if constraint::check(plan, v) {
                if let Some(candidate) = inserter::search_best_placement(plan, config, pickup, delivery) {
                    if candidate.score + config.ls_epsilon < best_score {
                        best_score = candidate.score;
                        best = Some((pickup, delivery, candidate.anchor_pickup, candidate.anchor_delivery));
                    }
                }
            }

            plan.insert_after(pickup, orig_pred_pickup);
            plan.insert_after(delivery, orig_pred_delivery);
        }
    }

    match best {
        Some((pickup, delivery, anchor_pickup, anchor_delivery)) => {
            plan.remove(pickup);
            plan.remove(delivery);
            plan.insert_after(pickup, anchor_pickup);
            plan.insert_after(delivery, anchor_delivery);
            true
        }
        None => false,
    }
}

/// Removes a whole block (PICKUP through its partner DELIVERY, inclusive) and
/// re-inserts it after any anchor in any route. Spec.md §4.6 block-relocation.
pub fn block_relocation(plan: &mut Plan, config: &Config) -> bool {
    let initial_score = evaluator::score(plan, config);
    let mut best_score = initial_score;
    let mut best: Option<(StepHandle, StepHandle, StepHandle)> = None; // (first, last, anchor)

    for v in 0..plan.num_vehicles() {
        let route = plan.route(v);
        let pickups: Vec<StepHandle> = route
            .interior(plan.arena())
            .filter(|&s| is_pickup(plan, s))
            .collect();

        for pickup in pickups {
            if plan.arena().pinned(pickup) {
                continue;
            }
            let delivery = partner(plan, pickup);
            let original_pred = plan.arena().pred(pickup);
            plan.remove_segment(pickup, delivery);

            if !constraint::check_destination(plan, v) {
                plan.insert_segment_after(pickup, delivery, original_pred);
                continue;
            }

            for ov in 0..plan.num_vehicles() {
                let other_route = plan.route(ov);
                let anchors: Vec<StepHandle> = other_route.interior_plus_begin(plan.arena()).collect();
                for anchor in anchors {
                    plan.insert_segment_after(pickup, delivery, anchor);
                    if constraint::check(plan, ov) {
                        let score = evaluator::score(plan, config);
                        if score + config.ls_epsilon < best_score {
                            best_score = score;
                            best = Some((pickup, delivery, anchor));
                        }
                    }
                    plan.remove_segment(pickup, delivery);
                }
            }

            plan.insert_segment_after(pickup, delivery, original_pred);
        }
    }

    match best {
        Some((first, last, anchor)) => {
            plan.remove_segment(first, last);
            plan.insert_segment_after(first, last, anchor);
            true
        }
        None => false,
    }
}

/// Swaps two PICKUP/DELIVERY couples, enumerating `(p1, p2)` with
/// `vehicle(p1) <= vehicle(p2)` and, when equal, `p2` after `p1`. Spec.md §4.6
/// couple-exchange.
pub fn couple_exchange(plan: &mut Plan, config: &Config) -> bool {
    let initial_score = evaluator::score(plan, config);
    let mut best_score = initial_score;
    let mut best: Option<(StepHandle, StepHandle)> = None;

    let num_vehicles = plan.num_vehicles();
    for v1 in 0..num_vehicles {
        let route1 = plan.route(v1);
        let pickups1: Vec<StepHandle> = route1
            .interior(plan.arena())
            .filter(|&s| is_pickup(plan, s))
            .collect();

        for pickup1 in pickups1 {
            if plan.arena().pinned(pickup1) || !couple_is_removable(plan, v1, pickup1) {
                continue;
            }

            for v2 in v1..num_vehicles {
                let pickups2: Vec<StepHandle> = if v1 == v2 {
                    plan.arena().following(pickup1, &route1).filter(|&s| is_pickup(plan, s)).collect()
                } else {
                    plan.route(v2)
                        .interior(plan.arena())
                        .filter(|&s| is_pickup(plan, s))
                        .collect()
                };

                for pickup2 in pickups2 {
                    if plan.arena().pinned(pickup2) || !couple_is_removable(plan, v2, pickup2) {
                        continue;
                    }

                    let delivery1 = partner(plan, pickup1);
                    let delivery2 = partner(plan, pickup2);

                    swap_steps(plan, pickup1, pickup2);
                    swap_steps(plan, delivery1, delivery2);

                    if constraint::check(plan, v1) && constraint::check(plan, v2) {
                        let score = evaluator::score(plan, config);
                        if score + config.ls_epsilon < best_score {
                            best_score = score;
                            best = Some((pickup1, pickup2));
                        }
                    }

                    swap_steps(plan, pickup1, pickup2);
                    swap_steps(plan, delivery1, delivery2);
                }
            }
        }
    }

    match best {
        Some((pickup1, pickup2)) => {
            let delivery1 = partner(plan, pickup1);
            let delivery2 = partner(plan, pickup2);
            swap_steps(plan, pickup1, pickup2);
            swap_steps(plan, delivery1, delivery2);
            true
        }
        None => false,
    }
}

/// Swaps two blocks, with the same vehicle-ordering enumeration rule as
/// couple-exchange. Spec.md §4.6 block-exchange.
pub fn block_exchange(plan: &mut Plan, config: &Config) -> bool {
    let initial_score = evaluator::score(plan, config);
    let mut best_score = initial_score;
    let mut best: Option<(StepHandle, StepHandle, StepHandle, StepHandle)> = None; // (first1, last1, first2, last2)

    let num_vehicles = plan.num_vehicles();
    for v in 0..num_vehicles {
        let route = plan.route(v);
        let pickups: Vec<StepHandle> = route
            .interior(plan.arena())
            .filter(|&s| is_pickup(plan, s))
            .collect();

        for pickup in pickups {
            if plan.arena().pinned(pickup) {
                continue;
            }
            let delivery = partner(plan, pickup);
            let original_pred_1 = plan.arena().pred(pickup);
            plan.remove_segment(pickup, delivery);

            if !constraint::check_destination(plan, v) {
                plan.insert_segment_after(pickup, delivery, original_pred_1);
                continue;
            }

            for ov in v..num_vehicles {
                let other_pickups: Vec<StepHandle> = if v == ov {
                    plan.arena()
                        .following(original_pred_1, &route)
                        .filter(|&s| is_pickup(plan, s))
                        .collect()
                } else {
                    plan.route(ov)
                        .interior(plan.arena())
                        .filter(|&s| is_pickup(plan, s))
                        .collect()
                };

                for other_pickup in other_pickups {
                    if plan.arena().pinned(other_pickup) {
                        continue;
                    }
                    let other_delivery = partner(plan, other_pickup);
                    let original_pred_2 = plan.arena().pred(other_pickup);
                    plan.remove_segment(other_pickup, other_delivery);

                    if !constraint::check_destination(plan, ov) {
                        plan.insert_segment_after(other_pickup, other_delivery, original_pred_2);
                        continue;
                    }

                    plan.insert_segment_after(pickup, delivery, original_pred_2);
                    if !constraint::check(plan, ov) {
                        plan.remove_segment(pickup, delivery);
                        plan.insert_segment_after(other_pickup, other_delivery, original_pred_2);
                        continue;
                    }

                    plan.insert_segment_after(other_pickup, other_delivery, original_pred_1);
                    if !constraint::check(plan, v) {
                        plan.remove_segment(other_pickup, other_delivery);
                        plan.remove_segment(pickup, delivery);
                        plan.insert_segment_after(other_pickup, other_delivery, original_pred_2);
                        continue;
                    }

                    let score = evaluator::score(plan, config);
                    if score + config.ls_epsilon < best_score {
                        best_score = score;
                        best = Some((pickup, delivery, other_pickup, other_delivery));
                    }

                    plan.remove_segment(other_pickup, other_delivery);
                    plan.remove_segment(pickup, delivery);
                    plan.insert_segment_after(other_pickup, other_delivery, original_pred_2);
                }
            }

            plan.insert_segment_after(pickup, delivery, original_pred_1);
        }
    }

    match best {
        Some((first1, last1, first2, last2)) => {
            let pred1 = plan.arena().pred(first1);
            plan.remove_segment(first1, last1);
            let pred2 = plan.arena().pred(first2);
            plan.remove_segment(first2, last2);
            plan.insert_segment_after(first1, last1, pred2);
            plan.insert_segment_after(first2, last2, pred1);
            true
        }
        None => false,
    }
}

/// Name of the operator that last returned `true`, for logging/diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    BlockRelocation,
    CoupleRelocation,
    BlockExchange,
    CoupleExchange,
}

/// One pass over the fixed preference order `block-relocation,
/// couple-relocation, block-exchange, couple-exchange`; stops at (and returns)
/// the first operator that improves the plan. Spec.md §4.6 "Descent loop".
pub fn improve_once(plan: &mut Plan, config: &Config) -> Option<Operator> {
    if block_relocation(plan, config) {
        return Some(Operator::BlockRelocation);
    }
    if couple_relocation(plan, config) {
        return Some(Operator::CoupleRelocation);
    }
    if block_exchange(plan, config) {
        return Some(Operator::BlockExchange);
    }
    if couple_exchange(plan, config) {
        return Some(Operator::CoupleExchange);
    }
    None
}

/// Repeats [`improve_once`] until no operator improves the plan or the
/// wall-clock budget (`config.time_budget_seconds`) expires.
pub fn run(plan: &mut Plan, config: &Config) -> u32 {
    let start = Instant::now();
    let budget = Duration::from_secs_f64(config.time_budget_seconds.max(0.0));
    let mut iterations = 0;

    loop {
        if start.elapsed() > budget {
            tracing::debug!(
                iterations,
                elapsed = %humantime::format_duration(start.elapsed()),
                "local search stopped: time budget expired"
            );
            break;
        }
        match improve_once(plan, config) {
            Some(operator) => {
                iterations += 1;
                tracing::trace!(?operator, iterations, "local search applied an improving move");
            }
            None => {
                tracing::debug!(iterations, "local search converged: no operator improves the plan");
                break;
            }
        }
    }

    iterations
}
