//! `dpdp_dispatch_core`: the dispatch and route-improvement core of a dynamic
//! pickup-and-delivery solver for a fleet of capacitated vehicles.
//!
//! See `dispatch::round::run_round` for the single per-round entry point; the
//! rest of this crate (`model`) defines the boundary data model it operates on.

pub mod config;
pub mod dispatch;
pub mod model;
