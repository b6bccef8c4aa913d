//! Typed error taxonomy for the dispatch core, per spec.md §7.
//!
//! The reference Python implementation mostly just logs and discards bad input
//! (see `__read_input_json`'s destination reconciliation); the dispatch core
//! instead makes the three failure classes spec.md §7 distinguishes explicit
//! so a caller can tell "your input was bad" from "we have a bug" apart.
//! Harness and CSV-facing code (`main`, `schedule::naive`) still wraps these
//! (and everything else) in `anyhow::Error`, matching the teacher's own style.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The round's input does not satisfy the data-model invariants spec.md §3
    /// requires (dangling ids, non-square matrices, negative demand, ...).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No feasible placement exists for an order item under the three hard
    /// constraints (destination/capacity/LIFO), even though the input itself
    /// was well-formed. Not a bug — a property of the instance.
    #[error("no feasible insertion for item {item_id}: {reason}")]
    InfeasibleConstruction { item_id: String, reason: String },

    /// An internal invariant the dispatch core is supposed to maintain by
    /// construction was violated. Always a bug in this crate, never the caller's.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
