use serde::{Deserialize, Serialize};

/// Boundary-visible configuration constants, per spec.md §6.
///
/// These are stable for the duration of one round; the caller may vary them
/// between rounds (e.g. to shrink `time_budget_seconds` for a test), but nothing
/// inside the dispatch core mutates a `Config` once a round has started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Config {
    /// Fixed time (seconds) a vehicle spends approaching the dock, charged once
    /// per contiguous run of Steps at the same factory.
    pub dock_approaching_time: i64,
    /// Tardiness-to-distance conversion weight used in the objective
    /// (`score = distance / V + (lamda / 3600) * tardiness`).
    pub lamda: f64,
    /// Wall-clock budget (seconds) for the local-search descent loop.
    pub time_budget_seconds: f64,
    /// Minimum improvement (in objective units) required for a move to be
    /// accepted, guarding against accepting rounding noise.
    pub ls_epsilon: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Matches the teacher's own `dock_approaching_time: Duration::minutes(30)`
            // in `simulation::simulator::Simulator::new`.
            dock_approaching_time: 1800,
            lamda: 1.0,
            time_budget_seconds: 570.0,
            ls_epsilon: 1e-6,
        }
    }
}
