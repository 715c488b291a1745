//! CP solver interface.

use super::model::CpModel;
use super::variables::{BoolVarId, IntVarId};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible (but not necessarily optimal) solution found.
    Feasible,
    /// No feasible solution exists.
    Infeasible,
    /// Model is invalid or malformed.
    ModelInvalid,
    /// Search stopped before finding a solution or proving infeasibility.
    Unknown,
}

impl SolverStatus {
    /// Lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Feasible => "feasible",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::ModelInvalid => "model_invalid",
            SolverStatus::Unknown => "unknown",
        }
    }
}

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The search space was exhausted.
    Completed,
    /// The wall-clock budget ran out.
    TimeLimit,
    /// The node budget ran out.
    NodeLimit,
    /// A solution was found and `stop_after_first` was set.
    SolutionLimit,
    /// The cancellation flag was raised.
    Cancelled,
}

/// Search effort counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search nodes visited.
    pub nodes: u64,
    /// Improving solutions found.
    pub solutions: u64,
    /// Wall-clock time spent in the solver.
    pub elapsed_ms: u64,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value of the returned valuation (if any).
    pub objective_value: Option<i64>,
    /// One value per model variable; empty when no solution was found.
    pub values: Vec<i64>,
    /// Why the search ended.
    pub stop_reason: StopReason,
    /// Search effort.
    pub stats: SearchStats,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
            stop_reason: StopReason::Completed,
            stats: SearchStats::default(),
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// Value assigned to an integer variable.
    pub fn value(&self, var: IntVarId) -> Option<i64> {
        self.values.get(var.index()).copied()
    }

    /// Value assigned to a boolean variable.
    pub fn bool_value(&self, var: BoolVarId) -> Option<bool> {
        self.values.get(var.index()).map(|&v| v != 0)
    }
}

/// Solver configuration.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds. 0 = no limit.
    pub time_limit_ms: u64,
    /// Maximum number of search nodes. 0 = no limit.
    pub node_limit: u64,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            node_limit: 0,
            stop_after_first: false,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = nodes;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }
}

/// Trait for CP solver implementations.
///
/// Implementors provide the actual constraint solving logic. This can wrap
/// an external engine or provide a custom search, as long as it honours
/// the status contract: a valuation is returned exactly when the status is
/// [`SolverStatus::Optimal`] or [`SolverStatus::Feasible`].
pub trait CpSolver {
    /// Solves the model with an optional cancellation flag.
    ///
    /// When the flag is raised the solver should stop promptly and return
    /// the best valuation found so far, or [`SolverStatus::Unknown`].
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution;

    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        self.solve_with_cancel(model, config, None)
    }
}
