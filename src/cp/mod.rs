//! Constraint Programming (CP) modeling layer.
//!
//! Provides a solver-agnostic model for expressing constrained optimization
//! problems with integer and boolean variables over explicit finite
//! domains.
//!
//! # Key Components
//!
//! - **Variables**: [`IntVar`] with [`IntVarId`] / [`BoolVarId`] handles
//! - **Constraints**: [`Constraint`]: linear relations, division/modulo
//!   channels, reified equality, enforced disjunctions, min/max
//! - **Model**: [`CpModel`]: container for variables, constraints,
//!   objective and decision strategy
//! - **Solver**: [`CpSolver`] trait: interface for solver implementations
//!
//! # Design
//!
//! Constraints are an explicit list of typed variants. A model builder
//! assembles them and a solver adapter translates them into whatever its
//! engine understands. [`BranchAndBoundSolver`] is the bundled adapter: a
//! plain depth-first search with bounds propagation, adequate for small
//! models and tests. Larger instances should plug an industrial engine in
//! behind [`CpSolver`].
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod search;
mod solver;
mod variables;

pub use model::{Cmp, Constraint, CpModel, LinearConstraint, ModelError, Objective, Violation};
pub use search::BranchAndBoundSolver;
pub use solver::{CpSolution, CpSolver, SearchStats, SolverConfig, SolverStatus, StopReason};
pub use variables::{BoolVarId, IntVar, IntVarId};
