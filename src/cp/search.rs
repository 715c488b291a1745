//! Reference branch-and-bound search.
//!
//! [`BranchAndBoundSolver`] is a small depth-first search with bounds
//! propagation over the constraint variants of [`CpModel`]. It exists so
//! that models can be solved and tested without an external engine; it is
//! complete and exact, but it does no learning, no restarts and no global
//! reasoning, so search effort grows quickly with model size.
//!
//! # Algorithm
//!
//! Each node propagates to a fixpoint using a constraint queue driven by
//! variable watches, then branches on the first unfixed variable of the
//! model's decision strategy (falling back to the smallest remaining
//! domain), trying values in ascending order. Every improving solution
//! tightens the objective bound for the rest of the search.

use super::model::{Cmp, Constraint, CpModel, LinearConstraint, Objective};
use super::solver::{CpSolution, CpSolver, SearchStats, SolverConfig, SolverStatus, StopReason};
use super::variables::{BoolVarId, IntVar, IntVarId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Check the clock every 256 nodes.
const CLOCK_CHECK_MASK: u64 = 0xFF;

/// Check the clock every 4096 propagation steps within one node.
const PROPAGATION_CHECK_MASK: u64 = 0xFFF;

/// A domain wiped out during propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Conflict;

type Propagation = Result<(), Conflict>;

/// Floor division for a non-zero divisor.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

/// Ceiling division for a non-zero divisor.
fn ceil_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Current bounds of every variable at one search node.
///
/// Bounds are always members of the variable's declared domain; holes
/// strictly inside `[lo, hi]` are only excluded when a value is branched on.
#[derive(Debug, Clone)]
struct Store<'m> {
    vars: &'m [IntVar],
    lo: Vec<i64>,
    hi: Vec<i64>,
    /// Variables whose bounds changed since the last drain.
    dirty: Vec<usize>,
}

impl<'m> Store<'m> {
    fn new(vars: &'m [IntVar]) -> Self {
        Self {
            vars,
            lo: vars.iter().map(|v| v.min).collect(),
            hi: vars.iter().map(|v| v.max).collect(),
            dirty: Vec::new(),
        }
    }

    fn fixed_value(&self, v: usize) -> Option<i64> {
        (self.lo[v] == self.hi[v]).then_some(self.lo[v])
    }

    fn set_min(&mut self, v: usize, value: i64) -> Propagation {
        if value <= self.lo[v] {
            return Ok(());
        }
        let snapped = self.vars[v].snap_up(value).ok_or(Conflict)?;
        if snapped > self.hi[v] {
            return Err(Conflict);
        }
        self.lo[v] = snapped;
        self.dirty.push(v);
        Ok(())
    }

    fn set_max(&mut self, v: usize, value: i64) -> Propagation {
        if value >= self.hi[v] {
            return Ok(());
        }
        let snapped = self.vars[v].snap_down(value).ok_or(Conflict)?;
        if snapped < self.lo[v] {
            return Err(Conflict);
        }
        self.hi[v] = snapped;
        self.dirty.push(v);
        Ok(())
    }

    fn fix(&mut self, v: usize, value: i64) -> Propagation {
        self.set_min(v, value)?;
        self.set_max(v, value)
    }

    /// Removes `value` when it sits on a bound.
    fn remove_value(&mut self, v: usize, value: i64) -> Propagation {
        if self.lo[v] == value {
            self.set_min(v, value + 1)
        } else if self.hi[v] == value {
            self.set_max(v, value - 1)
        } else {
            Ok(())
        }
    }

    fn term_min(&self, v: usize, coef: i64) -> i64 {
        if coef >= 0 {
            coef * self.lo[v]
        } else {
            coef * self.hi[v]
        }
    }

    fn term_max(&self, v: usize, coef: i64) -> i64 {
        if coef >= 0 {
            coef * self.hi[v]
        } else {
            coef * self.lo[v]
        }
    }

    fn lin_min(&self, terms: &[(IntVarId, i64)]) -> i64 {
        terms
            .iter()
            .fold(0i64, |sum, &(v, c)| sum.saturating_add(self.term_min(v.0, c)))
    }

    fn lin_max(&self, terms: &[(IntVarId, i64)]) -> i64 {
        terms
            .iter()
            .fold(0i64, |sum, &(v, c)| sum.saturating_add(self.term_max(v.0, c)))
    }

    /// Whether some valuation within the bounds could satisfy `lin`.
    fn may_hold(&self, lin: &LinearConstraint) -> bool {
        let (min, max) = (self.lin_min(&lin.terms), self.lin_max(&lin.terms));
        match lin.cmp {
            Cmp::Le => min <= lin.rhs,
            Cmp::Ge => max >= lin.rhs,
            Cmp::Eq => min <= lin.rhs && lin.rhs <= max,
        }
    }

    /// Whether every valuation within the bounds satisfies `lin`.
    fn must_hold(&self, lin: &LinearConstraint) -> bool {
        let (min, max) = (self.lin_min(&lin.terms), self.lin_max(&lin.terms));
        match lin.cmp {
            Cmp::Le => max <= lin.rhs,
            Cmp::Ge => min >= lin.rhs,
            Cmp::Eq => min == lin.rhs && max == lin.rhs,
        }
    }

    /// Bounds reasoning for `sign * sum(terms) <= rhs`.
    fn propagate_le(&mut self, terms: &[(IntVarId, i64)], sign: i64, rhs: i64) -> Propagation {
        let sum_min = terms
            .iter()
            .fold(0i64, |sum, &(v, c)| sum.saturating_add(self.term_min(v.0, sign * c)));
        if sum_min > rhs {
            return Err(Conflict);
        }
        for &(v, c) in terms {
            let a = sign * c;
            if a == 0 {
                continue;
            }
            let slack = rhs.saturating_sub(sum_min.saturating_sub(self.term_min(v.0, a)));
            if a > 0 {
                self.set_max(v.0, floor_div(slack, a))?;
            } else {
                self.set_min(v.0, ceil_div(slack, a))?;
            }
        }
        Ok(())
    }

    fn propagate_linear(&mut self, lin: &LinearConstraint) -> Propagation {
        match lin.cmp {
            Cmp::Le => self.propagate_le(&lin.terms, 1, lin.rhs),
            Cmp::Ge => self.propagate_le(&lin.terms, -1, -lin.rhs),
            Cmp::Eq => {
                self.propagate_le(&lin.terms, 1, lin.rhs)?;
                self.propagate_le(&lin.terms, -1, -lin.rhs)
            }
        }
    }

    fn propagate_division(&mut self, t: usize, n: usize, d: i64) -> Propagation {
        self.set_min(t, floor_div(self.lo[n], d))?;
        self.set_max(t, floor_div(self.hi[n], d))?;
        self.set_min(n, self.lo[t] * d)?;
        self.set_max(n, self.hi[t] * d + d - 1)
    }

    fn propagate_modulo(&mut self, t: usize, n: usize, m: i64) -> Propagation {
        let (q_lo, q_hi) = (floor_div(self.lo[n], m), floor_div(self.hi[n], m));
        if q_lo != q_hi {
            self.set_min(t, 0)?;
            return self.set_max(t, m - 1);
        }
        // Numerator confined to one period: the remainder moves with it.
        let base = q_lo * m;
        self.set_min(t, self.lo[n] - base)?;
        self.set_max(t, self.hi[n] - base)?;
        self.set_min(n, base + self.lo[t])?;
        self.set_max(n, base + self.hi[t])
    }

    fn propagate_reified_eq(&mut self, lit: BoolVarId, l: usize, r: usize) -> Propagation {
        let lit = lit.index();
        match self.fixed_value(lit) {
            Some(1) => {
                self.set_min(l, self.lo[r])?;
                self.set_max(l, self.hi[r])?;
                self.set_min(r, self.lo[l])?;
                self.set_max(r, self.hi[l])
            }
            Some(_) => {
                if let Some(v) = self.fixed_value(l) {
                    self.remove_value(r, v)?;
                }
                if let Some(v) = self.fixed_value(r) {
                    self.remove_value(l, v)?;
                }
                Ok(())
            }
            None => {
                if self.hi[l] < self.lo[r] || self.hi[r] < self.lo[l] {
                    self.fix(lit, 0)
                } else if self.fixed_value(l).is_some() && self.fixed_value(l) == self.fixed_value(r)
                {
                    self.fix(lit, 1)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn propagate_disjunction(
        &mut self,
        enforced_by: &[BoolVarId],
        alternatives: &[LinearConstraint],
    ) -> Propagation {
        let mut open = Vec::new();
        for lit in enforced_by {
            match self.fixed_value(lit.index()) {
                Some(0) => return Ok(()),
                Some(_) => {}
                None => open.push(lit.index()),
            }
        }
        if alternatives.iter().any(|alt| self.must_hold(alt)) {
            return Ok(());
        }
        let viable: Vec<&LinearConstraint> =
            alternatives.iter().filter(|alt| self.may_hold(alt)).collect();
        match (viable.as_slice(), open.as_slice()) {
            ([], []) => Err(Conflict),
            ([], [lit]) => self.fix(*lit, 0),
            ([only], []) => self.propagate_linear(only),
            _ => Ok(()),
        }
    }

    fn propagate_min_eq(&mut self, t: usize, vars: &[IntVarId]) -> Propagation {
        let min_lo = vars.iter().map(|v| self.lo[v.0]).min().ok_or(Conflict)?;
        let min_hi = vars.iter().map(|v| self.hi[v.0]).min().ok_or(Conflict)?;
        self.set_min(t, min_lo)?;
        self.set_max(t, min_hi)?;
        for v in vars {
            self.set_min(v.0, self.lo[t])?;
        }
        let mut support = vars.iter().filter(|v| self.lo[v.0] <= self.hi[t]);
        if let (Some(only), None) = (support.next(), support.next()) {
            let only = only.0;
            self.set_max(only, self.hi[t])?;
        }
        Ok(())
    }

    fn propagate_max_eq(&mut self, t: usize, vars: &[IntVarId]) -> Propagation {
        let max_lo = vars.iter().map(|v| self.lo[v.0]).max().ok_or(Conflict)?;
        let max_hi = vars.iter().map(|v| self.hi[v.0]).max().ok_or(Conflict)?;
        self.set_min(t, max_lo)?;
        self.set_max(t, max_hi)?;
        for v in vars {
            self.set_max(v.0, self.hi[t])?;
        }
        let mut support = vars.iter().filter(|v| self.hi[v.0] >= self.lo[t]);
        if let (Some(only), None) = (support.next(), support.next()) {
            let only = only.0;
            self.set_min(only, self.lo[t])?;
        }
        Ok(())
    }

    fn propagate_constraint(&mut self, constraint: &Constraint) -> Propagation {
        match constraint {
            Constraint::Linear(lin) => self.propagate_linear(lin),
            Constraint::Division {
                target,
                numerator,
                divisor,
            } => self.propagate_division(target.0, numerator.0, *divisor),
            Constraint::Modulo {
                target,
                numerator,
                modulus,
            } => self.propagate_modulo(target.0, numerator.0, *modulus),
            Constraint::ReifiedEquality {
                literal,
                left,
                right,
            } => self.propagate_reified_eq(*literal, left.0, right.0),
            Constraint::Disjunction {
                enforced_by,
                alternatives,
            } => self.propagate_disjunction(enforced_by, alternatives),
            Constraint::MinEquality { target, vars } => self.propagate_min_eq(target.0, vars),
            Constraint::MaxEquality { target, vars } => self.propagate_max_eq(target.0, vars),
        }
    }

    /// Smallest value of `v` that is at least `from` and within bounds.
    fn next_candidate(&self, v: usize, from: i64) -> Option<i64> {
        let value = self.vars[v].snap_up(from.max(self.lo[v]))?;
        (value <= self.hi[v]).then_some(value)
    }
}

/// Depth-first branch-and-bound solver with bounds propagation.
///
/// # Examples
///
/// ```
/// use u_examsched::cp::{BranchAndBoundSolver, CpModel, CpSolver, LinearConstraint, SolverConfig, SolverStatus};
///
/// let mut model = CpModel::new("pick");
/// let x = model.new_int_var("x", 0, 10);
/// let y = model.new_int_var("y", 0, 10);
/// model.add_linear(LinearConstraint::ge(vec![(x, 1), (y, 1)], 7));
/// model.minimize(x);
///
/// let solution = BranchAndBoundSolver::new().solve(&model, &SolverConfig::default());
/// assert_eq!(solution.status, SolverStatus::Optimal);
/// assert_eq!(solution.value(x), Some(0));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve_with_cancel(
        &self,
        model: &CpModel,
        config: &SolverConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> CpSolution {
        if let Err(err) = model.validate() {
            debug!(event = "model_invalid", model = %model.name, error = %err);
            return CpSolution::empty(SolverStatus::ModelInvalid);
        }
        Search::new(model, config, cancel).run()
    }
}

struct Search<'m> {
    model: &'m CpModel,
    config: &'m SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
    /// Constraint indices per variable.
    watches: Vec<Vec<usize>>,
    started: Instant,
    nodes: u64,
    solutions: u64,
    best: Option<Vec<i64>>,
    stop: Option<StopReason>,
}

impl<'m> Search<'m> {
    fn new(model: &'m CpModel, config: &'m SolverConfig, cancel: Option<Arc<AtomicBool>>) -> Self {
        let mut watches = vec![Vec::new(); model.vars.len()];
        for (idx, constraint) in model.constraints.iter().enumerate() {
            for var in constraint.variables() {
                let list: &mut Vec<usize> = &mut watches[var.0];
                if list.last() != Some(&idx) {
                    list.push(idx);
                }
            }
        }
        Self {
            model,
            config,
            cancel,
            watches,
            started: Instant::now(),
            nodes: 0,
            solutions: 0,
            best: None,
            stop: None,
        }
    }

    fn run(mut self) -> CpSolution {
        debug!(
            event = "search_start",
            model = %self.model.name,
            vars = self.model.var_count(),
            constraints = self.model.constraint_count(),
        );
        let model = self.model;
        self.dfs(Store::new(&model.vars), true);

        let stop_reason = self.stop.unwrap_or(StopReason::Completed);
        let status = match (&self.best, stop_reason) {
            (Some(_), StopReason::Completed) => SolverStatus::Optimal,
            (Some(_), _) => SolverStatus::Feasible,
            (None, StopReason::Completed) => SolverStatus::Infeasible,
            (None, _) => SolverStatus::Unknown,
        };
        let stats = SearchStats {
            nodes: self.nodes,
            solutions: self.solutions,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        };
        debug!(
            event = "search_end",
            status = status.as_str(),
            nodes = stats.nodes,
            solutions = stats.solutions,
            elapsed_ms = stats.elapsed_ms,
        );

        let values = self.best.unwrap_or_default();
        let objective_value = self
            .model
            .objective
            .and_then(|obj| values.get(obj.var().index()).copied());
        CpSolution {
            status,
            objective_value,
            values,
            stop_reason,
            stats,
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.stop.is_some() || self.cancelled() {
            return true;
        }
        if self.config.node_limit > 0 && self.nodes >= self.config.node_limit {
            self.stop = Some(StopReason::NodeLimit);
            return true;
        }
        (self.nodes & CLOCK_CHECK_MASK) == 0 && self.out_of_time()
    }

    fn cancelled(&mut self) -> bool {
        let raised = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if raised {
            self.stop = Some(StopReason::Cancelled);
        }
        raised
    }

    fn out_of_time(&mut self) -> bool {
        if self.config.time_limit_ms > 0
            && self.started.elapsed() >= Duration::from_millis(self.config.time_limit_ms)
        {
            self.stop = Some(StopReason::TimeLimit);
            return true;
        }
        false
    }

    fn dfs(&mut self, mut store: Store<'m>, root: bool) {
        if self.should_stop() {
            return;
        }
        self.nodes += 1;

        if self.apply_objective_bound(&mut store).is_err() {
            return;
        }
        if self.propagate(&mut store, root).is_err() {
            return;
        }

        let Some(var) = self.select_var(&store) else {
            self.record(&store);
            return;
        };
        // Values are enumerated lazily: interval domains can be huge.
        let mut solutions = self.solutions;
        let mut candidate = store.next_candidate(var, store.lo[var]);
        while let Some(value) = candidate {
            if self.stop.is_some() || self.should_stop() {
                return;
            }
            if self.solutions != solutions {
                // A new incumbent may already rule out the remaining values.
                solutions = self.solutions;
                if self.apply_objective_bound(&mut store).is_err()
                    || self.propagate(&mut store, false).is_err()
                {
                    return;
                }
            }
            let mut child = store.clone();
            child.dirty.clear();
            if child.fix(var, value).is_ok() {
                self.dfs(child, false);
            }
            candidate = value
                .checked_add(1)
                .and_then(|next| store.next_candidate(var, next));
        }
    }

    fn apply_objective_bound(&self, store: &mut Store<'m>) -> Propagation {
        let (Some(Objective::Minimize(target)), Some(best)) = (self.model.objective, &self.best)
        else {
            return Ok(());
        };
        let var = target.index();
        store.set_max(var, best[var] - 1)
    }

    /// Runs the queue to a fixpoint.
    ///
    /// Bounds can creep one unit per round over a huge domain, so the queue
    /// also watches the clock; an interrupted fixpoint fails the node with
    /// the stop reason already recorded.
    fn propagate(&mut self, store: &mut Store<'m>, all: bool) -> Propagation {
        let model = self.model;
        let count = model.constraints.len();
        let mut queued = vec![false; count];
        let mut queue = VecDeque::new();
        if all {
            queue.extend(0..count);
            queued.fill(true);
        }
        let seeds = std::mem::take(&mut store.dirty);
        self.enqueue_watchers(&seeds, &mut queue, &mut queued);

        let mut steps: u64 = 0;
        while let Some(idx) = queue.pop_front() {
            steps += 1;
            if (steps & PROPAGATION_CHECK_MASK) == 0 && (self.cancelled() || self.out_of_time()) {
                return Err(Conflict);
            }
            queued[idx] = false;
            store.propagate_constraint(&model.constraints[idx])?;
            let changed = std::mem::take(&mut store.dirty);
            self.enqueue_watchers(&changed, &mut queue, &mut queued);
        }
        Ok(())
    }

    fn enqueue_watchers(&self, vars: &[usize], queue: &mut VecDeque<usize>, queued: &mut [bool]) {
        for &var in vars {
            for &idx in &self.watches[var] {
                if !queued[idx] {
                    queued[idx] = true;
                    queue.push_back(idx);
                }
            }
        }
    }

    fn select_var(&self, store: &Store<'m>) -> Option<usize> {
        self.model
            .decision_vars
            .iter()
            .map(|v| v.0)
            .find(|&v| store.fixed_value(v).is_none())
            .or_else(|| {
                (0..store.lo.len())
                    .filter(|&v| store.fixed_value(v).is_none())
                    .min_by_key(|&v| store.hi[v] - store.lo[v])
            })
    }

    fn record(&mut self, store: &Store<'m>) {
        let values = store.lo.clone();
        if let Some(violation) = self.model.first_violation(&values) {
            debug!(event = "leaf_rejected", violation = ?violation);
            return;
        }
        let objective = self.model.objective.map(|o| values[o.var().index()]);
        self.solutions += 1;
        debug!(event = "solution", objective = ?objective, nodes = self.nodes);
        self.best = Some(values);

        if self.model.objective.is_none() {
            // Nothing left to improve.
            self.stop = Some(StopReason::Completed);
        } else if self.config.stop_after_first {
            self.stop = Some(StopReason::SolutionLimit);
        }
    }
}
