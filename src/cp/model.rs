//! CP model definition.

use super::variables::{BoolVarId, IntVar, IntVarId};
use thiserror::Error;

/// Comparison operator of a [`LinearConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

/// A linear relation `sum(coef * var) <cmp> rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    /// `(variable, coefficient)` pairs.
    pub terms: Vec<(IntVarId, i64)>,
    /// Comparison operator.
    pub cmp: Cmp,
    /// Right-hand side constant.
    pub rhs: i64,
}

impl LinearConstraint {
    /// `sum(terms) <= rhs`
    pub fn le(terms: Vec<(IntVarId, i64)>, rhs: i64) -> Self {
        Self {
            terms,
            cmp: Cmp::Le,
            rhs,
        }
    }

    /// `sum(terms) >= rhs`
    pub fn ge(terms: Vec<(IntVarId, i64)>, rhs: i64) -> Self {
        Self {
            terms,
            cmp: Cmp::Ge,
            rhs,
        }
    }

    /// `sum(terms) == rhs`
    pub fn eq(terms: Vec<(IntVarId, i64)>, rhs: i64) -> Self {
        Self {
            terms,
            cmp: Cmp::Eq,
            rhs,
        }
    }

    /// Evaluates the relation under a complete valuation.
    pub fn holds(&self, values: &[i64]) -> bool {
        let lhs: i64 = self.terms.iter().map(|&(v, c)| c * values[v.0]).sum();
        match self.cmp {
            Cmp::Le => lhs <= self.rhs,
            Cmp::Ge => lhs >= self.rhs,
            Cmp::Eq => lhs == self.rhs,
        }
    }
}

/// A constraint in the CP model.
///
/// The variants are the small vocabulary any finite-domain engine
/// understands: linear relations, integer division and modulo channels,
/// reified equality, enforced disjunctions of linear relations, and
/// min/max equalities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A plain linear relation.
    Linear(LinearConstraint),

    /// `target == floor(numerator / divisor)`, `divisor > 0`.
    Division {
        target: IntVarId,
        numerator: IntVarId,
        divisor: i64,
    },

    /// `target == numerator mod modulus` (non-negative remainder),
    /// `modulus > 0`.
    Modulo {
        target: IntVarId,
        numerator: IntVarId,
        modulus: i64,
    },

    /// `literal <=> (left == right)`.
    ReifiedEquality {
        literal: BoolVarId,
        left: IntVarId,
        right: IntVarId,
    },

    /// If every literal in `enforced_by` is true, at least one of
    /// `alternatives` holds. With an empty `enforced_by` the disjunction
    /// is unconditional.
    Disjunction {
        enforced_by: Vec<BoolVarId>,
        alternatives: Vec<LinearConstraint>,
    },

    /// `target == min(vars)`.
    MinEquality { target: IntVarId, vars: Vec<IntVarId> },

    /// `target == max(vars)`.
    MaxEquality { target: IntVarId, vars: Vec<IntVarId> },
}

impl Constraint {
    /// Every variable the constraint mentions, with repetitions.
    pub fn variables(&self) -> Vec<IntVarId> {
        match self {
            Constraint::Linear(lin) => lin.terms.iter().map(|&(v, _)| v).collect(),
            Constraint::Division {
                target, numerator, ..
            }
            | Constraint::Modulo {
                target, numerator, ..
            } => vec![*target, *numerator],
            Constraint::ReifiedEquality {
                literal,
                left,
                right,
            } => vec![literal.as_int(), *left, *right],
            Constraint::Disjunction {
                enforced_by,
                alternatives,
            } => enforced_by
                .iter()
                .map(|l| l.as_int())
                .chain(
                    alternatives
                        .iter()
                        .flat_map(|alt| alt.terms.iter().map(|&(v, _)| v)),
                )
                .collect(),
            Constraint::MinEquality { target, vars } | Constraint::MaxEquality { target, vars } => {
                std::iter::once(*target).chain(vars.iter().copied()).collect()
            }
        }
    }

    /// Evaluates the constraint under a complete valuation.
    pub fn holds(&self, values: &[i64]) -> bool {
        let v = |id: IntVarId| values[id.0];
        match self {
            Constraint::Linear(lin) => lin.holds(values),
            Constraint::Division {
                target,
                numerator,
                divisor,
            } => v(*target) == v(*numerator).div_euclid(*divisor),
            Constraint::Modulo {
                target,
                numerator,
                modulus,
            } => v(*target) == v(*numerator).rem_euclid(*modulus),
            Constraint::ReifiedEquality {
                literal,
                left,
                right,
            } => (v(literal.as_int()) == 1) == (v(*left) == v(*right)),
            Constraint::Disjunction {
                enforced_by,
                alternatives,
            } => {
                !enforced_by.iter().all(|l| v(l.as_int()) == 1)
                    || alternatives.iter().any(|alt| alt.holds(values))
            }
            Constraint::MinEquality { target, vars } => {
                vars.iter().map(|&x| v(x)).min() == Some(v(*target))
            }
            Constraint::MaxEquality { target, vars } => {
                vars.iter().map(|&x| v(x)).max() == Some(v(*target))
            }
        }
    }
}

/// Objective function for the CP model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Minimize the value of a single integer variable.
    Minimize(IntVarId),
}

impl Objective {
    /// The variable being optimized.
    pub fn var(&self) -> IntVarId {
        match *self {
            Objective::Minimize(v) => v,
        }
    }
}

/// Structural problems found by [`CpModel::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("constraint {constraint} references undefined variable #{index}")]
    UndefinedVariable { constraint: usize, index: usize },

    #[error("variable '{name}' has an empty domain")]
    EmptyDomain { name: String },

    #[error("constraint {constraint}: divisor must be positive, got {divisor}")]
    NonPositiveDivisor { constraint: usize, divisor: i64 },

    #[error("constraint {constraint}: disjunction without alternatives")]
    EmptyDisjunction { constraint: usize },

    #[error("constraint {constraint}: min/max over an empty set")]
    EmptyAggregate { constraint: usize },

    #[error("objective references undefined variable #{index}")]
    UndefinedObjective { index: usize },
}

/// A constraint programming model.
///
/// Contains variables, constraints, an optional objective, and an optional
/// decision strategy (the variables a search should branch on first).
///
/// # Examples
///
/// ```
/// use u_examsched::cp::{CpModel, LinearConstraint};
///
/// let mut model = CpModel::new("example");
/// let x = model.new_int_var("x", 0, 10);
/// let y = model.new_int_var("y", 0, 10);
/// let same = model.new_bool_var("x_eq_y");
/// model.add_reified_equality(same, x, y);
/// model.add_disjunction(
///     vec![same],
///     vec![LinearConstraint::le(vec![(x, 1)], 3)],
/// );
/// model.minimize(y);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Variable table; booleans included.
    pub vars: Vec<IntVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
    /// Variables to branch on first, in order.
    pub decision_vars: Vec<IntVarId>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a variable and returns its handle.
    pub fn add_var(&mut self, var: IntVar) -> IntVarId {
        self.vars.push(var);
        IntVarId(self.vars.len() - 1)
    }

    /// Adds an integer variable with domain `[min, max]`.
    pub fn new_int_var(&mut self, name: impl Into<String>, min: i64, max: i64) -> IntVarId {
        self.add_var(IntVar::new(name, min, max))
    }

    /// Adds an integer variable whose domain is exactly `values`.
    pub fn new_int_var_from_values(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = i64>,
    ) -> IntVarId {
        self.add_var(IntVar::from_values(name, values))
    }

    /// Adds a boolean variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVarId {
        BoolVarId(self.add_var(IntVar::boolean(name)).0)
    }

    /// Looks up a variable by handle.
    pub fn var(&self, id: IntVarId) -> &IntVar {
        &self.vars[id.0]
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add a linear relation.
    pub fn add_linear(&mut self, constraint: LinearConstraint) {
        self.constraints.push(Constraint::Linear(constraint));
    }

    /// Convenience: `target == sum(terms) + offset`.
    pub fn add_linear_equality(&mut self, target: IntVarId, terms: &[(IntVarId, i64)], offset: i64) {
        let mut all = Vec::with_capacity(terms.len() + 1);
        all.push((target, 1));
        all.extend(terms.iter().map(|&(v, c)| (v, -c)));
        self.add_linear(LinearConstraint::eq(all, offset));
    }

    /// Convenience: `target == numerator / divisor`.
    pub fn add_division_equality(&mut self, target: IntVarId, numerator: IntVarId, divisor: i64) {
        self.constraints.push(Constraint::Division {
            target,
            numerator,
            divisor,
        });
    }

    /// Convenience: `target == numerator mod modulus`.
    pub fn add_modulo_equality(&mut self, target: IntVarId, numerator: IntVarId, modulus: i64) {
        self.constraints.push(Constraint::Modulo {
            target,
            numerator,
            modulus,
        });
    }

    /// Convenience: `literal <=> (left == right)`.
    pub fn add_reified_equality(&mut self, literal: BoolVarId, left: IntVarId, right: IntVarId) {
        self.constraints.push(Constraint::ReifiedEquality {
            literal,
            left,
            right,
        });
    }

    /// Convenience: `and(enforced_by) => or(alternatives)`.
    pub fn add_disjunction(
        &mut self,
        enforced_by: Vec<BoolVarId>,
        alternatives: Vec<LinearConstraint>,
    ) {
        self.constraints.push(Constraint::Disjunction {
            enforced_by,
            alternatives,
        });
    }

    /// Convenience: `target == min(vars)`.
    pub fn add_min_equality(&mut self, target: IntVarId, vars: Vec<IntVarId>) {
        self.constraints
            .push(Constraint::MinEquality { target, vars });
    }

    /// Convenience: `target == max(vars)`.
    pub fn add_max_equality(&mut self, target: IntVarId, vars: Vec<IntVarId>) {
        self.constraints
            .push(Constraint::MaxEquality { target, vars });
    }

    /// Sets the objective to minimizing `var`.
    pub fn minimize(&mut self, var: IntVarId) {
        self.objective = Some(Objective::Minimize(var));
    }

    /// Appends variables to the branching order.
    pub fn add_decision_strategy(&mut self, vars: impl IntoIterator<Item = IntVarId>) {
        self.decision_vars.extend(vars);
    }

    /// Validates the model for consistency.
    ///
    /// Checks that every referenced variable exists, that no domain is
    /// empty, and that divisors and aggregates are well formed.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(var) = self.vars.iter().find(|v| v.is_empty()) {
            return Err(ModelError::EmptyDomain {
                name: var.name.clone(),
            });
        }
        for (idx, constraint) in self.constraints.iter().enumerate() {
            if let Some(var) = constraint
                .variables()
                .into_iter()
                .find(|v| v.0 >= self.vars.len())
            {
                return Err(ModelError::UndefinedVariable {
                    constraint: idx,
                    index: var.0,
                });
            }
            match constraint {
                Constraint::Division { divisor, .. } if *divisor <= 0 => {
                    return Err(ModelError::NonPositiveDivisor {
                        constraint: idx,
                        divisor: *divisor,
                    });
                }
                Constraint::Modulo { modulus, .. } if *modulus <= 0 => {
                    return Err(ModelError::NonPositiveDivisor {
                        constraint: idx,
                        divisor: *modulus,
                    });
                }
                Constraint::Disjunction { alternatives, .. } if alternatives.is_empty() => {
                    return Err(ModelError::EmptyDisjunction { constraint: idx });
                }
                Constraint::MinEquality { vars, .. } | Constraint::MaxEquality { vars, .. }
                    if vars.is_empty() =>
                {
                    return Err(ModelError::EmptyAggregate { constraint: idx });
                }
                _ => {}
            }
        }
        if let Some(obj) = self.objective {
            if obj.var().0 >= self.vars.len() {
                return Err(ModelError::UndefinedObjective {
                    index: obj.var().0,
                });
            }
        }
        Ok(())
    }

    /// Index of the first constraint violated by a complete valuation, or
    /// of the first variable whose value lies outside its domain.
    pub fn first_violation(&self, values: &[i64]) -> Option<Violation> {
        if values.len() != self.vars.len() {
            return Some(Violation::Arity);
        }
        if let Some(idx) = self
            .vars
            .iter()
            .zip(values)
            .position(|(var, &value)| !var.contains(value))
        {
            return Some(Violation::Domain(idx));
        }
        self.constraints
            .iter()
            .position(|c| !c.holds(values))
            .map(Violation::Constraint)
    }

    /// Whether a complete valuation satisfies every domain and constraint.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        self.first_violation(values).is_none()
    }

    /// Returns the number of variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

/// Why a valuation fails [`CpModel::first_violation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The valuation does not assign exactly one value per variable.
    Arity,
    /// The variable at this index holds a value outside its domain.
    Domain(usize),
    /// The constraint at this index does not hold.
    Constraint(usize),
}
