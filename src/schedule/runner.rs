//! Request-to-schedule pipeline.

use super::config::SchedulerConfig;
use super::constraints::{build_constraints, ConstraintCounts};
use super::diagnostics::Bottleneck;
use super::mapper::{map_solution, Schedule};
use super::objective::{build_objective, SpanVars};
use super::response::ScheduleResponse;
use super::types::{Exam, Room, ScheduleParams, ScheduleProblem, ScheduleRequest};
use super::variables::{build_exam_vars, ExamVars};
use crate::cp::{BranchAndBoundSolver, CpModel, CpSolution, CpSolver, SolverStatus, StopReason};
use crate::error::ScheduleError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A built exam model and the handles needed to decode its solution.
#[derive(Debug, Clone)]
pub struct ExamModel {
    pub model: CpModel,
    /// Per-exam variables, in exam order.
    pub exams: Vec<ExamVars>,
    pub span: SpanVars,
    pub counts: ConstraintCounts,
}

/// Builds the complete CP model for a problem: variables, rules and the
/// span objective.
pub fn build_model(problem: &ScheduleProblem) -> Result<ExamModel, ScheduleError> {
    let mut model = CpModel::new("exam_schedule");
    let exams = build_exam_vars(&mut model, problem)?;
    let counts = build_constraints(&mut model, problem, &exams);
    let span = build_objective(&mut model, problem, &exams);
    debug!(
        event = "model_built",
        vars = model.var_count(),
        constraints = model.constraint_count(),
        containment = counts.containment,
        room_pairs = counts.room_pairs,
        cohort_pairs = counts.cohort_pairs,
    );
    Ok(ExamModel {
        model,
        exams,
        span,
        counts,
    })
}

/// Schedules exams with the given parameters under the default
/// configuration.
///
/// # Examples
///
/// ```
/// use u_examsched::schedule::{solve, Exam, Room, ScheduleParams};
///
/// let params = ScheduleParams::new(1, 4, 0).unwrap();
/// let exams = vec![Exam::new("Algebra", 2, 20), Exam::new("Physics", 2, 20)];
/// let rooms = vec![Room::new("Amphi", 40)];
///
/// let schedule = solve(params, exams, rooms).unwrap();
/// assert_eq!(schedule.total_period, 4);
/// ```
pub fn solve(
    params: ScheduleParams,
    exams: Vec<Exam>,
    rooms: Vec<Room>,
) -> Result<Schedule, ScheduleError> {
    let problem = ScheduleProblem::new(params, exams, rooms)?;
    ScheduleRunner::run(&problem, &SchedulerConfig::default())
}

/// Executes the scheduling pipeline.
pub struct ScheduleRunner;

impl ScheduleRunner {
    /// Schedules a validated problem with the bundled solver.
    pub fn run(problem: &ScheduleProblem, config: &SchedulerConfig) -> Result<Schedule, ScheduleError> {
        Self::run_with_cancel(problem, config, None)
    }

    /// Schedules with an optional cancellation token.
    pub fn run_with_cancel(
        problem: &ScheduleProblem,
        config: &SchedulerConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Schedule, ScheduleError> {
        Self::run_with_solver(&BranchAndBoundSolver::new(), problem, config, cancel)
    }

    /// Schedules using any [`CpSolver`] implementation.
    pub fn run_with_solver<S: CpSolver + ?Sized>(
        solver: &S,
        problem: &ScheduleProblem,
        config: &SchedulerConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Schedule, ScheduleError> {
        config.validate()?;
        let started = Instant::now();
        info!(
            event = "solve_start",
            exams = problem.exams.len(),
            rooms = problem.rooms.len(),
            days = problem.params.days,
            slots_per_day = problem.params.slots_per_day,
        );

        let built = build_model(problem)?;
        built.model.validate()?;
        let solution = solver.solve_with_cancel(&built.model, &config.solver_config(), cancel);
        debug!(
            event = "search_stats",
            nodes = solution.stats.nodes,
            solutions = solution.stats.solutions,
            elapsed_ms = solution.stats.elapsed_ms,
        );

        let result = Self::interpret(problem, &built, &solution);
        match &result {
            Ok(schedule) => info!(
                event = "solve_end",
                status = solution.status.as_str(),
                span = schedule.total_period,
                elapsed_ms = started.elapsed().as_millis() as u64,
            ),
            Err(err) => info!(
                event = "solve_end",
                status = solution.status.as_str(),
                error = %err,
                elapsed_ms = started.elapsed().as_millis() as u64,
            ),
        }
        result
    }

    /// Turns a solver outcome into a schedule or a failure.
    fn interpret(
        problem: &ScheduleProblem,
        built: &ExamModel,
        solution: &CpSolution,
    ) -> Result<Schedule, ScheduleError> {
        match solution.status {
            SolverStatus::Optimal | SolverStatus::Feasible => {
                map_solution(problem, &built.exams, &built.span, solution)
            }
            SolverStatus::Infeasible => Err(Self::no_schedule(problem)),
            SolverStatus::ModelInvalid => Err(ScheduleError::Inconsistent(
                "solver rejected a model that passed validation".into(),
            )),
            SolverStatus::Unknown => match solution.stop_reason {
                StopReason::Cancelled => Err(ScheduleError::Cancelled),
                StopReason::TimeLimit | StopReason::NodeLimit => Err(ScheduleError::Timeout {
                    elapsed_ms: solution.stats.elapsed_ms,
                }),
                StopReason::Completed | StopReason::SolutionLimit => {
                    Err(Self::no_schedule(problem))
                }
            },
        }
    }

    fn no_schedule(problem: &ScheduleProblem) -> ScheduleError {
        let bottleneck = Bottleneck::find(problem);
        if let Some(b) = &bottleneck {
            warn!(
                event = "no_schedule",
                min_capacity = b.min_capacity,
                demand = b.demand,
                supply = b.supply,
                load = b.load(),
                overloaded = b.is_overloaded(),
            );
        }
        ScheduleError::NoSchedule { bottleneck }
    }

    /// Validates a wire request and schedules it.
    pub fn solve_request(
        request: ScheduleRequest,
        config: &SchedulerConfig,
    ) -> Result<Schedule, ScheduleError> {
        let problem = request.into_problem()?;
        Self::run(&problem, config)
    }

    /// Parses a JSON request body and always produces a response.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_examsched::schedule::{ScheduleRunner, SchedulerConfig};
    ///
    /// let body = r#"{
    ///     "days": 1, "slots_per_day": 2, "margin": 0,
    ///     "exams": [
    ///         {"name": "A", "duration": 1, "students": 10, "promotion": 1},
    ///         {"name": "B", "duration": 1, "students": 10, "promotion": 2}
    ///     ],
    ///     "rooms": [{"name": "R1", "capacity": 10}, {"name": "R2", "capacity": 10}]
    /// }"#;
    /// let response = ScheduleRunner::solve_json(body, &SchedulerConfig::default());
    /// assert!(response.is_success());
    /// ```
    pub fn solve_json(body: &str, config: &SchedulerConfig) -> ScheduleResponse {
        ScheduleRequest::from_json(body)
            .and_then(|request| Self::solve_request(request, config))
            .into()
    }

    /// Schedules independent requests, on the rayon pool when the
    /// `parallel` feature is enabled and `config.parallel` is set.
    pub fn solve_batch(
        requests: Vec<ScheduleRequest>,
        config: &SchedulerConfig,
    ) -> Vec<Result<Schedule, ScheduleError>> {
        #[cfg(feature = "parallel")]
        {
            if config.parallel {
                use rayon::prelude::*;
                return requests
                    .into_par_iter()
                    .map(|request| Self::solve_request(request, config))
                    .collect();
            }
        }
        requests
            .into_iter()
            .map(|request| Self::solve_request(request, config))
            .collect()
    }
}
