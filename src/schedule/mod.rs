//! Exam scheduling on top of the CP layer.
//!
//! Translates exams and rooms into a [`CpModel`](crate::cp::CpModel),
//! solves it through a [`CpSolver`](crate::cp::CpSolver) and maps the
//! valuation back into a [`Schedule`].
//!
//! # Model
//!
//! Per exam `e` with duration `d` on `D` days of `H` slots:
//!
//! - `start ∈ [0, D·H − d]`, `day = start / H`, `slot = start mod H`
//! - `room` restricted to rooms whose capacity covers the students
//! - `end = start + d`, `slot + d <= H`
//!
//! Per exam pair, `same_day` and `same_room` literals reify day and room
//! equality. When both hold one exam must end `margin` slots before the
//! other starts. Pairs from two different cohorts must not overlap on the
//! same day, whatever the room. The objective minimizes
//! `max(end) − min(start)`.
//!
//! The pair constraints grow quadratically with the number of exams.

mod config;
mod constraints;
mod diagnostics;
mod mapper;
mod objective;
mod response;
mod runner;
mod types;
mod variables;

pub use config::{ConfigError, SchedulerConfig};
pub use constraints::{build_constraints, ConstraintCounts};
pub use diagnostics::{structural_causes, Bottleneck, InfeasibilityReason, InfeasibleExam};
pub use mapper::{check_schedule, map_solution, Schedule, ScheduledExam};
pub use objective::{build_objective, SpanVars};
pub use response::ScheduleResponse;
pub use runner::{build_model, solve, ExamModel, ScheduleRunner};
pub use types::{
    Cohort, Exam, ExamRecord, Room, RoomRecord, ScheduleParams, ScheduleProblem, ScheduleRequest,
};
pub use variables::{build_exam_vars, ExamVars};
