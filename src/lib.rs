//! Exam timetabling as a constraint model.
//!
//! Assigns every exam a day, a start slot and a room so that rooms are
//! large enough, exams sharing a room on the same day keep a margin
//! between them, and exams of different cohorts never overlap on the same
//! day. The session span (latest end minus earliest start) is minimized.
//!
//! - **CP (Constraint Programming)**: solver-agnostic modeling layer with
//!   integer and boolean variables, typed constraints and a [`CpSolver`]
//!   trait, plus a small bundled branch-and-bound adapter.
//! - **Schedule**: request parsing and validation, model building, result
//!   mapping with independent verification, and infeasibility diagnostics.
//!
//! # Architecture
//!
//! The scheduling layer only builds models and reads solutions back. Any
//! engine that implements [`CpSolver`] can be plugged in through
//! [`schedule::ScheduleRunner::run_with_solver`].
//!
//! [`CpSolver`]: cp::CpSolver

pub mod cp;
pub mod error;
pub mod schedule;

pub use error::ScheduleError;
