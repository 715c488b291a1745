//! Solved values back to domain records.

use super::objective::SpanVars;
use super::types::ScheduleProblem;
use super::variables::ExamVars;
use crate::cp::{CpSolution, IntVarId, SearchStats, SolverStatus};
use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One placed exam, in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledExam {
    pub name: String,
    pub filiere: Option<String>,
    pub promotion: Option<Value>,
    pub day: i64,
    pub slot: i64,
    /// Room name.
    pub room: String,
    #[serde(skip)]
    pub room_index: usize,
}

/// A complete, verified schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// One entry per exam, in request order.
    pub exams: Vec<ScheduledExam>,
    /// Latest end minus earliest start, in slots.
    pub total_period: i64,
    /// Whether the solver proved the span minimal.
    pub optimal: bool,
    pub stats: SearchStats,
}

fn read(solution: &CpSolution, var: IntVarId) -> Result<i64, ScheduleError> {
    solution.value(var).ok_or_else(|| {
        ScheduleError::Inconsistent(format!("no value for variable #{}", var.index()))
    })
}

/// Decodes a solver valuation into a [`Schedule`].
///
/// The decoded schedule is re-checked with [`check_schedule`] and its span
/// recomputed; any disagreement with the solver is an
/// [`ScheduleError::Inconsistent`].
pub fn map_solution(
    problem: &ScheduleProblem,
    vars: &[ExamVars],
    span: &SpanVars,
    solution: &CpSolution,
) -> Result<Schedule, ScheduleError> {
    let mut exams = Vec::with_capacity(vars.len());
    for (exam, v) in problem.exams.iter().zip(vars) {
        let room_value = read(solution, v.room)?;
        let room = usize::try_from(room_value)
            .ok()
            .and_then(|idx| problem.rooms.get(idx).map(|room| (idx, room)));
        let Some((room_index, room)) = room else {
            return Err(ScheduleError::Inconsistent(format!(
                "exam '{}' assigned to unknown room #{room_value}",
                exam.name
            )));
        };
        exams.push(ScheduledExam {
            name: exam.name.clone(),
            filiere: exam.track.clone(),
            promotion: exam.cohort.as_ref().map(|c| c.0.clone()),
            day: read(solution, v.day)?,
            slot: read(solution, v.slot)?,
            room: room.name.clone(),
            room_index,
        });
    }

    let total_period = check_schedule(problem, &exams).map_err(ScheduleError::Inconsistent)?;
    let reported = read(solution, span.span)?;
    if reported != total_period {
        return Err(ScheduleError::Inconsistent(format!(
            "solver reported span {reported}, schedule spans {total_period}"
        )));
    }

    Ok(Schedule {
        exams,
        total_period,
        optimal: solution.status == SolverStatus::Optimal,
        stats: solution.stats,
    })
}

/// Verifies every scheduling rule on a decoded schedule and returns its
/// span.
///
/// `exams` must list the problem's exams in order. Checks capacity, day
/// range, containment, same-room non-overlap with margin and cross-cohort
/// separation; the error names the first rule broken.
pub fn check_schedule(problem: &ScheduleProblem, exams: &[ScheduledExam]) -> Result<i64, String> {
    let params = problem.params;
    if exams.len() != problem.exams.len() {
        return Err(format!(
            "expected {} exams, got {}",
            problem.exams.len(),
            exams.len()
        ));
    }

    for (exam, placed) in problem.exams.iter().zip(exams) {
        if exam.name != placed.name {
            return Err(format!("expected exam '{}', got '{}'", exam.name, placed.name));
        }
        let room = problem
            .rooms
            .get(placed.room_index)
            .ok_or_else(|| format!("exam '{}' has no room", exam.name))?;
        if room.capacity < exam.students {
            return Err(format!(
                "exam '{}' has {} students but room '{}' holds {}",
                exam.name, exam.students, room.name, room.capacity
            ));
        }
        if !(0..params.days).contains(&placed.day) {
            return Err(format!("exam '{}' on day {} outside the session", exam.name, placed.day));
        }
        if placed.slot < 0 || placed.slot.saturating_add(exam.duration) > params.slots_per_day {
            return Err(format!(
                "exam '{}' at slot {} runs past the end of the day",
                exam.name, placed.slot
            ));
        }
    }

    let overlaps = |i: usize, j: usize, gap: i64| {
        let (a, b) = (&exams[i], &exams[j]);
        let a_end = a.slot.saturating_add(problem.exams[i].duration).saturating_add(gap);
        let b_end = b.slot.saturating_add(problem.exams[j].duration).saturating_add(gap);
        a.day == b.day && a_end > b.slot && b_end > a.slot
    };
    for i in 0..exams.len() {
        for j in (i + 1)..exams.len() {
            if exams[i].room_index == exams[j].room_index && overlaps(i, j, params.margin) {
                return Err(format!(
                    "exams '{}' and '{}' collide in room '{}'",
                    exams[i].name, exams[j].name, exams[i].room
                ));
            }
            if problem.exams[i].separates(&problem.exams[j]) && overlaps(i, j, 0) {
                return Err(format!(
                    "exams '{}' and '{}' of different cohorts overlap",
                    exams[i].name, exams[j].name
                ));
            }
        }
    }

    let bounds = problem.exams.iter().zip(exams).map(|(exam, placed)| {
        let start = placed.day * params.slots_per_day + placed.slot;
        (start, start + exam.duration)
    });
    let (first, last) = bounds.fold((i64::MAX, i64::MIN), |(lo, hi), (s, e)| {
        (lo.min(s), hi.max(e))
    });
    Ok(last - first)
}
