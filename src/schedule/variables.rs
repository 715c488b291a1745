//! Per-exam decision variables.

use super::diagnostics::structural_causes;
use super::types::ScheduleProblem;
use crate::cp::{CpModel, IntVarId};
use crate::error::ScheduleError;
use tracing::warn;

/// The variables describing one exam's placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamVars {
    /// Absolute start slot, `day * H + slot`.
    pub start: IntVarId,
    /// `start / H`.
    pub day: IntVarId,
    /// `start mod H`.
    pub slot: IntVarId,
    /// Index into the room list.
    pub room: IntVarId,
    /// `start + duration`.
    pub end: IntVarId,
}

/// Creates start, day, slot, room and end variables for every exam.
///
/// Fails with [`ScheduleError::Infeasible`] listing every exam that is
/// longer than a day or larger than every room; no variables are added in
/// that case. Start and room become the branching variables, in exam order.
pub fn build_exam_vars(
    model: &mut CpModel,
    problem: &ScheduleProblem,
) -> Result<Vec<ExamVars>, ScheduleError> {
    let causes = structural_causes(problem);
    if !causes.is_empty() {
        for cause in &causes {
            warn!(
                event = "exam_unplaceable",
                exam = %cause.name,
                index = cause.index,
                reason = %cause.reason,
            );
        }
        return Err(ScheduleError::Infeasible(causes));
    }

    let params = problem.params;
    let horizon = params.horizon();
    let mut all = Vec::with_capacity(problem.exams.len());
    for (e, exam) in problem.exams.iter().enumerate() {
        let start = model.new_int_var(format!("start_{e}"), 0, horizon - exam.duration);
        let day = model.new_int_var(format!("day_{e}"), 0, params.days - 1);
        let slot = model.new_int_var(format!("slot_{e}"), 0, params.slots_per_day - 1);
        model.add_division_equality(day, start, params.slots_per_day);
        model.add_modulo_equality(slot, start, params.slots_per_day);

        let rooms = problem.feasible_rooms(exam).map(|r| r as i64);
        let room = model.new_int_var_from_values(format!("room_{e}"), rooms);

        let end = model.new_int_var(format!("end_{e}"), exam.duration, horizon);
        model.add_linear_equality(end, &[(start, 1)], exam.duration);

        all.push(ExamVars {
            start,
            day,
            slot,
            room,
            end,
        });
    }

    model.add_decision_strategy(all.iter().flat_map(|v| [v.start, v.room]));
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::diagnostics::InfeasibilityReason;
    use crate::schedule::types::{Exam, Room, ScheduleParams};

    fn problem(exams: Vec<Exam>, rooms: Vec<Room>) -> ScheduleProblem {
        let params = ScheduleParams::new(2, 5, 1).unwrap();
        ScheduleProblem::new(params, exams, rooms).unwrap()
    }

    #[test]
    fn test_domains() {
        let p = problem(
            vec![Exam::new("A", 2, 40)],
            vec![Room::new("Small", 20), Room::new("Big", 50), Room::new("Huge", 90)],
        );
        let mut model = CpModel::new("t");
        let vars = build_exam_vars(&mut model, &p).unwrap();
        let v = vars[0];

        assert_eq!((model.var(v.start).min, model.var(v.start).max), (0, 8));
        assert_eq!((model.var(v.day).min, model.var(v.day).max), (0, 1));
        assert_eq!((model.var(v.slot).min, model.var(v.slot).max), (0, 4));
        assert_eq!(model.var(v.room).values.as_deref(), Some(&[1, 2][..]));
        assert_eq!((model.var(v.end).min, model.var(v.end).max), (2, 10));
        assert_eq!(model.var(v.start).name, "start_0");
        assert_eq!(model.decision_vars, vec![v.start, v.room]);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_channels_hold_for_consistent_values() {
        let p = problem(vec![Exam::new("A", 2, 10)], vec![Room::new("R", 10)]);
        let mut model = CpModel::new("t");
        build_exam_vars(&mut model, &p).unwrap();

        // start 7 on H = 5 is day 1 slot 2, end 9.
        assert!(model.is_satisfied_by(&[7, 1, 2, 0, 9]));
        assert!(!model.is_satisfied_by(&[7, 1, 3, 0, 9]));
        assert!(!model.is_satisfied_by(&[7, 1, 2, 0, 8]));
    }

    #[test]
    fn test_structural_causes_reported_together() {
        let p = problem(
            vec![
                Exam::new("Long", 6, 10),
                Exam::new("Fine", 1, 10),
                Exam::new("Big", 1, 99),
            ],
            vec![Room::new("R", 50)],
        );
        let mut model = CpModel::new("t");
        let err = build_exam_vars(&mut model, &p).unwrap_err();

        let ScheduleError::Infeasible(causes) = err else {
            panic!("expected Infeasible, got {err:?}");
        };
        assert_eq!(causes.len(), 2);
        assert_eq!(causes[0].name, "Long");
        assert!(matches!(
            causes[1].reason,
            InfeasibilityReason::NoRoomLargeEnough { students: 99, .. }
        ));
        assert_eq!(model.var_count(), 0);
    }
}
