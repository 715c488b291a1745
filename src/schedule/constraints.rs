//! Scheduling rules as CP constraints.

use super::types::ScheduleProblem;
use super::variables::ExamVars;
use crate::cp::{CpModel, IntVarId, LinearConstraint};

/// Number of constraints emitted per rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintCounts {
    /// `slot + duration <= H`, one per exam.
    pub containment: usize,
    /// Same-room same-day non-overlap, one per exam pair.
    pub room_pairs: usize,
    /// Cross-cohort same-day separation, one per pair of differing cohorts.
    pub cohort_pairs: usize,
}

/// `slot_a + duration_a + gap <= slot_b`, written as
/// `slot_a - slot_b <= -(duration_a + gap)`. The sum saturates, which
/// still leaves the alternative unsatisfiable within one day.
fn finishes_before(slot_a: IntVarId, duration_a: i64, gap: i64, slot_b: IntVarId) -> LinearConstraint {
    LinearConstraint::le(vec![(slot_a, 1), (slot_b, -1)], -(duration_a.saturating_add(gap)))
}

/// Emits containment, room non-overlap and cohort separation.
///
/// Every unordered exam pair gets one same-day literal shared by both
/// pairwise rules. The number of pair constraints grows quadratically with
/// the number of exams.
pub fn build_constraints(
    model: &mut CpModel,
    problem: &ScheduleProblem,
    vars: &[ExamVars],
) -> ConstraintCounts {
    let params = problem.params;
    let mut counts = ConstraintCounts::default();

    for (exam, v) in problem.exams.iter().zip(vars) {
        model.add_linear(LinearConstraint::le(
            vec![(v.slot, 1)],
            params.slots_per_day - exam.duration,
        ));
        counts.containment += 1;
    }

    let n = vars.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (ei, ej) = (&problem.exams[i], &problem.exams[j]);
            let (vi, vj) = (vars[i], vars[j]);

            let same_day = model.new_bool_var(format!("same_day_{i}_{j}"));
            model.add_reified_equality(same_day, vi.day, vj.day);
            let same_room = model.new_bool_var(format!("same_room_{i}_{j}"));
            model.add_reified_equality(same_room, vi.room, vj.room);

            model.add_disjunction(
                vec![same_room, same_day],
                vec![
                    finishes_before(vi.slot, ei.duration, params.margin, vj.slot),
                    finishes_before(vj.slot, ej.duration, params.margin, vi.slot),
                ],
            );
            counts.room_pairs += 1;

            if ei.separates(ej) {
                model.add_disjunction(
                    vec![same_day],
                    vec![
                        finishes_before(vi.slot, ei.duration, 0, vj.slot),
                        finishes_before(vj.slot, ej.duration, 0, vi.slot),
                    ],
                );
                counts.cohort_pairs += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Constraint;
    use crate::schedule::types::{Exam, Room, ScheduleParams};
    use crate::schedule::variables::build_exam_vars;

    fn build(margin: i64, exams: Vec<Exam>) -> (CpModel, Vec<ExamVars>, ConstraintCounts) {
        let params = ScheduleParams::new(1, 6, margin).unwrap();
        let problem = ScheduleProblem::new(params, exams, vec![Room::new("R", 100)]).unwrap();
        let mut model = CpModel::new("t");
        let vars = build_exam_vars(&mut model, &problem).unwrap();
        let counts = build_constraints(&mut model, &problem, &vars);
        (model, vars, counts)
    }

    #[test]
    fn test_counts() {
        let (_, _, counts) = build(
            1,
            vec![
                Exam::new("A", 1, 1).with_cohort(1),
                Exam::new("B", 1, 1).with_cohort(2),
                Exam::new("C", 1, 1).with_cohort(1),
                Exam::new("D", 1, 1),
            ],
        );
        assert_eq!(counts.containment, 4);
        assert_eq!(counts.room_pairs, 6);
        // A-B and B-C differ; A-C share a cohort; D has none.
        assert_eq!(counts.cohort_pairs, 2);
    }

    #[test]
    fn test_same_day_literal_shared() {
        let (model, _, _) = build(
            0,
            vec![
                Exam::new("A", 1, 1).with_cohort("L1"),
                Exam::new("B", 1, 1).with_cohort("L2"),
            ],
        );
        let enforcers: Vec<_> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::Disjunction { enforced_by, .. } => Some(enforced_by.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(enforcers.len(), 2);
        assert_eq!(enforcers[0][1], enforcers[1][0]);
        let reified = model
            .constraints
            .iter()
            .filter(|c| matches!(c, Constraint::ReifiedEquality { .. }))
            .count();
        assert_eq!(reified, 2);
    }

    #[test]
    fn test_margin_in_room_disjunction() {
        let (model, vars, _) = build(1, vec![Exam::new("A", 2, 1), Exam::new("B", 1, 1)]);
        let disjunction = model
            .constraints
            .iter()
            .find_map(|c| match c {
                Constraint::Disjunction { alternatives, .. } => Some(alternatives.clone()),
                _ => None,
            })
            .unwrap();

        let (a, b) = (vars[0].slot, vars[1].slot);
        assert_eq!(disjunction[0], finishes_before(a, 2, 1, b));
        assert_eq!(disjunction[0].rhs, -3);
        assert_eq!(disjunction[1].terms, vec![(b, 1), (a, -1)]);
        assert_eq!(disjunction[1].rhs, -2);
    }

    #[test]
    fn test_huge_gap_saturates() {
        let (a, b) = (IntVarId(0), IntVarId(1));
        assert_eq!(finishes_before(a, 3, i64::MAX, b).rhs, -i64::MAX);

        let (model, _, _) = build(i64::MAX, vec![Exam::new("A", 2, 1), Exam::new("B", 1, 1)]);
        let rhs: Vec<i64> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::Disjunction { alternatives, .. } => Some(alternatives[0].rhs),
                _ => None,
            })
            .collect();
        // Margin clamped to the 6-slot day.
        assert_eq!(rhs, vec![-8]);
    }

    #[test]
    fn test_containment_bound() {
        let (model, vars, _) = build(0, vec![Exam::new("A", 4, 1)]);
        let containment = model
            .constraints
            .iter()
            .find_map(|c| match c {
                Constraint::Linear(l) if l.terms == vec![(vars[0].slot, 1)] => Some(l.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(containment, LinearConstraint::le(vec![(vars[0].slot, 1)], 2));
    }
}
