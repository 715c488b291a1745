//! Session span objective.

use super::types::ScheduleProblem;
use super::variables::ExamVars;
use crate::cp::{CpModel, IntVarId};

/// Variables defining the session span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanVars {
    /// Earliest exam start.
    pub span_start: IntVarId,
    /// Latest exam end.
    pub span_end: IntVarId,
    /// `span_end - span_start`, minimized.
    pub span: IntVarId,
}

/// Adds `span = max(end) - min(start)` and minimizes it.
pub fn build_objective(
    model: &mut CpModel,
    problem: &ScheduleProblem,
    vars: &[ExamVars],
) -> SpanVars {
    let horizon = problem.params.horizon();

    let span_start = model.new_int_var("span_start", 0, horizon);
    model.add_min_equality(span_start, vars.iter().map(|v| v.start).collect());
    let span_end = model.new_int_var("span_end", 0, horizon);
    model.add_max_equality(span_end, vars.iter().map(|v| v.end).collect());

    let span = model.new_int_var("span", 0, horizon);
    model.add_linear_equality(span, &[(span_end, 1), (span_start, -1)], 0);
    model.minimize(span);

    SpanVars {
        span_start,
        span_end,
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Objective;
    use crate::schedule::types::{Exam, Room, ScheduleParams};
    use crate::schedule::variables::build_exam_vars;

    #[test]
    fn test_span_definition() {
        let params = ScheduleParams::new(1, 10, 0).unwrap();
        let problem = ScheduleProblem::new(
            params,
            vec![Exam::new("A", 2, 1), Exam::new("B", 3, 1)],
            vec![Room::new("R", 10)],
        )
        .unwrap();
        let mut model = CpModel::new("t");
        let vars = build_exam_vars(&mut model, &problem).unwrap();
        let span = build_objective(&mut model, &problem, &vars);

        assert_eq!(model.objective, Some(Objective::Minimize(span.span)));

        // A at 1..3, B at 4..7: span 1..7 = 6.
        let mut values = vec![1, 0, 1, 0, 3, 4, 0, 4, 0, 7, 1, 7, 6];
        assert_eq!(values.len(), model.var_count());
        assert!(model.is_satisfied_by(&values));

        values[12] = 5;
        assert!(!model.is_satisfied_by(&values));
    }
}
