//! Error types for exam scheduling.

use crate::cp::ModelError;
use crate::schedule::{Bottleneck, ConfigError, InfeasibleExam};
use thiserror::Error;

/// Everything that can go wrong between a request and a schedule.
///
/// Every variant maps to a failure response; see
/// [`ScheduleResponse`](crate::schedule::ScheduleResponse).
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A request field is out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request body is not valid JSON or has the wrong shape.
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// One or more exams can never be placed.
    #[error("{}", describe_causes(.0))]
    Infeasible(Vec<InfeasibleExam>),

    /// The solver proved that no schedule satisfies every rule.
    #[error("no schedule found{}", bottleneck_suffix(.bottleneck))]
    NoSchedule { bottleneck: Option<Bottleneck> },

    /// The time limit elapsed before any schedule was found.
    #[error("no schedule found within {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    /// The solve was cancelled before any schedule was found.
    #[error("solve cancelled before a schedule was found")]
    Cancelled,

    /// The generated model was rejected by the solver.
    #[error("invalid model: {0}")]
    InvalidModel(#[from] ModelError),

    /// The solver returned values that break a scheduling rule.
    #[error("inconsistent solver result: {0}")]
    Inconsistent(String),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScheduleError {
    /// Whether running again with a larger budget could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScheduleError::Timeout { .. })
    }
}

fn describe_causes(causes: &[InfeasibleExam]) -> String {
    let mut message = format!("{} exam(s) cannot be placed", causes.len());
    for (i, cause) in causes.iter().enumerate() {
        message.push_str(if i == 0 { ": " } else { "; " });
        message.push_str(&cause.to_string());
    }
    message
}

fn bottleneck_suffix(bottleneck: &Option<Bottleneck>) -> String {
    match bottleneck {
        Some(b) => format!("; {b}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::InfeasibilityReason;

    #[test]
    fn test_infeasible_message_lists_every_exam() {
        let err = ScheduleError::Infeasible(vec![
            InfeasibleExam {
                index: 0,
                name: "Long".into(),
                reason: InfeasibilityReason::DurationExceedsDay {
                    duration: 5,
                    slots_per_day: 4,
                },
            },
            InfeasibleExam {
                index: 3,
                name: "Big".into(),
                reason: InfeasibilityReason::NoRoomLargeEnough {
                    students: 90,
                    largest_capacity: 50,
                },
            },
        ]);
        let msg = err.to_string();

        assert!(msg.starts_with("2 exam(s) cannot be placed: exam 'Long' (#0)"));
        assert!(msg.contains("; exam 'Big' (#3): 90 students"));
    }

    #[test]
    fn test_no_schedule_message() {
        let err = ScheduleError::NoSchedule { bottleneck: None };
        assert_eq!(err.to_string(), "no schedule found");

        let err = ScheduleError::NoSchedule {
            bottleneck: Some(Bottleneck {
                min_capacity: 40,
                rooms: 1,
                exams: 3,
                demand: 6,
                supply: 4,
            }),
        };
        assert!(err.to_string().starts_with("no schedule found; tightest resource"));
    }

    #[test]
    fn test_malformed_from_serde() {
        let err: ScheduleError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ScheduleError::Malformed(_)));
        assert!(err.to_string().starts_with("malformed request"));
    }

    #[test]
    fn test_retryable() {
        assert!(ScheduleError::Timeout { elapsed_ms: 10 }.is_retryable());
        assert!(!ScheduleError::Cancelled.is_retryable());
        assert!(!ScheduleError::NoSchedule { bottleneck: None }.is_retryable());
    }
}
