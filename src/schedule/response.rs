//! Wire response.

use super::mapper::{Schedule, ScheduledExam};
use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};

/// Outcome of one request, tagged by `status`.
///
/// ```
/// use u_examsched::schedule::ScheduleResponse;
/// use u_examsched::ScheduleError;
///
/// let response = ScheduleResponse::from(Err(ScheduleError::Cancelled));
/// let json = serde_json::to_value(&response).unwrap();
/// assert_eq!(json["status"], "failure");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScheduleResponse {
    Success {
        results: Vec<ScheduledExam>,
        total_period: i64,
    },
    Failure {
        message: String,
    },
}

impl ScheduleResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ScheduleResponse::Success { .. })
    }
}

impl From<Schedule> for ScheduleResponse {
    fn from(schedule: Schedule) -> Self {
        ScheduleResponse::Success {
            results: schedule.exams,
            total_period: schedule.total_period,
        }
    }
}

impl From<ScheduleError> for ScheduleResponse {
    fn from(err: ScheduleError) -> Self {
        ScheduleResponse::Failure {
            message: err.to_string(),
        }
    }
}

impl From<Result<Schedule, ScheduleError>> for ScheduleResponse {
    fn from(result: Result<Schedule, ScheduleError>) -> Self {
        match result {
            Ok(schedule) => schedule.into(),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::SearchStats;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let schedule = Schedule {
            exams: vec![ScheduledExam {
                name: "Mathematics".into(),
                filiere: Some("MI".into()),
                promotion: Some(json!(1)),
                day: 0,
                slot: 0,
                room: "Room A".into(),
                room_index: 0,
            }],
            total_period: 2,
            optimal: true,
            stats: SearchStats::default(),
        };
        let json = serde_json::to_value(ScheduleResponse::from(schedule)).unwrap();

        assert_eq!(
            json,
            json!({
                "status": "success",
                "results": [{
                    "name": "Mathematics", "filiere": "MI", "promotion": 1,
                    "day": 0, "slot": 0, "room": "Room A"
                }],
                "total_period": 2
            })
        );
    }

    #[test]
    fn test_failure_shape() {
        let response = ScheduleResponse::from(ScheduleError::NoSchedule { bottleneck: None });
        assert!(!response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": "failure", "message": "no schedule found" })
        );
    }

    #[test]
    fn test_parse_failure() {
        let response: ScheduleResponse =
            serde_json::from_str(r#"{"status":"failure","message":"x"}"#).unwrap();
        assert_eq!(
            response,
            ScheduleResponse::Failure {
                message: "x".into()
            }
        );
    }
}
