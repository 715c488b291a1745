//! Request records and validated domain types.

use crate::error::ScheduleError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn default_days() -> i64 {
    3
}

fn default_slots_per_day() -> i64 {
    10
}

fn default_margin() -> i64 {
    1
}

fn default_duration() -> i64 {
    1
}

/// One scheduling request as it arrives on the wire.
///
/// Missing global parameters fall back to 3 days, 10 slots per day and a
/// margin of 1 slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_slots_per_day")]
    pub slots_per_day: i64,
    #[serde(default = "default_margin")]
    pub margin: i64,
    #[serde(default)]
    pub exams: Vec<ExamRecord>,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
}

/// Wire form of an exam. `promotion` is the cohort, `filiere` the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRecord {
    pub name: String,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(default)]
    pub students: i64,
    #[serde(default)]
    pub promotion: Option<Value>,
    #[serde(default)]
    pub filiere: Option<String>,
}

/// Wire form of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub name: String,
    #[serde(default)]
    pub capacity: i64,
}

impl ScheduleRequest {
    /// Parses a request body.
    pub fn from_json(body: &str) -> Result<Self, ScheduleError> {
        Ok(serde_json::from_str(body)?)
    }

    /// An example request showing the expected document shape.
    pub fn sample() -> Self {
        Self {
            days: 3,
            slots_per_day: 10,
            margin: 1,
            exams: vec![
                ExamRecord {
                    name: "Mathématiques".into(),
                    duration: 2,
                    students: 30,
                    promotion: Some(json!(1)),
                    filiere: Some("GL".into()),
                },
                ExamRecord {
                    name: "Physique".into(),
                    duration: 3,
                    students: 25,
                    promotion: Some(json!(2)),
                    filiere: Some("IA".into()),
                },
            ],
            rooms: vec![
                RoomRecord {
                    name: "Salle A".into(),
                    capacity: 35,
                },
                RoomRecord {
                    name: "Salle B".into(),
                    capacity: 50,
                },
            ],
        }
    }

    /// Validates the request and converts it into domain types.
    pub fn into_problem(self) -> Result<ScheduleProblem, ScheduleError> {
        let params = ScheduleParams::new(self.days, self.slots_per_day, self.margin)?;
        let exams = self
            .exams
            .into_iter()
            .map(|record| Exam {
                name: record.name,
                duration: record.duration,
                students: record.students,
                cohort: record.promotion.filter(|v| !v.is_null()).map(Cohort),
                track: record.filiere,
            })
            .collect();
        let rooms = self
            .rooms
            .into_iter()
            .map(|record| Room::new(record.name, record.capacity))
            .collect();
        ScheduleProblem::new(params, exams, rooms)
    }
}

/// Global session parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleParams {
    /// Number of days `D`.
    pub days: i64,
    /// Slots per day `H`.
    pub slots_per_day: i64,
    /// Minimum gap between two exams sharing a room on the same day.
    pub margin: i64,
}

impl ScheduleParams {
    pub fn new(days: i64, slots_per_day: i64, margin: i64) -> Result<Self, ScheduleError> {
        if days < 1 {
            return Err(ScheduleError::InvalidInput(format!(
                "days must be at least 1, got {days}"
            )));
        }
        if slots_per_day < 1 {
            return Err(ScheduleError::InvalidInput(format!(
                "slots_per_day must be at least 1, got {slots_per_day}"
            )));
        }
        if margin < 0 {
            return Err(ScheduleError::InvalidInput(format!(
                "margin must not be negative, got {margin}"
            )));
        }
        days.checked_mul(slots_per_day).ok_or_else(|| {
            ScheduleError::InvalidInput("days * slots_per_day overflows".into())
        })?;
        // A margin of H already rules out any same-room same-day pair.
        Ok(Self {
            days,
            slots_per_day,
            margin: margin.min(slots_per_day),
        })
    }

    /// Total number of slots in the session, `D * H`.
    pub fn horizon(&self) -> i64 {
        self.days * self.slots_per_day
    }
}

/// Cohort identifier. Any JSON value; two cohorts differ when the values
/// are not equal. Numbers compare by value, so `1` and `1.0` are the same
/// cohort.
#[derive(Debug, Clone)]
pub struct Cohort(pub Value);

impl Cohort {
    /// The value used for comparison: integral floats become integers.
    fn key(&self) -> Value {
        match &self.0 {
            Value::Number(n) if n.is_f64() => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Value::from(f as i64)
                }
                _ => self.0.clone(),
            },
            other => other.clone(),
        }
    }
}

impl PartialEq for Cohort {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Cohort {}

/// An exam to place.
#[derive(Debug, Clone, PartialEq)]
pub struct Exam {
    pub name: String,
    /// Length in slots.
    pub duration: i64,
    pub students: i64,
    pub cohort: Option<Cohort>,
    /// Opaque metadata, never constrained.
    pub track: Option<String>,
}

impl Exam {
    pub fn new(name: impl Into<String>, duration: i64, students: i64) -> Self {
        Self {
            name: name.into(),
            duration,
            students,
            cohort: None,
            track: None,
        }
    }

    pub fn with_cohort(mut self, cohort: impl Into<Value>) -> Self {
        self.cohort = Some(Cohort(cohort.into()));
        self
    }

    pub fn with_track(mut self, track: impl Into<String>) -> Self {
        self.track = Some(track.into());
        self
    }

    /// Whether the cohort rule applies to this pair: both cohorts defined
    /// and different.
    pub fn separates(&self, other: &Exam) -> bool {
        match (&self.cohort, &other.cohort) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    }
}

/// A room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    pub capacity: i64,
}

impl Room {
    pub fn new(name: impl Into<String>, capacity: i64) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// A validated scheduling problem: parameters, exams and rooms.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleProblem {
    pub params: ScheduleParams,
    pub exams: Vec<Exam>,
    pub rooms: Vec<Room>,
}

impl ScheduleProblem {
    /// Validates the records.
    ///
    /// Rejects empty exam or room lists, non-positive durations and
    /// negative student counts or capacities. Exams that are well formed
    /// but can never be placed (too long for a day, too large for every
    /// room) pass here and are reported by the model builder.
    pub fn new(
        params: ScheduleParams,
        exams: Vec<Exam>,
        rooms: Vec<Room>,
    ) -> Result<Self, ScheduleError> {
        if exams.is_empty() {
            return Err(ScheduleError::InvalidInput("no exams to schedule".into()));
        }
        if rooms.is_empty() {
            return Err(ScheduleError::InvalidInput("no rooms available".into()));
        }
        for (idx, exam) in exams.iter().enumerate() {
            if exam.duration < 1 {
                return Err(ScheduleError::InvalidInput(format!(
                    "exam '{}' (#{idx}): duration must be at least 1 slot, got {}",
                    exam.name, exam.duration
                )));
            }
            if exam.students < 0 {
                return Err(ScheduleError::InvalidInput(format!(
                    "exam '{}' (#{idx}): students must not be negative, got {}",
                    exam.name, exam.students
                )));
            }
        }
        for (idx, room) in rooms.iter().enumerate() {
            if room.capacity < 0 {
                return Err(ScheduleError::InvalidInput(format!(
                    "room '{}' (#{idx}): capacity must not be negative, got {}",
                    room.name, room.capacity
                )));
            }
        }
        Ok(Self {
            params,
            exams,
            rooms,
        })
    }

    /// Indices of rooms large enough for `exam`.
    pub fn feasible_rooms<'a>(&'a self, exam: &'a Exam) -> impl Iterator<Item = usize> + 'a {
        self.rooms
            .iter()
            .enumerate()
            .filter(move |(_, room)| room.capacity >= exam.students)
            .map(|(idx, _)| idx)
    }

    /// Largest room capacity.
    pub fn largest_capacity(&self) -> i64 {
        self.rooms.iter().map(|r| r.capacity).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request =
            ScheduleRequest::from_json(r#"{"exams": [{"name": "Algebra"}], "rooms": [{"name": "A"}]}"#)
                .unwrap();
        assert_eq!(request.days, 3);
        assert_eq!(request.slots_per_day, 10);
        assert_eq!(request.margin, 1);
        assert_eq!(request.exams[0].duration, 1);
        assert_eq!(request.exams[0].students, 0);
        assert_eq!(request.exams[0].promotion, None);
        assert_eq!(request.rooms[0].capacity, 0);
    }

    #[test]
    fn test_malformed_request() {
        let err = ScheduleRequest::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ScheduleError::Malformed(_)));
    }

    #[test]
    fn test_into_problem_maps_cohort_and_track() {
        let request = ScheduleRequest::from_json(
            r#"{
                "exams": [
                    {"name": "A", "promotion": 1, "filiere": "GL"},
                    {"name": "B", "promotion": null},
                    {"name": "C", "promotion": "L3"}
                ],
                "rooms": [{"name": "R", "capacity": 10}]
            }"#,
        )
        .unwrap();
        let problem = request.into_problem().unwrap();

        assert_eq!(problem.exams[0].cohort, Some(Cohort(json!(1))));
        assert_eq!(problem.exams[0].track.as_deref(), Some("GL"));
        assert_eq!(problem.exams[1].cohort, None);
        assert_eq!(problem.exams[2].cohort, Some(Cohort(json!("L3"))));
    }

    #[test]
    fn test_sample_is_valid() {
        let problem = ScheduleRequest::sample().into_problem().unwrap();
        assert_eq!(problem.exams.len(), 2);
        assert_eq!(problem.rooms.len(), 2);
    }

    #[test]
    fn test_sample_round_trips_through_json() {
        let body = serde_json::to_string(&ScheduleRequest::sample()).unwrap();
        assert_eq!(
            ScheduleRequest::from_json(&body).unwrap(),
            ScheduleRequest::sample()
        );
    }

    #[test]
    fn test_params_validation() {
        assert!(ScheduleParams::new(0, 10, 1).is_err());
        assert!(ScheduleParams::new(3, 0, 1).is_err());
        assert!(ScheduleParams::new(3, 10, -1).is_err());
        assert!(ScheduleParams::new(i64::MAX, 2, 0).is_err());
        assert_eq!(ScheduleParams::new(3, 10, 0).unwrap().horizon(), 30);
    }

    #[test]
    fn test_problem_validation() {
        let params = ScheduleParams::new(1, 4, 0).unwrap();
        let room = Room::new("R", 10);

        let empty_rooms = ScheduleProblem::new(params, vec![Exam::new("A", 1, 1)], vec![]);
        assert!(matches!(empty_rooms, Err(ScheduleError::InvalidInput(_))));

        let empty_exams = ScheduleProblem::new(params, vec![], vec![room.clone()]);
        assert!(matches!(empty_exams, Err(ScheduleError::InvalidInput(_))));

        let zero_duration =
            ScheduleProblem::new(params, vec![Exam::new("A", 0, 1)], vec![room.clone()]);
        assert!(matches!(zero_duration, Err(ScheduleError::InvalidInput(_))));

        let negative_students =
            ScheduleProblem::new(params, vec![Exam::new("A", 1, -1)], vec![room.clone()]);
        assert!(matches!(negative_students, Err(ScheduleError::InvalidInput(_))));

        let negative_capacity =
            ScheduleProblem::new(params, vec![Exam::new("A", 1, 1)], vec![Room::new("R", -5)]);
        assert!(matches!(negative_capacity, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_structurally_impossible_exam_passes_validation() {
        let params = ScheduleParams::new(1, 4, 0).unwrap();
        let problem = ScheduleProblem::new(
            params,
            vec![Exam::new("Huge", 6, 500)],
            vec![Room::new("R", 10)],
        );
        assert!(problem.is_ok());
    }

    #[test]
    fn test_cohort_separation_rule() {
        let a = Exam::new("A", 1, 1).with_cohort(1);
        let b = Exam::new("B", 1, 1).with_cohort(2);
        let c = Exam::new("C", 1, 1).with_cohort(1);
        let d = Exam::new("D", 1, 1);

        assert!(a.separates(&b));
        assert!(!a.separates(&c));
        assert!(!a.separates(&d));
        assert!(!d.separates(&d));
    }

    #[test]
    fn test_integral_float_cohort_matches_integer() {
        let a = Exam::new("A", 1, 1).with_cohort(1);
        let b = Exam::new("B", 1, 1).with_cohort(1.0);
        let c = Exam::new("C", 1, 1).with_cohort(1.5);
        let d = Exam::new("D", 1, 1).with_cohort("1");

        assert!(!a.separates(&b));
        assert!(a.separates(&c));
        assert!(a.separates(&d));
        assert_eq!(b.cohort.as_ref().map(|c| &c.0), Some(&json!(1.0)));
    }

    #[test]
    fn test_margin_clamped_to_day_length() {
        let params = ScheduleParams::new(2, 4, i64::MAX).unwrap();
        assert_eq!(params.margin, 4);
        assert_eq!(ScheduleParams::new(2, 4, 3).unwrap().margin, 3);
    }

    #[test]
    fn test_sample_keeps_served_names() {
        let sample = ScheduleRequest::sample();
        let names: Vec<&str> = sample.exams.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Mathématiques", "Physique"]);
        let rooms: Vec<&str> = sample.rooms.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(rooms, ["Salle A", "Salle B"]);
    }

    #[test]
    fn test_feasible_rooms() {
        let params = ScheduleParams::new(1, 4, 0).unwrap();
        let problem = ScheduleProblem::new(
            params,
            vec![Exam::new("A", 1, 30)],
            vec![Room::new("S", 20), Room::new("M", 30), Room::new("L", 60)],
        )
        .unwrap();

        let rooms: Vec<usize> = problem.feasible_rooms(&problem.exams[0]).collect();
        assert_eq!(rooms, vec![1, 2]);
        assert_eq!(problem.largest_capacity(), 60);
    }
}
