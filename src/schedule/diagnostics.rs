//! Infeasibility diagnostics.
//!
//! Two levels: structural causes that make a single exam impossible to
//! place no matter what else is scheduled, and a capacity-tier bottleneck
//! estimate attached to generic "no schedule found" failures.

use super::types::ScheduleProblem;
use std::fmt;

/// Why an exam can never be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfeasibilityReason {
    /// The exam is longer than a day.
    DurationExceedsDay { duration: i64, slots_per_day: i64 },
    /// No room holds all of its students.
    NoRoomLargeEnough { students: i64, largest_capacity: i64 },
}

impl fmt::Display for InfeasibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibilityReason::DurationExceedsDay {
                duration,
                slots_per_day,
            } => write!(
                f,
                "duration {duration} exceeds the {slots_per_day} slots of a day"
            ),
            InfeasibilityReason::NoRoomLargeEnough {
                students,
                largest_capacity,
            } => write!(
                f,
                "{students} students but the largest room holds {largest_capacity}"
            ),
        }
    }
}

/// A structural infeasibility cause attached to one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfeasibleExam {
    /// Position of the exam in the request.
    pub index: usize,
    pub name: String,
    pub reason: InfeasibilityReason,
}

impl fmt::Display for InfeasibleExam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exam '{}' (#{}): {}", self.name, self.index, self.reason)
    }
}

/// Collects every structural cause across all exams.
pub fn structural_causes(problem: &ScheduleProblem) -> Vec<InfeasibleExam> {
    let slots_per_day = problem.params.slots_per_day;
    let largest_capacity = problem.largest_capacity();
    let mut causes = Vec::new();
    for (index, exam) in problem.exams.iter().enumerate() {
        if exam.duration > slots_per_day {
            causes.push(InfeasibleExam {
                index,
                name: exam.name.clone(),
                reason: InfeasibilityReason::DurationExceedsDay {
                    duration: exam.duration,
                    slots_per_day,
                },
            });
        }
        if exam.students > largest_capacity {
            causes.push(InfeasibleExam {
                index,
                name: exam.name.clone(),
                reason: InfeasibilityReason::NoRoomLargeEnough {
                    students: exam.students,
                    largest_capacity,
                },
            });
        }
    }
    causes
}

/// The most contended capacity tier.
///
/// A tier is the set of rooms with capacity at least `min_capacity`. Its
/// demand is the total duration of the exams that fit in no smaller room;
/// its supply is the number of room-slots the tier offers over the whole
/// session. Demand above supply proves infeasibility; a high ratio only
/// hints at where the pressure is, since margins and cohort rules are not
/// counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bottleneck {
    pub min_capacity: i64,
    /// Rooms in the tier.
    pub rooms: usize,
    /// Exams confined to the tier.
    pub exams: usize,
    /// Exam-slots required.
    pub demand: i64,
    /// Room-slots available.
    pub supply: i64,
}

impl Bottleneck {
    /// Finds the tier with the highest demand-to-supply ratio.
    pub fn find(problem: &ScheduleProblem) -> Option<Self> {
        let mut capacities: Vec<i64> = problem.rooms.iter().map(|r| r.capacity).collect();
        capacities.sort_unstable();
        capacities.dedup();

        let largest = *capacities.last()?;
        let horizon = problem.params.horizon();
        let mut best: Option<Bottleneck> = None;
        let mut below: Option<i64> = None;
        for &min_capacity in &capacities {
            let confined: Vec<_> = problem
                .exams
                .iter()
                .filter(|e| below.map_or(true, |cap| e.students > cap))
                .filter(|e| e.students <= largest)
                .collect();
            below = Some(min_capacity);
            if confined.is_empty() {
                continue;
            }
            let rooms = problem
                .rooms
                .iter()
                .filter(|r| r.capacity >= min_capacity)
                .count();
            let tier = Bottleneck {
                min_capacity,
                rooms,
                exams: confined.len(),
                demand: confined
                    .iter()
                    .fold(0i64, |total, e| total.saturating_add(e.duration)),
                supply: (rooms as i64).saturating_mul(horizon),
            };
            let tighter = best.as_ref().map_or(true, |b| {
                tier.demand as i128 * b.supply as i128 >= b.demand as i128 * tier.supply as i128
            });
            if tighter {
                best = Some(tier);
            }
        }
        best
    }

    /// Demand divided by supply.
    pub fn load(&self) -> f64 {
        if self.supply == 0 {
            f64::INFINITY
        } else {
            self.demand as f64 / self.supply as f64
        }
    }

    /// Whether demand alone already exceeds supply.
    pub fn is_overloaded(&self) -> bool {
        self.demand > self.supply
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tightest resource: {} exam(s) need {} of {} room-slots in the {} room(s) with capacity >= {}",
            self.exams, self.demand, self.supply, self.rooms, self.min_capacity
        )
    }
}
