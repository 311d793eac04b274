use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::advancement::{AdvancementStatus, CutoffPolicy};

pub type CompetitionId = i64;
pub type SchoolId = i64;
pub type StudentId = i64;
pub type EventId = i64;
pub type EventTypeId = i64;
pub type RoundId = i64;
pub type BadgeId = i64;
pub type TransactionId = i64;

/// Fixed grouping of schools used for the secondary standings rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    Elementary,
    Middle,
    High,
}

impl Division {
    pub fn label(&self) -> &'static str {
        match self {
            Division::Elementary => "Elementary",
            Division::Middle => "Middle",
            Division::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub division: Division,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub school_id: SchoolId,
    pub first_name: String,
    pub last_name: String,
    /// Grade label as entered on the roster ("K", "3", "8", ...)
    pub grade: String,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A school taking part in a competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionSchool {
    pub competition_id: CompetitionId,
    pub school_id: SchoolId,
}

/// One event (3x3, 2x2, ...) held at a competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionEvent {
    pub id: EventId,
    pub competition_id: CompetitionId,
    pub event_type_id: EventTypeId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundFormat {
    AverageOf5,
    MeanOf3,
    BestOf,
}

impl RoundFormat {
    pub fn attempt_count(&self) -> usize {
        match self {
            RoundFormat::AverageOf5 => 5,
            RoundFormat::MeanOf3 => 3,
            RoundFormat::BestOf => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub event_id: EventId,
    pub round_number: u32,
    /// Display name, e.g. "Round 1" or "Final"
    pub name: String,
    pub format: RoundFormat,
    #[serde(default)]
    pub is_final: bool,
    pub cutoff: CutoffPolicy,
    pub status: RoundStatus,
}

/// One timed solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub round_id: RoundId,
    pub student_id: StudentId,
    /// 1-5
    pub attempt_number: u8,
    pub time_ms: Option<u64>,
    #[serde(default)]
    pub is_dnf: bool,
    #[serde(default)]
    pub penalty_seconds: u32,
    pub recorded_at: DateTime<Utc>,
}

/// A competitor's summary for one round. Store order is submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: RoundId,
    pub student_id: StudentId,
    pub best_time_ms: Option<u64>,
    pub average_time_ms: Option<u64>,
    #[serde(default)]
    pub is_dnf: bool,
    #[serde(default)]
    pub is_dns: bool,
}

impl RoundResult {
    /// Best time if the competitor actually set one.
    pub fn valid_best(&self) -> Option<u64> {
        if self.is_dnf || self.is_dns {
            None
        } else {
            self.best_time_ms
        }
    }
}

/// Scoring weight for a grade label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeMultiplier {
    pub grade: String,
    pub multiplier: f64,
}

/// Persisted advancement outcome for one competitor in one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancementRecord {
    pub round_id: RoundId,
    pub student_id: StudentId,
    pub status: AdvancementStatus,
}
