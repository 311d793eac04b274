use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::Tier;
use crate::store::{CompetitionId, EventId, RoundId, SchoolId, StudentId, TransactionId};

/// Category of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    BestTime,
    AverageTime,
    PbBonus,
    ClutchBonus,
    StreakBonus,
    SchoolMomentumBonus,
}

impl PointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::BestTime => "best_time",
            PointType::AverageTime => "average_time",
            PointType::PbBonus => "pb_bonus",
            PointType::ClutchBonus => "clutch_bonus",
            PointType::StreakBonus => "streak_bonus",
            PointType::SchoolMomentumBonus => "school_momentum_bonus",
        }
    }

    pub fn is_bonus(&self) -> bool {
        !matches!(self, PointType::BestTime | PointType::AverageTime)
    }
}

impl fmt::Display for PointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger row before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPointTransaction {
    pub competition_id: CompetitionId,
    pub event_id: EventId,
    pub round_id: RoundId,
    /// None for school-level awards
    pub student_id: Option<StudentId>,
    pub school_id: SchoolId,
    pub point_type: PointType,
    pub tier_achieved: Option<Tier>,
    pub base_points: f64,
    pub multiplier: f64,
    pub final_points: f64,
    pub time_ms: Option<u64>,
    pub is_average: bool,
}

/// Immutable point-award record. Never updated; corrections delete a round's
/// rows and record them again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: TransactionId,
    pub competition_id: CompetitionId,
    pub event_id: EventId,
    pub round_id: RoundId,
    pub student_id: Option<StudentId>,
    pub school_id: SchoolId,
    pub point_type: PointType,
    pub tier_achieved: Option<Tier>,
    pub base_points: f64,
    pub multiplier: f64,
    pub final_points: f64,
    pub time_ms: Option<u64>,
    #[serde(default)]
    pub is_average: bool,
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    pub fn from_new(id: TransactionId, new: NewPointTransaction, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            competition_id: new.competition_id,
            event_id: new.event_id,
            round_id: new.round_id,
            student_id: new.student_id,
            school_id: new.school_id,
            point_type: new.point_type,
            tier_achieved: new.tier_achieved,
            base_points: new.base_points,
            multiplier: new.multiplier,
            final_points: new.final_points,
            time_ms: new.time_ms,
            is_average: new.is_average,
            created_at,
        }
    }
}
