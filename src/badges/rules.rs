use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{PointTransaction, PointType};
use crate::scoring::Tier;
use crate::standings::SchoolStanding;
use crate::store::{BadgeId, CompetitionId, SchoolId, StudentId};

/// Criteria a badge is awarded on. Every rule is judged per student per competition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeRule {
    /// Individual points (bonuses included) of at least `min_points`
    TotalPoints { min_points: f64 },
    PersonalBests { count: u32 },
    /// A best or average time classified at `tier` or better
    TierAchieved { tier: Tier },
    Clutch {
        #[serde(default = "one")]
        count: u32,
    },
    Streaks {
        #[serde(default = "one")]
        count: u32,
    },
    /// The student's school holds an overall rank of `max_rank` or better
    SchoolRank { max_rank: u32 },
    /// Judged by organizers (e.g. "most improved"); never awarded automatically
    ManualReview,
}

fn one() -> u32 {
    1
}

impl BadgeRule {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, BadgeRule::ManualReview)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule: BadgeRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub badge_id: BadgeId,
    pub student_id: StudentId,
    pub competition_id: CompetitionId,
    pub awarded_at: DateTime<Utc>,
}

/// What a student has earned in a competition, folded from their ledger rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudentActivity {
    pub student_id: StudentId,
    pub school_id: SchoolId,
    pub total_points: f64,
    pub pb_count: u32,
    pub clutch_count: u32,
    pub streak_count: u32,
    pub best_tier: Option<Tier>,
}

impl StudentActivity {
    /// None when the student has no rows in `transactions`.
    pub fn from_ledger(student_id: StudentId, transactions: &[PointTransaction]) -> Option<Self> {
        let mut rows = transactions
            .iter()
            .filter(|t| t.student_id == Some(student_id))
            .peekable();
        let school_id = rows.peek()?.school_id;

        let mut activity = StudentActivity {
            student_id,
            school_id,
            ..StudentActivity::default()
        };
        for row in rows {
            activity.total_points += row.final_points;
            match row.point_type {
                PointType::PbBonus => activity.pb_count += 1,
                PointType::ClutchBonus => activity.clutch_count += 1,
                PointType::StreakBonus => activity.streak_count += 1,
                _ => {}
            }
            if let Some(tier) = row.tier_achieved {
                activity.best_tier = Some(match activity.best_tier {
                    Some(best) => best.min(tier),
                    None => tier,
                });
            }
        }
        Some(activity)
    }
}

/// Dispatch one rule against a student's activity and their school's standing.
pub fn rule_satisfied(
    rule: &BadgeRule,
    activity: &StudentActivity,
    standing: Option<&SchoolStanding>,
) -> bool {
    match rule {
        BadgeRule::TotalPoints { min_points } => activity.total_points >= *min_points,
        BadgeRule::PersonalBests { count } => activity.pb_count >= *count,
        // S sorts first, so "at or better" is <=
        BadgeRule::TierAchieved { tier } => activity.best_tier.is_some_and(|best| best <= *tier),
        BadgeRule::Clutch { count } => activity.clutch_count >= *count,
        BadgeRule::Streaks { count } => activity.streak_count >= *count,
        BadgeRule::SchoolRank { max_rank } => standing
            .and_then(|s| s.overall_rank)
            .is_some_and(|rank| rank <= *max_rank),
        BadgeRule::ManualReview => false,
    }
}
