use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ledger::{PointTransaction, PointType};
use crate::store::{CompetitionId, Division, School, SchoolId, StudentId};

/// Aggregated score of one school in one competition. Recomputed from the
/// ledger on every pass, never accumulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolStanding {
    pub competition_id: CompetitionId,
    pub school_id: SchoolId,
    #[serde(default)]
    pub school_name: String,
    pub division: Division,
    pub total_points: f64,
    pub best_time_points: f64,
    pub average_time_points: f64,
    /// Every bonus type, school momentum included
    pub bonus_points: f64,
    pub student_count: u32,
    pub average_points_per_student: f64,
    pub pb_count: u32,
    pub dnf_count: u32,
    #[serde(default)]
    pub overall_rank: Option<u32>,
    #[serde(default)]
    pub division_rank: Option<u32>,
}

/// Fold a school's ledger rows into a standing. Rows for other schools or
/// competitions are ignored, so the whole competition ledger can be passed in.
/// Ranks are left unset.
pub fn aggregate_school(
    competition_id: CompetitionId,
    school: &School,
    transactions: &[PointTransaction],
    dnf_count: u32,
) -> SchoolStanding {
    let mut best_time_points = 0.0;
    let mut average_time_points = 0.0;
    let mut bonus_points = 0.0;
    let mut pb_count = 0;
    let mut students: HashSet<StudentId> = HashSet::new();

    let rows = transactions
        .iter()
        .filter(|t| t.competition_id == competition_id && t.school_id == school.id);
    for row in rows {
        match row.point_type {
            PointType::BestTime => best_time_points += row.final_points,
            PointType::AverageTime => average_time_points += row.final_points,
            PointType::PbBonus => {
                pb_count += 1;
                bonus_points += row.final_points;
            }
            PointType::ClutchBonus | PointType::StreakBonus | PointType::SchoolMomentumBonus => {
                bonus_points += row.final_points
            }
        }
        if let Some(student_id) = row.student_id {
            students.insert(student_id);
        }
    }

    let total_points = best_time_points + average_time_points + bonus_points;
    let student_count = students.len() as u32;
    let average_points_per_student = if student_count == 0 {
        0.0
    } else {
        total_points / f64::from(student_count)
    };

    SchoolStanding {
        competition_id,
        school_id: school.id,
        school_name: school.name.clone(),
        division: school.division,
        total_points,
        best_time_points,
        average_time_points,
        bonus_points,
        student_count,
        average_points_per_student,
        pb_count,
        dnf_count,
        overall_rank: None,
        division_rank: None,
    }
}
