#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use podium::advancement::CutoffPolicy;
use podium::scoring::{Tier, TierThreshold};
use podium::store::{
    Attempt, Competition, CompetitionEvent, CompetitionSchool, Division, GradeMultiplier,
    InMemoryStore, Round, RoundFormat, RoundId, RoundResult, RoundStatus, School, SchoolId,
    Student, StudentId,
};

pub const COMPETITION: i64 = 1;
pub const EVENT: i64 = 1;
pub const LINCOLN: SchoolId = 1;
pub const ROOSEVELT: SchoolId = 2;

fn threshold(tier: Tier, min: Option<u64>, max: Option<u64>, points: u32, order: u32) -> TierThreshold {
    TierThreshold {
        event_type_id: 1,
        tier,
        min_time_ms: min,
        max_time_ms: max,
        base_points: points,
        sort_order: order,
    }
}

pub fn round(id: RoundId, name: &str, cutoff: CutoffPolicy, is_final: bool) -> Round {
    Round {
        id,
        event_id: EVENT,
        round_number: id as u32,
        name: name.to_string(),
        format: RoundFormat::AverageOf5,
        is_final,
        cutoff,
        status: RoundStatus::InProgress,
    }
}

/// One competition, one 3x3 event, two schools in different divisions,
/// thresholds S [0,8000) 50, A [8000,15000) 30, D 0 and grade 4 weighted 1.2.
pub fn competition() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .with_tables(|t| {
            t.competitions.push(Competition {
                id: COMPETITION,
                name: "Spring Cube Open".to_string(),
            });
            for (id, name, division) in [
                (LINCOLN, "Lincoln Elementary", Division::Elementary),
                (ROOSEVELT, "Roosevelt Middle", Division::Middle),
            ] {
                t.schools.push(School {
                    id,
                    name: name.to_string(),
                    division,
                });
                t.competition_schools.push(CompetitionSchool {
                    competition_id: COMPETITION,
                    school_id: id,
                });
            }
            t.events.push(CompetitionEvent {
                id: EVENT,
                competition_id: COMPETITION,
                event_type_id: 1,
                name: "3x3x3".to_string(),
            });
            t.tier_thresholds = vec![
                threshold(Tier::S, Some(0), Some(8000), 50, 1),
                threshold(Tier::A, Some(8000), Some(15000), 30, 2),
                threshold(Tier::D, None, None, 0, 5),
            ];
            t.grade_multipliers = vec![
                GradeMultiplier {
                    grade: "4".to_string(),
                    multiplier: 1.2,
                },
                GradeMultiplier {
                    grade: "7".to_string(),
                    multiplier: 1.0,
                },
            ];
        })
        .unwrap();
    store
}

pub fn add_round(store: &InMemoryStore, round: Round) {
    store.with_tables(|t| t.rounds.push(round)).unwrap();
}

pub fn add_student(store: &InMemoryStore, id: StudentId, school_id: SchoolId, grade: &str) {
    store
        .with_tables(|t| {
            t.students.push(Student {
                id,
                school_id,
                first_name: "Student".to_string(),
                last_name: id.to_string(),
                grade: grade.to_string(),
            })
        })
        .unwrap();
}

pub fn add_result(
    store: &InMemoryStore,
    round_id: RoundId,
    student_id: StudentId,
    best: Option<u64>,
    average: Option<u64>,
) {
    store
        .with_tables(|t| {
            t.results.push(RoundResult {
                round_id,
                student_id,
                best_time_ms: best,
                average_time_ms: average,
                is_dnf: best.is_none(),
                is_dns: false,
            })
        })
        .unwrap();
}

pub fn add_attempts(
    store: &InMemoryStore,
    round_id: RoundId,
    student_id: StudentId,
    times: &[Option<u64>],
) {
    let start = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
    store
        .with_tables(|t| {
            for (i, time) in times.iter().enumerate() {
                t.attempts.push(Attempt {
                    round_id,
                    student_id,
                    attempt_number: (i + 1) as u8,
                    time_ms: *time,
                    is_dnf: time.is_none(),
                    penalty_seconds: 0,
                    recorded_at: start + Duration::minutes(i as i64),
                });
            }
        })
        .unwrap();
}
