mod common;

use common::*;
use podium::advancement::{AdvancementStatus, CutoffPolicy};
use podium::badges::{Badge, BadgeRule};
use podium::ledger::{PointTransaction, PointType};
use podium::pipeline::{complete_round, recalculate_round};
use podium::results::recompute_round_results;
use podium::scoring::ScoringConfig;
use podium::standings::update_all_school_standings_for_competition;
use podium::store::{RoundResult, RoundStatus, ScoringStore};
use podium::EngineError;

/// Six competitors in a top-4 first round: four from Lincoln, two from Roosevelt
/// (one of them DNF).
fn first_round() -> podium::store::InMemoryStore {
    let store = competition();
    add_round(&store, round(1, "Round 1", CutoffPolicy::Count { count: 4 }, false));
    let entries = [
        (10, LINCOLN, Some(7500)),
        (11, LINCOLN, Some(9100)),
        (12, LINCOLN, Some(12000)),
        (13, LINCOLN, Some(16000)),
        (20, ROOSEVELT, Some(8200)),
        (21, ROOSEVELT, None),
    ];
    for (id, school, best) in entries {
        add_student(&store, id, school, "4");
        add_result(&store, 1, id, best, best.map(|b| b + 500));
    }
    store
}

#[tokio::test]
async fn completion_reports_advancement_and_writes_everything() {
    let store = first_round();
    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();

    assert_eq!(completion.advancing_count, 4);
    assert_eq!(completion.eliminated_count, 2);
    assert!(completion.warnings.is_empty(), "{:?}", completion.warnings);
    assert!(completion.standings_updated);
    assert_eq!(completion.momentum_schools, vec![LINCOLN]);

    let advancing: Vec<i64> = completion
        .decisions
        .iter()
        .filter(|d| d.status == AdvancementStatus::Advancing)
        .map(|d| d.student_id)
        .collect();
    assert_eq!(advancing, vec![10, 20, 11, 12]);

    let round = store.round(1).await.unwrap().unwrap();
    assert_eq!(round.status, RoundStatus::Completed);

    let standings = store.school_standings(COMPETITION).await.unwrap();
    assert_eq!(standings.len(), 2);
    let ledger_total: f64 = store
        .competition_transactions(COMPETITION)
        .await
        .unwrap()
        .iter()
        .map(|t| t.final_points)
        .sum();
    let standings_total: f64 = standings.iter().map(|s| s.total_points).sum();
    assert!((ledger_total - standings_total).abs() < 1e-9);

    let lincoln = standings.iter().find(|s| s.school_id == LINCOLN).unwrap();
    let roosevelt = standings.iter().find(|s| s.school_id == ROOSEVELT).unwrap();
    assert_eq!(lincoln.overall_rank, Some(1));
    assert_eq!(roosevelt.overall_rank, Some(2));
    assert_eq!(lincoln.division_rank, Some(1));
    assert_eq!(roosevelt.division_rank, Some(1));
    assert_eq!(roosevelt.dnf_count, 1);
}

#[tokio::test]
async fn finals_assign_medals_and_eliminate_nobody() {
    let store = competition();
    add_round(&store, round(2, "Final", CutoffPolicy::Count { count: 1 }, true));
    for (id, best) in [(10, 9000), (11, 8000), (12, 9500), (13, 10000)] {
        add_student(&store, id, LINCOLN, "7");
        add_result(&store, 2, id, Some(best), None);
    }

    let completion = complete_round(&store, &ScoringConfig::default(), 2)
        .await
        .unwrap();
    assert_eq!(completion.advancing_count, 4);
    assert_eq!(completion.eliminated_count, 0);

    let medals = completion.medalists.unwrap();
    assert_eq!(medals.champion.student_id, 11);
    assert_eq!(medals.runner_up.map(|c| c.student_id), Some(10));
    assert_eq!(medals.third_place.map(|c| c.student_id), Some(12));
}

#[tokio::test]
async fn secondary_failures_become_warnings() {
    let store = first_round();
    store.fail_on("insert_transaction");
    store.fail_on("update_round_status");

    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(completion.advancing_count, 4);
    assert_eq!(completion.eliminated_count, 2);
    assert!(completion.ledger.recorded.is_empty());
    assert!(completion
        .warnings
        .iter()
        .any(|w| w.contains("failed to record")));
    assert!(completion
        .warnings
        .iter()
        .any(|w| w.contains("round status")));
}

#[tokio::test]
async fn missing_thresholds_degrade_instead_of_failing() {
    let store = first_round();
    store.fail_on("tier_thresholds");

    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(completion.scored.len(), 6);
    assert!(completion.scored.iter().all(|c| c.degraded));
    assert!(completion
        .scored
        .iter()
        .all(|c| c.breakdown.best_points == 0.0 && c.breakdown.average_points == 0.0));
    assert!(completion.warnings.iter().any(|w| w.contains("default tier")));
}

#[tokio::test]
async fn unknown_round_is_structural() {
    let store = first_round();
    let err = complete_round(&store, &ScoringConfig::default(), 42)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RoundNotFound(42)));
}

#[tokio::test]
async fn empty_round_is_structural() {
    let store = first_round();
    add_round(&store, round(3, "Round 3", CutoffPolicy::All, false));
    let err = complete_round(&store, &ScoringConfig::default(), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoCompetitors(3)));
    // nothing was written for the failed round
    assert!(store
        .competition_transactions(COMPETITION)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn recalculation_replaces_ledger_rows() {
    let store = first_round();
    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    let before: f64 = completion.ledger.points();
    let rows_before = completion.ledger.recorded.len();

    // correct student 12's time into the S band
    store
        .with_tables(|t| {
            if let Some(r) = t.results.iter_mut().find(|r| r.student_id == 12) {
                r.best_time_ms = Some(7900);
            }
        })
        .unwrap();

    let recalculation = recalculate_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(recalculation.removed, rows_before);
    assert!(recalculation.warnings.is_empty());

    let ledger = store.competition_transactions(COMPETITION).await.unwrap();
    assert_eq!(ledger.len(), recalculation.scoring.ledger.recorded.len());
    // 50 instead of 30 base points at x1.2
    assert!((recalculation.scoring.ledger.points() - before - 24.0).abs() < 1e-9);

    let standings = store.school_standings(COMPETITION).await.unwrap();
    let standings_total: f64 = standings.iter().map(|s| s.total_points).sum();
    assert!((standings_total - recalculation.scoring.ledger.points()).abs() < 1e-9);
}

#[tokio::test]
async fn standings_refresh_is_idempotent() {
    let store = first_round();
    complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();

    let first = update_all_school_standings_for_competition(&store, COMPETITION)
        .await
        .unwrap();
    let second = update_all_school_standings_for_competition(&store, COMPETITION)
        .await
        .unwrap();
    let key = |s: &podium::standings::SchoolStanding| {
        (s.school_id, s.total_points, s.overall_rank, s.division_rank)
    };
    assert_eq!(
        first.standings.iter().map(key).collect::<Vec<_>>(),
        second.standings.iter().map(key).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn badges_awarded_once_per_competition() {
    let store = first_round();
    store
        .with_tables(|t| {
            t.badges.push(Badge {
                id: 1,
                name: "S Tier".to_string(),
                description: "Set a time in the S band".to_string(),
                rule: BadgeRule::TierAchieved {
                    tier: podium::scoring::Tier::S,
                },
            });
            t.badges.push(Badge {
                id: 2,
                name: "Most Improved".to_string(),
                description: String::new(),
                rule: BadgeRule::ManualReview,
            });
        })
        .unwrap();

    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(completion.badges_awarded, 1);
    assert_eq!(store.student_badges(10, COMPETITION).await.unwrap(), vec![1]);

    recalculate_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    let again = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(again.badges_awarded, 0);
}

fn momentum_rows(ledger: &[PointTransaction]) -> Vec<i64> {
    ledger
        .iter()
        .filter(|t| t.point_type == PointType::SchoolMomentumBonus)
        .map(|t| t.school_id)
        .collect()
}

#[tokio::test]
async fn one_dnf_attempt_costs_the_school_momentum() {
    let store = competition();
    add_round(&store, round(1, "Round 1", CutoffPolicy::All, false));
    add_student(&store, 10, LINCOLN, "4");
    add_attempts(&store, 1, 10, &[Some(9000), Some(9100), Some(9200), Some(9300), Some(9400)]);
    // a valid best and average despite the DNF on attempt 2
    add_student(&store, 11, LINCOLN, "4");
    add_attempts(&store, 1, 11, &[Some(10000), None, Some(9500), Some(9800), Some(9900)]);
    add_student(&store, 20, ROOSEVELT, "7");
    add_attempts(&store, 1, 20, &[Some(11000), Some(10500), Some(10800), Some(11200), Some(10900)]);

    let report = recompute_round_results(&store, 1).await.unwrap();
    let student_11 = report.results.iter().find(|r| r.student_id == 11).unwrap();
    assert!(!student_11.is_dnf);
    assert_eq!(student_11.average_time_ms, Some(9900));

    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(completion.momentum_schools, vec![ROOSEVELT]);

    let ledger = store.competition_transactions(COMPETITION).await.unwrap();
    assert_eq!(momentum_rows(&ledger), vec![ROOSEVELT]);
}

#[tokio::test]
async fn school_with_only_dns_entrants_gets_no_momentum() {
    let store = competition();
    add_round(&store, round(1, "Round 1", CutoffPolicy::All, false));
    add_student(&store, 10, LINCOLN, "4");
    add_result(&store, 1, 10, Some(9000), Some(9500));
    add_student(&store, 20, ROOSEVELT, "7");
    store
        .with_tables(|t| {
            t.results.push(RoundResult {
                round_id: 1,
                student_id: 20,
                best_time_ms: None,
                average_time_ms: None,
                is_dnf: false,
                is_dns: true,
            })
        })
        .unwrap();

    let completion = complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert_eq!(completion.momentum_schools, vec![LINCOLN]);

    let ledger = store.competition_transactions(COMPETITION).await.unwrap();
    assert_eq!(momentum_rows(&ledger), vec![LINCOLN]);
    assert!(ledger.iter().all(|t| t.school_id != ROOSEVELT));
}

#[tokio::test]
async fn recalculating_an_earlier_round_keeps_its_personal_best() {
    let store = competition();
    add_round(&store, round(1, "Round 1", CutoffPolicy::All, false));
    add_round(&store, round(2, "Round 2", CutoffPolicy::All, false));
    add_student(&store, 10, LINCOLN, "4");
    add_result(&store, 1, 10, Some(12000), Some(12500));

    complete_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    add_result(&store, 2, 10, Some(9000), Some(9500));
    let later = complete_round(&store, &ScoringConfig::default(), 2)
        .await
        .unwrap();
    // 9000 beats the 12000 recorded in round 1
    assert!(later.scored[0].bonuses.personal_best);

    let round_one = |ledger: &[PointTransaction]| -> (usize, f64) {
        let rows: Vec<&PointTransaction> = ledger.iter().filter(|t| t.round_id == 1).collect();
        let pbs = rows
            .iter()
            .filter(|t| t.point_type == PointType::PbBonus)
            .count();
        (pbs, rows.iter().map(|t| t.final_points).sum())
    };
    let before = round_one(&store.competition_transactions(COMPETITION).await.unwrap());
    assert_eq!(before.0, 1);

    let recalculation = recalculate_round(&store, &ScoringConfig::default(), 1)
        .await
        .unwrap();
    assert!(recalculation.scoring.scored[0].bonuses.personal_best);

    let after = round_one(&store.competition_transactions(COMPETITION).await.unwrap());
    assert_eq!(after.0, 1);
    assert!((after.1 - before.1).abs() < 1e-9);
}
