//! Round completion and correction: the multi-step sequences that chain
//! advancement, scoring, the ledger, standings and badges together.
//!
//! Nothing here locks. Two completions of the same round running at once can
//! interleave their ledger writes, so callers serialize completion per round.

use crate::advancement::{advance_round, AdvancementDecision, Medalists};
use crate::badges::evaluate_badges;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{record_round_points, RecordOutcome, RoundKey};
use crate::scoring::{calculate_points_for_round, momentum_schools, PointCalculation, ScoringConfig};
use crate::standings::update_all_school_standings_for_competition;
use crate::store::{
    CompetitionEvent, CompetitionId, Round, RoundId, RoundStatus, SchoolId, ScoringStore,
    StudentId,
};

/// Everything a round completion did. The advancement counts are always
/// filled in; failures of later steps show up in `warnings`.
#[derive(Debug, Clone)]
pub struct RoundCompletion {
    pub round_id: RoundId,
    pub competition_id: CompetitionId,
    pub advancing_count: usize,
    pub eliminated_count: usize,
    pub decisions: Vec<AdvancementDecision>,
    pub medalists: Option<Medalists>,
    pub scored: Vec<PointCalculation>,
    pub ledger: RecordOutcome,
    pub momentum_schools: Vec<SchoolId>,
    pub badges_awarded: usize,
    pub standings_updated: bool,
    pub warnings: Vec<String>,
}

/// Points and ledger rows produced for one round.
#[derive(Debug, Clone, Default)]
pub struct RoundScoring {
    pub scored: Vec<PointCalculation>,
    pub ledger: RecordOutcome,
    pub momentum_schools: Vec<SchoolId>,
}

/// Load a round and the event it belongs to, or fail structurally.
async fn round_and_event(
    store: &dyn ScoringStore,
    round_id: RoundId,
) -> EngineResult<(Round, CompetitionEvent)> {
    let round = store
        .round(round_id)
        .await?
        .ok_or(EngineError::RoundNotFound(round_id))?;
    let event = store
        .event(round.event_id)
        .await?
        .ok_or(EngineError::EventNotFound(round.event_id))?;
    Ok((round, event))
}

/// Score a round and write its ledger rows, momentum included.
pub async fn score_round(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    event: &CompetitionEvent,
    round_id: RoundId,
) -> EngineResult<RoundScoring> {
    let scored = calculate_points_for_round(store, config, round_id).await?;
    let momentum = momentum_schools(store, round_id).await;
    let ledger = record_round_points(
        store,
        config,
        &scored,
        &momentum,
        RoundKey {
            competition_id: event.competition_id,
            event_id: event.id,
            round_id,
        },
    )
    .await;

    Ok(RoundScoring {
        scored,
        ledger,
        momentum_schools: momentum,
    })
}

/// Complete a round: decide advancement, persist it, then score, record,
/// refresh standings, evaluate badges and mark the round completed.
///
/// Only a missing round or event, a round without competitors, or a failed
/// read of its results is an error. Every later failure becomes a warning.
pub async fn complete_round(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round_id: RoundId,
) -> EngineResult<RoundCompletion> {
    let (_, event) = round_and_event(store, round_id).await?;
    let advancement = advance_round(store, round_id).await?;

    let mut completion = RoundCompletion {
        round_id,
        competition_id: event.competition_id,
        advancing_count: advancement.outcome.advancing_count,
        eliminated_count: advancement.outcome.eliminated_count,
        decisions: advancement.decisions,
        medalists: advancement.medalists,
        scored: Vec::new(),
        ledger: RecordOutcome::default(),
        momentum_schools: Vec::new(),
        badges_awarded: 0,
        standings_updated: false,
        warnings: Vec::new(),
    };

    if let Err(e) = store.record_advancement(round_id, &completion.decisions).await {
        tracing::warn!(round_id, error = %e, "failed to persist advancement decisions");
        completion
            .warnings
            .push(format!("advancement decisions not saved: {}", e));
    }

    // Points and ledger
    match score_round(store, config, &event, round_id).await {
        Ok(scoring) => {
            let degraded = scoring.scored.iter().filter(|c| c.degraded).count();
            if degraded > 0 {
                completion.warnings.push(format!(
                    "{} competitor(s) scored with a default tier or multiplier",
                    degraded
                ));
            }
            if !scoring.ledger.is_complete() {
                completion.warnings.push(format!(
                    "{} point transaction(s) failed to record",
                    scoring.ledger.failed
                ));
            }
            completion.scored = scoring.scored;
            completion.ledger = scoring.ledger;
            completion.momentum_schools = scoring.momentum_schools;
        }
        Err(e) => {
            tracing::warn!(round_id, error = %e, "points calculation failed");
            completion
                .warnings
                .push(format!("points not calculated: {}", e));
        }
    }

    // Standings before badges, so school rank rules see fresh ranks
    match update_all_school_standings_for_competition(store, event.competition_id).await {
        Ok(report) if report.success() => completion.standings_updated = true,
        Ok(report) => completion.warnings.push(format!(
            "standings partially updated: {} school(s) failed",
            report.failed
        )),
        Err(e) => {
            tracing::warn!(competition_id = event.competition_id, error = %e, "standings refresh failed");
            completion
                .warnings
                .push(format!("standings not updated: {}", e));
        }
    }

    let students: Vec<StudentId> = completion.decisions.iter().map(|d| d.student_id).collect();
    match evaluate_badges(store, event.competition_id, &students).await {
        Ok(report) => {
            completion.badges_awarded = report.awarded.len();
            if report.failed > 0 {
                completion
                    .warnings
                    .push(format!("{} badge award(s) failed", report.failed));
            }
        }
        Err(e) => {
            tracing::warn!(round_id, error = %e, "badge evaluation failed");
            completion
                .warnings
                .push(format!("badges not evaluated: {}", e));
        }
    }

    if let Err(e) = store
        .update_round_status(round_id, RoundStatus::Completed)
        .await
    {
        tracing::warn!(round_id, error = %e, "failed to mark round completed");
        completion
            .warnings
            .push(format!("round status not updated: {}", e));
    }

    tracing::info!(
        round_id,
        advancing = completion.advancing_count,
        eliminated = completion.eliminated_count,
        points = completion.ledger.points(),
        warnings = completion.warnings.len(),
        "round completed"
    );

    Ok(completion)
}

/// What a correction pass replaced.
#[derive(Debug, Clone)]
pub struct Recalculation {
    pub round_id: RoundId,
    pub removed: usize,
    pub scoring: RoundScoring,
    pub standings_updated: bool,
    pub warnings: Vec<String>,
}

/// Replace a round's ledger rows after a correction: bulk-delete them, score
/// the round again and refresh the competition's standings.
///
/// The delete must succeed before anything is re-recorded.
pub async fn recalculate_round(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round_id: RoundId,
) -> EngineResult<Recalculation> {
    let (_, event) = round_and_event(store, round_id).await?;

    let removed = store.delete_round_transactions(round_id).await?;
    tracing::info!(round_id, removed, "removed round ledger rows");

    let scoring = score_round(store, config, &event, round_id).await?;
    let mut warnings = Vec::new();
    if !scoring.ledger.is_complete() {
        warnings.push(format!(
            "{} point transaction(s) failed to record",
            scoring.ledger.failed
        ));
    }

    let standings_updated =
        match update_all_school_standings_for_competition(store, event.competition_id).await {
            Ok(report) => {
                if !report.success() {
                    warnings.push(format!(
                        "standings partially updated: {} school(s) failed",
                        report.failed
                    ));
                }
                report.success()
            }
            Err(e) => {
                tracing::warn!(competition_id = event.competition_id, error = %e, "standings refresh failed");
                warnings.push(format!("standings not updated: {}", e));
                false
            }
        };

    Ok(Recalculation {
        round_id,
        removed,
        scoring,
        standings_updated,
        warnings,
    })
}
