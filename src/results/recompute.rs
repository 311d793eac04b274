use std::collections::HashMap;

use super::summary::summarize_attempts;
use crate::error::{EngineError, EngineResult};
use crate::store::{Attempt, RoundId, RoundResult, ScoringStore, StudentId};

#[derive(Debug, Clone, Default)]
pub struct RecomputeReport {
    pub results: Vec<RoundResult>,
    pub failed: usize,
}

/// Rebuild every competitor's result in a round from their attempts.
///
/// Competitors keep their existing submission order; new competitors follow in
/// the order their first attempt was recorded. A competitor with a result row
/// but no attempts becomes DNS.
pub async fn recompute_round_results(
    store: &dyn ScoringStore,
    round_id: RoundId,
) -> EngineResult<RecomputeReport> {
    let round = store
        .round(round_id)
        .await?
        .ok_or(EngineError::RoundNotFound(round_id))?;
    let existing = store.round_results(round_id).await?;
    let mut attempts = store.round_attempts(round_id).await?;
    attempts.sort_by_key(|a| (a.recorded_at, a.attempt_number));

    let mut order: Vec<StudentId> = existing.iter().map(|r| r.student_id).collect();
    let mut by_student: HashMap<StudentId, Vec<Attempt>> = HashMap::new();
    for attempt in attempts {
        if !order.contains(&attempt.student_id) {
            order.push(attempt.student_id);
        }
        by_student.entry(attempt.student_id).or_default().push(attempt);
    }

    let mut report = RecomputeReport::default();
    for student_id in order {
        let mut student_attempts = by_student.remove(&student_id).unwrap_or_default();
        student_attempts.sort_by_key(|a| a.attempt_number);
        let result =
            summarize_attempts(round.format, &student_attempts).into_result(round_id, student_id);

        match store.upsert_round_result(result.clone()).await {
            Ok(()) => report.results.push(result),
            Err(e) => {
                tracing::warn!(round_id, student_id, error = %e, "round result upsert failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        round_id,
        results = report.results.len(),
        failed = report.failed,
        "round results recomputed"
    );
    Ok(report)
}
