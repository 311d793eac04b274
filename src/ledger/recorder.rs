use super::transaction::{NewPointTransaction, PointTransaction, PointType};
use crate::scoring::{PointCalculation, ScoringConfig};
use crate::store::{CompetitionId, EventId, RoundId, SchoolId, ScoringStore};

/// What a batch of ledger writes achieved. Rows already written stay written
/// when a later write fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordOutcome {
    pub recorded: Vec<PointTransaction>,
    pub failed: usize,
}

impl RecordOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub fn points(&self) -> f64 {
        self.recorded.iter().map(|t| t.final_points).sum()
    }

    pub fn merge(&mut self, other: RecordOutcome) {
        self.recorded.extend(other.recorded);
        self.failed += other.failed;
    }
}

/// Write one ledger row per non-zero component of a competitor's calculation.
pub async fn record_point_transactions(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    calculation: &PointCalculation,
) -> RecordOutcome {
    let mut outcome = RecordOutcome::default();

    for component in calculation.components(config) {
        let row = NewPointTransaction {
            competition_id: calculation.competition_id,
            event_id: calculation.event_id,
            round_id: calculation.round_id,
            student_id: Some(calculation.student_id),
            school_id: calculation.school_id,
            point_type: component.point_type,
            tier_achieved: component.tier,
            base_points: component.base_points,
            multiplier: component.multiplier,
            final_points: component.points,
            time_ms: component.time_ms,
            is_average: component.is_average,
        };

        match store.insert_transaction(row).await {
            Ok(recorded) => outcome.recorded.push(recorded),
            Err(e) => {
                tracing::warn!(
                    round_id = calculation.round_id,
                    student_id = calculation.student_id,
                    point_type = %component.point_type,
                    error = %e,
                    "failed to record point transaction"
                );
                outcome.failed += 1;
            }
        }
    }

    outcome
}

/// Write the flat, school-level momentum bonus for a (school, round) pair.
pub async fn record_school_momentum(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    competition_id: CompetitionId,
    event_id: EventId,
    round_id: RoundId,
    school_id: SchoolId,
) -> RecordOutcome {
    let points = config.momentum_bonus();
    let mut outcome = RecordOutcome::default();
    if points == 0.0 {
        return outcome;
    }

    let row = NewPointTransaction {
        competition_id,
        event_id,
        round_id,
        student_id: None,
        school_id,
        point_type: PointType::SchoolMomentumBonus,
        tier_achieved: None,
        base_points: points,
        multiplier: 1.0,
        final_points: points,
        time_ms: None,
        is_average: false,
    };

    match store.insert_transaction(row).await {
        Ok(recorded) => outcome.recorded.push(recorded),
        Err(e) => {
            tracing::warn!(round_id, school_id, error = %e, "failed to record momentum bonus");
            outcome.failed += 1;
        }
    }
    outcome
}

/// Identifies the round a batch of ledger rows belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundKey {
    pub competition_id: CompetitionId,
    pub event_id: EventId,
    pub round_id: RoundId,
}

/// Record every calculation of a round, then each momentum school once.
pub async fn record_round_points(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    calculations: &[PointCalculation],
    momentum: &[SchoolId],
    key: RoundKey,
) -> RecordOutcome {
    let RoundKey {
        competition_id,
        event_id,
        round_id,
    } = key;
    let mut outcome = RecordOutcome::default();
    for calculation in calculations {
        outcome.merge(record_point_transactions(store, config, calculation).await);
    }
    for &school_id in momentum {
        outcome.merge(
            record_school_momentum(store, config, competition_id, event_id, round_id, school_id)
                .await,
        );
    }

    tracing::info!(
        round_id,
        recorded = outcome.recorded.len(),
        failed = outcome.failed,
        "recorded round points"
    );
    outcome
}
