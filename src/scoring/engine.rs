use super::bonus::{detect_bonuses, BonusFlags};
use super::config::ScoringConfig;
use super::multiplier::{grade_multiplier, MultiplierOutcome};
use super::tiers::{classify_or_fallback, Tier, TierOutcome, TierThreshold};
use crate::error::{EngineError, EngineResult};
use crate::ledger::PointType;
use crate::store::{
    CompetitionId, EventId, RoundId, RoundResult, SchoolId, ScoringStore, StudentId,
};

/// One ledger-bound piece of a competitor's round score.
#[derive(Debug, Clone, PartialEq)]
pub struct PointComponent {
    pub point_type: PointType,
    pub tier: Option<Tier>,
    pub base_points: f64,
    pub multiplier: f64,
    pub points: f64,
    pub time_ms: Option<u64>,
    pub is_average: bool,
}

/// Weighted points per category. `total` is always the sum of the other five.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointBreakdown {
    pub best_points: f64,
    pub average_points: f64,
    pub pb_bonus: f64,
    pub clutch_bonus: f64,
    pub streak_bonus: f64,
    pub total: f64,
}

/// A competitor's score for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCalculation {
    pub competition_id: CompetitionId,
    pub event_id: EventId,
    pub round_id: RoundId,
    pub student_id: StudentId,
    pub school_id: SchoolId,
    pub grade: String,
    pub best_time_ms: Option<u64>,
    pub average_time_ms: Option<u64>,
    pub best_tier: TierOutcome,
    pub average_tier: TierOutcome,
    pub multiplier: f64,
    pub bonuses: BonusFlags,
    pub breakdown: PointBreakdown,
    /// A tier or multiplier lookup failed and defaults were substituted
    pub degraded: bool,
}

impl PointCalculation {
    pub fn total(&self) -> f64 {
        self.breakdown.total
    }

    /// Non-zero components, in ledger order.
    pub fn components(&self, config: &ScoringConfig) -> Vec<PointComponent> {
        let b = &self.breakdown;
        let candidates = [
            PointComponent {
                point_type: PointType::BestTime,
                tier: Some(self.best_tier.tier),
                base_points: f64::from(self.best_tier.base_points),
                multiplier: self.multiplier,
                points: b.best_points,
                time_ms: self.best_time_ms,
                is_average: false,
            },
            PointComponent {
                point_type: PointType::AverageTime,
                tier: Some(self.average_tier.tier),
                base_points: f64::from(self.average_tier.base_points),
                multiplier: self.multiplier,
                points: b.average_points,
                time_ms: self.average_time_ms,
                is_average: true,
            },
            PointComponent {
                point_type: PointType::PbBonus,
                tier: None,
                base_points: config.pb_bonus(),
                multiplier: self.multiplier,
                points: b.pb_bonus,
                time_ms: self.best_time_ms,
                is_average: false,
            },
            PointComponent {
                point_type: PointType::ClutchBonus,
                tier: None,
                base_points: config.clutch_bonus(),
                multiplier: self.multiplier,
                points: b.clutch_bonus,
                time_ms: self.best_time_ms,
                is_average: false,
            },
            PointComponent {
                point_type: PointType::StreakBonus,
                tier: None,
                base_points: config.streak_bonus(),
                multiplier: self.multiplier,
                points: b.streak_bonus,
                time_ms: None,
                is_average: false,
            },
        ];

        candidates
            .into_iter()
            .filter(|c| c.points != 0.0)
            .collect()
    }
}

/// Combine tier points, the grade multiplier and earned bonuses.
pub fn calculate_points(
    best: TierOutcome,
    average: TierOutcome,
    multiplier: f64,
    bonuses: BonusFlags,
    config: &ScoringConfig,
) -> PointBreakdown {
    let best_points = f64::from(best.base_points) * multiplier;
    let average_points = f64::from(average.base_points) * multiplier;
    let bonus = |earned: bool, points: f64| if earned { points * multiplier } else { 0.0 };
    let pb_bonus = bonus(bonuses.personal_best, config.pb_bonus());
    let clutch_bonus = bonus(bonuses.clutch, config.clutch_bonus());
    let streak_bonus = bonus(bonuses.streak, config.streak_bonus());

    PointBreakdown {
        best_points,
        average_points,
        pb_bonus,
        clutch_bonus,
        streak_bonus,
        total: best_points + average_points + pb_bonus + clutch_bonus + streak_bonus,
    }
}

/// Score every participating competitor in a round.
///
/// A missing round or event, or a round with nobody in it, is an error. Anything
/// that goes wrong for a single competitor degrades that competitor (tier D,
/// default multiplier, no bonus) or skips them with a warning.
pub async fn calculate_points_for_round(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round_id: RoundId,
) -> EngineResult<Vec<PointCalculation>> {
    let round = store
        .round(round_id)
        .await?
        .ok_or(EngineError::RoundNotFound(round_id))?;
    let event = store
        .event(round.event_id)
        .await?
        .ok_or(EngineError::EventNotFound(round.event_id))?;

    let thresholds: Vec<TierThreshold> = match store.tier_thresholds(event.event_type_id).await {
        Ok(thresholds) => thresholds,
        Err(e) => {
            tracing::warn!(round_id, event_type_id = event.event_type_id, error = %e, "threshold lookup failed, every time scores as tier D");
            Vec::new()
        }
    };

    let results = store.round_results(round_id).await?;
    let participants: Vec<RoundResult> = results.into_iter().filter(|r| !r.is_dns).collect();
    if participants.is_empty() {
        return Err(EngineError::NoCompetitors(round_id));
    }

    let mut calculations = Vec::with_capacity(participants.len());
    for result in &participants {
        let student = match store.student(result.student_id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                tracing::warn!(round_id, student_id = result.student_id, "result for unknown student, not scored");
                continue;
            }
            Err(e) => {
                tracing::warn!(round_id, student_id = result.student_id, error = %e, "student lookup failed, not scored");
                continue;
            }
        };

        let MultiplierOutcome {
            multiplier,
            degraded: multiplier_degraded,
        } = grade_multiplier(store, &student.grade, config.default_multiplier()).await;

        let best_tier = classify_or_fallback(
            &thresholds,
            event.event_type_id,
            result.valid_best(),
            result.is_dnf,
        );
        let average_tier = classify_or_fallback(
            &thresholds,
            event.event_type_id,
            result.average_time_ms,
            result.is_dnf,
        );

        let bonuses = detect_bonuses(store, config, &round, result).await;
        let breakdown = calculate_points(best_tier, average_tier, multiplier, bonuses, config);

        tracing::debug!(
            round_id,
            student_id = student.id,
            best_tier = %best_tier.tier,
            average_tier = %average_tier.tier,
            multiplier,
            total = breakdown.total,
            "scored competitor"
        );

        calculations.push(PointCalculation {
            competition_id: event.competition_id,
            event_id: event.id,
            round_id,
            student_id: student.id,
            school_id: student.school_id,
            grade: student.grade.clone(),
            best_time_ms: result.valid_best(),
            average_time_ms: result.average_time_ms,
            best_tier,
            average_tier,
            multiplier,
            bonuses,
            breakdown,
            degraded: multiplier_degraded || best_tier.degraded || average_tier.degraded,
        });
    }

    Ok(calculations)
}
