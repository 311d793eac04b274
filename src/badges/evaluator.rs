use chrono::Utc;

use super::rules::{rule_satisfied, BadgeAward, StudentActivity};
use crate::error::EngineResult;
use crate::store::{CompetitionId, ScoringStore, StudentId};

#[derive(Debug, Clone, Default)]
pub struct BadgeReport {
    pub awarded: Vec<BadgeAward>,
    pub failed: usize,
}

/// Award every automatic badge the given students now qualify for.
///
/// Reading the badge catalog, ledger or standings is required and errors out.
/// Per-student failures (held-badge lookup, award write) are logged, counted
/// and skipped. Badges a student already holds are not awarded again.
pub async fn evaluate_badges(
    store: &dyn ScoringStore,
    competition_id: CompetitionId,
    students: &[StudentId],
) -> EngineResult<BadgeReport> {
    let badges: Vec<_> = store
        .badges()
        .await?
        .into_iter()
        .filter(|b| b.rule.is_automatic())
        .collect();
    if badges.is_empty() {
        return Ok(BadgeReport::default());
    }

    let transactions = store.competition_transactions(competition_id).await?;
    let standings = store.school_standings(competition_id).await?;

    let mut report = BadgeReport::default();
    for &student_id in students {
        let Some(activity) = StudentActivity::from_ledger(student_id, &transactions) else {
            continue;
        };
        let held = match store.student_badges(student_id, competition_id).await {
            Ok(held) => held,
            Err(e) => {
                tracing::warn!(student_id, competition_id, error = %e, "held badge lookup failed, skipping student");
                report.failed += 1;
                continue;
            }
        };
        let standing = standings.iter().find(|s| s.school_id == activity.school_id);

        for badge in &badges {
            if held.contains(&badge.id) || !rule_satisfied(&badge.rule, &activity, standing) {
                continue;
            }
            let award = BadgeAward {
                badge_id: badge.id,
                student_id,
                competition_id,
                awarded_at: Utc::now(),
            };
            match store.award_badge(award.clone()).await {
                Ok(()) => {
                    tracing::debug!(student_id, badge = %badge.name, "badge awarded");
                    report.awarded.push(award);
                }
                Err(e) => {
                    tracing::warn!(student_id, badge_id = badge.id, error = %e, "badge award failed");
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}
