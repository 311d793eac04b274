use std::collections::HashSet;

use super::aggregate::{aggregate_school, SchoolStanding};
use super::ranking::assign_ranks;
use crate::error::{EngineError, EngineResult};
use crate::store::{CompetitionId, SchoolId, ScoringStore};

/// Result of one aggregation pass over a competition.
#[derive(Debug, Clone, Default)]
pub struct StandingsReport {
    /// Ranked, first place first
    pub standings: Vec<SchoolStanding>,
    pub updated: usize,
    pub failed: usize,
}

impl StandingsReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Recompute every registered school's standing from the competition ledger,
/// upsert it, then write overall and division ranks.
///
/// A missing competition or an unreadable ledger is an error. A failed DNF
/// lookup, upsert or rank update is logged and counted, and the pass moves on
/// to the next school.
pub async fn update_all_school_standings_for_competition(
    store: &dyn ScoringStore,
    competition_id: CompetitionId,
) -> EngineResult<StandingsReport> {
    store
        .competition(competition_id)
        .await?
        .ok_or(EngineError::CompetitionNotFound(competition_id))?;

    let schools = store.competition_schools(competition_id).await?;
    let transactions = store.competition_transactions(competition_id).await?;

    let registered: HashSet<SchoolId> = schools.iter().map(|s| s.id).collect();
    let orphaned: HashSet<SchoolId> = transactions
        .iter()
        .map(|t| t.school_id)
        .filter(|id| !registered.contains(id))
        .collect();
    for school_id in orphaned {
        tracing::warn!(competition_id, school_id, "ledger rows for a school not registered in the competition");
    }

    let mut failed = 0;
    let mut standings = Vec::with_capacity(schools.len());
    for school in &schools {
        let dnf_count = match store.school_dnf_count(competition_id, school.id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(competition_id, school_id = school.id, error = %e, "DNF count lookup failed, using 0");
                failed += 1;
                0
            }
        };
        standings.push(aggregate_school(
            competition_id,
            school,
            &transactions,
            dnf_count,
        ));
    }

    assign_ranks(&mut standings);

    let mut updated = 0;
    for standing in &standings {
        if let Err(e) = store.upsert_school_standing(standing.clone()).await {
            tracing::warn!(competition_id, school_id = standing.school_id, error = %e, "standing upsert failed");
            failed += 1;
            continue;
        }
        let (Some(overall), Some(division)) = (standing.overall_rank, standing.division_rank) else {
            continue;
        };
        match store
            .update_standing_ranks(competition_id, standing.school_id, overall, division)
            .await
        {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::warn!(competition_id, school_id = standing.school_id, error = %e, "rank update failed");
                failed += 1;
            }
        }
    }

    tracing::info!(competition_id, updated, failed, "standings refreshed");

    Ok(StandingsReport {
        standings,
        updated,
        failed,
    })
}
