use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::error::StoreError;
use super::snapshot::StoreSnapshot;
use super::types::*;
use super::ScoringStore;
use crate::advancement::AdvancementDecision;
use crate::badges::{Badge, BadgeAward};
use crate::ledger::{NewPointTransaction, PointTransaction};
use crate::scoring::TierThreshold;
use crate::standings::SchoolStanding;

/// [`ScoringStore`] over in-process tables.
///
/// Used by the CLI on top of a JSON snapshot and by tests as the store fake.
/// Individual operations can be made to fail with [`InMemoryStore::fail_on`].
pub struct InMemoryStore {
    tables: Mutex<StoreSnapshot>,
    failpoints: Mutex<HashSet<String>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::new())
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            tables: Mutex::new(snapshot),
            failpoints: Mutex::new(HashSet::new()),
        }
    }

    /// Copy of every table, for writing back to disk.
    pub fn snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.tables()?.clone())
    }

    /// Make every later call of the named operation fail with `Unavailable`.
    pub fn fail_on(&self, operation: &str) {
        if let Ok(mut failpoints) = self.failpoints.lock() {
            failpoints.insert(operation.to_string());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failpoints) = self.failpoints.lock() {
            failpoints.clear();
        }
    }

    /// Direct table access for seeding fixtures.
    pub fn with_tables<R>(&self, f: impl FnOnce(&mut StoreSnapshot) -> R) -> Result<R, StoreError> {
        let mut tables = self.tables()?;
        Ok(f(&mut tables))
    }

    fn tables(&self) -> Result<MutexGuard<'_, StoreSnapshot>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store tables lock poisoned".to_string()))
    }

    fn check(&self, operation: &str) -> Result<(), StoreError> {
        let failpoints = self
            .failpoints
            .lock()
            .map_err(|_| StoreError::Unavailable("failpoint lock poisoned".to_string()))?;
        if failpoints.contains(operation) {
            return Err(StoreError::Unavailable(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

fn competition_of_round(tables: &StoreSnapshot, round_id: RoundId) -> Option<CompetitionId> {
    let round = tables.rounds.iter().find(|r| r.id == round_id)?;
    tables
        .events
        .iter()
        .find(|e| e.id == round.event_id)
        .map(|e| e.competition_id)
}

/// When the student first attempted anything in the round.
fn first_attempt_at(
    tables: &StoreSnapshot,
    student_id: StudentId,
    round_id: RoundId,
) -> Option<DateTime<Utc>> {
    tables
        .attempts
        .iter()
        .filter(|a| a.student_id == student_id && a.round_id == round_id)
        .map(|a| a.recorded_at)
        .min()
}

/// Whether `earlier` was held before `current` from the student's point of view.
///
/// Rounds of one event follow their round number. Across events the student's
/// first attempt time decides, and rounds without attempts fall back to id order.
fn round_precedes(
    tables: &StoreSnapshot,
    student_id: StudentId,
    earlier: RoundId,
    current: RoundId,
) -> bool {
    if earlier == current {
        return false;
    }
    let find = |id: RoundId| tables.rounds.iter().find(|r| r.id == id);
    if let (Some(a), Some(b)) = (find(earlier), find(current)) {
        if a.event_id == b.event_id && a.round_number != b.round_number {
            return a.round_number < b.round_number;
        }
    }
    match (
        first_attempt_at(tables, student_id, earlier),
        first_attempt_at(tables, student_id, current),
    ) {
        (Some(a), Some(b)) if a != b => a < b,
        _ => earlier < current,
    }
}

#[async_trait]
impl ScoringStore for InMemoryStore {
    async fn round(&self, round_id: RoundId) -> Result<Option<Round>, StoreError> {
        self.check("round")?;
        let tables = self.tables()?;
        Ok(tables.rounds.iter().find(|r| r.id == round_id).cloned())
    }

    async fn event(&self, event_id: EventId) -> Result<Option<CompetitionEvent>, StoreError> {
        self.check("event")?;
        let tables = self.tables()?;
        Ok(tables.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn competition(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Option<Competition>, StoreError> {
        self.check("competition")?;
        let tables = self.tables()?;
        Ok(tables
            .competitions
            .iter()
            .find(|c| c.id == competition_id)
            .cloned())
    }

    async fn student(&self, student_id: StudentId) -> Result<Option<Student>, StoreError> {
        self.check("student")?;
        let tables = self.tables()?;
        Ok(tables.students.iter().find(|s| s.id == student_id).cloned())
    }

    async fn competition_schools(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<School>, StoreError> {
        self.check("competition_schools")?;
        let tables = self.tables()?;
        let school_ids: HashSet<SchoolId> = tables
            .competition_schools
            .iter()
            .filter(|cs| cs.competition_id == competition_id)
            .map(|cs| cs.school_id)
            .collect();
        Ok(tables
            .schools
            .iter()
            .filter(|s| school_ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn tier_thresholds(
        &self,
        event_type_id: EventTypeId,
    ) -> Result<Vec<TierThreshold>, StoreError> {
        self.check("tier_thresholds")?;
        let tables = self.tables()?;
        let mut thresholds: Vec<TierThreshold> = tables
            .tier_thresholds
            .iter()
            .filter(|t| t.event_type_id == event_type_id)
            .cloned()
            .collect();
        thresholds.sort_by_key(|t| t.sort_order);
        Ok(thresholds)
    }

    async fn grade_multiplier(&self, grade: &str) -> Result<Option<GradeMultiplier>, StoreError> {
        self.check("grade_multiplier")?;
        let tables = self.tables()?;
        Ok(tables
            .grade_multipliers
            .iter()
            .find(|g| g.grade == grade)
            .cloned())
    }

    async fn round_results(&self, round_id: RoundId) -> Result<Vec<RoundResult>, StoreError> {
        self.check("round_results")?;
        let tables = self.tables()?;
        Ok(tables
            .results
            .iter()
            .filter(|r| r.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn upsert_round_result(&self, result: RoundResult) -> Result<(), StoreError> {
        self.check("upsert_round_result")?;
        let mut tables = self.tables()?;
        match tables
            .results
            .iter_mut()
            .find(|r| r.round_id == result.round_id && r.student_id == result.student_id)
        {
            Some(existing) => *existing = result,
            None => tables.results.push(result),
        }
        Ok(())
    }

    async fn attempts(
        &self,
        round_id: RoundId,
        student_id: StudentId,
    ) -> Result<Vec<Attempt>, StoreError> {
        self.check("attempts")?;
        let tables = self.tables()?;
        let mut attempts: Vec<Attempt> = tables
            .attempts
            .iter()
            .filter(|a| a.round_id == round_id && a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }

    async fn round_attempts(&self, round_id: RoundId) -> Result<Vec<Attempt>, StoreError> {
        self.check("round_attempts")?;
        let tables = self.tables()?;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn prior_best_times(
        &self,
        student_id: StudentId,
        current_round: RoundId,
    ) -> Result<Vec<u64>, StoreError> {
        self.check("prior_best_times")?;
        let tables = self.tables()?;
        Ok(tables
            .results
            .iter()
            .filter(|r| {
                r.student_id == student_id
                    && round_precedes(&tables, student_id, r.round_id, current_round)
            })
            .filter_map(|r| r.valid_best())
            .collect())
    }

    async fn event_best_times(
        &self,
        student_id: StudentId,
        event_id: EventId,
        excluding_round: RoundId,
    ) -> Result<Vec<u64>, StoreError> {
        self.check("event_best_times")?;
        let tables = self.tables()?;
        let event_rounds: HashSet<RoundId> = tables
            .rounds
            .iter()
            .filter(|r| r.event_id == event_id && r.id != excluding_round)
            .map(|r| r.id)
            .collect();
        Ok(tables
            .results
            .iter()
            .filter(|r| r.student_id == student_id && event_rounds.contains(&r.round_id))
            .filter_map(|r| r.valid_best())
            .collect())
    }

    async fn insert_transaction(
        &self,
        transaction: NewPointTransaction,
    ) -> Result<PointTransaction, StoreError> {
        self.check("insert_transaction")?;
        let mut tables = self.tables()?;
        let id = tables.transactions.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let row = PointTransaction::from_new(id, transaction, Utc::now());
        tables.transactions.push(row.clone());
        Ok(row)
    }

    async fn delete_round_transactions(&self, round_id: RoundId) -> Result<usize, StoreError> {
        self.check("delete_round_transactions")?;
        let mut tables = self.tables()?;
        let before = tables.transactions.len();
        tables.transactions.retain(|t| t.round_id != round_id);
        Ok(before - tables.transactions.len())
    }

    async fn competition_transactions(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<PointTransaction>, StoreError> {
        self.check("competition_transactions")?;
        let tables = self.tables()?;
        Ok(tables
            .transactions
            .iter()
            .filter(|t| t.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn school_dnf_count(
        &self,
        competition_id: CompetitionId,
        school_id: SchoolId,
    ) -> Result<u32, StoreError> {
        self.check("school_dnf_count")?;
        let tables = self.tables()?;
        let students: HashSet<StudentId> = tables
            .students
            .iter()
            .filter(|s| s.school_id == school_id)
            .map(|s| s.id)
            .collect();
        let round_competition: HashMap<RoundId, Option<CompetitionId>> = tables
            .rounds
            .iter()
            .map(|r| (r.id, competition_of_round(&tables, r.id)))
            .collect();
        let count = tables
            .results
            .iter()
            .filter(|r| r.is_dnf && students.contains(&r.student_id))
            .filter(|r| round_competition.get(&r.round_id).copied().flatten() == Some(competition_id))
            .count();
        Ok(count as u32)
    }

    async fn upsert_school_standing(&self, standing: SchoolStanding) -> Result<(), StoreError> {
        self.check("upsert_school_standing")?;
        let mut tables = self.tables()?;
        match tables.standings.iter_mut().find(|s| {
            s.competition_id == standing.competition_id && s.school_id == standing.school_id
        }) {
            Some(existing) => *existing = standing,
            None => tables.standings.push(standing),
        }
        Ok(())
    }

    async fn update_standing_ranks(
        &self,
        competition_id: CompetitionId,
        school_id: SchoolId,
        overall_rank: u32,
        division_rank: u32,
    ) -> Result<(), StoreError> {
        self.check("update_standing_ranks")?;
        let mut tables = self.tables()?;
        let standing = tables
            .standings
            .iter_mut()
            .find(|s| s.competition_id == competition_id && s.school_id == school_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "standing for school {} in competition {}",
                    school_id, competition_id
                ))
            })?;
        standing.overall_rank = Some(overall_rank);
        standing.division_rank = Some(division_rank);
        Ok(())
    }

    async fn school_standings(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<SchoolStanding>, StoreError> {
        self.check("school_standings")?;
        let tables = self.tables()?;
        Ok(tables
            .standings
            .iter()
            .filter(|s| s.competition_id == competition_id)
            .cloned()
            .collect())
    }

    async fn record_advancement(
        &self,
        round_id: RoundId,
        decisions: &[AdvancementDecision],
    ) -> Result<(), StoreError> {
        self.check("record_advancement")?;
        let mut tables = self.tables()?;
        tables.advancements.retain(|a| a.round_id != round_id);
        tables
            .advancements
            .extend(decisions.iter().map(|d| AdvancementRecord {
                round_id,
                student_id: d.student_id,
                status: d.status,
            }));
        Ok(())
    }

    async fn update_round_status(
        &self,
        round_id: RoundId,
        status: RoundStatus,
    ) -> Result<(), StoreError> {
        self.check("update_round_status")?;
        let mut tables = self.tables()?;
        let round = tables
            .rounds
            .iter_mut()
            .find(|r| r.id == round_id)
            .ok_or_else(|| StoreError::NotFound(format!("round {}", round_id)))?;
        round.status = status;
        Ok(())
    }

    async fn badges(&self) -> Result<Vec<Badge>, StoreError> {
        self.check("badges")?;
        Ok(self.tables()?.badges.clone())
    }

    async fn student_badges(
        &self,
        student_id: StudentId,
        competition_id: CompetitionId,
    ) -> Result<Vec<BadgeId>, StoreError> {
        self.check("student_badges")?;
        let tables = self.tables()?;
        Ok(tables
            .badge_awards
            .iter()
            .filter(|a| a.student_id == student_id && a.competition_id == competition_id)
            .map(|a| a.badge_id)
            .collect())
    }

    async fn award_badge(&self, award: BadgeAward) -> Result<(), StoreError> {
        self.check("award_badge")?;
        let mut tables = self.tables()?;
        let duplicate = tables.badge_awards.iter().any(|a| {
            a.badge_id == award.badge_id
                && a.student_id == award.student_id
                && a.competition_id == award.competition_id
        });
        if duplicate {
            return Err(StoreError::Rejected(format!(
                "badge {} already awarded to student {}",
                award.badge_id, award.student_id
            )));
        }
        tables.badge_awards.push(award);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::CutoffPolicy;

    fn round(id: RoundId, event_id: EventId) -> Round {
        Round {
            id,
            event_id,
            round_number: id as u32,
            name: format!("Round {}", id),
            format: RoundFormat::AverageOf5,
            is_final: false,
            cutoff: CutoffPolicy::All,
            status: RoundStatus::Pending,
        }
    }

    fn result(round_id: RoundId, student_id: StudentId, best: Option<u64>) -> RoundResult {
        RoundResult {
            round_id,
            student_id,
            best_time_ms: best,
            average_time_ms: None,
            is_dnf: best.is_none(),
            is_dns: false,
        }
    }

    #[tokio::test]
    async fn test_prior_best_times_excludes_current_round_and_dnf() {
        let store = InMemoryStore::new();
        store
            .with_tables(|t| {
                t.results.push(result(1, 10, Some(12000)));
                t.results.push(result(2, 10, None));
                t.results.push(result(3, 10, Some(9000)));
                t.results.push(result(1, 11, Some(8000)));
            })
            .unwrap();

        let mut times = store.prior_best_times(10, 3).await.unwrap();
        times.sort();
        assert_eq!(times, vec![12000]);
    }

    #[tokio::test]
    async fn test_prior_best_times_ignore_later_rounds() {
        let store = InMemoryStore::new();
        store
            .with_tables(|t| {
                t.rounds.push(round(1, 100));
                t.rounds.push(round(2, 100));
                t.results.push(result(1, 10, Some(12000)));
                t.results.push(result(2, 10, Some(9000)));
            })
            .unwrap();

        assert!(store.prior_best_times(10, 1).await.unwrap().is_empty());
        assert_eq!(store.prior_best_times(10, 2).await.unwrap(), vec![12000]);
    }

    #[tokio::test]
    async fn test_prior_best_times_across_events_follow_attempt_time() {
        use chrono::TimeZone;

        let attempt = |round_id, hour| Attempt {
            round_id,
            student_id: 10,
            attempt_number: 1,
            time_ms: Some(9000),
            is_dnf: false,
            penalty_seconds: 0,
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap(),
        };
        let store = InMemoryStore::new();
        store
            .with_tables(|t| {
                // round 2 of another event was held first
                t.rounds.push(round(1, 100));
                t.rounds.push(round(2, 200));
                t.attempts.push(attempt(1, 14));
                t.attempts.push(attempt(2, 9));
                t.results.push(result(1, 10, Some(11000)));
                t.results.push(result(2, 10, Some(9000)));
            })
            .unwrap();

        assert_eq!(store.prior_best_times(10, 1).await.unwrap(), vec![9000]);
        assert!(store.prior_best_times(10, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_best_times_only_same_event() {
        let store = InMemoryStore::new();
        store
            .with_tables(|t| {
                t.rounds.push(round(1, 100));
                t.rounds.push(round(2, 100));
                t.rounds.push(round(3, 200));
                t.results.push(result(1, 10, Some(9500)));
                t.results.push(result(2, 10, Some(9000)));
                t.results.push(result(3, 10, Some(4000)));
            })
            .unwrap();

        let times = store.event_best_times(10, 100, 2).await.unwrap();
        assert_eq!(times, vec![9500]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryStore::new();
        store.fail_on("round");
        let err = store.round(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.clear_failures();
        assert!(store.round(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_badge_award_rejected() {
        let store = InMemoryStore::new();
        let award = BadgeAward {
            badge_id: 1,
            student_id: 10,
            competition_id: 5,
            awarded_at: Utc::now(),
        };
        store.award_badge(award.clone()).await.unwrap();
        let err = store.award_badge(award).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_update_ranks_requires_existing_standing() {
        let store = InMemoryStore::new();
        let err = store.update_standing_ranks(1, 2, 1, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
