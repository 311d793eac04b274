pub mod error;
pub mod memory;
pub mod snapshot;
pub mod types;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use snapshot::{get_store_path, load_snapshot, save_snapshot, StoreSnapshot};
pub use types::*;

use async_trait::async_trait;

use crate::advancement::AdvancementDecision;
use crate::badges::{Badge, BadgeAward};
use crate::ledger::{NewPointTransaction, PointTransaction};
use crate::scoring::TierThreshold;
use crate::standings::SchoolStanding;

/// Read/write contract against the persistent record store.
///
/// Every engine component receives the store explicitly, so tests can pass an
/// [`InMemoryStore`] and the binary can pass whatever backend it was built with.
/// Each call is one round-trip; callers await them sequentially.
#[async_trait]
pub trait ScoringStore: Send + Sync {
    async fn round(&self, round_id: RoundId) -> Result<Option<Round>, StoreError>;

    async fn event(&self, event_id: EventId) -> Result<Option<CompetitionEvent>, StoreError>;

    async fn competition(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Option<Competition>, StoreError>;

    async fn student(&self, student_id: StudentId) -> Result<Option<Student>, StoreError>;

    /// Every school registered for the competition.
    async fn competition_schools(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<School>, StoreError>;

    /// Thresholds for an event type, ordered by `sort_order`.
    async fn tier_thresholds(
        &self,
        event_type_id: EventTypeId,
    ) -> Result<Vec<TierThreshold>, StoreError>;

    async fn grade_multiplier(&self, grade: &str) -> Result<Option<GradeMultiplier>, StoreError>;

    /// Results for a round in submission order.
    async fn round_results(&self, round_id: RoundId) -> Result<Vec<RoundResult>, StoreError>;

    async fn upsert_round_result(&self, result: RoundResult) -> Result<(), StoreError>;

    /// A competitor's attempts in a round, ordered by attempt number.
    async fn attempts(
        &self,
        round_id: RoundId,
        student_id: StudentId,
    ) -> Result<Vec<Attempt>, StoreError>;

    async fn round_attempts(&self, round_id: RoundId) -> Result<Vec<Attempt>, StoreError>;

    /// Valid best times the student set in rounds held before `current_round`,
    /// across all competitions and event types.
    async fn prior_best_times(
        &self,
        student_id: StudentId,
        current_round: RoundId,
    ) -> Result<Vec<u64>, StoreError>;

    /// Valid best times the student set in other rounds of the same event.
    async fn event_best_times(
        &self,
        student_id: StudentId,
        event_id: EventId,
        excluding_round: RoundId,
    ) -> Result<Vec<u64>, StoreError>;

    /// Append one ledger row. Rows are never updated afterwards.
    async fn insert_transaction(
        &self,
        transaction: NewPointTransaction,
    ) -> Result<PointTransaction, StoreError>;

    /// Bulk-delete a round's ledger rows for corrections. Returns the number removed.
    async fn delete_round_transactions(&self, round_id: RoundId) -> Result<usize, StoreError>;

    async fn competition_transactions(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<PointTransaction>, StoreError>;

    /// DNF results recorded for the school's students in the competition.
    async fn school_dnf_count(
        &self,
        competition_id: CompetitionId,
        school_id: SchoolId,
    ) -> Result<u32, StoreError>;

    /// Insert or replace the standing keyed by (competition, school).
    async fn upsert_school_standing(&self, standing: SchoolStanding) -> Result<(), StoreError>;

    async fn update_standing_ranks(
        &self,
        competition_id: CompetitionId,
        school_id: SchoolId,
        overall_rank: u32,
        division_rank: u32,
    ) -> Result<(), StoreError>;

    async fn school_standings(
        &self,
        competition_id: CompetitionId,
    ) -> Result<Vec<SchoolStanding>, StoreError>;

    async fn record_advancement(
        &self,
        round_id: RoundId,
        decisions: &[AdvancementDecision],
    ) -> Result<(), StoreError>;

    async fn update_round_status(
        &self,
        round_id: RoundId,
        status: RoundStatus,
    ) -> Result<(), StoreError>;

    async fn badges(&self) -> Result<Vec<Badge>, StoreError>;

    /// Badges the student already holds for the competition.
    async fn student_badges(
        &self,
        student_id: StudentId,
        competition_id: CompetitionId,
    ) -> Result<Vec<BadgeId>, StoreError>;

    async fn award_badge(&self, award: BadgeAward) -> Result<(), StoreError>;
}
