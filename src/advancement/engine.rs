use serde::{Deserialize, Serialize};
use std::fmt;

use super::policy::CutoffPolicy;
use crate::error::{EngineError, EngineResult};
use crate::store::{Round, RoundId, RoundResult, ScoringStore, StudentId};

/// A competitor's round summary as seen by the advancement engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Competitor {
    pub student_id: StudentId,
    pub best_time_ms: Option<u64>,
    pub is_dnf: bool,
    pub is_dns: bool,
}

impl Competitor {
    pub fn from_result(result: &RoundResult) -> Self {
        Self {
            student_id: result.student_id,
            best_time_ms: result.best_time_ms,
            is_dnf: result.is_dnf,
            is_dns: result.is_dns,
        }
    }

    /// Best time when the competitor actually set one.
    pub fn valid_time(&self) -> Option<u64> {
        if self.is_dnf || self.is_dns {
            None
        } else {
            self.best_time_ms
        }
    }

    /// Sort group: timed competitors, then DNF, then DNS.
    fn group(&self) -> u8 {
        match (self.valid_time(), self.is_dns) {
            (Some(_), _) => 0,
            (None, false) => 1,
            (None, true) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancementStatus {
    Advancing,
    Eliminated,
    Champion,
    RunnerUp,
    ThirdPlace,
}

impl fmt::Display for AdvancementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdvancementStatus::Advancing => "advancing",
            AdvancementStatus::Eliminated => "eliminated",
            AdvancementStatus::Champion => "champion",
            AdvancementStatus::RunnerUp => "runner-up",
            AdvancementStatus::ThirdPlace => "third-place",
        };
        f.write_str(label)
    }
}

/// Outcome for one competitor in one round. `place` is the 1-based position
/// in the round's ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancementDecision {
    pub student_id: StudentId,
    pub status: AdvancementStatus,
    pub place: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancementOutcome {
    /// Ranked, fastest first
    pub advancing: Vec<Competitor>,
    /// Ranked, fastest first
    pub eliminated: Vec<Competitor>,
    pub advancing_count: usize,
    pub eliminated_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Medalists {
    pub champion: Competitor,
    pub runner_up: Option<Competitor>,
    pub third_place: Option<Competitor>,
}

/// Order competitors for advancement: ascending best time, then DNF, then DNS.
/// The sort is stable, so ties keep their submission order.
pub fn rank_competitors(competitors: &[Competitor]) -> Vec<Competitor> {
    let mut ranked = competitors.to_vec();
    ranked.sort_by(|a, b| {
        a.group()
            .cmp(&b.group())
            .then_with(|| a.valid_time().cmp(&b.valid_time()))
    });
    ranked
}

/// Split competitors into advancing and eliminated under a cutoff policy.
/// Finals and the `all` policy never eliminate anyone.
pub fn calculate_advancement(
    competitors: &[Competitor],
    policy: &CutoffPolicy,
    is_finals_round: bool,
) -> AdvancementOutcome {
    let ranked = rank_competitors(competitors);
    let n = ranked.len();

    let (advancing, eliminated): (Vec<Competitor>, Vec<Competitor>) =
        if is_finals_round || matches!(policy, CutoffPolicy::All) {
            (ranked, Vec::new())
        } else {
            match policy {
                CutoffPolicy::Time { time_ms } => ranked
                    .into_iter()
                    .partition(|c| c.valid_time().is_some_and(|t| t < *time_ms)),
                _ => {
                    let slots = policy.advancing_slots(n).unwrap_or(n);
                    let mut advancing = ranked;
                    let eliminated = advancing.split_off(slots);
                    (advancing, eliminated)
                }
            }
        };

    AdvancementOutcome {
        advancing_count: advancing.len(),
        eliminated_count: eliminated.len(),
        advancing,
        eliminated,
    }
}

/// Podium of an already-ranked advancing list. Only competitors with a valid
/// time can medal; fewer than three yields fewer medals. None when nobody can.
pub fn determine_medalists(advancing: &[Competitor]) -> Option<Medalists> {
    let mut podium = advancing.iter().filter(|c| c.valid_time().is_some()).cloned();
    let champion = podium.next()?;
    Some(Medalists {
        champion,
        runner_up: podium.next(),
        third_place: podium.next(),
    })
}

/// Per-competitor statuses, in ranking order.
///
/// In finals the medal statuses go to the first three advancing competitors
/// *with a valid time*, not simply the first three advancing. A DNF or DNS
/// finalist keeps `Advancing` and its medal passes down, so a final with two
/// valid times has no third place.
pub fn advancement_decisions(
    outcome: &AdvancementOutcome,
    is_finals_round: bool,
) -> Vec<AdvancementDecision> {
    let medals = if is_finals_round {
        determine_medalists(&outcome.advancing)
    } else {
        None
    };
    let medal_for = |student_id: StudentId| -> Option<AdvancementStatus> {
        let m = medals.as_ref()?;
        if m.champion.student_id == student_id {
            Some(AdvancementStatus::Champion)
        } else if m.runner_up.as_ref().map(|c| c.student_id) == Some(student_id) {
            Some(AdvancementStatus::RunnerUp)
        } else if m.third_place.as_ref().map(|c| c.student_id) == Some(student_id) {
            Some(AdvancementStatus::ThirdPlace)
        } else {
            None
        }
    };

    let advancing = outcome.advancing.iter().map(|c| {
        (
            c.student_id,
            medal_for(c.student_id).unwrap_or(AdvancementStatus::Advancing),
        )
    });
    let eliminated = outcome
        .eliminated
        .iter()
        .map(|c| (c.student_id, AdvancementStatus::Eliminated));

    advancing
        .chain(eliminated)
        .enumerate()
        .map(|(i, (student_id, status))| AdvancementDecision {
            student_id,
            status,
            place: i + 1,
        })
        .collect()
}

/// Advancement for a stored round.
#[derive(Debug, Clone)]
pub struct RoundAdvancement {
    pub round: Round,
    pub outcome: AdvancementOutcome,
    pub medalists: Option<Medalists>,
    pub decisions: Vec<AdvancementDecision>,
}

/// Load a round and its results and decide who advances. Nothing is written.
pub async fn advance_round(
    store: &dyn ScoringStore,
    round_id: RoundId,
) -> EngineResult<RoundAdvancement> {
    let round = store
        .round(round_id)
        .await?
        .ok_or(EngineError::RoundNotFound(round_id))?;
    let results = store.round_results(round_id).await?;
    if results.is_empty() {
        return Err(EngineError::NoCompetitors(round_id));
    }

    let competitors: Vec<Competitor> = results.iter().map(Competitor::from_result).collect();
    let outcome = calculate_advancement(&competitors, &round.cutoff, round.is_final);
    let medalists = if round.is_final {
        determine_medalists(&outcome.advancing)
    } else {
        None
    };
    let decisions = advancement_decisions(&outcome, round.is_final);

    tracing::info!(
        round_id,
        policy = %round.cutoff.describe(),
        advancing = outcome.advancing_count,
        eliminated = outcome.eliminated_count,
        "advancement decided"
    );

    Ok(RoundAdvancement {
        round,
        outcome,
        medalists,
        decisions,
    })
}
