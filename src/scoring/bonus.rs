//! Bonus detection: personal bests, clutch finals, improvement streaks and
//! school momentum.
//!
//! The pure checks take already-fetched history. The async wrappers read that
//! history from the store and fail closed: a read error means "not earned".

use std::collections::BTreeMap;

use super::config::ScoringConfig;
use crate::store::{Attempt, Round, RoundId, RoundResult, SchoolId, ScoringStore, StudentId};

/// Individual bonuses earned in one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusFlags {
    pub personal_best: bool,
    pub clutch: bool,
    pub streak: bool,
}

/// True when `best` beats every prior best, or there is no prior best at all.
/// DNF or a missing time is never a personal best.
pub fn is_personal_best(best: Option<u64>, is_dnf: bool, prior_bests: &[u64]) -> bool {
    let Some(best) = best else {
        return false;
    };
    if is_dnf {
        return false;
    }
    match prior_bests.iter().min() {
        Some(&previous) => best < previous,
        None => true,
    }
}

/// True when a finals best beats the competitor's best from every other round
/// of the event. With no other valid round, any finals time counts.
pub fn is_clutch(finals_best: Option<u64>, other_round_bests: &[u64]) -> bool {
    let Some(best) = finals_best else {
        return false;
    };
    match other_round_bests.iter().min() {
        Some(&previous) => best < previous,
        None => true,
    }
}

/// Time an attempt counts for, with penalty seconds added. None when DNF or untimed.
pub fn effective_time(attempt: &Attempt) -> Option<u64> {
    if attempt.is_dnf {
        return None;
    }
    attempt
        .time_ms
        .map(|t| t + u64::from(attempt.penalty_seconds) * 1000)
}

/// True when `length` consecutive valid attempts are each strictly faster than
/// the one before. Invalid attempts are skipped, not treated as breaks.
pub fn has_improvement_streak(attempts: &[Attempt], length: usize) -> bool {
    let mut ordered: Vec<&Attempt> = attempts.iter().collect();
    ordered.sort_by_key(|a| (a.recorded_at, a.attempt_number));

    let times: Vec<u64> = ordered.iter().filter_map(|a| effective_time(a)).collect();
    if length < 2 || times.len() < length {
        return false;
    }

    let mut run = 1;
    for pair in times.windows(2) {
        if pair[1] < pair[0] {
            run += 1;
            if run >= length {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

/// True when an attempt produced no usable time.
fn is_dnf_attempt(attempt: &Attempt) -> bool {
    attempt.is_dnf || attempt.time_ms.is_none()
}

/// True when a school had participants in the round and none of them DNF'd,
/// neither as a result nor on any single attempt. DNS rows are not participants.
pub fn has_school_momentum<'a>(
    results: impl IntoIterator<Item = &'a RoundResult>,
    attempts: &[Attempt],
) -> bool {
    let mut any = false;
    for result in results.into_iter().filter(|r| !r.is_dns) {
        if result.is_dnf {
            return false;
        }
        let dnf_attempt = attempts
            .iter()
            .any(|a| a.student_id == result.student_id && is_dnf_attempt(a));
        if dnf_attempt {
            return false;
        }
        any = true;
    }
    any
}

pub async fn check_pb_bonus(
    store: &dyn ScoringStore,
    student_id: StudentId,
    round_id: RoundId,
    best: Option<u64>,
    is_dnf: bool,
) -> bool {
    if best.is_none() || is_dnf {
        return false;
    }
    match store.prior_best_times(student_id, round_id).await {
        Ok(prior) => is_personal_best(best, is_dnf, &prior),
        Err(e) => {
            tracing::warn!(student_id, round_id, error = %e, "PB lookup failed, bonus not awarded");
            false
        }
    }
}

/// Only evaluated for rounds whose name carries the finals token.
pub async fn check_clutch_bonus(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round: &Round,
    student_id: StudentId,
    best: Option<u64>,
    is_dnf: bool,
) -> bool {
    if !config.is_finals_name(&round.name) || is_dnf || best.is_none() {
        return false;
    }
    match store
        .event_best_times(student_id, round.event_id, round.id)
        .await
    {
        Ok(others) => is_clutch(best, &others),
        Err(e) => {
            tracing::warn!(student_id, round_id = round.id, error = %e, "clutch lookup failed, bonus not awarded");
            false
        }
    }
}

pub async fn check_streak_bonus(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round_id: RoundId,
    student_id: StudentId,
) -> bool {
    match store.attempts(round_id, student_id).await {
        Ok(attempts) => has_improvement_streak(&attempts, config.streak_length()),
        Err(e) => {
            tracing::warn!(student_id, round_id, error = %e, "attempt lookup failed, streak not awarded");
            false
        }
    }
}

/// Run all three individual checks for one competitor.
pub async fn detect_bonuses(
    store: &dyn ScoringStore,
    config: &ScoringConfig,
    round: &Round,
    result: &RoundResult,
) -> BonusFlags {
    let best = result.valid_best();
    BonusFlags {
        personal_best: check_pb_bonus(store, result.student_id, round.id, best, result.is_dnf)
            .await,
        clutch: check_clutch_bonus(store, config, round, result.student_id, best, result.is_dnf)
            .await,
        streak: check_streak_bonus(store, config, round.id, result.student_id).await,
    }
}

/// Whether one school earned the momentum bonus in a round.
pub async fn check_school_momentum(
    store: &dyn ScoringStore,
    round_id: RoundId,
    school_id: SchoolId,
) -> bool {
    match schools_in_round(store, round_id).await {
        Some(by_school) => by_school
            .get(&school_id)
            .map(|school| has_school_momentum(&school.results, &school.attempts))
            .unwrap_or(false),
        None => false,
    }
}

/// Every school in the round with zero DNFs among its participants, in school id order.
pub async fn momentum_schools(store: &dyn ScoringStore, round_id: RoundId) -> Vec<SchoolId> {
    match schools_in_round(store, round_id).await {
        Some(by_school) => by_school
            .into_iter()
            .filter(|(_, school)| has_school_momentum(&school.results, &school.attempts))
            .map(|(school_id, _)| school_id)
            .collect(),
        None => Vec::new(),
    }
}

#[derive(Default)]
struct SchoolRound {
    results: Vec<RoundResult>,
    attempts: Vec<Attempt>,
}

/// Participating results and their attempts grouped by the competitor's school.
/// None when any read fails.
async fn schools_in_round(
    store: &dyn ScoringStore,
    round_id: RoundId,
) -> Option<BTreeMap<SchoolId, SchoolRound>> {
    let results = match store.round_results(round_id).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(round_id, error = %e, "round results lookup failed, no momentum awarded");
            return None;
        }
    };
    let mut attempts = match store.round_attempts(round_id).await {
        Ok(attempts) => attempts,
        Err(e) => {
            tracing::warn!(round_id, error = %e, "attempt lookup failed, no momentum awarded");
            return None;
        }
    };

    let mut by_school: BTreeMap<SchoolId, SchoolRound> = BTreeMap::new();
    for result in results.into_iter().filter(|r| !r.is_dns) {
        match store.student(result.student_id).await {
            Ok(Some(student)) => {
                let school = by_school.entry(student.school_id).or_default();
                let (own, rest): (Vec<Attempt>, Vec<Attempt>) = attempts
                    .into_iter()
                    .partition(|a| a.student_id == result.student_id);
                attempts = rest;
                school.attempts.extend(own);
                school.results.push(result);
            }
            Ok(None) => {
                tracing::warn!(student_id = result.student_id, "result for unknown student skipped");
            }
            Err(e) => {
                // a school we cannot see fully must not earn the bonus
                tracing::warn!(student_id = result.student_id, error = %e, "student lookup failed");
                return None;
            }
        }
    }
    Some(by_school)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    pub(crate) fn attempts(times: &[Option<u64>]) -> Vec<Attempt> {
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        times
            .iter()
            .enumerate()
            .map(|(i, t)| Attempt {
                round_id: 1,
                student_id: 1,
                attempt_number: (i + 1) as u8,
                time_ms: *t,
                is_dnf: t.is_none(),
                penalty_seconds: 0,
                recorded_at: start + Duration::minutes(i as i64),
            })
            .collect()
    }

    fn result(is_dnf: bool) -> RoundResult {
        RoundResult {
            round_id: 1,
            student_id: 1,
            best_time_ms: if is_dnf { None } else { Some(10000) },
            average_time_ms: None,
            is_dnf,
            is_dns: false,
        }
    }

    #[test]
    fn test_first_time_is_pb() {
        assert!(is_personal_best(Some(12000), false, &[]));
    }

    #[test]
    fn test_pb_must_be_strictly_faster() {
        assert!(is_personal_best(Some(8999), false, &[9000, 11000]));
        assert!(!is_personal_best(Some(9000), false, &[9000, 11000]));
        assert!(!is_personal_best(Some(9500), false, &[9000]));
    }

    #[test]
    fn test_dnf_never_pb() {
        assert!(!is_personal_best(None, false, &[]));
        assert!(!is_personal_best(Some(1000), true, &[]));
        assert!(!is_personal_best(None, true, &[9000]));
    }

    #[test]
    fn test_clutch_beats_earlier_rounds() {
        assert!(is_clutch(Some(9000), &[9500, 10200]));
        assert!(!is_clutch(Some(9500), &[9500]));
        assert!(!is_clutch(None, &[9500]));
    }

    #[test]
    fn test_clutch_without_other_rounds() {
        assert!(is_clutch(Some(20000), &[]));
    }

    #[test]
    fn test_streak_with_trailing_dnf() {
        let a = attempts(&[Some(10000), Some(9500), Some(9000), Some(8800), None]);
        assert!(has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_streak_needs_strict_improvement() {
        let a = attempts(&[Some(10000), Some(10000), Some(9000), Some(9500), Some(9400)]);
        assert!(!has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_streak_skips_dnf_between_valid_attempts() {
        let a = attempts(&[Some(10000), None, Some(9000), Some(8000)]);
        assert!(has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_streak_needs_three_valid_attempts() {
        let a = attempts(&[Some(10000), Some(9000), None, None, None]);
        assert!(!has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_streak_counts_penalty() {
        let mut a = attempts(&[Some(10000), Some(9500), Some(9000)]);
        // +2 turns 9000 into 11000
        a[2].penalty_seconds = 2;
        assert!(!has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_streak_uses_time_order() {
        let mut a = attempts(&[Some(8000), Some(9000), Some(10000)]);
        a.reverse();
        for (i, attempt) in a.iter_mut().enumerate() {
            attempt.recorded_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, i as u32, 0).unwrap();
        }
        // recorded order is now 10000, 9000, 8000
        assert!(has_improvement_streak(&a, 3));
    }

    #[test]
    fn test_momentum() {
        assert!(has_school_momentum(&[result(false), result(false)], &[]));
        assert!(!has_school_momentum(&[result(false), result(true)], &[]));
        assert!(!has_school_momentum(&[] as &[RoundResult], &[]));
    }

    #[test]
    fn test_momentum_lost_to_single_dnf_attempt() {
        // best and average both valid, one of five attempts DNF
        let a = attempts(&[Some(10000), None, Some(9500), Some(9800), Some(9900)]);
        assert!(!has_school_momentum(&[result(false)], &a));

        let clean = attempts(&[Some(10000), Some(9500), Some(9800)]);
        assert!(has_school_momentum(&[result(false)], &clean));
    }

    #[test]
    fn test_momentum_untimed_attempt_counts_as_dnf() {
        let mut a = attempts(&[Some(10000), Some(9500), Some(9800)]);
        a[1].time_ms = None;
        a[1].is_dnf = false;
        assert!(!has_school_momentum(&[result(false)], &a));
    }

    #[test]
    fn test_momentum_ignores_dns() {
        let mut dns = result(false);
        dns.best_time_ms = None;
        dns.is_dns = true;
        assert!(!has_school_momentum(&[dns.clone()], &[]));
        assert!(has_school_momentum(&[dns, result(false)], &[]));
    }
}
