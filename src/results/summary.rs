use crate::scoring::bonus::effective_time;
use crate::store::{Attempt, RoundFormat, RoundId, RoundResult, StudentId};

/// Best and average derived from one competitor's attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptSummary {
    pub best_time_ms: Option<u64>,
    /// None for `best_of`, for an incomplete set, or for a DNF average
    pub average_time_ms: Option<u64>,
    pub is_dnf: bool,
    pub is_dns: bool,
}

impl AttemptSummary {
    pub fn into_result(self, round_id: RoundId, student_id: StudentId) -> RoundResult {
        RoundResult {
            round_id,
            student_id,
            best_time_ms: self.best_time_ms,
            average_time_ms: self.average_time_ms,
            is_dnf: self.is_dnf,
            is_dns: self.is_dns,
        }
    }
}

/// Summarize attempts under a round format. Penalty seconds count toward every
/// time. No attempts at all is DNS; attempts with no valid time is DNF.
pub fn summarize_attempts(format: RoundFormat, attempts: &[Attempt]) -> AttemptSummary {
    if attempts.is_empty() {
        return AttemptSummary {
            is_dns: true,
            ..AttemptSummary::default()
        };
    }

    let times: Vec<Option<u64>> = attempts.iter().map(effective_time).collect();
    let best_time_ms = times.iter().flatten().min().copied();

    AttemptSummary {
        best_time_ms,
        average_time_ms: average(format, &times),
        is_dnf: best_time_ms.is_none(),
        is_dns: false,
    }
}

fn average(format: RoundFormat, times: &[Option<u64>]) -> Option<u64> {
    if times.len() < format.attempt_count() {
        return None;
    }
    let counted = &times[..format.attempt_count()];
    match format {
        RoundFormat::BestOf => None,
        RoundFormat::MeanOf3 => {
            let valid: Vec<u64> = counted.iter().copied().collect::<Option<Vec<u64>>>()?;
            Some(rounded_mean(&valid))
        }
        RoundFormat::AverageOf5 => {
            // a DNF counts as the worst attempt and is the one dropped
            let dnfs = counted.iter().filter(|t| t.is_none()).count();
            if dnfs > 1 {
                return None;
            }
            let mut valid: Vec<u64> = counted.iter().flatten().copied().collect();
            valid.sort_unstable();
            let middle = if dnfs == 1 {
                &valid[1..]
            } else {
                &valid[1..valid.len() - 1]
            };
            Some(rounded_mean(middle))
        }
    }
}

fn rounded_mean(times: &[u64]) -> u64 {
    let sum: u64 = times.iter().sum();
    let n = times.len() as u64;
    (sum + n / 2) / n
}
