use serde::{Deserialize, Serialize};

/// How many competitors proceed from a round.
///
/// Example YAML / JSON forms:
/// ```yaml
/// cutoff: { type: percentage, percent: 75 }
/// cutoff: { type: count, count: 12 }
/// cutoff: { type: time, time_ms: 30000 }
/// cutoff: { type: all }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CutoffPolicy {
    /// Top `ceil(N * percent / 100)` advance
    Percentage { percent: f64 },
    /// Top `min(count, N)` advance
    Count { count: usize },
    /// Everyone with a best time strictly under `time_ms` advances
    Time { time_ms: u64 },
    /// Everyone advances
    All,
}

impl CutoffPolicy {
    /// Number of competitors that advance out of `n` ranked ones, for the
    /// rank-based policies. `None` for policies that are not rank-based.
    pub fn advancing_slots(&self, n: usize) -> Option<usize> {
        match self {
            CutoffPolicy::Percentage { percent } => {
                if n == 0 {
                    return Some(0);
                }
                let raw = (n as f64 * percent / 100.0).ceil();
                let slots = if raw.is_finite() && raw > 0.0 { raw as usize } else { 1 };
                Some(slots.clamp(1, n))
            }
            CutoffPolicy::Count { count } => Some((*count).min(n)),
            CutoffPolicy::All => Some(n),
            CutoffPolicy::Time { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CutoffPolicy::Percentage { percent } => format!("top {}%", percent),
            CutoffPolicy::Count { count } => format!("top {}", count),
            CutoffPolicy::Time { time_ms } => format!("under {} ms", time_ms),
            CutoffPolicy::All => "everyone".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            CutoffPolicy::Percentage { percent } if !(*percent > 0.0 && *percent <= 100.0) => {
                Err(format!("cutoff percentage must be in (0, 100], got {}", percent))
            }
            _ => Ok(()),
        }
    }
}
