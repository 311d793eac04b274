use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};
use crate::store::{EventTypeId, ScoringStore};

/// Discrete performance band, S best through D (catch-all and DNF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
        };
        f.write_str(name)
    }
}

/// Scoring band for one event type. Bounds are half-open: `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub event_type_id: EventTypeId,
    pub tier: Tier,
    /// Missing means 0
    #[serde(default)]
    pub min_time_ms: Option<u64>,
    /// Missing means unbounded
    #[serde(default)]
    pub max_time_ms: Option<u64>,
    pub base_points: u32,
    pub sort_order: u32,
}

impl TierThreshold {
    pub fn lower_bound(&self) -> u64 {
        self.min_time_ms.unwrap_or(0)
    }

    pub fn upper_bound(&self) -> u64 {
        self.max_time_ms.unwrap_or(u64::MAX)
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        let below_max = match self.max_time_ms {
            Some(max) => time_ms < max,
            None => true,
        };
        time_ms >= self.lower_bound() && below_max
    }

    /// Describe the band as "[min, max)" for logs and validation messages.
    pub fn describe(&self) -> String {
        match self.max_time_ms {
            Some(max) => format!("{} [{}, {})", self.tier, self.lower_bound(), max),
            None => format!("{} [{}, inf)", self.tier, self.lower_bound()),
        }
    }
}

/// Pick the threshold a time falls into.
///
/// `thresholds` must already be ordered by `sort_order`. D bands are skipped
/// while scanning; DNF, a missing time, or a time outside every other band
/// lands in D.
pub fn classify_tier(
    thresholds: &[TierThreshold],
    event_type_id: EventTypeId,
    time_ms: Option<u64>,
    is_dnf: bool,
) -> EngineResult<&TierThreshold> {
    if thresholds.is_empty() {
        return Err(EngineError::NoThresholds(event_type_id));
    }

    if let (Some(time), false) = (time_ms, is_dnf) {
        let matched = thresholds
            .iter()
            .filter(|t| t.tier != Tier::D)
            .find(|t| t.contains(time));
        if let Some(threshold) = matched {
            return Ok(threshold);
        }
    }

    thresholds
        .iter()
        .find(|t| t.tier == Tier::D)
        .ok_or(EngineError::MissingFallbackTier(event_type_id))
}

/// Fetch an event type's thresholds from the store and classify one time.
pub async fn classify_tier_for_event(
    store: &dyn ScoringStore,
    time_ms: Option<u64>,
    event_type_id: EventTypeId,
    is_dnf: bool,
) -> EngineResult<TierThreshold> {
    let thresholds = store.tier_thresholds(event_type_id).await?;
    classify_tier(&thresholds, event_type_id, time_ms, is_dnf).cloned()
}

/// What a caller scores with when classification succeeded or was degraded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierOutcome {
    pub tier: Tier,
    pub base_points: u32,
    /// Classification failed and D / 0 points were substituted
    pub degraded: bool,
}

impl TierOutcome {
    pub fn fallback() -> Self {
        Self {
            tier: Tier::D,
            base_points: 0,
            degraded: true,
        }
    }
}

/// Classify against already-fetched thresholds, degrading to D / 0 points on failure.
pub fn classify_or_fallback(
    thresholds: &[TierThreshold],
    event_type_id: EventTypeId,
    time_ms: Option<u64>,
    is_dnf: bool,
) -> TierOutcome {
    match classify_tier(thresholds, event_type_id, time_ms, is_dnf) {
        Ok(threshold) => TierOutcome {
            tier: threshold.tier,
            base_points: threshold.base_points,
            degraded: false,
        },
        Err(e) => {
            tracing::warn!(event_type_id, error = %e, "tier classification failed, scoring as tier D");
            TierOutcome::fallback()
        }
    }
}
