use std::collections::BTreeMap;

use super::config::ScoringConfig;
use super::tiers::{Tier, TierThreshold};
use crate::store::{EventTypeId, Round};

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let bonuses = [
        ("pb_bonus", config.pb_bonus),
        ("clutch_bonus", config.clutch_bonus),
        ("streak_bonus", config.streak_bonus),
        ("momentum_bonus", config.momentum_bonus),
    ];
    for (name, value) in bonuses {
        if let Some(v) = value {
            if v < 0.0 || !v.is_finite() {
                errors.push(format!("scoring.{}: must be a non-negative number", name));
            }
        }
    }

    if let Some(m) = config.default_multiplier {
        if m <= 0.0 || !m.is_finite() {
            errors.push("scoring.default_multiplier: must be positive".to_string());
        }
    }

    if let Some(ref token) = config.finals_token {
        if token.trim().is_empty() {
            errors.push("scoring.finals_token: must not be empty".to_string());
        }
    }

    if let Some(length) = config.streak_length {
        if length < 2 {
            errors.push(format!(
                "scoring.streak_length: must be at least 2, got {}",
                length
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate tier thresholds, grouped by event type.
///
/// Every event type needs exactly one D tier; other bands must be non-empty
/// and must not overlap.
pub fn validate_thresholds(thresholds: &[TierThreshold]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let mut by_event: BTreeMap<EventTypeId, Vec<&TierThreshold>> = BTreeMap::new();
    for threshold in thresholds {
        by_event
            .entry(threshold.event_type_id)
            .or_default()
            .push(threshold);
    }

    for (event_type_id, bands) in by_event {
        let d_count = bands.iter().filter(|t| t.tier == Tier::D).count();
        match d_count {
            0 => errors.push(format!(
                "tiers[event_type {}]: missing D tier (required as the DNF fallback)",
                event_type_id
            )),
            1 => {}
            n => errors.push(format!(
                "tiers[event_type {}]: {} D tiers defined, expected 1",
                event_type_id, n
            )),
        }

        let scanned: Vec<&&TierThreshold> = bands.iter().filter(|t| t.tier != Tier::D).collect();
        for band in &scanned {
            if band.lower_bound() >= band.upper_bound() {
                errors.push(format!(
                    "tiers[event_type {}]: band {} is empty",
                    event_type_id,
                    band.describe()
                ));
            }
        }

        for (i, a) in scanned.iter().enumerate() {
            for b in scanned.iter().skip(i + 1) {
                let overlaps = a.lower_bound() < b.upper_bound() && b.lower_bound() < a.upper_bound();
                if overlaps {
                    errors.push(format!(
                        "tiers[event_type {}]: bands {} and {} overlap",
                        event_type_id,
                        a.describe(),
                        b.describe()
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate every round's cutoff policy.
pub fn validate_cutoffs(rounds: &[Round]) -> Result<(), Vec<String>> {
    let errors: Vec<String> = rounds
        .iter()
        .filter_map(|round| {
            round
                .cutoff
                .validate()
                .err()
                .map(|e| format!("rounds[{}]: {}", round.id, e))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
