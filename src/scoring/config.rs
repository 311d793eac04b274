use serde::{Deserialize, Serialize};

/// Point values and detection knobs for round scoring.
///
/// Every field is optional; missing fields fall back to the standard values.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   pb_bonus: 1
///   clutch_bonus: 2
///   streak_bonus: 3
///   momentum_bonus: 5
///   default_multiplier: 1.0
///   finals_token: "final"
///   streak_length: 3
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Points for a personal best, before the grade multiplier (default: 1)
    #[serde(default)]
    pub pb_bonus: Option<f64>,

    /// Points for improving one's best in a finals round (default: 2)
    #[serde(default)]
    pub clutch_bonus: Option<f64>,

    /// Points for consecutive improving attempts (default: 3)
    #[serde(default)]
    pub streak_bonus: Option<f64>,

    /// Flat school-level points for a round with zero DNFs (default: 5).
    /// Not scaled by any multiplier.
    #[serde(default)]
    pub momentum_bonus: Option<f64>,

    /// Multiplier used when a grade has no configured row (default: 1.0)
    #[serde(default)]
    pub default_multiplier: Option<f64>,

    /// Case-insensitive token in a round name that marks it as a final (default: "final")
    #[serde(default)]
    pub finals_token: Option<String>,

    /// Number of consecutive, strictly improving attempts that make a streak (default: 3)
    #[serde(default)]
    pub streak_length: Option<usize>,
}

pub const DEFAULT_PB_BONUS: f64 = 1.0;
pub const DEFAULT_CLUTCH_BONUS: f64 = 2.0;
pub const DEFAULT_STREAK_BONUS: f64 = 3.0;
pub const DEFAULT_MOMENTUM_BONUS: f64 = 5.0;
pub const DEFAULT_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_FINALS_TOKEN: &str = "final";
pub const DEFAULT_STREAK_LENGTH: usize = 3;

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pb_bonus: Some(DEFAULT_PB_BONUS),
            clutch_bonus: Some(DEFAULT_CLUTCH_BONUS),
            streak_bonus: Some(DEFAULT_STREAK_BONUS),
            momentum_bonus: Some(DEFAULT_MOMENTUM_BONUS),
            default_multiplier: Some(DEFAULT_MULTIPLIER),
            finals_token: Some(DEFAULT_FINALS_TOKEN.to_string()),
            streak_length: Some(DEFAULT_STREAK_LENGTH),
        }
    }
}

impl ScoringConfig {
    pub fn pb_bonus(&self) -> f64 {
        self.pb_bonus.unwrap_or(DEFAULT_PB_BONUS)
    }

    pub fn clutch_bonus(&self) -> f64 {
        self.clutch_bonus.unwrap_or(DEFAULT_CLUTCH_BONUS)
    }

    pub fn streak_bonus(&self) -> f64 {
        self.streak_bonus.unwrap_or(DEFAULT_STREAK_BONUS)
    }

    pub fn momentum_bonus(&self) -> f64 {
        self.momentum_bonus.unwrap_or(DEFAULT_MOMENTUM_BONUS)
    }

    pub fn default_multiplier(&self) -> f64 {
        self.default_multiplier.unwrap_or(DEFAULT_MULTIPLIER)
    }

    pub fn finals_token(&self) -> &str {
        self.finals_token.as_deref().unwrap_or(DEFAULT_FINALS_TOKEN)
    }

    pub fn streak_length(&self) -> usize {
        self.streak_length.unwrap_or(DEFAULT_STREAK_LENGTH)
    }

    /// Whether a round display name marks a finals round.
    pub fn is_finals_name(&self, round_name: &str) -> bool {
        round_name
            .to_lowercase()
            .contains(&self.finals_token().to_lowercase())
    }
}
