pub mod bonus;
pub mod config;
pub mod engine;
pub mod multiplier;
pub mod tiers;
pub mod validation;

pub use bonus::{
    check_clutch_bonus, check_pb_bonus, check_school_momentum, check_streak_bonus,
    detect_bonuses, momentum_schools, BonusFlags,
};
pub use config::*;
pub use engine::{
    calculate_points, calculate_points_for_round, PointBreakdown, PointCalculation, PointComponent,
};
pub use multiplier::{grade_multiplier, MultiplierOutcome};
pub use tiers::{classify_tier, classify_tier_for_event, Tier, TierOutcome, TierThreshold};
pub use validation::{validate_cutoffs, validate_scoring, validate_thresholds};
