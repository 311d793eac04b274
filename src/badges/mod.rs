pub mod evaluator;
pub mod rules;

pub use evaluator::{evaluate_badges, BadgeReport};
pub use rules::{rule_satisfied, Badge, BadgeAward, BadgeRule, StudentActivity};
