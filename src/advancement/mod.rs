pub mod engine;
pub mod policy;

pub use engine::{
    advance_round, advancement_decisions, calculate_advancement, determine_medalists,
    rank_competitors, AdvancementDecision, AdvancementOutcome, AdvancementStatus, Competitor,
    Medalists, RoundAdvancement,
};
pub use policy::CutoffPolicy;
