pub mod recompute;
pub mod summary;

pub use recompute::{recompute_round_results, RecomputeReport};
pub use summary::{summarize_attempts, AttemptSummary};
