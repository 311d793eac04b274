pub mod aggregate;
pub mod ranking;
pub mod refresh;

pub use aggregate::{aggregate_school, SchoolStanding};
pub use ranking::{assign_ranks, standing_order};
pub use refresh::{update_all_school_standings_for_competition, StandingsReport};
