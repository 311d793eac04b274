use std::cmp::Ordering;
use std::collections::HashMap;

use super::aggregate::SchoolStanding;
use crate::store::Division;

/// Standings order: total points descending, then PB count descending, then
/// school name, then school id.
pub fn standing_order(a: &SchoolStanding, b: &SchoolStanding) -> Ordering {
    b.total_points
        .total_cmp(&a.total_points)
        .then_with(|| b.pb_count.cmp(&a.pb_count))
        .then_with(|| a.school_name.cmp(&b.school_name))
        .then_with(|| a.school_id.cmp(&b.school_id))
}

/// Sort standings and assign positional overall and division ranks (1..N).
pub fn assign_ranks(standings: &mut [SchoolStanding]) {
    standings.sort_by(standing_order);

    let mut next_in_division: HashMap<Division, u32> = HashMap::new();
    for (i, standing) in standings.iter_mut().enumerate() {
        standing.overall_rank = Some(i as u32 + 1);
        let slot = next_in_division.entry(standing.division).or_insert(0);
        *slot += 1;
        standing.division_rank = Some(*slot);
    }
}
