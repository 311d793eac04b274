use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::advancement::{AdvancementDecision, AdvancementStatus};
use crate::pipeline::RoundCompletion;
use crate::scoring::PointCalculation;
use crate::standings::SchoolStanding;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a solve time the way scorecards show it
/// "9.87" under a minute, "1:02.35" above, "DNF" for no valid time
/// Centiseconds are truncated, not rounded
pub fn format_time(time_ms: Option<u64>, is_dnf: bool) -> String {
    let Some(ms) = time_ms.filter(|_| !is_dnf) else {
        return "DNF".to_string();
    };
    let centis = (ms % 1000) / 10;
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{}:{:02}.{:02}", minutes, seconds, centis)
    } else {
        format!("{}.{:02}", seconds, centis)
    }
}

/// Format points with at most two decimals, trailing zeros trimmed
/// If degraded is true, appends asterisk to flag default tier/multiplier use
pub fn format_points(points: f64, degraded: bool) -> String {
    let formatted = format!("{:.2}", points);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    let trimmed = if trimmed == "-0" { "0" } else { trimmed };

    if degraded {
        format!("{}*", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Width left for the name column once the fixed columns are laid out
fn name_width(fixed_width: usize) -> Option<usize> {
    get_terminal_width().map(|width| {
        if width > fixed_width + 10 {
            width - fixed_width
        } else {
            20
        }
    })
}

fn fit(name: &str, width: Option<usize>) -> String {
    match width {
        Some(w) => truncate_name(name, w),
        None => name.to_string(),
    }
}

/// Format standings as a ranked table
/// Columns: overall rank, division rank, total, bonus, PBs, DNFs, school
pub fn format_standings_table(standings: &[SchoolStanding], use_colors: bool) -> String {
    if standings.is_empty() {
        return "No standings yet.".to_string();
    }

    // rank 3 + dot, division tag 6, total 8, bonus 7, pb 4, dnf 4, separators
    let width = name_width(4 + 1 + 6 + 2 + 8 + 2 + 7 + 2 + 4 + 2 + 4 + 2);

    standings
        .iter()
        .map(|s| {
            let rank = match s.overall_rank {
                Some(r) => format!("{:>3}.", r),
                None => "  -.".to_string(),
            };
            let division = format!(
                "{}{}",
                &s.division.label()[..1],
                s.division_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
            );
            let total = format!("{:>8}", format_points(s.total_points, false));
            let bonus = format!("{:>7}", format_points(s.bonus_points, false));
            let name = fit(&s.school_name, width);

            if use_colors {
                format!(
                    "{} {:<6}  {}  {}  {:>4}  {:>4}  {}",
                    rank.dimmed(),
                    division.cyan(),
                    total.bold(),
                    bonus.green(),
                    s.pb_count,
                    s.dnf_count.red(),
                    name
                )
            } else {
                format!(
                    "{} {:<6}  {}  {}  {:>4}  {:>4}  {}",
                    rank, division, total, bonus, s.pb_count, s.dnf_count, name
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format standings as tab-separated values for scripting
/// Columns: overall rank, division rank, school id, school, total, best, average, bonus,
/// students, pbs, dnfs (no headers, no colors)
pub fn format_standings_tsv(standings: &[SchoolStanding]) -> String {
    standings
        .iter()
        .map(|s| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                s.overall_rank.unwrap_or(0),
                s.division_rank.unwrap_or(0),
                s.school_id,
                s.school_name,
                format_points(s.total_points, false),
                format_points(s.best_time_points, false),
                format_points(s.average_time_points, false),
                format_points(s.bonus_points, false),
                s.student_count,
                s.pb_count,
                s.dnf_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// An advancement decision with what is needed to show it
pub struct AdvancementRow<'a> {
    pub decision: &'a AdvancementDecision,
    pub name: &'a str,
    pub best_time_ms: Option<u64>,
    pub is_dnf: bool,
}

/// Format advancement decisions in ranking order
/// Columns: place, best, status, name
pub fn format_advancement_table(rows: &[AdvancementRow], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No competitors.".to_string();
    }

    let width = name_width(4 + 1 + 8 + 2 + 11 + 2);

    rows.iter()
        .map(|row| {
            let place = format!("{:>3}.", row.decision.place);
            let time = format!("{:>8}", format_time(row.best_time_ms, row.is_dnf));
            let status = format!("{:<11}", row.decision.status.to_string());
            let name = fit(row.name, width);

            if use_colors {
                let status = match row.decision.status {
                    AdvancementStatus::Eliminated => status.red().to_string(),
                    AdvancementStatus::Advancing => status.green().to_string(),
                    _ => status.yellow().bold().to_string(),
                };
                format!("{} {}  {}  {}", place.dimmed(), time.bold(), status, name)
            } else {
                format!("{} {}  {}  {}", place, time, status, name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A competitor's point calculation with their display name
pub struct PointsRow<'a> {
    pub calculation: &'a PointCalculation,
    pub name: &'a str,
}

/// Format a round's point calculations
/// Columns: best (tier), average (tier), multiplier, bonus flags, total, name
pub fn format_points_table(rows: &[PointsRow], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No competitors scored.".to_string();
    }

    let width = name_width(12 + 2 + 12 + 2 + 5 + 2 + 3 + 2 + 8 + 2);

    rows.iter()
        .map(|row| {
            let c = row.calculation;
            let best = format!(
                "{:>8} ({})",
                format_time(c.best_time_ms, c.best_time_ms.is_none()),
                c.best_tier.tier
            );
            let average = match c.average_time_ms {
                Some(ms) => format!("{:>8} ({})", format_time(Some(ms), false), c.average_tier.tier),
                None => format!("{:>8} ({})", "-", c.average_tier.tier),
            };
            let multiplier = format!("x{:<4}", format_points(c.multiplier, false));
            let flags: String = [
                (c.bonuses.personal_best, 'P'),
                (c.bonuses.clutch, 'C'),
                (c.bonuses.streak, 'S'),
            ]
            .iter()
            .map(|(earned, flag)| if *earned { *flag } else { '.' })
            .collect();
            let total = format!("{:>8}", format_points(c.total(), c.degraded));
            let name = fit(row.name, width);

            if use_colors {
                format!(
                    "{}  {}  {}  {}  {}  {}",
                    best,
                    average,
                    multiplier.dimmed(),
                    flags.green(),
                    total.bold(),
                    name
                )
            } else {
                format!(
                    "{}  {}  {}  {}  {}  {}",
                    best, average, multiplier, flags, total, name
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line summary of a round completion, warnings last
pub fn format_completion_summary(completion: &RoundCompletion, use_colors: bool) -> String {
    let mut lines = vec![
        format!("Round {} completed", completion.round_id),
        format!(
            "  Advancing: {}  Eliminated: {}",
            completion.advancing_count, completion.eliminated_count
        ),
        format!(
            "  Points recorded: {} rows, {} total",
            completion.ledger.recorded.len(),
            format_points(completion.ledger.points(), false)
        ),
    ];
    if !completion.momentum_schools.is_empty() {
        lines.push(format!(
            "  Momentum bonus: {} school(s)",
            completion.momentum_schools.len()
        ));
    }
    if completion.badges_awarded > 0 {
        lines.push(format!("  Badges awarded: {}", completion.badges_awarded));
    }
    for warning in &completion.warnings {
        if use_colors {
            lines.push(format!("  {} {}", "warning:".yellow().bold(), warning));
        } else {
            lines.push(format!("  warning: {}", warning));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BonusFlags, PointBreakdown, Tier, TierOutcome};
    use crate::store::Division;

    fn sample_standing() -> SchoolStanding {
        SchoolStanding {
            competition_id: 1,
            school_id: 4,
            school_name: "Lincoln Elementary".to_string(),
            division: Division::Elementary,
            total_points: 132.5,
            best_time_points: 90.0,
            average_time_points: 36.0,
            bonus_points: 6.5,
            student_count: 2,
            average_points_per_student: 66.25,
            pb_count: 1,
            dnf_count: 3,
            overall_rank: Some(1),
            division_rank: Some(1),
        }
    }

    // format_time tests
    #[test]
    fn test_format_time_seconds() {
        assert_eq!(format_time(Some(9870), false), "9.87");
    }

    #[test]
    fn test_format_time_pads_centis() {
        assert_eq!(format_time(Some(12050), false), "12.05");
    }

    #[test]
    fn test_format_time_truncates() {
        assert_eq!(format_time(Some(9999), false), "9.99");
    }

    #[test]
    fn test_format_time_minutes() {
        assert_eq!(format_time(Some(62350), false), "1:02.35");
    }

    #[test]
    fn test_format_time_dnf() {
        assert_eq!(format_time(Some(9000), true), "DNF");
        assert_eq!(format_time(None, false), "DNF");
    }

    // format_points tests
    #[test]
    fn test_format_points_whole() {
        assert_eq!(format_points(60.0, false), "60");
    }

    #[test]
    fn test_format_points_decimal() {
        assert_eq!(format_points(1.2, false), "1.2");
        assert_eq!(format_points(36.25, false), "36.25");
    }

    #[test]
    fn test_format_points_zero() {
        assert_eq!(format_points(0.0, false), "0");
    }

    #[test]
    fn test_format_points_degraded() {
        assert_eq!(format_points(30.0, true), "30*");
    }

    // truncate_name tests
    #[test]
    fn test_truncate_name_short() {
        assert_eq!(truncate_name("Lincoln", 20), "Lincoln");
    }

    #[test]
    fn test_truncate_name_long() {
        assert_eq!(truncate_name("Roosevelt Middle School", 15), "Roosevelt Mi...");
    }

    #[test]
    fn test_truncate_name_very_narrow() {
        assert_eq!(truncate_name("Roosevelt", 3), "Roo");
    }

    // standings tests
    #[test]
    fn test_format_standings_empty() {
        assert_eq!(format_standings_table(&[], false), "No standings yet.");
    }

    #[test]
    fn test_format_standings_row() {
        let result = format_standings_table(&[sample_standing()], false);
        assert!(result.starts_with("  1."));
        assert!(result.contains("E1"));
        assert!(result.contains("132.5"));
        assert!(result.contains("Lincoln"));
    }

    #[test]
    fn test_format_standings_tsv() {
        let result = format_standings_tsv(&[sample_standing()]);
        assert_eq!(
            result,
            "1\t1\t4\tLincoln Elementary\t132.5\t90\t36\t6.5\t2\t1\t3"
        );
    }

    // advancement tests
    #[test]
    fn test_format_advancement_table() {
        let champion = AdvancementDecision {
            student_id: 1,
            status: AdvancementStatus::Champion,
            place: 1,
        };
        let out = AdvancementDecision {
            student_id: 2,
            status: AdvancementStatus::Eliminated,
            place: 2,
        };
        let rows = vec![
            AdvancementRow {
                decision: &champion,
                name: "Ada Park",
                best_time_ms: Some(8120),
                is_dnf: false,
            },
            AdvancementRow {
                decision: &out,
                name: "Ben Ortiz",
                best_time_ms: None,
                is_dnf: true,
            },
        ];
        let result = format_advancement_table(&rows, false);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("8.12"));
        assert!(lines[0].contains("champion"));
        assert!(lines[1].contains("DNF"));
        assert!(lines[1].contains("eliminated"));
    }

    // points tests
    #[test]
    fn test_format_points_table() {
        let calculation = PointCalculation {
            competition_id: 1,
            event_id: 1,
            round_id: 1,
            student_id: 1,
            school_id: 1,
            grade: "4".to_string(),
            best_time_ms: Some(7000),
            average_time_ms: None,
            best_tier: TierOutcome {
                tier: Tier::S,
                base_points: 50,
                degraded: false,
            },
            average_tier: TierOutcome::fallback(),
            multiplier: 1.2,
            bonuses: BonusFlags {
                personal_best: true,
                ..BonusFlags::default()
            },
            breakdown: PointBreakdown {
                best_points: 60.0,
                pb_bonus: 1.2,
                total: 61.2,
                ..PointBreakdown::default()
            },
            degraded: true,
        };
        let rows = vec![PointsRow {
            calculation: &calculation,
            name: "Ada Park",
        }];
        let result = format_points_table(&rows, false);
        assert!(result.contains("7.00 (S)"));
        assert!(result.contains("x1.2"));
        assert!(result.contains("P.."));
        assert!(result.contains("61.2*"));
    }
}
