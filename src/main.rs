use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use podium::advancement::advance_round;
use podium::output::{self, AdvancementRow, PointsRow};
use podium::scoring::TierThreshold;
use podium::store::{
    get_store_path, load_snapshot, save_snapshot, InMemoryStore, RoundId, ScoringStore, StudentId,
};
use podium::EngineError;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_STORE: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_STRUCTURAL: i32 = 5;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decide advancement, score the round and refresh standings
    CompleteRound {
        round_id: RoundId,
    },
    /// Show what each competitor would score in a round (nothing is written)
    Points {
        round_id: RoundId,
    },
    /// Show who would advance from a round (nothing is written)
    Advance {
        round_id: RoundId,
    },
    /// Show school standings for a competition
    Standings {
        competition_id: i64,
        /// Recompute from the ledger before showing
        #[arg(long)]
        refresh: bool,
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
    /// Replace a round's ledger rows after a correction
    Recalculate {
        round_id: RoundId,
    },
    /// Rebuild a round's best/average results from its attempts
    Results {
        round_id: RoundId,
    },
    /// Check scoring config and tier thresholds
    Validate,
}

#[derive(Parser, Debug)]
#[command(name = "podium")]
#[command(about = "Scoring, advancement and school standings for youth cubing competitions", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/podium/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the store snapshot (defaults to ~/.config/podium/store.json)
    #[arg(short, long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn exit_code(error: &EngineError) -> i32 {
    match error {
        EngineError::Store(_) => EXIT_STORE,
        _ => EXIT_STRUCTURAL,
    }
}

fn fail(error: EngineError) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(exit_code(&error));
}

/// Threshold problems are fatal only when validating; scoring degrades to tier D.
fn threshold_warnings(
    thresholds: &[TierThreshold],
    validating: bool,
) -> Result<Vec<String>, Vec<String>> {
    match podium::scoring::validate_thresholds(thresholds) {
        Ok(()) => Ok(Vec::new()),
        Err(errors) if validating => Err(errors),
        Err(errors) => Ok(errors),
    }
}

async fn student_name(store: &dyn ScoringStore, student_id: StudentId) -> String {
    match store.student(student_id).await {
        Ok(Some(student)) => student.display_name(),
        _ => format!("#{}", student_id),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let start_time = Instant::now();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match podium::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate scoring config at startup
    let scoring = config.scoring();
    if let Err(errors) = podium::scoring::validate_scoring(&scoring) {
        eprintln!("Scoring config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    // Load the store snapshot
    let store_path = cli
        .store
        .map(PathBuf::from)
        .or_else(|| config.store.clone())
        .unwrap_or_else(get_store_path);
    let snapshot = match load_snapshot(&store_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Store error: {:#}", e);
            std::process::exit(EXIT_STORE);
        }
    };
    tracing::debug!(path = %store_path.display(), "store loaded");

    let validating = matches!(cli.command, Commands::Validate);
    match threshold_warnings(&snapshot.tier_thresholds, validating) {
        Ok(warnings) => {
            for warning in warnings {
                eprintln!("Warning: {} (affected times score as tier D)", warning);
            }
        }
        Err(errors) => {
            eprintln!("Tier threshold errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            std::process::exit(EXIT_CONFIG);
        }
    }

    if let Err(errors) = podium::scoring::validate_cutoffs(&snapshot.rounds) {
        eprintln!("Round cutoff errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let store = InMemoryStore::from_snapshot(snapshot);
    let use_colors = output::should_use_colors();

    // Route based on subcommand
    let writes = match cli.command {
        Commands::CompleteRound { round_id } => {
            let completion = podium::pipeline::complete_round(&store, &scoring, round_id)
                .await
                .unwrap_or_else(|e| fail(e));
            println!("{}", output::format_completion_summary(&completion, use_colors));
            true
        }
        Commands::Points { round_id } => {
            let calculations =
                podium::scoring::calculate_points_for_round(&store, &scoring, round_id)
                    .await
                    .unwrap_or_else(|e| fail(e));
            let mut names = Vec::with_capacity(calculations.len());
            for calculation in &calculations {
                names.push(student_name(&store, calculation.student_id).await);
            }
            let rows: Vec<PointsRow> = calculations
                .iter()
                .zip(&names)
                .map(|(calculation, name)| PointsRow { calculation, name })
                .collect();
            println!("{}", output::format_points_table(&rows, use_colors));
            false
        }
        Commands::Advance { round_id } => {
            let advancement = advance_round(&store, round_id)
                .await
                .unwrap_or_else(|e| fail(e));
            let results = store
                .round_results(round_id)
                .await
                .unwrap_or_else(|e| fail(e.into()));
            let mut rows_data = Vec::with_capacity(advancement.decisions.len());
            for decision in &advancement.decisions {
                let result = results.iter().find(|r| r.student_id == decision.student_id);
                rows_data.push((
                    decision,
                    student_name(&store, decision.student_id).await,
                    result.and_then(|r| r.best_time_ms),
                    result.map(|r| r.is_dnf || r.is_dns).unwrap_or(true),
                ));
            }
            let rows: Vec<AdvancementRow> = rows_data
                .iter()
                .map(|(decision, name, best, is_dnf)| AdvancementRow {
                    decision,
                    name,
                    best_time_ms: *best,
                    is_dnf: *is_dnf,
                })
                .collect();
            println!(
                "{} ({} advancing, {} eliminated)",
                advancement.round.cutoff.describe(),
                advancement.outcome.advancing_count,
                advancement.outcome.eliminated_count
            );
            println!("{}", output::format_advancement_table(&rows, use_colors));
            false
        }
        Commands::Standings {
            competition_id,
            refresh,
            tsv,
        } => {
            let standings = if refresh {
                let report = podium::standings::update_all_school_standings_for_competition(
                    &store,
                    competition_id,
                )
                .await
                .unwrap_or_else(|e| fail(e));
                if !report.success() {
                    eprintln!("Warning: {} school(s) failed to update", report.failed);
                }
                report.standings
            } else {
                let mut standings = store
                    .school_standings(competition_id)
                    .await
                    .unwrap_or_else(|e| fail(e.into()));
                standings.sort_by(podium::standings::standing_order);
                standings
            };
            if tsv {
                println!("{}", output::format_standings_tsv(&standings));
            } else {
                println!("{}", output::format_standings_table(&standings, use_colors));
            }
            refresh
        }
        Commands::Recalculate { round_id } => {
            let recalculation = podium::pipeline::recalculate_round(&store, &scoring, round_id)
                .await
                .unwrap_or_else(|e| fail(e));
            println!(
                "Round {}: replaced {} ledger rows with {} ({} points)",
                round_id,
                recalculation.removed,
                recalculation.scoring.ledger.recorded.len(),
                output::format_points(recalculation.scoring.ledger.points(), false)
            );
            for warning in &recalculation.warnings {
                eprintln!("Warning: {}", warning);
            }
            true
        }
        Commands::Results { round_id } => {
            let report = podium::results::recompute_round_results(&store, round_id)
                .await
                .unwrap_or_else(|e| fail(e));
            for result in &report.results {
                let name = student_name(&store, result.student_id).await;
                let status = if result.is_dns { "DNS" } else { "" };
                println!(
                    "{:>8}  {:>8}  {:<3}  {}",
                    output::format_time(result.best_time_ms, result.is_dnf),
                    result
                        .average_time_ms
                        .map(|ms| output::format_time(Some(ms), false))
                        .unwrap_or_else(|| "-".to_string()),
                    status,
                    name
                );
            }
            if report.failed > 0 {
                eprintln!("Warning: {} result(s) failed to save", report.failed);
            }
            true
        }
        Commands::Validate => {
            println!("Configuration is valid.");
            false
        }
    };

    if writes {
        let snapshot = match store.snapshot() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Store error: {}", e);
                std::process::exit(EXIT_STORE);
            }
        };
        if let Err(e) = save_snapshot(&store_path, &snapshot) {
            eprintln!("Store error: {:#}", e);
            std::process::exit(EXIT_STORE);
        }
    }

    if cli.verbose {
        eprintln!("Done in {:?}", start_time.elapsed());
    }

    std::process::exit(EXIT_SUCCESS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium::scoring::Tier;

    fn no_d_tier() -> Vec<TierThreshold> {
        vec![TierThreshold {
            event_type_id: 1,
            tier: Tier::S,
            min_time_ms: Some(0),
            max_time_ms: Some(8000),
            base_points: 50,
            sort_order: 1,
        }]
    }

    #[test]
    fn test_threshold_gaps_warn_when_scoring() {
        let warnings = threshold_warnings(&no_d_tier(), false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing D tier"));
    }

    #[test]
    fn test_threshold_gaps_fail_validation() {
        assert!(threshold_warnings(&no_d_tier(), true).is_err());
        assert!(threshold_warnings(&[], true).unwrap().is_empty());
    }
}
