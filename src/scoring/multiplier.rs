use crate::store::ScoringStore;

/// Scoring weight resolved for a grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierOutcome {
    pub multiplier: f64,
    /// No configured row (or the lookup failed) and the default was used
    pub degraded: bool,
}

/// Look up the grade multiplier, falling back to `default` when the grade has
/// no row or the store read fails. Neither case is fatal.
pub async fn grade_multiplier(
    store: &dyn ScoringStore,
    grade: &str,
    default: f64,
) -> MultiplierOutcome {
    match store.grade_multiplier(grade).await {
        Ok(Some(row)) => MultiplierOutcome {
            multiplier: row.multiplier,
            degraded: false,
        },
        Ok(None) => {
            tracing::warn!(grade, default, "no grade multiplier configured, using default");
            MultiplierOutcome {
                multiplier: default,
                degraded: true,
            }
        }
        Err(e) => {
            tracing::warn!(grade, error = %e, "grade multiplier lookup failed, using default");
            MultiplierOutcome {
                multiplier: default,
                degraded: true,
            }
        }
    }
}
