use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::types::*;
use crate::badges::{Badge, BadgeAward};
use crate::ledger::PointTransaction;
use crate::scoring::TierThreshold;
use crate::standings::SchoolStanding;

const SNAPSHOT_VERSION: u32 = 1;

/// Every table of the record store, as written to disk by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    #[serde(default)]
    pub competitions: Vec<Competition>,
    #[serde(default)]
    pub schools: Vec<School>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub competition_schools: Vec<CompetitionSchool>,
    #[serde(default)]
    pub events: Vec<CompetitionEvent>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(default)]
    pub results: Vec<RoundResult>,
    #[serde(default)]
    pub tier_thresholds: Vec<TierThreshold>,
    #[serde(default)]
    pub grade_multipliers: Vec<GradeMultiplier>,
    #[serde(default)]
    pub transactions: Vec<PointTransaction>,
    #[serde(default)]
    pub standings: Vec<SchoolStanding>,
    #[serde(default)]
    pub advancements: Vec<AdvancementRecord>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub badge_awards: Vec<BadgeAward>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            competitions: Vec::new(),
            schools: Vec::new(),
            students: Vec::new(),
            competition_schools: Vec::new(),
            events: Vec::new(),
            rounds: Vec::new(),
            attempts: Vec::new(),
            results: Vec::new(),
            tier_thresholds: Vec::new(),
            grade_multipliers: Vec::new(),
            transactions: Vec::new(),
            standings: Vec::new(),
            advancements: Vec::new(),
            badges: Vec::new(),
            badge_awards: Vec::new(),
        }
    }
}

/// Default store file path (~/.config/podium/store.json)
pub fn get_store_path() -> PathBuf {
    crate::config::get_config_dir().join("store.json")
}

/// Load a store snapshot from a JSON file.
///
/// A missing file yields an empty snapshot. An unsupported version is an error.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    if !path.exists() {
        return Ok(StoreSnapshot::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open store file at {}", path.display()))?;

    let snapshot: StoreSnapshot =
        serde_json::from_reader(file).context("Failed to load store snapshot")?;

    if snapshot.version != SNAPSHOT_VERSION {
        anyhow::bail!("Unsupported store snapshot version: {}", snapshot.version);
    }

    Ok(snapshot)
}

/// Save a store snapshot atomically; the file is never left half-written.
pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, snapshot)
        .context("Failed to serialize store snapshot")?;

    file.commit().context("Failed to save store snapshot")?;

    Ok(())
}
