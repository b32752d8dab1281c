//! Attack results and plot-ready series extracted from them.
//!
//! `AttackResults` mirrors what an attack run leaves behind: per-subkey
//! snapshots of the best guesses at trace checkpoints, per-subkey
//! guess-by-time correlation matrices, the known key (when attacking a
//! device with a known key), and partial guessing entropy records.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

mod series;

pub use series::*;

/// One ranked guess within a snapshot: guess index, statistic, value.
///
/// Serialized as a `[guess, stat, value]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(usize, f64, f64)", into = "(usize, f64, f64)")]
pub struct MaxEntry {
    pub guess: usize,
    pub stat: f64,
    pub value: f64,
}

impl From<(usize, f64, f64)> for MaxEntry {
    fn from((guess, stat, value): (usize, f64, f64)) -> Self {
        Self { guess, stat, value }
    }
}

impl From<MaxEntry> for (usize, f64, f64) {
    fn from(entry: MaxEntry) -> Self {
        (entry.guess, entry.stat, entry.value)
    }
}

/// Ranked guesses for one subkey after `trace` traces were processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxesSnapshot {
    pub trace: usize,
    pub maxes: Vec<MaxEntry>,
}

/// Partial guessing entropy of one subkey at one trace count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PgeRecord {
    pub trace: usize,
    pub subkey: usize,
    pub pge: f64,
}

/// Results container produced by an attack run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackResults {
    pub num_subkeys: usize,
    /// Per subkey: snapshots in checkpoint order.
    #[serde(default)]
    pub maxes_list: Vec<Vec<MaxesSnapshot>>,
    /// Per subkey: matrix indexed `[guess][time offset]`.
    #[serde(default)]
    pub diffs: Vec<Vec<Vec<f64>>>,
    /// Per subkey: the correct guess, when known.
    #[serde(default)]
    pub known_key: Vec<Option<usize>>,
    #[serde(default)]
    pub pge_total: Vec<PgeRecord>,
}

/// Load an attack results file (JSON).
pub fn load_results(path: &Path) -> Result<AttackResults> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file at {}", path.display()))?;
    let results: AttackResults =
        serde_json::from_str(&body).context("Failed to parse results JSON")?;
    Ok(results)
}
