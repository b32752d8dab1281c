use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::results::AttackResults;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("No attack results are bound")]
    NoResults,
    #[error("Subkey {subkey} out of range; results hold {num_subkeys} subkeys")]
    SubkeyOutOfRange { subkey: usize, num_subkeys: usize },
    #[error("No known key recorded for subkey {0}")]
    MissingKnownKey(usize),
    #[error("Malformed results: {0}")]
    MalformedResults(String),
}

/// Correlation of every guess at each trace checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSeries {
    pub traces: Vec<usize>,
    /// Indexed `[guess][checkpoint]`.
    pub values: Vec<Vec<f64>>,
}

/// Mean partial guessing entropy per trace count, in first-seen trace order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PgeSeries {
    pub traces: Vec<usize>,
    pub pge: Vec<f64>,
}

/// Correct-key output over time against the strongest wrong guesses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeSeries {
    pub offsets: Vec<usize>,
    pub correct: Vec<f64>,
    /// Envelope of guesses below the correct key; `None` when there are none.
    pub below: Option<Vec<f64>>,
    /// Envelope of guesses above the correct key; `None` when there are none.
    pub above: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PgeAccumulator {
    sum: f64,
    trials: u32,
}

/// Read-only views over the currently bound results.
#[derive(Debug, Clone, Default)]
pub struct ResultSeriesExtractor {
    results: Option<Arc<AttackResults>>,
}

impl ResultSeriesExtractor {
    pub fn new(results: Option<Arc<AttackResults>>) -> Self {
        Self { results }
    }

    /// Swap in a new results container (or unbind with `None`).
    pub fn set_results(&mut self, results: Option<Arc<AttackResults>>) {
        self.results = results;
    }

    pub fn results(&self) -> Option<&AttackResults> {
        self.results.as_deref()
    }

    /// Per-guess correlation at each trace checkpoint of `subkey`.
    ///
    /// Row count follows the number of guesses in `diffs[subkey]`; each
    /// snapshot must rank at least that many guesses.
    pub fn corr_vs_trace(&self, subkey: usize) -> Result<CorrelationSeries, SeriesError> {
        let results = self.bound(subkey)?;
        let snapshots = results.maxes_list.get(subkey).map(Vec::as_slice).unwrap_or(&[]);
        let guesses = results
            .diffs
            .get(subkey)
            .ok_or_else(|| malformed(format!("no correlation matrix for subkey {subkey}")))?
            .len();

        let traces: Vec<usize> = snapshots.iter().map(|s| s.trace).collect();
        let mut values = vec![vec![0.0; snapshots.len()]; guesses];
        for (checkpoint, snapshot) in snapshots.iter().enumerate() {
            if snapshot.maxes.len() < guesses {
                return Err(malformed(format!(
                    "snapshot at trace {} ranks {} guesses, expected {}",
                    snapshot.trace,
                    snapshot.maxes.len(),
                    guesses
                )));
            }
            for entry in &snapshot.maxes[..guesses] {
                let row = values.get_mut(entry.guess).ok_or_else(|| {
                    malformed(format!("guess {} outside {} guesses", entry.guess, guesses))
                })?;
                row[checkpoint] = entry.value;
            }
        }

        Ok(CorrelationSeries { traces, values })
    }

    /// Mean PGE of `subkey` per trace count.
    ///
    /// Records are grouped by trace in the order traces first appear; traces
    /// where `subkey` has no record are left out.
    pub fn pge_vs_trace(&self, subkey: usize) -> Result<PgeSeries, SeriesError> {
        let results = self.bound(subkey)?;

        let mut order: Vec<(usize, Vec<PgeAccumulator>)> = Vec::new();
        let mut index_of: HashMap<usize, usize> = HashMap::new();
        for record in &results.pge_total {
            if record.subkey >= results.num_subkeys {
                return Err(malformed(format!(
                    "pge record for subkey {} but only {} subkeys",
                    record.subkey, results.num_subkeys
                )));
            }
            let idx = *index_of.entry(record.trace).or_insert_with(|| {
                order.push((record.trace, vec![PgeAccumulator::default(); results.num_subkeys]));
                order.len() - 1
            });
            let cell = &mut order[idx].1[record.subkey];
            cell.sum += record.pge;
            cell.trials += 1;
        }

        let mut series = PgeSeries { traces: Vec::new(), pge: Vec::new() };
        for (trace, cells) in &order {
            let cell = cells[subkey];
            if cell.trials > 0 {
                series.traces.push(*trace);
                series.pge.push(cell.sum / f64::from(cell.trials));
            }
        }
        Ok(series)
    }

    /// Correct-key row of `subkey` over time, with the max-magnitude envelope
    /// of the guesses strictly below and strictly above the known key.
    pub fn output_vs_time(&self, subkey: usize) -> Result<EnvelopeSeries, SeriesError> {
        let results = self.bound(subkey)?;
        let key = results
            .known_key
            .get(subkey)
            .copied()
            .flatten()
            .ok_or(SeriesError::MissingKnownKey(subkey))?;
        let data = results
            .diffs
            .get(subkey)
            .ok_or_else(|| malformed(format!("no correlation matrix for subkey {subkey}")))?;

        let width = data.first().map(Vec::len).unwrap_or(0);
        if data.iter().any(|row| row.len() != width) {
            return Err(malformed(format!("ragged correlation matrix for subkey {subkey}")));
        }
        let correct = data.get(key).ok_or_else(|| {
            malformed(format!("known key {key} outside {} guesses", data.len()))
        })?;

        Ok(EnvelopeSeries {
            offsets: (0..width).collect(),
            correct: correct.clone(),
            below: envelope(&data[..key], width),
            above: envelope(&data[key + 1..], width),
        })
    }

    fn bound(&self, subkey: usize) -> Result<&AttackResults, SeriesError> {
        let results = self.results.as_deref().ok_or(SeriesError::NoResults)?;
        if subkey >= results.num_subkeys {
            return Err(SeriesError::SubkeyOutOfRange {
                subkey,
                num_subkeys: results.num_subkeys,
            });
        }
        Ok(results)
    }
}

/// Per offset, whichever of the column max and min has the larger magnitude.
/// On equal magnitude the min is taken. A NaN anywhere in a column makes
/// that offset NaN.
fn envelope(rows: &[Vec<f64>], width: usize) -> Option<Vec<f64>> {
    if rows.is_empty() {
        return None;
    }
    let picked = (0..width)
        .map(|t| {
            let column = move || rows.iter().map(move |r| r[t]);
            if column().any(f64::is_nan) {
                return f64::NAN;
            }
            let max = column().fold(f64::NEG_INFINITY, f64::max);
            let min = column().fold(f64::INFINITY, f64::min);
            if max.abs() > min.abs() {
                max
            } else {
                min
            }
        })
        .collect();
    Some(picked)
}

fn malformed(reason: String) -> SeriesError {
    SeriesError::MalformedResults(reason)
}
