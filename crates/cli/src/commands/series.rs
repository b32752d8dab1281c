use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use attackgen_core::results::{load_results, ResultSeriesExtractor};
use clap::ValueEnum;

/// Which plot-ready series to extract from a results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeriesKind {
    /// Per-guess correlation at each trace checkpoint.
    Corr,
    /// Mean partial guessing entropy per trace count.
    Pge,
    /// Correct-key output over time with the wrong-guess envelopes.
    Envelope,
}

/// Extract one series for `subkey` from the results file at `results`.
pub fn series_command(results: &str, subkey: usize, kind: SeriesKind, json: bool) -> Result<()> {
    let loaded = load_results(Path::new(results))?;
    let extractor = ResultSeriesExtractor::new(Some(Arc::new(loaded)));

    match kind {
        SeriesKind::Corr => {
            let series = extractor.corr_vs_trace(subkey)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }
            println!("Correlation vs traces (subkey {}):", subkey);
            println!("  Traces: {}", join(&series.traces));
            for (guess, row) in series.values.iter().enumerate() {
                println!("  Guess {:3}: {}", guess, join(row));
            }
        }
        SeriesKind::Pge => {
            let series = extractor.pge_vs_trace(subkey)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }
            println!("PGE vs traces (subkey {}):", subkey);
            if series.traces.is_empty() {
                println!("  (none)");
            }
            for (trace, pge) in series.traces.iter().zip(&series.pge) {
                println!("  {:>8}: {}", trace, pge);
            }
        }
        SeriesKind::Envelope => {
            let series = extractor.output_vs_time(subkey)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }
            println!("Output vs time (subkey {}):", subkey);
            println!("  Correct: {}", join(&series.correct));
            match &series.below {
                Some(below) => println!("  Below:   {}", join(below)),
                None => println!("  Below:   (no guesses)"),
            }
            match &series.above {
                Some(above) => println!("  Above:   {}", join(above)),
                None => println!("  Above:   (no guesses)"),
            }
        }
    }

    Ok(())
}

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
