use serde::{Deserialize, Serialize};

use crate::game::NormalizedResult;
use crate::store::{win_rate, AggregateSnapshot};

pub const WINDOW_SIZES: [usize; 4] = [5, 10, 15, 20];

/// Gap, in percentage points, beyond which a window counts as drifting.
pub const DEVIATION_THRESHOLD: f64 = 3.33;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats<'a> {
    pub entries: &'a [NormalizedResult],
    pub win_rate: f64,
}

impl WindowStats<'_> {
    pub fn wins(&self) -> usize {
        self.entries.iter().filter(|r| r.is_win()).count()
    }
}

/// Win rate over the last `window_size` results. Short logs use everything
/// available; the rate is never padded.
pub fn window_stats(results: &[NormalizedResult], window_size: usize) -> WindowStats<'_> {
    let start = results.len().saturating_sub(window_size);
    let entries = &results[start..];
    let wins = entries.iter().filter(|r| r.is_win()).count() as u64;
    WindowStats {
        entries,
        win_rate: win_rate(wins, entries.len() as u64),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    Steady,
    Drifting,
}

/// Compares how far a window sits from the reference chance against how far
/// the long-run rate sits from it.
pub fn deviation(window_rate: f64, long_run_rate: f64, chance: f64) -> Deviation {
    if (window_rate - chance).abs() - (long_run_rate - chance).abs() < DEVIATION_THRESHOLD {
        Deviation::Steady
    } else {
        Deviation::Drifting
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowReport {
    pub window_size: usize,
    pub filled: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub deviation: Deviation,
}

pub fn reference_chance(snapshot: &AggregateSnapshot, explicit: Option<f64>) -> f64 {
    explicit
        .or_else(|| snapshot.latest().and_then(|r| r.winning_chance))
        .unwrap_or(0.0)
}

pub fn window_reports(snapshot: &AggregateSnapshot, chance: f64) -> Vec<WindowReport> {
    WINDOW_SIZES
        .iter()
        .map(|&size| {
            let stats = window_stats(&snapshot.results, size);
            WindowReport {
                window_size: size,
                filled: stats.entries.len(),
                wins: stats.wins(),
                win_rate: stats.win_rate,
                deviation: deviation(stats.win_rate, snapshot.win_rate, chance),
            }
        })
        .collect()
}
