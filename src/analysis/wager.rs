use serde::{Deserialize, Serialize};

use crate::game::NormalizedResult;

/// Payout factor left after the house edge.
pub const EDGE: f64 = 0.989898;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WagerView {
    pub target_multiplier: Option<f64>,
    pub bet_amount: f64,
    pub profit: f64,
}

pub fn target_multiplier(winning_chance: f64) -> Option<f64> {
    if winning_chance > 0.0 {
        Some(EDGE / winning_chance * 100.0)
    } else {
        None
    }
}

pub fn derive(result: &NormalizedResult) -> WagerView {
    let target = result.winning_chance.and_then(target_multiplier);
    let bet_amount = match target {
        Some(target) if result.amount != 0.0 && (target - 1.0).abs() > f64::EPSILON => {
            result.amount / (target - 1.0)
        }
        _ => 0.0,
    };
    WagerView {
        target_multiplier: target,
        bet_amount,
        profit: result.amount,
    }
}
