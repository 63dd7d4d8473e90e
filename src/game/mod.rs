pub mod classifier;
pub mod normalizer;

pub use classifier::{classify, CustomPayload, CLASSIFICATION_ORDER};
pub use normalizer::ResultNormalizer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WatchfulError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    Dice,
    Limbo,
    Mines,
    Plinko,
    Keno,
    ColorWheel,
    CoinFlip,
    Unknown,
}

impl GameVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dice => "dice",
            Self::Limbo => "limbo",
            Self::Mines => "mines",
            Self::Plinko => "plinko",
            Self::Keno => "keno",
            Self::ColorWheel => "colorwheel",
            Self::CoinFlip => "coinflip",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameVariant {
    type Err = WatchfulError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dice" => Ok(Self::Dice),
            "limbo" => Ok(Self::Limbo),
            "mines" => Ok(Self::Mines),
            "plinko" => Ok(Self::Plinko),
            "keno" => Ok(Self::Keno),
            "colorwheel" => Ok(Self::ColorWheel),
            "coinflip" => Ok(Self::CoinFlip),
            "unknown" => Ok(Self::Unknown),
            other => Err(WatchfulError::config_error(format!("unknown game variant: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn is_win(&self) -> bool {
        matches!(self, Self::Win)
    }
}

impl From<bool> for Outcome {
    fn from(win: bool) -> Self {
        if win { Self::Win } else { Self::Loss }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    // Capture time in unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_id: Option<i64>,
    pub outcome: Outcome,
    pub amount: f64,
    pub game_type: GameVariant,
    pub multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_chance: Option<f64>,
    pub source_url: String,
}

impl NormalizedResult {
    pub fn is_win(&self) -> bool {
        self.outcome.is_win()
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp <= 0 {
            return Err(WatchfulError::validation_error(format!(
                "timestamp must be positive, got {}",
                self.timestamp
            )));
        }
        if !self.amount.is_finite() {
            return Err(WatchfulError::validation_error("amount is not a finite number"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(WatchfulError::validation_error(format!(
                "multiplier must be a non-negative number, got {}",
                self.multiplier
            )));
        }
        if let Some(chance) = self.winning_chance {
            if !(chance > 0.0 && chance <= 100.0) {
                return Err(WatchfulError::validation_error(format!(
                    "winning chance {} outside (0, 100]",
                    chance
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_result(timestamp: i64, outcome: Outcome) -> NormalizedResult {
        NormalizedResult {
            timestamp,
            round_id: Some(timestamp),
            outcome,
            amount: if outcome.is_win() { 1.0 } else { -1.0 },
            game_type: GameVariant::Dice,
            multiplier: 0.0,
            winning_chance: None,
            source_url: "https://bet88.ph/en/originals/dice".to_string(),
        }
    }

    #[test]
    fn test_variant_names_round_trip_through_from_str() {
        for variant in [
            GameVariant::Dice,
            GameVariant::Limbo,
            GameVariant::Mines,
            GameVariant::Plinko,
            GameVariant::Keno,
            GameVariant::ColorWheel,
            GameVariant::CoinFlip,
            GameVariant::Unknown,
        ] {
            assert_eq!(variant.as_str().parse::<GameVariant>().unwrap(), variant);
        }
        assert!("roulette".parse::<GameVariant>().is_err());
    }

    #[test]
    fn test_result_serializes_with_camel_case_keys() {
        let mut result = sample_result(1_753_560_795_525, Outcome::Win);
        result.game_type = GameVariant::ColorWheel;
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"], "win");
        assert_eq!(value["gameType"], "colorwheel");
        assert_eq!(value["roundId"], 1_753_560_795_525i64);
        assert_eq!(value["sourceUrl"], "https://bet88.ph/en/originals/dice");
        assert!(value.get("winningChance").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let good = sample_result(10, Outcome::Loss);
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.timestamp = 0;
        assert!(matches!(bad.validate(), Err(WatchfulError::Validation(_))));

        let mut bad = good.clone();
        bad.amount = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.multiplier = -2.0;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.winning_chance = Some(0.0);
        assert!(bad.validate().is_err());
    }
}
