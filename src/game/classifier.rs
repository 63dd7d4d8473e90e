use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::GameVariant;

// Tie-break order for overlapping shapes. A colour-wheel or dice payload can
// also carry a numeric `multiplier`, so limbo is tried last and the first
// variant that decodes wins.
pub const CLASSIFICATION_ORDER: [GameVariant; 7] = [
    GameVariant::Mines,
    GameVariant::Plinko,
    GameVariant::Keno,
    GameVariant::ColorWheel,
    GameVariant::CoinFlip,
    GameVariant::Dice,
    GameVariant::Limbo,
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinesCustom {
    pub mines: Vec<f64>,
    pub mine_count: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlinkoCustom {
    pub multislots: Vec<f64>,
    pub multipath: Vec<f64>,
    pub multiplier_list: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KenoCustom {
    pub draw_numbers: Vec<f64>,
    pub number_of_matches: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorWheelCustom {
    pub multiplier: f64,
    pub slot: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoinFace {
    Heads,
    Tails,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinFlipRound {
    pub result: CoinFace,
    #[serde(default)]
    pub target_face: Option<CoinFace>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoinFlipCustom {
    pub rounds: Vec<CoinFlipRound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiceOption {
    Over,
    Under,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceCustom {
    pub option: DiceOption,
    pub target_number: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimboCustom {
    pub multiplier: f64,
    pub winning_chance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CustomPayload {
    Mines(MinesCustom),
    Plinko(PlinkoCustom),
    Keno(KenoCustom),
    ColorWheel(ColorWheelCustom),
    CoinFlip(CoinFlipCustom),
    Dice(DiceCustom),
    Limbo(LimboCustom),
}

impl CustomPayload {
    pub fn variant(&self) -> GameVariant {
        match self {
            Self::Mines(_) => GameVariant::Mines,
            Self::Plinko(_) => GameVariant::Plinko,
            Self::Keno(_) => GameVariant::Keno,
            Self::ColorWheel(_) => GameVariant::ColorWheel,
            Self::CoinFlip(_) => GameVariant::CoinFlip,
            Self::Dice(_) => GameVariant::Dice,
            Self::Limbo(_) => GameVariant::Limbo,
        }
    }
}

pub fn classify(custom: &Value) -> Option<CustomPayload> {
    CLASSIFICATION_ORDER
        .iter()
        .find_map(|variant| decode_variant(*variant, custom))
}

#[cfg(test)]
pub fn matches(variant: GameVariant, custom: &Value) -> bool {
    decode_variant(variant, custom).is_some()
}

fn decode_variant(variant: GameVariant, custom: &Value) -> Option<CustomPayload> {
    match variant {
        GameVariant::Mines => decode(custom).map(CustomPayload::Mines),
        GameVariant::Plinko => decode(custom).map(CustomPayload::Plinko),
        GameVariant::Keno => decode(custom).map(CustomPayload::Keno),
        GameVariant::ColorWheel => decode(custom).map(CustomPayload::ColorWheel),
        GameVariant::CoinFlip => {
            // serde would also accept a round written as a bare array, and
            // reads an explicit `targetFace: null` as absent
            let rounds_are_well_formed = custom
                .get("rounds")
                .and_then(Value::as_array)
                .map_or(false, |rounds| rounds.iter().all(is_coin_flip_round));
            if !rounds_are_well_formed {
                return None;
            }
            decode(custom).map(CustomPayload::CoinFlip)
        }
        GameVariant::Dice => decode(custom).map(CustomPayload::Dice),
        GameVariant::Limbo => decode(custom).map(CustomPayload::Limbo),
        GameVariant::Unknown => None,
    }
}

fn is_coin_flip_round(round: &Value) -> bool {
    round.is_object() && round.get("targetFace").map_or(true, Value::is_string)
}

fn decode<T: DeserializeOwned>(custom: &Value) -> Option<T> {
    // Structs also deserialize from sequences; only objects are payloads.
    if !custom.is_object() {
        return None;
    }
    T::deserialize(custom).ok()
}
