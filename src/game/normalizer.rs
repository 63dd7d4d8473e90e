use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use super::classifier::classify;
use super::{GameVariant, NormalizedResult, Outcome};
use crate::error::{Result, WatchfulError};

#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    fallback: GameVariant,
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::new(GameVariant::Dice)
    }
}

impl ResultNormalizer {
    pub fn new(fallback: GameVariant) -> Self {
        Self { fallback }
    }

    pub fn normalize(&self, payload: &Value, page_url: &str) -> Option<NormalizedResult> {
        match self.try_normalize(payload, page_url) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("Payload not normalized: {}", e);
                None
            }
        }
    }

    pub fn try_normalize(&self, payload: &Value, page_url: &str) -> Result<NormalizedResult> {
        self.normalize_at(payload, page_url, Utc::now().timestamp_millis())
    }

    fn normalize_at(&self, payload: &Value, page_url: &str, timestamp: i64) -> Result<NormalizedResult> {
        let fields = payload
            .as_object()
            .ok_or_else(|| WatchfulError::malformed_payload("payload is not an object"))?;

        let round_id = fields
            .get("roundId")
            .and_then(round_id_from)
            .ok_or_else(|| WatchfulError::malformed_payload("missing, zero or non-integer roundId"))?;

        let outcome = fields
            .get("win")
            .and_then(Value::as_bool)
            .map(Outcome::from)
            .ok_or_else(|| WatchfulError::malformed_payload("win is not a boolean"))?;

        let custom = fields
            .get("custom")
            .filter(|custom| custom.is_object())
            .ok_or_else(|| WatchfulError::malformed_payload("custom is missing or not an object"))?;

        let mut amount = coerce_amount(fields.get("profit"));
        if !amount.is_finite() {
            warn!("Round {} has non-numeric profit {:?}, recording 0", round_id, fields.get("profit"));
            amount = 0.0;
        }

        let game_type = match classify(custom) {
            Some(payload) => payload.variant(),
            None => {
                debug!("No classifier matched round {}, falling back to {}", round_id, self.fallback);
                self.fallback
            }
        };

        let multiplier = custom
            .get("multiplier")
            .and_then(Value::as_f64)
            .filter(|m| m.is_finite() && *m >= 0.0)
            .unwrap_or(0.0);

        let winning_chance = custom
            .get("winningChance")
            .and_then(Value::as_f64)
            .filter(|c| *c > 0.0 && *c <= 100.0);

        Ok(NormalizedResult {
            timestamp,
            round_id: Some(round_id),
            outcome,
            amount,
            game_type,
            multiplier,
            winning_chance,
            source_url: page_url.to_string(),
        })
    }
}

// Round ids start at 1; a zero id is treated as missing.
fn round_id_from(value: &Value) -> Option<i64> {
    let id = match value.as_i64() {
        Some(id) => Some(id),
        None => value
            .as_f64()
            .filter(|id| id.fract() == 0.0 && id.abs() < i64::MAX as f64)
            .map(|id| id as i64),
    };
    id.filter(|id| *id != 0)
}

// Numeric coercion with the site's loose typing: numbers pass through,
// strings are parsed after trimming (empty means zero), booleans and null
// map to 1/0. Anything else is `NaN`.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => {
            if *b { 1.0 } else { 0.0 }
        }
        Some(Value::Null) => 0.0,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = "https://bet88.ph/en/originals/limbo";

    fn normalizer() -> ResultNormalizer {
        ResultNormalizer::default()
    }

    #[test]
    fn test_limbo_win_scenario() {
        let payload = json!({
            "roundId": 7,
            "win": true,
            "profit": "2.13",
            "custom": {"multiplier": 2.0, "winningChance": 49.5}
        });
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.outcome, Outcome::Win);
        assert_eq!(result.amount, 2.13);
        assert_eq!(result.game_type, GameVariant::Limbo);
        assert_eq!(result.multiplier, 2.0);
        assert_eq!(result.winning_chance, Some(49.5));
        assert_eq!(result.round_id, Some(7));
        assert_eq!(result.source_url, PAGE);
        assert!(result.timestamp > 0);
    }

    #[test]
    fn test_dice_loss_scenario() {
        let payload = json!({
            "roundId": 8,
            "win": false,
            "profit": "-1.5",
            "custom": {"option": "OVER", "targetNumber": 50}
        });
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.outcome, Outcome::Loss);
        assert_eq!(result.amount, -1.5);
        assert_eq!(result.game_type, GameVariant::Dice);
        assert_eq!(result.multiplier, 0.0);
        assert_eq!(result.winning_chance, None);
    }

    #[test]
    fn test_missing_round_id_or_non_boolean_win_is_rejected() {
        let custom = json!({"multiplier": 2.0, "winningChance": 49.5});
        let payloads = [
            json!({"win": true, "profit": "1", "custom": custom}),
            json!({"roundId": null, "win": true, "profit": "1", "custom": custom}),
            json!({"roundId": "7", "win": true, "profit": "1", "custom": custom}),
            json!({"roundId": 7, "profit": "1", "custom": custom}),
            json!({"roundId": 7, "win": "true", "profit": "1", "custom": custom}),
            json!({"roundId": 7, "win": 1, "profit": "1", "custom": custom}),
            json!([1, 2, 3]),
            json!("roundId"),
        ];
        for payload in payloads {
            assert!(normalizer().normalize(&payload, PAGE).is_none(), "payload: {}", payload);
        }

        let err = normalizer()
            .try_normalize(&json!({"win": true, "custom": {}}), PAGE)
            .unwrap_err();
        assert!(matches!(err, WatchfulError::MalformedPayload(_)));
    }

    #[test]
    fn test_win_flag_maps_directly_to_outcome() {
        for win in [true, false] {
            let payload = json!({"roundId": 1, "win": win, "profit": 0, "custom": {}});
            let result = normalizer().normalize(&payload, PAGE).unwrap();
            assert_eq!(result.is_win(), win);
        }
    }

    #[test]
    fn test_mines_beats_limbo_when_both_shapes_match() {
        let payload = json!({
            "roundId": 11,
            "win": true,
            "profit": "0.4",
            "custom": {"mines": [4, 9], "mineCount": 2, "multiplier": 1.4, "winningChance": 70}
        });
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.game_type, GameVariant::Mines);
        assert_eq!(result.multiplier, 1.4);
        assert_eq!(result.winning_chance, Some(70.0));
    }

    #[test]
    fn test_unclassified_custom_falls_back_to_dice() {
        // Unmatched shapes are recorded as dice rather than unknown.
        let payload = json!({"roundId": 3, "win": false, "profit": "-1", "custom": {"foo": "bar"}});
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.game_type, GameVariant::Dice);

        let result = ResultNormalizer::new(GameVariant::Unknown)
            .normalize(&payload, PAGE)
            .unwrap();
        assert_eq!(result.game_type, GameVariant::Unknown);
    }

    #[test]
    fn test_missing_or_non_object_custom_is_rejected() {
        for payload in [
            json!({"roundId": 3, "win": true, "profit": "1"}),
            json!({"roundId": 3, "win": true, "profit": "1", "custom": null}),
            json!({"roundId": 3, "win": true, "profit": "1", "custom": 5}),
        ] {
            assert!(normalizer().normalize(&payload, PAGE).is_none(), "payload: {}", payload);
        }
    }

    #[test]
    fn test_profit_coercion() {
        assert_eq!(coerce_amount(Some(&json!("2.13"))), 2.13);
        assert_eq!(coerce_amount(Some(&json!(" -0.5 "))), -0.5);
        assert_eq!(coerce_amount(Some(&json!(4))), 4.0);
        assert_eq!(coerce_amount(Some(&json!(""))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(null))), 0.0);
        assert_eq!(coerce_amount(Some(&json!(true))), 1.0);
        assert!(coerce_amount(Some(&json!("abc"))).is_nan());
        assert!(coerce_amount(Some(&json!([1]))).is_nan());
        assert!(coerce_amount(None).is_nan());
    }

    #[test]
    fn test_non_numeric_profit_records_zero() {
        let payload = json!({"roundId": 5, "win": true, "profit": "n/a", "custom": {}});
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.amount, 0.0);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_fields_are_dropped() {
        let payload = json!({
            "roundId": 9,
            "win": true,
            "profit": "1",
            "custom": {"multiplier": -3, "winningChance": 150, "slot": "x"}
        });
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.multiplier, 0.0);
        assert_eq!(result.winning_chance, None);
    }

    #[test]
    fn test_integral_float_round_id_is_accepted() {
        let payload = json!({"roundId": 42.0, "win": true, "profit": "1", "custom": {}});
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.round_id, Some(42));

        let payload = json!({"roundId": 42.5, "win": true, "profit": "1", "custom": {}});
        assert!(normalizer().normalize(&payload, PAGE).is_none());
    }

    #[test]
    fn test_zero_round_id_is_rejected() {
        for round_id in [json!(0), json!(0.0), json!(-0.0)] {
            let payload = json!({"roundId": round_id, "win": true, "profit": "1", "custom": {}});
            assert!(normalizer().normalize(&payload, PAGE).is_none(), "payload: {}", payload);
        }
    }

    #[test]
    fn test_null_target_face_falls_back_to_dice() {
        let payload = json!({
            "roundId": 4,
            "win": true,
            "profit": "1",
            "custom": {"rounds": [{"result": "HEADS", "targetFace": null}]}
        });
        let result = normalizer().normalize(&payload, PAGE).unwrap();
        assert_eq!(result.game_type, GameVariant::Dice);
    }
}
