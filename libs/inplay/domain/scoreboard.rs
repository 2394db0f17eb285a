//! Typed view over the scoreboard section (`sb`) of a raw event payload

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::event::Phase;

/// Match clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    #[serde(rename = "m")]
    pub minutes: u32,
    #[serde(rename = "s")]
    pub seconds: u32,
}

/// Running points of one side within one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLine {
    #[serde(rename = "gpi")]
    pub phase_id: i64,
    #[serde(rename = "gpn")]
    pub phase_name: String,
    #[serde(rename = "spi")]
    pub side_id: i64,
    #[serde(rename = "v", deserialize_with = "points")]
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    #[serde(rename = "gmc", default)]
    pub clock: Option<Clock>,
    #[serde(rename = "gcp", default)]
    pub current: Option<Phase>,
    #[serde(rename = "gsl", default)]
    pub lines: Vec<PhaseLine>,
}

impl Scoreboard {
    /// Extract the scoreboard from a raw event payload, if it has one
    pub fn from_event_payload(raw: &Value) -> Option<Self> {
        match raw.get("sb") {
            Some(sb) if !sb.is_null() => serde_json::from_value(sb.clone()).ok(),
            _ => None,
        }
    }

    pub fn current_phase_id(&self) -> Option<i64> {
        self.current.as_ref().map(|p| p.id)
    }

    /// Lines belonging to the given phase id
    pub fn lines_for_phase(&self, phase_id: i64) -> impl Iterator<Item = &PhaseLine> {
        self.lines.iter().filter(move |l| l.phase_id == phase_id)
    }
}

/// The feed sends points either as a number or as a numeric string
fn points<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid points value: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| D::Error::custom(format!("invalid points value: {}", s))),
        other => Err(D::Error::custom(format!("invalid points value: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scoreboard_with_string_points() {
        let raw = json!({
            "sb": {
                "gmc": {"m": 7, "s": 12},
                "gcp": {"gpi": 2, "gpn": "2nd Quarter"},
                "gsl": [
                    {"gpi": 2, "gpn": "2nd Quarter", "spi": 10, "v": "14"},
                    {"gpi": 2, "gpn": "2nd Quarter", "spi": 20, "v": 9}
                ]
            }
        });

        let sb = Scoreboard::from_event_payload(&raw).unwrap();
        assert_eq!(sb.current_phase_id(), Some(2));
        assert_eq!(sb.clock.unwrap().minutes, 7);
        let values: Vec<u32> = sb.lines_for_phase(2).map(|l| l.value).collect();
        assert_eq!(values, vec![14, 9]);
    }

    #[test]
    fn test_missing_scoreboard() {
        assert!(Scoreboard::from_event_payload(&json!({"sb": null})).is_none());
        assert!(Scoreboard::from_event_payload(&json!({})).is_none());
    }
}
