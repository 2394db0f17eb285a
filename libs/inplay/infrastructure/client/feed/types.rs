//! Upstream feed schema and its conversion into domain events
//!
//! Field names follow the feed's short codes:
//! - event: `ei` id, `ci` sport id, `cn` sport, `scn` league, `ss` score
//!   ("a - b"), `sb` scoreboard, `epl` participants, `ml` markets
//! - market: `bggi`/`bggn` market group, `bgi`/`bgn` bet group (with a
//!   `#line#` placeholder), `ln` line value, `ugi` unique tip group id,
//!   `msl` tips
//! - tip: `msi` id, `mst` name, `msp` odds, `msa` active, `mss` selection
//!   id, `pi` associated participant

use serde::Deserialize;
use serde_json::Value;

use super::FeedError;
use crate::domain::event::is_break_phase;
use crate::domain::{Event, Scoreboard, Team, Tip};

const LINE_PLACEHOLDER: &str = "#line#";
const LINE_DISPLAY: &str = "×";

#[derive(Debug, Deserialize)]
struct RawEvent {
    ei: i64,
    ci: i64,
    cn: String,
    scn: String,
    #[serde(default)]
    ss: Option<String>,
    #[serde(default)]
    sb: Option<Scoreboard>,
    epl: Vec<RawParticipant>,
    #[serde(default)]
    ml: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
struct RawParticipant {
    #[serde(default)]
    pi: Option<i64>,
    pn: String,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    bggi: i64,
    bggn: String,
    bgi: i64,
    bgn: String,
    #[serde(default)]
    ln: Option<Value>,
    #[serde(default)]
    ugi: Option<i64>,
    msl: Vec<RawTip>,
}

#[derive(Debug, Deserialize)]
struct RawTip {
    msi: i64,
    mst: String,
    msp: f64,
    #[serde(default = "default_active")]
    msa: bool,
    #[serde(default)]
    mss: Option<String>,
    #[serde(default)]
    pi: Option<i64>,
}

fn default_active() -> bool {
    true
}

fn malformed(reason: impl Into<String>, payload: &Value) -> FeedError {
    FeedError::MalformedResponse {
        reason: reason.into(),
        payload: payload.clone(),
    }
}

/// Parse a full feed response (`{"el": [...]}`)
pub fn parse_events(body: &Value) -> Result<Vec<Event>, FeedError> {
    let list = body
        .get("el")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing event list 'el'", body))?;

    list.iter().map(parse_event).collect()
}

/// Parse one event, keeping its raw payload
pub fn parse_event(raw: &Value) -> Result<Event, FeedError> {
    let data: RawEvent =
        serde_json::from_value(raw.clone()).map_err(|e| malformed(e.to_string(), raw))?;

    let (first_score, second_score) = match data.ss.as_deref() {
        Some(score) => {
            let (a, b) = parse_score(score)
                .ok_or_else(|| malformed(format!("invalid score '{}'", score), raw))?;
            (Some(a), Some(b))
        }
        None => (None, None),
    };

    let mut participants = data.epl.into_iter();
    let (Some(first), Some(second)) = (participants.next(), participants.next()) else {
        return Err(malformed("event needs two participants", raw));
    };

    let phase = data.sb.as_ref().and_then(|sb| sb.current.clone());
    let clock = data
        .sb
        .as_ref()
        .and_then(|sb| sb.clock)
        .map(|c| (c.minutes, c.seconds));
    let is_break = phase
        .as_ref()
        .map(|p| is_break_phase(&p.name))
        .unwrap_or(false);

    let tips = data.ml.into_iter().flat_map(market_tips).collect();

    Ok(Event {
        id: data.ei,
        sport_id: data.ci,
        sport_name: data.cn,
        league_name: data.scn,
        first_team: Team {
            id: first.pi,
            name: first.pn,
            score: first_score,
        },
        second_team: Team {
            id: second.pi,
            name: second.pn,
            score: second_score,
        },
        clock,
        phase,
        is_break,
        tips,
        raw: raw.clone(),
    })
}

fn parse_score(score: &str) -> Option<(u32, u32)> {
    let (a, b) = score.split_once(" - ")?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn market_tips(market: RawMarket) -> Vec<Tip> {
    let line = market.ln.as_ref().map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    let display_name = market.bgn.replace(LINE_PLACEHOLDER, LINE_DISPLAY);
    let real_name = match &line {
        Some(line) => market.bgn.replace(LINE_PLACEHOLDER, line),
        None => display_name.clone(),
    };

    market
        .msl
        .into_iter()
        .map(|tip| Tip {
            id: tip.msi,
            name: tip.mst,
            odds: tip.msp,
            market_group_id: market.bggi,
            market_group_name: market.bggn.clone(),
            bet_group_id: market.bgi,
            bet_group_name: display_name.clone(),
            bet_group_name_real: real_name.clone(),
            unique_group_id: market.ugi,
            is_active: tip.msa,
            selection_id: tip.mss.unwrap_or_else(|| tip.msi.to_string()),
            associated_player_id: tip.pi,
        })
        .collect()
}
