//! Pattern Engine
//!
//! Fixed, hand-written matchers per sport. Each one reads the current and
//! previous snapshot of an event and returns the tips it considers close to
//! certain right now.

pub mod basketball;
pub mod state;
pub mod table_tennis;
pub mod traits;
pub mod volleyball;

// Re-exports
pub use basketball::BasketballMatcher;
pub use table_tennis::TableTennisMatcher;
pub use traits::{PatternError, PatternMatcher};
pub use volleyball::VolleyballMatcher;

use tracing::{debug, warn};

use crate::domain::{sports, EventSnapshot, Tip};

/// Sports with a registered matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Basketball,
    Volleyball,
    TableTennis,
}

impl MatcherKind {
    pub const ALL: [MatcherKind; 3] = [
        MatcherKind::Basketball,
        MatcherKind::Volleyball,
        MatcherKind::TableTennis,
    ];

    pub fn from_sport_id(sport_id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.sport_id() == sport_id)
    }

    pub fn sport_id(&self) -> i64 {
        match self {
            Self::Basketball => sports::BASKETBALL,
            Self::Volleyball => sports::VOLLEYBALL,
            Self::TableTennis => sports::TABLE_TENNIS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Basketball => "basketball",
            Self::Volleyball => "volleyball",
            Self::TableTennis => "table_tennis",
        }
    }
}

/// Sport ids that have a matcher
pub fn supported_sports() -> Vec<i64> {
    MatcherKind::ALL.iter().map(MatcherKind::sport_id).collect()
}

/// Build the matcher for `sport_id`.
///
/// `Ok(None)` means the sport has no matcher. An error means the sport is
/// supported but the event's state could not be derived.
pub fn get_matcher<'a>(
    sport_id: i64,
    new: &'a EventSnapshot,
    old: &'a EventSnapshot,
) -> Result<Option<Box<dyn PatternMatcher + 'a>>, PatternError> {
    let Some(kind) = MatcherKind::from_sport_id(sport_id) else {
        return Ok(None);
    };
    let matcher: Box<dyn PatternMatcher + 'a> = match kind {
        MatcherKind::Basketball => Box::new(BasketballMatcher::new(new, old)?),
        MatcherKind::Volleyball => Box::new(VolleyballMatcher::new(new, old)?),
        MatcherKind::TableTennis => Box::new(TableTennisMatcher::new(new, old)?),
    };
    Ok(Some(matcher))
}

/// Run the matcher of the event's sport. Unsupported sports and events
/// whose state cannot be derived yield no tips.
pub fn match_event(new: &EventSnapshot, old: &EventSnapshot) -> Vec<Tip> {
    let event = &new.event;
    match get_matcher(event.sport_id, new, old) {
        Ok(Some(matcher)) => {
            let tips = matcher.check_for_matches();
            if !tips.is_empty() {
                debug!(
                    event_id = event.id,
                    state = %matcher.describe(),
                    "{} pattern tip(s) for {}",
                    tips.len(),
                    event.title()
                );
            }
            tips
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(event_id = event.id, "Skipping pattern match: {}", e);
            Vec::new()
        }
    }
}
