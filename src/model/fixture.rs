use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::team::TeamId;

/// Venue placeholder the competition site shows before a ground is assigned.
pub const VENUE_TO_BE_DETERMINED: &str = "À déterminer";

/// Stable identifier of a persisted match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One fixture as read from the competition page, from the tracked team's side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapedMatch {
    pub opponent: String,
    pub kickoff: NaiveDateTime,
    pub venue: String,
    pub is_home: bool,
    pub competition: String,
    pub team_score: Option<u8>,
    pub opponent_score: Option<u8>,
    pub finished: bool,
    pub opponent_crest: Option<String>,
    /// Digits were found where the score sits but could not be read safely.
    pub needs_review: bool,
}

impl ScrapedMatch {
    pub fn has_known_venue(&self) -> bool {
        has_known_venue(&self.venue)
    }
}

/// A fixture stored in the team's schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub team_id: TeamId,
    pub opponent: String,
    pub kickoff: NaiveDateTime,
    pub venue: String,
    pub is_home: bool,
    pub competition: String,
    pub team_score: Option<u8>,
    pub opponent_score: Option<u8>,
    pub finished: bool,
    pub opponent_crest: Option<String>,
    /// Owned by the content editors; synchronization only sets it on creation.
    pub published: bool,
}

/// Values for a match about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMatch {
    pub team_id: TeamId,
    pub opponent: String,
    pub kickoff: NaiveDateTime,
    pub venue: String,
    pub is_home: bool,
    pub competition: String,
    pub team_score: Option<u8>,
    pub opponent_score: Option<u8>,
    pub finished: bool,
    pub opponent_crest: Option<String>,
    pub published: bool,
}

impl NewMatch {
    /// A first sighting of a fixture, published by default.
    pub fn from_scraped(team_id: TeamId, scraped: &ScrapedMatch) -> Self {
        Self {
            team_id,
            opponent: scraped.opponent.clone(),
            kickoff: scraped.kickoff,
            venue: if scraped.has_known_venue() {
                scraped.venue.clone()
            } else {
                VENUE_TO_BE_DETERMINED.to_string()
            },
            is_home: scraped.is_home,
            competition: scraped.competition.clone(),
            team_score: scraped.team_score,
            opponent_score: scraped.opponent_score,
            finished: scraped.finished,
            opponent_crest: scraped.opponent_crest.clone(),
            published: true,
        }
    }

    pub fn into_match(self, id: MatchId) -> Match {
        Match {
            id,
            team_id: self.team_id,
            opponent: self.opponent,
            kickoff: self.kickoff,
            venue: self.venue,
            is_home: self.is_home,
            competition: self.competition,
            team_score: self.team_score,
            opponent_score: self.opponent_score,
            finished: self.finished,
            opponent_crest: self.opponent_crest,
            published: self.published,
        }
    }
}

pub(crate) fn has_known_venue(venue: &str) -> bool {
    let venue = venue.trim();
    !venue.is_empty() && venue != VENUE_TO_BE_DETERMINED
}
