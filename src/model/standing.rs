use serde::Serialize;

use super::team::TeamId;

/// One row of a classification table as read from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedStanding {
    pub position: u32,
    pub club: String,
    pub points: i32,
}

/// A stored classification row. The whole set for a team is replaced on every scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingEntry {
    pub id: i64,
    pub team_id: TeamId,
    pub position: u32,
    pub club: String,
    pub points: i32,
}
