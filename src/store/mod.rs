//! Persistence of teams, matches, standings and the sync audit log.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{
    Match, MatchId, NewMatch, NewSyncLogEntry, NewTeam, ScrapedStanding, StandingEntry,
    SyncLogEntry, Team, TeamId,
};
use crate::reconcile::{MatchDiff, ReconcilePlan};

/// CRUD operations the pipeline needs. Every method is a single atomic
/// write or read; [`Store::apply_fixture_plan`] and
/// [`Store::replace_standings`] are all-or-nothing.
pub trait Store {
    fn insert_team(&mut self, team: &NewTeam) -> Result<Team>;

    fn team(&self, id: TeamId) -> Result<Team>;

    /// All teams ordered by id.
    fn teams(&self) -> Result<Vec<Team>>;

    fn matches_for_team(&self, team: TeamId) -> Result<Vec<Match>>;

    fn insert_match(&mut self, new_match: &NewMatch) -> Result<Match>;

    /// Write only the fields set in `diff`.
    fn update_match(&mut self, id: MatchId, diff: &MatchDiff) -> Result<()>;

    fn delete_match(&mut self, id: MatchId) -> Result<()>;

    /// Write a reconciliation's inserts and updates. On failure none of them remain.
    fn apply_fixture_plan(&mut self, plan: &ReconcilePlan) -> Result<()>;

    fn standings_for_team(&self, team: TeamId) -> Result<Vec<StandingEntry>>;

    /// Replace the team's whole classification. On failure the previous rows remain.
    fn replace_standings(&mut self, team: TeamId, rows: &[ScrapedStanding]) -> Result<u32>;

    fn append_sync_log(&mut self, entry: &NewSyncLogEntry) -> Result<SyncLogEntry>;

    /// Log entries, oldest first, optionally for one team.
    fn sync_logs(&self, team: Option<TeamId>) -> Result<Vec<SyncLogEntry>>;

    /// Teams with a source page to synchronize from.
    fn sync_teams(&self) -> Result<Vec<Team>> {
        Ok(self
            .teams()?
            .into_iter()
            .filter(|team| team.sync_url().is_some())
            .collect())
    }
}
