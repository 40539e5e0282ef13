use chrono::Utc;

use super::Store;
use crate::error::{Result, SyncError};
use crate::model::{
    Match, MatchId, NewMatch, NewSyncLogEntry, NewTeam, ScrapedStanding, StandingEntry,
    SyncLogEntry, Team, TeamId,
};
use crate::reconcile::{write_fields, MatchDiff, MatchFields, ReconcilePlan};

/// Process-local store, handy for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    teams: Vec<Team>,
    matches: Vec<Match>,
    standings: Vec<StandingEntry>,
    logs: Vec<SyncLogEntry>,
    last_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn write_plan(&mut self, plan: &ReconcilePlan) -> Result<()> {
        for new_match in &plan.creates {
            self.insert_match(new_match)?;
        }
        for (id, diff) in &plan.updates {
            self.update_match(*id, diff)?;
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn insert_team(&mut self, team: &NewTeam) -> Result<Team> {
        let team = Team {
            id: TeamId(self.next_id()),
            name: team.name.clone(),
            category: team.category.clone(),
            aliases: team.aliases.clone(),
            source_url: team.source_url.clone(),
        };
        self.teams.push(team.clone());
        Ok(team)
    }

    fn team(&self, id: TeamId) -> Result<Team> {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(SyncError::TeamNotFound(id))
    }

    fn teams(&self) -> Result<Vec<Team>> {
        Ok(self.teams.clone())
    }

    fn matches_for_team(&self, team: TeamId) -> Result<Vec<Match>> {
        let mut matches: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.team_id == team)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.kickoff, m.id));
        Ok(matches)
    }

    fn insert_match(&mut self, new_match: &NewMatch) -> Result<Match> {
        let stored = new_match.clone().into_match(MatchId(self.next_id()));
        self.matches.push(stored.clone());
        Ok(stored)
    }

    fn update_match(&mut self, id: MatchId, diff: &MatchDiff) -> Result<()> {
        let stored = self
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(SyncError::MatchNotFound(id))?;
        let mut fields = MatchFields::from(&*stored);
        diff.apply_to(&mut fields);
        write_fields(stored, fields);
        Ok(())
    }

    fn delete_match(&mut self, id: MatchId) -> Result<()> {
        let before = self.matches.len();
        self.matches.retain(|m| m.id != id);
        if self.matches.len() == before {
            return Err(SyncError::MatchNotFound(id));
        }
        Ok(())
    }

    fn apply_fixture_plan(&mut self, plan: &ReconcilePlan) -> Result<()> {
        let saved = (self.matches.clone(), self.last_id);
        if let Err(e) = self.write_plan(plan) {
            (self.matches, self.last_id) = saved;
            return Err(e);
        }
        Ok(())
    }

    fn standings_for_team(&self, team: TeamId) -> Result<Vec<StandingEntry>> {
        let mut rows: Vec<StandingEntry> = self
            .standings
            .iter()
            .filter(|s| s.team_id == team)
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.position, s.id));
        Ok(rows)
    }

    fn replace_standings(&mut self, team: TeamId, rows: &[ScrapedStanding]) -> Result<u32> {
        let mut replacement = Vec::with_capacity(rows.len());
        for row in rows {
            replacement.push(StandingEntry {
                id: self.next_id(),
                team_id: team,
                position: row.position,
                club: row.club.clone(),
                points: row.points,
            });
        }
        self.standings.retain(|s| s.team_id != team);
        self.standings.extend(replacement);
        Ok(rows.len() as u32)
    }

    fn append_sync_log(&mut self, entry: &NewSyncLogEntry) -> Result<SyncLogEntry> {
        let logged = SyncLogEntry {
            id: self.next_id(),
            team_id: entry.team_id,
            run_type: entry.run_type,
            status: entry.status,
            message: entry.message.clone(),
            created: entry.created,
            updated: entry.updated,
            skipped: entry.skipped,
            created_at: Utc::now(),
        };
        self.logs.push(logged.clone());
        Ok(logged)
    }

    fn sync_logs(&self, team: Option<TeamId>) -> Result<Vec<SyncLogEntry>> {
        Ok(self
            .logs
            .iter()
            .filter(|l| team.is_none_or(|t| l.team_id == t))
            .cloned()
            .collect())
    }
}
