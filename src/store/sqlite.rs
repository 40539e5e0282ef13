//! SQLite-backed store.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use super::Store;
use crate::error::{Result, SyncError};
use crate::model::{
    Match, MatchId, NewMatch, NewSyncLogEntry, NewTeam, RunType, ScrapedStanding, StandingEntry,
    SyncLogEntry, SyncStatus, Team, TeamId,
};
use crate::reconcile::{MatchDiff, ReconcilePlan};

const MATCH_COLUMNS: &str = "id, team_id, opponent, kickoff, venue, is_home, competition, \
     team_score, opponent_score, finished, opponent_crest, published";

/// Database connection and operations
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        debug!(path = %path.display(), "opened sqlite store");
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                aliases TEXT NOT NULL DEFAULT '[]',
                source_url TEXT
            );

            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                opponent TEXT NOT NULL,
                kickoff TEXT NOT NULL,
                venue TEXT NOT NULL,
                is_home INTEGER NOT NULL,
                competition TEXT NOT NULL DEFAULT '',
                team_score INTEGER,
                opponent_score INTEGER,
                finished INTEGER NOT NULL DEFAULT 0,
                opponent_crest TEXT,
                published INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS standings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                position INTEGER NOT NULL,
                club TEXT NOT NULL CHECK (length(trim(club)) > 0),
                points INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                run_type TEXT NOT NULL,
                status TEXT NOT NULL,
                message TEXT NOT NULL,
                created INTEGER NOT NULL DEFAULT 0,
                updated INTEGER NOT NULL DEFAULT 0,
                skipped INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_matches_team ON matches(team_id, kickoff);
            CREATE INDEX IF NOT EXISTS idx_standings_team ON standings(team_id, position);
            CREATE INDEX IF NOT EXISTS idx_sync_logs_team ON sync_logs(team_id);
            "#,
        )?;
        Ok(())
    }
}

fn team_from_row(row: &Row) -> rusqlite::Result<Team> {
    let aliases_json: String = row.get(3)?;
    Ok(Team {
        id: TeamId(row.get(0)?),
        name: row.get(1)?,
        category: row.get(2)?,
        aliases: serde_json::from_str(&aliases_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        source_url: row.get(4)?,
    })
}

fn match_from_row(row: &Row) -> rusqlite::Result<Match> {
    Ok(Match {
        id: MatchId(row.get(0)?),
        team_id: TeamId(row.get(1)?),
        opponent: row.get(2)?,
        kickoff: row.get(3)?,
        venue: row.get(4)?,
        is_home: row.get(5)?,
        competition: row.get(6)?,
        team_score: row.get(7)?,
        opponent_score: row.get(8)?,
        finished: row.get(9)?,
        opponent_crest: row.get(10)?,
        published: row.get(11)?,
    })
}

fn standing_from_row(row: &Row) -> rusqlite::Result<StandingEntry> {
    Ok(StandingEntry {
        id: row.get(0)?,
        team_id: TeamId(row.get(1)?),
        position: row.get(2)?,
        club: row.get(3)?,
        points: row.get(4)?,
    })
}

fn log_from_row(row: &Row) -> rusqlite::Result<SyncLogEntry> {
    let run_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(SyncLogEntry {
        id: row.get(0)?,
        team_id: TeamId(row.get(1)?),
        run_type: run_type
            .parse::<RunType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        status: status
            .parse::<SyncStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        message: row.get(4)?,
        created: row.get(5)?,
        updated: row.get(6)?,
        skipped: row.get(7)?,
        created_at: row.get::<_, DateTime<Utc>>(8)?,
    })
}

fn insert_match_in(conn: &Connection, m: &NewMatch) -> Result<Match> {
    conn.execute(
        "INSERT INTO matches (team_id, opponent, kickoff, venue, is_home, competition, \
         team_score, opponent_score, finished, opponent_crest, published) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            m.team_id.0,
            m.opponent,
            m.kickoff,
            m.venue,
            m.is_home,
            m.competition,
            m.team_score,
            m.opponent_score,
            m.finished,
            m.opponent_crest,
            m.published,
        ],
    )?;
    let id = MatchId(conn.last_insert_rowid());
    Ok(m.clone().into_match(id))
}

fn update_match_in(conn: &Connection, id: MatchId, diff: &MatchDiff) -> Result<()> {
    let mut columns: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(kickoff) = diff.kickoff {
        columns.push("kickoff");
        values.push(Box::new(kickoff));
    }
    if let Some(is_home) = diff.is_home {
        columns.push("is_home");
        values.push(Box::new(is_home));
    }
    if let Some(score) = diff.score {
        columns.extend(["team_score", "opponent_score", "finished"]);
        values.push(Box::new(score.team_score));
        values.push(Box::new(score.opponent_score));
        values.push(Box::new(score.finished));
    }
    if let Some(crest) = &diff.opponent_crest {
        columns.push("opponent_crest");
        values.push(Box::new(crest.clone()));
    }
    if let Some(venue) = &diff.venue {
        columns.push("venue");
        values.push(Box::new(venue.clone()));
    }
    if let Some(competition) = &diff.competition {
        columns.push("competition");
        values.push(Box::new(competition.clone()));
    }
    if columns.is_empty() {
        return Ok(());
    }

    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE matches SET {assignments} WHERE id = ?{}",
        columns.len() + 1
    );
    values.push(Box::new(id.0));
    let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
    if changed == 0 {
        return Err(SyncError::MatchNotFound(id));
    }
    Ok(())
}

impl Store for SqliteStore {
    fn insert_team(&mut self, team: &NewTeam) -> Result<Team> {
        let aliases = serde_json::to_string(&team.aliases)?;
        self.conn.execute(
            "INSERT INTO teams (name, category, aliases, source_url) VALUES (?1, ?2, ?3, ?4)",
            params![team.name, team.category, aliases, team.source_url],
        )?;
        let id = TeamId(self.conn.last_insert_rowid());
        Ok(Team {
            id,
            name: team.name.clone(),
            category: team.category.clone(),
            aliases: team.aliases.clone(),
            source_url: team.source_url.clone(),
        })
    }

    fn team(&self, id: TeamId) -> Result<Team> {
        self.conn
            .query_row(
                "SELECT id, name, category, aliases, source_url FROM teams WHERE id = ?1",
                params![id.0],
                team_from_row,
            )
            .optional()?
            .ok_or(SyncError::TeamNotFound(id))
    }

    fn teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, category, aliases, source_url FROM teams ORDER BY id")?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    fn matches_for_team(&self, team: TeamId) -> Result<Vec<Match>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE team_id = ?1 ORDER BY kickoff, id"
        ))?;
        let matches = stmt
            .query_map(params![team.0], match_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(matches)
    }

    fn insert_match(&mut self, m: &NewMatch) -> Result<Match> {
        insert_match_in(&self.conn, m)
    }

    fn update_match(&mut self, id: MatchId, diff: &MatchDiff) -> Result<()> {
        update_match_in(&self.conn, id, diff)
    }

    fn delete_match(&mut self, id: MatchId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM matches WHERE id = ?1", params![id.0])?;
        if changed == 0 {
            return Err(SyncError::MatchNotFound(id));
        }
        Ok(())
    }

    fn apply_fixture_plan(&mut self, plan: &ReconcilePlan) -> Result<()> {
        let tx = self.conn.transaction()?;
        for new_match in &plan.creates {
            insert_match_in(&tx, new_match)?;
        }
        for (id, diff) in &plan.updates {
            update_match_in(&tx, *id, diff)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn standings_for_team(&self, team: TeamId) -> Result<Vec<StandingEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, team_id, position, club, points FROM standings \
             WHERE team_id = ?1 ORDER BY position, id",
        )?;
        let rows = stmt
            .query_map(params![team.0], standing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn replace_standings(&mut self, team: TeamId, rows: &[ScrapedStanding]) -> Result<u32> {
        // dropping the transaction on error rolls back to the previous rows
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM standings WHERE team_id = ?1", params![team.0])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO standings (team_id, position, club, points) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                insert.execute(params![team.0, row.position, row.club, row.points])?;
            }
        }
        tx.commit()?;
        Ok(rows.len() as u32)
    }

    fn append_sync_log(&mut self, entry: &NewSyncLogEntry) -> Result<SyncLogEntry> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO sync_logs (team_id, run_type, status, message, created, updated, \
             skipped, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.team_id.0,
                entry.run_type.to_string(),
                entry.status.to_string(),
                entry.message,
                entry.created,
                entry.updated,
                entry.skipped,
                created_at,
            ],
        )?;
        Ok(SyncLogEntry {
            id: self.conn.last_insert_rowid(),
            team_id: entry.team_id,
            run_type: entry.run_type,
            status: entry.status,
            message: entry.message.clone(),
            created: entry.created,
            updated: entry.updated,
            skipped: entry.skipped,
            created_at,
        })
    }

    fn sync_logs(&self, team: Option<TeamId>) -> Result<Vec<SyncLogEntry>> {
        let sql = "SELECT id, team_id, run_type, status, message, created, updated, skipped, \
                   created_at FROM sync_logs WHERE (?1 IS NULL OR team_id = ?1) ORDER BY id";
        let mut stmt = self.conn.prepare(sql)?;
        let logs = stmt
            .query_map(params![team.map(|t| t.0)], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::reconcile::ScoreUpdate;

    fn store_with_team() -> (SqliteStore, Team) {
        let mut store = SqliteStore::in_memory().unwrap();
        let team = store
            .insert_team(&NewTeam {
                name: "RC Massy".to_string(),
                category: "Seniors".to_string(),
                aliases: vec!["RC Massy Essonne".to_string()],
                source_url: Some("https://competitions.example/poule/4".to_string()),
            })
            .unwrap();
        (store, team)
    }

    fn new_match(team: TeamId) -> NewMatch {
        NewMatch {
            team_id: team,
            opponent: "US Dax".to_string(),
            kickoff: NaiveDate::from_ymd_opt(2024, 9, 14)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            venue: "Stade Jules Ladoumègue".to_string(),
            is_home: true,
            competition: "Nationale".to_string(),
            team_score: None,
            opponent_score: None,
            finished: false,
            opponent_crest: None,
            published: true,
        }
    }

    fn standing(position: u32, club: &str, points: i32) -> ScrapedStanding {
        ScrapedStanding {
            position,
            club: club.to_string(),
            points,
        }
    }

    #[test]
    fn team_round_trips_aliases() {
        let (store, team) = store_with_team();
        assert_eq!(store.team(team.id).unwrap(), team);
        assert_eq!(store.sync_teams().unwrap().len(), 1);
        assert!(matches!(
            store.team(TeamId(99)),
            Err(SyncError::TeamNotFound(TeamId(99)))
        ));
    }

    #[test]
    fn corrupt_aliases_are_an_error() {
        let (store, team) = store_with_team();
        store
            .conn
            .execute(
                "UPDATE teams SET aliases = 'RC Massy Essonne' WHERE id = ?1",
                params![team.id.0],
            )
            .unwrap();
        assert!(matches!(store.team(team.id), Err(SyncError::Database(_))));
        assert!(store.teams().is_err());
    }

    #[test]
    fn failed_fixture_plan_writes_nothing() {
        let (mut store, team) = store_with_team();
        let stored = store.insert_match(&new_match(team.id)).unwrap();
        let venue_change = MatchDiff {
            venue: Some("Stade Maurice Boyau".to_string()),
            ..MatchDiff::default()
        };
        let plan = ReconcilePlan {
            creates: vec![NewMatch {
                opponent: "Stade Montois".to_string(),
                ..new_match(team.id)
            }],
            updates: vec![
                (stored.id, venue_change.clone()),
                (MatchId(404), venue_change),
            ],
            created: 1,
            updated: 2,
            skipped: 0,
        };
        assert!(matches!(
            store.apply_fixture_plan(&plan),
            Err(SyncError::MatchNotFound(MatchId(404)))
        ));

        let kept = store.matches_for_team(team.id).unwrap();
        assert_eq!(kept, vec![stored]);
    }

    #[test]
    fn update_writes_only_diff_fields() {
        let (mut store, team) = store_with_team();
        let inserted = store.insert_match(&new_match(team.id)).unwrap();
        let diff = MatchDiff {
            score: Some(ScoreUpdate {
                team_score: Some(28),
                opponent_score: Some(55),
                finished: true,
            }),
            ..MatchDiff::default()
        };
        store.update_match(inserted.id, &diff).unwrap();

        let stored = store.matches_for_team(team.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].team_score, Some(28));
        assert_eq!(stored[0].opponent_score, Some(55));
        assert!(stored[0].finished);
        assert_eq!(stored[0].venue, inserted.venue);
        assert_eq!(stored[0].kickoff, inserted.kickoff);
        assert!(stored[0].published);

        assert!(matches!(
            store.update_match(MatchId(404), &diff),
            Err(SyncError::MatchNotFound(_))
        ));
    }

    #[test]
    fn failed_standings_replace_keeps_previous_rows() {
        let (mut store, team) = store_with_team();
        let first = vec![standing(1, "US Dax", 42), standing(2, "RC Massy", 38)];
        assert_eq!(store.replace_standings(team.id, &first).unwrap(), 2);

        // the empty club name violates the table constraint halfway through
        let broken = vec![standing(1, "RC Massy", 43), standing(2, " ", 40)];
        assert!(store.replace_standings(team.id, &broken).is_err());

        let kept = store.standings_for_team(team.id).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].club, "US Dax");
        assert_eq!(kept[1].club, "RC Massy");
    }

    #[test]
    fn sync_logs_filter_by_team() {
        let (mut store, team) = store_with_team();
        let entry = NewSyncLogEntry {
            team_id: team.id,
            run_type: RunType::Scheduled,
            status: SyncStatus::Error,
            message: "rendering timed out".to_string(),
            created: 0,
            updated: 0,
            skipped: 0,
        };
        store.append_sync_log(&entry).unwrap();
        let logs = store.sync_logs(Some(team.id)).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].run_type, RunType::Scheduled);
        assert_eq!(logs[0].status, SyncStatus::Error);
        assert!(store.sync_logs(Some(TeamId(99))).unwrap().is_empty());
        assert_eq!(store.sync_logs(None).unwrap().len(), 1);
    }
}
