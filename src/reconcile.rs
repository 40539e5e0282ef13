//! Merges freshly scraped fixtures into a team's stored schedule.
//!
//! A scraped fixture is the same real-world match as a stored one when the
//! opponent is literally equal and the kickoffs are at most
//! [`RECONCILIATION_WINDOW`] apart. Only a fixed set of fields may be
//! rewritten, and only when they changed, so re-running on unchanged source
//! data produces no writes. Nothing is ever deleted here.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::model::{Match, MatchId, NewMatch, ScrapedMatch, TeamId};

/// Kickoff tolerance when pairing a scraped fixture with a stored one.
pub const RECONCILIATION_WINDOW: Duration = Duration::hours(24);

/// Score and finished flag, always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreUpdate {
    pub team_score: Option<u8>,
    pub opponent_score: Option<u8>,
    pub finished: bool,
}

/// Field changes for one stored match. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchDiff {
    pub kickoff: Option<NaiveDateTime>,
    pub is_home: Option<bool>,
    pub score: Option<ScoreUpdate>,
    pub opponent_crest: Option<String>,
    pub venue: Option<String>,
    pub competition: Option<String>,
}

impl MatchDiff {
    pub fn is_empty(&self) -> bool {
        *self == MatchDiff::default()
    }

    /// Overlay `later` on top of `self`; fields set in `later` win.
    pub fn merge(&mut self, later: MatchDiff) {
        let MatchDiff {
            kickoff,
            is_home,
            score,
            opponent_crest,
            venue,
            competition,
        } = later;
        self.kickoff = kickoff.or(self.kickoff);
        self.is_home = is_home.or(self.is_home);
        self.score = score.or(self.score);
        self.opponent_crest = opponent_crest.or(self.opponent_crest.take());
        self.venue = venue.or(self.venue.take());
        self.competition = competition.or(self.competition.take());
    }

    pub fn apply_to(&self, record: &mut MatchFields) {
        if let Some(kickoff) = self.kickoff {
            record.kickoff = kickoff;
        }
        if let Some(is_home) = self.is_home {
            record.is_home = is_home;
        }
        if let Some(score) = self.score {
            record.team_score = score.team_score;
            record.opponent_score = score.opponent_score;
            record.finished = score.finished;
        }
        if let Some(crest) = &self.opponent_crest {
            record.opponent_crest = Some(crest.clone());
        }
        if let Some(venue) = &self.venue {
            record.venue = venue.clone();
        }
        if let Some(competition) = &self.competition {
            record.competition = competition.clone();
        }
    }
}

/// The fields reconciliation reads and writes, shared by stored and pending matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFields {
    pub opponent: String,
    pub kickoff: NaiveDateTime,
    pub venue: String,
    pub is_home: bool,
    pub competition: String,
    pub team_score: Option<u8>,
    pub opponent_score: Option<u8>,
    pub finished: bool,
    pub opponent_crest: Option<String>,
}

impl From<&Match> for MatchFields {
    fn from(m: &Match) -> Self {
        Self {
            opponent: m.opponent.clone(),
            kickoff: m.kickoff,
            venue: m.venue.clone(),
            is_home: m.is_home,
            competition: m.competition.clone(),
            team_score: m.team_score,
            opponent_score: m.opponent_score,
            finished: m.finished,
            opponent_crest: m.opponent_crest.clone(),
        }
    }
}

impl From<&NewMatch> for MatchFields {
    fn from(m: &NewMatch) -> Self {
        Self {
            opponent: m.opponent.clone(),
            kickoff: m.kickoff,
            venue: m.venue.clone(),
            is_home: m.is_home,
            competition: m.competition.clone(),
            team_score: m.team_score,
            opponent_score: m.opponent_score,
            finished: m.finished,
            opponent_crest: m.opponent_crest.clone(),
        }
    }
}

/// Whether `existing` and `scraped` are the same real-world fixture.
pub fn is_same_fixture(existing: &MatchFields, scraped: &ScrapedMatch) -> bool {
    existing.opponent == scraped.opponent
        && (existing.kickoff - scraped.kickoff).abs() <= RECONCILIATION_WINDOW
}

/// Compare a stored record with a fresh scrape, keeping only eligible changes.
pub fn diff(existing: &MatchFields, scraped: &ScrapedMatch) -> MatchDiff {
    let mut diff = MatchDiff::default();
    if existing.kickoff != scraped.kickoff {
        diff.kickoff = Some(scraped.kickoff);
    }
    if existing.is_home != scraped.is_home {
        diff.is_home = Some(scraped.is_home);
    }
    let score = ScoreUpdate {
        team_score: scraped.team_score,
        opponent_score: scraped.opponent_score,
        finished: scraped.finished,
    };
    let stored_score = ScoreUpdate {
        team_score: existing.team_score,
        opponent_score: existing.opponent_score,
        finished: existing.finished,
    };
    // an unreadable score never replaces what is stored
    if !scraped.needs_review && score != stored_score {
        diff.score = Some(score);
    }
    if let Some(crest) = &scraped.opponent_crest {
        if existing.opponent_crest.as_ref() != Some(crest) {
            diff.opponent_crest = Some(crest.clone());
        }
    }
    if scraped.has_known_venue() && existing.venue != scraped.venue {
        diff.venue = Some(scraped.venue.clone());
    }
    if !scraped.competition.trim().is_empty() && existing.competition != scraped.competition {
        diff.competition = Some(scraped.competition.clone());
    }
    diff
}

/// Writes to perform for one batch, with per-record classification counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcilePlan {
    pub creates: Vec<NewMatch>,
    pub updates: Vec<(MatchId, MatchDiff)>,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }
}

enum Slot {
    Stored { id: MatchId, diff: MatchDiff },
    Pending(usize),
}

/// Classify a scraped batch against a team's stored matches.
///
/// Records created earlier in the same batch take part in matching, so a
/// fixture listed on several period tabs is created once.
pub fn reconcile(team_id: TeamId, existing: &[Match], scraped: &[ScrapedMatch]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut working: Vec<(MatchFields, Slot)> = existing
        .iter()
        .filter(|m| m.team_id == team_id)
        .map(|m| {
            (
                MatchFields::from(m),
                Slot::Stored {
                    id: m.id,
                    diff: MatchDiff::default(),
                },
            )
        })
        .collect();

    for record in scraped {
        let closest = working
            .iter_mut()
            .filter(|(fields, _)| is_same_fixture(fields, record))
            .min_by_key(|(fields, _)| (fields.kickoff - record.kickoff).abs());

        let Some((fields, slot)) = closest else {
            let new_match = NewMatch::from_scraped(team_id, record);
            working.push((MatchFields::from(&new_match), Slot::Pending(plan.creates.len())));
            plan.creates.push(new_match);
            plan.created += 1;
            continue;
        };

        let change = diff(fields, record);
        if change.is_empty() {
            plan.skipped += 1;
            continue;
        }
        change.apply_to(fields);
        match slot {
            Slot::Stored { diff: pending, .. } => {
                // one row write per stored match, however often it is listed
                if pending.is_empty() {
                    plan.updated += 1;
                } else {
                    plan.skipped += 1;
                }
                pending.merge(change);
            }
            Slot::Pending(index) => {
                // still unwritten: fold the change into the insert
                let pending = &mut plan.creates[*index];
                apply_to_new(pending, fields);
                plan.skipped += 1;
            }
        }
    }

    plan.updates = working
        .into_iter()
        .filter_map(|(_, slot)| match slot {
            Slot::Stored { id, diff } if !diff.is_empty() => Some((id, diff)),
            _ => None,
        })
        .collect();
    plan
}

fn apply_to_new(pending: &mut NewMatch, fields: &MatchFields) {
    pending.kickoff = fields.kickoff;
    pending.venue = fields.venue.clone();
    pending.is_home = fields.is_home;
    pending.competition = fields.competition.clone();
    pending.team_score = fields.team_score;
    pending.opponent_score = fields.opponent_score;
    pending.finished = fields.finished;
    pending.opponent_crest = fields.opponent_crest.clone();
}

/// Apply a plan to an in-memory copy of the schedule, assigning ids to
/// created records with `next_id`.
pub fn apply_plan(
    existing: &[Match],
    plan: &ReconcilePlan,
    mut next_id: impl FnMut() -> MatchId,
) -> Vec<Match> {
    let mut out: Vec<Match> = existing.to_vec();
    for (id, change) in &plan.updates {
        if let Some(stored) = out.iter_mut().find(|m| m.id == *id) {
            let mut fields = MatchFields::from(&*stored);
            change.apply_to(&mut fields);
            write_fields(stored, fields);
        }
    }
    out.extend(plan.creates.iter().cloned().map(|m| m.into_match(next_id())));
    out
}

pub(crate) fn write_fields(stored: &mut Match, fields: MatchFields) {
    stored.kickoff = fields.kickoff;
    stored.venue = fields.venue;
    stored.is_home = fields.is_home;
    stored.competition = fields.competition;
    stored.team_score = fields.team_score;
    stored.opponent_score = fields.opponent_score;
    stored.finished = fields.finished;
    stored.opponent_crest = fields.opponent_crest;
}
