use std::fmt;

use serde::Serialize;

/// Stable identifier of a tracked team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A team whose schedule is kept in sync with its competition page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub category: String,
    /// Other spellings the competition site uses for this team.
    pub aliases: Vec<String>,
    pub source_url: Option<String>,
}

impl Team {
    /// The competition page to scrape, if one is configured.
    pub fn sync_url(&self) -> Option<&str> {
        self.source_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Display name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|name| !name.trim().is_empty())
    }

    /// Case-insensitive check whether `text` mentions the team under any name.
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.names()
            .any(|name| haystack.contains(&name.trim().to_lowercase()))
    }
}

/// Values needed to register a new team.
#[derive(Debug, Clone, Default)]
pub struct NewTeam {
    pub name: String,
    pub category: String,
    pub aliases: Vec<String>,
    pub source_url: Option<String>,
}
