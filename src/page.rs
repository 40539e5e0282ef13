//! Rendered page content and the capability that produces it.
//!
//! The pipeline only ever sees [`PageContent`]; how a page gets rendered is
//! hidden behind [`RenderBackend`] and the session it opens.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ::scraper::{Html, Selector};
use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::extract::{normalize_text, select_text};

/// A selectable period (matchday, phase) exposed by the competition page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTab {
    pub label: String,
    pub href: String,
}

/// The rendered markup of one page, optionally for one selected period.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub period: Option<String>,
    pub html: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, period: Option<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            period,
            html: html.into(),
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Competition label: the first heading, falling back to the document title.
    pub fn title(&self) -> String {
        let document = self.document();
        ["h1", "title"]
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .map(|selector| normalize_text(&select_text(&document.root_element(), &selector)))
            .find(|title| !title.is_empty())
            .unwrap_or_default()
    }

    /// Period tabs matched by `selector`, in page order, without duplicates.
    pub fn periods(&self, selector: &str) -> Result<Vec<PeriodTab>> {
        let selector = Selector::parse(selector)?;
        let document = self.document();
        let mut seen = HashSet::new();
        let tabs = document
            .select(&selector)
            .filter_map(|tab| {
                let href = tab.value().attr("href")?.trim();
                if href.is_empty() || href == "#" {
                    return None;
                }
                let label = normalize_text(&tab.text().collect::<String>());
                Some(PeriodTab {
                    label,
                    href: href.to_string(),
                })
            })
            .filter(|tab| seen.insert(tab.href.clone()))
            .collect();
        Ok(tabs)
    }
}

/// Renders pages within one session.
#[allow(async_fn_in_trait)]
pub trait PageContentProvider {
    /// Render `url`, selecting `period` first when given.
    async fn render(&mut self, url: &str, period: Option<&PeriodTab>) -> Result<PageContent>;
}

/// Opens render sessions. A session lives for one orchestrator run and is
/// dropped when the run ends.
#[allow(async_fn_in_trait)]
pub trait RenderBackend {
    type Session: PageContentProvider;

    async fn open(&self) -> Result<Self::Session>;
}

type PageKey = (String, Option<String>);

/// Serves pre-rendered snapshots keyed by URL and period label.
///
/// Used to replay saved pages and to drive the pipeline without a network.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: Arc<HashMap<PageKey, String>>,
    failing: Arc<HashSet<String>>,
    renders: Arc<Mutex<Vec<PageKey>>>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, period: Option<&str>, html: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.pages).insert(
            (url.to_string(), period.map(str::to_string)),
            html.into(),
        );
        self
    }

    /// Every render of `url` fails as a timeout.
    pub fn with_failure(mut self, url: &str) -> Self {
        Arc::make_mut(&mut self.failing).insert(url.to_string());
        self
    }

    /// Renders performed so far, in order, across all sessions.
    pub fn renders(&self) -> Vec<(String, Option<String>)> {
        self.renders
            .lock()
            .map(|renders| renders.clone())
            .unwrap_or_default()
    }
}

impl RenderBackend for StaticPages {
    type Session = StaticPages;

    async fn open(&self) -> Result<StaticPages> {
        Ok(self.clone())
    }
}

impl PageContentProvider for StaticPages {
    async fn render(&mut self, url: &str, period: Option<&PeriodTab>) -> Result<PageContent> {
        let key = (url.to_string(), period.map(|p| p.label.clone()));
        if let Ok(mut renders) = self.renders.lock() {
            renders.push(key.clone());
        }
        if self.failing.contains(url) {
            return Err(SyncError::Timeout {
                url: url.to_string(),
                timeout: Duration::ZERO,
            });
        }
        let html = self
            .pages
            .get(&key)
            .cloned()
            .ok_or(SyncError::ElementNotFound {
                context: "snapshot for requested page",
            })?;
        Ok(PageContent::new(url, key.1, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABBED: &str = r##"
        <html><head><title>Fédérale 2 - Poule 4</title></head>
        <body>
          <h1> Fédérale&nbsp;2 – Poule 4 </h1>
          <nav role="tablist">
            <a href="?journee=1">J1</a>
            <a href="?journee=2">J2</a>
            <a href="?journee=2">J2</a>
            <a href="#">Classement</a>
          </nav>
        </body></html>"##;

    #[test]
    fn discovers_unique_period_tabs() {
        let page = PageContent::new("https://competitions.example/pool", None, TABBED);
        let tabs = page.periods("[role=tablist] a[href]").unwrap();
        assert_eq!(
            tabs,
            vec![
                PeriodTab {
                    label: "J1".to_string(),
                    href: "?journee=1".to_string()
                },
                PeriodTab {
                    label: "J2".to_string(),
                    href: "?journee=2".to_string()
                },
            ]
        );
    }

    #[test]
    fn title_prefers_heading() {
        let page = PageContent::new("https://competitions.example/pool", None, TABBED);
        assert_eq!(page.title(), "Fédérale 2 – Poule 4");
    }

    #[tokio::test]
    async fn static_pages_record_renders_and_failures() {
        let backend = StaticPages::new()
            .with_page("https://a.example", None, "<p>a</p>")
            .with_failure("https://b.example");
        let mut session = backend.open().await.unwrap();

        let page = session.render("https://a.example", None).await.unwrap();
        assert!(page.html.contains("<p>a</p>"));
        let err = session.render("https://b.example", None).await.unwrap_err();
        assert!(err.is_fetch_failure());

        assert_eq!(backend.renders().len(), 2);
    }
}
