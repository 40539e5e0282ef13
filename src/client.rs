use std::time::Duration;

use ::scraper::{Html, Selector};
use reqwest::header::COOKIE;
use reqwest::Url;
use tracing::{debug, instrument, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::page::{PageContent, PageContentProvider, PeriodTab, RenderBackend};

/// Elements that mark a cookie/consent interstitial covering the page.
pub const DEFAULT_CONSENT_SELECTOR: &str =
    "#didomi-host, #onetrust-banner-sdk, #axeptio_overlay, .cookie-consent, [aria-label=\"consent\"]";

/// How pages are fetched within a session.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub render_timeout: Duration,
    pub consent_wait: Duration,
    pub consent_selector: String,
    pub consent_cookie: Option<String>,
    pub user_agent: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for PageOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            render_timeout: config.render_timeout,
            consent_wait: config.consent_wait,
            consent_selector: DEFAULT_CONSENT_SELECTOR.to_string(),
            consent_cookie: config.consent_cookie.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Renders competition pages over HTTP.
///
/// `HttpRenderer` wraps a [`reqwest::Client`]; each [`RenderBackend::open`]
/// hands out an [`HttpSession`] that shares the connection pool but tracks
/// its own consent state.
///
/// ```no_run
/// # async fn example() -> fixture_sync::Result<()> {
/// use fixture_sync::{HttpRenderer, PageContentProvider, RenderBackend};
///
/// let renderer = HttpRenderer::new(Default::default())?;
/// let mut session = renderer.open().await?;
/// let page = session.render("https://competitions.example/poule-4", None).await?;
/// println!("{}", page.title());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    http: reqwest::Client,
    options: PageOptions,
}

impl HttpRenderer {
    pub fn new(options: PageOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| SyncError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { http, options })
    }

    /// Use the provided [`reqwest::Client`], e.g. to configure proxies.
    pub fn with_client(client: reqwest::Client, options: PageOptions) -> Self {
        Self {
            http: client,
            options,
        }
    }
}

impl RenderBackend for HttpRenderer {
    type Session = HttpSession;

    #[instrument(skip(self))]
    async fn open(&self) -> Result<HttpSession> {
        let consent_selector = Selector::parse(&self.options.consent_selector)?;
        debug!("render session opened");
        Ok(HttpSession {
            http: self.http.clone(),
            options: self.options.clone(),
            consent_selector,
            consent: ConsentState::Unchecked,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsentState {
    Unchecked,
    Absent,
    Accepted,
}

/// One render session. Consent is negotiated at most once per session.
#[derive(Debug)]
pub struct HttpSession {
    http: reqwest::Client,
    options: PageOptions,
    consent_selector: Selector,
    consent: ConsentState,
}

impl HttpSession {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let mut request = self.http.get(url);
        if self.consent == ConsentState::Accepted {
            if let Some(cookie) = &self.options.consent_cookie {
                request = request.header(COOKIE, cookie);
            }
        }
        let fetch = async {
            let response = request.send().await.map_err(|e| SyncError::Http {
                url: url.to_owned(),
                source: e,
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SyncError::UnexpectedStatus {
                    url: url.to_owned(),
                    status,
                });
            }

            response.text().await.map_err(|e| SyncError::ResponseBody {
                url: url.to_owned(),
                source: e,
            })
        };
        tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| SyncError::Timeout {
                url: url.to_owned(),
                timeout,
            })?
    }

    /// Clear the consent interstitial if the first page shows one.
    async fn settle_consent(&mut self, url: &str, body: String) -> Result<String> {
        if self.consent != ConsentState::Unchecked {
            return Ok(body);
        }
        if !has_consent_dialog(&body, &self.consent_selector) {
            self.consent = ConsentState::Absent;
            return Ok(body);
        }
        if self.options.consent_cookie.is_none() {
            warn!(url, "consent dialog present and no consent cookie configured");
            self.consent = ConsentState::Absent;
            return Ok(body);
        }

        self.consent = ConsentState::Accepted;
        let body = self
            .fetch(url, self.options.consent_wait)
            .await
            .map_err(|e| SyncError::Consent {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        if has_consent_dialog(&body, &self.consent_selector) {
            return Err(SyncError::Consent {
                url: url.to_owned(),
                reason: "dialog still present after accepting".to_string(),
            });
        }
        debug!(url, "consent accepted");
        Ok(body)
    }
}

impl PageContentProvider for HttpSession {
    #[instrument(skip(self, period), fields(period = period.map(|p| p.label.as_str())))]
    async fn render(&mut self, url: &str, period: Option<&PeriodTab>) -> Result<PageContent> {
        let target = match period {
            Some(tab) => period_url(url, &tab.href)?,
            None => url.to_string(),
        };
        debug!(url = %target, "fetching page");
        let body = self.fetch(&target, self.options.render_timeout).await?;
        let body = self.settle_consent(&target, body).await?;
        Ok(PageContent::new(
            target,
            period.map(|p| p.label.clone()),
            body,
        ))
    }
}

/// Resolve a period tab's href against the page it was found on.
pub(crate) fn period_url(base: &str, href: &str) -> Result<String> {
    let invalid = |reason: String| SyncError::InvalidUrl {
        url: base.to_string(),
        reason,
    };
    let base = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    base.join(href)
        .map(String::from)
        .map_err(|e| invalid(format!("cannot join {href:?}: {e}")))
}

fn has_consent_dialog(body: &str, selector: &Selector) -> bool {
    Html::parse_document(body).select(selector).next().is_some()
}
