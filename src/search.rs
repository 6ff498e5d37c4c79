use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SearchCredentials;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Sleeper};

pub const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const MAX_PAGE_SIZE: u32 = 10;
const SENIOR_EXCLUSION: &str = "\"Senior Data\"";
const TOO_MANY_REQUESTS: u16 = 429;

/// "Only results from the last N days/weeks/months/years", as the API's `dateRestrict` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyWindow {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl Default for RecencyWindow {
    fn default() -> Self {
        RecencyWindow::Days(7)
    }
}

impl fmt::Display for RecencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecencyWindow::Days(n) => write!(f, "d{}", n),
            RecencyWindow::Weeks(n) => write!(f, "w{}", n),
            RecencyWindow::Months(n) => write!(f, "m{}", n),
            RecencyWindow::Years(n) => write!(f, "y{}", n),
        }
    }
}

impl FromStr for RecencyWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::config(format!("invalid recency window {:?} (expected e.g. d7, w2, m1)", s));
        let mut chars = s.chars();
        let unit = chars.next().ok_or_else(invalid)?;
        let n: u32 = chars.as_str().parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }
        match unit.to_ascii_lowercase() {
            'd' => Ok(RecencyWindow::Days(n)),
            'w' => Ok(RecencyWindow::Weeks(n)),
            'm' => Ok(RecencyWindow::Months(n)),
            'y' => Ok(RecencyWindow::Years(n)),
            _ => Err(invalid()),
        }
    }
}

/// Bounded exponential backoff for rate-limited requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Pause before retry number `attempt + 1`: `base * 2^attempt`, plus up to a second of jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base.saturating_mul(2u32.saturating_pow(attempt));
        if self.jitter {
            backoff + Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..1.0))
        } else {
            backoff
        }
    }
}

/// One search hit: a link plus whatever the search engine said about it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLink {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub links: Vec<CandidateLink>,
    /// Start index of the following page, if the API advertises one.
    pub next_start: Option<u32>,
}

// --- Response shape ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    #[serde(default)]
    queries: Option<SearchQueries>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
    title: Option<String>,
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchQueries {
    #[serde(rename = "nextPage", default)]
    next_page: Vec<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "startIndex")]
    start_index: Option<u32>,
}

impl SearchResponse {
    fn into_page(self) -> SearchPage {
        let next_start = self
            .queries
            .and_then(|q| q.next_page.into_iter().next())
            .and_then(|p| p.start_index);
        let links = self
            .items
            .into_iter()
            .filter_map(|item| {
                let url = item.link.filter(|l| !l.is_empty())?;
                Some(CandidateLink {
                    url,
                    title: item.title,
                    snippet: item.snippet,
                })
            })
            .collect();
        SearchPage { links, next_start }
    }
}

// --- Client ---

pub struct SearchClient<'a> {
    http: &'a dyn HttpClient,
    sleeper: &'a dyn Sleeper,
    credentials: SearchCredentials,
    policy: RetryPolicy,
    endpoint: String,
}

impl<'a> SearchClient<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        sleeper: &'a dyn Sleeper,
        credentials: SearchCredentials,
    ) -> Self {
        Self {
            http,
            sleeper,
            credentials,
            policy: RetryPolicy::default(),
            endpoint: SEARCH_ENDPOINT.to_string(),
        }
    }

    /// Fetch one page of results starting at the 1-based index `start`.
    ///
    /// Rate-limit responses are retried up to `max_retries` times; any other failure,
    /// or a 429 on the final attempt, is returned to the caller.
    pub fn search(
        &self,
        query: &str,
        start: u32,
        page_size: u32,
        recency: RecencyWindow,
    ) -> Result<SearchPage> {
        let (key, cx) = self.credentials.require()?;
        let url = self.request_url(key, cx, query, start, page_size, recency)?;

        let mut attempt = 0;
        let response = loop {
            let response = self.http.get(&url).map_err(|e| self.redact(e))?;
            if response.status != TOO_MANY_REQUESTS {
                break response;
            }
            if attempt >= self.policy.max_retries {
                return Err(Error::RateLimitExhausted {
                    attempts: attempt + 1,
                });
            }
            let delay = self.policy.delay(attempt);
            warn!(attempt = attempt + 1, ?delay, "search API rate limited, backing off");
            self.sleeper.sleep(delay);
            attempt += 1;
        };

        let response = response.error_for_status(&self.endpoint)?;
        let parsed: SearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| Error::invalid(&self.endpoint, e))?;
        let page = parsed.into_page();
        debug!(start, results = page.links.len(), next = ?page.next_start, "search page");
        Ok(page)
    }

    /// Point transport errors at the bare endpoint; the request URL carries the API key.
    fn redact(&self, err: Error) -> Error {
        match err {
            Error::Request { source, .. } => Error::Request {
                url: self.endpoint.clone(),
                source: source.without_url(),
            },
            Error::Http { status, .. } => Error::Http {
                url: self.endpoint.clone(),
                status,
            },
            other => other,
        }
    }

    fn request_url(
        &self,
        key: &str,
        cx: &str,
        query: &str,
        start: u32,
        page_size: u32,
        recency: RecencyWindow,
    ) -> Result<String> {
        let start = start.max(1).to_string();
        let num = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let recency = recency.to_string();
        let params = [
            ("key", key),
            ("cx", cx),
            ("q", query),
            ("start", start.as_str()),
            ("num", num.as_str()),
            ("dateRestrict", recency.as_str()),
            ("sort", "date"),
            ("filter", "1"),
            ("excludeTerms", SENIOR_EXCLUSION),
        ];
        let url = reqwest::Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| Error::config(format!("invalid search endpoint: {}", e)))?;
        Ok(url.into())
    }
}
