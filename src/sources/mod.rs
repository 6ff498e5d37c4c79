//! Job-board sources and their parsers.
//!
//! Each supported board gets its own module that turns a posting URL into a
//! [`ParsedPosting`]. Which one runs is decided purely from the shape of the URL
//! by [`SourceKind::classify`]; anything not recognised is simply not ingestable.

pub mod ashby;
pub mod greenhouse;
pub mod lever;

use chrono::NaiveDate;
use std::fmt;

use crate::error::Result;
use crate::http::HttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Greenhouse,
    Lever,
    Ashby,
}

impl SourceKind {
    /// Pick the parser for a link by substring match on the URL.
    pub fn classify(url: &str) -> Option<SourceKind> {
        if url.contains("greenhouse") {
            Some(SourceKind::Greenhouse)
        } else if url.contains("lever") {
            Some(SourceKind::Lever)
        } else if url.contains("ashbyhq") {
            Some(SourceKind::Ashby)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Greenhouse => "greenhouse",
            SourceKind::Lever => "lever",
            SourceKind::Ashby => "ashby",
        }
    }

    /// Fetch and extract the posting at `url` using this source's strategy.
    pub fn parse(self, http: &dyn HttpClient, url: &str) -> Result<ParsedPosting> {
        match self {
            SourceKind::Greenhouse => greenhouse::parse(http, url),
            SourceKind::Lever => lever::parse(http, url),
            SourceKind::Ashby => ashby::parse(http, url),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields extracted from one posting. Strings are empty rather than absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPosting {
    pub company: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub posted_date: Option<NaiveDate>,
    pub source: SourceKind,
}

/// Canonical form of a search hit's URL.
///
/// Lever links often point at a sub-page (`/apply`) or carry tracking parameters, so they
/// are cut back to `scheme://host/company/posting`. Other sources are left alone.
pub fn normalize_url(url: &str) -> String {
    if !url.contains("lever") {
        return url.to_string();
    }
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query.split('/').take(5).collect::<Vec<_>>().join("/")
}

/// The `index`th piece of `url` split on `/` (0 = scheme, 2 = host, 3 = first path segment).
pub(crate) fn url_segment(url: &str, index: usize) -> Option<&str> {
    url.split('/').nth(index).filter(|s| !s.is_empty())
}

/// The company slug, always the first path segment on every supported board.
pub(crate) fn company_from_url(url: &str) -> String {
    url_segment(url, 3).unwrap_or_default().to_string()
}

/// Dates come as `2024-01-15` or a full timestamp; only the day matters.
pub(crate) fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
