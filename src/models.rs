use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

use crate::sources::ParsedPosting;

/// The two terminal destinations for a posting. Both share one record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Accepted,
    Rejected,
}

impl StoreKind {
    pub fn table(&self) -> &'static str {
        match self {
            StoreKind::Accepted => "accepted_postings",
            StoreKind::Rejected => "rejected_postings",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Accepted => f.write_str("accepted"),
            StoreKind::Rejected => f.write_str("rejected"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredPosting {
    pub id: i64,
    pub store: StoreKind,
    pub url: String,
    pub company: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub posted_date: Option<NaiveDate>,
    pub source: String, // "greenhouse", "lever", "ashby"
    pub scraped_at: DateTime<Utc>,
    pub is_applied: bool,             // accepted store only
    pub apply_date: Option<NaiveDate>, // accepted store only
}

/// A posting about to be written; `scraped_at` is stamped by the database layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPosting {
    pub url: String,
    pub company: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub posted_date: Option<NaiveDate>,
    pub source: String,
}

impl NewPosting {
    pub fn from_parsed(url: &str, parsed: ParsedPosting) -> Self {
        Self {
            url: url.to_string(),
            company: parsed.company,
            title: parsed.title,
            location: parsed.location,
            description: parsed.description,
            posted_date: parsed.posted_date,
            source: parsed.source.as_str().to_string(),
        }
    }
}
