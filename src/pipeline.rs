use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Sleeper};
use crate::location;
use crate::models::{NewPosting, StoreKind};
use crate::search::{CandidateLink, RecencyWindow, SearchClient, MAX_PAGE_SIZE};
use crate::sources::{normalize_url, SourceKind};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub query: String,
    pub page_size: u32,
    pub recency: RecencyWindow,
    pub politeness_delay: Duration,
    /// Fetch and classify, but write nothing.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: MAX_PAGE_SIZE,
            recency: RecencyWindow::default(),
            politeness_delay: Duration::from_secs(1),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub pages: usize,
    pub accepted: Vec<Admitted>,
    pub rejected: usize,
    pub known: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn admitted(&self) -> usize {
        self.accepted.len()
    }
}

/// A run stopped early. Everything written before the failure stays written.
#[derive(thiserror::Error, Debug)]
#[error("run aborted after admitting {} posting(s): {source}", .stats.admitted())]
pub struct RunAborted {
    pub stats: RunStats,
    #[source]
    pub source: Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    BlockedLocation,
    BlockedCompany,
}

/// Decide which store a posting belongs in. `blocked_companies` must be lowercase.
pub fn classify(
    posting: &NewPosting,
    extra_blocked: &HashSet<String>,
    blocked_companies: &HashSet<String>,
) -> Verdict {
    if blocked_companies.contains(&posting.company.to_lowercase()) {
        Verdict::BlockedCompany
    } else if !location::is_allowed(&posting.location, extra_blocked) {
        Verdict::BlockedLocation
    } else {
        Verdict::Accept
    }
}

struct Blocklists {
    locations: HashSet<String>,
    companies: HashSet<String>,
}

pub struct IngestionPipeline<'a> {
    search: &'a SearchClient<'a>,
    http: &'a dyn HttpClient,
    db: &'a Database,
    sleeper: &'a dyn Sleeper,
    options: RunOptions,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        search: &'a SearchClient<'a>,
        http: &'a dyn HttpClient,
        db: &'a Database,
        sleeper: &'a dyn Sleeper,
        options: RunOptions,
    ) -> Self {
        Self {
            search,
            http,
            db,
            sleeper,
            options,
        }
    }

    /// Page through search results until they run out, storing every new posting.
    ///
    /// A posting that fails to fetch or parse is logged and skipped. Search, configuration
    /// and database failures end the run; the error carries what was done up to that point.
    pub fn run(&self) -> std::result::Result<RunStats, RunAborted> {
        let mut stats = RunStats::default();
        match self.run_pages(&mut stats) {
            Ok(()) => Ok(stats),
            Err(source) => Err(RunAborted { stats, source }),
        }
    }

    fn run_pages(&self, stats: &mut RunStats) -> Result<()> {
        let blocklists = Blocklists {
            locations: self.db.blocked_locations()?.into_iter().collect(),
            companies: self.db.blocked_company_set()?,
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut start = 1;

        loop {
            info!(start, query = %self.options.query, "fetching search results");
            let page = self.search.search(
                &self.options.query,
                start,
                self.options.page_size,
                self.options.recency,
            )?;
            stats.pages += 1;

            if page.links.is_empty() {
                break;
            }

            for link in &page.links {
                self.process_link(link, &blocklists, &mut seen, stats)?;
            }

            match page.next_start {
                Some(next) if next > start => start = next,
                _ => break,
            }
        }

        Ok(())
    }

    fn process_link(
        &self,
        link: &CandidateLink,
        blocklists: &Blocklists,
        seen: &mut HashSet<String>,
        stats: &mut RunStats,
    ) -> Result<()> {
        let url = normalize_url(&link.url);

        if !seen.insert(url.clone()) || self.db.is_known(&url)? {
            debug!(url = %url, "already processed");
            stats.known += 1;
            return Ok(());
        }

        let Some(source) = SourceKind::classify(&url) else {
            debug!(url = %url, snippet = link.snippet.as_deref().unwrap_or(""), "unsupported source");
            stats.unsupported += 1;
            return Ok(());
        };

        let result = source.parse(self.http, &url);
        // don't hammer the job boards
        self.sleeper.sleep(self.options.politeness_delay);

        let parsed = match result {
            Ok(parsed) => parsed,
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => {
                warn!(url = %url, source = %source, kind = e.kind(), error = %e, "failed to fetch posting");
                stats.failed += 1;
                return Ok(());
            }
        };

        let mut posting = NewPosting::from_parsed(&url, parsed);
        if posting.title.is_empty() {
            if let Some(hint) = &link.title {
                posting.title = hint.trim().to_string();
            }
        }

        match classify(&posting, &blocklists.locations, &blocklists.companies) {
            Verdict::Accept => {
                info!(url = %url, title = %posting.title, location = %posting.location, "accepted");
                if !self.options.dry_run {
                    self.db.create(StoreKind::Accepted, &posting)?;
                }
                stats.accepted.push(Admitted {
                    url,
                    title: posting.title,
                });
            }
            verdict => {
                info!(url = %url, location = %posting.location, company = %posting.company, ?verdict, "rejected");
                if !self.options.dry_run {
                    self.db.create(StoreKind::Rejected, &posting)?;
                }
                stats.rejected += 1;
            }
        }

        Ok(())
    }
}
