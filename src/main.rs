mod config;
mod db;
mod error;
mod http;
mod location;
mod models;
mod pipeline;
mod search;
mod sources;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use config::Config;
use db::Database;
use http::{ReqwestClient, ThreadSleeper};
use models::{StoreKind, StoredPosting};
use pipeline::{IngestionPipeline, RunOptions, RunStats};
use search::{RecencyWindow, SearchClient};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobscrape")]
#[command(about = "Find job postings via web search, parse them, and keep the ones worth applying to")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Search for new postings and store them
    Scrape {
        /// Search query (defaults to JOBSCRAPE_QUERY or "data engineer")
        #[arg(short, long)]
        query: Option<String>,

        /// Recency window, e.g. d7, w2, m1
        #[arg(short, long)]
        recency: Option<RecencyWindow>,

        /// Pause between posting fetches, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Fetch and classify without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored postings
    List {
        /// Show rejected postings instead of accepted ones
        #[arg(long)]
        rejected: bool,

        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,

        /// Only postings already applied to
        #[arg(long)]
        applied: bool,
    },

    /// Show a stored posting
    Show {
        /// Posting URL
        url: String,
    },

    /// Mark an accepted posting as applied to
    Applied {
        /// Posting URL
        url: String,

        /// Date applied (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Clear the applied flag instead
        #[arg(long)]
        undo: bool,
    },

    /// Forget a posting so the next scrape processes it again
    Forget {
        /// Posting URL
        url: String,
    },

    /// Move an accepted posting to the rejected store
    Reject {
        /// Posting URL
        url: String,
    },

    /// Manage the company blocklist
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Manage the location blocklist
    Location {
        #[command(subcommand)]
        command: LocationCommands,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Block a company and move its accepted postings to rejected
    Block {
        /// Company slug as it appears in posting URLs
        name: String,
    },

    /// Remove a company from the blocklist
    Unblock {
        name: String,
    },

    /// List blocked companies
    List,
}

#[derive(Subcommand)]
enum LocationCommands {
    /// Block locations containing this text (case-insensitive)
    Add {
        pattern: String,
    },

    /// Remove a blocked location pattern
    Remove {
        pattern: String,
    },

    /// List blocked location patterns
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscrape=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Scrape {
            query,
            recency,
            delay_ms,
            dry_run,
        } => {
            db.ensure_initialized()?;
            config.credentials.require()?;

            let http = ReqwestClient::new()?;
            let sleeper = ThreadSleeper;
            let search = SearchClient::new(&http, &sleeper, config.credentials.clone());
            let options = RunOptions {
                query: query.unwrap_or_else(|| config.query.clone()),
                recency: recency.unwrap_or(config.recency),
                politeness_delay: delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(config.politeness_delay),
                dry_run,
                ..RunOptions::new(String::new())
            };

            println!("Searching for {} ({})...", options.query, options.recency);
            let pipeline = IngestionPipeline::new(&search, &http, &db, &sleeper, options);
            match pipeline.run() {
                Ok(stats) => print_run_summary(&stats, dry_run),
                Err(aborted) => {
                    print_run_summary(&aborted.stats, dry_run);
                    return Err(anyhow!(aborted));
                }
            }
        }

        Commands::List {
            rejected,
            company,
            applied,
        } => {
            db.ensure_initialized()?;
            let store = if rejected {
                StoreKind::Rejected
            } else {
                StoreKind::Accepted
            };
            let postings = db.list(store, company.as_deref(), applied)?;
            if postings.is_empty() {
                println!("No {} postings found.", store);
            } else {
                println!(
                    "{:<3} {:<30} {:<18} {:<22} {:<10} {}",
                    "", "TITLE", "COMPANY", "LOCATION", "POSTED", "URL"
                );
                println!("{}", "-".repeat(110));
                for posting in postings {
                    print_posting_row(&posting);
                }
            }
        }

        Commands::Show { url } => {
            db.ensure_initialized()?;
            let posting = match db.get(StoreKind::Accepted, &url)? {
                Some(p) => Some(p),
                None => db.get(StoreKind::Rejected, &url)?,
            };
            match posting {
                Some(posting) => print_posting(&posting),
                None => println!("No posting stored for {}", url),
            }
        }

        Commands::Applied { url, date, undo } => {
            db.ensure_initialized()?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            if !db.set_applied(&url, !undo, Some(date))? {
                return Err(anyhow!("{} is not an accepted posting", url));
            }
            if undo {
                println!("Cleared applied flag on {}", url);
            } else {
                println!("Marked {} as applied on {}", url, date);
            }
        }

        Commands::Forget { url } => {
            db.ensure_initialized()?;
            let accepted = db.delete(StoreKind::Accepted, &url)?;
            let rejected = db.delete(StoreKind::Rejected, &url)?;
            if accepted || rejected {
                println!("Forgot {}", url);
            } else {
                println!("No posting stored for {}", url);
            }
        }

        Commands::Reject { url } => {
            db.ensure_initialized()?;
            if db.move_to_rejected(&url)? {
                println!("Moved {} to rejected.", url);
            } else {
                println!("{} is not an accepted posting.", url);
            }
        }

        Commands::Company { command } => {
            db.ensure_initialized()?;
            match command {
                CompanyCommands::Block { name } => {
                    if !db.block_company(&name)? {
                        println!("'{}' was already blocked.", name);
                    }
                    for posting in db.filter_by_company(StoreKind::Accepted, &name)? {
                        println!(" - {} | {}", posting.title, posting.url);
                    }
                    let moved = db.move_company_to_rejected(&name)?;
                    println!("Blocked '{}'. Moved {} posting(s) to rejected.", name, moved);
                }

                CompanyCommands::Unblock { name } => {
                    if db.unblock_company(&name)? {
                        println!("Unblocked '{}'.", name);
                    } else {
                        println!("'{}' was not blocked.", name);
                    }
                }

                CompanyCommands::List => {
                    let companies = db.blocked_companies()?;
                    if companies.is_empty() {
                        println!("No blocked companies.");
                    }
                    for name in companies {
                        println!("{}", name);
                    }
                }
            }
        }

        Commands::Location { command } => {
            db.ensure_initialized()?;
            match command {
                LocationCommands::Add { pattern } => {
                    if pattern.trim().is_empty() {
                        return Err(anyhow!("Location pattern cannot be empty"));
                    }
                    if db.add_blocked_location(&pattern)? {
                        println!("Blocking locations containing '{}'.", pattern.trim());
                    } else {
                        println!("'{}' is already blocked.", pattern.trim());
                    }
                }

                LocationCommands::Remove { pattern } => {
                    if db.remove_blocked_location(&pattern)? {
                        println!("Removed '{}'.", pattern.trim());
                    } else {
                        println!("'{}' was not blocked.", pattern.trim());
                    }
                }

                LocationCommands::List => {
                    let patterns = db.blocked_locations()?;
                    if patterns.is_empty() {
                        println!("No extra blocked locations.");
                    }
                    for pattern in patterns {
                        println!("{}", pattern);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_run_summary(stats: &RunStats, dry_run: bool) {
    println!("\nResults:");
    println!("  Pages searched:  {}", stats.pages);
    println!("  Accepted:        {}", stats.admitted());
    println!("  Rejected:        {}", stats.rejected);
    println!("  Already known:   {}", stats.known);
    println!("  Unsupported:     {}", stats.unsupported);
    if stats.failed > 0 {
        println!("  Failed:          {}", stats.failed);
    }
    for admitted in &stats.accepted {
        println!(" - {} | {}", admitted.title, admitted.url);
    }
    if dry_run {
        println!("\n(Dry run - nothing was stored)");
    }
}

fn print_posting_row(posting: &StoredPosting) {
    let applied = if posting.is_applied { "[x]" } else { "" };
    let posted = posting
        .posted_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<3} {:<30} {:<18} {:<22} {:<10} {}",
        applied,
        truncate(&posting.title, 28),
        truncate(&posting.company, 16),
        truncate(&posting.location, 20),
        posted,
        posting.url
    );
}

fn print_posting(posting: &StoredPosting) {
    println!("#{} {} ({})", posting.id, posting.title, posting.store);
    println!("URL: {}", posting.url);
    println!("Company: {}", posting.company);
    if !posting.location.is_empty() {
        println!("Location: {}", posting.location);
    }
    println!("Source: {}", posting.source);
    if let Some(date) = posting.posted_date {
        println!("Posted: {}", date);
    }
    println!("Scraped: {}", posting.scraped_at.format("%Y-%m-%d %H:%M"));
    if posting.store == StoreKind::Accepted {
        match (posting.is_applied, posting.apply_date) {
            (true, Some(date)) => println!("Applied: {}", date),
            (true, None) => println!("Applied: yes"),
            (false, _) => println!("Applied: no"),
        }
    }
    if !posting.description.is_empty() {
        println!("\n--- Description ---\n{}", posting.description);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
