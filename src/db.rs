use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{NewPosting, StoreKind, StoredPosting};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS accepted_postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                company TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                posted_date TEXT,
                source TEXT NOT NULL DEFAULT '',
                scraped_at TEXT NOT NULL,
                is_applied INTEGER NOT NULL DEFAULT 0,
                apply_date TEXT
            );

            CREATE TABLE IF NOT EXISTS rejected_postings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                company TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                posted_date TEXT,
                source TEXT NOT NULL DEFAULT '',
                scraped_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS blocked_companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE
            );

            CREATE TABLE IF NOT EXISTS blocked_locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pattern TEXT NOT NULL UNIQUE COLLATE NOCASE
            );

            CREATE INDEX IF NOT EXISTS idx_accepted_company ON accepted_postings(company);
            CREATE INDEX IF NOT EXISTS idx_rejected_company ON rejected_postings(company);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='accepted_postings'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(Error::config(
                "Database not initialized. Run 'jobscrape init' first.",
            ));
        }
        Ok(())
    }

    // --- Posting operations ---

    pub fn exists(&self, store: StoreKind, url: &str) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE url = ?1)", store.table());
        let found: bool = self.conn.query_row(&sql, [url], |row| row.get(0))?;
        Ok(found)
    }

    /// Whether `url` has already been through the pipeline, whichever way it went.
    pub fn is_known(&self, url: &str) -> Result<bool> {
        Ok(self.exists(StoreKind::Accepted, url)? || self.exists(StoreKind::Rejected, url)?)
    }

    pub fn create(&self, store: StoreKind, posting: &NewPosting) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} (url, company, title, location, description, posted_date, source, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            store.table()
        );
        self.conn.execute(
            &sql,
            params![
                posting.url,
                posting.company,
                posting.title,
                posting.location,
                posting.description,
                posting.posted_date,
                posting.source,
                Utc::now(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete(&self, store: StoreKind, url: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE url = ?1", store.table());
        Ok(self.conn.execute(&sql, [url])? > 0)
    }

    pub fn get(&self, store: StoreKind, url: &str) -> Result<Option<StoredPosting>> {
        let sql = format!("{} WHERE url = ?1", Self::select_sql(store));
        self.conn
            .query_row(&sql, [url], |row| Self::row_to_posting(row, store))
            .optional()
            .map_err(Error::from)
    }

    pub fn filter_by_company(&self, store: StoreKind, company: &str) -> Result<Vec<StoredPosting>> {
        self.list(store, Some(company), false)
    }

    pub fn list(
        &self,
        store: StoreKind,
        company: Option<&str>,
        applied_only: bool,
    ) -> Result<Vec<StoredPosting>> {
        let mut sql = format!("{} WHERE 1=1", Self::select_sql(store));
        if company.is_some() {
            sql.push_str(" AND LOWER(company) = LOWER(?1)");
        }
        if applied_only && store == StoreKind::Accepted {
            sql.push_str(" AND is_applied = 1");
        }
        sql.push_str(" ORDER BY scraped_at DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let to_posting = |row: &rusqlite::Row<'_>| Self::row_to_posting(row, store);
        let rows = match company {
            Some(name) => stmt.query_map([name], to_posting)?,
            None => stmt.query_map([], to_posting)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mark an accepted posting as applied to (dated `date`) or not. Returns false if unknown.
    pub fn set_applied(&self, url: &str, applied: bool, date: Option<NaiveDate>) -> Result<bool> {
        let date = if applied { date } else { None };
        let updated = self.conn.execute(
            "UPDATE accepted_postings SET is_applied = ?1, apply_date = ?2 WHERE url = ?3",
            params![applied, date, url],
        )?;
        Ok(updated > 0)
    }

    /// Move every accepted posting of `company` into the rejected store, returning how many
    /// left the accepted store. Safe to repeat: a second call finds nothing and returns 0.
    pub fn move_company_to_rejected(&self, company: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO rejected_postings
                 (url, company, title, location, description, posted_date, source, scraped_at)
             SELECT url, company, title, location, description, posted_date, source, ?2
             FROM accepted_postings WHERE LOWER(company) = LOWER(?1)",
            params![company, Utc::now()],
        )?;
        let moved = tx.execute(
            "DELETE FROM accepted_postings WHERE LOWER(company) = LOWER(?1)",
            [company],
        )?;
        tx.commit()?;
        Ok(moved)
    }

    /// Move a single accepted posting into the rejected store. Returns false if it was not accepted.
    pub fn move_to_rejected(&self, url: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO rejected_postings
                 (url, company, title, location, description, posted_date, source, scraped_at)
             SELECT url, company, title, location, description, posted_date, source, ?2
             FROM accepted_postings WHERE url = ?1",
            params![url, Utc::now()],
        )?;
        let moved = tx.execute("DELETE FROM accepted_postings WHERE url = ?1", [url])?;
        tx.commit()?;
        Ok(moved > 0)
    }

    fn select_sql(store: StoreKind) -> String {
        let applied_columns = match store {
            StoreKind::Accepted => "is_applied, apply_date",
            StoreKind::Rejected => "0, NULL",
        };
        format!(
            "SELECT id, url, company, title, location, description, posted_date, source, scraped_at, {}
             FROM {}",
            applied_columns,
            store.table()
        )
    }

    fn row_to_posting(row: &rusqlite::Row, store: StoreKind) -> rusqlite::Result<StoredPosting> {
        Ok(StoredPosting {
            id: row.get(0)?,
            store,
            url: row.get(1)?,
            company: row.get(2)?,
            title: row.get(3)?,
            location: row.get(4)?,
            description: row.get(5)?,
            posted_date: row.get(6)?,
            source: row.get(7)?,
            scraped_at: row.get(8)?,
            is_applied: row.get(9)?,
            apply_date: row.get(10)?,
        })
    }

    // --- Blocklists ---

    /// Add a company to the blocklist. Returns false if it was already there.
    pub fn block_company(&self, name: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO blocked_companies (name) VALUES (?1)",
            [name.trim()],
        )?;
        Ok(inserted > 0)
    }

    pub fn unblock_company(&self, name: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM blocked_companies WHERE name = ?1", [name.trim()])?;
        Ok(removed > 0)
    }

    pub fn blocked_companies(&self) -> Result<Vec<String>> {
        self.strings("SELECT name FROM blocked_companies ORDER BY name")
    }

    /// Blocked company names, lowercased for membership checks.
    pub fn blocked_company_set(&self) -> Result<HashSet<String>> {
        Ok(self
            .blocked_companies()?
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect())
    }

    pub fn add_blocked_location(&self, pattern: &str) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO blocked_locations (pattern) VALUES (?1)",
            [pattern.trim()],
        )?;
        Ok(inserted > 0)
    }

    pub fn remove_blocked_location(&self, pattern: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM blocked_locations WHERE pattern = ?1",
            [pattern.trim()],
        )?;
        Ok(removed > 0)
    }

    pub fn blocked_locations(&self) -> Result<Vec<String>> {
        self.strings("SELECT pattern FROM blocked_locations ORDER BY pattern")
    }

    fn strings(&self, sql: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }
}
