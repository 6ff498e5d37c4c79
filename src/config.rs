use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::search::RecencyWindow;

pub const DEFAULT_QUERY: &str = "\"data engineer\"";
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Credentials for the custom search API. Either may be absent until a search is attempted.
#[derive(Debug, Clone, Default)]
pub struct SearchCredentials {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
}

impl SearchCredentials {
    #[cfg(test)]
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            engine_id: Some(engine_id.into()),
        }
    }

    /// Both credentials, or a configuration error naming whichever are missing.
    pub fn require(&self) -> Result<(&str, &str)> {
        let key = self.api_key.as_deref().filter(|s| !s.trim().is_empty());
        let cx = self.engine_id.as_deref().filter(|s| !s.trim().is_empty());
        match (key, cx) {
            (Some(key), Some(cx)) => Ok((key, cx)),
            (None, Some(_)) => Err(Error::config("GOOGLE_API_KEY must be set")),
            (Some(_), None) => Err(Error::config("GOOGLE_CX must be set")),
            (None, None) => Err(Error::config("GOOGLE_API_KEY and GOOGLE_CX must be set")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: SearchCredentials,
    pub query: String,
    pub recency: RecencyWindow,
    pub politeness_delay: Duration,
    pub db_path: PathBuf,
}

impl Config {
    /// Read settings from the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let credentials = SearchCredentials {
            api_key: lookup("GOOGLE_API_KEY"),
            engine_id: lookup("GOOGLE_CX"),
        };

        let query = lookup("JOBSCRAPE_QUERY")
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        let recency = match lookup("JOBSCRAPE_RECENCY") {
            Some(code) => code.parse()?,
            None => RecencyWindow::default(),
        };

        let delay_ms = match lookup("JOBSCRAPE_DELAY_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::config(format!("JOBSCRAPE_DELAY_MS is not a number: {:?}", raw)))?,
            None => DEFAULT_DELAY_MS,
        };

        let db_path = match lookup("JOBSCRAPE_DB") {
            Some(path) => PathBuf::from(path),
            None => default_db_path(),
        };

        Ok(Self {
            credentials,
            query,
            recency,
            politeness_delay: Duration::from_millis(delay_ms),
            db_path,
        })
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobscrape") {
        proj_dirs.data_dir().join("jobscrape.db")
    } else {
        PathBuf::from("jobscrape.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.query, DEFAULT_QUERY);
        assert_eq!(config.recency, RecencyWindow::Days(7));
        assert_eq!(config.politeness_delay, Duration::from_millis(1000));
        assert!(config.credentials.api_key.is_none());
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("GOOGLE_CX", "cx"),
            ("JOBSCRAPE_QUERY", "\"analytics engineer\""),
            ("JOBSCRAPE_RECENCY", "w2"),
            ("JOBSCRAPE_DELAY_MS", "250"),
            ("JOBSCRAPE_DB", "/tmp/jobs.db"),
        ]))
        .unwrap();
        assert_eq!(config.credentials.require().unwrap(), ("k", "cx"));
        assert_eq!(config.query, "\"analytics engineer\"");
        assert_eq!(config.recency, RecencyWindow::Weeks(2));
        assert_eq!(config.politeness_delay, Duration::from_millis(250));
        assert_eq!(config.db_path, PathBuf::from("/tmp/jobs.db"));
    }

    #[test]
    fn test_bad_delay_is_config_error() {
        let err = Config::from_lookup(lookup(&[("JOBSCRAPE_DELAY_MS", "soon")])).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_require_names_missing_credentials() {
        let none = SearchCredentials::default();
        assert!(none.require().unwrap_err().to_string().contains("GOOGLE_API_KEY and GOOGLE_CX"));

        let no_cx = SearchCredentials {
            api_key: Some("k".into()),
            engine_id: None,
        };
        assert!(no_cx.require().unwrap_err().to_string().contains("GOOGLE_CX"));

        let blank_key = SearchCredentials {
            api_key: Some("  ".into()),
            engine_id: Some("cx".into()),
        };
        assert!(blank_key.require().unwrap_err().to_string().contains("GOOGLE_API_KEY"));
    }
}
