use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while searching, fetching, parsing or storing postings.
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting (usually a credential) is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// The request never produced a response (timeout, DNS, connection reset, ...)
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Still rate limited after the last retry
    #[error("Search API still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    /// An element or field the parser depends on is not in the document
    #[error("{url}: missing {element}")]
    MissingElement { url: String, element: String },

    /// The document is there but cannot be decoded
    #[error("{url}: invalid document: {reason}")]
    InvalidDocument { url: String, reason: String },

    /// The source explicitly reports nothing for this identifier
    #[error("{url}: source returned no posting")]
    NoData { url: String },

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn missing(url: &str, element: impl Into<String>) -> Self {
        Self::MissingElement {
            url: url.to_string(),
            element: element.into(),
        }
    }

    pub fn invalid(url: &str, reason: impl ToString) -> Self {
        Self::InvalidDocument {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short label used as the `kind` field in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Http { .. } | Error::Request { .. } => "transport",
            Error::RateLimitExhausted { .. } => "rate_limit",
            Error::MissingElement { .. } | Error::InvalidDocument { .. } => "structure",
            Error::NoData { .. } => "upstream",
            Error::Storage(_) => "storage",
        }
    }

    /// Errors that end a whole pipeline run rather than just one link.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::RateLimitExhausted { .. } | Error::Storage(_)
        )
    }
}
