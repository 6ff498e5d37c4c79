use std::time::Duration;

use crate::error::{Error, Result};

pub const USER_AGENT: &str = "job-scraper-bot/1.0";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Status and body of a completed request. Non-2xx statuses are still `Ok` at this layer
/// so callers can decide what to retry.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Http {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

// --- Transport trait ---

pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse>;
    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse>;
}

#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn finish(url: &str, response: reqwest::blocking::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().map_err(|source| Error::Request {
            url: url.to_string(),
            source,
        })?;
        Self::finish(url, response)
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|source| Error::Request {
                url: url.to_string(),
                source,
            })?;
        Self::finish(url, response)
    }
}

// --- Sleeping ---

/// Anything that pauses between outbound requests. Swapped for a recorder in tests.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted fakes shared by the module tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Get(String),
        Post(String, serde_json::Value),
    }

    /// Answers from a per-URL queue of responses; the last response for a URL repeats.
    /// URLs are matched on everything before the query string.
    #[derive(Default)]
    pub struct FakeHttp {
        routes: RefCell<HashMap<String, VecDeque<HttpResponse>>>,
        pub calls: RefCell<Vec<Call>>,
    }

    impl FakeHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, url: &str, status: u16, body: impl Into<String>) -> &Self {
            self.routes
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(HttpResponse {
                    status,
                    body: body.into(),
                });
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn next(&self, url: &str) -> Result<HttpResponse> {
            let key = url.split('?').next().unwrap_or(url);
            let mut routes = self.routes.borrow_mut();
            let queue = routes.get_mut(key).ok_or_else(|| Error::Http {
                url: url.to_string(),
                status: 404,
            })?;
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                queue.front().cloned().ok_or_else(|| Error::Http {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }
    }

    impl HttpClient for FakeHttp {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            self.calls.borrow_mut().push(Call::Get(url.to_string()));
            self.next(url)
        }

        fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
            self.calls
                .borrow_mut()
                .push(Call::Post(url.to_string(), body.clone()));
            self.next(url)
        }
    }

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.borrow_mut().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status_passes_2xx() {
        let ok = HttpResponse { status: 204, body: String::new() };
        assert!(ok.error_for_status("https://example.com").is_ok());
    }

    #[test]
    fn test_error_for_status_reports_status_and_url() {
        let resp = HttpResponse { status: 404, body: "nope".into() };
        match resp.error_for_status("https://example.com/x") {
            Err(Error::Http { url, status }) => {
                assert_eq!(url, "https://example.com/x");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
