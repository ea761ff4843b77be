//! Scrape-side HTTP access to status report pages.
//!
//! Collectors depend on the [`Fetch`] trait rather than on a concrete HTTP
//! client, so scrape transport can be swapped out in tests. [`HttpFetcher`]
//! is the production implementation: one plain GET per cycle, no retries,
//! no caching of prior responses.

use thiserror::Error;

/// Errors raised while fetching a status report.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("requesting {url}: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("expected 200 response from {url}, got {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("reading response body from {url}: {source}")]
    Body {
        url: String,
        source: reqwest::Error,
    },
}

/// Supplies raw status report bytes for one collection cycle.
pub trait Fetch: Send + Sync {
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// Fetches a status report page over HTTP.
#[derive(Debug)]
pub struct HttpFetcher {
    http: reqwest::blocking::Client,
    url: String,
}

impl HttpFetcher {
    /// Creates a fetcher for the given status page URL.
    pub fn new(http: reqwest::blocking::Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    /// Returns the scrape URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .map_err(|source| FetchError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let body = response.bytes().map_err(|source| FetchError::Body {
            url: self.url.clone(),
            source,
        })?;

        Ok(body.to_vec())
    }
}
