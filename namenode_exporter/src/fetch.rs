//! Remote status fetcher
//!
//! One bounded GET per call against the NameNode JMX servlet. There are no
//! retries: a failed fetch surfaces to the monitoring system as `up = 0` for
//! that scrape.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{StatusCode, Url};
use tracing::debug;

/// Errors produced by [`Fetcher`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    /// Connecting, sending or waiting on the request failed, timeout included.
    #[error("Request to {url} failed: {source}")]
    Request {
        /// The URL requested
        url: Url,
        /// The underlying failure
        #[source]
        source: reqwest::Error,
    },
    /// The servlet answered with something other than 200.
    #[error("HTTP status code {0}")]
    Status(StatusCode),
    /// The response body could not be read in full.
    #[error("Failed to read response body: {0}")]
    Body(reqwest::Error),
}

/// Fetches the raw JMX document.
///
/// The underlying client keeps a connection pool and is shared by every
/// collection cycle. Dropping the future returned by [`Fetcher::fetch`]
/// aborts the request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    url: Url,
}

impl Fetcher {
    /// Create a new [`Fetcher`]
    ///
    /// `timeout` bounds the whole request, from connection setup to the last
    /// byte of the body.
    ///
    /// # Errors
    ///
    /// Function will return an error if the TLS backend cannot be
    /// initialized.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client, url })
    }

    /// Issue one GET and return the full body.
    ///
    /// # Errors
    ///
    /// Function will return an error if the request fails or times out, if
    /// the status is not 200, or if the body cannot be read.
    pub async fn fetch(&self) -> Result<Bytes, Error> {
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|source| Error::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            // Drain so the connection goes back to the pool.
            if let Err(err) = resp.bytes().await {
                debug!("failed to drain response from {}: {err}", self.url);
            }
            return Err(Error::Status(status));
        }

        resp.bytes().await.map_err(Error::Body)
    }
}
