// src/ingest/fetch.rs
//! HTTP(S) feed retrieval with explicit, bounded redirect following.

use std::time::Duration;

use anyhow::Context;
use reqwest::{header::LOCATION, redirect::Policy, Url};

use crate::ingest::types::FeedFetcher;

const USER_AGENT: &str = "flux-dashboard/0.1 (+rss aggregator)";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("malformed source url {url:?}: {reason}")]
    MalformedUrl { url: String, reason: String },
    #[error("bad status {status} for {url}")]
    BadStatus { status: u16, url: String },
    #[error("gave up after {limit} redirects starting at {url}")]
    TooManyRedirects { url: String, limit: usize },
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Accept only absolute http/https URLs.
pub fn parse_feed_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::MalformedUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::MalformedUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    max_redirects: usize,
}

impl HttpFetcher {
    /// `timeout` bounds each individual request, so a hanging server only
    /// stalls its own source.
    pub fn new(timeout: Duration, max_redirects: usize) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            client,
            max_redirects,
        })
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut current = parse_feed_url(url)?;
        let mut hops = 0usize;

        loop {
            let resp = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| FetchError::Transport {
                    url: current.to_string(),
                    source: e,
                })?;
            let status = resp.status();

            // A 3xx without Location (e.g. 304) falls through to the status check.
            let location = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .filter(|_| status.is_redirection())
                .map(str::to_owned);

            if let Some(location) = location {
                if hops >= self.max_redirects {
                    return Err(FetchError::TooManyRedirects {
                        url: url.to_string(),
                        limit: self.max_redirects,
                    });
                }
                // Location may be relative to the URL that answered.
                let next = current
                    .join(&location)
                    .map_err(|e| FetchError::MalformedUrl {
                        url: location.clone(),
                        reason: e.to_string(),
                    })
                    .and_then(|u| parse_feed_url(u.as_str()))?;
                tracing::debug!(
                    target: "ingest",
                    from = %current,
                    to = %next,
                    status = status.as_u16(),
                    "following feed redirect"
                );
                current = next;
                hops += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::BadStatus {
                    status: status.as_u16(),
                    url: current.to_string(),
                });
            }

            return resp.text().await.map_err(|e| FetchError::Transport {
                url: current.to_string(),
                source: e,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_feed_url("http://example.org/rss").is_ok());
        assert!(parse_feed_url("  https://example.org/atom.xml ").is_ok());
    }

    #[test]
    fn rejects_garbage_and_other_schemes() {
        assert!(matches!(
            parse_feed_url("not a url"),
            Err(FetchError::MalformedUrl { .. })
        ));
        let err = parse_feed_url("ftp://example.org/feed").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[tokio::test]
    async fn malformed_url_fails_before_any_io() {
        let f = HttpFetcher::new(Duration::from_secs(1), 3).unwrap();
        let err = f.fetch("feed.example.org/rss").await.unwrap_err();
        assert!(matches!(err, FetchError::MalformedUrl { .. }));
    }
}
