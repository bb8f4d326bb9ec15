//! Safe retrieval of a URL's text content.
//!
//! [`ContentFetcher`] is the seam the ingestion manager and web answer sources
//! depend on; [`HttpFetcher`] is the production implementation. Every hop
//! (including redirects, which are followed manually) goes through
//! [`guard::resolve_safe`] before a connection is made.

pub mod extract;
pub mod guard;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};

use crate::config::FetchConfig;
use crate::error::FetchError;
use guard::{SafeTarget, UrlPolicy};

/// Fetch a URL and return its extracted text.
///
/// `Ok(None)` means the page was reachable but its extracted text is below the
/// quality threshold. Callers treat that as a skip, not an error.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError>;
}

const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["text/html", "application/xhtml+xml", "text/plain"];

pub struct HttpFetcher {
    config: FetchConfig,
    policy: UrlPolicy,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            config: config.clone(),
            policy: UrlPolicy::from_config(config),
        }
    }

    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    /// A client that can only connect to the addresses the guard validated.
    fn client_for(&self, target: &SafeTarget) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .user_agent(self.config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none());
        if let Some(domain) = &target.domain {
            builder = builder.resolve_to_addrs(domain, &target.addrs);
        }
        builder.build().map_err(|e| FetchError::Network {
            url: target.url.to_string(),
            message: format!("failed to build HTTP client: {e}"),
        })
    }

    async fn read_body(
        &self,
        url: &str,
        mut response: reqwest::Response,
    ) -> Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(url, e))?
        {
            let room = self.config.max_body_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.config.max_body_bytes {
                tracing::debug!(url, limit = self.config.max_body_bytes, "body truncated");
                break;
            }
        }
        Ok(body)
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        let mut current = url.to_string();

        for hop in 0..=self.config.max_redirects {
            let target = guard::resolve_safe(&current, &self.policy)
                .await
                .map_err(|reason| {
                    tracing::warn!(url = %current, %reason, "fetch blocked by url guard");
                    FetchError::Disallowed {
                        url: current.clone(),
                        reason,
                    }
                })?;

            let client = self.client_for(&target)?;
            let response = client
                .get(target.url.clone())
                .send()
                .await
                .map_err(|e| request_error(&current, e))?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| FetchError::Network {
                        url: current.clone(),
                        message: format!("HTTP {} without a Location header", status.as_u16()),
                    })?;
                let next = target.url.join(location).map_err(|e| FetchError::Disallowed {
                    url: current.clone(),
                    reason: crate::error::UnsafeUrl::Malformed(e.to_string()),
                })?;
                tracing::debug!(from = %current, to = %next, hop, "following redirect");
                current = next.to_string();
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    url: current,
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| {
                    v.split(';')
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_ascii_lowercase()
                })
                .unwrap_or_default();
            if !content_type.is_empty() && !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
                return Err(FetchError::UnsupportedContentType {
                    url: current,
                    content_type,
                });
            }

            let body = self.read_body(&current, response).await?;
            let raw = String::from_utf8_lossy(&body);
            let text = if content_type == "text/plain" {
                extract::normalize_whitespace(&raw)
            } else {
                extract::extract_text(&raw)
            };

            let chars = text.chars().count();
            if chars < self.config.min_content_chars {
                tracing::info!(
                    url = %current,
                    chars,
                    min = self.config.min_content_chars,
                    "content below quality threshold"
                );
                return Ok(None);
            }

            tracing::debug!(url = %current, chars, "fetched content");
            return Ok(Some(text));
        }

        Err(FetchError::TooManyRedirects {
            url: url.to_string(),
            limit: self.config.max_redirects,
        })
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
