//! Outbound HTTP client for relay fetches.
//!
//! One `UpstreamFetcher` is built per configuration and shared by every
//! request; it owns the connection pool and the redirect policy.

use std::time::Duration;

use axum::http::header::{InvalidHeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use axum::http::HeaderValue;
use reqwest::redirect::Policy;

use crate::config::UpstreamConfig;
use crate::upstream::outcome::{
    FetchError, UpstreamOutcome, UpstreamResponse, FALLBACK_CONTENT_TYPE,
};

/// Error raised while building the outbound client.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamSetupError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid header value in upstream config: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Shared, read-only outbound client.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: reqwest::Client,
    accept: HeaderValue,
    fallback_user_agent: HeaderValue,
}

impl UpstreamFetcher {
    /// Build the client, timeouts and redirect policy from config.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamSetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .redirect(redirect_policy(
                config.max_redirects,
                config.allow_cross_origin_redirects,
            ))
            .build()?;

        Ok(Self {
            client,
            accept: HeaderValue::from_str(&config.accept)?,
            fallback_user_agent: HeaderValue::from_str(&config.fallback_user_agent)?,
        })
    }

    /// Perform exactly one GET to `url` and buffer the result.
    ///
    /// Never fails outright: transport problems come back as
    /// [`UpstreamOutcome::Failed`].
    pub async fn fetch(&self, url: &str, user_agent: Option<&HeaderValue>) -> UpstreamOutcome {
        let user_agent = user_agent.unwrap_or(&self.fallback_user_agent).clone();

        tracing::debug!(upstream_host = %upstream_host(url), "Fetching upstream");

        let response = match self
            .client
            .get(url)
            .header(ACCEPT, self.accept.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(response) => response,
            // Target URLs may embed credentials; keep them out of error text.
            Err(e) => return UpstreamOutcome::Failed(FetchError::Request(e.without_url())),
        };

        let status = response.status();
        if !status.is_success() {
            return UpstreamOutcome::Status(status);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

        match response.bytes().await {
            Ok(body) => UpstreamOutcome::Success(UpstreamResponse {
                status,
                content_type,
                body,
            }),
            Err(e) => UpstreamOutcome::Failed(FetchError::Body(e.without_url())),
        }
    }
}

/// Redirect policy with a hop cap and optional same-origin restriction.
///
/// A cross-origin hop that is not allowed stops the chain, so the 3xx itself
/// becomes the final response.
fn redirect_policy(max_redirects: usize, allow_cross_origin: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            return attempt.error("too many redirects");
        }
        let same_origin = attempt
            .previous()
            .first()
            .map(|first| first.origin() == attempt.url().origin())
            .unwrap_or(true);
        if !allow_cross_origin && !same_origin {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

/// Host part of a target URL for logging, or a placeholder when unparseable.
pub fn upstream_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| "<invalid>".to_string())
}
