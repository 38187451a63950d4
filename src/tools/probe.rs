//! Aggregate playlist discovery.
//!
//! Tries a fixed list of master playlist paths on a host and keeps the first
//! one that answers with something that looks like an M3U playlist, then
//! checks per-channel playlists for a list of slugs.

use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

/// Master playlist paths tried in order.
pub const MASTER_PLAYLIST_PATHS: [&str; 5] = [
    "/playlist.m3u8",
    "/index.m3u8",
    "/all.m3u8",
    "/channels.m3u8",
    "/playlist.m3u",
];

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
pub const PROBE_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid probe URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Whether a response body is plausibly an M3U playlist.
pub fn looks_like_playlist(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.starts_with("#EXTM3U") || trimmed.contains("#EXTINF") || trimmed.contains(".m3u8")
}

/// `<base><path>?token=<token>`, keeping any path prefix on `base`.
pub fn candidate_url(base: &str, path: &str, token: &str) -> Result<Url, ProbeError> {
    let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// `<base>/<slug>/index.m3u8?token=<token>`.
pub fn channel_url(base: &str, slug: &str, token: &str) -> Result<Url, ProbeError> {
    candidate_url(base, &format!("/{slug}/index.m3u8"), token)
}

/// How one probe request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Playlist,
    /// Answered, but not with a 200 playlist.
    Rejected(StatusCode),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub path: String,
    pub result: AttemptResult,
}

/// First working master playlist.
#[derive(Debug, Clone)]
pub struct FoundPlaylist {
    pub path: String,
    pub url: Url,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub attempts: Vec<ProbeAttempt>,
    pub found: Option<FoundPlaylist>,
}

#[derive(Debug, Clone)]
pub struct ChannelCheck {
    pub slug: String,
    pub url: Url,
    pub result: Result<StatusCode, String>,
}

/// Playlist prober bound to one host and token.
pub struct Prober {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl Prober {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(PROBE_USER_AGENT)
            .build()?;
        let base = base.into();
        // Fail early on a base that can never form a URL.
        Url::parse(&base)?;

        Ok(Self {
            client,
            base,
            token: token.into(),
        })
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Try `paths` in order, stopping at the first playlist.
    pub async fn find_master_playlist(&self, paths: &[&str]) -> Result<ProbeReport, ProbeError> {
        let mut report = ProbeReport::default();

        for path in paths {
            let url = candidate_url(&self.base, path, &self.token)?;
            let result = match self.get(url.clone()).await {
                Ok((status, body)) if status == StatusCode::OK && looks_like_playlist(&body) => {
                    report.attempts.push(ProbeAttempt {
                        path: path.to_string(),
                        result: AttemptResult::Playlist,
                    });
                    report.found = Some(FoundPlaylist {
                        path: path.to_string(),
                        url,
                        body,
                    });
                    break;
                }
                Ok((status, _)) => AttemptResult::Rejected(status),
                Err(e) => AttemptResult::Error(e.without_url().to_string()),
            };
            report.attempts.push(ProbeAttempt {
                path: path.to_string(),
                result,
            });
        }

        Ok(report)
    }

    /// Check each slug's channel playlist.
    pub async fn check_channels(&self, slugs: &[String]) -> Result<Vec<ChannelCheck>, ProbeError> {
        let mut checks = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let url = channel_url(&self.base, slug, &self.token)?;
            let result = self
                .get(url.clone())
                .await
                .map(|(status, _)| status)
                .map_err(|e| e.without_url().to_string());
            checks.push(ChannelCheck {
                slug: slug.clone(),
                url,
                result,
            });
        }
        Ok(checks)
    }
}

/// Split a comma-separated slug list, dropping blanks.
pub fn parse_slugs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .map(str::to_owned)
        .collect()
}
