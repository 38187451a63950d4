//! Manifest URL extraction from a captured playback API response.
//!
//! Walks `livePlaybackUrls.result.urlSets[*].urls.manifest` and keeps Akamai
//! manifests. The resulting URLs usually still need their CDN access token
//! header when fetched; that is left to the schedule's manifest headers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// CDN name a manifest must declare to be kept.
pub const AKAMAI_CDN: &str = "Akamai";

const URL_SETS_POINTER: &str = "/livePlaybackUrls/result/urlSets";

static AKAMAI_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|\.)(akamaihd|akamaized)\.net$").expect("valid host regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no livePlaybackUrls.result.urlSets found in JSON")]
    MissingUrlSets,
}

/// A manifest URL worth feeding into the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestCandidate {
    pub url: String,
    /// Declared origin of the manifest, empty when absent.
    pub origin: String,
}

/// Extract unique Akamai manifest URLs, in document order.
pub fn extract_akamai_manifests(input: &str) -> Result<Vec<ManifestCandidate>, ExtractError> {
    let document: Value = serde_json::from_str(input)?;
    let url_sets = document
        .pointer(URL_SETS_POINTER)
        .and_then(Value::as_array)
        .ok_or(ExtractError::MissingUrlSets)?;

    let mut seen = HashSet::new();
    let candidates = url_sets
        .iter()
        .filter_map(|set| set.pointer("/urls/manifest"))
        .filter(|manifest| manifest.get("cdn").and_then(Value::as_str) == Some(AKAMAI_CDN))
        .filter_map(|manifest| {
            let url = manifest.get("url").and_then(Value::as_str)?;
            if !is_akamai_host(url) {
                return None;
            }
            let origin = ["origin", "cdnOrigin"]
                .iter()
                .filter_map(|key| manifest.get(*key).and_then(Value::as_str))
                .find(|origin| !origin.is_empty())
                .unwrap_or_default();
            Some(ManifestCandidate {
                url: url.to_string(),
                origin: origin.to_string(),
            })
        })
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect();

    Ok(candidates)
}

fn is_akamai_host(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| AKAMAI_HOST.is_match(host)))
        .unwrap_or(false)
}
