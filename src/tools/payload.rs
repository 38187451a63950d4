//! Schedule payload embedding.
//!
//! A schedule is a JSON array of stream entries. Each entry may name a
//! manifest, either as a bare URL or as an object with a URL and request
//! headers; every other field, at either level, is carried through untouched
//! for the page to render.
//!
//! The page decodes the payload with
//! `JSON.parse(atob(_.split('').reverse().join('')))`, so the encoding here is
//! JSON → standard base64 → reversed characters.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text immediately before the payload in the page.
pub const PAYLOAD_START_MARKER: &str = "(function(){var _='";

/// Text immediately after the payload in the page.
pub const PAYLOAD_END_MARKER: &str =
    "';try{window._s=JSON.parse(atob(_.split('').reverse().join('')));}catch(e){window._s=[];}";

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([A-Z0-9]+(?:_[A-Z0-9]+)*)__").expect("valid placeholder regex"));

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("schedule file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid schedule JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schedule must be a JSON array of entries")]
    NotAnArray,
    #[error("environment variables not set: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("payload markers not found in page")]
    MarkersNotFound,
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Where a stream's manifest lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestRef {
    Url(String),
    WithHeaders {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
        /// DRM, licence URL, stream type and similar player hints.
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl ManifestRef {
    pub fn url(&self) -> &str {
        match self {
            ManifestRef::Url(url) | ManifestRef::WithHeaders { url, .. } => url,
        }
    }

    /// Request headers the player must send, if any.
    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ManifestRef::Url(_) => None,
            ManifestRef::WithHeaders { headers, .. } => headers.as_ref(),
        }
    }
}

/// One scheduled stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Absent for streams announced before a manifest exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestRef>,
    /// Title, date, venue, image and anything else the page shows.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ScheduleEntry {
    pub fn manifest_url(&self) -> Option<&str> {
        self.manifest.as_ref().map(ManifestRef::url)
    }
}

/// Replace `__NAME__` placeholders in every string of `value`.
///
/// All missing variables are reported together.
pub fn substitute_env<F>(value: &mut Value, lookup: &F) -> Result<(), PayloadError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    substitute_in(value, lookup, &mut missing);
    if missing.is_empty() {
        Ok(())
    } else {
        missing.sort();
        missing.dedup();
        Err(PayloadError::MissingEnv(missing))
    }
}

fn substitute_in<F>(value: &mut Value, lookup: &F, missing: &mut Vec<String>)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(text) => {
            if !ENV_PLACEHOLDER.is_match(text) {
                return;
            }
            let replaced = ENV_PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                lookup(name).unwrap_or_else(|| {
                    missing.push(name.to_string());
                    caps[0].to_string()
                })
            });
            *text = replaced.into_owned();
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| substitute_in(item, lookup, missing)),
        Value::Object(fields) => fields
            .values_mut()
            .for_each(|field| substitute_in(field, lookup, missing)),
        _ => {}
    }
}

/// Parse a schedule document, substituting placeholders first.
pub fn parse_schedule<F>(raw: &str, lookup: &F) -> Result<Vec<ScheduleEntry>, PayloadError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut document: Value = serde_json::from_str(raw)?;
    if !document.is_array() {
        return Err(PayloadError::NotAnArray);
    }
    substitute_env(&mut document, lookup)?;
    Ok(serde_json::from_value(document)?)
}

/// Encode entries the way the page expects to decode them.
pub fn encode_payload(entries: &[ScheduleEntry]) -> Result<String, PayloadError> {
    let json = serde_json::to_string(entries)?;
    Ok(STANDARD.encode(json).chars().rev().collect())
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(blob: &str) -> Result<Vec<ScheduleEntry>, PayloadError> {
    let base64: String = blob.chars().rev().collect();
    let json = STANDARD.decode(base64)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Replace the payload between the page markers.
pub fn embed_into_page(html: &str, encoded: &str) -> Result<String, PayloadError> {
    let start = html
        .find(PAYLOAD_START_MARKER)
        .map(|idx| idx + PAYLOAD_START_MARKER.len())
        .ok_or(PayloadError::MarkersNotFound)?;
    let end = html[start..]
        .find(PAYLOAD_END_MARKER)
        .map(|idx| start + idx)
        .ok_or(PayloadError::MarkersNotFound)?;

    let mut page = String::with_capacity(html.len() - (end - start) + encoded.len());
    page.push_str(&html[..start]);
    page.push_str(encoded);
    page.push_str(&html[end..]);
    Ok(page)
}

/// Read the payload currently embedded in a page.
pub fn extract_from_page(html: &str) -> Result<&str, PayloadError> {
    let start = html
        .find(PAYLOAD_START_MARKER)
        .map(|idx| idx + PAYLOAD_START_MARKER.len())
        .ok_or(PayloadError::MarkersNotFound)?;
    let len = html[start..]
        .find(PAYLOAD_END_MARKER)
        .ok_or(PayloadError::MarkersNotFound)?;
    Ok(&html[start..start + len])
}

/// Encode `schedule_path` into `page_path` in place. Returns the entry count.
pub fn embed_files<F>(schedule_path: &Path, page_path: &Path, lookup: &F) -> Result<usize, PayloadError>
where
    F: Fn(&str) -> Option<String>,
{
    if !schedule_path.exists() {
        return Err(PayloadError::ConfigNotFound(schedule_path.to_path_buf()));
    }
    let raw = fs::read_to_string(schedule_path)?;
    let entries = parse_schedule(&raw, lookup)?;
    let encoded = encode_payload(&entries)?;

    let html = fs::read_to_string(page_path)?;
    let page = embed_into_page(&html, &encoded)?;
    fs::write(page_path, page)?;

    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(name: &str) -> Option<String> {
        match name {
            "CDN_TOKEN" => Some("tok123".into()),
            "HOST" => Some("cdn.example.com".into()),
            _ => None,
        }
    }

    fn page(payload: &str) -> String {
        format!("<script>{PAYLOAD_START_MARKER}{payload}{PAYLOAD_END_MARKER}}})();</script>")
    }

    #[test]
    fn manifest_accepts_bare_url_or_url_with_headers() {
        let entries: Vec<ScheduleEntry> = serde_json::from_value(json!([
            { "title": "Final", "manifest": "https://cdn.example.com/a.m3u8" },
            {
                "title": "Semi",
                "manifest": {
                    "url": "https://cdn.example.com/b.mpd",
                    "headers": { "x-pv-cdn-access-token": "abc" }
                }
            }
        ]))
        .unwrap();

        assert_eq!(entries[0].manifest_url().unwrap(), "https://cdn.example.com/a.m3u8");
        assert_eq!(entries[0].manifest.as_ref().unwrap().headers(), None);
        assert_eq!(entries[0].details["title"], "Final");
        assert_eq!(entries[1].manifest_url().unwrap(), "https://cdn.example.com/b.mpd");
        assert_eq!(
            entries[1].manifest.as_ref().unwrap().headers().unwrap()["x-pv-cdn-access-token"],
            "abc"
        );
    }

    #[test]
    fn placeholders_are_substituted_everywhere() {
        let raw = json!([{
            "title": "Live on __HOST__",
            "manifest": {
                "url": "https://__HOST__/live.mpd",
                "headers": { "x-token": "__CDN_TOKEN__" }
            }
        }])
        .to_string();

        let entries = parse_schedule(&raw, &env).unwrap();
        assert_eq!(entries[0].manifest_url().unwrap(), "https://cdn.example.com/live.mpd");
        assert_eq!(entries[0].manifest.as_ref().unwrap().headers().unwrap()["x-token"], "tok123");
        assert_eq!(entries[0].details["title"], "Live on cdn.example.com");
    }

    #[test]
    fn missing_variables_are_all_reported() {
        let raw = json!([
            { "manifest": "https://x/__NOPE__/__ALSO_MISSING__" },
            { "manifest": "https://x/__NOPE__" }
        ])
        .to_string();

        match parse_schedule(&raw, &env) {
            Err(PayloadError::MissingEnv(names)) => {
                assert_eq!(names, vec!["ALSO_MISSING".to_string(), "NOPE".to_string()]);
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn root_must_be_an_array() {
        let err = parse_schedule(r#"{"manifest": "https://x"}"#, &env).unwrap_err();
        assert!(matches!(err, PayloadError::NotAnArray));
    }

    #[test]
    fn encoding_is_reversed_base64_of_json() {
        let entries = vec![ScheduleEntry {
            manifest: Some(ManifestRef::Url("https://cdn.example.com/a.m3u8".into())),
            details: Map::new(),
        }];
        let encoded = encode_payload(&entries).unwrap();

        let forward: String = encoded.chars().rev().collect();
        let json = STANDARD.decode(forward).unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"[{"manifest":"https://cdn.example.com/a.m3u8"}]"#
        );
        assert_eq!(decode_payload(&encoded).unwrap(), entries);
    }

    #[test]
    fn unknown_fields_survive_encoding() {
        let raw = json!([
            {
                "title": "A",
                "manifest": {
                    "url": "https://cdn.example.com/a.mpd",
                    "headers": { "h": "v" },
                    "drm": { "kid": "k" },
                    "licenseUrl": "https://lic.example.com/"
                }
            },
            { "title": "B", "manifest": { "url": "https://cdn.example.com/b.mpd", "type": "dash" } }
        ]);

        let entries = parse_schedule(&raw.to_string(), &env).unwrap();
        let decoded = decode_payload(&encode_payload(&entries).unwrap()).unwrap();

        assert_eq!(decoded, entries);
        assert_eq!(serde_json::to_value(&decoded).unwrap(), raw);
    }

    #[test]
    fn entries_without_manifest_are_kept() {
        let raw = json!([
            { "title": "Announced", "date": "2026-11-02" },
            { "title": "Live", "manifest": "https://cdn.example.com/live.m3u8" }
        ]);

        let entries = parse_schedule(&raw.to_string(), &env).unwrap();
        assert_eq!(entries[0].manifest_url(), None);
        assert_eq!(entries[1].manifest_url(), Some("https://cdn.example.com/live.m3u8"));

        let decoded = decode_payload(&encode_payload(&entries).unwrap()).unwrap();
        assert_eq!(serde_json::to_value(&decoded).unwrap(), raw);
    }

    #[test]
    fn embedding_replaces_only_the_payload() {
        let html = page("OLD");
        let updated = embed_into_page(&html, "NEW").unwrap();
        assert_eq!(updated, page("NEW"));
        assert_eq!(extract_from_page(&updated).unwrap(), "NEW");
    }

    #[test]
    fn page_without_markers_is_rejected() {
        let err = embed_into_page("<html></html>", "NEW").unwrap_err();
        assert!(matches!(err, PayloadError::MarkersNotFound));
        let err = embed_into_page(PAYLOAD_START_MARKER, "NEW").unwrap_err();
        assert!(matches!(err, PayloadError::MarkersNotFound));
    }

    #[test]
    fn embed_files_rewrites_page_in_place() {
        let dir = std::env::temp_dir().join(format!("relay-embed-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let schedule = dir.join("schedule.json");
        let page_path = dir.join("live.html");
        fs::write(&schedule, r#"[{"title":"A","manifest":"https://__HOST__/a.m3u8"}]"#).unwrap();
        fs::write(&page_path, page("")).unwrap();

        let count = embed_files(&schedule, &page_path, &env).unwrap();
        assert_eq!(count, 1);

        let html = fs::read_to_string(&page_path).unwrap();
        let entries = decode_payload(extract_from_page(&html).unwrap()).unwrap();
        assert_eq!(entries[0].manifest_url().unwrap(), "https://cdn.example.com/a.m3u8");

        let err = embed_files(&dir.join("absent.json"), &page_path, &env).unwrap_err();
        assert!(matches!(err, PayloadError::ConfigNotFound(_)));

        fs::remove_dir_all(&dir).unwrap();
    }
}
