use crate::constants::{LASTFM_BASE_URL, LASTFM_MAX_TAGS};
use crate::types::*;
use serde::Serialize;
use std::time::Duration;

const LASTFM_TIMEOUT: Duration = Duration::from_secs(10);
const IMAGE_SIZE_PREFERENCE: [&str; 3] = ["extralarge", "large", "medium"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

/// Last.fm `track.getInfo` lookup. Lookups never fail the caller: any error
/// is logged and an empty `TrackInfo` comes back.
#[derive(Clone)]
pub struct LastFmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LastFmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LastFmClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: LASTFM_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn track_info(&self, artist: &str, title: &str) -> TrackInfo {
        match self.fetch(artist, title).await {
            Ok(json) => {
                if let Some(message) = api_error(&json) {
                    tracing::warn!(
                        "Last.fm has no info for {} - {}: {}",
                        artist,
                        title,
                        message
                    );
                    return TrackInfo::default();
                }
                let info = parse_track_info(&json);
                tracing::debug!("Last.fm tags for {} - {}: {:?}", artist, title, info.tags);
                info
            }
            Err(e) => {
                tracing::warn!("Last.fm lookup failed for {} - {}: {}", artist, title, e);
                TrackInfo::default()
            }
        }
    }

    async fn fetch(&self, artist: &str, title: &str) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", "track.getInfo"),
                ("api_key", self.api_key.as_str()),
                ("artist", artist),
                ("track", title),
                ("format", "json"),
            ])
            .timeout(LASTFM_TIMEOUT)
            .send()
            .await?;
        // Last.fm reports lookup errors as JSON bodies, often with a 4xx status.
        let json = resp.json::<serde_json::Value>().await?;
        Ok(json)
    }
}

fn api_error(json: &serde_json::Value) -> Option<String> {
    json.get("error")?;
    let message = json
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error");
    Some(message.to_string())
}

/// Extracts the album image and the top tag names from a `track.getInfo` body.
pub fn parse_track_info(json: &serde_json::Value) -> TrackInfo {
    let Some(track) = json.get("track") else {
        return TrackInfo::default();
    };

    let tags = track
        .get("toptags")
        .and_then(|t| t.get("tag"))
        .and_then(|t| t.as_array())
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
                .take(LASTFM_MAX_TAGS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let images: Vec<(&str, &str)> = track
        .get("album")
        .and_then(|a| a.get("image"))
        .and_then(|i| i.as_array())
        .map(|images| {
            images
                .iter()
                .filter_map(|img| {
                    let url = img.get("#text").and_then(|u| u.as_str())?;
                    let size = img.get("size").and_then(|s| s.as_str()).unwrap_or("");
                    (!url.is_empty()).then_some((size, url))
                })
                .collect()
        })
        .unwrap_or_default();

    let image_url = IMAGE_SIZE_PREFERENCE
        .iter()
        .find_map(|wanted| images.iter().find(|(size, _)| size == wanted))
        .or_else(|| images.last())
        .map(|(_, url)| url.to_string());

    TrackInfo { image_url, tags }
}
