//! Built-in plugin for direct media URLs.
//!
//! Claims `http(s)` URLs whose path already names a playable resource
//! (an HLS playlist, a manifest, a transport-stream or container file)
//! and exposes it as a single `live` variant. No scraping involved.

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::errors::RelayResult;
use crate::resolver::StreamInventory;
use crate::session::Session;
use crate::streams::{HttpStreamHandle, StreamKind};

use super::Plugin;

pub struct DirectPlugin {
    pattern: Regex,
}

impl DirectPlugin {
    pub fn new() -> Self {
        // Pattern compiled once at registration, not per request.
        let pattern = Regex::new(
            r"(?i)^https?://.+\.(m3u8|mpd|f4m|ts|mp4|mkv|webm|aac|mp3)(\?.*)?$",
        )
        .expect("static pattern");
        Self { pattern }
    }

    fn kind_for(url: &Url) -> StreamKind {
        let path = url.path().to_ascii_lowercase();
        if path.ends_with(".m3u8") {
            StreamKind::SegmentedHttp
        } else if path.ends_with(".mpd") || path.ends_with(".f4m") {
            StreamKind::ChunkedManifest
        } else {
            StreamKind::Http
        }
    }
}

impl Default for DirectPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for DirectPlugin {
    fn name(&self) -> &str {
        "direct"
    }

    fn matches(&self, url: &Url) -> bool {
        self.pattern.is_match(url.as_str())
    }

    async fn streams(&self, _session: &Session, url: &Url) -> RelayResult<StreamInventory> {
        let kind = Self::kind_for(url);
        let mut inventory = StreamInventory::new();
        inventory.insert("live", std::sync::Arc::new(HttpStreamHandle::new(url.clone(), kind)));
        inventory.finalize();
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_playable_extensions() {
        let plugin = DirectPlugin::new();
        for url in [
            "https://cdn.example.com/live/index.m3u8",
            "http://cdn.example.com/vod/movie.mp4?token=x",
            "https://cdn.example.com/manifest.mpd",
        ] {
            assert!(plugin.matches(&Url::parse(url).unwrap()), "{url}");
        }
        assert!(!plugin.matches(&Url::parse("https://example.com/page.html").unwrap()));
        assert!(!plugin.matches(&Url::parse("rtmp://example.com/live.mp4").unwrap()));
    }

    #[test]
    fn test_kind_follows_extension() {
        let url = Url::parse("https://a/x.m3u8").unwrap();
        assert_eq!(DirectPlugin::kind_for(&url), StreamKind::SegmentedHttp);
        let url = Url::parse("https://a/x.mpd").unwrap();
        assert_eq!(DirectPlugin::kind_for(&url), StreamKind::ChunkedManifest);
        let url = Url::parse("https://a/x.ts").unwrap();
        assert_eq!(DirectPlugin::kind_for(&url), StreamKind::Http);
    }

    #[tokio::test]
    async fn test_streams_exposes_live_with_synonyms() {
        let plugin = DirectPlugin::new();
        let session = Session::new();
        let url = Url::parse("https://cdn.example.com/live/index.m3u8").unwrap();
        let inventory = plugin.streams(&session, &url).await.unwrap();

        let (name, _) = inventory.get("best").unwrap();
        assert_eq!(name, "live");
        let (name, _) = inventory.get("worst").unwrap();
        assert_eq!(name, "live");
    }
}
