//! Stream handle surface.
//!
//! A [`StreamHandle`] is the opaque variant a plugin hands back for a
//! display name: it knows its transport kind, its source URL (when it has
//! a single fetchable one) and how to open itself into a byte source. The
//! relay treats the bytes as opaque; parsing, demuxing and adaptive
//! bitrate logic stay inside the transport implementations.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::errors::{StreamError, StreamResult};
use crate::session::Session;

/// An opened stream: a readable, opaque byte source.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Transport kind of a stream variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Plain progressive HTTP download
    Http,
    /// Segmented HTTP stream (HLS-style)
    SegmentedHttp,
    /// Chunked manifest stream (HDS/DASH-style)
    ChunkedManifest,
    /// Separate audio and video sources muxed together on the fly
    Muxed,
    /// Raw lower-level streaming protocol (RTMP-style)
    RawProtocol,
}

impl StreamKind {
    /// Whether the relay can proxy this kind over HTTP.
    pub fn proxyable(self) -> bool {
        !matches!(self, StreamKind::RawProtocol)
    }

    /// Whether the kind is a directly fetchable URL-bearing transport,
    /// usable on the redirect route.
    pub fn url_fetchable(self) -> bool {
        matches!(
            self,
            StreamKind::Http | StreamKind::SegmentedHttp | StreamKind::ChunkedManifest
        )
    }

    /// Parse a `stream-types` element.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "http" => Some(StreamKind::Http),
            "hls" => Some(StreamKind::SegmentedHttp),
            "hds" | "dash" => Some(StreamKind::ChunkedManifest),
            "muxed" | "muxed-streams" => Some(StreamKind::Muxed),
            "rtmp" => Some(StreamKind::RawProtocol),
            _ => None,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Http => "http",
            StreamKind::SegmentedHttp => "hls",
            StreamKind::ChunkedManifest => "hds",
            StreamKind::Muxed => "muxed",
            StreamKind::RawProtocol => "rtmp",
        };
        f.write_str(name)
    }
}

/// One openable stream variant.
#[async_trait]
pub trait StreamHandle: Send + Sync {
    /// Transport kind, used for proxy/redirect guardrails and the
    /// `stream-types` restriction.
    fn kind(&self) -> StreamKind;

    /// The single fetchable URL behind this variant, when there is one.
    /// Muxed combinations have none.
    fn source_url(&self) -> Option<Url>;

    /// Open the variant into an opaque byte source. Session options
    /// (timeouts, proxies, header overrides) are honored by the
    /// transport.
    async fn open(&self, session: &Session) -> StreamResult<ByteSource>;
}

/// HTTP-backed stream handle: the reference transport for plain HTTP,
/// segmented and chunked-manifest variants whose bytes are served from a
/// single URL.
pub struct HttpStreamHandle {
    url: Url,
    kind: StreamKind,
}

impl HttpStreamHandle {
    pub fn new(url: Url, kind: StreamKind) -> Self {
        Self { url, kind }
    }

    /// Build a client honoring the session's HTTP options.
    fn build_client(&self, session: &Session) -> StreamResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(seconds) = session.option("http-timeout").and_then(|v| v.as_int()) {
            builder = builder.connect_timeout(Duration::from_secs(seconds.max(0) as u64));
        }
        if session
            .option("http-ssl-verify")
            .and_then(|v| v.as_bool())
            == Some(false)
        {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if session
            .option("http-trust-env")
            .and_then(|v| v.as_bool())
            == Some(false)
        {
            builder = builder.no_proxy();
        }
        if let Some(proxy) = session.option("http-proxy").and_then(|v| v.as_str()) {
            builder = builder.proxy(reqwest::Proxy::http(proxy)?);
        }
        if let Some(proxy) = session.option("https-proxy").and_then(|v| v.as_str()) {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl StreamHandle for HttpStreamHandle {
    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn source_url(&self) -> Option<Url> {
        Some(self.url.clone())
    }

    async fn open(&self, session: &Session) -> StreamResult<ByteSource> {
        let client = self.build_client(session)?;

        let mut request = client.get(self.url.clone());
        if let Some((key, value)) = session.option("http-header").and_then(|v| v.as_pair()) {
            request = request.header(key, value);
        }
        if let Some((key, value)) = session.option("http-cookie").and_then(|v| v.as_pair()) {
            request = request.header(reqwest::header::COOKIE, format!("{key}={value}"));
        }
        if let Some((key, value)) = session
            .option("http-query-param")
            .and_then(|v| v.as_pair())
        {
            request = request.query(&[(key, value)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::UpstreamStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let bytes = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(bytes))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_guardrails() {
        assert!(StreamKind::Http.proxyable());
        assert!(StreamKind::SegmentedHttp.proxyable());
        assert!(StreamKind::ChunkedManifest.proxyable());
        assert!(StreamKind::Muxed.proxyable());
        assert!(!StreamKind::RawProtocol.proxyable());

        assert!(StreamKind::Http.url_fetchable());
        assert!(!StreamKind::Muxed.url_fetchable());
        assert!(!StreamKind::RawProtocol.url_fetchable());
    }

    #[test]
    fn test_kind_parse_round_trip() {
        for kind in [
            StreamKind::Http,
            StreamKind::SegmentedHttp,
            StreamKind::ChunkedManifest,
            StreamKind::Muxed,
            StreamKind::RawProtocol,
        ] {
            assert_eq!(StreamKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(StreamKind::parse("smooth"), None);
    }
}
