//! Error type definitions for the stream relay.
//!
//! The taxonomy distinguishes failures a client can cause (missing URL,
//! malformed option), failures of resolution (no plugin, no streams, an
//! unproxyable transport) and failures of the transport itself. All of
//! them end the owning request with a `404`; none of them terminate the
//! server or leak into other connections.

use thiserror::Error;

use crate::streams::StreamKind;

/// Top-level request error type
#[derive(Error, Debug)]
pub enum RelayError {
    /// The request carried no `url` command
    #[error("no URL provided")]
    MissingUrl,

    /// The request URL did not parse
    #[error("invalid URL: {url} - {message}")]
    InvalidUrl { url: String, message: String },

    /// A structurally required option was malformed (fatal to the batch)
    #[error("invalid option {option}: {message}")]
    InvalidOption { option: String, message: String },

    /// No registered plugin claimed the URL
    #[error("no plugin can handle URL: {url}")]
    NoPlugin { url: String },

    /// The plugin produced no usable variant, or no preference matched
    /// and there was no `best` fallback
    #[error("no playable streams found on: {url}")]
    NoStreams { url: String },

    /// The negotiated variant's transport cannot be served this way
    #[error("{kind} streams cannot be {action}")]
    UnsupportedStreamKind {
        kind: StreamKind,
        action: &'static str,
    },

    /// The plugin itself failed while scraping
    #[error("plugin {plugin} failed: {message}")]
    Plugin { plugin: String, message: String },

    /// Opening the chosen stream failed
    #[error("could not open stream: {0}")]
    StreamOpen(#[from] StreamError),

    /// Persistent cache failures (session-reload bookkeeping)
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Stream transport specific errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// HTTP transport failures while opening or reading the source
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status
    #[error("upstream error status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Local I/O failures
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything the transport cannot classify further
    #[error("{0}")]
    Open(String),
}

/// Persistent key/value cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Create an invalid option error
    pub fn invalid_option<O: Into<String>, M: Into<String>>(option: O, message: M) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Create a plugin failure error
    pub fn plugin<P: Into<String>, M: Into<String>>(plugin: P, message: M) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a no-streams error for a URL
    pub fn no_streams<U: Into<String>>(url: U) -> Self {
        Self::NoStreams { url: url.into() }
    }
}
