//! Stream resolution and quality negotiation.
//!
//! Given a session and a play request, find the plugin claiming the URL,
//! collect its named variants and negotiate a single chosen stream from
//! the caller's quality preference list. Synonyms (`best`, `worst`) are
//! kept in an explicit alias table built when the inventory is
//! constructed, so resolving one is a single lookup rather than a scan
//! for identical handles.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::errors::{RelayError, RelayResult};
use crate::options::Passthrough;
use crate::plugins::PluginRegistry;
use crate::session::Session;
use crate::streams::{StreamHandle, StreamKind};

/// The synonym names that alias concrete variants and are never
/// independent qualities.
const SYNONYMS: [&str; 2] = ["best", "worst"];

/// Relative quality weight for a display name, in the manner plugins
/// weigh their own variants: `<n>p[fps]` weighs by pixel height,
/// `<n>k` by bitrate, anything else weighs zero. The second element is
/// the grouping key used as tie-breaker.
pub fn quality_weight(name: &str) -> (u64, String) {
    if let Some(rest) = name.strip_suffix('k') {
        if let Ok(bitrate) = rest.parse::<u64>() {
            return (bitrate, "bitrate".to_string());
        }
    }
    if let Some(p) = name.find('p') {
        let (height, fps) = name.split_at(p);
        if let Ok(height) = height.parse::<u64>() {
            let fps = fps[1..].parse::<u64>().unwrap_or(0);
            return (height * 100 + fps, "pixels".to_string());
        }
    }
    (0, "none".to_string())
}

struct Variant {
    name: String,
    handle: Arc<dyn StreamHandle>,
    weight: (u64, String),
}

/// Named stream variants produced by one plugin for one URL, with an
/// explicit synonym alias table.
#[derive(Default)]
pub struct StreamInventory {
    variants: Vec<Variant>,
    aliases: HashMap<String, String>,
}

impl StreamInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a concrete variant, weighing it by its display name.
    pub fn insert(&mut self, name: &str, handle: Arc<dyn StreamHandle>) {
        let weight = quality_weight(name);
        self.insert_weighted(name, handle, weight);
    }

    /// Insert a concrete variant with a plugin-supplied weight.
    pub fn insert_weighted(
        &mut self,
        name: &str,
        handle: Arc<dyn StreamHandle>,
        weight: (u64, String),
    ) {
        self.variants.push(Variant {
            name: name.to_string(),
            handle,
            weight,
        });
    }

    /// Record that `synonym` aliases the concrete variant `canonical`.
    pub fn alias(&mut self, synonym: &str, canonical: &str) {
        if self.variants.iter().any(|v| v.name == canonical) {
            self.aliases
                .insert(synonym.to_string(), canonical.to_string());
        }
    }

    /// Fill in `best`/`worst` aliases from the weights when the plugin
    /// did not set them itself.
    pub fn finalize(&mut self) {
        if self.variants.is_empty() {
            return;
        }
        if !self.aliases.contains_key("best") {
            let best = self
                .variants
                .iter()
                .max_by_key(|v| v.weight.0)
                .map(|v| v.name.clone())
                .unwrap();
            self.aliases.insert("best".to_string(), best);
        }
        if !self.aliases.contains_key("worst") {
            let worst = self
                .variants
                .iter()
                .min_by_key(|v| v.weight.0)
                .map(|v| v.name.clone())
                .unwrap();
            self.aliases.insert("worst".to_string(), worst);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Look up a name, resolving synonyms through the alias table.
    /// Returns the canonical name together with the handle, so a `best`
    /// hit is always reported under its concrete name.
    pub fn get(&self, name: &str) -> Option<(&str, Arc<dyn StreamHandle>)> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        if !self.aliases.contains_key(name) && SYNONYMS.contains(&name) {
            return None;
        }
        self.variants
            .iter()
            .find(|v| v.name == canonical)
            .map(|v| (v.name.as_str(), v.handle.clone()))
    }

    /// Drop variants whose kind is not in `kinds`, along with aliases
    /// left dangling.
    pub fn retain_kinds(&mut self, kinds: &[StreamKind]) {
        self.variants.retain(|v| kinds.contains(&v.handle.kind()));
        let names: Vec<String> = self.variants.iter().map(|v| v.name.clone()).collect();
        self.aliases.retain(|_, canonical| names.contains(canonical));
    }

    /// Human-readable listing for diagnostics: concrete names sorted by
    /// weight, synonyms shown only as parenthesized alias groups behind
    /// the name they reference.
    pub fn display_listing(&self) -> String {
        let mut sorted: Vec<&Variant> = self.variants.iter().collect();
        sorted.sort_by(|a, b| a.weight.cmp(&b.weight));

        sorted
            .iter()
            .map(|variant| {
                let mut aliases: Vec<&str> = self
                    .aliases
                    .iter()
                    .filter(|(_, canonical)| **canonical == variant.name)
                    .map(|(synonym, _)| synonym.as_str())
                    .collect();
                aliases.sort_unstable();
                if aliases.is_empty() {
                    variant.name.clone()
                } else {
                    format!("{} ({})", variant.name, aliases.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Whether this request relays bytes or redirects to the source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    Relay,
    Redirect,
}

/// Parsed, validated intent for one connection.
#[derive(Debug)]
pub struct PlayRequest {
    pub url: Url,
    /// Ordered quality preferences; first match wins
    pub quality: Vec<String>,
    /// Pre-buffer size in bytes for the relay loop
    pub prebuffer: u64,
    pub log_level: String,
    /// Session-reload interval in seconds, a cooperative hint for the
    /// transport layer
    pub session_reload: Option<u64>,
    /// Optional restriction to a subset of transport kinds
    pub stream_types: Option<Vec<StreamKind>>,
    pub mode: ServeMode,
}

impl PlayRequest {
    pub const DEFAULT_PREBUFFER: u64 = 4096;

    /// Build a request from interpreter passthrough values. The target
    /// URL is the only hard requirement.
    pub fn from_passthrough(passthrough: &Passthrough, mode: ServeMode) -> RelayResult<Self> {
        let raw_url = passthrough.scalar("url").ok_or(RelayError::MissingUrl)?;
        let url = Url::parse(raw_url).map_err(|e| RelayError::InvalidUrl {
            url: raw_url.to_string(),
            message: e.to_string(),
        })?;

        let quality = ["q", "quality", "stream", "default-stream"]
            .iter()
            .find_map(|name| passthrough.list(name))
            .map(|prefs| prefs.to_vec())
            .unwrap_or_else(|| vec!["best".to_string()]);

        let prebuffer = passthrough
            .size("cache")
            .unwrap_or(Self::DEFAULT_PREBUFFER);

        let log_level = passthrough
            .scalar("l")
            .or_else(|| passthrough.scalar("loglevel"))
            .unwrap_or("debug")
            .to_string();

        let session_reload = passthrough
            .scalar("hls-session-reload")
            .and_then(|raw| match raw.parse::<u64>() {
                Ok(seconds) => Some(seconds),
                Err(_) => {
                    debug!("dropping option hls-session-reload: not a number: {raw:?}");
                    None
                }
            });

        let stream_types = passthrough.list("stream-types").map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    let kind = StreamKind::parse(name);
                    if kind.is_none() {
                        debug!("ignoring unknown stream type {name:?}");
                    }
                    kind
                })
                .collect::<Vec<_>>()
        });

        Ok(Self {
            url,
            quality,
            prebuffer,
            log_level,
            session_reload,
            stream_types,
            mode,
        })
    }
}

/// The negotiated result: a concrete variant name and its handle.
pub struct ChosenStream {
    pub name: String,
    pub handle: Arc<dyn StreamHandle>,
}

/// Resolve a play request into a single chosen stream.
pub async fn resolve(
    session: &Session,
    registry: &PluginRegistry,
    request: &PlayRequest,
) -> RelayResult<ChosenStream> {
    let plugin = registry
        .find(&request.url)
        .ok_or_else(|| RelayError::NoPlugin {
            url: request.url.to_string(),
        })?;
    debug!("plugin {} claims {}", plugin.name(), request.url);

    let mut inventory = plugin.streams(session, &request.url).await?;
    if let Some(kinds) = &request.stream_types {
        inventory.retain_kinds(kinds);
    }
    if inventory.is_empty() {
        return Err(RelayError::no_streams(request.url.as_str()));
    }
    debug!("available streams: {}", inventory.display_listing());

    let chosen = negotiate(&inventory, &request.quality, &request.url)?;

    // Guardrail: the relay only proxies opaque HTTP byte sources, and
    // the redirect route needs a bare fetchable URL.
    let kind = chosen.handle.kind();
    match request.mode {
        ServeMode::Relay if !kind.proxyable() => {
            return Err(RelayError::UnsupportedStreamKind {
                kind,
                action: "proxied",
            });
        }
        ServeMode::Redirect if !kind.url_fetchable() || chosen.handle.source_url().is_none() => {
            return Err(RelayError::UnsupportedStreamKind {
                kind,
                action: "redirected",
            });
        }
        _ => {}
    }

    Ok(chosen)
}

fn negotiate(
    inventory: &StreamInventory,
    preferences: &[String],
    url: &Url,
) -> RelayResult<ChosenStream> {
    for preference in preferences {
        if let Some((name, handle)) = inventory.get(preference) {
            if name != preference {
                debug!("quality {preference} is a synonym for {name}");
            }
            return Ok(ChosenStream {
                name: name.to_string(),
                handle,
            });
        }
    }

    // Permissive fallback: an unmatched preference list silently
    // substitutes `best`; the client is not told, only the log.
    if let Some((name, handle)) = inventory.get("best") {
        info!(
            "no stream matched quality preference {:?}, falling back to {name}",
            preferences
        );
        return Ok(ChosenStream {
            name: name.to_string(),
            handle,
        });
    }

    Err(RelayError::no_streams(url.as_str()))
}
