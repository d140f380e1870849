//! Site plugin surface and registry.
//!
//! A plugin claims URLs for one site and produces the named stream
//! variants found there. Each plugin declares a single match capability
//! at construction time (a compiled pattern behind [`Plugin::matches`]);
//! there is no attribute probing at resolution time.
//!
//! The registry is built once at startup and shared read-only across all
//! request workers.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::errors::RelayResult;
use crate::resolver::StreamInventory;
use crate::session::Session;

pub mod direct;

pub use direct::DirectPlugin;

/// External collaborator that claims URLs matching a site and produces
/// named stream variants. Scraping internals are the plugin's business.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Short plugin name, used for scoped options and logging.
    fn name(&self) -> &str;

    /// Whether this plugin can handle the URL. Resolved against a
    /// pattern compiled when the plugin was constructed.
    fn matches(&self, url: &Url) -> bool;

    /// Produce the named stream variants for the URL.
    async fn streams(&self, session: &Session, url: &Url) -> RelayResult<StreamInventory>;
}

/// Ordered, read-only collection of plugins. First match wins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DirectPlugin::new()));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Find the first plugin claiming the URL.
    pub fn find(&self, url: &Url) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.matches(url)).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_returns_first_match() {
        let registry = PluginRegistry::with_builtins();
        let url = Url::parse("https://cdn.example.com/live/channel.m3u8").unwrap();
        let plugin = registry.find(&url).expect("direct plugin should claim m3u8");
        assert_eq!(plugin.name(), "direct");
    }

    #[test]
    fn test_find_none_for_unclaimed_url() {
        let registry = PluginRegistry::with_builtins();
        let url = Url::parse("https://example.com/article.html").unwrap();
        assert!(registry.find(&url).is_none());
    }
}
