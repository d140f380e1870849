//! Per-connection session state.
//!
//! A [`Session`] is built fresh for every incoming request and threaded
//! explicitly through the option interpreter, the resolver and the stream
//! transports. It is never shared between connections; the only state that
//! crosses workers is the read-only plugin registry and the persistent
//! cache.

use std::collections::HashMap;

/// A typed option value as produced by the configuration interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    /// A `key=value` pair, e.g. a custom HTTP header
    Pair(String, String),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match self {
            OptionValue::Pair(k, v) => Some((k, v)),
            _ => None,
        }
    }
}

/// Mutable configuration bag for one request lifecycle.
#[derive(Debug, Default)]
pub struct Session {
    globals: HashMap<String, OptionValue>,
    plugin_options: HashMap<String, HashMap<String, OptionValue>>,
    log_level: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            plugin_options: HashMap::new(),
            log_level: "info".to_string(),
        }
    }

    /// Set a global option, replacing any previous value.
    pub fn set_option(&mut self, name: &str, value: OptionValue) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.globals.get(name)
    }

    /// Append elements to a global comma-list option, creating it if absent.
    pub fn extend_option_list(&mut self, name: &str, items: Vec<String>) {
        match self.globals.get_mut(name) {
            Some(OptionValue::List(existing)) => existing.extend(items),
            _ => {
                self.globals
                    .insert(name.to_string(), OptionValue::List(items));
            }
        }
    }

    /// Set an option scoped to a single plugin.
    pub fn set_plugin_option(&mut self, plugin: &str, option: &str, value: OptionValue) {
        self.plugin_options
            .entry(plugin.to_string())
            .or_default()
            .insert(option.to_string(), value);
    }

    pub fn plugin_option(&self, plugin: &str, option: &str) -> Option<&OptionValue> {
        self.plugin_options.get(plugin)?.get(option)
    }

    /// Append elements to a plugin-scoped comma-list option.
    pub fn extend_plugin_option_list(&mut self, plugin: &str, option: &str, items: Vec<String>) {
        let options = self.plugin_options.entry(plugin.to_string()).or_default();
        match options.get_mut(option) {
            Some(OptionValue::List(existing)) => existing.extend(items),
            _ => {
                options.insert(option.to_string(), OptionValue::List(items));
            }
        }
    }

    pub fn set_log_level(&mut self, level: &str) {
        self.log_level = level.to_string();
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Number of global options currently set (diagnostics only).
    pub fn option_count(&self) -> usize {
        self.globals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_options_are_scoped() {
        let mut session = Session::new();
        session.set_plugin_option("twitch", "oauth-token", OptionValue::Str("abc".into()));
        session.set_plugin_option("zattoo", "email", OptionValue::Str("a@b".into()));

        assert_eq!(
            session.plugin_option("twitch", "oauth-token"),
            Some(&OptionValue::Str("abc".into()))
        );
        assert_eq!(session.plugin_option("zattoo", "oauth-token"), None);
    }

    #[test]
    fn test_extend_option_list_accumulates() {
        let mut session = Session::new();
        session.extend_option_list("hls-audio-select", vec!["en".into()]);
        session.extend_option_list("hls-audio-select", vec!["de".into(), "fr".into()]);

        assert_eq!(
            session.option("hls-audio-select").unwrap().as_list(),
            Some(&["en".to_string(), "de".to_string(), "fr".to_string()][..])
        );
    }

    #[test]
    fn test_set_option_replaces() {
        let mut session = Session::new();
        session.set_option("http-timeout", OptionValue::Int(30));
        session.set_option("http-timeout", OptionValue::Int(60));
        assert_eq!(session.option("http-timeout").unwrap().as_int(), Some(60));
    }
}
