//! Configuration interpreter.
//!
//! Turns the flat `(name, value)` command sequence decoded from a request
//! query string into typed mutations of a [`Session`], plus a passthrough
//! map of values the caller consumes itself (`url`, `quality`, `cache`,
//! ...). Pure: no I/O, no concurrency, mutates only the session handed in.
//!
//! Every known command name maps to exactly one [`OptionAction`] through a
//! static dispatch table; unknown names are ignored. Two names
//! (`http-no-ssl-verify`, `http-ignore-env`) are hard negations that set a
//! different option to `false` and are special-cased ahead of the table.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::{RelayError, RelayResult};
use crate::session::{OptionValue, Session};

mod table;

pub use table::{action_for, OptionAction};

/// One decoded query-string command.
pub type Command = (String, String);

/// A passthrough value collected for the caller rather than applied to
/// the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PassValue {
    Scalar(String),
    List(Vec<String>),
    /// Byte count coerced through the filesize parser (`cache`)
    Size(u64),
}

/// Values returned to the caller by [`apply`].
///
/// Scalars follow last-write-wins across duplicate command names;
/// comma-lists accumulate.
#[derive(Debug, Default)]
pub struct Passthrough {
    values: HashMap<String, PassValue>,
}

impl Passthrough {
    pub fn scalar(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            PassValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name)? {
            PassValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn size(&self, name: &str) -> Option<u64> {
        match self.values.get(name)? {
            PassValue::Size(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set_scalar(&mut self, name: &str, value: String) {
        self.values
            .insert(name.to_string(), PassValue::Scalar(value));
    }

    fn extend_list(&mut self, name: &str, items: Vec<String>) {
        match self.values.get_mut(name) {
            Some(PassValue::List(existing)) => existing.extend(items),
            _ => {
                self.values.insert(name.to_string(), PassValue::List(items));
            }
        }
    }

    fn set_size(&mut self, name: &str, bytes: u64) {
        self.values.insert(name.to_string(), PassValue::Size(bytes));
    }
}

/// Split a raw value on `,`, trimming surrounding whitespace per element.
/// Order and duplicates are preserved.
pub fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|item| item.trim().to_string()).collect()
}

/// Parse a filesize of the form `<number>[K|k|M|m][B|b]`.
///
/// The multiplier is case-insensitive and the `B` unit suffix optional.
/// Input with no leading digits, or a zero-magnitude result, is an error.
/// Trailing garbage after a recognized prefix is tolerated.
pub fn parse_filesize(raw: &str) -> Result<u64, String> {
    let value = raw.trim();
    let digits_end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, rest) = value.split_at(digits_end);

    let size: f64 = number
        .parse()
        .map_err(|_| format!("not a filesize: {raw:?}"))?;

    let multiplier = match rest.chars().next() {
        Some('K') | Some('k') => 1024.0,
        Some('M') | Some('m') => 1024.0 * 1024.0,
        _ => 1.0,
    };

    // The zero check runs on the truncated result, so sub-byte inputs
    // like "0.5" are rejected rather than rounding down to zero.
    let bytes = (size * multiplier) as u64;
    if bytes == 0 {
        return Err(format!("filesize must be non-zero: {raw:?}"));
    }
    Ok(bytes)
}

/// Parse a `key=value` raw value, splitting once on the first `=`.
/// The key must be non-empty; whitespace around the separator is trimmed.
pub fn keyvalue(raw: &str) -> Option<(String, String)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim_start().to_string()))
}

/// Command names whose passthrough value is a comma-list (the quality /
/// stream family).
fn is_passthrough_list(name: &str) -> bool {
    matches!(
        name,
        "q" | "quality" | "stream" | "default-stream" | "stream-types" | "stream-sorting-excludes"
    )
}

/// Apply a command sequence to a session.
///
/// Commands are consumed in order. A malformed numeric value drops that
/// one command and keeps going; a malformed `key=value` fails the whole
/// batch, because the pair is structurally required downstream.
pub fn apply(session: &mut Session, commands: &[Command]) -> RelayResult<Passthrough> {
    let mut passthrough = Passthrough::default();

    for (name, raw) in commands {
        // Hard negations and the filesize-coerced ringbuffer are
        // special-cased rather than table-driven.
        match name.as_str() {
            "http-no-ssl-verify" => {
                session.set_option("http-ssl-verify", OptionValue::Bool(false));
                continue;
            }
            "http-ignore-env" => {
                session.set_option("http-trust-env", OptionValue::Bool(false));
                continue;
            }
            "ringbuffer-size" => {
                let bytes = parse_filesize(raw)
                    .map_err(|message| RelayError::invalid_option(name, message))?;
                session.set_option(name, OptionValue::Int(bytes as i64));
                continue;
            }
            _ => {}
        }

        let Some(action) = action_for(name) else {
            // Unknown command names are ignored, never fatal.
            continue;
        };

        match action {
            OptionAction::GlobalScalar => {
                session.set_option(name, OptionValue::Str(raw.clone()));
            }
            OptionAction::GlobalNumeric => match raw.parse::<i64>() {
                Ok(number) => session.set_option(name, OptionValue::Int(number)),
                Err(_) => {
                    debug!("dropping option {name}: not a number: {raw:?}");
                }
            },
            OptionAction::GlobalBooleanFlag => {
                session.set_option(name, OptionValue::Bool(true));
            }
            OptionAction::GlobalCommaList => {
                session.extend_option_list(name, comma_list(raw));
            }
            OptionAction::GlobalKeyValue => {
                let (key, value) = keyvalue(raw).ok_or_else(|| {
                    RelayError::invalid_option(name, format!("expected key=value, got {raw:?}"))
                })?;
                session.set_option(name, OptionValue::Pair(key, value));
            }
            OptionAction::PluginScalar(plugin, option) => {
                session.set_plugin_option(plugin, option, OptionValue::Str(raw.clone()));
            }
            OptionAction::PluginCommaList(plugin, option) => {
                session.extend_plugin_option_list(plugin, option, comma_list(raw));
            }
            OptionAction::PluginBooleanFlag(plugin, option) => {
                session.set_plugin_option(plugin, option, OptionValue::Bool(true));
            }
            OptionAction::Passthrough => {
                if is_passthrough_list(name) {
                    passthrough.extend_list(name, comma_list(raw));
                } else if name == "cache" {
                    match parse_filesize(raw) {
                        Ok(bytes) => passthrough.set_size(name, bytes),
                        Err(message) => {
                            debug!("dropping option cache: {message}");
                        }
                    }
                } else {
                    passthrough.set_scalar(name, raw.clone());
                }
            }
        }
    }

    Ok(passthrough)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(name: &str, value: &str) -> Command {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let mut session = Session::new();
        let passthrough = apply(
            &mut session,
            &[cmd("definitely-not-an-option", "1"), cmd("http-timeout", "30")],
        )
        .unwrap();

        assert!(passthrough.is_empty());
        assert_eq!(session.option_count(), 1);
        assert_eq!(session.option("http-timeout").unwrap().as_int(), Some(30));
        assert!(session.option("definitely-not-an-option").is_none());
    }

    #[test]
    fn test_numeric_parse_failure_drops_only_that_command() {
        let mut session = Session::new();
        apply(
            &mut session,
            &[
                cmd("hls-timeout", "sixty"),
                cmd("http-timeout", "30"),
                cmd("http-proxy", "http://127.0.0.1:3128"),
            ],
        )
        .unwrap();

        assert!(session.option("hls-timeout").is_none());
        assert_eq!(session.option("http-timeout").unwrap().as_int(), Some(30));
        assert_eq!(
            session.option("http-proxy").unwrap().as_str(),
            Some("http://127.0.0.1:3128")
        );
    }

    #[test]
    fn test_numeric_parse_failure_keeps_prior_value() {
        let mut session = Session::new();
        apply(
            &mut session,
            &[cmd("http-timeout", "30"), cmd("http-timeout", "later")],
        )
        .unwrap();
        assert_eq!(session.option("http-timeout").unwrap().as_int(), Some(30));
    }

    #[test]
    fn test_comma_list_trims_and_preserves_order() {
        assert_eq!(comma_list("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(comma_list("x,x, y"), vec!["x", "x", "y"]);
    }

    #[test]
    fn test_filesize_parsing() {
        assert_eq!(parse_filesize("4096"), Ok(4096));
        assert_eq!(parse_filesize("4k"), Ok(4096));
        assert_eq!(parse_filesize("4K"), Ok(4096));
        assert_eq!(parse_filesize("2M"), Ok(2_097_152));
        assert_eq!(parse_filesize("2MB"), Ok(2_097_152));
        assert_eq!(parse_filesize("1.5k"), Ok(1536));
        assert_eq!(parse_filesize("0.5k"), Ok(512));
        assert!(parse_filesize("0").is_err());
        assert!(parse_filesize("0.5").is_err());
        assert!(parse_filesize("0k").is_err());
        assert!(parse_filesize("abc").is_err());
        assert!(parse_filesize("").is_err());
    }

    #[test]
    fn test_keyvalue_splits_once() {
        assert_eq!(
            keyvalue("X-Forwarded-For = 127.0.0.1"),
            Some(("X-Forwarded-For".to_string(), "127.0.0.1".to_string()))
        );
        assert_eq!(
            keyvalue("a=b=c"),
            Some(("a".to_string(), "b=c".to_string()))
        );
        assert_eq!(keyvalue("no separator"), None);
        assert_eq!(keyvalue("=value"), None);
    }

    #[test]
    fn test_malformed_keyvalue_fails_the_batch() {
        let mut session = Session::new();
        let result = apply(
            &mut session,
            &[cmd("http-timeout", "30"), cmd("http-header", "garbage")],
        );
        assert!(matches!(
            result,
            Err(RelayError::InvalidOption { ref option, .. }) if option == "http-header"
        ));
    }

    #[test]
    fn test_boolean_flags_ignore_raw_value() {
        let mut session = Session::new();
        apply(&mut session, &[cmd("hls-live-restart", "false")]).unwrap();
        assert_eq!(
            session.option("hls-live-restart").unwrap().as_bool(),
            Some(true)
        );
    }

    #[test]
    fn test_hard_negations_set_a_different_option() {
        let mut session = Session::new();
        apply(
            &mut session,
            &[cmd("http-no-ssl-verify", ""), cmd("http-ignore-env", "1")],
        )
        .unwrap();

        assert_eq!(
            session.option("http-ssl-verify").unwrap().as_bool(),
            Some(false)
        );
        assert_eq!(
            session.option("http-trust-env").unwrap().as_bool(),
            Some(false)
        );
        assert!(session.option("http-no-ssl-verify").is_none());
        assert!(session.option("http-ignore-env").is_none());
    }

    #[test]
    fn test_ringbuffer_size_goes_through_filesize_parser() {
        let mut session = Session::new();
        apply(&mut session, &[cmd("ringbuffer-size", "16M")]).unwrap();
        assert_eq!(
            session.option("ringbuffer-size").unwrap().as_int(),
            Some(16 * 1024 * 1024)
        );

        let mut session = Session::new();
        let result = apply(&mut session, &[cmd("ringbuffer-size", "zero")]);
        assert!(matches!(result, Err(RelayError::InvalidOption { .. })));
    }

    #[test]
    fn test_plugin_scoped_commands() {
        let mut session = Session::new();
        apply(
            &mut session,
            &[
                cmd("twitch-oauth-token", "tok123"),
                cmd("twitch-oauth-authenticate", ""),
                cmd("resolve-blacklist-netloc", "ads.example.com, cdn.bad"),
            ],
        )
        .unwrap();

        assert_eq!(
            session.plugin_option("twitch", "oauth_token").unwrap().as_str(),
            Some("tok123")
        );
        assert_eq!(
            session
                .plugin_option("twitch", "oauth_authenticate")
                .unwrap()
                .as_bool(),
            Some(true)
        );
        assert_eq!(
            session
                .plugin_option("resolve", "blacklist_netloc")
                .unwrap()
                .as_list(),
            Some(&["ads.example.com".to_string(), "cdn.bad".to_string()][..])
        );
    }

    #[test]
    fn test_passthrough_values_are_not_applied_to_session() {
        let mut session = Session::new();
        let passthrough = apply(
            &mut session,
            &[
                cmd("url", "http://example.com/live"),
                cmd("quality", "720p, best"),
                cmd("cache", "8k"),
                cmd("loglevel", "trace"),
            ],
        )
        .unwrap();

        assert_eq!(session.option_count(), 0);
        assert_eq!(passthrough.scalar("url"), Some("http://example.com/live"));
        assert_eq!(
            passthrough.list("quality"),
            Some(&["720p".to_string(), "best".to_string()][..])
        );
        assert_eq!(passthrough.size("cache"), Some(8192));
        assert_eq!(passthrough.scalar("loglevel"), Some("trace"));
    }

    #[test]
    fn test_passthrough_bad_cache_is_dropped() {
        let mut session = Session::new();
        let passthrough = apply(&mut session, &[cmd("cache", "huge")]).unwrap();
        assert_eq!(passthrough.size("cache"), None);
    }

    #[test]
    fn test_duplicate_scalar_last_write_wins() {
        let mut session = Session::new();
        let passthrough = apply(
            &mut session,
            &[cmd("url", "http://a/"), cmd("url", "http://b/")],
        )
        .unwrap();
        assert_eq!(passthrough.scalar("url"), Some("http://b/"));
    }

    #[test]
    fn test_duplicate_comma_lists_accumulate() {
        let mut session = Session::new();
        let passthrough = apply(
            &mut session,
            &[cmd("quality", "1080p"), cmd("quality", "720p,480p")],
        )
        .unwrap();
        assert_eq!(
            passthrough.list("quality"),
            Some(
                &["1080p".to_string(), "720p".to_string(), "480p".to_string()][..]
            )
        );
    }
}
