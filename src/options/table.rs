//! Static command dispatch table.
//!
//! Maps every accepted command name to exactly one [`OptionAction`]. The
//! table is a plain `match` so the accepted set is a single place in the
//! source rather than string lookups scattered through conditionals.

/// How a command name is applied to the session (or handed back to the
/// caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    /// Set a global string option
    GlobalScalar,
    /// Parse as integer and set; parse failure drops the command
    GlobalNumeric,
    /// Set a global option to `true`, ignoring the raw value
    GlobalBooleanFlag,
    /// Split on `,` and extend a global list option
    GlobalCommaList,
    /// Raw value is itself `key=value`; malformed input fails the batch
    GlobalKeyValue,
    /// Set a string option scoped to the named plugin
    PluginScalar(&'static str, &'static str),
    /// Split on `,` and extend a list option scoped to the named plugin
    PluginCommaList(&'static str, &'static str),
    /// Set a plugin-scoped option to `true`, ignoring the raw value
    PluginBooleanFlag(&'static str, &'static str),
    /// Collect the value for the caller; not applied to the session
    Passthrough,
}

/// Look up the action for a command name. `None` means the name is
/// unknown and the command is ignored.
///
/// `http-no-ssl-verify`, `http-ignore-env` and `ringbuffer-size` are
/// handled ahead of this table by the interpreter.
pub fn action_for(name: &str) -> Option<OptionAction> {
    use OptionAction::*;

    let action = match name {
        // Caller-consumed values
        "cache" | "hls-session-reload" | "l" | "loglevel" | "url" => Passthrough,
        "default-stream" | "q" | "quality" | "stream" | "stream-sorting-excludes"
        | "stream-types" => Passthrough,

        // Global boolean flags
        "ffmpeg-verbose" | "hls-live-restart" | "http-disable-dh" => GlobalBooleanFlag,

        // Global comma-lists
        "hls-audio-select" | "hls-segment-ignore-names" => GlobalCommaList,

        // Global string options
        "ffmpeg-audio-transcode"
        | "ffmpeg-ffmpeg"
        | "ffmpeg-verbose-path"
        | "ffmpeg-video-transcode"
        | "hls-key-uri"
        | "http-proxy"
        | "http-ssl-cert"
        | "https-proxy"
        | "locale"
        | "rtmp-proxy"
        | "rtmp-rtmpdump"
        | "subprocess-errorlog-path" => GlobalScalar,

        // Global numeric options
        "hds-live-edge"
        | "hds-segment-attempts"
        | "hds-segment-threads"
        | "hds-segment-timeout"
        | "hds-timeout"
        | "hls-duration"
        | "hls-live-edge"
        | "hls-playlist-reload-attempts"
        | "hls-segment-attempts"
        | "hls-segment-ignore-number"
        | "hls-segment-threads"
        | "hls-segment-timeout"
        | "hls-start-offset"
        | "hls-timeout"
        | "http-stream-timeout"
        | "http-timeout"
        | "rtmp-timeout"
        | "stream-segment-attempts"
        | "stream-segment-threads"
        | "stream-segment-timeout"
        | "stream-timeout" => GlobalNumeric,

        // key=value options (custom header / cookie / query injection)
        "http-cookie" | "http-header" | "http-query-param" => GlobalKeyValue,

        // Plugin-scoped string options
        "abweb-password" => PluginScalar("abweb", "password"),
        "abweb-username" => PluginScalar("abweb", "username"),
        "afreeca-password" => PluginScalar("afreeca", "password"),
        "afreeca-username" => PluginScalar("afreeca", "username"),
        "animelab-email" => PluginScalar("animelab", "email"),
        "animelab-password" => PluginScalar("animelab", "password"),
        "bbciplayer-password" => PluginScalar("bbciplayer", "password"),
        "bbciplayer-username" => PluginScalar("bbciplayer", "username"),
        "btv-password" => PluginScalar("btv", "password"),
        "btv-username" => PluginScalar("btv", "username"),
        "crunchyroll-password" => PluginScalar("crunchyroll", "password"),
        "crunchyroll-session-id" => PluginScalar("crunchyroll", "session_id"),
        "crunchyroll-username" => PluginScalar("crunchyroll", "username"),
        "funimation-language" => PluginScalar("funimation", "language"),
        "liveedu-email" => PluginScalar("liveedu", "email"),
        "liveedu-password" => PluginScalar("liveedu", "password"),
        "pixiv-password" => PluginScalar("pixiv", "password"),
        "pixiv-username" => PluginScalar("pixiv", "username"),
        "schoolism-email" => PluginScalar("schoolism", "email"),
        "schoolism-part" => PluginScalar("schoolism", "part"),
        "schoolism-password" => PluginScalar("schoolism", "password"),
        "tvplayer-email" => PluginScalar("tvplayer", "email"),
        "tvplayer-password" => PluginScalar("tvplayer", "password"),
        "twitch-oauth-token" => PluginScalar("twitch", "oauth_token"),
        "ustream-password" => PluginScalar("ustreamtv", "password"),
        "wwenetwork-email" => PluginScalar("wwenetwork", "email"),
        "wwenetwork-password" => PluginScalar("wwenetwork", "password"),
        "zattoo-email" => PluginScalar("zattoo", "email"),
        "zattoo-password" => PluginScalar("zattoo", "password"),

        // Plugin-scoped comma-lists
        "resolve-blacklist-netloc" => PluginCommaList("resolve", "blacklist_netloc"),
        "resolve-blacklist-path" => PluginCommaList("resolve", "blacklist_path"),
        "resolve-whitelist-netloc" => PluginCommaList("resolve", "whitelist_netloc"),
        "resolve-whitelist-path" => PluginCommaList("resolve", "whitelist_path"),

        // Plugin-scoped boolean flags
        "abweb-purge-credentials" => PluginBooleanFlag("abweb", "purge_credentials"),
        "funimation-mux-subtitles" => PluginBooleanFlag("funimation", "mux_subtitles"),
        "npo-subtitles" => PluginBooleanFlag("npo", "subtitles"),
        "pluzz-mux-subtitles" => PluginBooleanFlag("pluzz", "mux_subtitles"),
        "resolve-turn-off" => PluginBooleanFlag("resolve", "turn_off"),
        "rtve-mux-subtitles" => PluginBooleanFlag("rtve", "mux_subtitles"),
        "twitch-oauth-authenticate" => PluginBooleanFlag("twitch", "oauth_authenticate"),
        "zattoo-purge-credentials" => PluginBooleanFlag("zattoo", "purge_credentials"),

        _ => return None,
    };

    Some(action)
}
