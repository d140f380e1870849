//! Default values for configuration fields.

use std::path::PathBuf;

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    53422
}

pub fn default_cache_path() -> PathBuf {
    PathBuf::from("streamdata.json")
}

pub fn default_prebuffer() -> u64 {
    4096
}

pub fn default_max_prebuffer() -> u64 {
    16 * 1024 * 1024
}
