// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatline.toml` > `~/.config/chatline/chatline.toml`
//! > `/etc/chatline/chatline.toml`, with `CHATLINE_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatlineConfig;

/// Config file name looked up in every layer.
pub const CONFIG_FILE_NAME: &str = "chatline.toml";

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/chatline/chatline.toml";

/// Sections addressable through `CHATLINE_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "endpoint",
    "session",
    "channel",
    "transport",
    "pipeline",
    "log",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatline/chatline.toml`
/// 3. `~/.config/chatline/chatline.toml`
/// 4. `./chatline.toml`
/// 5. `CHATLINE_*` environment variables
pub fn load_config() -> Result<ChatlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ChatlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatlineConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatlineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// `~/.config/chatline/chatline.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatline").join(CONFIG_FILE_NAME))
}

/// Environment provider mapping `CHATLINE_SESSION_CONVERSATION_ID` to
/// `session.conversation_id`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("CHATLINE_").map(|key| {
        // Keys arrive in their original (upper) case.
        let key_str = key.as_str().to_ascii_lowercase();
        for section in ENV_SECTIONS {
            if let Some(rest) = key_str.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.into()
    })
}
