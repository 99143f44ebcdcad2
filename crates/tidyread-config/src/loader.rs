// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/tidyread/tidyread.toml`,
//! `~/.config/tidyread/tidyread.toml`, `./tidyread.toml`, `TIDYREAD_*` env.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TidyreadConfig;

/// Sections a `TIDYREAD_<SECTION>_<KEY>` variable may address.
const SECTIONS: &[&str] = &["app", "storage", "queue", "rules", "scanner", "gateway", "metrics"];

/// Config file locations in increasing precedence.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/tidyread/tidyread.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("tidyread/tidyread.toml"));
    }
    paths.push(PathBuf::from("tidyread.toml"));
    paths
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<TidyreadConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<TidyreadConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidyreadConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TidyreadConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TidyreadConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    config_paths().into_iter().fold(
        Figment::new().merge(Serialized::defaults(TidyreadConfig::default())),
        |figment, path| figment.merge(Toml::file(path)),
    )
    .merge(env_provider())
}

/// Map `TIDYREAD_QUEUE_MAX_TRIES` to `queue.max_tries`.
///
/// Only the first underscore after a known section name becomes a dot; key
/// names keep their own underscores.
fn env_provider() -> Env {
    Env::prefixed("TIDYREAD_").map(|key| {
        let key_str = key.as_str();
        let mapped = SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TIDYREAD_QUEUE_MAX_TRIES", "9");
            jail.set_env("TIDYREAD_RULES_VERIFY_UNREAD_COUNT", "false");
            jail.set_env("TIDYREAD_GATEWAY_PORT", "9100");
            let path = jail.directory().join("custom.toml");
            jail.create_file("custom.toml", "[scanner]\npause_ms = 5\n")?;

            let config = load_config_from_path(&path)?;
            assert_eq!(config.queue.max_tries, 9);
            assert!(!config.rules.verify_unread_count);
            assert_eq!(config.gateway.port, 9100);
            assert_eq!(config.scanner.pause_ms, 5);
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("tidyread.toml", "[queue]\nworkers = 2\n")?;
            let config = load_config()?;
            assert_eq!(config.queue.workers, 2);
            assert_eq!(config.queue.max_tries, 5);
            Ok(())
        });
    }
}
