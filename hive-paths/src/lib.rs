//! XDG Base Directory paths for hive.
//!
//! Hosts and the `hive` CLI resolve their default locations through these
//! helpers so that the reference document, the configuration and the
//! restore cache end up in the same places on every platform.

use std::path::PathBuf;

const APP_DIR: &str = "hive";

/// Get the hive config directory.
///
/// Returns `$XDG_CONFIG_HOME/hive` if set, otherwise `~/.config/hive`.
/// The configuration file and the package reference document live here.
///
/// # Examples
///
/// ```
/// use hive_paths::config_dir;
///
/// let references = config_dir().join("references.json");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the hive cache directory.
///
/// Returns `$XDG_CACHE_HOME/hive` if set, otherwise `~/.cache/hive`.
/// Restored packages are built into `cache_dir().join("packages")`.
pub fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}

/// Default location of the persisted package reference document.
pub fn references_file() -> PathBuf {
    config_dir().join("references.json")
}

/// Default root of the restore cache.
pub fn packages_dir() -> PathBuf {
    cache_dir().join("packages")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(var)
        && !base.is_empty()
    {
        PathBuf::from(base).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join(APP_DIR)
    } else {
        PathBuf::from(home_relative).join(APP_DIR)
    }
}
