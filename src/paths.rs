//! Path resolution for pcmkctl
//!
//! # Environment Variables
//!
//! - `PCMKCTL_CONFIG_DIR` - Override config directory (e.g., `/etc/pcmkctl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PCMKCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/pcmkctl` (if set)
//! 3. `~/.config/pcmkctl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PCMKCTL_CONFIG_DIR";

/// Get the pcmkctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("pcmkctl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("pcmkctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment.
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Run `f` with `key` set to `value` (or removed when `None`).
    pub(crate) fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let original = env::var(key).ok();
        // SAFETY: every test touching the environment holds ENV_LOCK
        match value {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, Some("/etc/pcmkctl"), || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/etc/pcmkctl"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, Some("~/cluster/pcmkctl"), || {
            assert_eq!(config_dir().unwrap(), home.join("cluster").join("pcmkctl"));
        });
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/cib.xml"), home.join("cib.xml"));
        assert_eq!(
            expand("/path/$NONEXISTENT_PCMKCTL_VAR/cib.xml"),
            PathBuf::from("/path/$NONEXISTENT_PCMKCTL_VAR/cib.xml")
        );
    }
}
