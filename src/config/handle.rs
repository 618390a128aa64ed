//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement, so the
//! watcher can swap in an edited `sitepipe.toml` while the server thread keeps
//! reading.
//!
//! ```text
//!   server thread        rayon workers        watch thread
//!        │                     │                    │
//!      cfg()                 cfg()          reload_config()
//!   (lock-free)           (lock-free)      (atomic replace)
//! ```

use super::SiteConfig;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::{
    fs,
    sync::{Arc, LazyLock},
};

/// Global config storage, replaced with the loaded config in main.
pub static CONFIG: LazyLock<ArcSwap<SiteConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(SiteConfig::default()));

/// Hash of the config file content behind [`CONFIG`].
static CONFIG_HASH: Mutex<Option<blake3::Hash>> = Mutex::new(None);

/// Serializes tests that install a global config.
#[cfg(test)]
pub static GLOBAL_CONFIG_LOCK: Mutex<()> = Mutex::new(());

/// Get current config. Wait-free; the `Arc` derefs to `&SiteConfig`.
#[inline]
pub fn cfg() -> Arc<SiteConfig> {
    CONFIG.load_full()
}

/// Initialize global config (called once at startup).
pub fn init_config(config: SiteConfig) {
    *CONFIG_HASH.lock() = fs::read(&config.config_path)
        .ok()
        .map(|content| blake3::hash(&content));
    CONFIG.store(Arc::new(config));
}

/// Re-read the config file and swap it in.
///
/// Returns `false` when the file content is unchanged since the last load
/// (editors often write the same bytes twice).
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed, or fails validation. The
/// previous config stays active in that case.
pub fn reload_config() -> Result<bool> {
    let current = cfg();
    let cli = current
        .get_cli()
        .context("Config was not loaded from the command line")?;

    let content = fs::read(&current.config_path)
        .with_context(|| format!("Failed to read {}", current.config_path.display()))?;
    let hash = blake3::hash(&content);

    if *CONFIG_HASH.lock() == Some(hash) {
        return Ok(false);
    }

    let config = SiteConfig::load(cli)?;
    config.validate()?;

    CONFIG.store(Arc::new(config));
    *CONFIG_HASH.lock() = Some(hash);

    Ok(true)
}
