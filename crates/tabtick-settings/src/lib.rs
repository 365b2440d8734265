//! # tabtick-settings
//!
//! Configuration management with layered sources for tabtick.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TabtickSettings::default()`]
//! 2. **User file**: `~/.tabtick/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TABTICK_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use tabtick_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("dry run by default: {}", settings.engine.dry_run);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<TabtickSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.tabtick/settings.json` with env
/// var overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static TabtickSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: TabtickSettings) -> std::result::Result<(), TabtickSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = TabtickSettings::default();
        assert!(!settings.engine.dry_run);
        assert!(settings.engine.skip_pinned);
        assert_eq!(settings.engine.default_bookmark_folder, "Tab Rules");
        assert_eq!(settings.engine.snooze_reason, "rule");
        assert!(settings.dedup.strip_www);
        assert!(settings.categories.extra.is_empty());
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn settings_path_ends_with_tabtick_dir() {
        let path = settings_path();
        assert!(path.ends_with(".tabtick/settings.json"));
    }
}
