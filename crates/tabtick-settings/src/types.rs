//! Settings type definitions.
//!
//! All types use camelCase JSON field names and `#[serde(default)]`, so a
//! partial settings file fills the rest from [`Default`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tabtick_core::urls::DedupOptions;

/// Root settings type.
///
/// ```json
/// {
///   "engine": { "skipPinned": false },
///   "dedup": { "ignoreQuery": true },
///   "categories": { "extra": { "intranet.corp": ["work"] } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabtickSettings {
    /// Rule runner defaults.
    pub engine: EngineSettings,
    /// Duplicate detection canonicalization.
    pub dedup: DedupOptions,
    /// Domain category table additions.
    pub categories: CategorySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Defaults applied to every run unless the caller overrides them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Compute matches and ordering without mutating the browser.
    pub dry_run: bool,
    /// Leave pinned tabs alone unless a rule opts in.
    pub skip_pinned: bool,
    /// Folder used by `bookmark` without a target and by `close.bookmarkFirst`.
    pub default_bookmark_folder: String,
    /// Reason passed to the snooze collaborator, suffixed with the rule name.
    pub snooze_reason: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_pinned: true,
            default_bookmark_folder: "Tab Rules".to_owned(),
            snooze_reason: "rule".to_owned(),
        }
    }
}

/// User-supplied domain → categories entries, consulted before the built-ins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategorySettings {
    /// Extra table entries keyed by domain.
    pub extra: HashMap<String, Vec<String>>,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TabtickSettings =
            serde_json::from_str(r#"{"engine": {"dryRun": true}}"#).unwrap();
        assert!(settings.engine.dry_run);
        assert!(settings.engine.skip_pinned);
        assert_eq!(settings.dedup, DedupOptions::default());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(TabtickSettings::default()).unwrap();
        assert_eq!(json["engine"]["skipPinned"], true);
        assert_eq!(json["engine"]["defaultBookmarkFolder"], "Tab Rules");
        assert_eq!(json["dedup"]["stripWww"], true);
    }
}
