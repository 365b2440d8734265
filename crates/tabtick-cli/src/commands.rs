//! Subcommand implementations. Each returns the JSON value to print.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tabtick_rules::{
    ActionKind, Collaborators, Rule, RuleRunner, RunOptions, Scope, get_compatible_actions,
    parse_rules, validate_rule,
};
use tabtick_settings::TabtickSettings;
use tracing::info;

use crate::snapshot::{Snapshot, SnapshotHost};

/// One line of `validate` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleValidation {
    /// Rule id.
    pub rule_id: String,
    /// Condition compiles and the action list is valid.
    pub valid: bool,
    /// First failure, when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Switches for `run`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunFlags {
    /// Force a dry run regardless of settings.
    pub dry_run: bool,
    /// Run disabled rules.
    pub force: bool,
    /// Evaluate pinned tabs for every rule.
    pub include_pinned: bool,
}

/// Load settings from `path` (or the default location) and install them
/// as the process-wide settings. A second call keeps the first value.
pub fn install_settings(path: Option<&Path>) -> Result<&'static TabtickSettings> {
    let path = path.map_or_else(tabtick_settings::settings_path, Path::to_path_buf);
    let settings = tabtick_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;
    let _ = tabtick_settings::init_settings(settings);
    Ok(tabtick_settings::get_settings())
}

/// Read and parse a rules file.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules: {}", path.display()))?;
    parse_rules(&content).with_context(|| format!("Failed to parse rules: {}", path.display()))
}

/// Compile and validate every rule.
pub fn validate(rules: &[Rule]) -> Vec<RuleValidation> {
    rules
        .iter()
        .map(|rule| {
            let error = validate_rule(rule).err().map(|e| e.to_string());
            RuleValidation {
                rule_id: rule.id.clone(),
                valid: error.is_none(),
                error,
            }
        })
        .collect()
}

/// Preview one rule against a snapshot.
pub fn preview(
    settings: &TabtickSettings,
    snapshot: Snapshot,
    rules: &[Rule],
    rule_id: &str,
) -> Result<Value> {
    let Some(rule) = rules.iter().find(|r| r.id == rule_id) else {
        bail!("No rule with id '{rule_id}'");
    };
    let Snapshot {
        mut tabs, windows, ..
    } = snapshot.clone();
    let runner = runner(settings, Arc::new(SnapshotHost::new(snapshot)));
    let report = runner
        .preview_rule(rule, &mut tabs, &windows, &runner.default_options())
        .with_context(|| format!("Rule '{rule_id}' does not compile"))?;
    Ok(serde_json::to_value(report)?)
}

/// Run a rule set against a snapshot host. Returns the report and the
/// host's final state.
pub async fn run(
    settings: &TabtickSettings,
    snapshot: Snapshot,
    rules: &[Rule],
    flags: RunFlags,
) -> Result<(Value, Snapshot)> {
    let host = Arc::new(SnapshotHost::new(snapshot));
    let runner = runner(settings, Arc::clone(&host));
    let options = run_options(runner.default_options(), flags);

    let report = runner
        .run_rules_from_source(rules, host.as_ref(), Scope::All, &options)
        .await
        .context("Failed to read tabs from snapshot")?;
    info!(
        rules = report.rules.len(),
        matches = report.total_matches,
        actions = report.total_actions,
        dry_run = report.dry_run,
        "run finished"
    );
    Ok((serde_json::to_value(report)?, host.snapshot()))
}

/// Action kinds that may still be appended to `existing`.
pub fn compatible(existing: &[String]) -> Vec<ActionKind> {
    let kinds: Vec<ActionKind> = existing.iter().map(|name| ActionKind::parse(name)).collect();
    get_compatible_actions(&kinds)
}

fn runner(settings: &TabtickSettings, host: Arc<SnapshotHost>) -> RuleRunner {
    RuleRunner::new(Collaborators::from_host(host)).with_settings(settings)
}

fn run_options(mut options: RunOptions, flags: RunFlags) -> RunOptions {
    options.dry_run |= flags.dry_run;
    options.force_execution = flags.force;
    if flags.include_pinned {
        options.skip_pinned = false;
    }
    options
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"[
        {
            "id": "dupes",
            "name": "Close duplicates",
            "when": {"subject": "duplicate(dedupKey)"},
            "then": [{"type": "close"}]
        },
        {
            "id": "news",
            "name": "Group news",
            "when": {"subject": "category", "operator": "equals", "value": "news_media"},
            "then": [{"type": "group", "name": "News"}, {"type": "mute"}]
        },
        {
            "id": "broken",
            "when": {"subject": "tab.colour", "operator": "equals", "value": "red"},
            "then": [{"type": "pin"}]
        }
    ]"#;

    const SNAPSHOT: &str = r#"{
        "tabs": [
            {"id": 1, "windowId": 1, "url": "https://a.com/x"},
            {"id": 2, "windowId": 1, "url": "https://www.a.com/x/"},
            {"id": 3, "windowId": 1, "url": "https://bbc.com/news", "audible": true},
            {"id": 4, "windowId": 1, "url": "https://a.com/y", "pinned": true}
        ],
        "windows": [{"id": 1, "focused": true}]
    }"#;

    fn rules() -> Vec<Rule> {
        parse_rules(RULES).unwrap()
    }

    fn snapshot() -> Snapshot {
        serde_json::from_str(SNAPSHOT).unwrap()
    }

    #[test]
    fn validate_reports_each_rule() {
        let results = validate(&rules());
        assert_eq!(results.len(), 3);
        assert!(results[0].valid && results[1].valid);
        assert!(!results[2].valid);
        assert!(results[2].error.as_deref().unwrap().contains("tab.colour"));

        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json, serde_json::json!({"ruleId": "dupes", "valid": true}));
    }

    #[test]
    fn preview_lists_matches_without_mutating() {
        let report = preview(&TabtickSettings::default(), snapshot(), &rules(), "dupes").unwrap();
        assert_eq!(report["totalMatches"], 2);
        assert_eq!(report["actions"], serde_json::json!(["close"]));
    }

    #[test]
    fn preview_unknown_rule_is_an_error() {
        let err = preview(&TabtickSettings::default(), snapshot(), &rules(), "nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn run_mutates_the_snapshot() {
        let (report, after) = run(
            &TabtickSettings::default(),
            snapshot(),
            &rules(),
            RunFlags::default(),
        )
        .await
        .unwrap();

        assert_eq!(report["errors"].as_array().unwrap().len(), 1);
        assert_eq!(report["errors"][0]["ruleId"], "broken");
        let ids: Vec<i64> = after.tabs.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(after.groups.len(), 1);
        assert_eq!(after.groups[0].title, "News");
        assert!(after.tabs[0].muted);
        assert_eq!(after.tabs[0].group_id, Some(after.groups[0].id));
    }

    #[tokio::test]
    async fn dry_run_leaves_the_snapshot_alone() {
        let flags = RunFlags {
            dry_run: true,
            ..RunFlags::default()
        };
        let (report, after) = run(&TabtickSettings::default(), snapshot(), &rules(), flags)
            .await
            .unwrap();
        assert_eq!(report["dryRun"], true);
        assert_eq!(after, snapshot());
    }

    #[tokio::test]
    async fn include_pinned_widens_matches() {
        let only_a: Vec<Rule> = parse_rules(
            r#"[{"id": "a", "when": {"subject": "domain", "operator": "equals", "value": "a.com"}, "then": [{"type": "mute"}]}]"#,
        )
        .unwrap();
        let (report, _) = run(&TabtickSettings::default(), snapshot(), &only_a, RunFlags::default())
            .await
            .unwrap();
        assert_eq!(report["totalMatches"], 2);

        let flags = RunFlags {
            include_pinned: true,
            ..RunFlags::default()
        };
        let (report, _) = run(&TabtickSettings::default(), snapshot(), &only_a, flags)
            .await
            .unwrap();
        assert_eq!(report["totalMatches"], 3);
    }

    #[test]
    fn installed_settings_become_global() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"engine": {"defaultBookmarkFolder": "Archive"}}"#).unwrap();

        let settings = install_settings(Some(&path)).unwrap();
        assert_eq!(settings.engine.default_bookmark_folder, "Archive");
        assert!(std::ptr::eq(settings, tabtick_settings::get_settings()));

        let other = dir.path().join("other.json");
        std::fs::write(&other, r#"{"engine": {"defaultBookmarkFolder": "Other"}}"#).unwrap();
        let again = install_settings(Some(&other)).unwrap();
        assert_eq!(again.engine.default_bookmark_folder, "Archive");
    }

    #[test]
    fn compatible_kinds() {
        let kinds = compatible(&["pin".to_owned(), "mute".to_owned()]);
        assert!(!kinds.contains(&ActionKind::Close));
        assert!(kinds.contains(&ActionKind::Group));
        assert!(compatible(&["close".to_owned()]).is_empty());
    }
}
