//! Rule evaluator.
//!
//! Compiles a rule's condition once and applies it to every tab of the
//! pass. `rule.enabled` is deliberately ignored here; gating disabled rules
//! is the runner's job, so disabled rules stay previewable.

use std::collections::HashMap;

use serde::Serialize;
use tabtick_core::{Tab, TabDerived, TabId, Window, WindowId};
use tracing::{debug, warn};

use crate::errors::{CompileError, EvaluationError};
use crate::indices::Indices;
use crate::predicate::compile;
use crate::rule::Rule;

/// Everything a predicate can see for one (rule, tab) pair. Read-only.
#[derive(Clone, Copy, Debug)]
pub struct EvaluationContext<'a> {
    /// The tab under evaluation.
    pub tab: &'a Tab,
    /// Its derived fields for this pass.
    pub derived: &'a TabDerived,
    /// Its window, when the snapshot includes it.
    pub window: Option<&'a Window>,
    /// Indices for this pass.
    pub indices: &'a Indices,
    /// Another tab shares the dedup key.
    pub is_dupe: bool,
    /// Tabs sharing the domain.
    pub domain_count: usize,
    /// Tabs in the same window.
    pub window_tab_count: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Build the context for `tab`. Fails when the tab was not indexed.
    pub fn new(
        tab: &'a Tab,
        window: Option<&'a Window>,
        indices: &'a Indices,
        window_tab_count: usize,
    ) -> Result<Self, EvaluationError> {
        let derived = tab
            .derived
            .as_ref()
            .ok_or(EvaluationError::NotIndexed { tab_id: tab.id })?;
        Ok(Self {
            tab,
            derived,
            window,
            indices,
            is_dupe: indices.dedup_group_size(&derived.dedup_key) > 1,
            domain_count: indices.domain_group_size(&derived.domain),
            window_tab_count,
        })
    }
}

/// Evaluation switches for one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// Skip pinned tabs unless the rule sets `includePinned`.
    pub skip_pinned: bool,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self { skip_pinned: true }
    }
}

/// A tab excluded from the match set because its context could not be built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEvaluationError {
    /// Offending tab.
    pub tab_id: TabId,
    /// Human-readable reason.
    pub message: String,
}

/// Outcome of evaluating one rule.
#[derive(Clone, Debug, Default)]
pub struct RuleEvaluation<'a> {
    /// Matching tabs, in input order.
    pub matches: Vec<&'a Tab>,
    /// Per-tab failures. Those tabs are not in `matches`.
    pub errors: Vec<TabEvaluationError>,
    /// Configuration warnings, e.g. an empty top-level junction.
    pub warnings: Vec<String>,
}

impl RuleEvaluation<'_> {
    /// Ids of the matching tabs.
    pub fn match_ids(&self) -> Vec<TabId> {
        self.matches.iter().map(|tab| tab.id).collect()
    }
}

/// Evaluate `rule` against every tab.
///
/// `tabs` must have been indexed into `indices` for this pass. A compile
/// failure is returned to the caller; per-tab failures are recorded in the
/// result.
pub fn evaluate_rule<'a>(
    rule: &Rule,
    tabs: &'a [Tab],
    windows: &[Window],
    indices: &Indices,
    options: &EvaluateOptions,
) -> Result<RuleEvaluation<'a>, CompileError> {
    let predicate = compile(&rule.when)?;
    let mut evaluation = RuleEvaluation::default();

    if rule.when.is_empty_junction() {
        warn!(rule_id = %rule.id, "rule condition is an empty junction, matching nothing");
        evaluation
            .warnings
            .push(format!("rule '{}' has an empty condition and matches nothing", rule.id));
        return Ok(evaluation);
    }

    let windows_by_id: HashMap<WindowId, &Window> = windows.iter().map(|w| (w.id, w)).collect();
    let mut window_counts: HashMap<WindowId, usize> = HashMap::new();
    for tab in tabs {
        *window_counts.entry(tab.window_id).or_default() += 1;
    }

    let include_pinned = !options.skip_pinned || rule.flags.include_pinned;
    for tab in tabs {
        if tab.pinned && !include_pinned {
            continue;
        }
        let window = windows_by_id.get(&tab.window_id).copied();
        let count = window_counts.get(&tab.window_id).copied().unwrap_or_default();
        match EvaluationContext::new(tab, window, indices, count) {
            Ok(ctx) => {
                if predicate.matches(&ctx) {
                    evaluation.matches.push(tab);
                }
            }
            Err(e) => {
                warn!(rule_id = %rule.id, tab_id = %tab.id, error = %e, "tab evaluation failed");
                evaluation.errors.push(TabEvaluationError {
                    tab_id: tab.id,
                    message: e.to_string(),
                });
            }
        }
    }

    debug!(
        rule_id = %rule.id,
        matches = evaluation.matches.len(),
        errors = evaluation.errors.len(),
        "evaluated rule"
    );
    Ok(evaluation)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Operator};
    use crate::indices::build_indices;
    use assert_matches::assert_matches;
    use tabtick_core::logging::capture_logs;

    const NOW: i64 = 1_700_000_000_000;

    fn tab(id: i64, url: &str) -> Tab {
        Tab::new(TabId::new(id), WindowId::new(1), url)
    }

    fn ids(evaluation: &RuleEvaluation<'_>) -> Vec<i64> {
        evaluation.matches.iter().map(|t| t.id.get()).collect()
    }

    fn dupes_rule() -> Rule {
        Rule::new("dupes", "Close duplicates", Condition::is_true("duplicate(dedupKey)"))
    }

    #[test]
    fn duplicate_scenario_matches_both_copies() {
        let mut tabs = vec![
            tab(1, "https://a.com"),
            tab(2, "https://a.com"),
            tab(3, "https://b.com"),
        ];
        let indices = build_indices(&mut tabs, NOW);
        let evaluation =
            evaluate_rule(&dupes_rule(), &tabs, &[], &indices, &EvaluateOptions::default()).unwrap();
        assert_eq!(ids(&evaluation), vec![1, 2]);
        assert!(evaluation.errors.is_empty());
    }

    #[test]
    fn pinned_tabs_skipped_unless_opted_in() {
        let mut pinned = tab(1, "https://a.com");
        pinned.pinned = true;
        let mut tabs = vec![pinned, tab(2, "https://a.com")];
        let indices = build_indices(&mut tabs, NOW);

        let rule = dupes_rule();
        let skip = EvaluateOptions { skip_pinned: true };
        let evaluation = evaluate_rule(&rule, &tabs, &[], &indices, &skip).unwrap();
        assert_eq!(ids(&evaluation), vec![2]);

        let mut opted_in = rule.clone();
        opted_in.flags.include_pinned = true;
        let evaluation = evaluate_rule(&opted_in, &tabs, &[], &indices, &skip).unwrap();
        assert_eq!(ids(&evaluation), vec![1, 2]);

        let keep = EvaluateOptions { skip_pinned: false };
        let evaluation = evaluate_rule(&rule, &tabs, &[], &indices, &keep).unwrap();
        assert_eq!(ids(&evaluation), vec![1, 2]);
    }

    #[test]
    fn disabled_rules_still_evaluate() {
        let mut tabs = vec![tab(1, "https://a.com")];
        let indices = build_indices(&mut tabs, NOW);
        let rule = Rule::new("r", "", Condition::leaf("domain", Operator::Equals, "a.com")).enabled(false);
        let evaluation = evaluate_rule(&rule, &tabs, &[], &indices, &EvaluateOptions::default()).unwrap();
        assert_eq!(ids(&evaluation), vec![1]);
    }

    #[test]
    fn compile_error_propagates() {
        let tabs = vec![tab(1, "https://a.com")];
        let rule = Rule::new("bad", "", Condition::is_true("tab.nope"));
        let result = evaluate_rule(&rule, &tabs, &[], &Indices::default(), &EvaluateOptions::default());
        assert_matches!(result, Err(CompileError::UnknownSubject { .. }));
    }

    #[test]
    fn unindexed_tab_is_a_per_tab_error() {
        let mut tabs = vec![tab(1, "https://a.com"), tab(2, "https://a.com")];
        let indices = build_indices(&mut tabs, NOW);
        tabs.push(tab(3, "https://a.com"));

        let (logs, _guard) = capture_logs();
        let rule = Rule::new("all", "", Condition::leaf("domain", Operator::Equals, "a.com"));
        let evaluation = evaluate_rule(&rule, &tabs, &[], &indices, &EvaluateOptions::default()).unwrap();
        assert_eq!(ids(&evaluation), vec![1, 2]);
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(evaluation.errors[0].tab_id, TabId::new(3));
        assert!(logs.has_event(tracing::Level::WARN, "tab evaluation failed"));
    }

    #[test]
    fn empty_junction_warns_and_matches_nothing() {
        let mut tabs = vec![tab(1, "https://a.com")];
        let indices = build_indices(&mut tabs, NOW);
        let rule = Rule::new("empty", "", Condition::All(vec![]));
        let evaluation = evaluate_rule(&rule, &tabs, &[], &indices, &EvaluateOptions::default()).unwrap();
        assert!(evaluation.matches.is_empty());
        assert_eq!(evaluation.warnings.len(), 1);
    }

    #[test]
    fn window_subjects_see_the_tab_window() {
        let mut other = tab(2, "https://b.com");
        other.window_id = WindowId::new(2);
        let mut tabs = vec![tab(1, "https://a.com"), other, tab(3, "https://c.com")];
        let indices = build_indices(&mut tabs, NOW);
        let mut focused = Window::new(WindowId::new(2));
        focused.focused = true;
        let windows = vec![Window::new(WindowId::new(1)), focused];

        let rule = Rule::new("f", "", Condition::is_true("window.focused"));
        let evaluation = evaluate_rule(&rule, &tabs, &windows, &indices, &EvaluateOptions::default()).unwrap();
        assert_eq!(ids(&evaluation), vec![2]);

        let rule = Rule::new(
            "c",
            "",
            Condition::leaf("window.tab_count", Operator::GreaterThan, 1_i64),
        );
        let evaluation = evaluate_rule(&rule, &tabs, &windows, &indices, &EvaluateOptions::default()).unwrap();
        assert_eq!(ids(&evaluation), vec![1, 3]);
    }
}
