//! Rule runner.
//!
//! Orchestrates one pass: index the tabs once, build one
//! [`ExecutionContext`], then for each rule in input order evaluate and
//! execute. Failures are recovered at the smallest scope (tab, then rule)
//! and surfaced in the [`RunReport`]; nothing escapes the runner.
//!
//! Cancellation is checked only between rules. A rule that has started
//! always runs its whole action list.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tabtick_core::categories::{CategoryLookup, DomainCategoryTable};
use tabtick_core::duration::format_age;
use tabtick_core::urls::DedupOptions;
use tabtick_core::{Tab, TabId, Window, WindowId};
use tabtick_settings::{EngineSettings, TabtickSettings};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::{ActionKind, sort_actions_by_priority, validate_action_list};
use crate::collaborators::{Collaborators, Scope, TabSource};
use crate::errors::{BrowserError, CompileError, RuleError};
use crate::evaluator::{EvaluateOptions, TabEvaluationError, evaluate_rule};
use crate::executor::{ActionResult, ExecutionContext, execute_actions};
use crate::indices::{IndexBuilder, Indices};
use crate::predicate::compile;
use crate::rule::Rule;

/// Switches for one run or preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute everything, call no mutating collaborator.
    pub dry_run: bool,
    /// Skip pinned tabs unless a rule opts in.
    pub skip_pinned: bool,
    /// Run disabled rules too.
    pub force_execution: bool,
    /// Clock override (epoch ms). `None` reads the system clock.
    pub now_ms: Option<i64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

impl RunOptions {
    /// Options seeded from engine settings.
    pub fn from_settings(engine: &EngineSettings) -> Self {
        Self {
            dry_run: engine.dry_run,
            skip_pinned: engine.skip_pinned,
            force_execution: false,
            now_ms: None,
        }
    }

    fn now(&self) -> i64 {
        self.now_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }

    fn evaluate_options(&self) -> EvaluateOptions {
        EvaluateOptions {
            skip_pinned: self.skip_pinned,
        }
    }
}

/// Per-rule section of a [`RunReport`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    /// Rule id.
    pub rule_id: String,
    /// Rule name.
    pub rule_name: String,
    /// Number of matching tabs.
    pub match_count: usize,
    /// Matching tab ids, in input order.
    pub matches: Vec<TabId>,
    /// One result per (action, tab) attempt.
    pub actions: Vec<ActionResult>,
    /// Tabs excluded because their context could not be built.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_errors: Vec<TabEvaluationError>,
}

/// A rule that failed as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    /// Rule id.
    pub rule_id: String,
    /// Rule name.
    pub rule_name: String,
    /// Failure message.
    pub error: String,
}

/// Aggregate result of [`RuleRunner::run_rules`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Rules that ran, in input order.
    pub rules: Vec<RuleReport>,
    /// Ids of disabled rules that were not run.
    pub skipped: Vec<String>,
    /// Rules that failed to compile or had an invalid action list.
    pub errors: Vec<RuleFailure>,
    /// Configuration warnings.
    pub warnings: Vec<String>,
    /// Sum of `match_count`.
    pub total_matches: usize,
    /// Sum of action results.
    pub total_actions: usize,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Stopped early by cancellation.
    pub cancelled: bool,
}

impl RunReport {
    /// Report section for `rule_id`.
    pub fn rule(&self, rule_id: &str) -> Option<&RuleReport> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Action results that failed.
    pub fn failed_actions(&self) -> impl Iterator<Item = &ActionResult> {
        self.rules
            .iter()
            .flat_map(|r| r.actions.iter())
            .filter(|a| !a.success)
    }
}

/// One tab in a [`PreviewReport`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewMatch {
    /// Tab id.
    pub tab_id: TabId,
    /// Owning window.
    pub window_id: WindowId,
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Derived domain.
    pub domain: String,
    /// Primary category.
    pub category: String,
    /// Human-readable age, e.g. `3h`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_label: Option<String>,
    /// Human-readable time since last access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access_label: Option<String>,
}

impl PreviewMatch {
    fn from_tab(tab: &Tab) -> Self {
        let derived = tab.derived.as_ref();
        Self {
            tab_id: tab.id,
            window_id: tab.window_id,
            title: tab.title.clone(),
            url: tab.url.clone(),
            domain: derived.map(|d| d.domain.clone()).unwrap_or_default(),
            category: derived.map(|d| d.category.clone()).unwrap_or_default(),
            age_label: derived.and_then(|d| d.age_ms).map(format_age),
            last_access_label: derived.and_then(|d| d.last_access_ms).map(format_age),
        }
    }
}

/// Read-only answer to "what would this rule do right now?".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    /// Rule id.
    pub rule_id: String,
    /// Rule name.
    pub rule_name: String,
    /// Whether the rule is enabled. Previews ignore it.
    pub enabled: bool,
    /// Number of matching tabs.
    pub total_matches: usize,
    /// Matching tabs.
    pub matches: Vec<PreviewMatch>,
    /// Action kinds that would run, in execution order.
    pub actions: Vec<ActionKind>,
    /// Whether the action list passes validation.
    pub action_list_valid: bool,
    /// Validation messages.
    pub action_list_errors: Vec<String>,
    /// Configuration warnings.
    pub warnings: Vec<String>,
    /// Tabs excluded because their context could not be built.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluation_errors: Vec<TabEvaluationError>,
}

/// Pre-save check: the condition compiles and the action list is valid.
pub fn validate_rule(rule: &Rule) -> Result<(), RuleError> {
    let _ = compile(&rule.when)?;
    let validation = validate_action_list(&rule.then);
    if !validation.valid {
        return Err(RuleError::ActionListInvalid {
            errors: validation.errors,
        });
    }
    Ok(())
}

/// Runs and previews rule sets against one set of collaborators.
pub struct RuleRunner {
    collaborators: Collaborators,
    categories: Arc<dyn CategoryLookup>,
    dedup: DedupOptions,
    engine: EngineSettings,
}

impl RuleRunner {
    /// Runner with the built-in category table and default settings.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            categories: Arc::new(DomainCategoryTable::new()),
            dedup: DedupOptions::default(),
            engine: EngineSettings::default(),
        }
    }

    /// Apply dedup options, extra categories, and engine defaults.
    #[must_use]
    pub fn with_settings(mut self, settings: &TabtickSettings) -> Self {
        self.categories = Arc::new(DomainCategoryTable::with_extra(
            settings.categories.extra.clone(),
        ));
        self.dedup = settings.dedup.clone();
        self.engine = settings.engine.clone();
        self
    }

    /// Replace the category lookup.
    #[must_use]
    pub fn with_categories(mut self, categories: Arc<dyn CategoryLookup>) -> Self {
        self.categories = categories;
        self
    }

    /// Run options seeded from this runner's engine settings.
    pub fn default_options(&self) -> RunOptions {
        RunOptions::from_settings(&self.engine)
    }

    /// Index `tabs` in place with this runner's table and dedup options.
    pub fn build_indices(&self, tabs: &mut [Tab], now_ms: i64) -> Indices {
        IndexBuilder::new(self.categories.as_ref(), &self.dedup, now_ms).build(tabs)
    }

    /// Run every rule against `tabs`.
    pub async fn run_rules(
        &self,
        rules: &[Rule],
        tabs: &mut [Tab],
        windows: &[Window],
        options: &RunOptions,
    ) -> RunReport {
        self.run_rules_cancellable(rules, tabs, windows, options, &CancellationToken::new())
            .await
    }

    /// Run every rule, stopping between rules once `cancel` fires.
    pub async fn run_rules_cancellable(
        &self,
        rules: &[Rule],
        tabs: &mut [Tab],
        windows: &[Window],
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> RunReport {
        let started = Instant::now();
        let now_ms = options.now();
        let indices = self.build_indices(tabs, now_ms);
        let tabs: &[Tab] = tabs;
        let mut ctx = ExecutionContext::from_settings(&self.engine, options.dry_run, now_ms);
        let mut report = RunReport {
            dry_run: options.dry_run,
            ..RunReport::default()
        };

        for rule in rules {
            if cancel.is_cancelled() {
                info!(rule_id = %rule.id, "run cancelled before rule");
                report.cancelled = true;
                break;
            }
            if !rule.enabled && !options.force_execution {
                debug!(rule_id = %rule.id, "rule disabled, skipping");
                report.skipped.push(rule.id.clone());
                continue;
            }

            match self
                .run_one(rule, tabs, windows, &indices, &mut ctx, options, &mut report.warnings)
                .await
            {
                Ok(rule_report) => {
                    report.total_matches += rule_report.match_count;
                    report.total_actions += rule_report.actions.len();
                    report.rules.push(rule_report);
                }
                Err(error) => {
                    warn!(rule_id = %rule.id, error = %error, "rule failed");
                    report.errors.push(RuleFailure {
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            rules = report.rules.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            total_matches = report.total_matches,
            total_actions = report.total_actions,
            duration_ms = report.duration_ms,
            dry_run = report.dry_run,
            cancelled = report.cancelled,
            "rule run complete"
        );
        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_one(
        &self,
        rule: &Rule,
        tabs: &[Tab],
        windows: &[Window],
        indices: &Indices,
        ctx: &mut ExecutionContext,
        options: &RunOptions,
        warnings: &mut Vec<String>,
    ) -> Result<RuleReport, RuleError> {
        if !rule.then.is_empty() {
            let validation = validate_action_list(&rule.then);
            if !validation.valid {
                return Err(RuleError::ActionListInvalid {
                    errors: validation.errors,
                });
            }
        }

        let mut evaluation = evaluate_rule(rule, tabs, windows, indices, &options.evaluate_options())?;
        warnings.extend(evaluation.warnings.iter().cloned());

        let before = evaluation.matches.len();
        evaluation.matches.retain(|tab| !ctx.is_consumed(tab.id));
        if evaluation.matches.len() < before {
            debug!(
                rule_id = %rule.id,
                dropped = before - evaluation.matches.len(),
                "skipping tabs closed earlier in the run"
            );
        }

        let actions = if evaluation.matches.is_empty() || rule.then.is_empty() {
            Vec::new()
        } else {
            ctx.begin_rule(&rule.id, rule.label());
            execute_actions(&rule.then, &evaluation.matches, ctx, &self.collaborators).await?
        };

        debug!(
            rule_id = %rule.id,
            matches = evaluation.matches.len(),
            actions = actions.len(),
            dry_run = ctx.dry_run(),
            "rule complete"
        );
        Ok(RuleReport {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            match_count: evaluation.matches.len(),
            matches: evaluation.match_ids(),
            actions,
            evaluation_errors: evaluation.errors,
        })
    }

    /// Query the source for `scope`, then run.
    pub async fn run_rules_from_source(
        &self,
        rules: &[Rule],
        source: &dyn TabSource,
        scope: Scope,
        options: &RunOptions,
    ) -> Result<RunReport, BrowserError> {
        let mut tabs = source.query_tabs(scope).await?;
        let windows = source.query_windows().await?;
        Ok(self.run_rules(rules, &mut tabs, &windows, options).await)
    }

    /// Index `tabs`, then preview `rule`. Never mutates anything but the
    /// tabs' derived fields.
    pub fn preview_rule(
        &self,
        rule: &Rule,
        tabs: &mut [Tab],
        windows: &[Window],
        options: &RunOptions,
    ) -> Result<PreviewReport, CompileError> {
        let indices = self.build_indices(tabs, options.now());
        preview_rule_indexed(rule, tabs, windows, &indices, options)
    }
}

/// Preview `rule` against tabs already indexed into `indices`.
pub fn preview_rule_indexed(
    rule: &Rule,
    tabs: &[Tab],
    windows: &[Window],
    indices: &Indices,
    options: &RunOptions,
) -> Result<PreviewReport, CompileError> {
    let evaluation = evaluate_rule(rule, tabs, windows, indices, &options.evaluate_options())?;
    let validation = validate_action_list(&rule.then);
    Ok(PreviewReport {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        enabled: rule.enabled,
        total_matches: evaluation.matches.len(),
        matches: evaluation
            .matches
            .iter()
            .map(|tab| PreviewMatch::from_tab(tab))
            .collect(),
        actions: sort_actions_by_priority(&rule.then)
            .iter()
            .map(crate::actions::Action::kind)
            .collect(),
        action_list_valid: validation.valid,
        action_list_errors: validation.errors,
        warnings: evaluation.warnings,
        evaluation_errors: evaluation.errors,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
