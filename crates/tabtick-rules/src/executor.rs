//! Action executor.
//!
//! Runs a validated action list against the matched tabs of one rule. The
//! loop is action-major: each action in priority order visits every tab not
//! yet consumed by a successful `close`. Consumed tabs are tracked for the
//! whole run, so a tab closed by one rule is never touched by a later one.
//! Per-tab failures become
//! `success: false` results and never stop the batch.
//!
//! All collaborator calls are awaited one at a time. Group creation depends
//! on it: the first tab creates a group, later tabs join it through the
//! per-window cache in [`ExecutionContext`].

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Value, json};
use tabtick_core::duration::parse_duration_ms;
use tabtick_core::urls::{self, UNKNOWN};
use tabtick_core::{BookmarkId, GroupId, Tab, TabId, WindowId};
use tabtick_settings::EngineSettings;
use tracing::{debug, warn};

use crate::actions::{Action, ActionKind, GroupBy, sort_actions_by_priority, validate_action_list};
use crate::collaborators::{BookmarkService, Collaborators, TabMutator};
use crate::errors::{ActionError, RuleError};

/// Mutable state shared by every rule of one run.
///
/// Owned by a single run. Concurrent runs must each build their own, or
/// they race to create groups with the same title.
#[derive(Debug)]
pub struct ExecutionContext {
    dry_run: bool,
    now_ms: i64,
    default_folder: String,
    snooze_reason: String,
    rule_id: String,
    rule_label: String,
    /// Tabs closed (or, in a dry run, that would be closed) so far.
    consumed: HashSet<TabId>,
    /// Window → group title → id. A window key is present once loaded.
    groups: HashMap<WindowId, HashMap<String, GroupId>>,
    /// Groups a dry run would have created.
    planned_groups: HashSet<(WindowId, String)>,
    folders: HashMap<String, BookmarkId>,
}

impl ExecutionContext {
    /// Context with the default folder and snooze reason.
    pub fn new(dry_run: bool, now_ms: i64) -> Self {
        Self::from_settings(&EngineSettings::default(), dry_run, now_ms)
    }

    /// Context using the folder and snooze reason from `engine`.
    pub fn from_settings(engine: &EngineSettings, dry_run: bool, now_ms: i64) -> Self {
        Self {
            dry_run,
            now_ms,
            default_folder: engine.default_bookmark_folder.clone(),
            snooze_reason: engine.snooze_reason.clone(),
            rule_id: String::new(),
            rule_label: String::new(),
            consumed: HashSet::new(),
            groups: HashMap::new(),
            planned_groups: HashSet::new(),
            folders: HashMap::new(),
        }
    }

    /// Whether mutating calls are suppressed.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Record the rule about to execute. The label ends up in snooze
    /// reasons, the id in failure logs.
    pub fn begin_rule(&mut self, rule_id: &str, label: &str) {
        rule_id.clone_into(&mut self.rule_id);
        label.clone_into(&mut self.rule_label);
    }

    /// Whether an earlier `close` in this run consumed the tab.
    pub fn is_consumed(&self, tab_id: TabId) -> bool {
        self.consumed.contains(&tab_id)
    }

    /// Cached group id for `title` in `window_id`.
    pub fn cached_group(&self, window_id: WindowId, title: &str) -> Option<GroupId> {
        self.groups.get(&window_id)?.get(title).copied()
    }

    fn snooze_reason(&self) -> String {
        if self.rule_label.is_empty() {
            self.snooze_reason.clone()
        } else {
            format!("{}: {}", self.snooze_reason, self.rule_label)
        }
    }

    async fn load_groups(&mut self, window_id: WindowId, tabs: &dyn TabMutator) -> Result<(), ActionError> {
        if self.groups.contains_key(&window_id) {
            return Ok(());
        }
        let existing = tabs.query_groups(window_id).await?;
        let mut by_title = HashMap::new();
        for group in existing {
            if group.window_id == window_id && !group.title.is_empty() {
                let _ = by_title.entry(group.title).or_insert(group.id);
            }
        }
        debug!(window_id = %window_id, groups = by_title.len(), "loaded existing groups");
        let _ = self.groups.insert(window_id, by_title);
        Ok(())
    }

    async fn resolve_folder(
        &mut self,
        name: &str,
        bookmarks: &dyn BookmarkService,
    ) -> Result<BookmarkId, ActionError> {
        if let Some(id) = self.folders.get(name) {
            return Ok(id.clone());
        }
        let id = match bookmarks.find_folder(name).await? {
            Some(id) => id,
            None => bookmarks.create_folder(name).await?,
        };
        let _ = self.folders.insert(name.to_owned(), id.clone());
        Ok(id)
    }
}

/// Outcome of one action on one tab.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Target tab.
    pub tab_id: TabId,
    /// Action kind.
    pub action: ActionKind,
    /// Whether the action took effect (or would have, in a dry run).
    pub success: bool,
    /// Action-specific details on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Machine code on failure, see [`ActionError::code`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResult {
    fn succeeded(tab_id: TabId, action: ActionKind, details: Value) -> Self {
        Self {
            tab_id,
            action,
            success: true,
            details: Some(details),
            error: None,
            message: None,
        }
    }

    fn failed(tab_id: TabId, action: ActionKind, error: &ActionError) -> Self {
        Self {
            tab_id,
            action,
            success: false,
            details: None,
            error: Some(error.code().to_owned()),
            message: Some(error.to_string()),
        }
    }
}

/// Validate, sort, and execute `actions` against `tabs`.
///
/// An invalid list fails before any collaborator call.
pub async fn execute_actions(
    actions: &[Action],
    tabs: &[&Tab],
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
) -> Result<Vec<ActionResult>, RuleError> {
    let validation = validate_action_list(actions);
    if !validation.valid {
        return Err(RuleError::ActionListInvalid {
            errors: validation.errors,
        });
    }
    Ok(execute_sequence(actions, tabs, ctx, collaborators).await)
}

/// Execute `actions` in priority order without validating the combination.
///
/// Tabs closed earlier in the run, by this list or a previous rule's, are
/// skipped.
pub async fn execute_sequence(
    actions: &[Action],
    tabs: &[&Tab],
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
) -> Vec<ActionResult> {
    let ordered = sort_actions_by_priority(actions);
    let mut results = Vec::with_capacity(ordered.len() * tabs.len());

    for action in &ordered {
        let kind = action.kind();
        for tab in tabs {
            if ctx.is_consumed(tab.id) {
                continue;
            }
            match execute_action(action, tab, ctx, collaborators).await {
                Ok(details) => {
                    if kind == ActionKind::Close {
                        let _ = ctx.consumed.insert(tab.id);
                    }
                    results.push(ActionResult::succeeded(tab.id, kind, details));
                }
                Err(e) => {
                    warn!(
                        rule_id = %ctx.rule_id,
                        tab_id = %tab.id,
                        action = %kind,
                        code = e.code(),
                        error = %e,
                        dry_run = ctx.dry_run,
                        "action failed"
                    );
                    results.push(ActionResult::failed(tab.id, kind, &e));
                }
            }
        }
    }
    results
}

/// Execute one action on one tab.
pub async fn execute_action(
    action: &Action,
    tab: &Tab,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
) -> Result<Value, ActionError> {
    match action {
        Action::Close { bookmark_first } => close(tab, *bookmark_first, ctx, collaborators).await,
        Action::Group {
            group_by,
            name,
            create_if_missing,
        } => {
            let key = group_key(tab, *group_by, name.as_deref())?;
            group(tab, key, *create_if_missing, ctx, collaborators.tabs.as_ref()).await
        }
        Action::Snooze { duration } => snooze(tab, duration, ctx, collaborators).await,
        Action::Bookmark { to } => {
            let folder = to.clone().unwrap_or_else(|| ctx.default_folder.clone());
            bookmark(tab, &folder, ctx, collaborators).await
        }
        Action::Pin | Action::Unpin => {
            let pinned = matches!(action, Action::Pin);
            if tab.pinned == pinned {
                return Ok(json!({ "pinned": pinned, "unchanged": true }));
            }
            if ctx.dry_run {
                return Ok(json!({ "pinned": pinned, "dryRun": true }));
            }
            collaborators.tabs.set_pinned(tab.id, pinned).await?;
            Ok(json!({ "pinned": pinned }))
        }
        Action::Mute | Action::Unmute => {
            let muted = matches!(action, Action::Mute);
            if tab.muted == muted {
                return Ok(json!({ "muted": muted, "unchanged": true }));
            }
            if ctx.dry_run {
                return Ok(json!({ "muted": muted, "dryRun": true }));
            }
            collaborators.tabs.set_muted(tab.id, muted).await?;
            Ok(json!({ "muted": muted }))
        }
        Action::Suspend => {
            if tab.active {
                return Err(ActionError::CannotSuspendActiveTab { tab_id: tab.id });
            }
            if tab.discarded {
                return Ok(json!({ "discarded": true, "unchanged": true }));
            }
            if ctx.dry_run {
                return Ok(json!({ "discarded": true, "dryRun": true }));
            }
            collaborators.tabs.discard_tab(tab.id).await?;
            Ok(json!({ "discarded": true }))
        }
        Action::Unknown => Err(ActionError::UnknownAction),
    }
}

async fn close(
    tab: &Tab,
    bookmark_first: bool,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
) -> Result<Value, ActionError> {
    let mut details = serde_json::Map::new();
    if bookmark_first {
        let folder = ctx.default_folder.clone();
        let bookmarked = bookmark(tab, &folder, ctx, collaborators).await?;
        let _ = details.insert("bookmark".to_owned(), bookmarked);
    }
    if ctx.dry_run {
        let _ = details.insert("dryRun".to_owned(), Value::Bool(true));
    } else {
        collaborators.tabs.close_tab(tab.id).await?;
    }
    let _ = details.insert("closed".to_owned(), Value::Bool(true));
    Ok(Value::Object(details))
}

fn group_key(tab: &Tab, group_by: Option<GroupBy>, name: Option<&str>) -> Result<String, ActionError> {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_owned());
    }
    let group_by = group_by.ok_or(ActionError::MissingGroupKey)?;
    let derived = tab.derived.as_ref();
    Ok(match group_by {
        GroupBy::Domain => derived.map_or_else(|| urls::domain_of(&tab.url), |d| d.domain.clone()),
        GroupBy::Origin => derived.map_or_else(|| UNKNOWN.to_owned(), |d| d.origin.clone()),
        GroupBy::Category => derived.map_or_else(|| UNKNOWN.to_owned(), |d| d.category.clone()),
    })
}

async fn group(
    tab: &Tab,
    key: String,
    create_if_missing: bool,
    ctx: &mut ExecutionContext,
    tabs: &dyn TabMutator,
) -> Result<Value, ActionError> {
    let window_id = tab.window_id;
    ctx.load_groups(window_id, tabs).await?;

    if let Some(group_id) = ctx.cached_group(window_id, &key) {
        if tab.group_id == Some(group_id) {
            return Ok(json!({ "group": key, "groupId": group_id, "unchanged": true }));
        }
        if ctx.dry_run {
            return Ok(json!({ "group": key, "groupId": group_id, "dryRun": true }));
        }
        tabs.add_to_group(group_id, &[tab.id]).await?;
        return Ok(json!({ "group": key, "groupId": group_id }));
    }

    if !create_if_missing {
        return Err(ActionError::GroupNotFound { name: key });
    }

    if ctx.dry_run {
        let first = ctx.planned_groups.insert((window_id, key.clone()));
        return Ok(if first {
            json!({ "group": key, "wouldCreate": true, "dryRun": true })
        } else {
            json!({ "group": key, "dryRun": true })
        });
    }

    let group_id = tabs.create_group(&[tab.id]).await?;
    let _ = ctx
        .groups
        .entry(window_id)
        .or_default()
        .insert(key.clone(), group_id);
    tabs.update_group(group_id, &key).await?;
    debug!(window_id = %window_id, group_id = %group_id, group = %key, "created group");
    Ok(json!({ "group": key, "groupId": group_id, "created": true }))
}

async fn snooze(
    tab: &Tab,
    duration: &str,
    ctx: &ExecutionContext,
    collaborators: &Collaborators,
) -> Result<Value, ActionError> {
    let ms = parse_duration_ms(duration).map_err(|_| ActionError::InvalidDuration {
        value: duration.to_owned(),
    })?;
    let wake_at = ctx.now_ms.saturating_add(ms);
    if ctx.dry_run {
        return Ok(json!({ "wakeAt": wake_at, "dryRun": true }));
    }
    let handle = collaborators
        .snooze
        .snooze(&[tab.id], wake_at, &ctx.snooze_reason())
        .await?;
    Ok(json!({ "wakeAt": wake_at, "handle": handle }))
}

async fn bookmark(
    tab: &Tab,
    folder: &str,
    ctx: &mut ExecutionContext,
    collaborators: &Collaborators,
) -> Result<Value, ActionError> {
    if ctx.dry_run {
        return Ok(json!({ "folder": folder, "dryRun": true }));
    }
    let bookmarks = collaborators.bookmarks.as_ref();
    let folder_id = ctx.resolve_folder(folder, bookmarks).await?;
    let title = if tab.title.is_empty() { &tab.url } else { &tab.title };
    let bookmark_id = bookmarks.create_bookmark(&folder_id, title, &tab.url).await?;
    Ok(json!({ "folder": folder, "bookmarkId": bookmark_id }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collaborators::{MockBookmarkService, MockSnoozeService, MockTabMutator};
    use crate::errors::BrowserError;
    use crate::indices::build_indices;
    use assert_matches::assert_matches;
    use tabtick_core::{SnoozeHandle, TabGroup};

    const NOW: i64 = 1_700_000_000_000;

    fn indexed(specs: &[(i64, i64, &str)]) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = specs
            .iter()
            .map(|(id, window, url)| Tab::new(TabId::new(*id), WindowId::new(*window), *url))
            .collect();
        let _ = build_indices(&mut tabs, NOW);
        tabs
    }

    fn collaborators(
        tabs: MockTabMutator,
        bookmarks: MockBookmarkService,
        snooze: MockSnoozeService,
    ) -> Collaborators {
        Collaborators::new(Arc::new(tabs), Arc::new(bookmarks), Arc::new(snooze))
    }

    fn refs(tabs: &[Tab]) -> Vec<&Tab> {
        tabs.iter().collect()
    }

    fn summary(results: &[ActionResult]) -> Vec<(i64, ActionKind, bool)> {
        results
            .iter()
            .map(|r| (r.tab_id.get(), r.action, r.success))
            .collect()
    }

    #[tokio::test]
    async fn dry_run_never_mutates() {
        let tabs = indexed(&[(1, 1, "https://a.com/1"), (2, 1, "https://a.com/2")]);
        let mut mutator = MockTabMutator::new();
        let _ = mutator.expect_query_groups().returning(|_| Ok(vec![]));
        let collab = collaborators(mutator, MockBookmarkService::new(), MockSnoozeService::new());

        let actions = vec![
            Action::Bookmark { to: None },
            Action::Pin,
            Action::Mute,
            Action::group_by(GroupBy::Domain),
            Action::Snooze { duration: "1h".into() },
            Action::Suspend,
        ];
        let mut ctx = ExecutionContext::new(true, NOW);
        let results = execute_actions(&actions, &refs(&tabs), &mut ctx, &collab).await.unwrap();

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.success));
        let groups: Vec<&Value> = results
            .iter()
            .filter(|r| r.action == ActionKind::Group)
            .filter_map(|r| r.details.as_ref())
            .collect();
        assert_eq!(groups[0]["wouldCreate"], true);
        assert!(groups[1].get("wouldCreate").is_none());
        let snoozed = results.iter().find(|r| r.action == ActionKind::Snooze).unwrap();
        assert_eq!(snoozed.details.as_ref().unwrap()["wakeAt"], NOW + 3_600_000);
    }

    #[tokio::test]
    async fn invalid_list_fails_before_any_call() {
        let tabs = indexed(&[(1, 1, "https://a.com")]);
        let collab = collaborators(
            MockTabMutator::new(),
            MockBookmarkService::new(),
            MockSnoozeService::new(),
        );
        let mut ctx = ExecutionContext::new(false, NOW);
        let err = execute_actions(&[Action::Pin, Action::close()], &refs(&tabs), &mut ctx, &collab)
            .await
            .unwrap_err();
        assert_matches!(err, RuleError::ActionListInvalid { errors } if errors.len() == 1);
    }

    #[tokio::test]
    async fn suspend_active_tab_fails_per_tab() {
        let mut tabs = indexed(&[(1, 1, "https://a.com"), (2, 1, "https://b.com")]);
        tabs[0].active = true;
        let mut mutator = MockTabMutator::new();
        let _ = mutator
            .expect_discard_tab()
            .withf(|id| *id == TabId::new(2))
            .times(1)
            .returning(|_| Ok(()));
        let collab = collaborators(mutator, MockBookmarkService::new(), MockSnoozeService::new());

        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(&[Action::Suspend], &refs(&tabs), &mut ctx, &collab)
            .await
            .unwrap();
        assert_eq!(
            summary(&results),
            vec![(1, ActionKind::Suspend, false), (2, ActionKind::Suspend, true)]
        );
        assert_eq!(results[0].error.as_deref(), Some("CannotSuspendActiveTab"));
    }

    #[tokio::test]
    async fn consumed_tabs_are_skipped_by_later_actions() {
        let tabs = indexed(&[(1, 1, "https://a.com")]);
        let mut mutator = MockTabMutator::new();
        let _ = mutator.expect_close_tab().times(1).returning(|_| Ok(()));
        let mut bookmarks = MockBookmarkService::new();
        let _ = bookmarks
            .expect_find_folder()
            .returning(|_| Ok(Some(BookmarkId::from("folder-1"))));
        let _ = bookmarks
            .expect_create_bookmark()
            .times(1)
            .returning(|_, _, _| Ok(BookmarkId::from("bm-1")));
        let collab = collaborators(mutator, bookmarks, MockSnoozeService::new());

        let actions = [Action::close(), Action::Unknown, Action::Bookmark { to: None }];
        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_sequence(&actions, &refs(&tabs), &mut ctx, &collab).await;
        assert_eq!(
            summary(&results),
            vec![(1, ActionKind::Bookmark, true), (1, ActionKind::Close, true)]
        );
        assert!(ctx.is_consumed(TabId::new(1)));

        // The same context skips the tab in a later list.
        let again = execute_sequence(&[Action::Mute], &refs(&tabs), &mut ctx, &collab).await;
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn dry_run_close_still_consumes() {
        let tabs = indexed(&[(1, 1, "https://a.com")]);
        let collab = collaborators(
            MockTabMutator::new(),
            MockBookmarkService::new(),
            MockSnoozeService::new(),
        );
        let mut ctx = ExecutionContext::new(true, NOW);
        let closed = execute_sequence(&[Action::close()], &refs(&tabs), &mut ctx, &collab).await;
        assert!(closed[0].success);
        let later = execute_sequence(&[Action::Pin], &refs(&tabs), &mut ctx, &collab).await;
        assert!(later.is_empty());
    }

    #[tokio::test]
    async fn groups_are_created_once_and_scoped_to_window() {
        let tabs = indexed(&[
            (1, 1, "https://a.com/1"),
            (2, 1, "https://a.com/2"),
            (3, 2, "https://a.com/3"),
        ]);
        let mut mutator = MockTabMutator::new();
        let _ = mutator
            .expect_query_groups()
            .withf(|w| *w == WindowId::new(1))
            .times(1)
            .returning(|_| Ok(vec![]));
        let _ = mutator
            .expect_query_groups()
            .withf(|w| *w == WindowId::new(2))
            .times(1)
            .returning(|w| {
                Ok(vec![TabGroup {
                    id: GroupId::new(77),
                    window_id: w,
                    title: "a.com".into(),
                    color: None,
                    collapsed: false,
                }])
            });
        let _ = mutator
            .expect_create_group()
            .times(1)
            .returning(|_| Ok(GroupId::new(5)));
        let _ = mutator
            .expect_update_group()
            .withf(|g, title| *g == GroupId::new(5) && title == "a.com")
            .times(1)
            .returning(|_, _| Ok(()));
        let _ = mutator
            .expect_add_to_group()
            .withf(|g, _| *g == GroupId::new(5))
            .times(1)
            .returning(|_, _| Ok(()));
        let _ = mutator
            .expect_add_to_group()
            .withf(|g, _| *g == GroupId::new(77))
            .times(1)
            .returning(|_, _| Ok(()));
        let collab = collaborators(mutator, MockBookmarkService::new(), MockSnoozeService::new());

        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(
            &[Action::group_by(GroupBy::Domain)],
            &refs(&tabs),
            &mut ctx,
            &collab,
        )
        .await
        .unwrap();
        assert!(results.iter().all(|r| r.success));
        assert_eq!(results[0].details.as_ref().unwrap()["created"], true);
        assert_eq!(ctx.cached_group(WindowId::new(1), "a.com"), Some(GroupId::new(5)));
        assert_eq!(ctx.cached_group(WindowId::new(2), "a.com"), Some(GroupId::new(77)));
    }

    #[tokio::test]
    async fn group_without_key_or_missing_group() {
        let tabs = indexed(&[(1, 1, "https://a.com")]);
        let mut mutator = MockTabMutator::new();
        let _ = mutator.expect_query_groups().returning(|_| Ok(vec![]));
        let collab = collaborators(mutator, MockBookmarkService::new(), MockSnoozeService::new());
        let mut ctx = ExecutionContext::new(false, NOW);

        let no_key = Action::Group {
            group_by: None,
            name: None,
            create_if_missing: true,
        };
        let err = execute_action(&no_key, &tabs[0], &mut ctx, &collab).await.unwrap_err();
        assert_eq!(err.code(), "MissingGroupKey");

        let no_create = Action::Group {
            group_by: None,
            name: Some("Reading".into()),
            create_if_missing: false,
        };
        let err = execute_action(&no_create, &tabs[0], &mut ctx, &collab).await.unwrap_err();
        assert_matches!(err, ActionError::GroupNotFound { name } if name == "Reading");
    }

    #[tokio::test]
    async fn collaborator_failure_is_isolated() {
        let tabs = indexed(&[(1, 1, "https://a.com"), (2, 1, "https://b.com")]);
        let mut mutator = MockTabMutator::new();
        let _ = mutator.expect_set_pinned().returning(|id, _| {
            if id == TabId::new(1) {
                Err(BrowserError::TabNotFound(id))
            } else {
                Ok(())
            }
        });
        let _ = mutator.expect_set_muted().times(2).returning(|_, _| Ok(()));
        let collab = collaborators(mutator, MockBookmarkService::new(), MockSnoozeService::new());

        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(&[Action::Mute, Action::Pin], &refs(&tabs), &mut ctx, &collab)
            .await
            .unwrap();
        assert_eq!(
            summary(&results),
            vec![
                (1, ActionKind::Pin, false),
                (2, ActionKind::Pin, true),
                (1, ActionKind::Mute, true),
                (2, ActionKind::Mute, true),
            ]
        );
        assert_eq!(results[0].error.as_deref(), Some("CollaboratorFailed"));
    }

    #[tokio::test]
    async fn snooze_passes_wake_time_and_reason() {
        let tabs = indexed(&[(1, 1, "https://a.com")]);
        let mut snooze = MockSnoozeService::new();
        let _ = snooze
            .expect_snooze()
            .withf(|_, wake_at, reason| *wake_at == NOW + 2 * 86_400_000 && reason == "rule: Later")
            .times(1)
            .returning(|_, _, _| Ok(SnoozeHandle::from("h-1")));
        let collab = collaborators(MockTabMutator::new(), MockBookmarkService::new(), snooze);

        let mut ctx = ExecutionContext::new(false, NOW);
        ctx.begin_rule("later", "Later");
        let details = execute_action(&Action::Snooze { duration: "2d".into() }, &tabs[0], &mut ctx, &collab)
            .await
            .unwrap();
        assert_eq!(details["handle"], "h-1");

        let err = execute_action(&Action::Snooze { duration: "soon".into() }, &tabs[0], &mut ctx, &collab)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidDuration");
    }

    #[tokio::test]
    async fn bookmark_folder_is_created_once() {
        let tabs = indexed(&[(1, 1, "https://a.com"), (2, 1, "https://b.com")]);
        let mut bookmarks = MockBookmarkService::new();
        let _ = bookmarks.expect_find_folder().times(1).returning(|_| Ok(None));
        let _ = bookmarks
            .expect_create_folder()
            .times(1)
            .returning(|_| Ok(BookmarkId::from("f-1")));
        let _ = bookmarks
            .expect_create_bookmark()
            .withf(|parent, _, _| parent.as_str() == "f-1")
            .times(2)
            .returning(|_, _, _| Ok(BookmarkId::generate()));
        let collab = collaborators(MockTabMutator::new(), bookmarks, MockSnoozeService::new());

        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(
            &[Action::Bookmark { to: Some("Later".into()) }],
            &refs(&tabs),
            &mut ctx,
            &collab,
        )
        .await
        .unwrap();
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn unknown_action_fails_each_tab() {
        let tabs = indexed(&[(1, 1, "https://a.com"), (2, 1, "https://b.com")]);
        let collab = collaborators(
            MockTabMutator::new(),
            MockBookmarkService::new(),
            MockSnoozeService::new(),
        );
        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(&[Action::Unknown], &refs(&tabs), &mut ctx, &collab)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.error.as_deref() == Some("UnknownAction")));
    }

    #[tokio::test]
    async fn already_in_state_skips_the_call() {
        let mut tabs = indexed(&[(1, 1, "https://a.com")]);
        tabs[0].pinned = true;
        tabs[0].discarded = true;
        let collab = collaborators(
            MockTabMutator::new(),
            MockBookmarkService::new(),
            MockSnoozeService::new(),
        );
        let mut ctx = ExecutionContext::new(false, NOW);
        let results = execute_actions(&[Action::Pin, Action::Suspend, Action::Unmute], &refs(&tabs), &mut ctx, &collab)
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.success));
        assert!(results.iter().all(|r| r.details.as_ref().unwrap()["unchanged"] == true));
    }
}
