//! In-memory browser backed by a JSON snapshot.
//!
//! [`SnapshotHost`] implements every collaborator trait over a [`Snapshot`]
//! so rules can run without a browser. Mutations apply to the in-memory
//! copy; the CLI writes it back on request.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tabtick_core::{BookmarkId, GroupId, SnoozeHandle, Tab, TabGroup, TabId, Window, WindowId};
use tabtick_rules::{BookmarkService, BrowserError, Scope, SnoozeService, TabMutator, TabSource};
use tracing::debug;

/// A bookmark folder (`url` absent) or entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    /// Node id.
    pub id: BookmarkId,
    /// Containing folder. `None` for top-level folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BookmarkId>,
    /// Folder name or page title.
    pub title: String,
    /// Page URL for entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BookmarkNode {
    fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

/// Tabs handed to the snooze scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnoozedTabs {
    /// Scheduler handle.
    pub handle: SnoozeHandle,
    /// Wake time (epoch ms).
    pub wake_at: i64,
    /// Free-form reason.
    pub reason: String,
    /// The tabs as they were when snoozed.
    pub tabs: Vec<Tab>,
}

/// Serialized browser state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// Open tabs.
    pub tabs: Vec<Tab>,
    /// Open windows.
    pub windows: Vec<Window>,
    /// Existing tab groups.
    pub groups: Vec<TabGroup>,
    /// Bookmark folders and entries.
    pub bookmarks: Vec<BookmarkNode>,
    /// Tabs waiting to wake.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snoozed: Vec<SnoozedTabs>,
}

impl Snapshot {
    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut Tab, BrowserError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or(BrowserError::TabNotFound(tab_id))
    }

    fn next_group_id(&self) -> GroupId {
        let max = self.groups.iter().map(|g| g.id.get()).max().unwrap_or(0);
        GroupId::new(max + 1)
    }
}

/// Collaborator host over a [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotHost {
    state: Mutex<Snapshot>,
}

impl SnapshotHost {
    /// Host owning `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().clone()
    }
}

#[async_trait]
impl TabSource for SnapshotHost {
    async fn query_tabs(&self, scope: Scope) -> Result<Vec<Tab>, BrowserError> {
        let state = self.state.lock();
        Ok(state
            .tabs
            .iter()
            .filter(|t| match scope {
                Scope::All => true,
                Scope::Window(id) => t.window_id == id,
            })
            .cloned()
            .collect())
    }

    async fn query_windows(&self) -> Result<Vec<Window>, BrowserError> {
        Ok(self.state.lock().windows.clone())
    }
}

#[async_trait]
impl TabMutator for SnapshotHost {
    async fn close_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        let before = state.tabs.len();
        state.tabs.retain(|t| t.id != tab_id);
        if state.tabs.len() == before {
            return Err(BrowserError::TabNotFound(tab_id));
        }
        debug!(tab_id = %tab_id, "closed tab");
        Ok(())
    }

    async fn set_pinned(&self, tab_id: TabId, pinned: bool) -> Result<(), BrowserError> {
        self.state.lock().tab_mut(tab_id)?.pinned = pinned;
        Ok(())
    }

    async fn set_muted(&self, tab_id: TabId, muted: bool) -> Result<(), BrowserError> {
        self.state.lock().tab_mut(tab_id)?.muted = muted;
        Ok(())
    }

    async fn discard_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        let tab = state.tab_mut(tab_id)?;
        if tab.active {
            return Err(BrowserError::TabActive(tab_id));
        }
        tab.discarded = true;
        Ok(())
    }

    async fn create_group(&self, tab_ids: &[TabId]) -> Result<GroupId, BrowserError> {
        let mut state = self.state.lock();
        let first = tab_ids
            .first()
            .ok_or_else(|| BrowserError::failed("createGroup", "no tabs given"))?;
        let window_id = state.tab_mut(*first)?.window_id;
        let group_id = state.next_group_id();
        for tab_id in tab_ids {
            state.tab_mut(*tab_id)?.group_id = Some(group_id);
        }
        state.groups.push(TabGroup {
            id: group_id,
            window_id,
            title: String::new(),
            color: None,
            collapsed: false,
        });
        Ok(group_id)
    }

    async fn update_group(&self, group_id: GroupId, title: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| BrowserError::failed("updateGroup", format!("group {group_id} not found")))?;
        title.clone_into(&mut group.title);
        Ok(())
    }

    async fn add_to_group(&self, group_id: GroupId, tab_ids: &[TabId]) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        if !state.groups.iter().any(|g| g.id == group_id) {
            return Err(BrowserError::failed(
                "addToGroup",
                format!("group {group_id} not found"),
            ));
        }
        for tab_id in tab_ids {
            state.tab_mut(*tab_id)?.group_id = Some(group_id);
        }
        Ok(())
    }

    async fn query_groups(&self, window_id: WindowId) -> Result<Vec<TabGroup>, BrowserError> {
        let state = self.state.lock();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.window_id == window_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookmarkService for SnapshotHost {
    async fn find_folder(&self, name: &str) -> Result<Option<BookmarkId>, BrowserError> {
        let state = self.state.lock();
        Ok(state
            .bookmarks
            .iter()
            .find(|b| b.is_folder() && b.parent_id.is_none() && b.title == name)
            .map(|b| b.id.clone()))
    }

    async fn create_folder(&self, name: &str) -> Result<BookmarkId, BrowserError> {
        let id = BookmarkId::generate();
        self.state.lock().bookmarks.push(BookmarkNode {
            id: id.clone(),
            parent_id: None,
            title: name.to_owned(),
            url: None,
        });
        Ok(id)
    }

    async fn create_bookmark(
        &self,
        parent_id: &BookmarkId,
        title: &str,
        url: &str,
    ) -> Result<BookmarkId, BrowserError> {
        let mut state = self.state.lock();
        if !state.bookmarks.iter().any(|b| b.is_folder() && b.id == *parent_id) {
            return Err(BrowserError::failed(
                "createBookmark",
                format!("folder {parent_id} not found"),
            ));
        }
        let id = BookmarkId::generate();
        state.bookmarks.push(BookmarkNode {
            id: id.clone(),
            parent_id: Some(parent_id.clone()),
            title: title.to_owned(),
            url: Some(url.to_owned()),
        });
        Ok(id)
    }
}

#[async_trait]
impl SnoozeService for SnapshotHost {
    async fn snooze(
        &self,
        tab_ids: &[TabId],
        wake_at_ms: i64,
        reason: &str,
    ) -> Result<SnoozeHandle, BrowserError> {
        let mut state = self.state.lock();
        if let Some(missing) = tab_ids.iter().find(|id| !state.tabs.iter().any(|t| t.id == **id)) {
            return Err(BrowserError::TabNotFound(*missing));
        }
        let (snoozed, kept): (Vec<Tab>, Vec<Tab>) = std::mem::take(&mut state.tabs)
            .into_iter()
            .partition(|t| tab_ids.contains(&t.id));
        state.tabs = kept;
        let handle = SnoozeHandle::generate();
        state.snoozed.push(SnoozedTabs {
            handle: handle.clone(),
            wake_at: wake_at_ms,
            reason: reason.to_owned(),
            tabs: snoozed,
        });
        Ok(handle)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
