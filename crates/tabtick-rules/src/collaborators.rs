//! Host collaborator contracts.
//!
//! The engine never touches the browser directly. Every read and mutation
//! goes through these traits; implementations live in the host (the CLI's
//! snapshot host, a browser extension bridge, test doubles). All calls are
//! individually fallible and awaited sequentially by the executor.

use std::sync::Arc;

use async_trait::async_trait;
use tabtick_core::{BookmarkId, GroupId, SnoozeHandle, Tab, TabGroup, TabId, Window, WindowId};

use crate::errors::BrowserError;

/// Which tabs a [`TabSource`] should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Every tab in every window.
    All,
    /// Tabs of one window.
    Window(WindowId),
}

/// Read-only snapshots of tabs and windows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Tabs in `scope`.
    async fn query_tabs(&self, scope: Scope) -> Result<Vec<Tab>, BrowserError>;

    /// Every window.
    async fn query_windows(&self) -> Result<Vec<Window>, BrowserError>;
}

/// Tab and group mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TabMutator: Send + Sync {
    /// Close a tab.
    async fn close_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;

    /// Set the pinned flag.
    async fn set_pinned(&self, tab_id: TabId, pinned: bool) -> Result<(), BrowserError>;

    /// Set the muted flag.
    async fn set_muted(&self, tab_id: TabId, muted: bool) -> Result<(), BrowserError>;

    /// Discard a tab's memory state. Fails with [`BrowserError::TabActive`]
    /// for the active tab.
    async fn discard_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;

    /// Create a group containing `tab_ids`.
    async fn create_group(&self, tab_ids: &[TabId]) -> Result<GroupId, BrowserError>;

    /// Set a group's title.
    async fn update_group(&self, group_id: GroupId, title: &str) -> Result<(), BrowserError>;

    /// Move tabs into an existing group.
    async fn add_to_group(&self, group_id: GroupId, tab_ids: &[TabId]) -> Result<(), BrowserError>;

    /// Groups that exist in a window.
    async fn query_groups(&self, window_id: WindowId) -> Result<Vec<TabGroup>, BrowserError>;
}

/// Bookmark folder and entry management.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookmarkService: Send + Sync {
    /// Folder with this name under the default parent, if any.
    async fn find_folder(&self, name: &str) -> Result<Option<BookmarkId>, BrowserError>;

    /// Create a folder under the default parent.
    async fn create_folder(&self, name: &str) -> Result<BookmarkId, BrowserError>;

    /// Create a bookmark entry.
    async fn create_bookmark(
        &self,
        parent_id: &BookmarkId,
        title: &str,
        url: &str,
    ) -> Result<BookmarkId, BrowserError>;
}

/// The snooze scheduler. Hiding and restoring tabs is its responsibility.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnoozeService: Send + Sync {
    /// Schedule `tab_ids` to wake at `wake_at_ms`.
    async fn snooze(
        &self,
        tab_ids: &[TabId],
        wake_at_ms: i64,
        reason: &str,
    ) -> Result<SnoozeHandle, BrowserError>;
}

/// The mutating collaborators an executor needs.
#[derive(Clone)]
pub struct Collaborators {
    /// Tab and group mutations.
    pub tabs: Arc<dyn TabMutator>,
    /// Bookmarks.
    pub bookmarks: Arc<dyn BookmarkService>,
    /// Snooze scheduling.
    pub snooze: Arc<dyn SnoozeService>,
}

impl Collaborators {
    /// Bundle the three collaborators.
    pub fn new(
        tabs: Arc<dyn TabMutator>,
        bookmarks: Arc<dyn BookmarkService>,
        snooze: Arc<dyn SnoozeService>,
    ) -> Self {
        Self {
            tabs,
            bookmarks,
            snooze,
        }
    }

    /// One value implementing every trait, shared three ways.
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: TabMutator + BookmarkService + SnoozeService + 'static,
    {
        Self {
            tabs: host.clone(),
            bookmarks: host.clone(),
            snooze: host,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
