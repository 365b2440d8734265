//! Action model, validation, and sequencing.
//!
//! Every [`Action`] has a fixed [`ActionKind`] with a fixed priority (lower
//! runs first) and a compatibility class: `close` excludes every other
//! action in the same rule, everything else combines freely.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tab attribute used as the group key for `group` actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Derived domain.
    Domain,
    /// Derived origin.
    Origin,
    /// Primary category.
    Category,
}

/// One operation to apply to each matching tab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    /// Close the tab.
    Close {
        /// Bookmark into the default folder first.
        #[serde(default)]
        bookmark_first: bool,
    },
    /// Move the tab into a group in its own window.
    Group {
        /// Attribute whose value names the group.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_by: Option<GroupBy>,
        /// Explicit group title. Wins over `group_by`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Create the group when no group with that title exists.
        #[serde(default = "default_create_if_missing")]
        create_if_missing: bool,
    },
    /// Hand the tab to the snooze service.
    Snooze {
        /// Duration literal, e.g. `"2h"`.
        #[serde(rename = "for")]
        duration: String,
    },
    /// Bookmark the tab.
    Bookmark {
        /// Folder name. Defaults to the configured folder.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
    },
    /// Pin the tab.
    Pin,
    /// Unpin the tab.
    Unpin,
    /// Mute the tab.
    Mute,
    /// Unmute the tab.
    Unmute,
    /// Discard the tab's memory state.
    Suspend,
    /// Any `type` this engine does not implement.
    #[serde(other)]
    Unknown,
}

fn default_create_if_missing() -> bool {
    true
}

impl Action {
    /// The action's kind.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Close { .. } => ActionKind::Close,
            Self::Group { .. } => ActionKind::Group,
            Self::Snooze { .. } => ActionKind::Snooze,
            Self::Bookmark { .. } => ActionKind::Bookmark,
            Self::Pin => ActionKind::Pin,
            Self::Unpin => ActionKind::Unpin,
            Self::Mute => ActionKind::Mute,
            Self::Unmute => ActionKind::Unmute,
            Self::Suspend => ActionKind::Suspend,
            Self::Unknown => ActionKind::Unknown,
        }
    }

    /// `close` without bookmarking.
    pub fn close() -> Self {
        Self::Close {
            bookmark_first: false,
        }
    }

    /// `group` by an explicit name.
    pub fn group_named(name: impl Into<String>) -> Self {
        Self::Group {
            group_by: None,
            name: Some(name.into()),
            create_if_missing: true,
        }
    }

    /// `group` by a tab attribute.
    pub fn group_by(group_by: GroupBy) -> Self {
        Self::Group {
            group_by: Some(group_by),
            name: None,
            create_if_missing: true,
        }
    }
}

/// Discriminant of [`Action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// `close`
    Close,
    /// `group`
    Group,
    /// `snooze`
    Snooze,
    /// `bookmark`
    Bookmark,
    /// `pin`
    Pin,
    /// `unpin`
    Unpin,
    /// `mute`
    Mute,
    /// `unmute`
    Unmute,
    /// `suspend`
    Suspend,
    /// Unrecognized `type`.
    Unknown,
}

impl ActionKind {
    /// Every implemented kind, in priority order.
    pub const KNOWN: [Self; 9] = [
        Self::Bookmark,
        Self::Pin,
        Self::Unpin,
        Self::Mute,
        Self::Unmute,
        Self::Group,
        Self::Snooze,
        Self::Suspend,
        Self::Close,
    ];

    /// Execution priority. Lower runs first.
    pub fn priority(self) -> u32 {
        match self {
            Self::Bookmark => 10,
            Self::Pin | Self::Unpin => 20,
            Self::Mute | Self::Unmute => 30,
            Self::Group => 40,
            Self::Snooze => 50,
            Self::Suspend => 60,
            Self::Close => 100,
            Self::Unknown => 1000,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Group => "group",
            Self::Snooze => "snooze",
            Self::Bookmark => "bookmark",
            Self::Pin => "pin",
            Self::Unpin => "unpin",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Suspend => "suspend",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire name. Unrecognized names map to [`ActionKind::Unknown`].
    pub fn parse(name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.as_str() == name.trim())
            .unwrap_or(Self::Unknown)
    }

    /// Whether this kind must be the only action in its list.
    pub fn is_exclusive(self) -> bool {
        self == Self::Close
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`validate_action_list`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionListValidation {
    /// No errors.
    pub valid: bool,
    /// One message per problem.
    pub errors: Vec<String>,
}

/// Check that an action list is internally compatible.
pub fn validate_action_list(actions: &[Action]) -> ActionListValidation {
    let mut errors = Vec::new();
    if actions.is_empty() {
        errors.push("at least one action required".to_owned());
    }

    let has_exclusive = actions.iter().any(|a| a.kind().is_exclusive());
    if has_exclusive {
        for action in actions.iter().filter(|a| !a.kind().is_exclusive()) {
            errors.push(format!("close cannot be combined with {}", action.kind()));
        }
    }

    ActionListValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Stable sort by [`ActionKind::priority`].
pub fn sort_actions_by_priority(actions: &[Action]) -> Vec<Action> {
    let mut sorted = actions.to_vec();
    sorted.sort_by_key(|a| a.kind().priority());
    sorted
}

/// Kinds that may legally be appended to `existing`.
pub fn get_compatible_actions(existing: &[ActionKind]) -> Vec<ActionKind> {
    if existing.iter().any(|k| k.is_exclusive()) {
        return Vec::new();
    }
    ActionKind::KNOWN
        .into_iter()
        .filter(|kind| existing.is_empty() || !kind.is_exclusive())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
