//! Browser snapshot records.
//!
//! [`Tab`], [`Window`], and [`TabGroup`] mirror what the host browser reports.
//! [`TabDerived`] holds the fields the index builder computes for one
//! evaluation pass; it is attached to each tab in place and is `None` until
//! the first build completes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{GroupId, TabId, WindowId};

/// One browser page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Browser-assigned tab ID.
    pub id: TabId,
    /// Current URL.
    pub url: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Owning window.
    pub window_id: WindowId,
    /// Group membership. Negative sentinels from the host deserialize to `None`.
    #[serde(
        default,
        deserialize_with = "deserialize_group_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<GroupId>,
    /// Position within the window's tab strip.
    #[serde(default)]
    pub index: u32,
    /// Pinned to the tab strip.
    #[serde(default)]
    pub pinned: bool,
    /// Currently producing sound.
    #[serde(default)]
    pub audible: bool,
    /// Muted by the user or an extension.
    #[serde(default)]
    pub muted: bool,
    /// The focused tab of its window.
    #[serde(default)]
    pub active: bool,
    /// Memory state has been discarded.
    #[serde(default)]
    pub discarded: bool,
    /// Creation timestamp (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Last activation timestamp (epoch ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<i64>,
    /// Referrer URL, used to derive the tab's origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Tab that opened this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    /// Derived fields for the current pass. Written by the index builder only.
    #[serde(skip)]
    pub derived: Option<TabDerived>,
}

impl Tab {
    /// Minimal tab with the given identity; every flag off, no timestamps.
    #[must_use]
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: String::new(),
            window_id,
            group_id: None,
            index: 0,
            pinned: false,
            audible: false,
            muted: false,
            active: false,
            discarded: false,
            created_at: None,
            last_accessed_at: None,
            referrer: None,
            opener_tab_id: None,
            derived: None,
        }
    }

    /// Whether the tab belongs to a group.
    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }
}

fn deserialize_group_id<'de, D>(deserializer: D) -> Result<Option<GroupId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id >= 0).map(GroupId::new))
}

/// Fields computed by the index builder for one evaluation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDerived {
    /// Lowercase host without `www.`, or `"unknown"`.
    pub domain: String,
    /// Serialized origin of the referrer or opener, or `"unknown"`.
    pub origin: String,
    /// Canonical URL used for duplicate detection.
    pub dedup_key: String,
    /// First category from the domain table, or `"unknown"`.
    pub category: String,
    /// Every category the table lists for the domain.
    pub categories: Vec<String>,
    /// `now - created_at` in ms.
    pub age_ms: Option<i64>,
    /// `now - last_accessed_at` in ms.
    pub last_access_ms: Option<i64>,
    /// At least one other tab shares the dedup key.
    pub is_duplicate: bool,
    /// Number of tabs sharing the domain (including this one).
    pub domain_count: usize,
}

/// A browser window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// Browser-assigned window ID.
    pub id: WindowId,
    /// Has keyboard focus.
    #[serde(default)]
    pub focused: bool,
    /// Private browsing window.
    #[serde(default)]
    pub incognito: bool,
}

impl Window {
    /// Unfocused, non-incognito window.
    #[must_use]
    pub fn new(id: WindowId) -> Self {
        Self {
            id,
            focused: false,
            incognito: false,
        }
    }
}

/// An existing tab group as reported by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    /// Browser-assigned group ID.
    pub id: GroupId,
    /// Window the group lives in.
    pub window_id: WindowId,
    /// Group label. Used as the lookup key for named grouping.
    #[serde(default)]
    pub title: String,
    /// Display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Collapsed in the tab strip.
    #[serde(default)]
    pub collapsed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_tab() {
        let tab: Tab =
            serde_json::from_str(r#"{"id": 1, "url": "https://a.com", "windowId": 9}"#).unwrap();
        assert_eq!(tab.id, TabId::new(1));
        assert_eq!(tab.window_id, WindowId::new(9));
        assert!(!tab.pinned);
        assert!(tab.group_id.is_none());
        assert!(tab.derived.is_none());
    }

    #[test]
    fn negative_group_id_is_ungrouped() {
        let tab: Tab = serde_json::from_str(
            r#"{"id": 1, "url": "https://a.com", "windowId": 1, "groupId": -1}"#,
        )
        .unwrap();
        assert!(!tab.is_grouped());
    }

    #[test]
    fn positive_group_id_is_grouped() {
        let tab: Tab = serde_json::from_str(
            r#"{"id": 1, "url": "https://a.com", "windowId": 1, "groupId": 12}"#,
        )
        .unwrap();
        assert_eq!(tab.group_id, Some(GroupId::new(12)));
    }

    #[test]
    fn derived_fields_are_never_serialized() {
        let mut tab = Tab::new(TabId::new(1), WindowId::new(1), "https://a.com");
        tab.derived = Some(TabDerived {
            domain: "a.com".into(),
            origin: "unknown".into(),
            dedup_key: "a.com".into(),
            category: "unknown".into(),
            categories: vec![],
            age_ms: None,
            last_access_ms: None,
            is_duplicate: false,
            domain_count: 1,
        });
        let json = serde_json::to_value(&tab).unwrap();
        assert!(json.get("derived").is_none());
        assert_eq!(json["windowId"], 1);
    }

    #[test]
    fn window_defaults() {
        let window: Window = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(window, Window::new(WindowId::new(4)));
    }
}
