//! Branded ID newtypes for type safety.
//!
//! Browser entities (tabs, windows, groups) are identified by integers
//! assigned by the host browser. Each gets its own newtype so a window ID
//! can never be passed where a tab ID is expected.
//!
//! Bookmark IDs and snooze handles are opaque strings owned by their
//! collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw browser-assigned value.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw browser-assigned value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

numeric_id! {
    /// Identifier of a browser tab.
    TabId
}

numeric_id! {
    /// Identifier of a browser window.
    WindowId
}

numeric_id! {
    /// Identifier of a tab group. Groups are always scoped to one window.
    GroupId
}

branded_id! {
    /// Identifier of a bookmark node (folder or entry).
    BookmarkId
}

branded_id! {
    /// Handle returned by the snooze collaborator for a scheduled wake-up.
    SnoozeHandle
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_are_distinct_types_with_same_raw() {
        let tab = TabId::new(7);
        let window = WindowId::new(7);
        assert_eq!(tab.get(), window.get());
    }

    #[test]
    fn numeric_id_display() {
        assert_eq!(TabId::new(42).to_string(), "42");
    }

    #[test]
    fn numeric_id_serde_is_transparent() {
        let json = serde_json::to_string(&GroupId::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: GroupId = serde_json::from_str("3").unwrap();
        assert_eq!(back, GroupId::new(3));
    }

    #[test]
    fn numeric_ids_order_by_raw_value() {
        let mut ids = vec![TabId::new(3), TabId::new(1), TabId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![TabId::new(1), TabId::new(2), TabId::new(3)]);
    }

    #[test]
    fn snooze_handle_generate_is_uuid_v7() {
        let handle = SnoozeHandle::generate();
        let parsed = Uuid::parse_str(handle.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn bookmark_ids_are_unique() {
        assert_ne!(BookmarkId::generate(), BookmarkId::generate());
    }

    #[test]
    fn bookmark_id_from_str() {
        let id = BookmarkId::from("folder-1");
        assert_eq!(id.as_str(), "folder-1");
        assert_eq!(format!("{id}"), "folder-1");
    }
}
