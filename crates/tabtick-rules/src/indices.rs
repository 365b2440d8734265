//! Index builder.
//!
//! One pass over the tab collection computes every tab's [`TabDerived`]
//! fields and the four grouping maps. Derived fields are written into the
//! tabs in place; indices are returned by value and never updated
//! incrementally. Any change to the collection requires a full rebuild.

use std::collections::HashMap;

use serde::Serialize;
use tabtick_core::categories::{CategoryLookup, DomainCategoryTable, UNCATEGORIZED};
use tabtick_core::urls::{self, DedupOptions, UNKNOWN};
use tabtick_core::{Tab, TabDerived, TabId};
use tracing::debug;

/// Tabs grouped by derived key, each list in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Indices {
    /// Keyed by `domain`.
    pub by_domain: HashMap<String, Vec<TabId>>,
    /// Keyed by `origin`.
    pub by_origin: HashMap<String, Vec<TabId>>,
    /// Keyed by `dedupKey`.
    pub by_dedup_key: HashMap<String, Vec<TabId>>,
    /// Keyed by primary `category`.
    pub by_category: HashMap<String, Vec<TabId>>,
}

impl Indices {
    /// Number of tabs sharing `dedup_key`.
    pub fn dedup_group_size(&self, dedup_key: &str) -> usize {
        self.by_dedup_key.get(dedup_key).map_or(0, Vec::len)
    }

    /// Number of tabs sharing `domain`.
    pub fn domain_group_size(&self, domain: &str) -> usize {
        self.by_domain.get(domain).map_or(0, Vec::len)
    }

    /// Total number of indexed tabs.
    pub fn tab_count(&self) -> usize {
        self.by_domain.values().map(Vec::len).sum()
    }
}

/// Computes derived fields and indices for one evaluation pass.
pub struct IndexBuilder<'a> {
    categories: &'a dyn CategoryLookup,
    dedup: &'a DedupOptions,
    now_ms: i64,
}

impl<'a> IndexBuilder<'a> {
    /// Builder using `categories` and `dedup`; ages are measured against `now_ms`.
    pub fn new(categories: &'a dyn CategoryLookup, dedup: &'a DedupOptions, now_ms: i64) -> Self {
        Self {
            categories,
            dedup,
            now_ms,
        }
    }

    /// Annotate `tabs` in place and return the grouping maps.
    ///
    /// Never fails: unparsable URLs degrade to the `"unknown"` domain.
    pub fn build(&self, tabs: &mut [Tab]) -> Indices {
        let urls_by_id: HashMap<TabId, String> =
            tabs.iter().map(|tab| (tab.id, tab.url.clone())).collect();

        let mut indices = Indices::default();
        for tab in tabs.iter_mut() {
            let derived = self.derive(tab, &urls_by_id);
            push(&mut indices.by_domain, &derived.domain, tab.id);
            push(&mut indices.by_origin, &derived.origin, tab.id);
            push(&mut indices.by_dedup_key, &derived.dedup_key, tab.id);
            push(&mut indices.by_category, &derived.category, tab.id);
            tab.derived = Some(derived);
        }

        for tab in tabs.iter_mut() {
            if let Some(derived) = tab.derived.as_mut() {
                derived.is_duplicate = indices.dedup_group_size(&derived.dedup_key) > 1;
                derived.domain_count = indices.domain_group_size(&derived.domain);
            }
        }

        debug!(
            tabs = tabs.len(),
            domains = indices.by_domain.len(),
            dedup_keys = indices.by_dedup_key.len(),
            categories = indices.by_category.len(),
            "built indices"
        );
        indices
    }

    fn derive(&self, tab: &Tab, urls_by_id: &HashMap<TabId, String>) -> TabDerived {
        let domain = urls::domain_of(&tab.url);
        let categories = if domain == UNKNOWN {
            Vec::new()
        } else {
            self.categories.categories_for(&domain)
        };
        let category = categories
            .first()
            .cloned()
            .unwrap_or_else(|| UNCATEGORIZED.to_owned());

        let origin = tab
            .referrer
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| {
                tab.opener_tab_id
                    .and_then(|opener| urls_by_id.get(&opener))
                    .map(String::as_str)
            })
            .and_then(urls::origin_of)
            .unwrap_or_else(|| UNKNOWN.to_owned());

        TabDerived {
            dedup_key: urls::dedup_key(&tab.url, self.dedup),
            domain,
            origin,
            category,
            categories,
            age_ms: tab.created_at.map(|t| self.elapsed(t)),
            last_access_ms: tab.last_accessed_at.map(|t| self.elapsed(t)),
            is_duplicate: false,
            domain_count: 0,
        }
    }

    fn elapsed(&self, since_ms: i64) -> i64 {
        self.now_ms.saturating_sub(since_ms).max(0)
    }
}

fn push(map: &mut HashMap<String, Vec<TabId>>, key: &str, tab_id: TabId) {
    map.entry(key.to_owned()).or_default().push(tab_id);
}

/// Build indices with the built-in category table and default dedup options.
pub fn build_indices(tabs: &mut [Tab], now_ms: i64) -> Indices {
    let table = DomainCategoryTable::new();
    let dedup = DedupOptions::default();
    IndexBuilder::new(&table, &dedup, now_ms).build(tabs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
