//! URL analysis: domain, origin, and dedup-key canonicalization.
//!
//! All functions are pure and never fail; unparsable input degrades to the
//! `"unknown"` sentinel (domain, origin) or to the trimmed lowercase raw text
//! (dedup key).
//!
//! Dedup key rules for `http(s)` URLs:
//! 1. Scheme is dropped, so `http` and `https` variants collapse.
//! 2. Host is lowercased; a leading `www.` is stripped (`strip_www`).
//! 3. Default ports are dropped by the parser; explicit ports are kept.
//! 4. Trailing `/` is stripped from the path; the root path becomes empty.
//! 5. Tracking parameters (`utm_*` plus `strip_params`) are removed and the
//!    remaining parameters are sorted by key, keeping the relative order of
//!    repeated keys. `ignore_query` drops the query entirely.
//! 6. The fragment is dropped unless `ignore_fragment` is off.
//!
//! Other schemes keep their full serialization minus the fragment.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use url::Url;

/// Sentinel for domains and origins that cannot be determined.
pub const UNKNOWN: &str = "unknown";

/// Query parameters stripped by default, in addition to every `utm_*` key.
pub const DEFAULT_STRIP_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "yclid", "_ga", "ref",
    "ref_src", "si",
];

/// Canonicalization switches for [`dedup_key`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupOptions {
    /// Strip a leading `www.` from the host.
    pub strip_www: bool,
    /// Drop the fragment.
    pub ignore_fragment: bool,
    /// Drop the whole query string.
    pub ignore_query: bool,
    /// Query parameter keys removed before comparison (case-insensitive).
    pub strip_params: Vec<String>,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            strip_www: true,
            ignore_fragment: true,
            ignore_query: false,
            strip_params: DEFAULT_STRIP_PARAMS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl DedupOptions {
    /// Whether a query parameter key is tracking noise.
    pub fn is_stripped_param(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        key.starts_with("utm_") || self.strip_params.iter().any(|p| p.eq_ignore_ascii_case(&key))
    }
}

/// Lowercase host without a leading `www.`, or [`UNKNOWN`].
pub fn domain_of(raw: &str) -> String {
    Url::parse(raw.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .map(|host| strip_www(&host).to_owned())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

/// ASCII-serialized origin (`scheme://host[:port]`), or `None` when the URL
/// does not parse or has an opaque origin.
pub fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Canonical form of `raw` for duplicate detection. See the module docs.
pub fn dedup_key(raw: &str, options: &DedupOptions) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_lowercase();
    };

    if !matches!(url.scheme(), "http" | "https") {
        url.set_fragment(None);
        return url.to_string();
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let mut key = if options.strip_www {
        strip_www(&host).to_owned()
    } else {
        host
    };

    if let Some(port) = url.port() {
        let _ = write!(key, ":{port}");
    }

    key.push_str(url.path().trim_end_matches('/'));

    if !options.ignore_query {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !options.is_stripped_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            key.push('?');
            key.push_str(&query);
        }
    }

    if !options.ignore_fragment {
        if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
            key.push('#');
            key.push_str(fragment);
        }
    }

    key
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(raw: &str) -> String {
        dedup_key(raw, &DedupOptions::default())
    }

    #[test]
    fn domain_strips_www_and_lowercases() {
        assert_eq!(domain_of("https://WWW.Example.COM/path"), "example.com");
    }

    #[test]
    fn domain_keeps_other_subdomains() {
        assert_eq!(domain_of("https://docs.rs/regex"), "docs.rs");
        assert_eq!(domain_of("https://mail.google.com/"), "mail.google.com");
    }

    #[test]
    fn domain_unknown_for_garbage_and_hostless() {
        assert_eq!(domain_of("not a url"), UNKNOWN);
        assert_eq!(domain_of("about:blank"), UNKNOWN);
        assert_eq!(domain_of(""), UNKNOWN);
    }

    #[test]
    fn origin_includes_scheme_and_explicit_port() {
        assert_eq!(
            origin_of("http://localhost:8080/a?b=c").as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(origin_of("https://a.com:443/x").as_deref(), Some("https://a.com"));
    }

    #[test]
    fn origin_none_for_opaque() {
        assert!(origin_of("about:blank").is_none());
        assert!(origin_of("nope").is_none());
    }

    #[test]
    fn dedup_collapses_scheme_www_slash_and_default_port() {
        let expected = "example.com/docs";
        assert_eq!(key("https://www.example.com/docs/"), expected);
        assert_eq!(key("http://example.com:80/docs"), expected);
        assert_eq!(key("https://EXAMPLE.com:443/docs#section"), expected);
    }

    #[test]
    fn dedup_root_path_is_empty() {
        assert_eq!(key("https://a.com"), "a.com");
        assert_eq!(key("https://a.com/"), "a.com");
    }

    #[test]
    fn dedup_keeps_explicit_port() {
        assert_eq!(key("http://localhost:3000/"), "localhost:3000");
    }

    #[test]
    fn dedup_strips_tracking_and_sorts_params() {
        assert_eq!(
            key("https://a.com/p?z=1&utm_source=x&a=2&fbclid=abc"),
            "a.com/p?a=2&z=1"
        );
        assert_eq!(key("https://a.com/p?UTM_Medium=x"), "a.com/p");
    }

    #[test]
    fn dedup_sort_is_stable_for_repeated_keys() {
        assert_eq!(key("https://a.com/?b=2&a=x&b=1"), "a.com?a=x&b=2&b=1");
    }

    #[test]
    fn dedup_ignore_query_drops_everything() {
        let options = DedupOptions {
            ignore_query: true,
            ..DedupOptions::default()
        };
        assert_eq!(dedup_key("https://a.com/p?id=7", &options), "a.com/p");
    }

    #[test]
    fn dedup_keeps_fragment_when_configured() {
        let options = DedupOptions {
            ignore_fragment: false,
            ..DedupOptions::default()
        };
        assert_eq!(dedup_key("https://a.com/app#/inbox", &options), "a.com/app#/inbox");
    }

    #[test]
    fn dedup_keeps_www_when_configured() {
        let options = DedupOptions {
            strip_www: false,
            ..DedupOptions::default()
        };
        assert_eq!(dedup_key("https://www.a.com/", &options), "www.a.com");
    }

    #[test]
    fn dedup_non_http_keeps_scheme_without_fragment() {
        assert_eq!(key("file:///tmp/a.txt#x"), "file:///tmp/a.txt");
        assert_eq!(key("chrome://settings/"), "chrome://settings/");
    }

    #[test]
    fn dedup_unparsable_is_lowercased_raw() {
        assert_eq!(key("  Not A URL  "), "not a url");
    }

    #[test]
    fn stripped_param_matching_is_case_insensitive() {
        let options = DedupOptions::default();
        assert!(options.is_stripped_param("GCLID"));
        assert!(options.is_stripped_param("utm_campaign"));
        assert!(!options.is_stripped_param("q"));
    }

    proptest! {
        #[test]
        fn dedup_ignores_trailing_slash_and_tracking(
            host in "[a-v]{1,10}",
            segments in proptest::collection::vec("[a-z0-9]{1,6}", 0..4),
            tracking in "[a-z]{1,6}",
        ) {
            let base = format!("https://{host}.com/{}", segments.join("/"));
            let canonical = key(&base);
            prop_assert_eq!(key(&format!("{base}/")), canonical.clone());
            prop_assert_eq!(key(&format!("{base}?utm_source={tracking}")), canonical.clone());
            prop_assert_eq!(key(&base.replacen("https://", "http://www.", 1)), canonical);
        }
    }
}
