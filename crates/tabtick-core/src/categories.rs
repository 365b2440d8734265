//! Domain → category lookup.
//!
//! A static table of well-known domains, optionally extended by user
//! entries. Lookups try the exact domain first, then the domain without its
//! first label (`mail.google.com` → `google.com`). Only one level is
//! stripped.

use std::collections::HashMap;

/// Category assigned when a domain has no table entry.
pub const UNCATEGORIZED: &str = "unknown";

/// Pure domain → categories lookup consumed by the index builder.
pub trait CategoryLookup: Send + Sync {
    /// Every category listed for `domain`, most specific first. Empty when
    /// the domain is not in the table.
    fn categories_for(&self, domain: &str) -> Vec<String>;
}

const BUILTIN: &[(&str, &[&str])] = &[
    // Search
    ("google.com", &["search", "productivity_tools"]),
    ("bing.com", &["search"]),
    ("duckduckgo.com", &["search"]),
    ("yahoo.com", &["search", "news_media"]),
    ("baidu.com", &["search"]),
    ("yandex.ru", &["search", "portal"]),
    // Social
    ("facebook.com", &["social"]),
    ("instagram.com", &["social"]),
    ("twitter.com", &["social"]),
    ("x.com", &["social"]),
    ("reddit.com", &["social", "reference_research"]),
    ("linkedin.com", &["social", "professional"]),
    ("pinterest.com", &["social", "entertainment"]),
    ("tiktok.com", &["social", "streaming_entertainment"]),
    ("tumblr.com", &["social", "entertainment"]),
    ("quora.com", &["social", "reference_research"]),
    ("vk.com", &["social"]),
    ("weibo.com", &["social"]),
    // Communication
    ("discord.com", &["communication", "gaming"]),
    ("slack.com", &["communication", "productivity_tools"]),
    ("zoom.us", &["communication", "productivity_tools"]),
    ("whatsapp.com", &["communication", "social"]),
    ("telegram.org", &["communication", "social"]),
    ("outlook.com", &["productivity_tools", "communication"]),
    ("mail.ru", &["communication", "portal"]),
    // Streaming & music
    ("youtube.com", &["streaming_entertainment", "social"]),
    ("netflix.com", &["streaming_entertainment"]),
    ("twitch.tv", &["streaming_entertainment", "gaming"]),
    ("hulu.com", &["streaming_entertainment"]),
    ("disneyplus.com", &["streaming_entertainment"]),
    ("primevideo.com", &["streaming_entertainment"]),
    ("vimeo.com", &["streaming_entertainment"]),
    ("bilibili.com", &["streaming_entertainment", "social"]),
    ("spotify.com", &["music", "streaming_entertainment"]),
    ("soundcloud.com", &["music", "streaming_entertainment"]),
    // Shopping
    ("amazon.com", &["shopping"]),
    ("amazon.co.jp", &["shopping"]),
    ("ebay.com", &["shopping"]),
    ("aliexpress.com", &["shopping"]),
    ("walmart.com", &["shopping"]),
    ("etsy.com", &["shopping"]),
    ("target.com", &["shopping"]),
    ("ikea.com", &["shopping"]),
    ("taobao.com", &["shopping"]),
    // News
    ("cnn.com", &["news_media"]),
    ("bbc.com", &["news_media"]),
    ("bbc.co.uk", &["news_media"]),
    ("nytimes.com", &["news_media"]),
    ("theguardian.com", &["news_media"]),
    ("washingtonpost.com", &["news_media"]),
    ("reuters.com", &["news_media"]),
    ("apnews.com", &["news_media"]),
    ("npr.org", &["news_media"]),
    ("wsj.com", &["news_media", "finance"]),
    ("bloomberg.com", &["news_media", "finance"]),
    ("spiegel.de", &["news_media"]),
    // Tech & development
    ("github.com", &["tech_dev", "productivity_tools"]),
    ("gitlab.com", &["tech_dev", "productivity_tools"]),
    ("bitbucket.org", &["tech_dev", "productivity_tools"]),
    ("stackoverflow.com", &["tech_dev", "reference_research"]),
    ("developer.mozilla.org", &["tech_dev", "reference_research"]),
    ("docs.rs", &["tech_dev", "reference_research"]),
    ("crates.io", &["tech_dev"]),
    ("medium.com", &["tech_dev", "reference_research"]),
    ("dev.to", &["tech_dev", "reference_research"]),
    ("w3schools.com", &["tech_dev", "reference_research", "education"]),
    // Productivity
    ("notion.so", &["productivity_tools"]),
    ("trello.com", &["productivity_tools"]),
    ("asana.com", &["productivity_tools"]),
    ("atlassian.com", &["productivity_tools", "tech_dev"]),
    ("figma.com", &["productivity_tools", "tech_dev"]),
    ("dropbox.com", &["productivity_tools"]),
    ("office.com", &["productivity_tools"]),
    ("microsoft.com", &["productivity_tools", "tech_dev"]),
    // Reference
    ("wikipedia.org", &["reference_research"]),
    ("archive.org", &["reference_research"]),
    ("britannica.com", &["reference_research", "education"]),
    ("merriam-webster.com", &["reference_research"]),
    // Finance
    ("paypal.com", &["finance"]),
    ("chase.com", &["finance"]),
    ("bankofamerica.com", &["finance"]),
    ("robinhood.com", &["finance", "crypto"]),
    ("coinbase.com", &["crypto", "finance"]),
    ("binance.com", &["crypto", "finance"]),
    // Gaming
    ("steampowered.com", &["gaming"]),
    ("epicgames.com", &["gaming"]),
    ("roblox.com", &["gaming", "social"]),
    ("ign.com", &["gaming", "news_media"]),
    // Travel
    ("booking.com", &["travel"]),
    ("airbnb.com", &["travel"]),
    ("expedia.com", &["travel"]),
    ("tripadvisor.com", &["travel", "reference_research"]),
];

/// Built-in table plus user-supplied entries. User entries win.
#[derive(Clone, Debug, Default)]
pub struct DomainCategoryTable {
    extra: HashMap<String, Vec<String>>,
}

impl DomainCategoryTable {
    /// Table with only the built-in entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with user entries layered over the built-ins. Keys are
    /// normalized to lowercase without `www.`.
    #[must_use]
    pub fn with_extra(extra: HashMap<String, Vec<String>>) -> Self {
        let extra = extra
            .into_iter()
            .map(|(domain, categories)| (normalize(&domain), categories))
            .collect();
        Self { extra }
    }

    fn exact(&self, domain: &str) -> Option<Vec<String>> {
        if let Some(categories) = self.extra.get(domain) {
            return Some(categories.clone());
        }
        BUILTIN
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, categories)| categories.iter().map(|c| (*c).to_owned()).collect())
    }
}

impl CategoryLookup for DomainCategoryTable {
    fn categories_for(&self, domain: &str) -> Vec<String> {
        let domain = normalize(domain);
        if let Some(found) = self.exact(&domain) {
            return found;
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() > 2 {
            if let Some(found) = self.exact(&labels[1..].join(".")) {
                return found;
            }
        }
        Vec::new()
    }
}

/// First category for `domain`, or [`UNCATEGORIZED`].
pub fn primary_category(lookup: &dyn CategoryLookup, domain: &str) -> String {
    lookup
        .categories_for(domain)
        .into_iter()
        .next()
        .unwrap_or_else(|| UNCATEGORIZED.to_owned())
}

fn normalize(domain: &str) -> String {
    let lower = domain.trim().to_ascii_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
