//! Wiki feed sources and per-kind feed adapters.
//!
//! This crate provides:
//! - [`FeedSource`]: the fetch contract the trigger engine consumes
//! - [`adapters`]: per-kind request builders and response parsers
//! - [`WikiFeedSource`]: the MediaWiki-backed source with a short-lived cache

pub mod adapters;
pub mod cache;
pub mod source;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use wikitrigger_shared::{RawItem, Result, TriggerFields, TriggerKind, WikiTriggerError};

pub use adapters::{AdapterRegistry, FeaturedFeedAdapter, FeedAdapter, FetchContext};
pub use cache::FeedCache;
pub use source::WikiFeedSource;

/// Fetches the raw candidate items for one trigger kind.
///
/// Items may come back in any order. Implementations report upstream
/// failures as [`WikiTriggerError::SourceUnavailable`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, kind: TriggerKind, fields: &TriggerFields) -> Result<Vec<RawItem>>;
}

static LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{1,15}$").expect("valid language regex"));

/// Check that a language code is safe to splice into a wiki hostname.
pub fn validate_lang(lang: &str) -> Result<()> {
    if LANG_RE.is_match(lang) {
        Ok(())
    } else {
        Err(WikiTriggerError::validation(format!(
            "invalid wiki language code '{lang}'"
        )))
    }
}

/// Hostname of the wiki serving a trigger kind.
pub fn wiki_host(kind: TriggerKind, lang: &str) -> String {
    match kind {
        TriggerKind::PictureOfDay => "commons.wikimedia.org".to_string(),
        TriggerKind::WordOfDay => format!("{lang}.wiktionary.org"),
        _ => format!("{lang}.wikipedia.org"),
    }
}
