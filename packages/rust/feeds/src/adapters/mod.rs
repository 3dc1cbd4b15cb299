//! Feed adapter trait and built-in adapters, one per trigger kind.
//!
//! An adapter knows how to phrase the wiki API request for its kind and how
//! to turn the response body into raw items. HTTP, caching and host
//! resolution live in [`WikiFeedSource`](crate::WikiFeedSource).

mod contribs;
mod featured;
mod hashtag;
mod recent_changes;
mod revisions;

use serde_json::Value;
use url::Url;

use wikitrigger_shared::{RawItem, Result, TriggerFields, TriggerKind, WikiTriggerError};

pub use contribs::UserContribsAdapter;
pub use featured::FeaturedFeedAdapter;
pub use hashtag::{HashtagAdapter, find_hashtags};
pub use recent_changes::NewArticleAdapter;
pub use revisions::ArticleRevisionsAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Per-request inputs shared by all adapters.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    /// Hostname of the wiki being queried (e.g. `en.wikipedia.org`).
    pub wiki: &'a str,
    /// Resolved trigger fields.
    pub fields: &'a TriggerFields,
    /// Upstream page size.
    pub fetch_limit: u32,
}

impl FetchContext<'_> {
    /// Trigger field that must be present for this kind.
    pub fn required(&self, kind: TriggerKind, name: &str) -> Result<&str> {
        self.fields.get(name).ok_or_else(|| {
            WikiTriggerError::validation(format!("{kind} trigger requires the '{name}' field"))
        })
    }
}

/// Kind-specific request building and response parsing.
pub trait FeedAdapter: Send + Sync {
    /// The trigger kind this adapter serves.
    fn kind(&self) -> TriggerKind;

    /// Query-string parameters for `api.php`.
    fn query(&self, ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>>;

    /// Parse a response body into raw items. Fields an entry lacks are
    /// simply left out; the normalizer decides what is malformed.
    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>>;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one adapter per trigger kind.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn FeedAdapter>>,
}

impl AdapterRegistry {
    /// Create a registry with all built-in adapters.
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(FeaturedFeedAdapter::new(TriggerKind::PictureOfDay)),
                Box::new(FeaturedFeedAdapter::new(TriggerKind::ArticleOfDay)),
                Box::new(FeaturedFeedAdapter::new(TriggerKind::WordOfDay)),
                Box::new(NewArticleAdapter),
                Box::new(HashtagAdapter),
                Box::new(ArticleRevisionsAdapter),
                Box::new(UserContribsAdapter),
            ],
        }
    }

    /// Adapter serving `kind`.
    pub fn get(&self, kind: TriggerKind) -> Result<&dyn FeedAdapter> {
        self.adapters
            .iter()
            .find(|a| a.kind() == kind)
            .map(|a| a.as_ref())
            .ok_or_else(|| WikiTriggerError::config(format!("no feed adapter for {kind}")))
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the API-query adapters
// ---------------------------------------------------------------------------

/// Parameters common to every `action=query` request.
pub(crate) fn base_query() -> Vec<(&'static str, String)> {
    vec![
        ("action", "query".to_string()),
        ("format", "json".to_string()),
        ("formatversion", "2".to_string()),
    ]
}

/// Decode an API response body. An unreadable body is an upstream failure.
pub(crate) fn parse_json(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        WikiTriggerError::SourceUnavailable(format!("unreadable API response: {e}"))
    })?;
    if let Some(error) = value.get("error") {
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown API error");
        return Err(WikiTriggerError::SourceUnavailable(format!(
            "wiki API error: {info}"
        )));
    }
    Ok(value)
}

/// Array at `query.<list>`, empty when the API omitted it.
pub(crate) fn query_list<'a>(value: &'a Value, list: &str) -> &'a [Value] {
    value
        .get("query")
        .and_then(|q| q.get(list))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Copy `key` from an API object into a raw item when present.
pub(crate) fn copy_field(item: &mut RawItem, source: &Value, key: &str) {
    if let Some(v) = source.get(key).filter(|v| !v.is_null()) {
        item.insert(key.to_string(), v.clone());
    }
}

pub(crate) fn insert_str(item: &mut RawItem, key: &str, value: impl Into<String>) {
    item.insert(key.to_string(), Value::String(value.into()));
}

/// `https://{wiki}/wiki/{Title_with_underscores}`
pub(crate) fn article_url(wiki: &str, title: &str) -> String {
    format!("https://{wiki}/wiki/{}", title.replace(' ', "_"))
}

/// `https://{wiki}/w/index.php?diff={revid}&oldid={parentid}`
pub(crate) fn diff_url(wiki: &str, revid: &Value, parentid: Option<&Value>) -> Option<String> {
    let revid = revid.as_u64()?;
    let parentid = parentid.and_then(Value::as_u64).unwrap_or(0);
    Some(format!(
        "https://{wiki}/w/index.php?diff={revid}&oldid={parentid}"
    ))
}

/// Byte delta between two size fields.
pub(crate) fn size_delta(source: &Value, new_key: &str, old_key: &str) -> Option<i64> {
    let new = source.get(new_key)?.as_i64()?;
    let old = source.get(old_key)?.as_i64()?;
    new.checked_sub(old)
}

/// Resolve a possibly relative href against the wiki's root.
pub(crate) fn absolute_url(wiki: &str, href: &str) -> Option<String> {
    let base = Url::parse(&format!("https://{wiki}/")).ok()?;
    base.join(href).ok().map(String::from)
}
