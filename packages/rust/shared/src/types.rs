//! Core domain types for WikiTrigger trigger evaluation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WikiTriggerError;

/// Response limit used when a request does not carry one.
pub const DEFAULT_RESPONSE_LIMIT: i64 = 50;

/// A raw upstream item as produced by a feed source, before normalization.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// TriggerKind
// ---------------------------------------------------------------------------

/// The wiki content feeds exposed as automation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Wikimedia Commons picture of the day.
    #[serde(rename = "picture_of_the_day")]
    PictureOfDay,
    /// Wikipedia today's featured article.
    #[serde(rename = "article_of_the_day")]
    ArticleOfDay,
    /// Wiktionary word of the day.
    #[serde(rename = "word_of_the_day")]
    WordOfDay,
    /// Newly created main-namespace articles.
    #[serde(rename = "new_article")]
    NewArticle,
    /// Edits whose summary carries a hashtag.
    #[serde(rename = "new_hashtag")]
    HashtagEdit,
    /// Revisions to a named article.
    #[serde(rename = "article_revisions")]
    ArticleUpdate,
    /// Contributions by a named user.
    #[serde(rename = "user_revisions")]
    UserUpdate,
}

impl TriggerKind {
    /// Every trigger kind, in display order.
    pub const ALL: [TriggerKind; 7] = [
        Self::PictureOfDay,
        Self::ArticleOfDay,
        Self::WordOfDay,
        Self::NewArticle,
        Self::HashtagEdit,
        Self::ArticleUpdate,
        Self::UserUpdate,
    ];

    /// Stable slug used in URLs, config and logs.
    pub fn slug(self) -> &'static str {
        match self {
            Self::PictureOfDay => "picture_of_the_day",
            Self::ArticleOfDay => "article_of_the_day",
            Self::WordOfDay => "word_of_the_day",
            Self::NewArticle => "new_article",
            Self::HashtagEdit => "new_hashtag",
            Self::ArticleUpdate => "article_revisions",
            Self::UserUpdate => "user_revisions",
        }
    }

    /// Recurring one-per-day items: only the newest is ever delivered.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::PictureOfDay | Self::ArticleOfDay | Self::WordOfDay
        )
    }

    /// Whether the trigger is parameterized by a wiki language.
    pub fn takes_lang(self) -> bool {
        !matches!(self, Self::PictureOfDay)
    }

    /// Trigger fields that must be non-empty (besides `lang`).
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::HashtagEdit => &["hashtag"],
            Self::ArticleUpdate => &["title"],
            Self::UserUpdate => &["user"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl std::str::FromStr for TriggerKind {
    type Err = WikiTriggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == wanted)
            .ok_or_else(|| WikiTriggerError::validation(format!("unknown trigger kind '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Ordering helpers
// ---------------------------------------------------------------------------

/// Compare two event identifiers: numerically when both are unsigned
/// integers (revision and page ids), lexically when neither is. Ids of a
/// single kind share one shape; if they ever mix, numeric ids sort first so
/// the order stays total.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

// ---------------------------------------------------------------------------
// CandidateEvent
// ---------------------------------------------------------------------------

/// A normalized, uniquely identified unit of content considered for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEvent {
    id: String,
    occurred_at: DateTime<Utc>,
    fields: BTreeMap<String, String>,
}

impl CandidateEvent {
    /// Build an event from its identity and payload fields.
    pub fn new(
        id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            occurred_at,
            fields,
        }
    }

    /// Identifier, unique within the kind's event space.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the event happened (UTC, second precision).
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Kind-specific payload fields.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Total delivery order: `(occurred_at, id)` ascending.
    pub fn order(&self, other: &Self) -> Ordering {
        self.occurred_at
            .cmp(&other.occurred_at)
            .then_with(|| compare_ids(&self.id, &other.id))
    }
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// The highest-ordered event already delivered for a trigger instance.
///
/// Both fields `None` is the null watermark: no prior delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub last_id: Option<String>,
    pub last_occurred_at: Option<DateTime<Utc>>,
}

impl Watermark {
    /// The "nothing delivered yet" watermark.
    pub fn null() -> Self {
        Self::default()
    }

    /// A watermark positioned at a specific event identity.
    pub fn at(id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            last_id: Some(id.into()),
            last_occurred_at: Some(occurred_at),
        }
    }

    pub fn is_null(&self) -> bool {
        self.last_id.is_none() && self.last_occurred_at.is_none()
    }

    /// Whether `event` lies strictly after this watermark.
    pub fn admits(&self, event: &CandidateEvent) -> bool {
        let Some(at) = self.last_occurred_at else {
            return true;
        };
        match event.occurred_at().cmp(&at) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match &self.last_id {
                Some(id) => compare_ids(event.id(), id) == Ordering::Greater,
                None => true,
            },
        }
    }

    /// Position comparison; the null watermark sorts before everything.
    pub fn position_cmp(&self, other: &Self) -> Ordering {
        self.last_occurred_at
            .cmp(&other.last_occurred_at)
            .then_with(|| match (&self.last_id, &other.last_id) {
                (Some(a), Some(b)) => compare_ids(a, b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }
}

impl From<&CandidateEvent> for Watermark {
    fn from(event: &CandidateEvent) -> Self {
        Self::at(event.id(), event.occurred_at())
    }
}

// ---------------------------------------------------------------------------
// Trigger request
// ---------------------------------------------------------------------------

/// Kind-specific filter parameters supplied with a trigger request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerFields(BTreeMap<String, String>);

impl TriggerFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field value, `None` when absent or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Wiki language code; callers resolve defaults before fetching.
    pub fn lang(&self) -> Option<&str> {
        self.get("lang")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TriggerFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An inbound trigger poll as sent by the automation platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Opaque cursor returned by a previous evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Maximum number of events to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Platform-assigned identity of the trigger instance (logged only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_identity: Option<String>,
    /// Kind-specific filter parameters.
    #[serde(default, rename = "triggerFields")]
    pub trigger_fields: TriggerFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn event(id: &str, secs: i64) -> CandidateEvent {
        CandidateEvent::new(id, ts(secs), BTreeMap::new())
    }

    #[test]
    fn kind_slug_roundtrip() {
        for kind in TriggerKind::ALL {
            let parsed: TriggerKind = kind.slug().parse().expect("parse slug");
            assert_eq!(parsed, kind);
        }
        assert_eq!(
            "new-hashtag".parse::<TriggerKind>().unwrap(),
            TriggerKind::HashtagEdit
        );
        assert!("recent_edits".parse::<TriggerKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_slug() {
        let json = serde_json::to_string(&TriggerKind::ArticleUpdate).unwrap();
        assert_eq!(json, "\"article_revisions\"");
    }

    #[test]
    fn singleton_kinds() {
        let singletons: Vec<_> = TriggerKind::ALL
            .into_iter()
            .filter(|k| k.is_singleton())
            .collect();
        assert_eq!(
            singletons,
            vec![
                TriggerKind::PictureOfDay,
                TriggerKind::ArticleOfDay,
                TriggerKind::WordOfDay
            ]
        );
    }

    #[test]
    fn ids_compare_numerically_when_possible() {
        assert_eq!(compare_ids("99", "100"), Ordering::Less);
        assert_eq!(compare_ids("2024-01-02", "2024-01-10"), Ordering::Less);
        assert_eq!(compare_ids("b", "a"), Ordering::Greater);
        assert_eq!(compare_ids("42", "42"), Ordering::Equal);
    }

    #[test]
    fn mixed_id_shapes_order_transitively() {
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("10", "1a"), Ordering::Less);
        assert_eq!(compare_ids("9", "1a"), Ordering::Less);

        let mut ids = vec!["1a", "10", "9", "b", "007", "7"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["007", "7", "9", "10", "1a", "b"]);
    }

    #[test]
    fn event_order_breaks_ties_by_id() {
        let a = event("102", 12);
        let b = event("103", 12);
        let c = event("101", 10);
        assert_eq!(a.order(&b), Ordering::Less);
        assert_eq!(c.order(&a), Ordering::Less);
    }

    #[test]
    fn null_watermark_admits_everything() {
        assert!(Watermark::null().is_null());
        assert!(Watermark::null().admits(&event("1", 0)));
    }

    #[test]
    fn watermark_admits_strictly_after() {
        let w = Watermark::at("102", ts(12));
        assert!(!w.admits(&event("101", 10)));
        assert!(!w.admits(&event("102", 12)));
        assert!(w.admits(&event("103", 12)));
        assert!(w.admits(&event("100", 13)));
    }

    #[test]
    fn watermark_position_ordering() {
        let null = Watermark::null();
        let early = Watermark::at("5", ts(10));
        let late = Watermark::at("3", ts(11));
        assert_eq!(null.position_cmp(&early), Ordering::Less);
        assert_eq!(early.position_cmp(&late), Ordering::Less);
        assert_eq!(late.position_cmp(&late.clone()), Ordering::Equal);
    }

    #[test]
    fn request_deserializes_platform_payload() {
        let json = r#"{
            "trigger_identity": "abc123",
            "limit": 5,
            "triggerFields": { "lang": "fr", "title": "Café" }
        }"#;
        let req: TriggerRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(req.limit, Some(5));
        assert_eq!(req.cursor, None);
        assert_eq!(req.trigger_fields.lang(), Some("fr"));
        assert_eq!(req.trigger_fields.get("title"), Some("Café"));
    }

    #[test]
    fn blank_trigger_fields_read_as_absent() {
        let fields: TriggerFields = [("lang", "  "), ("user", "Jimbo")].into_iter().collect();
        assert_eq!(fields.lang(), None);
        assert_eq!(fields.get("user"), Some("Jimbo"));
    }
}
