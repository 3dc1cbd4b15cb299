//! Raw feed items → [`CandidateEvent`]s.
//!
//! Every kind's extraction rule lives in [`rule_for`]: which raw key carries
//! the identity, which carries the time, and which payload fields are kept.
//! A bad item is rejected on its own; it never fails the batch.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde_json::Value;
use tracing::warn;

use wikitrigger_shared::{CandidateEvent, RawItem, Result, TriggerKind, WikiTriggerError};

/// Where an event's identity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdSource {
    /// A raw key holding an id (revision id, page id).
    Key(&'static str),
    /// The calendar date of the time key (`YYYY-MM-DD`).
    Day,
}

/// Kind-specific extraction rule.
#[derive(Debug, Clone, Copy)]
struct KindRule {
    id: IdSource,
    time_key: &'static str,
    /// Payload fields copied onto the event when present.
    fields: &'static [&'static str],
    /// Payload fields whose absence makes the item malformed.
    required: &'static [&'static str],
}

const EDIT_FIELDS: &[&str] = &["title", "url", "user", "size", "comment"];

fn rule_for(kind: TriggerKind) -> KindRule {
    match kind {
        TriggerKind::PictureOfDay => KindRule {
            id: IdSource::Day,
            time_key: "published",
            fields: &["url", "filename", "image_url", "filepage_url", "description"],
            required: &["image_url"],
        },
        TriggerKind::ArticleOfDay => KindRule {
            id: IdSource::Day,
            time_key: "published",
            fields: &["url", "title", "summary"],
            required: &["title"],
        },
        TriggerKind::WordOfDay => KindRule {
            id: IdSource::Day,
            time_key: "published",
            fields: &["url", "word", "part_of_speech", "definition"],
            required: &["word"],
        },
        TriggerKind::NewArticle => KindRule {
            id: IdSource::Key("pageid"),
            time_key: "timestamp",
            fields: EDIT_FIELDS,
            required: &["title"],
        },
        TriggerKind::HashtagEdit => KindRule {
            id: IdSource::Key("revid"),
            time_key: "timestamp",
            fields: &[
                "title",
                "url",
                "user",
                "size",
                "comment",
                "input_hashtag",
                "return_hashtags",
            ],
            required: &["title"],
        },
        TriggerKind::ArticleUpdate | TriggerKind::UserUpdate => KindRule {
            id: IdSource::Key("revid"),
            time_key: "timestamp",
            fields: EDIT_FIELDS,
            required: &[],
        },
    }
}

/// Output of [`normalize`]: the usable events plus the rejected items.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Events in `(occurred_at, id)` order, unique by id.
    pub events: Vec<CandidateEvent>,
    /// One `MalformedItem` error per skipped raw item.
    pub malformed: Vec<WikiTriggerError>,
}

/// Normalize a whole fetch. Malformed items are skipped and reported;
/// repeated ids keep their first occurrence.
pub fn normalize(raw_items: &[RawItem], kind: TriggerKind) -> Normalized {
    let mut seen = HashSet::new();
    let mut out = Normalized::default();

    for (index, raw) in raw_items.iter().enumerate() {
        match normalize_item(raw, kind) {
            Ok(event) => {
                if seen.insert(event.id().to_string()) {
                    out.events.push(event);
                }
            }
            Err(e) => {
                warn!(%kind, index, error = %e, "skipping malformed feed item");
                out.malformed.push(e);
            }
        }
    }

    out.events.sort_by(|a, b| a.order(b));
    out
}

/// Normalize a single raw item per its kind's rule.
pub fn normalize_item(raw: &RawItem, kind: TriggerKind) -> Result<CandidateEvent> {
    let rule = rule_for(kind);

    let time_raw = raw
        .get(rule.time_key)
        .and_then(scalar_string)
        .ok_or_else(|| WikiTriggerError::malformed(kind, format!("missing {}", rule.time_key)))?;
    let parsed = parse_timestamp(&time_raw).ok_or_else(|| {
        WikiTriggerError::malformed(kind, format!("unparsable {} '{time_raw}'", rule.time_key))
    })?;

    let (id, occurred_at) = match rule.id {
        IdSource::Day => {
            let day = parsed.date_naive();
            let midnight = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
            (day.format("%Y-%m-%d").to_string(), midnight)
        }
        IdSource::Key(key) => {
            let id = raw
                .get(key)
                .and_then(scalar_string)
                .ok_or_else(|| WikiTriggerError::malformed(kind, format!("missing {key}")))?;
            (id, parsed)
        }
    };

    let mut fields = BTreeMap::new();
    for name in rule.fields {
        if let Some(value) = raw.get(*name).and_then(scalar_string) {
            fields.insert((*name).to_string(), value);
        }
    }
    if let Some(missing) = rule.required.iter().find(|f| !fields.contains_key(**f)) {
        return Err(WikiTriggerError::malformed(kind, format!("missing {missing}")));
    }

    Ok(CandidateEvent::new(id, occurred_at, fields))
}

/// String form of a JSON scalar; blanks, nulls and containers are absent.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Parse the timestamp shapes the wikis emit, truncated to whole seconds:
/// RFC 3339 (API), RFC 2822 (RSS), `YYYYMMDDHHMMSS` (database), `YYYY-MM-DD`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|day| Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN)))
        })?;
    parsed.with_nanosecond(0)
}
