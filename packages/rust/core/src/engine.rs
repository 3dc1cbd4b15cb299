//! End-to-end trigger evaluation:
//! request → fields → cursor → fetch → normalize → select → respond.
//!
//! The engine owns no mutable state. Everything a call needs arrives in the
//! request or comes back from the feed source, so one engine can serve any
//! number of concurrent evaluations.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use wikitrigger_feeds::{FeedSource, WikiFeedSource};
use wikitrigger_shared::{
    AppConfig, DefaultsConfig, FeedConfig, Result, TriggerFields, TriggerKind, TriggerRequest,
    WikiTriggerError, cursor_secret,
};

use crate::cursor::CursorCodec;
use crate::normalize::normalize;
use crate::respond::{PlatformResponder, Responder, TriggerResponse};
use crate::select::{SelectionResult, select};

/// Counters describing one evaluation, for logs and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Raw items returned by the feed source.
    pub fetched: usize,
    /// Raw items skipped as malformed.
    pub malformed: usize,
    /// Events placed in the response.
    pub delivered: usize,
    /// Whether an invalid cursor was replaced by the null watermark.
    pub cursor_reset: bool,
}

/// Result of [`TriggerEngine::evaluate`].
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub response: TriggerResponse,
    pub selection: SelectionResult,
    pub stats: EvaluationStats,
}

/// Evaluates trigger polls against a feed source.
pub struct TriggerEngine {
    source: Arc<dyn FeedSource>,
    codec: CursorCodec,
    responder: Box<dyn Responder>,
    defaults: DefaultsConfig,
}

impl TriggerEngine {
    /// An engine with default fields and token cursor delivery.
    pub fn new(source: Arc<dyn FeedSource>, codec: CursorCodec) -> Self {
        Self {
            source,
            codec,
            responder: Box::new(PlatformResponder::default()),
            defaults: DefaultsConfig::default(),
        }
    }

    /// Build the live engine: wiki feed source, keyed codec, configured delivery.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = WikiFeedSource::new(FeedConfig::from(config))?;
        Ok(Self::new(Arc::new(source), CursorCodec::new(cursor_secret(config)))
            .with_responder(PlatformResponder::new(config.cursor.delivery))
            .with_defaults(config.defaults.clone()))
    }

    pub fn with_responder(mut self, responder: impl Responder + 'static) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn with_defaults(mut self, defaults: DefaultsConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Apply defaults and check required fields for `kind`.
    pub fn resolve_fields(&self, kind: TriggerKind, fields: &TriggerFields) -> Result<TriggerFields> {
        let mut resolved = fields.clone();

        if kind.takes_lang() && fields.lang().is_none() {
            resolved.insert("lang", self.defaults.lang.clone());
        }

        for name in kind.required_fields() {
            let value = fields.get(name).ok_or_else(|| {
                WikiTriggerError::validation(format!("{kind} trigger requires field '{name}'"))
            })?;
            if *name == "hashtag" {
                let tag = value.trim_start_matches('#').trim();
                if tag.is_empty() {
                    return Err(WikiTriggerError::validation("hashtag must not be empty"));
                }
                resolved.insert("hashtag", tag);
            }
        }

        Ok(resolved)
    }

    /// Evaluate one trigger poll.
    ///
    /// Request-level failures (bad limit, missing fields, upstream outage)
    /// return an error and no response. Malformed items and invalid cursors
    /// are absorbed and reported through [`EvaluationStats`].
    #[instrument(skip_all, fields(kind = %kind, identity = request.trigger_identity.as_deref()))]
    pub async fn evaluate(&self, kind: TriggerKind, request: &TriggerRequest) -> Result<Evaluation> {
        let start = Instant::now();

        let limit = request.limit.unwrap_or(self.defaults.limit);
        if limit <= 0 {
            return Err(WikiTriggerError::InvalidLimit { limit });
        }
        let fields = self.resolve_fields(kind, &request.trigger_fields)?;
        let (watermark, cursor_reset) = self.codec.decode_or_reset(request.cursor.as_deref());

        let raw = self.source.fetch(kind, &fields).await?;
        let normalized = normalize(&raw, kind);
        let selection = select(&normalized.events, &watermark, kind, limit)?;

        let next_cursor = self.codec.encode(&selection.next_watermark);
        let response = self.responder.assemble(kind, &selection, next_cursor);

        let stats = EvaluationStats {
            fetched: raw.len(),
            malformed: normalized.malformed.len(),
            delivered: selection.events.len(),
            cursor_reset,
        };

        info!(
            fetched = stats.fetched,
            malformed = stats.malformed,
            delivered = stats.delivered,
            cursor_reset,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trigger evaluated"
        );

        Ok(Evaluation {
            response,
            selection,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use wikitrigger_shared::{CursorDelivery, RawItem};

    /// In-memory feed source returning canned items and recording requests.
    struct StubSource {
        items: Vec<Value>,
        fail: bool,
        seen: Mutex<Vec<TriggerFields>>,
    }

    impl StubSource {
        fn with(items: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                items,
                fail: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                items: Vec::new(),
                fail: true,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FeedSource for StubSource {
        async fn fetch(&self, _kind: TriggerKind, fields: &TriggerFields) -> Result<Vec<RawItem>> {
            self.seen.lock().unwrap().push(fields.clone());
            if self.fail {
                return Err(WikiTriggerError::SourceUnavailable("stub outage".into()));
            }
            Ok(self
                .items
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect())
        }
    }

    fn edits() -> Vec<Value> {
        vec![
            json!({"revid": 103, "timestamp": "2024-01-15T10:00:12Z", "title": "C"}),
            json!({"revid": 101, "timestamp": "2024-01-15T10:00:10Z", "title": "A"}),
            json!({"revid": 102, "timestamp": "2024-01-15T10:00:12Z", "title": "B"}),
            json!({"revid": 104, "title": "no timestamp"}),
        ]
    }

    fn engine(source: Arc<StubSource>) -> TriggerEngine {
        TriggerEngine::new(source, CursorCodec::new("k"))
    }

    fn request(cursor: Option<String>, limit: i64, fields: &[(&str, &str)]) -> TriggerRequest {
        TriggerRequest {
            cursor,
            limit: Some(limit),
            trigger_identity: None,
            trigger_fields: fields.iter().copied().collect(),
        }
    }

    fn meta_ids(eval: &Evaluation) -> Vec<String> {
        eval.response
            .data
            .iter()
            .map(|item| item["meta"]["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn cursor_threads_through_successive_polls() {
        let engine = engine(StubSource::with(edits()));
        let fields = [("hashtag", "#1lib1ref")];

        let first = engine
            .evaluate(TriggerKind::HashtagEdit, &request(None, 2, &fields))
            .await
            .unwrap();
        assert_eq!(meta_ids(&first), vec!["101", "102"]);
        assert_eq!(first.stats.fetched, 4);
        assert_eq!(first.stats.malformed, 1);

        let second = engine
            .evaluate(TriggerKind::HashtagEdit, &request(first.response.cursor.clone(), 2, &fields))
            .await
            .unwrap();
        assert_eq!(meta_ids(&second), vec!["103"]);

        let third = engine
            .evaluate(TriggerKind::HashtagEdit, &request(second.response.cursor.clone(), 2, &fields))
            .await
            .unwrap();
        assert!(third.response.data.is_empty());
        assert_eq!(third.response.cursor, second.response.cursor);
    }

    #[tokio::test]
    async fn invalid_cursor_resets_instead_of_failing() {
        let engine = engine(StubSource::with(edits()));
        let eval = engine
            .evaluate(
                TriggerKind::UserUpdate,
                &request(Some("not-a-cursor".into()), 10, &[("user", "ExampleEditor")]),
            )
            .await
            .unwrap();
        assert!(eval.stats.cursor_reset);
        assert_eq!(eval.stats.delivered, 3);
    }

    #[tokio::test]
    async fn source_failure_fails_the_request() {
        let engine = engine(StubSource::failing());
        let err = engine
            .evaluate(TriggerKind::NewArticle, &request(None, 5, &[]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn non_positive_limit_fails_before_fetching() {
        let source = StubSource::with(edits());
        let engine = engine(source.clone());
        let err = engine
            .evaluate(TriggerKind::NewArticle, &request(None, 0, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, WikiTriggerError::InvalidLimit { limit: 0 }));
        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_required_field_fails_before_fetching() {
        let source = StubSource::with(edits());
        let engine = engine(source.clone());
        let err = engine
            .evaluate(TriggerKind::ArticleUpdate, &request(None, 5, &[("title", "  ")]))
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn defaults_fill_lang_and_limit() {
        let source = StubSource::with(edits());
        let engine = engine(source.clone()).with_defaults(DefaultsConfig {
            lang: "fr".into(),
            limit: 1,
        });
        let req = TriggerRequest {
            trigger_fields: [("hashtag", "#WikiGap")].into_iter().collect(),
            ..TriggerRequest::default()
        };
        let eval = engine.evaluate(TriggerKind::HashtagEdit, &req).await.unwrap();
        assert_eq!(eval.stats.delivered, 1);

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen[0].lang(), Some("fr"));
        assert_eq!(seen[0].get("hashtag"), Some("WikiGap"));
    }

    #[tokio::test]
    async fn implicit_delivery_omits_cursor() {
        let engine = engine(StubSource::with(edits()))
            .with_responder(PlatformResponder::new(CursorDelivery::Implicit));
        let eval = engine
            .evaluate(TriggerKind::UserUpdate, &request(None, 5, &[("user", "X")]))
            .await
            .unwrap();
        assert!(eval.response.cursor.is_none());
        assert_eq!(eval.stats.delivered, 3);
    }

    #[tokio::test]
    async fn singleton_kind_delivers_latest_day_once() {
        let days = vec![
            json!({"published": "Sun, 14 Jan 2024 00:00:00 GMT", "title": "Tea"}),
            json!({"published": "Mon, 15 Jan 2024 00:00:00 GMT", "title": "Coffee"}),
        ];
        let engine = engine(StubSource::with(days));
        let first = engine
            .evaluate(TriggerKind::ArticleOfDay, &request(None, 50, &[]))
            .await
            .unwrap();
        assert_eq!(meta_ids(&first), vec!["2024-01-15"]);
        assert_eq!(first.response.data[0]["title"], "Coffee");

        let again = engine
            .evaluate(TriggerKind::ArticleOfDay, &request(first.response.cursor.clone(), 50, &[]))
            .await
            .unwrap();
        assert!(again.response.data.is_empty());
    }
}
