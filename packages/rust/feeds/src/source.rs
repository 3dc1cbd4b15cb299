//! MediaWiki-backed [`FeedSource`].
//!
//! Resolves the wiki host for a trigger, asks the kind's adapter for the
//! `api.php` query, serves the body from the refresh-window cache when it
//! can, and hands the body back to the adapter for parsing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use wikitrigger_shared::{
    FeedConfig, RawItem, Result, TriggerFields, TriggerKind, WikiTriggerError,
};

use crate::adapters::{AdapterRegistry, FetchContext};
use crate::cache::FeedCache;
use crate::{FeedSource, validate_lang, wiki_host};

/// User-Agent string for wiki API requests.
const USER_AGENT: &str = concat!("WikiTrigger/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Feed source talking to the live wikis.
pub struct WikiFeedSource {
    config: FeedConfig,
    client: Client,
    registry: AdapterRegistry,
    cache: FeedCache,
    /// Scheme/host/port replacing the real wiki host (mock servers in tests).
    base_override: Option<Url>,
}

impl WikiFeedSource {
    /// Create a feed source with the given configuration.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WikiTriggerError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            cache: FeedCache::new(Duration::from_secs(config.cache_ttl_secs)),
            config,
            client,
            registry: AdapterRegistry::new(),
            base_override: None,
        })
    }

    /// Send every request to `base` instead of the real wiki (for integration tests).
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_override = Some(base);
        self
    }

    /// `api.php` endpoint for a wiki host, with the query appended.
    fn endpoint(&self, host: &str, query: &[(&'static str, String)]) -> Result<Url> {
        let mut url = match &self.base_override {
            Some(base) => base.join("/w/api.php"),
            None => Url::parse(&format!("https://{host}/w/api.php")),
        }
        .map_err(|e| WikiTriggerError::config(format!("invalid endpoint for {host}: {e}")))?;

        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    /// Fetch a body over HTTP, mapping every failure to `SourceUnavailable`.
    async fn get_body(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| WikiTriggerError::SourceUnavailable(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikiTriggerError::SourceUnavailable(format!(
                "{url}: HTTP {status}"
            )));
        }

        response.text().await.map_err(|e| {
            WikiTriggerError::SourceUnavailable(format!("{url}: body read failed: {e}"))
        })
    }
}

#[async_trait]
impl FeedSource for WikiFeedSource {
    #[instrument(skip_all, fields(kind = %kind))]
    async fn fetch(&self, kind: TriggerKind, fields: &TriggerFields) -> Result<Vec<RawItem>> {
        let adapter = self.registry.get(kind)?;

        let lang = if kind.takes_lang() {
            let lang = fields.lang().ok_or_else(|| {
                WikiTriggerError::validation(format!("{kind} trigger requires a language"))
            })?;
            validate_lang(lang)?;
            lang
        } else {
            ""
        };
        let host = wiki_host(kind, lang);
        let ctx = FetchContext {
            wiki: &host,
            fields,
            fetch_limit: self.config.fetch_limit,
        };

        let url = self.endpoint(&host, &adapter.query(&ctx)?)?;
        let body = match self.cache.get(url.as_str()).await {
            Some(body) => {
                debug!(%url, "feed cache hit");
                body
            }
            None => {
                debug!(%url, "fetching feed");
                let body = self.get_body(&url).await?;
                self.cache.put(url.as_str(), body.clone()).await;
                body
            }
        };

        let items = adapter.parse(&body, &ctx)?;
        debug!(adapter = adapter.name(), items = items.len(), "feed parsed");
        Ok(items)
    }
}
