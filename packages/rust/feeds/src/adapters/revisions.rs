//! Revisions to a named article via `prop=revisions`.

use serde_json::Value;

use super::{
    FeedAdapter, FetchContext, base_query, copy_field, diff_url, insert_str, parse_json,
};
use wikitrigger_shared::{RawItem, Result, TriggerKind};

pub struct ArticleRevisionsAdapter;

impl FeedAdapter for ArticleRevisionsAdapter {
    fn kind(&self) -> TriggerKind {
        TriggerKind::ArticleUpdate
    }

    fn query(&self, ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>> {
        let title = ctx.required(self.kind(), "title")?;
        let mut query = base_query();
        query.extend([
            ("prop", "revisions".to_string()),
            ("titles", title.to_string()),
            ("rvlimit", ctx.fetch_limit.to_string()),
            ("rvprop", "ids|timestamp|user|size|comment".to_string()),
        ]);
        Ok(query)
    }

    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>> {
        let value = parse_json(body)?;
        let Some(page) = value
            .get("query")
            .and_then(|q| q.get("pages"))
            .and_then(Value::as_array)
            .and_then(|pages| pages.first())
        else {
            return Ok(Vec::new());
        };

        // Prefer the wiki's normalized title over the caller's spelling.
        let title = page
            .get("title")
            .and_then(Value::as_str)
            .or_else(|| ctx.fields.get("title"))
            .unwrap_or_default()
            .to_string();

        let revisions = page
            .get("revisions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(revisions
            .iter()
            .map(|rev| {
                let mut item = RawItem::new();
                for key in ["revid", "timestamp", "user", "size", "comment"] {
                    copy_field(&mut item, rev, key);
                }
                insert_str(&mut item, "title", title.as_str());
                if let Some(url) = rev
                    .get("revid")
                    .and_then(|r| diff_url(ctx.wiki, r, rev.get("parentid")))
                {
                    insert_str(&mut item, "url", url);
                }
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        "revisions"
    }
}
