//! Newly created articles via `list=recentchanges&rctype=new`.

use serde_json::Value;

use super::{
    FeedAdapter, FetchContext, article_url, base_query, copy_field, insert_str, parse_json,
    query_list, size_delta,
};
use wikitrigger_shared::{RawItem, Result, TriggerKind};

/// `rcprop` shared with the hashtag adapter.
pub(crate) const RC_PROPS: &str = "title|ids|timestamp|user|sizes|comment";

/// Main-namespace page creations.
pub struct NewArticleAdapter;

impl FeedAdapter for NewArticleAdapter {
    fn kind(&self) -> TriggerKind {
        TriggerKind::NewArticle
    }

    fn query(&self, ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>> {
        let mut query = base_query();
        query.extend([
            ("list", "recentchanges".to_string()),
            ("rctype", "new".to_string()),
            ("rcnamespace", "0".to_string()),
            ("rclimit", ctx.fetch_limit.to_string()),
            ("rcprop", RC_PROPS.to_string()),
        ]);
        Ok(query)
    }

    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>> {
        let value = parse_json(body)?;
        Ok(query_list(&value, "recentchanges")
            .iter()
            .map(|change| {
                let mut item = RawItem::new();
                for key in ["pageid", "timestamp", "title", "user", "comment"] {
                    copy_field(&mut item, change, key);
                }
                if let Some(title) = change.get("title").and_then(Value::as_str) {
                    insert_str(&mut item, "url", article_url(ctx.wiki, title));
                }
                if let Some(delta) = size_delta(change, "newlen", "oldlen") {
                    item.insert("size".to_string(), Value::from(delta));
                }
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        "recentchanges"
    }
}
