//! Contributions by a named user via `list=usercontribs`.

use super::{
    FeedAdapter, FetchContext, base_query, copy_field, diff_url, insert_str, parse_json,
    query_list,
};
use wikitrigger_shared::{RawItem, Result, TriggerKind};

pub struct UserContribsAdapter;

impl FeedAdapter for UserContribsAdapter {
    fn kind(&self) -> TriggerKind {
        TriggerKind::UserUpdate
    }

    fn query(&self, ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>> {
        let user = ctx.required(self.kind(), "user")?;
        let mut query = base_query();
        query.extend([
            ("list", "usercontribs".to_string()),
            ("ucuser", user.to_string()),
            ("uclimit", ctx.fetch_limit.to_string()),
            ("ucprop", "ids|timestamp|title|size|comment".to_string()),
        ]);
        Ok(query)
    }

    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>> {
        let user = ctx.required(self.kind(), "user")?;
        let value = parse_json(body)?;

        Ok(query_list(&value, "usercontribs")
            .iter()
            .map(|contrib| {
                let mut item = RawItem::new();
                for key in ["revid", "timestamp", "title", "size", "comment", "user"] {
                    copy_field(&mut item, contrib, key);
                }
                if !item.contains_key("user") {
                    insert_str(&mut item, "user", user);
                }
                if let Some(url) = contrib
                    .get("revid")
                    .and_then(|r| diff_url(ctx.wiki, r, contrib.get("parentid")))
                {
                    insert_str(&mut item, "url", url);
                }
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        "usercontribs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikitrigger_shared::TriggerFields;

    #[test]
    fn parses_user_contributions() {
        let body = std::fs::read_to_string("../../../fixtures/feeds/user_contribs.json")
            .expect("read fixture");
        let fields: TriggerFields = [("user", "ExampleEditor")].into_iter().collect();
        let ctx = FetchContext {
            wiki: "de.wikipedia.org",
            fields: &fields,
            fetch_limit: 50,
        };
        let items = UserContribsAdapter.parse(&body, &ctx).expect("parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "Kaffee");
        assert_eq!(items[0]["user"], "ExampleEditor");
        assert_eq!(
            items[1]["url"],
            "https://de.wikipedia.org/w/index.php?diff=5003&oldid=0"
        );
    }

    #[test]
    fn user_field_is_required() {
        let fields = TriggerFields::new();
        let ctx = FetchContext {
            wiki: "de.wikipedia.org",
            fields: &fields,
            fetch_limit: 50,
        };
        assert!(UserContribsAdapter.query(&ctx).is_err());
    }
}
