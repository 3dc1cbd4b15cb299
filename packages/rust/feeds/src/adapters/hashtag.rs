//! Edits whose summary carries a hashtag, via `list=recentchanges`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::recent_changes::RC_PROPS;
use super::{
    FeedAdapter, FetchContext, article_url, base_query, copy_field, diff_url, insert_str,
    parse_json, query_list, size_delta,
};
use wikitrigger_shared::{RawItem, Result, TriggerKind};

/// Parser-function and redirect keywords that look like hashtags but are not.
const NOT_TAGS: [&str; 3] = ["redirect", "ifexist", "if"];

/// Minimum `rclimit` for hashtag scans (the API ceiling for non-bot clients).
/// Tags are matched client-side, so the window must span the whole poll gap.
const HASHTAG_SCAN_LIMIT: u32 = 500;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w&#])#([\w-]*[^\W\d][\w-]*)").expect("valid hashtag regex")
});

/// All hashtags in an edit summary, without the `#`, in order of appearance.
pub fn find_hashtags(comment: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(comment)
        .map(|c| c[1].to_string())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .collect()
}

/// Recent edits tagged with the requested hashtag.
pub struct HashtagAdapter;

impl FeedAdapter for HashtagAdapter {
    fn kind(&self) -> TriggerKind {
        TriggerKind::HashtagEdit
    }

    fn query(&self, ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>> {
        ctx.required(self.kind(), "hashtag")?;
        let mut query = base_query();
        query.extend([
            ("list", "recentchanges".to_string()),
            ("rctype", "edit|new".to_string()),
            ("rclimit", ctx.fetch_limit.max(HASHTAG_SCAN_LIMIT).to_string()),
            ("rcprop", RC_PROPS.to_string()),
        ]);
        Ok(query)
    }

    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>> {
        let wanted = ctx
            .required(self.kind(), "hashtag")?
            .trim_start_matches('#')
            .to_lowercase();
        let value = parse_json(body)?;

        let items = query_list(&value, "recentchanges")
            .iter()
            .filter_map(|change| {
                let comment = change.get("comment").and_then(Value::as_str)?;
                let tags = find_hashtags(comment);
                let lowered: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
                let has_real_tag = lowered.iter().any(|t| !NOT_TAGS.contains(&t.as_str()));
                if !has_real_tag || !lowered.contains(&wanted) {
                    return None;
                }

                let mut item = RawItem::new();
                for key in ["revid", "timestamp", "title", "user", "comment"] {
                    copy_field(&mut item, change, key);
                }
                if let Some(url) = change
                    .get("revid")
                    .and_then(|r| diff_url(ctx.wiki, r, change.get("old_revid")))
                {
                    insert_str(&mut item, "url", url);
                } else if let Some(title) = change.get("title").and_then(Value::as_str) {
                    insert_str(&mut item, "url", article_url(ctx.wiki, title));
                }
                if let Some(delta) = size_delta(change, "newlen", "oldlen") {
                    item.insert("size".to_string(), Value::from(delta));
                }
                insert_str(&mut item, "input_hashtag", wanted.clone());
                insert_str(&mut item, "return_hashtags", tags.join(" "));
                Some(item)
            })
            .collect();

        Ok(items)
    }

    fn name(&self) -> &str {
        "hashtags"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikitrigger_shared::TriggerFields;

    #[test]
    fn extracts_hashtags() {
        assert_eq!(
            find_hashtags("Added sources #wikiproject #1lib1ref"),
            vec!["wikiproject", "1lib1ref"]
        );
        assert_eq!(find_hashtags("#Edit-a-thon at start"), vec!["Edit-a-thon"]);
        // numeric-only, html entities and anchors are not tags
        assert!(find_hashtags("see item #42 and &#91; and Page#Section").is_empty());
        // duplicates collapse case-insensitively
        assert_eq!(find_hashtags("#Art+Feminism #art+feminism"), vec!["Art"]);
    }

    fn ctx_with<'a>(fields: &'a TriggerFields) -> FetchContext<'a> {
        FetchContext {
            wiki: "en.wikipedia.org",
            fields,
            fetch_limit: 50,
        }
    }

    #[test]
    fn keeps_only_matching_edits() {
        let body = std::fs::read_to_string("../../../fixtures/feeds/hashtag_changes.json")
            .expect("read fixture");
        let fields: TriggerFields = [("hashtag", "#1Lib1Ref")].into_iter().collect();
        let items = HashtagAdapter.parse(&body, &ctx_with(&fields)).expect("parse");

        let revids: Vec<u64> = items.iter().filter_map(|i| i["revid"].as_u64()).collect();
        assert_eq!(revids, vec![9002, 9004]);

        let first = &items[0];
        assert_eq!(first["input_hashtag"], "1lib1ref");
        assert_eq!(first["return_hashtags"], "1lib1ref wikiproject");
        assert_eq!(
            first["url"],
            "https://en.wikipedia.org/w/index.php?diff=9002&oldid=8990"
        );
        assert_eq!(first["size"], -12);
    }

    #[test]
    fn redirect_only_is_not_a_hashtag_edit() {
        let body = r##"{"query":{"recentchanges":[
            {"revid":1,"old_revid":0,"timestamp":"2024-01-15T10:00:00Z","title":"A","comment":"#redirect [[B]]"}
        ]}}"##;
        let fields: TriggerFields = [("hashtag", "redirect")].into_iter().collect();
        let items = HashtagAdapter.parse(body, &ctx_with(&fields)).expect("parse");
        assert!(items.is_empty());
    }

    #[test]
    fn scans_a_wide_recent_changes_window() {
        let fields: TriggerFields = [("hashtag", "1lib1ref")].into_iter().collect();
        let query = HashtagAdapter.query(&ctx_with(&fields)).expect("query");
        assert!(query.contains(&("rclimit", "500".to_string())));
        // filtering happens on our side, so no tag filter goes upstream
        assert!(query.iter().all(|(_, v)| !v.contains("1lib1ref")));

        let wide = FetchContext {
            fetch_limit: 800,
            ..ctx_with(&fields)
        };
        let query = HashtagAdapter.query(&wide).expect("query");
        assert!(query.contains(&("rclimit", "800".to_string())));
    }

    #[test]
    fn hashtag_field_is_required() {
        let fields = TriggerFields::new();
        let err = HashtagAdapter.query(&ctx_with(&fields)).unwrap_err();
        assert!(err.is_caller_error());
    }
}
