//! Featured-content feeds: picture, article and word of the day.
//!
//! MediaWiki publishes these as RSS via `action=featuredfeed`. Each `<item>`
//! carries an escaped HTML `<description>` that we scrape for the payload.

use scraper::{ElementRef, Html, Selector};

use super::{FeedAdapter, FetchContext, absolute_url, insert_str};
use wikitrigger_shared::{RawItem, Result, TriggerKind};

/// Link text MediaWiki appends to the featured-article summary.
const FULL_ARTICLE_SUFFIXES: [&str; 2] = ["(Full\u{a0}article...)", "(Full article...)"];

/// Scrapes one of the three featured feeds.
pub struct FeaturedFeedAdapter {
    kind: TriggerKind,
}

impl FeaturedFeedAdapter {
    /// `kind` must be a singleton (featured) kind.
    pub fn new(kind: TriggerKind) -> Self {
        debug_assert!(kind.is_singleton(), "{kind} is not a featured feed");
        Self { kind }
    }

    fn feed(&self) -> &'static str {
        match self.kind {
            TriggerKind::PictureOfDay => "potd",
            TriggerKind::WordOfDay => "wotd",
            _ => "featured",
        }
    }
}

impl FeedAdapter for FeaturedFeedAdapter {
    fn kind(&self) -> TriggerKind {
        self.kind
    }

    fn query(&self, _ctx: &FetchContext<'_>) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("action", "featuredfeed".to_string()),
            ("feed", self.feed().to_string()),
            ("feedformat", "rss".to_string()),
        ])
    }

    fn parse(&self, body: &str, ctx: &FetchContext<'_>) -> Result<Vec<RawItem>> {
        let doc = Html::parse_document(body);
        let item_sel = Selector::parse("item").unwrap();

        let items = doc
            .select(&item_sel)
            .map(|entry| {
                let mut item = RawItem::new();
                // Entry ids sometimes arrive as http:; one entry must map to one identity.
                if let Some(guid) = child_text(entry, "guid") {
                    insert_str(&mut item, "url", guid.replacen("http:", "https:", 1));
                }
                if let Some(published) = child_text(entry, "pubdate") {
                    insert_str(&mut item, "published", published);
                }
                let description = child_text(entry, "description").unwrap_or_default();
                let summary = Html::parse_fragment(&description);
                match self.kind {
                    TriggerKind::PictureOfDay => scrape_picture(&summary, ctx.wiki, &mut item),
                    TriggerKind::WordOfDay => scrape_word(&summary, ctx.wiki, &mut item),
                    _ => scrape_article(&summary, ctx.wiki, &mut item),
                }
                item
            })
            .collect();

        Ok(items)
    }

    fn name(&self) -> &str {
        self.feed()
    }
}

/// Trimmed text of the first `tag` child element.
fn child_text(entry: ElementRef<'_>, tag: &str) -> Option<String> {
    let sel = Selector::parse(tag).ok()?;
    entry
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn scrape_picture(summary: &Html, wiki: &str, item: &mut RawItem) {
    let link_sel = Selector::parse("a.image, a.mw-file-description").unwrap();
    let img_sel = Selector::parse("img").unwrap();
    let desc_sel = Selector::parse(".description.en, .description").unwrap();

    if let Some(link) = summary.select(&link_sel).next() {
        if let Some(href) = link.value().attr("href").and_then(|h| absolute_url(wiki, h)) {
            insert_str(item, "filepage_url", href);
        }
        if let Some(img) = link.select(&img_sel).next() {
            if let Some(alt) = img.value().attr("alt") {
                insert_str(item, "filename", alt);
            }
            if let Some(src) = img.value().attr("src") {
                let full = full_size_image(src, img.value().attr("width"));
                if let Some(url) = absolute_url(wiki, &full) {
                    insert_str(item, "image_url", url);
                }
            }
        }
    }
    if let Some(desc) = summary.select(&desc_sel).next() {
        insert_str(item, "description", text_of(desc));
    }
}

/// Undo the thumbnail path: `…/thumb/a/ab/F.jpg/300px-F.jpg` → `…/a/ab/F.jpg`.
fn full_size_image(thumb_src: &str, width: Option<&str>) -> String {
    let trimmed = match width {
        Some(w) => thumb_src
            .rsplit_once(&format!("/{w}"))
            .map_or(thumb_src, |(head, _)| head),
        None => thumb_src,
    };
    trimmed.replacen("thumb/", "", 1)
}

fn scrape_article(summary: &Html, wiki: &str, item: &mut RawItem) {
    let p_sel = Selector::parse("p").unwrap();
    let a_sel = Selector::parse("a").unwrap();

    let Some(first) = summary.select(&p_sel).next() else {
        return;
    };
    let mut text = first.text().collect::<String>();
    for suffix in FULL_ARTICLE_SUFFIXES {
        text = text.replace(suffix, "");
    }
    insert_str(item, "summary", text.trim());

    if let Some(read_more) = first.select(&a_sel).last() {
        if let Some(href) = read_more.value().attr("href").and_then(|h| absolute_url(wiki, h)) {
            insert_str(item, "url", href);
        }
        if let Some(title) = read_more.value().attr("title") {
            insert_str(item, "title", title);
        }
    }
}

fn scrape_word(summary: &Html, wiki: &str, item: &mut RawItem) {
    let title_sel = Selector::parse("#WOTD-rss-title").unwrap();
    let desc_sel = Selector::parse("#WOTD-rss-description").unwrap();

    let anchor = summary
        .select(&title_sel)
        .next()
        .and_then(|t| t.parent())
        .and_then(ElementRef::wrap);
    if let Some(anchor) = anchor {
        if let Some(word) = anchor.value().attr("title") {
            insert_str(item, "word", word);
        }
        if let Some(href) = anchor.value().attr("href").and_then(|h| absolute_url(wiki, h)) {
            insert_str(item, "url", href);
        }
        let part_of_speech = anchor
            .parent()
            .and_then(|p| p.next_siblings().find_map(ElementRef::wrap))
            .map(text_of);
        if let Some(pos) = part_of_speech {
            insert_str(item, "part_of_speech", pos);
        }
    }
    if let Some(desc) = summary.select(&desc_sel).next() {
        insert_str(item, "definition", text_of(desc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikitrigger_shared::TriggerFields;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/feeds/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn parse(kind: TriggerKind, wiki: &str, fixture: &str) -> Vec<RawItem> {
        let fields = TriggerFields::new();
        let ctx = FetchContext {
            wiki,
            fields: &fields,
            fetch_limit: 50,
        };
        FeaturedFeedAdapter::new(kind)
            .parse(&load_fixture(fixture), &ctx)
            .expect("parse feed")
    }

    fn field<'a>(item: &'a RawItem, key: &str) -> &'a str {
        item.get(key).and_then(|v| v.as_str()).unwrap_or_default()
    }

    #[test]
    fn thumbnail_to_full_size() {
        assert_eq!(
            full_size_image(
                "//upload.wikimedia.org/wikipedia/commons/thumb/a/ab/Cat.jpg/300px-Cat.jpg",
                Some("300")
            ),
            "//upload.wikimedia.org/wikipedia/commons/a/ab/Cat.jpg"
        );
        assert_eq!(full_size_image("/x/Cat.jpg", None), "/x/Cat.jpg");
    }

    #[test]
    fn parses_picture_of_the_day() {
        let items = parse(TriggerKind::PictureOfDay, "commons.wikimedia.org", "potd.rss");
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(field(first, "published"), "Mon, 15 Jan 2024 00:00:00 GMT");
        assert_eq!(field(first, "filename"), "Red panda.jpg");
        assert_eq!(
            field(first, "image_url"),
            "https://upload.wikimedia.org/wikipedia/commons/a/ab/Red_panda.jpg"
        );
        assert_eq!(
            field(first, "filepage_url"),
            "https://commons.wikimedia.org/wiki/File:Red_panda.jpg"
        );
        assert_eq!(field(first, "description"), "A red panda resting in a tree.");
        // http guid is upgraded
        assert!(field(first, "url").starts_with("https://commons.wikimedia.org/"));
    }

    #[test]
    fn parses_article_of_the_day() {
        let items = parse(TriggerKind::ArticleOfDay, "en.wikipedia.org", "featured.rss");
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(field(first, "title"), "Coffee");
        assert_eq!(field(first, "url"), "https://en.wikipedia.org/wiki/Coffee");
        assert_eq!(
            field(first, "summary"),
            "Coffee is a beverage brewed from roasted coffee beans."
        );
    }

    #[test]
    fn parses_word_of_the_day() {
        let items = parse(TriggerKind::WordOfDay, "en.wiktionary.org", "wotd.rss");
        assert_eq!(items.len(), 1);

        let first = &items[0];
        assert_eq!(field(first, "word"), "petrichor");
        assert_eq!(field(first, "url"), "https://en.wiktionary.org/wiki/petrichor");
        assert_eq!(field(first, "part_of_speech"), "noun");
        assert_eq!(
            field(first, "definition"),
            "The distinctive scent of rain on dry earth."
        );
    }

    #[test]
    fn entry_without_pubdate_keeps_other_fields() {
        let items = parse(TriggerKind::ArticleOfDay, "en.wikipedia.org", "featured.rss");
        let second = &items[1];
        assert!(second.get("published").is_none());
        assert_eq!(field(second, "title"), "Tea");
    }
}
