pub mod fields;

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::error::{CrawlError, Result};

static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".grid-item").unwrap());

/// Metadata for one listing item. `url` is the only required field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedItem {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub award: Option<String>,
}

/// Parse a listing page into one result per item node. The document is
/// dropped before returning, so callers can hold the results across awaits.
pub fn parse_listing(html: &str, base: &Url) -> Vec<Result<ParsedItem>> {
    let doc = Html::parse_document(html);
    doc.select(&ITEM_SEL)
        .map(|node| parse_item(node, base))
        .collect()
}

/// Extract one item from its markup node. No resolvable URL, no item.
pub fn parse_item(node: ElementRef, base: &Url) -> Result<ParsedItem> {
    let url = fields::url(node, base).ok_or_else(|| {
        let title = fields::title(node).unwrap_or_else(|| "<untitled>".to_string());
        CrawlError::Parse(format!("listing item {:?} has no visit URL", title))
    })?;
    Ok(ParsedItem {
        url,
        title: fields::title(node),
        description: fields::description(node),
        image_url: fields::image_url(node, base),
        tags: fields::tags(node),
        award: fields::award(node),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(fixture: &str) -> Vec<ParsedItem> {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
        let base = Url::parse("https://www.awwwards.com/").unwrap();
        parse_listing(&html, &base)
            .into_iter()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn items_without_url_are_parse_errors() {
        let html = std::fs::read_to_string("tests/fixtures/listing.html").unwrap();
        let base = Url::parse("https://www.awwwards.com/").unwrap();
        let results = parse_listing(&html, &base);
        assert_eq!(results.len(), 4);
        match &results[2] {
            Err(CrawlError::Parse(msg)) => assert!(msg.contains("No Link Here")),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert_eq!(parse("listing").len(), 3);
    }

    #[test]
    fn full_item_fields() {
        let items = parse("listing");
        let aurora = &items[0];
        assert_eq!(aurora.url, "https://aurora.studio/");
        assert_eq!(aurora.title.as_deref(), Some("Aurora Studio"));
        assert_eq!(
            aurora.description.as_deref(),
            Some("Portfolio of a motion design studio.")
        );
        assert_eq!(
            aurora.image_url.as_deref(),
            Some("https://www.awwwards.com/media/cache/thumb_417_299/submissions/2024/05/aurora.png")
        );
        assert_eq!(aurora.tags, vec!["Animation", "Colorful", "Portfolio"]);
        assert_eq!(aurora.award.as_deref(), Some("Site of the Day"));
    }

    #[test]
    fn sparse_item_keeps_only_what_exists() {
        let items = parse("listing");
        let northwind = &items[1];
        assert_eq!(northwind.url, "https://www.awwwards.com/sites/northwind");
        assert_eq!(
            northwind.image_url.as_deref(),
            Some("https://assets.awwwards.com/submissions/2024/05/northwind.jpg?w=400")
        );
        assert!(northwind.description.is_none());
        assert!(northwind.tags.is_empty());
        assert!(northwind.award.is_none());

        let bare = &items[2];
        assert_eq!(bare.url, "https://bare.example/");
        assert!(bare.title.is_none());
        assert!(bare.image_url.is_none());
    }

    #[test]
    fn page_without_grid_items_is_empty() {
        assert!(parse("empty_listing").is_empty());
    }
}
