//! One extraction function per listing field. Each returns `None` (or an empty
//! list) when the field is absent or blank.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Selector};

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".title").unwrap());
static VISIT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.js-visit-item").unwrap());
static IMAGE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("figure img").unwrap());
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".description").unwrap());
static TAG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tags a").unwrap());
static AWARD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".box-award").unwrap());

pub fn title(node: ElementRef) -> Option<String> {
    first_text(node, &TITLE_SEL)
}

/// Visit link, resolved against `base`. Only http(s) targets count.
pub fn url(node: ElementRef, base: &Url) -> Option<String> {
    let href = node.select(&VISIT_SEL).next()?.value().attr("href")?;
    resolve(base, href)
}

/// Lazy-load `data-src` wins over the eager `src`.
pub fn image_url(node: ElementRef, base: &Url) -> Option<String> {
    let img = node.select(&IMAGE_SEL).next()?;
    let el = img.value();
    let src = el
        .attr("data-src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| el.attr("src"))?;
    resolve(base, src)
}

pub fn description(node: ElementRef) -> Option<String> {
    first_text(node, &DESCRIPTION_SEL)
}

pub fn tags(node: ElementRef) -> Vec<String> {
    node.select(&TAG_SEL)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn award(node: ElementRef) -> Option<String> {
    first_text(node, &AWARD_SEL)
}

fn first_text(node: ElementRef, sel: &Selector) -> Option<String> {
    node.select(sel)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Element text with whitespace runs collapsed.
fn text_of(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
