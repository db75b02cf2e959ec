use serde::Serialize;

use crate::catalog::CatalogEntry;
use crate::palette::color::{colors_match, Rgb};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PER_PAGE: usize = 20;
/// Max Euclidean RGB distance for a palette color to match a query color.
pub const COLOR_THRESHOLD: f64 = 30.0;

/// Raw request parameters. Everything stays a string so malformed values can
/// fall back to defaults instead of failing the request.
#[derive(Debug, Default, Clone)]
pub struct SearchParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub color: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl SearchParams {
    /// Build from decoded query pairs. The first occurrence of a key wins;
    /// unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = SearchParams::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "q" => &mut params.q,
                "tag" => &mut params.tag,
                "color" => &mut params.color,
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    pub fn page(&self) -> usize {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn per_page(&self) -> usize {
        positive(self.per_page.as_deref()).unwrap_or(DEFAULT_PER_PAGE)
    }

    fn filters(&self) -> Filters {
        let lowered = |s: &Option<String>| {
            s.as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        };
        Filters {
            text: lowered(&self.q),
            tag: lowered(&self.tag),
            color: self.color.as_deref().and_then(Rgb::from_hex),
        }
    }
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

/// Lowercased text filters and the parsed query color. Absent filters match
/// everything.
#[derive(Debug, Default)]
struct Filters {
    text: Option<String>,
    tag: Option<String>,
    color: Option<Rgb>,
}

impl Filters {
    fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(q) = &self.text {
            let in_title = entry
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(q.as_str()));
            let in_tags = entry.tags.iter().any(|t| t.to_lowercase().contains(q.as_str()));
            if !in_title && !in_tags {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !entry.tags.iter().any(|t| t.to_lowercase() == *tag) {
                return false;
            }
        }
        if let Some(color) = self.color {
            if !palette_matches(&entry.palette, color, COLOR_THRESHOLD) {
                return false;
            }
        }
        true
    }
}

/// True if any parseable palette color lies within `threshold` of `query`.
pub fn palette_matches(palette: &[String], query: Rgb, threshold: f64) -> bool {
    palette
        .iter()
        .filter_map(|hex| Rgb::from_hex(hex))
        .any(|c| colors_match(query, c, threshold))
}

/// One page of results plus the totals needed to page through the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Slice `items` for 1-based `page`. Out-of-range pages are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    Page {
        items: items[start..end].to_vec(),
        total,
        page,
        per_page,
        total_pages: total.div_ceil(per_page),
    }
}

pub fn list(entries: &[CatalogEntry], params: &SearchParams) -> Page<CatalogEntry> {
    paginate(entries, params.page(), params.per_page())
}

/// Apply the text, tag and color filters (all optional, AND-ed), then paginate.
pub fn search(entries: &[CatalogEntry], params: &SearchParams) -> Page<CatalogEntry> {
    let filters = params.filters();
    let hits: Vec<CatalogEntry> = entries
        .iter()
        .filter(|e| filters.matches(e))
        .cloned()
        .collect();
    paginate(&hits, params.page(), params.per_page())
}

pub fn find<'a>(entries: &'a [CatalogEntry], id: &str) -> Option<&'a CatalogEntry> {
    entries.iter().find(|e| e.id == id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteSummary {
    pub id: String,
    pub url: String,
    pub colors: Vec<String>,
}

/// Palettes of entries that have one, paginated.
pub fn palettes(entries: &[CatalogEntry], params: &SearchParams) -> Page<PaletteSummary> {
    let all: Vec<PaletteSummary> = entries
        .iter()
        .filter(|e| !e.palette.is_empty())
        .map(|e| PaletteSummary {
            id: e.id.clone(),
            url: e.url.clone(),
            colors: e.palette.clone(),
        })
        .collect();
    paginate(&all, params.page(), params.per_page())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_entry;

    fn entry(url: &str, title: &str, tags: &[&str], palette: &[&str]) -> CatalogEntry {
        let mut e = sample_entry(url);
        e.title = Some(title.to_string());
        e.tags = tags.iter().map(|t| t.to_string()).collect();
        e.palette = palette.iter().map(|c| c.to_string()).collect();
        e
    }

    fn catalog() -> Vec<CatalogEntry> {
        vec![
            entry("https://a.example/", "Red Rocket", &["Space", "Colorful"], &["#fa0505", "#101010"]),
            entry("https://b.example/", "Green Field", &["Nature"], &["#00ff00"]),
            entry("https://c.example/", "Blue Note", &["Music", "Jazz Club"], &["#1020f0"]),
            entry("https://d.example/", "Untagged", &[], &[]),
        ]
    }

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        SearchParams::from_pairs(pairs.iter().copied())
    }

    fn urls(page: &Page<CatalogEntry>) -> Vec<&str> {
        page.items.iter().map(|e| e.url.as_str()).collect()
    }

    #[test]
    fn pagination_of_45_by_20() {
        let items: Vec<u32> = (0..45).collect();
        let counts: Vec<usize> = (1..=4).map(|k| paginate(&items, k, 20).items.len()).collect();
        assert_eq!(counts, vec![20, 20, 5, 0]);
        let p3 = paginate(&items, 3, 20);
        assert_eq!(p3.total_pages, 3);
        assert_eq!(p3.items, (40..45).collect::<Vec<_>>());
    }

    #[test]
    fn pagination_count_formula() {
        for total in [0usize, 1, 19, 20, 21, 100] {
            let items: Vec<usize> = (0..total).collect();
            for per_page in [1usize, 7, 20] {
                for page in 1..=6usize {
                    let got = paginate(&items, page, per_page);
                    let expected = total.saturating_sub((page - 1) * per_page).min(per_page);
                    assert_eq!(got.items.len(), expected);
                    assert_eq!(got.total_pages, (total + per_page - 1) / per_page);
                }
            }
        }
    }

    #[test]
    fn far_out_of_range_page_is_empty() {
        let items = [1, 2, 3];
        let p = paginate(&items, usize::MAX, usize::MAX);
        assert!(p.items.is_empty());
        assert_eq!(p.total, 3);
    }

    #[test]
    fn malformed_paging_falls_back_to_defaults() {
        for (page, per_page) in [("abc", "-5"), ("0", "0"), ("", "2.5")] {
            let p = params(&[("page", page), ("per_page", per_page)]);
            assert_eq!((p.page(), p.per_page()), (DEFAULT_PAGE, DEFAULT_PER_PAGE));
        }
        let p = params(&[("page", " 2 "), ("per_page", "5")]);
        assert_eq!((p.page(), p.per_page()), (2, 5));
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let p = params(&[("page", "1"), ("page", "2"), ("per_page", "x"), ("per_page", "5"), ("sort", "asc")]);
        assert_eq!(p.page.as_deref(), Some("1"));
        assert_eq!((p.page(), p.per_page()), (1, DEFAULT_PER_PAGE));
    }

    #[test]
    fn text_matches_title_or_tag_substring() {
        let c = catalog();
        assert_eq!(urls(&search(&c, &params(&[("q", "ROCK")]))), vec!["https://a.example/"]);
        assert_eq!(urls(&search(&c, &params(&[("q", "jazz")]))), vec!["https://c.example/"]);
        assert!(search(&c, &params(&[("q", "zzz")])).items.is_empty());
    }

    #[test]
    fn tag_filter_is_exact_and_case_insensitive() {
        let c = catalog();
        assert_eq!(urls(&search(&c, &params(&[("tag", "colorful")]))), vec!["https://a.example/"]);
        assert!(search(&c, &params(&[("tag", "jazz")])).items.is_empty());
        assert_eq!(urls(&search(&c, &params(&[("tag", "Jazz Club")]))), vec!["https://c.example/"]);
    }

    #[test]
    fn color_filter_uses_threshold() {
        let c = catalog();
        assert_eq!(urls(&search(&c, &params(&[("color", "#FF0000")]))), vec!["https://a.example/"]);
        assert_eq!(urls(&search(&c, &params(&[("color", "00ff00")]))), vec!["https://b.example/"]);
        assert!(search(&c, &params(&[("color", "#808080")])).items.is_empty());
    }

    #[test]
    fn unparseable_color_is_ignored() {
        let c = catalog();
        assert_eq!(search(&c, &params(&[("color", "red")])).total, 4);
    }

    #[test]
    fn filters_compose_with_and() {
        let c = catalog();
        let hit = search(&c, &params(&[("q", "r"), ("color", "#ff0000")]));
        assert_eq!(urls(&hit), vec!["https://a.example/"]);
        let miss = search(&c, &params(&[("tag", "nature"), ("color", "#ff0000")]));
        assert_eq!(miss.total, 0);
    }

    #[test]
    fn search_paginates_filtered_results() {
        let c = catalog();
        let p = search(&c, &params(&[("q", "e"), ("per_page", "2"), ("page", "2")]));
        assert_eq!(p.total, 4);
        assert_eq!(p.total_pages, 2);
        assert_eq!(urls(&p), vec!["https://c.example/", "https://d.example/"]);
    }

    #[test]
    fn palettes_skip_entries_without_colors() {
        let c = catalog();
        let p = palettes(&c, &SearchParams::default());
        assert_eq!(p.total, 3);
        assert_eq!(p.items[0].colors, vec!["#fa0505", "#101010"]);
    }

    #[test]
    fn find_by_id() {
        let c = catalog();
        let id = c[2].id.clone();
        assert_eq!(find(&c, &id).map(|e| e.url.as_str()), Some("https://c.example/"));
        assert!(find(&c, "missing").is_none());
    }

    #[test]
    fn empty_catalog_gives_empty_page() {
        let p = search(&[], &params(&[("q", "x")]));
        assert_eq!((p.total, p.total_pages, p.items.len()), (0, 0, 0));
    }
}
