use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Url};
use tracing::{debug, error, info, warn};

use crate::catalog::{Admission, Catalog, CatalogEntry, CatalogStore};
use crate::config::Settings;
use crate::error::{CrawlError, Result};
use crate::http;
use crate::images::ImageFetcher;
use crate::palette::{self, PaletteOptions};
use crate::parser::{self, ParsedItem};

/// Counters for one crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_attempted: usize,
    pub pages_failed: usize,
    /// Listing item nodes seen, including ones that failed to parse.
    pub items_found: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub item_errors: usize,
    pub catalog_size: usize,
}

/// Drives listing pages through parse → image → palette → admission.
///
/// A run is sequential. Page and item failures are logged and skipped; only
/// catalog storage errors end a run early.
#[derive(Debug)]
pub struct Crawler {
    base: Url,
    client: Client,
    images: ImageFetcher,
    store: Arc<CatalogStore>,
    palette: PaletteOptions,
    page_delay_ms: std::ops::RangeInclusive<u64>,
    flush_every: usize,
    show_progress: bool,
}

impl Crawler {
    pub fn new(settings: &Settings, store: Arc<CatalogStore>) -> anyhow::Result<Self> {
        let mut base = Url::parse(&settings.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = http::build_client(settings)?;
        let images = ImageFetcher::new(client.clone(), settings.images_dir(), settings.image_delay());

        Ok(Self {
            base,
            client,
            images,
            store,
            palette: PaletteOptions {
                colors: settings.num_colors,
                ..PaletteOptions::default()
            },
            page_delay_ms: settings.page_delay(),
            flush_every: settings.flush_every.max(1),
            show_progress: false,
        })
    }

    /// Draw a progress bar over pages (interactive CLI runs).
    pub fn with_progress(mut self, on: bool) -> Self {
        self.show_progress = on;
        self
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Page 1 is the section root, later pages are `<section>/page-<n>`.
    pub fn page_url(&self, section: &str, page: u32) -> Result<Url> {
        let section = section.trim_matches('/');
        let rel = if page <= 1 {
            section.to_string()
        } else {
            format!("{}/page-{}", section, page)
        };
        self.base
            .join(&rel)
            .map_err(|e| CrawlError::Parse(format!("bad page address {:?}: {}", rel, e)))
    }

    /// Crawl pages `1..=pages` of `section` and return the run's counters.
    pub async fn run(&self, pages: u32, section: &str) -> Result<CrawlSummary> {
        let t0 = Instant::now();
        let mut catalog = Catalog::from_entries(self.store.load()?);
        info!(existing = catalog.len(), pages, section, "Starting crawl");

        let pb = self.progress_bar(pages);
        let mut summary = CrawlSummary::default();
        let mut unflushed = 0usize;

        for page in 1..=pages {
            summary.pages_attempted += 1;
            pb.set_message(format!("page {}", page));

            let results = match self.fetch_listing(section, page).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(page, error = %e, "Skipping page");
                    summary.pages_failed += 1;
                    pb.inc(1);
                    continue;
                }
            };
            if results.is_empty() {
                warn!(page, "No listing items found");
                pb.inc(1);
                continue;
            }
            info!(page, items = results.len(), "Found listing items");
            summary.items_found += results.len();

            for result in results {
                let item = match result {
                    Ok(item) => item,
                    Err(e) => {
                        summary.item_errors += 1;
                        warn!(page, error = %e, "Discarding listing item");
                        continue;
                    }
                };
                if catalog.contains_url(&item.url) {
                    debug!(url = %item.url, "Already in catalog");
                    summary.duplicates += 1;
                    continue;
                }

                let entry = self.enrich(item).await;
                match catalog.admit(entry) {
                    Admission::Admitted => {
                        summary.admitted += 1;
                        unflushed += 1;
                    }
                    Admission::Duplicate => summary.duplicates += 1,
                }

                if unflushed >= self.flush_every {
                    self.store.save(catalog.entries())?;
                    unflushed = 0;
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        self.store.save(catalog.entries())?;
        summary.catalog_size = catalog.len();
        info!(
            admitted = summary.admitted,
            duplicates = summary.duplicates,
            item_errors = summary.item_errors,
            pages_failed = summary.pages_failed,
            total = summary.catalog_size,
            elapsed_s = t0.elapsed().as_secs_f64(),
            "Crawl complete"
        );
        Ok(summary)
    }

    async fn fetch_listing(&self, section: &str, page: u32) -> Result<Vec<Result<ParsedItem>>> {
        let url = self.page_url(section, page)?;
        http::polite_pause(&self.page_delay_ms).await;
        info!(page, url = %url, "Fetching listing page");
        let html = http::fetch_text(&self.client, url.as_str()).await?;
        Ok(parser::parse_listing(&html, &self.base))
    }

    /// Build an entry and attach image + palette where possible. Enrichment
    /// failures leave the fields empty; the entry is still returned.
    async fn enrich(&self, item: ParsedItem) -> CatalogEntry {
        let mut entry = CatalogEntry::from_item(item);
        let Some(image_url) = entry.image_url.clone() else {
            return entry;
        };
        let Some(filename) = self.images.acquire(&image_url, &entry.id).await else {
            return entry;
        };

        let path = self.images.path_for(&filename);
        let opts = self.palette;
        entry.local_image = Some(filename);
        match tokio::task::spawn_blocking(move || palette::extract_palette(&path, &opts)).await {
            Ok(colors) => entry.palette = colors,
            Err(e) => error!(url = %entry.url, error = %e, "Palette extraction panicked"),
        }
        entry
    }

    fn progress_bar(&self, pages: u32) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(pages as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

/// Start a run on a background task and return immediately. The caller gets
/// no completion signal; the outcome is only logged.
pub fn spawn_run(crawler: Arc<Crawler>, pages: u32, section: String) {
    tokio::spawn(async move {
        match crawler.run(pages, &section).await {
            Ok(summary) => info!(
                admitted = summary.admitted,
                total = summary.catalog_size,
                section = %section,
                "Background crawl finished"
            ),
            Err(e) => error!(error = %e, section = %section, "Background crawl aborted"),
        }
    });
}
