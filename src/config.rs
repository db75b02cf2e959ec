use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_PREFIX: &str = "SHOWCASE";
const CATALOG_FILE: &str = "websites.json";
const IMAGES_DIR: &str = "images";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Runtime settings, read from `SHOWCASE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Shared secret for the crawl trigger. Unset disables the trigger.
    pub api_key: Option<String>,
    pub base_url: String,
    pub scrape_pages: u32,
    pub scrape_section: String,
    pub num_colors: usize,
    pub request_timeout_secs: u64,
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    pub image_delay_min_ms: u64,
    pub image_delay_max_ms: u64,
    pub flush_every: usize,
    pub user_agent: String,
    pub port: u16,
    pub scheduled_scraping: bool,
    pub initial_scrape: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_key: None,
            base_url: "https://www.awwwards.com/".to_string(),
            scrape_pages: 5,
            scrape_section: "websites".to_string(),
            num_colors: 5,
            request_timeout_secs: 30,
            page_delay_min_ms: 1000,
            page_delay_max_ms: 3000,
            image_delay_min_ms: 500,
            image_delay_max_ms: 1500,
            flush_every: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            port: 5000,
            scheduled_scraping: true,
            initial_scrape: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read environment settings")?
            .try_deserialize()
            .context("Invalid SHOWCASE_* settings")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGES_DIR)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_delay(&self) -> RangeInclusive<u64> {
        ordered(self.page_delay_min_ms, self.page_delay_max_ms)
    }

    pub fn image_delay(&self) -> RangeInclusive<u64> {
        ordered(self.image_delay_min_ms, self.image_delay_max_ms)
    }

    /// Settings for tests: no politeness delays, everything under `dir`.
    #[cfg(test)]
    pub fn for_tests(dir: &std::path::Path) -> Self {
        Self {
            data_dir: dir.to_path_buf(),
            page_delay_min_ms: 0,
            page_delay_max_ms: 0,
            image_delay_min_ms: 0,
            image_delay_max_ms: 0,
            request_timeout_secs: 2,
            ..Self::default()
        }
    }
}

fn ordered(a: u64, b: u64) -> RangeInclusive<u64> {
    a.min(b)..=a.max(b)
}
