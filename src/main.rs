mod catalog;
mod config;
mod crawler;
mod error;
mod http;
mod images;
mod palette;
mod parser;
mod query;
mod scheduler;
mod server;
#[cfg(test)]
mod test_support;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::catalog::{CatalogEntry, CatalogStore};
use crate::config::Settings;
use crate::crawler::Crawler;
use crate::palette::color::{accessible_text_color, contrast_ratio, Rgb};
use crate::palette::PaletteOptions;
use crate::query::SearchParams;

#[derive(Parser)]
#[command(name = "showcase_palettes", about = "Web design showcase crawler and color palette catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages into the catalog
    Crawl {
        /// Listing pages to crawl (default: SHOWCASE_SCRAPE_PAGES)
        #[arg(short = 'n', long)]
        pages: Option<u32>,
        /// Listing section, e.g. "websites" or "websites/nominees"
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Search the catalog by text, tag and color
    Search {
        /// Substring of title or any tag
        #[arg(short, long)]
        q: Option<String>,
        /// Exact tag (case-insensitive)
        #[arg(short, long)]
        tag: Option<String>,
        /// Hex color, matched within a fixed RGB distance
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: String,
        #[arg(long, default_value = "20")]
        per_page: String,
    },
    /// Show one catalog entry as JSON
    Show { id: String },
    /// List stored palettes
    Palettes {
        #[arg(short, long, default_value = "1")]
        page: String,
        #[arg(long, default_value = "20")]
        per_page: String,
    },
    /// Catalog statistics
    Stats,
    /// Extract a palette from a local image file
    Palette {
        path: PathBuf,
        /// Number of colors (default: SHOWCASE_NUM_COLORS)
        #[arg(short = 'k', long)]
        colors: Option<usize>,
    },
    /// Run the HTTP API and the daily crawl schedule
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    let store = Arc::new(CatalogStore::new(settings.catalog_path()));

    let result = match cli.command {
        Commands::Crawl { pages, section } => {
            let pages = pages.unwrap_or(settings.scrape_pages);
            let section = section.unwrap_or_else(|| settings.scrape_section.clone());
            let crawler = Crawler::new(&settings, Arc::clone(&store))?.with_progress(true);
            println!("Crawling {} page(s) of {:?}...", pages, section);
            let s = crawler.run(pages, &section).await?;
            println!(
                "Pages: {} ({} failed) | items: {} | admitted: {} | duplicates: {} | errors: {}",
                s.pages_attempted, s.pages_failed, s.items_found, s.admitted, s.duplicates, s.item_errors
            );
            println!("Catalog now holds {} entries ({})", s.catalog_size, store.path().display());
            Ok(())
        }
        Commands::Search { q, tag, color, page, per_page } => {
            let params = SearchParams {
                q,
                tag,
                color,
                page: Some(page),
                per_page: Some(per_page),
            };
            let entries = store.load()?;
            let results = query::search(&entries, &params);
            if results.items.is_empty() {
                println!("No matching sites.");
                return Ok(());
            }
            print_entries(&results.items, (results.page - 1) * results.per_page);
            println!(
                "\n{} matches | page {}/{}",
                results.total, results.page, results.total_pages
            );
            Ok(())
        }
        Commands::Show { id } => {
            let entries = store.load()?;
            match query::find(&entries, &id) {
                Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
                None => println!("Website not found: {}", id),
            }
            Ok(())
        }
        Commands::Palettes { page, per_page } => {
            let params = SearchParams {
                page: Some(page),
                per_page: Some(per_page),
                ..SearchParams::default()
            };
            let entries = store.load()?;
            let results = query::palettes(&entries, &params);
            for p in &results.items {
                println!("{:<40} {}", truncate(&p.url, 40), p.colors.join(" "));
            }
            println!(
                "\n{} palettes | page {}/{}",
                results.total, results.page, results.total_pages
            );
            Ok(())
        }
        Commands::Stats => {
            let entries = store.load()?;
            print_stats(&entries);
            Ok(())
        }
        Commands::Palette { path, colors } => {
            let opts = PaletteOptions {
                colors: colors.unwrap_or(settings.num_colors),
                ..PaletteOptions::default()
            };
            let palette = palette::extract_palette(&path, &opts);
            if palette.is_empty() {
                println!("No palette for {}", path.display());
                return Ok(());
            }
            println!("{:>3} | {:<8} | {:<8} | {:>8}", "#", "Color", "Text", "Contrast");
            println!("{}", "-".repeat(38));
            for (i, hex) in palette.iter().enumerate() {
                let Some(bg) = Rgb::from_hex(hex) else { continue };
                let text = accessible_text_color(bg);
                println!(
                    "{:>3} | {:<8} | {:<8} | {:>7.2}:1",
                    i + 1,
                    hex,
                    text.to_hex(),
                    contrast_ratio(bg, text)
                );
            }
            Ok(())
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            server::serve(&settings).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_entries(entries: &[CatalogEntry], offset: usize) {
    println!(
        "{:>3} | {:<28} | {:<32} | {:<24} | {}",
        "#", "Title", "URL", "Tags", "Palette"
    );
    println!("{}", "-".repeat(130));
    for (i, e) in entries.iter().enumerate() {
        println!(
            "{:>3} | {:<28} | {:<32} | {:<24} | {}",
            offset + i + 1,
            truncate(e.title.as_deref().unwrap_or("-"), 28),
            truncate(&e.url, 32),
            truncate(&e.tags.join(", "), 24),
            e.palette.join(" ")
        );
    }
}

fn print_stats(entries: &[CatalogEntry]) {
    let with_palette = entries.iter().filter(|e| !e.palette.is_empty()).count();
    let with_image = entries.iter().filter(|e| e.local_image.is_some()).count();
    let awarded = entries.iter().filter(|e| e.award.is_some()).count();
    println!("Entries:      {}", entries.len());
    println!("With image:   {}", with_image);
    println!("With palette: {}", with_palette);
    println!("Awarded:      {}", awarded);
    if let Some(latest) = entries.iter().map(|e| e.scraped_at).max() {
        println!("Last crawl:   {}", latest.format("%Y-%m-%d %H:%M UTC"));
    }

    let tags = top_tags(entries, 10);
    if !tags.is_empty() {
        println!("\n--- Top tags ---");
        for (tag, n) in tags {
            println!("  {:<24} {}", truncate(&tag, 24), n);
        }
    }
}

/// Most frequent tags, ties broken alphabetically.
fn top_tags(entries: &[CatalogEntry], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in entries.iter().flat_map(|e| e.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(t, n)| (t.to_string(), n))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(limit);
    sorted
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_entry;

    #[test]
    fn truncate_keeps_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 10), "a very ...");
        assert_eq!(truncate("a very long title", 10).chars().count(), 10);
    }

    #[test]
    fn durations() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn top_tags_by_count_then_name() {
        let mut a = sample_entry("https://a.example/");
        a.tags = vec!["Colorful".into(), "Portfolio".into()];
        let mut b = sample_entry("https://b.example/");
        b.tags = vec!["Colorful".into(), "Animation".into()];
        let tags = top_tags(&[a, b], 2);
        assert_eq!(
            tags,
            vec![("Colorful".to_string(), 2), ("Animation".to_string(), 1)]
        );
    }
}
