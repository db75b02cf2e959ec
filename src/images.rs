use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::error::{CrawlError, Result};
use crate::http;

const DEFAULT_EXTENSION: &str = ".jpg";

/// Downloads entry images into a local directory, one file per entry id.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    dir: PathBuf,
    delay_ms: RangeInclusive<u64>,
}

impl ImageFetcher {
    pub fn new(client: Client, dir: impl Into<PathBuf>, delay_ms: RangeInclusive<u64>) -> Self {
        Self {
            client,
            dir: dir.into(),
            delay_ms,
        }
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Local filename for `image_url`, downloading only if the file is not
    /// already there. Failures are logged and give `None`.
    pub async fn acquire(&self, image_url: &str, id: &str) -> Option<String> {
        let filename = local_filename(id, image_url);
        let path = self.path_for(&filename);
        if path.exists() {
            return Some(filename);
        }

        match self.download(image_url, &path).await {
            Ok(()) => {
                info!(file = %filename, "Downloaded image");
                Some(filename)
            }
            Err(e) => {
                warn!(url = image_url, error = %e, "Image download failed");
                None
            }
        }
    }

    async fn download(&self, url: &str, path: &Path) -> Result<()> {
        http::polite_pause(&self.delay_ms).await;
        let bytes = http::fetch_bytes(&self.client, url).await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || reencode(&bytes, &path))
            .await
            .map_err(|e| CrawlError::Storage(format!("image task failed: {}", e)))?
    }
}

/// `<id><ext>`, the extension taken from the URL path (query ignored).
pub fn local_filename(id: &str, image_url: &str) -> String {
    let ext = extension(image_url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{}{}", id, ext)
}

fn extension(image_url: &str) -> Option<String> {
    let path = match Url::parse(image_url) {
        Ok(u) => u.path().to_string(),
        Err(_) => image_url.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| format!(".{}", ext.to_ascii_lowercase()))
}

/// Decode, then write in the format the target extension names. The file only
/// appears under its final name once fully written.
fn reencode(bytes: &[u8], path: &Path) -> Result<()> {
    let img = image::load_from_memory(bytes)?;
    let format = ImageFormat::from_path(path)?;
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = img.save_with_format(&tmp, format) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::routing::get;
    use axum::Router;

    use super::*;
    use crate::config::Settings;
    use crate::test_support::{png_bytes, serve};

    fn fetcher(dir: &Path) -> ImageFetcher {
        let client = http::build_client(&Settings::for_tests(dir)).unwrap();
        ImageFetcher::new(client, dir.join("images"), 0..=0)
    }

    #[test]
    fn filename_uses_url_extension() {
        assert_eq!(local_filename("abc", "https://x.example/a/shot.PNG"), "abc.png");
        assert_eq!(local_filename("abc", "https://x.example/a/shot.webp?w=400#f"), "abc.webp");
        assert_eq!(local_filename("abc", "/media/shot.gif?x=1"), "abc.gif");
    }

    #[test]
    fn filename_falls_back_to_default_extension() {
        assert_eq!(local_filename("abc", "https://x.example/image"), "abc.jpg");
        assert_eq!(local_filename("abc", "https://x.example/dir.v2/image"), "abc.jpg");
        assert_eq!(local_filename("abc", "https://x.example/.hidden"), "abc.jpg");
    }

    #[tokio::test]
    async fn existing_file_is_returned_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(f.path_for("id1.png"), b"already here").unwrap();

        // Nothing listens on port 9; a fetch attempt would fail.
        let got = f.acquire("http://127.0.0.1:9/shot.png", "id1").await;
        assert_eq!(got.as_deref(), Some("id1.png"));
        assert_eq!(std::fs::read(f.path_for("id1.png")).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn downloads_and_reencodes_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/shot.jpg",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    png_bytes([200, 20, 20], [20, 20, 200])
                }
            }),
        );
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());
        let url = format!("{}shot.jpg", base);

        assert_eq!(f.acquire(&url, "e1").await.as_deref(), Some("e1.jpg"));
        assert_eq!(f.acquire(&url, "e1").await.as_deref(), Some("e1.jpg"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let saved = image::open(f.path_for("e1.jpg")).unwrap();
        assert_eq!((saved.width(), saved.height()), (60, 40));
    }

    #[tokio::test]
    async fn failures_give_no_image_and_leave_no_file() {
        let router = Router::new().route("/junk.png", get(|| async { "definitely not an image" }));
        let base = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let f = fetcher(dir.path());

        assert!(f.acquire(&format!("{}junk.png", base), "bad").await.is_none());
        assert!(!f.path_for("bad.png").exists());
        assert!(f.acquire(&format!("{}missing.png", base), "gone").await.is_none());
        assert!(f.acquire("http://127.0.0.1:9/x.png", "down").await.is_none());
    }
}
