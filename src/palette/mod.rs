pub mod appeal;
pub mod color;
pub mod kmeans;

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{info, warn};

pub use appeal::rank_by_appeal;
pub use color::Rgb;
use kmeans::KMeans;

/// Below this many informative samples the unfiltered set is clustered instead.
const MIN_FILTERED_SAMPLES: usize = 100;
const NEAR_WHITE: u8 = 240;
const NEAR_BLACK: u8 = 15;

#[derive(Debug, Clone, Copy)]
pub struct PaletteOptions {
    pub colors: usize,
    /// Images are resized to this width (aspect preserved) before sampling.
    pub working_width: u32,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            colors: 5,
            working_width: 200,
        }
    }
}

/// Palette for the image at `path` as hex strings, most appealing first.
/// Missing or undecodable files give an empty palette.
pub fn extract_palette(path: &Path, opts: &PaletteOptions) -> Vec<String> {
    if !path.exists() {
        warn!(path = %path.display(), "Image file not found");
        return Vec::new();
    }
    let img = match image::open(path) {
        Ok(img) => img,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not decode image");
            return Vec::new();
        }
    };

    let palette: Vec<String> = rank_by_appeal(&dominant_colors(&img, opts))
        .into_iter()
        .map(Rgb::to_hex)
        .collect();
    info!(path = %path.display(), colors = palette.len(), "Extracted palette");
    palette
}

/// Up to `opts.colors` cluster centroids, in cluster order.
pub fn dominant_colors(img: &DynamicImage, opts: &PaletteOptions) -> Vec<Rgb> {
    let samples = samples(img, opts.working_width);
    KMeans::with_k(opts.colors).fit(&informative_or_all(samples))
}

fn samples(img: &DynamicImage, working_width: u32) -> Vec<Rgb> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let width = working_width.max(1);
    let height = ((h as u64 * width as u64) / w as u64).max(1) as u32;
    img.resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8()
        .pixels()
        .map(|p| Rgb(p[0], p[1], p[2]))
        .collect()
}

fn is_informative(c: &Rgb) -> bool {
    let near_white = c.0 > NEAR_WHITE && c.1 > NEAR_WHITE && c.2 > NEAR_WHITE;
    let near_black = c.0 < NEAR_BLACK && c.1 < NEAR_BLACK && c.2 < NEAR_BLACK;
    !near_white && !near_black
}

/// Drop near-white and near-black samples unless that leaves too few.
fn informative_or_all(samples: Vec<Rgb>) -> Vec<Rgb> {
    let filtered: Vec<Rgb> = samples.iter().copied().filter(is_informative).collect();
    if filtered.len() < MIN_FILTERED_SAMPLES {
        samples
    } else {
        filtered
    }
}
