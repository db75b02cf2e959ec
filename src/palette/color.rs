use std::fmt;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parse `rrggbb` or `#rrggbb`, any case.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    pub fn to_f64(self) -> [f64; 3] {
        [self.0 as f64, self.1 as f64, self.2 as f64]
    }

    /// Round and clamp a floating-point centroid.
    pub fn from_f64(c: [f64; 3]) -> Self {
        let q = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Rgb(q(c[0]), q(c[1]), q(c[2]))
    }

    /// (hue in degrees, saturation, value), saturation and value in 0..=1.
    pub fn to_hsv(self) -> (f64, f64, f64) {
        let [r, g, b] = self.to_f64().map(|c| c / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max == 0.0 { 0.0 } else { delta / max };
        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        (h, s, max)
    }

    /// WCAG 2.0 relative luminance.
    pub fn luminance(self) -> f64 {
        let lin = |c: f64| {
            let c = c / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        let [r, g, b] = self.to_f64();
        0.2126 * lin(r) + 0.7152 * lin(g) + 0.0722 * lin(b)
    }

    /// Perceived brightness on a 0..=255 scale.
    pub fn brightness(self) -> f64 {
        let [r, g, b] = self.to_f64();
        (r * 299.0 + g * 587.0 + b * 114.0) / 1000.0
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn squared_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Euclidean distance in RGB space.
pub fn distance(a: Rgb, b: Rgb) -> f64 {
    squared_distance(a.to_f64(), b.to_f64()).sqrt()
}

pub fn colors_match(a: Rgb, b: Rgb, threshold: f64) -> bool {
    distance(a, b) <= threshold
}

/// WCAG contrast ratio, always >= 1.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (l1, l2) = (a.luminance(), b.luminance());
    let (hi, lo) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (hi + 0.05) / (lo + 0.05)
}

/// White text on dark backgrounds, black on light ones.
pub fn accessible_text_color(background: Rgb) -> Rgb {
    if background.brightness() < 128.0 {
        Rgb(255, 255, 255)
    } else {
        Rgb(0, 0, 0)
    }
}
