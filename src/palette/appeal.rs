use std::cmp::Ordering;

use super::color::Rgb;

const SATURATION_WEIGHT: f64 = 0.7;
const VALUE_WEIGHT: f64 = 0.3;

/// Saturated, bright colors score highest.
pub fn appeal_score(color: Rgb) -> f64 {
    let (_, s, v) = color.to_hsv();
    SATURATION_WEIGHT * s + VALUE_WEIGHT * v
}

/// Most appealing first. Equal scores keep their input order.
pub fn rank_by_appeal(colors: &[Rgb]) -> Vec<Rgb> {
    let mut scored: Vec<(f64, Rgb)> = colors.iter().map(|&c| (appeal_score(c), c)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centroids() -> Vec<Rgb> {
        vec![
            Rgb(240, 240, 235), // pale, bright
            Rgb(230, 40, 60),   // saturated red
            Rgb(20, 20, 30),    // near black
            Rgb(90, 140, 200),  // mid blue
            Rgb(128, 128, 128), // grey
        ]
    }

    #[test]
    fn saturated_colors_lead() {
        let ranked = rank_by_appeal(&centroids());
        assert_eq!(ranked[0], Rgb(230, 40, 60));
        assert_eq!(ranked[1], Rgb(90, 140, 200));
        assert_eq!(ranked[2], Rgb(240, 240, 235));
        assert_eq!(ranked.last(), Some(&Rgb(128, 128, 128)));
    }

    #[test]
    fn order_is_invariant_to_input_permutation() {
        let expected = rank_by_appeal(&centroids());
        let mut input = centroids();
        for _ in 0..input.len() {
            input.rotate_left(1);
            assert_eq!(rank_by_appeal(&input), expected);
        }
        input.reverse();
        assert_eq!(rank_by_appeal(&input), expected);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_by_appeal(&[Rgb(255, 0, 0), Rgb(0, 0, 255), Rgb(0, 255, 0)]);
        assert_eq!(ranked, vec![Rgb(255, 0, 0), Rgb(0, 0, 255), Rgb(0, 255, 0)]);
    }

    #[test]
    fn score_bounds() {
        assert!((appeal_score(Rgb(255, 0, 0)) - 1.0).abs() < 1e-12);
        assert_eq!(appeal_score(Rgb(0, 0, 0)), 0.0);
        assert!((appeal_score(Rgb(255, 255, 255)) - 0.3).abs() < 1e-12);
    }
}
