use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::color::{squared_distance, Rgb};

/// Seeded k-means over RGB samples.
///
/// Samples are collapsed to distinct colors with counts first, so flat-color
/// screenshots cluster in a fraction of the work. Every restart uses its own
/// seed (`seed + restart`) and the lowest-inertia result wins, ties going to
/// the earlier restart, so output only depends on the input and the seed.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            k: 5,
            seed: 42,
            restarts: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

struct Weighted {
    points: Vec<[f64; 3]>,
    weights: Vec<f64>,
}

struct Fit {
    centroids: Vec<[f64; 3]>,
    inertia: f64,
}

impl KMeans {
    pub fn with_k(k: usize) -> Self {
        Self { k, ..Self::default() }
    }

    /// Cluster `samples` into at most `k` centroids (fewer when the samples
    /// hold fewer distinct colors).
    pub fn fit(&self, samples: &[Rgb]) -> Vec<Rgb> {
        let data = collapse(samples);
        let k = self.k.min(data.points.len());
        if k == 0 {
            return Vec::new();
        }

        let fits: Vec<Fit> = (0..self.restarts.max(1))
            .into_par_iter()
            .map(|r| self.run_once(&data, k, self.seed.wrapping_add(r as u64)))
            .collect();

        let mut best = &fits[0];
        for fit in &fits[1..] {
            if fit.inertia < best.inertia {
                best = fit;
            }
        }
        best.centroids.iter().map(|c| Rgb::from_f64(*c)).collect()
    }

    fn run_once(&self, data: &Weighted, k: usize, seed: u64) -> Fit {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = plus_plus_init(data, k, &mut rng);
        let mut labels = vec![0usize; data.points.len()];

        for _ in 0..self.max_iter {
            for (label, p) in labels.iter_mut().zip(&data.points) {
                *label = nearest(&centroids, *p).0;
            }

            let mut sums = vec![[0.0f64; 3]; k];
            let mut mass = vec![0.0f64; k];
            for ((p, w), &label) in data.points.iter().zip(&data.weights).zip(&labels) {
                for c in 0..3 {
                    sums[label][c] += p[c] * w;
                }
                mass[label] += w;
            }

            let mut shift = 0.0f64;
            for (i, centroid) in centroids.iter_mut().enumerate() {
                // An emptied cluster keeps its previous centroid.
                if mass[i] == 0.0 {
                    continue;
                }
                let next = [sums[i][0] / mass[i], sums[i][1] / mass[i], sums[i][2] / mass[i]];
                shift = shift.max(squared_distance(*centroid, next));
                *centroid = next;
            }
            if shift <= self.tolerance {
                break;
            }
        }

        let inertia = data
            .points
            .iter()
            .zip(&data.weights)
            .map(|(p, w)| nearest(&centroids, *p).1 * w)
            .sum();
        Fit { centroids, inertia }
    }
}

/// Distinct colors in first-seen order with their sample counts.
fn collapse(samples: &[Rgb]) -> Weighted {
    let mut index: HashMap<Rgb, usize> = HashMap::new();
    let mut points = Vec::new();
    let mut weights: Vec<f64> = Vec::new();
    for &s in samples {
        match index.get(&s) {
            Some(&i) => weights[i] += 1.0,
            None => {
                index.insert(s, points.len());
                points.push(s.to_f64());
                weights.push(1.0);
            }
        }
    }
    Weighted { points, weights }
}

fn nearest(centroids: &[[f64; 3]], p: [f64; 3]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(*c, p);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// k-means++ seeding, weighted by sample counts. `k` never exceeds the number
/// of distinct points, so each pick lands on a point not yet chosen.
fn plus_plus_init(data: &Weighted, k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let total_weight: f64 = data.weights.iter().sum();
    let first = pick_weighted(&data.weights, total_weight, rng);
    let mut centroids = vec![data.points[first]];

    let mut d2: Vec<f64> = data
        .points
        .iter()
        .map(|p| squared_distance(*p, centroids[0]))
        .collect();

    while centroids.len() < k {
        let scores: Vec<f64> = d2.iter().zip(&data.weights).map(|(d, w)| d * w).collect();
        let total: f64 = scores.iter().sum();
        if total <= 0.0 {
            break;
        }
        let chosen = data.points[pick_weighted(&scores, total, rng)];
        for (d, p) in d2.iter_mut().zip(&data.points) {
            *d = d.min(squared_distance(*p, chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

fn pick_weighted(scores: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s <= 0.0 {
            continue;
        }
        acc += s;
        last_positive = i;
        if acc > target {
            return i;
        }
    }
    last_positive
}
