use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprs::{CsMat, CsVecView};

/// K-Means parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansSettings {
    /// Number of clusters.
    pub k: usize,
    /// Number of k-means++ restarts; the run with the lowest inertia wins.
    pub n_init: usize,
    /// Maximum Lloyd iterations per restart.
    pub max_iter: usize,
    /// Relative tolerance on centroid movement (scaled by the mean feature variance).
    pub tolerance: f32,
    pub seed: u64,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self {
            k: 3,
            n_init: 15,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// K-Means clustering over the rows of a sparse CSR matrix.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub centroids: Array2<f32>,
    pub assignments: Vec<usize>,
    pub inertia: f32,
    pub iterations: usize,
}

impl KMeans {
    /// Runs seeded K-Means with k-means++ initialization.
    ///
    /// `k` is clamped to the number of rows. Clusters that lose all their members keep
    /// their previous centroid, so fewer than `k` distinct labels may come back.
    #[must_use]
    pub fn fit(data: &CsMat<f32>, settings: &KMeansSettings) -> Self {
        let n = data.rows();
        let dim = data.cols();
        if n == 0 || settings.k == 0 {
            return Self {
                centroids: Array2::zeros((0, dim)),
                assignments: vec![],
                inertia: 0.0,
                iterations: 0,
            };
        }

        let k = settings.k.min(n);
        let rows: Vec<CsVecView<'_, f32>> = data.outer_iterator().collect();
        let row_norms: Vec<f32> = rows.iter().map(squared_norm).collect();
        let tolerance = settings.tolerance * mean_variance(&rows, dim);
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let mut best: Option<Self> = None;
        for _ in 0..settings.n_init.max(1) {
            let initial = kmeans_plus_plus(&rows, &row_norms, k, dim, &mut rng);
            let run = lloyd(&rows, &row_norms, initial, settings.max_iter.max(1), tolerance);
            if best.as_ref().is_none_or(|current| run.inertia < current.inertia) {
                best = Some(run);
            }
        }

        best.unwrap_or_else(|| Self {
            centroids: Array2::zeros((k, dim)),
            assignments: vec![0; n],
            inertia: 0.0,
            iterations: 0,
        })
    }

    /// Number of clusters that ended up with at least one member.
    #[must_use]
    pub fn non_empty_clusters(&self) -> usize {
        let mut seen = vec![false; self.centroids.nrows()];
        for &cluster in &self.assignments {
            seen[cluster] = true;
        }
        seen.into_iter().filter(|used| *used).count()
    }
}

fn lloyd(
    rows: &[CsVecView<'_, f32>],
    row_norms: &[f32],
    mut centroids: Array2<f32>,
    max_iterations: usize,
    tolerance: f32,
) -> KMeans {
    let k = centroids.nrows();
    let dim = centroids.ncols();
    let mut assignments = vec![usize::MAX; rows.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        // E-step: assign points to nearest centroid
        let (new_assignments, _) = assign(rows, row_norms, &centroids);
        let changed = new_assignments != assignments;
        assignments = new_assignments;

        // M-step: update centroids
        let mut sums = Array2::<f32>::zeros((k, dim));
        let mut counts = vec![0usize; k];
        for (row, &cluster) in rows.iter().zip(&assignments) {
            for (col, value) in row.iter() {
                sums[[cluster, col]] += value;
            }
            counts[cluster] += 1;
        }

        let mut shift = 0.0f32;
        for (cluster, &count) in counts.iter().enumerate() {
            if count == 0 {
                // keep the previous centroid for an empty cluster
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let denom = count as f32;
            for col in 0..dim {
                let updated = sums[[cluster, col]] / denom;
                let delta = updated - centroids[[cluster, col]];
                shift += delta * delta;
                centroids[[cluster, col]] = updated;
            }
        }

        if !changed || shift <= tolerance {
            break;
        }
    }

    let (assignments, inertia) = assign(rows, row_norms, &centroids);
    KMeans {
        centroids,
        assignments,
        inertia,
        iterations,
    }
}

fn assign(
    rows: &[CsVecView<'_, f32>],
    row_norms: &[f32],
    centroids: &Array2<f32>,
) -> (Vec<usize>, f32) {
    let centroid_norms: Vec<f32> = centroids
        .rows()
        .into_iter()
        .map(|centroid| centroid.dot(&centroid))
        .collect();

    let mut inertia = 0.0f32;
    let assignments = rows
        .iter()
        .zip(row_norms)
        .map(|(row, &row_norm)| {
            let mut min_dist_sq = f32::MAX;
            let mut best_cluster = 0;
            for (j, centroid) in centroids.rows().into_iter().enumerate() {
                let dist_sq = distance_sq(row, row_norm, centroid, centroid_norms[j]);
                if dist_sq < min_dist_sq {
                    min_dist_sq = dist_sq;
                    best_cluster = j;
                }
            }
            inertia += min_dist_sq;
            best_cluster
        })
        .collect();
    (assignments, inertia)
}

/// k-means++ seeding: each new centroid is sampled with probability proportional to
/// its squared distance from the closest centroid chosen so far.
fn kmeans_plus_plus(
    rows: &[CsVecView<'_, f32>],
    row_norms: &[f32],
    k: usize,
    dim: usize,
    rng: &mut StdRng,
) -> Array2<f32> {
    let n = rows.len();
    let mut centroids = Array2::<f32>::zeros((k, dim));

    let first = rng.random_range(0..n);
    write_row(&mut centroids, 0, &rows[first]);
    let mut closest: Vec<f32> = rows
        .iter()
        .zip(row_norms)
        .map(|(row, &norm)| distance_sq(row, norm, centroids.row(0), row_norms[first]))
        .collect();

    for c in 1..k {
        let total: f32 = closest.iter().sum();
        let chosen = if total <= f32::EPSILON {
            // every point sits on a centroid already
            rng.random_range(0..n)
        } else {
            let target = rng.random::<f32>() * total;
            let mut cumulative = 0.0f32;
            closest
                .iter()
                .position(|dist| {
                    cumulative += dist;
                    cumulative >= target
                })
                .unwrap_or(n - 1)
        };

        write_row(&mut centroids, c, &rows[chosen]);
        let chosen_norm = row_norms[chosen];
        for (i, row) in rows.iter().enumerate() {
            let dist = distance_sq(row, row_norms[i], centroids.row(c), chosen_norm);
            if dist < closest[i] {
                closest[i] = dist;
            }
        }
    }

    centroids
}

fn write_row(centroids: &mut Array2<f32>, index: usize, row: &CsVecView<'_, f32>) {
    let mut target = centroids.row_mut(index);
    target.fill(0.0);
    for (col, value) in row.iter() {
        target[col] = *value;
    }
}

fn squared_norm(row: &CsVecView<'_, f32>) -> f32 {
    row.iter().map(|(_, value)| value * value).sum()
}

fn distance_sq(
    row: &CsVecView<'_, f32>,
    row_norm: f32,
    centroid: ArrayView1<'_, f32>,
    centroid_norm: f32,
) -> f32 {
    let dot: f32 = row.iter().map(|(col, value)| value * centroid[col]).sum();
    (row_norm - 2.0 * dot + centroid_norm).max(0.0)
}

fn mean_variance(rows: &[CsVecView<'_, f32>], dim: usize) -> f32 {
    if rows.is_empty() || dim == 0 {
        return 0.0;
    }
    let mut sums = vec![0.0f32; dim];
    let mut squares = vec![0.0f32; dim];
    for row in rows {
        for (col, value) in row.iter() {
            sums[col] += value;
            squares[col] += value * value;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let n = rows.len() as f32;
    #[allow(clippy::cast_precision_loss)]
    let dims = dim as f32;
    sums.iter()
        .zip(&squares)
        .map(|(sum, square)| {
            let mean = sum / n;
            (square / n - mean * mean).max(0.0)
        })
        .sum::<f32>()
        / dims
}
