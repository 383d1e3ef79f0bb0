//! Numeric routines behind the native clustering backend
//!
//! Standardization, seeded k-means with k-means++ initialization, and a
//! principal component projection computed from the covariance matrix with
//! cyclic Jacobi rotations. Inputs are small (one row per analysis result,
//! five columns), so everything works on plain `Vec<Vec<f64>>`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale each column to zero mean and unit variance
///
/// Constant columns become all zeros.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let n = rows.len() as f64;
    let dims = rows[0].len();

    let means: Vec<f64> = (0..dims)
        .map(|d| rows.iter().map(|r| r[d]).sum::<f64>() / n)
        .collect();
    let stds: Vec<f64> = (0..dims)
        .map(|d| (rows.iter().map(|r| (r[d] - means[d]).powi(2)).sum::<f64>() / n).sqrt())
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(d, value)| {
                    if stds[d] > f64::EPSILON {
                        (value - means[d]) / stds[d]
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per row, numbered by first appearance
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
}

/// Seeded Lloyd's k-means with several k-means++ restarts
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }

    pub fn fit(&self, rows: &[Vec<f64>]) -> Result<KMeansFit, String> {
        if self.k == 0 {
            return Err("cluster count must be positive".to_string());
        }
        if rows.len() < self.k {
            return Err(format!(
                "cannot form {} clusters from {} points",
                self.k,
                rows.len()
            ));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err("feature matrix contains non-finite values".to_string());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init.max(1) {
            let centroids = self.init_centroids(rows, &mut rng);
            let fit = self.lloyd(rows, centroids);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.map(canonicalize)
            .ok_or_else(|| "k-means produced no solution".to_string())
    }

    /// k-means++ seeding
    fn init_centroids(&self, rows: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut centroids = vec![rows[rng.gen_range(0..rows.len())].clone()];

        while centroids.len() < self.k {
            let distances: Vec<f64> = rows
                .iter()
                .map(|row| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(row, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();
            let total: f64 = distances.iter().sum();

            let next = if total <= f64::EPSILON {
                rng.gen_range(0..rows.len())
            } else {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                distances
                    .iter()
                    .position(|d| {
                        cumulative += d;
                        cumulative >= target
                    })
                    .unwrap_or(rows.len() - 1)
            };
            centroids.push(rows[next].clone());
        }

        centroids
    }

    fn lloyd(&self, rows: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> KMeansFit {
        let dims = rows[0].len();
        let mut labels = assign(rows, &centroids);

        for _ in 0..self.max_iter {
            let mut sums = vec![vec![0.0; dims]; self.k];
            let mut counts = vec![0usize; self.k];
            for (row, &label) in rows.iter().zip(&labels) {
                counts[label] += 1;
                for (sum, value) in sums[label].iter_mut().zip(row) {
                    *sum += value;
                }
            }

            let mut shift = 0.0;
            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                // Empty clusters keep their previous centroid
                if counts[cluster] == 0 {
                    continue;
                }
                let updated: Vec<f64> = sums[cluster]
                    .iter()
                    .map(|s| s / counts[cluster] as f64)
                    .collect();
                shift += squared_distance(centroid, &updated);
                *centroid = updated;
            }

            labels = assign(rows, &centroids);
            if shift <= self.tolerance {
                break;
            }
        }

        let inertia = rows
            .iter()
            .zip(&labels)
            .map(|(row, &label)| squared_distance(row, &centroids[label]))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

fn assign(rows: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (index, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(row, centroid);
                if distance < best_distance {
                    best = index;
                    best_distance = distance;
                }
            }
            best
        })
        .collect()
}

/// Renumber clusters by first appearance so equal partitions get equal labels
fn canonicalize(fit: KMeansFit) -> KMeansFit {
    let mut mapping: Vec<Option<usize>> = vec![None; fit.centroids.len()];
    let mut order = Vec::with_capacity(fit.centroids.len());
    for &label in &fit.labels {
        if mapping[label].is_none() {
            mapping[label] = Some(order.len());
            order.push(label);
        }
    }
    for (label, slot) in mapping.iter_mut().enumerate() {
        if slot.is_none() {
            *slot = Some(order.len());
            order.push(label);
        }
    }

    KMeansFit {
        labels: fit
            .labels
            .iter()
            .map(|&l| mapping[l].unwrap_or(l))
            .collect(),
        centroids: order.iter().map(|&l| fit.centroids[l].clone()).collect(),
        inertia: fit.inertia,
    }
}

/// Two-dimensional principal component projection
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub coordinates: Vec<[f64; 2]>,
    pub explained_variance_ratio: [f64; 2],
}

/// Project rows onto their first two principal components
pub fn principal_components(rows: &[Vec<f64>]) -> Result<Projection, String> {
    if rows.len() < 2 {
        return Err("at least two rows are required for a projection".to_string());
    }
    let dims = rows[0].len();
    if dims < 2 {
        return Err("at least two feature dimensions are required".to_string());
    }

    let n = rows.len() as f64;
    let means: Vec<f64> = (0..dims)
        .map(|d| rows.iter().map(|r| r[d]).sum::<f64>() / n)
        .collect();
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| r.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect();

    let mut covariance = vec![vec![0.0; dims]; dims];
    for i in 0..dims {
        for j in i..dims {
            let value = centered.iter().map(|r| r[i] * r[j]).sum::<f64>() / (n - 1.0);
            covariance[i][j] = value;
            covariance[j][i] = value;
        }
    }

    let (values, vectors) = symmetric_eigen(covariance);
    let mut order: Vec<usize> = (0..dims).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
    let mut ratios = [0.0; 2];
    let mut axes: Vec<Vec<f64>> = Vec::with_capacity(2);
    for (slot, &component) in order.iter().take(2).enumerate() {
        ratios[slot] = if total > f64::EPSILON {
            values[component].max(0.0) / total
        } else {
            0.0
        };
        let mut axis: Vec<f64> = (0..dims).map(|row| vectors[row][component]).collect();
        // Largest loading positive, so the projection has a fixed orientation
        let dominant = axis.iter().copied().fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if dominant < 0.0 {
            axis.iter_mut().for_each(|v| *v = -*v);
        }
        axes.push(axis);
    }

    let coordinates = centered
        .iter()
        .map(|row| {
            let project = |axis: &Vec<f64>| row.iter().zip(axis).map(|(v, a)| v * a).sum::<f64>();
            [project(&axes[0]), project(&axes[1])]
        })
        .collect();

    Ok(Projection {
        coordinates,
        explained_variance_ratio: ratios,
    })
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations
///
/// Returns eigenvalues and a matrix whose columns are the eigenvectors.
fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..100 {
        let off_diagonal: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off_diagonal < 1e-22 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q].abs() < 1e-300 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    ((0..n).map(|i| a[i][i]).collect(), v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Vec<f64>> {
        vec![
            vec![0.95, 0.9, 0.0, 1.0, 2.0],
            vec![0.92, 0.85, 1.0, 1.0, 2.5],
            vec![0.40, 0.6, 8.0, 5.0, 12.0],
            vec![0.35, 0.55, 9.0, 6.0, 14.0],
            vec![0.65, 0.7, 3.0, 2.0, 6.0],
            vec![0.62, 0.75, 4.0, 3.0, 7.0],
        ]
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let scaled = standardize(&sample_rows());
        for d in 0..5 {
            let column: Vec<f64> = scaled.iter().map(|r| r[d]).collect();
            let mean = column.iter().sum::<f64>() / column.len() as f64;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / column.len() as f64;
            assert!(mean.abs() < 1e-9);
            assert!((variance - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_standardize_constant_column() {
        let scaled = standardize(&[vec![1.0, 5.0], vec![3.0, 5.0]]);
        assert_eq!(scaled[0][1], 0.0);
        assert_eq!(scaled[1][1], 0.0);
        assert!((scaled[0][0] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_kmeans_separates_groups() {
        let scaled = standardize(&sample_rows());
        let fit = KMeans::new(3, 42).fit(&scaled).unwrap();
        assert_eq!(fit.labels.len(), 6);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[2], fit.labels[3]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[2]);
        assert_ne!(fit.labels[0], fit.labels[4]);
        assert_eq!(fit.labels[0], 0);
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let scaled = standardize(&sample_rows());
        let first = KMeans::new(2, 42).fit(&scaled).unwrap();
        let second = KMeans::new(2, 42).fit(&scaled).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_kmeans_rejects_bad_input() {
        assert!(KMeans::new(3, 42).fit(&[vec![1.0], vec![2.0]]).is_err());
        assert!(KMeans::new(1, 42).fit(&[vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_kmeans_identical_points() {
        let rows = vec![vec![0.0, 0.0]; 4];
        let fit = KMeans::new(2, 42).fit(&rows).unwrap();
        assert_eq!(fit.labels.len(), 4);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_principal_components_on_a_line() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let projection = principal_components(&rows).unwrap();
        assert!((projection.explained_variance_ratio[0] - 1.0).abs() < 1e-9);
        assert!(projection.explained_variance_ratio[1].abs() < 1e-9);
        // Points keep their order along the first axis
        assert!(projection.coordinates[0][0] < projection.coordinates[1][0]);
        assert!(projection.coordinates[1][0] < projection.coordinates[2][0]);
        assert!(projection.coordinates[1][0].abs() < 1e-9);
    }

    #[test]
    fn test_principal_components_ratios_bounded() {
        let projection = principal_components(&standardize(&sample_rows())).unwrap();
        let [first, second] = projection.explained_variance_ratio;
        assert!(first >= second);
        assert!(first + second <= 1.0 + 1e-9);
        assert_eq!(projection.coordinates.len(), 6);
    }

    #[test]
    fn test_symmetric_eigen_diagonalizes() {
        let (values, _) = symmetric_eigen(vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert!((sorted[0] - 1.0).abs() < 1e-9);
        assert!((sorted[1] - 3.0).abs() < 1e-9);
    }
}
