use crate::metric::Metric;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut1;
use ndarray::Axis;
use rayon::prelude::*;

/// Squared Euclidean distance metric.
///
/// Computes sum((x_i - y_i)^2) without the square root, which is the
/// quantity the Gaussian affinity kernel expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqEuclideanMetric;

impl Metric for SqEuclideanMetric {
  fn distance(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    rdist(&x, &y)
  }
}

/// Squared Euclidean distance (rdist).
#[inline(always)]
pub fn rdist(x: &ArrayView1<f64>, y: &ArrayView1<f64>) -> f64 {
  x.iter()
    .zip(y.iter())
    .map(|(a, b)| {
      let diff = a - b;
      diff * diff
    })
    .sum()
}

/// All pairwise distances between the rows of `points`.
///
/// The result is symmetric with a zero diagonal: only the upper triangle is
/// evaluated and mirrored.
pub fn pairwise_distances(
  points: ArrayView2<f64>,
  metric: &dyn Metric,
  parallel: bool,
) -> Array2<f64> {
  let n = points.nrows();
  let mut dists = Array2::<f64>::zeros((n, n));

  let fill_row = |i: usize, mut row: ArrayViewMut1<f64>| {
    let xi = points.row(i);
    for j in (i + 1)..n {
      row[j] = metric.distance(xi, points.row(j));
    }
  };

  if parallel {
    dists
      .axis_iter_mut(Axis(0))
      .into_par_iter()
      .enumerate()
      .for_each(|(i, row)| fill_row(i, row));
  } else {
    for (i, row) in dists.axis_iter_mut(Axis(0)).enumerate() {
      fill_row(i, row);
    }
  }

  for i in 0..n {
    for j in 0..i {
      dists[(i, j)] = dists[(j, i)];
    }
  }

  dists
}
