use crate::config::AffinityParams;
use crate::distances::pairwise_distances;
use crate::distances::SqEuclideanMetric;
use crate::error::Result;
use crate::error::TsneError;
use crate::metric::Metric;
use crate::tsne::joint_probabilities::joint_probabilities;
use crate::tsne::perplexity_search::PerplexitySearch;
use crate::tsne::perplexity_search::RowCalibration;
use crate::tsne::raise_convergence_warning::raise_convergence_warning;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView2;
use serde::Deserialize;
use serde::Serialize;
use std::time::Instant;
use tracing::info;
use tracing::warn;

/// Joint probabilities of the input space.
///
/// This is the expensive, deterministic part of t-SNE: an N×N symmetric
/// matrix P with every entry floored at 1e-100 and a total of 1 up to
/// rounding. Each degenerate row (see [`RowCalibration::degenerate`])
/// contributes no mass, so with `k` of them the total is `(N - k) / N`, e.g.
/// 2/3 for three points of which one is degenerate.
///
/// P does not depend on the embedding dimensionality, so it can be cached,
/// serialized and reused to start any number of optimizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affinities {
  /// Joint probabilities, P[i, j] == P[j, i].
  pub(crate) p: Array2<f64>,

  /// Per-row outcome of the precision search.
  pub(crate) calibrations: Vec<RowCalibration>,

  /// Perplexity the rows were calibrated for.
  pub(crate) perplexity: f64,
}

impl Affinities {
  /// Build P from raw points using squared Euclidean distances.
  ///
  /// # Arguments
  ///
  /// * `points` - Input matrix (n_samples × n_features)
  /// * `params` - Perplexity and search settings
  /// * `parallel` - Compute distances and calibrate rows on the rayon pool
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if there are no points, the points have no
  /// features, or any value is not finite.
  pub fn from_points(
    points: ArrayView2<f64>,
    params: &AffinityParams,
    parallel: bool,
  ) -> Result<Self> {
    Self::from_points_with_metric(points, &SqEuclideanMetric, params, parallel)
  }

  /// Build P from raw points using a custom input-space metric.
  pub fn from_points_with_metric(
    points: ArrayView2<f64>,
    metric: &dyn Metric,
    params: &AffinityParams,
    parallel: bool,
  ) -> Result<Self> {
    validate_points(&points)?;
    params.validate()?;

    let started = Instant::now();
    let distances = pairwise_distances(points, metric, parallel);
    info!(
      duration_ms = started.elapsed().as_millis(),
      n_points = points.nrows(),
      n_features = points.ncols(),
      "pairwise distances complete"
    );

    Self::calibrate(distances.view(), params, parallel)
  }

  /// Build P from a precomputed distance matrix.
  ///
  /// Distances are used as-is in the kernel `exp(-beta * d)`, so they should
  /// be squared (or proportional to squared) distances.
  ///
  /// The matrix must be square, finite and non-negative. Asymmetry and a
  /// non-zero diagonal are tolerated: the diagonal is never read, and the
  /// symmetrization step masks asymmetric input. Both are logged.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if the matrix is empty, not square, or has
  /// negative or non-finite entries.
  pub fn from_distances(
    distances: ArrayView2<f64>,
    params: &AffinityParams,
    parallel: bool,
  ) -> Result<Self> {
    validate_distances(&distances)?;
    params.validate()?;
    Self::calibrate(distances, params, parallel)
  }

  fn calibrate(
    distances: ArrayView2<f64>,
    params: &AffinityParams,
    parallel: bool,
  ) -> Result<Self> {
    let n_points = distances.nrows();

    info!(
      n_points,
      perplexity = params.perplexity,
      "starting perplexity search"
    );
    let started = Instant::now();
    let (conditional, calibrations) = PerplexitySearch::builder()
      .distances(distances)
      .perplexity(params.perplexity)
      .tolerance(params.tolerance)
      .n_iter(params.max_search_iters)
      .parallel(parallel)
      .build()
      .exec();
    let p = joint_probabilities(conditional.view());

    let unconverged_rows = calibrations.iter().filter(|row| !row.converged).count();
    let degenerate_rows = calibrations.iter().filter(|row| row.degenerate).count();
    info!(
      duration_ms = started.elapsed().as_millis(),
      unconverged_rows,
      degenerate_rows,
      "affinities complete"
    );

    raise_convergence_warning(
      unconverged_rows,
      degenerate_rows,
      params.perplexity,
      n_points,
      0.1,
    );

    Ok(Self {
      p,
      calibrations,
      perplexity: params.perplexity,
    })
  }

  /// Check the internal consistency of affinities obtained from outside the
  /// constructors, e.g. deserialized from a cache.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if P is empty or not square, has negative or
  /// non-finite entries, or the calibration count differs from the number of
  /// points.
  pub fn validate(&self) -> Result<()> {
    let (rows, cols) = self.p.dim();
    if rows == 0 {
      return Err(TsneError::InvalidInput("affinities are empty".to_string()));
    }
    if rows != cols {
      return Err(TsneError::InvalidInput(format!(
        "affinity matrix must be square, got {rows}x{cols}"
      )));
    }
    if self.calibrations.len() != rows {
      return Err(TsneError::InvalidInput(format!(
        "affinities have {} row calibrations for {rows} points",
        self.calibrations.len()
      )));
    }
    if self.p.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
      return Err(TsneError::InvalidInput(
        "affinity matrix has negative or non-finite entries".to_string(),
      ));
    }
    Ok(())
  }

  /// Number of points.
  pub fn n_points(&self) -> usize {
    self.p.nrows()
  }

  /// View of the joint probability matrix.
  pub fn p(&self) -> ArrayView2<'_, f64> {
    self.p.view()
  }

  /// Perplexity the rows were calibrated for.
  pub fn perplexity(&self) -> f64 {
    self.perplexity
  }

  /// Per-row search outcomes.
  pub fn calibrations(&self) -> &[RowCalibration] {
    &self.calibrations
  }

  /// Final kernel precision of every row.
  pub fn betas(&self) -> Array1<f64> {
    self.calibrations.iter().map(|row| row.beta).collect()
  }

  /// Entropy (nats) of every row's conditional distribution.
  pub fn entropies(&self) -> Array1<f64> {
    self.calibrations.iter().map(|row| row.entropy).collect()
  }

  /// Number of rows whose search ran out of iterations.
  pub fn unconverged_rows(&self) -> usize {
    self.calibrations.iter().filter(|row| !row.converged).count()
  }
}

fn validate_points(points: &ArrayView2<f64>) -> Result<()> {
  if points.nrows() == 0 {
    return Err(TsneError::InvalidInput("point set is empty".to_string()));
  }
  if points.ncols() == 0 {
    return Err(TsneError::InvalidInput(
      "points have zero dimensions".to_string(),
    ));
  }
  if let Some(((i, d), v)) = points.indexed_iter().find(|(_, v)| !v.is_finite()) {
    return Err(TsneError::InvalidInput(format!(
      "point {i} has non-finite value {v} in dimension {d}"
    )));
  }
  Ok(())
}

fn validate_distances(distances: &ArrayView2<f64>) -> Result<()> {
  let (rows, cols) = distances.dim();
  if rows == 0 {
    return Err(TsneError::InvalidInput(
      "distance matrix is empty".to_string(),
    ));
  }
  if rows != cols {
    return Err(TsneError::InvalidInput(format!(
      "distance matrix must be square, got {rows}x{cols}"
    )));
  }
  if let Some(((i, j), v)) = distances
    .indexed_iter()
    .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
  {
    return Err(TsneError::InvalidInput(format!(
      "distance [{i}, {j}] = {v} must be finite and non-negative"
    )));
  }

  let mut asymmetric_pairs = 0usize;
  let mut nonzero_diagonal = 0usize;
  for i in 0..rows {
    if distances[(i, i)] != 0.0 {
      nonzero_diagonal += 1;
    }
    for j in (i + 1)..rows {
      if distances[(i, j)] != distances[(j, i)] {
        asymmetric_pairs += 1;
      }
    }
  }
  if asymmetric_pairs > 0 || nonzero_diagonal > 0 {
    warn!(
      asymmetric_pairs,
      nonzero_diagonal,
      "distance matrix is asymmetric or has a non-zero diagonal; symmetrization will mask it"
    );
  }

  Ok(())
}
