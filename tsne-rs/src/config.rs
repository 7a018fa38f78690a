use crate::error::Result;
use crate::error::TsneError;
use serde::Deserialize;
use serde::Serialize;

/// Configuration for the high-dimensional affinity construction.
///
/// These parameters control how the per-point Gaussian kernels are calibrated
/// before being symmetrized into the joint probability matrix P.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityParams {
  /// Target effective number of neighbors per point.
  ///
  /// Each row's conditional distribution is calibrated so that its Shannon
  /// entropy equals `ln(perplexity)`. Larger values capture more global
  /// structure, smaller values focus on the immediate neighborhood.
  ///
  /// Must be > 0. Values above `n - 1` are accepted; the precision search then
  /// runs out its iteration budget without reaching the target.
  ///
  /// Default: 30.0
  pub perplexity: f64,

  /// Allowed absolute difference between a row's entropy and `ln(perplexity)`.
  ///
  /// Default: 1e-4
  pub tolerance: f64,

  /// Maximum number of precision (beta) search iterations per row.
  ///
  /// A row that has not converged after this many iterations keeps its last
  /// distribution. This is not an error.
  ///
  /// Default: 50
  pub max_search_iters: usize,
}

impl Default for AffinityParams {
  fn default() -> Self {
    Self {
      perplexity: 30.0,
      tolerance: 1e-4,
      max_search_iters: 50,
    }
  }
}

impl AffinityParams {
  /// Check perplexity, tolerance and the search budget.
  pub fn validate(&self) -> Result<()> {
    if !(self.perplexity.is_finite() && self.perplexity > 0.0) {
      return Err(TsneError::InvalidConfig(format!(
        "perplexity must be positive and finite, got {}",
        self.perplexity
      )));
    }
    if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
      return Err(TsneError::InvalidConfig(format!(
        "tolerance must be positive and finite, got {}",
        self.tolerance
      )));
    }
    if self.max_search_iters == 0 {
      return Err(TsneError::InvalidConfig(
        "max_search_iters must be >= 1".to_string(),
      ));
    }
    Ok(())
  }
}

/// Configuration for the gradient descent schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationParams {
  /// Learning rate (epsilon) applied to the gain-scaled gradient.
  ///
  /// Default: 10.0
  pub learning_rate: f64,

  /// Number of iterations run by the one-shot [`crate::Tsne::fit`].
  ///
  /// Stepwise callers drive the optimizer themselves and ignore this value.
  ///
  /// Default: 1000
  pub n_iter: usize,

  /// Multiplier applied to P during the first `exaggeration_iters` iterations.
  ///
  /// Only the cost and gradient see the multiplier; the stored P is never
  /// modified.
  ///
  /// Default: 4.0
  pub early_exaggeration: f64,

  /// Number of iterations during which early exaggeration is active.
  ///
  /// Default: 100
  pub exaggeration_iters: usize,

  /// Momentum coefficient used before `momentum_switch_iter`.
  ///
  /// Default: 0.5
  pub initial_momentum: f64,

  /// Momentum coefficient used from `momentum_switch_iter` onwards.
  ///
  /// Default: 0.8
  pub final_momentum: f64,

  /// Iteration at which the momentum coefficient switches.
  ///
  /// Default: 250
  pub momentum_switch_iter: usize,
}

impl Default for OptimizationParams {
  fn default() -> Self {
    Self {
      learning_rate: 10.0,
      n_iter: 1000,
      early_exaggeration: 4.0,
      exaggeration_iters: 100,
      initial_momentum: 0.5,
      final_momentum: 0.8,
      momentum_switch_iter: 250,
    }
  }
}

impl OptimizationParams {
  /// P multiplier for the given (zero-based) iteration.
  #[inline]
  pub fn exaggeration_at(&self, iteration: usize) -> f64 {
    if iteration < self.exaggeration_iters {
      self.early_exaggeration
    } else {
      1.0
    }
  }

  /// Momentum coefficient for the given (zero-based) iteration.
  #[inline]
  pub fn momentum_at(&self, iteration: usize) -> f64 {
    if iteration < self.momentum_switch_iter {
      self.initial_momentum
    } else {
      self.final_momentum
    }
  }
}

/// Complete t-SNE configuration.
///
/// # Example
///
/// ```
/// use tsne_rs::config::{AffinityParams, TsneConfig};
///
/// let config = TsneConfig {
///   n_components: 3,
///   affinity: AffinityParams {
///     perplexity: 10.0,
///     ..Default::default()
///   },
///   seed: Some(42),
///   ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsneConfig {
  /// Number of dimensions in the output embedding.
  ///
  /// Must be >= 1.
  ///
  /// Default: 2
  pub n_components: usize,

  /// Affinity construction configuration.
  pub affinity: AffinityParams,

  /// Optimization configuration.
  pub optimization: OptimizationParams,

  /// Seed for the random initial embedding.
  ///
  /// With a fixed seed, identical inputs and step counts give bit-identical
  /// embeddings. `None` seeds from OS entropy.
  ///
  /// Default: None
  pub seed: Option<u64>,

  /// Run per-row kernels on the rayon thread pool.
  ///
  /// Results are identical to the sequential path: every row is accumulated
  /// in index order and rows are combined in index order.
  ///
  /// Default: true
  pub parallel: bool,
}

impl Default for TsneConfig {
  fn default() -> Self {
    Self {
      n_components: 2,
      affinity: AffinityParams::default(),
      optimization: OptimizationParams::default(),
      seed: None,
      parallel: true,
    }
  }
}

impl TsneConfig {
  /// Check every parameter range.
  pub fn validate(&self) -> Result<()> {
    self.affinity.validate()?;

    if self.n_components < 1 {
      return Err(TsneError::InvalidConfig(format!(
        "n_components must be >= 1, got {}",
        self.n_components
      )));
    }

    let opt = &self.optimization;
    if !(opt.learning_rate.is_finite() && opt.learning_rate > 0.0) {
      return Err(TsneError::InvalidConfig(format!(
        "learning_rate must be positive and finite, got {}",
        opt.learning_rate
      )));
    }
    if !(opt.early_exaggeration.is_finite() && opt.early_exaggeration > 0.0) {
      return Err(TsneError::InvalidConfig(format!(
        "early_exaggeration must be positive and finite, got {}",
        opt.early_exaggeration
      )));
    }
    for (name, value) in [
      ("initial_momentum", opt.initial_momentum),
      ("final_momentum", opt.final_momentum),
    ] {
      if !(0.0..1.0).contains(&value) {
        return Err(TsneError::InvalidConfig(format!(
          "{name} must be in [0, 1), got {value}"
        )));
      }
    }

    Ok(())
  }
}
