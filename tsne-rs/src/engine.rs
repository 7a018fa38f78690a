use crate::affinities::Affinities;
use crate::config::TsneConfig;
use crate::distances::SqEuclideanMetric;
use crate::error::Result;
use crate::error::TsneError;
use crate::metric::Metric;
use crate::optimizer::Optimizer;
use crate::tsne::init_solution::random_init;
use ndarray::Array2;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// A t-SNE embedding session.
///
/// The session owns its configuration, the input-space affinities and the
/// optimizer state. It starts uninitialized; one of the `init_*` calls
/// computes P and draws a random embedding, after which it can be stepped
/// any number of times, read, and reset. Sessions are independent values, so
/// any number of them can coexist.
///
/// Access is exclusive and sequential: every call runs to completion before
/// returning.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use tsne_rs::{Tsne, TsneConfig};
/// use tsne_rs::config::AffinityParams;
///
/// let points = array![[0.0, 0.0], [0.1, 0.0], [5.0, 5.0], [5.1, 5.0]];
/// let config = TsneConfig {
///   affinity: AffinityParams {
///     perplexity: 2.0,
///     ..Default::default()
///   },
///   seed: Some(7),
///   ..Default::default()
/// };
///
/// let mut tsne = Tsne::new(config);
/// tsne.init_from_points(points.view())?;
/// for _ in 0..10 {
///   let cost = tsne.step(10)?;
///   assert!(cost.is_some());
/// }
/// let solution = tsne.solution()?;
/// assert_eq!(solution.shape(), &[4, 2]);
/// # Ok::<(), tsne_rs::TsneError>(())
/// ```
pub struct Tsne {
  config: TsneConfig,
  metric: Box<dyn Metric>,
  rng: StdRng,
  optimizer: Option<Optimizer>,
}

impl Tsne {
  /// Create an uninitialized session with the squared Euclidean input metric.
  ///
  /// The configuration is validated by the `init_*` calls.
  pub fn new(config: TsneConfig) -> Self {
    Self::with_metric(config, Box::new(SqEuclideanMetric))
  }

  /// Create an uninitialized session with a custom input-space metric.
  ///
  /// The metric is only used by [`Tsne::init_from_points`].
  pub fn with_metric(config: TsneConfig, metric: Box<dyn Metric>) -> Self {
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_os_rng(),
    };
    Self {
      config,
      metric,
      rng,
      optimizer: None,
    }
  }

  /// Start a session from raw points (n_points × n_features).
  ///
  /// Computes P from squared distances between the points, then draws a fresh
  /// random embedding. Any previous session state is replaced, but only once
  /// everything has been computed successfully.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidConfig`] for out-of-range parameters and
  /// [`TsneError::InvalidInput`] for an empty point set, zero-dimensional
  /// points or non-finite values.
  pub fn init_from_points(&mut self, points: ArrayView2<f64>) -> Result<()> {
    self.config.validate()?;
    let affinities = Affinities::from_points_with_metric(
      points,
      self.metric.as_ref(),
      &self.config.affinity,
      self.config.parallel,
    )?;
    self.init_from_affinities(affinities)
  }

  /// Start a session from a precomputed N×N distance matrix.
  ///
  /// See [`Affinities::from_distances`] for what is validated and what is
  /// tolerated.
  pub fn init_from_distances(&mut self, distances: ArrayView2<f64>) -> Result<()> {
    self.config.validate()?;
    let affinities =
      Affinities::from_distances(distances, &self.config.affinity, self.config.parallel)?;
    self.init_from_affinities(affinities)
  }

  /// Start a session from previously computed affinities.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if the affinities are malformed, which can
  /// only happen for values that were deserialized.
  pub fn init_from_affinities(&mut self, affinities: Affinities) -> Result<()> {
    self.config.validate()?;
    affinities.validate()?;
    let n_points = affinities.n_points();

    let init = random_init(n_points, self.config.n_components, &mut self.rng);
    let optimizer = Optimizer::new(
      affinities,
      init,
      &self.config.optimization,
      self.config.parallel,
    )?;
    self.optimizer = Some(optimizer);

    info!(
      n_points,
      n_components = self.config.n_components,
      "session initialized"
    );
    Ok(())
  }

  /// Resume a session from an optimizer, e.g. one restored from a checkpoint.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if the optimizer is internally inconsistent
  /// (see [`Optimizer::validate`]) or its embedding does not have
  /// `n_components` columns. The session is left untouched in that case.
  pub fn restore(&mut self, optimizer: Optimizer) -> Result<()> {
    optimizer.validate()?;
    let n_components = optimizer.embedding().ncols();
    if n_components != self.config.n_components {
      return Err(TsneError::InvalidInput(format!(
        "optimizer has {} components but n_components is {}",
        n_components, self.config.n_components
      )));
    }
    self.optimizer = Some(optimizer);
    Ok(())
  }

  /// Run `count` optimizer iterations.
  ///
  /// # Returns
  ///
  /// The KL divergence of the last executed iteration. `step(0)` executes
  /// nothing and returns the previously recorded cost, which is `None` for a
  /// session that has never stepped.
  ///
  /// # Errors
  ///
  /// [`TsneError::NotInitialized`] before any `init_*` call.
  pub fn step(&mut self, count: usize) -> Result<Option<f64>> {
    let optimizer = self.optimizer.as_mut().ok_or(TsneError::NotInitialized)?;
    Ok(optimizer.step_n(count))
  }

  /// Copy of the current embedding (n_points × n_components).
  ///
  /// The copy is a point-in-time snapshot; later steps do not affect it.
  pub fn solution(&self) -> Result<Array2<f64>> {
    Ok(self.optimizer()?.embedding().to_owned())
  }

  /// Borrowed view of the current embedding.
  ///
  /// The borrow prevents stepping while the view is alive.
  pub fn solution_view(&self) -> Result<ArrayView2<'_, f64>> {
    Ok(self.optimizer()?.embedding())
  }

  /// Draw a new random embedding and restart optimization, keeping P.
  ///
  /// Momentum, gains and the iteration counter are reset. Consecutive resets
  /// draw independent embeddings from the session's random stream.
  pub fn reset(&mut self) -> Result<()> {
    let n_components = self.config.n_components;
    let optimizer = self.optimizer.as_mut().ok_or(TsneError::NotInitialized)?;
    let init = random_init(
      optimizer.affinities().n_points(),
      n_components,
      &mut self.rng,
    );
    optimizer.reset(init)?;
    info!(n_components, "session reset");
    Ok(())
  }

  /// Restart optimization from a caller-supplied embedding, keeping P.
  pub fn reset_with(&mut self, init: Array2<f64>) -> Result<()> {
    let optimizer = self.optimizer.as_mut().ok_or(TsneError::NotInitialized)?;
    optimizer.reset(init)?;
    info!("session reset from supplied embedding");
    Ok(())
  }

  /// Whether an `init_*` call has succeeded.
  pub fn is_initialized(&self) -> bool {
    self.optimizer.is_some()
  }

  /// Number of completed iterations since the last (re)initialization.
  pub fn iteration(&self) -> Result<usize> {
    Ok(self.optimizer()?.iteration())
  }

  /// The session's affinities.
  pub fn affinities(&self) -> Result<&Affinities> {
    Ok(self.optimizer()?.affinities())
  }

  /// The session's optimizer, e.g. for checkpointing.
  pub fn optimizer(&self) -> Result<&Optimizer> {
    self.optimizer.as_ref().ok_or(TsneError::NotInitialized)
  }

  /// Get a reference to the configuration.
  pub fn config(&self) -> &TsneConfig {
    &self.config
  }

  /// Consume the session and return a lightweight fitted model.
  pub fn into_fitted(self) -> Result<FittedTsne> {
    let optimizer = self.optimizer.ok_or(TsneError::NotInitialized)?;
    Ok(optimizer.into_fitted(self.config))
  }

  /// High-level convenience method that initializes from points and runs
  /// `config.optimization.n_iter` iterations in one call.
  ///
  /// For progressive rendering or checkpointing, drive the session with
  /// [`Tsne::step`] instead.
  pub fn fit(mut self, points: ArrayView2<f64>) -> Result<FittedTsne> {
    self.init_from_points(points)?;

    let n_iter = self.config.optimization.n_iter;
    info!(n_iter, "starting optimization");
    let started = Instant::now();
    let cost = self.step(n_iter)?;
    info!(
      duration_ms = started.elapsed().as_millis(),
      kl_divergence = cost,
      "optimization complete"
    );

    self.into_fitted()
  }
}

/// A fitted t-SNE model containing the affinities and final embedding.
///
/// This is a lightweight struct that holds only the results, without the
/// optimizer's momentum and gain arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedTsne {
  pub(crate) embedding: Array2<f64>,
  pub(crate) affinities: Affinities,
  pub(crate) kl_divergence: Option<f64>,
  pub(crate) config: TsneConfig,
}

impl FittedTsne {
  /// Get a view of the computed embedding.
  ///
  /// Each row represents one input point in the low-dimensional space.
  pub fn embedding(&self) -> ArrayView2<'_, f64> {
    self.embedding.view()
  }

  /// Consume the model and return the embedding, avoiding a copy.
  pub fn into_embedding(self) -> Array2<f64> {
    self.embedding
  }

  /// Get a reference to the affinities.
  pub fn affinities(&self) -> &Affinities {
    &self.affinities
  }

  /// KL divergence of the final iteration, `None` if no iteration ran.
  pub fn kl_divergence(&self) -> Option<f64> {
    self.kl_divergence
  }

  /// Get a reference to the configuration used for this fit.
  pub fn config(&self) -> &TsneConfig {
    &self.config
  }
}
