use crate::affinities::Affinities;
use crate::config::OptimizationParams;
use crate::config::TsneConfig;
use crate::engine::FittedTsne;
use crate::error::Result;
use crate::error::TsneError;
use crate::tsne::constants::GAIN_DECAY;
use crate::tsne::constants::GAIN_INCREMENT;
use crate::tsne::constants::INITIAL_GAIN;
use crate::tsne::constants::MIN_GAIN;
use crate::tsne::kl_gradient::KlGradient;
use crate::tsne::student_t::StudentTKernel;
use crate::utils::recenter::recenter;
use crate::utils::sign::sign;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Zip;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

/// Active optimization state for a t-SNE embedding.
///
/// This owns the fixed affinities P and everything gradient descent mutates:
/// the embedding Y, the per-coordinate momentum accumulator and adaptive
/// gains, and the iteration counter that drives the exaggeration and momentum
/// schedules. All arrays are allocated once and never resized.
///
/// The optimizer can be serialized mid-training; a deserialized copy continues
/// along exactly the same trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Optimizer {
  // Fixed input-space probabilities
  affinities: Affinities,

  // Current embedding state
  embedding: Array2<f64>,
  steps: Array2<f64>,
  gains: Array2<f64>,

  // Progress tracking
  iteration: usize,
  last_cost: Option<f64>,

  // Schedule and execution settings
  params: OptimizationParams,
  parallel: bool,
}

impl Optimizer {
  /// Create an optimizer starting from the given embedding.
  ///
  /// Momentum accumulators start at zero, gains at one, and the iteration
  /// counter at zero.
  ///
  /// # Arguments
  ///
  /// * `affinities` - Joint probabilities of the input space
  /// * `init` - Initial embedding (n_points × n_components)
  /// * `params` - Learning rate and schedule
  /// * `parallel` - Evaluate the kernel and gradient on the rayon pool
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if `init` does not have one row per point,
  /// has no columns, or contains non-finite values.
  pub fn new(
    affinities: Affinities,
    init: Array2<f64>,
    params: &OptimizationParams,
    parallel: bool,
  ) -> Result<Self> {
    validate_init(&init, affinities.n_points(), None)?;
    let shape = init.raw_dim();

    Ok(Self {
      affinities,
      embedding: init,
      steps: Array2::zeros(shape),
      gains: Array2::from_elem(shape, INITIAL_GAIN),
      iteration: 0,
      last_cost: None,
      params: params.clone(),
      parallel,
    })
  }

  /// Restart optimization from a new embedding without touching P.
  ///
  /// Momentum, gains, the iteration counter and the recorded cost are reset.
  /// The embedding shape cannot change.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if `init` has a different shape than the
  /// current embedding or contains non-finite values. The optimizer is left
  /// untouched in that case.
  pub fn reset(&mut self, init: Array2<f64>) -> Result<()> {
    validate_init(
      &init,
      self.affinities.n_points(),
      Some(self.embedding.ncols()),
    )?;

    self.embedding = init;
    self.steps.fill(0.0);
    self.gains.fill(INITIAL_GAIN);
    self.iteration = 0;
    self.last_cost = None;
    Ok(())
  }

  /// Check the internal consistency of an optimizer obtained from outside
  /// [`Optimizer::new`], e.g. deserialized from a checkpoint.
  ///
  /// # Errors
  ///
  /// [`TsneError::InvalidInput`] if the affinities are malformed, or the
  /// embedding, momentum and gain arrays do not all have one row per point and
  /// the same number of columns.
  pub fn validate(&self) -> Result<()> {
    self.affinities.validate()?;
    validate_init(&self.embedding, self.affinities.n_points(), None)?;

    let shape = self.embedding.dim();
    for (name, array) in [("momentum", &self.steps), ("gains", &self.gains)] {
      if array.dim() != shape {
        return Err(TsneError::InvalidInput(format!(
          "{name} array is {:?} but the embedding is {:?}",
          array.dim(),
          shape
        )));
      }
    }
    Ok(())
  }

  /// Run one iteration of gradient descent.
  ///
  /// Computes the KL divergence and its gradient at the current embedding,
  /// adapts the gains, applies the momentum update, recenters the embedding to
  /// zero mean and advances the iteration counter.
  ///
  /// # Returns
  ///
  /// The KL divergence evaluated before the update.
  pub fn step(&mut self) -> f64 {
    let exaggeration = self.params.exaggeration_at(self.iteration);
    let momentum = self.params.momentum_at(self.iteration);
    let learning_rate = self.params.learning_rate;

    let kernel = StudentTKernel::compute(self.embedding.view(), self.parallel);
    let (cost, grad) = KlGradient::builder()
      .p(self.affinities.p())
      .embedding(self.embedding.view())
      .kernel(&kernel)
      .exaggeration(exaggeration)
      .parallel(self.parallel)
      .build()
      .exec();

    Zip::from(&mut self.embedding)
      .and(&mut self.steps)
      .and(&mut self.gains)
      .and(&grad)
      .for_each(|y, step, gain, &g| {
        // Gradient agreeing with the last step's sign means that step overshot
        let mut new_gain = if sign(g) == sign(*step) {
          *gain * GAIN_DECAY
        } else {
          *gain + GAIN_INCREMENT
        };
        if new_gain < MIN_GAIN {
          new_gain = MIN_GAIN;
        }
        *gain = new_gain;

        let new_step = momentum * *step - learning_rate * new_gain * g;
        *step = new_step;
        *y += new_step;
      });

    recenter(self.embedding.view_mut());

    self.iteration += 1;
    self.last_cost = Some(cost);
    cost
  }

  /// Run `n` iterations and return the cost of the last one.
  ///
  /// With `n == 0` nothing is mutated and the previously recorded cost is
  /// returned (`None` if the optimizer has never stepped).
  pub fn step_n(&mut self, n: usize) -> Option<f64> {
    for _ in 0..n {
      self.step();
    }
    if n > 0 {
      debug!(
        iteration = self.iteration,
        cost = self.last_cost,
        "optimization steps complete"
      );
    }
    self.last_cost
  }

  /// Number of completed iterations since the last (re)initialization.
  pub fn iteration(&self) -> usize {
    self.iteration
  }

  /// Cost of the most recent iteration.
  pub fn last_cost(&self) -> Option<f64> {
    self.last_cost
  }

  /// Get a view of the current embedding.
  pub fn embedding(&self) -> ArrayView2<'_, f64> {
    self.embedding.view()
  }

  /// Get a view of the momentum accumulator.
  pub fn steps(&self) -> ArrayView2<'_, f64> {
    self.steps.view()
  }

  /// Get a view of the adaptive gains.
  pub fn gains(&self) -> ArrayView2<'_, f64> {
    self.gains.view()
  }

  /// Get a reference to the affinities being fitted.
  pub fn affinities(&self) -> &Affinities {
    &self.affinities
  }

  /// Schedule this optimizer runs with.
  pub fn params(&self) -> &OptimizationParams {
    &self.params
  }

  /// The normalized low-dimensional similarities Q of the current embedding.
  pub fn q_distribution(&self) -> Array2<f64> {
    StudentTKernel::compute(self.embedding.view(), self.parallel).normalized()
  }

  /// Consume the optimizer and return a lightweight fitted model.
  ///
  /// This drops the momentum and gain arrays and keeps only the affinities,
  /// the final embedding and the last recorded cost.
  pub fn into_fitted(self, config: TsneConfig) -> FittedTsne {
    FittedTsne {
      embedding: self.embedding,
      affinities: self.affinities,
      kl_divergence: self.last_cost,
      config,
    }
  }
}

fn validate_init(
  init: &Array2<f64>,
  n_points: usize,
  n_components: Option<usize>,
) -> Result<()> {
  if init.nrows() != n_points {
    return Err(TsneError::InvalidInput(format!(
      "init has {} rows but there are {} points",
      init.nrows(),
      n_points
    )));
  }
  if init.ncols() == 0 {
    return Err(TsneError::InvalidInput(
      "init has zero components".to_string(),
    ));
  }
  if let Some(expected) = n_components {
    if init.ncols() != expected {
      return Err(TsneError::InvalidInput(format!(
        "init has {} components but the embedding has {}",
        init.ncols(),
        expected
      )));
    }
  }
  if init.iter().any(|v| !v.is_finite()) {
    return Err(TsneError::InvalidInput(
      "init contains non-finite values".to_string(),
    ));
  }
  Ok(())
}
