use super::constants::ENTROPY_CUTOFF;
use super::constants::INITIAL_BETA;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut1;
use ndarray::Axis;
use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;
use typed_builder::TypedBuilder;

/// Outcome of calibrating one row's Gaussian kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowCalibration {
  /// Precision that produced the stored row distribution.
  pub beta: f64,
  /// Shannon entropy (nats) of the stored row distribution, truncated:
  /// terms with p <= 1e-7 are left out of the sum. Convergence is judged on
  /// this value.
  pub entropy: f64,
  /// Number of search iterations evaluated.
  pub iterations: usize,
  /// Whether the entropy landed within tolerance of the target.
  pub converged: bool,
  /// Whether every kernel value underflowed to zero on the final evaluation.
  pub degenerate: bool,
}

#[derive(TypedBuilder, Debug)]
pub struct PerplexitySearch<'a> {
  distances: ArrayView2<'a, f64>,
  perplexity: f64,
  #[builder(default = 1e-4)]
  tolerance: f64,
  #[builder(default = 50)]
  n_iter: usize,
  #[builder(default = true)]
  parallel: bool,
}

impl<'a> PerplexitySearch<'a> {
  /*
    Compute the conditional probabilities p_{j|i} for every point i.

    Each row is an independent bounded bisection over the kernel precision
    beta, targeting an entropy of ln(perplexity). The search starts at
    beta = 1 with open bounds, doubles or halves beta until a bound is
    found on each side, then bisects. A row that does not reach the target
    within n_iter evaluations keeps its last distribution.

    Parameters
    ----------
    distances: array of shape (n_samples, n_samples)
        Squared (or proportional) distances. The diagonal is ignored.

    perplexity: float
        Effective number of neighbors.

    tolerance: float (optional, default 1e-4)
        Allowed absolute entropy error.

    n_iter: int (optional, default 50)
        Maximum evaluations per row.

    Returns
    -------
    conditional: array of shape (n_samples, n_samples)
        Row i holds p_{j|i}; the diagonal is zero. Rows sum to 1 unless the
        row is degenerate, in which case they are all zero.

    calibrations: one RowCalibration per row.
  */
  pub fn exec(self) -> (Array2<f64>, Vec<RowCalibration>) {
    let PerplexitySearch {
      distances,
      perplexity,
      tolerance,
      n_iter,
      parallel,
    } = self;

    let n_samples = distances.nrows();
    let target = perplexity.ln();
    let mut conditional = Array2::<f64>::zeros((n_samples, n_samples));

    // Rows are written in place, so the parallel path allocates nothing per row
    let calibrations: Vec<RowCalibration> = if parallel {
      conditional
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, prow)| calibrate_row(i, distances.row(i), prow, target, tolerance, n_iter))
        .collect()
    } else {
      conditional
        .axis_iter_mut(Axis(0))
        .enumerate()
        .map(|(i, prow)| calibrate_row(i, distances.row(i), prow, target, tolerance, n_iter))
        .collect()
    };

    (conditional, calibrations)
  }
}

fn calibrate_row(
  i: usize,
  dists: ArrayView1<f64>,
  mut prow: ArrayViewMut1<f64>,
  target: f64,
  tolerance: f64,
  n_iter: usize,
) -> RowCalibration {
  let mut beta = INITIAL_BETA;
  let mut beta_min = f64::NEG_INFINITY;
  let mut beta_max = f64::INFINITY;

  let mut outcome = RowCalibration {
    beta,
    entropy: 0.0,
    iterations: 0,
    converged: false,
    degenerate: false,
  };

  for iteration in 1..=n_iter {
    let mut psum = 0.0;
    for (j, (&d, p)) in dists.iter().zip(prow.iter_mut()).enumerate() {
      let pj = if i == j { 0.0 } else { f64::exp(-d * beta) };
      *p = pj;
      psum += pj;
    }

    let degenerate = psum == 0.0;
    let mut entropy = 0.0;
    for p in prow.iter_mut() {
      let pj = if degenerate { 0.0 } else { *p / psum };
      *p = pj;
      if pj > ENTROPY_CUTOFF {
        entropy -= pj * pj.ln();
      }
    }

    outcome = RowCalibration {
      beta,
      entropy,
      iterations: iteration,
      converged: f64::abs(entropy - target) < tolerance,
      degenerate,
    };
    if outcome.converged {
      break;
    }

    if entropy > target {
      // Distribution too flat, sharpen it
      beta_min = beta;
      beta = if beta_max == f64::INFINITY {
        beta * 2.0
      } else {
        (beta + beta_max) / 2.0
      };
    } else {
      beta_max = beta;
      beta = if beta_min == f64::NEG_INFINITY {
        beta / 2.0
      } else {
        (beta + beta_min) / 2.0
      };
    }
  }

  outcome
}

#[cfg(test)]
mod tests {
  use super::PerplexitySearch;
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use ndarray::Axis;

  #[test]
  fn rows_hit_target_entropy() {
    let d = array![
      [0.0, 1.0, 4.0, 9.0, 16.0],
      [1.0, 0.0, 1.0, 4.0, 9.0],
      [4.0, 1.0, 0.0, 1.0, 4.0],
      [9.0, 4.0, 1.0, 0.0, 1.0],
      [16.0, 9.0, 4.0, 1.0, 0.0],
    ];
    let (cond, rows) = PerplexitySearch::builder()
      .distances(d.view())
      .perplexity(2.0)
      .build()
      .exec();

    for (i, row) in rows.iter().enumerate() {
      assert!(row.converged, "row {i} did not converge: {row:?}");
      assert!((row.entropy - 2.0f64.ln()).abs() < 1e-4);
      assert_eq!(cond[(i, i)], 0.0);
    }
    for sum in cond.sum_axis(Axis(1)) {
      assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn sequential_and_parallel_agree_bitwise() {
    let d = array![[0.0, 2.0, 3.0], [2.0, 0.0, 7.0], [3.0, 7.0, 0.0]];
    let (a, ra) = PerplexitySearch::builder()
      .distances(d.view())
      .perplexity(1.5)
      .parallel(true)
      .build()
      .exec();
    let (b, rb) = PerplexitySearch::builder()
      .distances(d.view())
      .perplexity(1.5)
      .parallel(false)
      .build()
      .exec();
    assert_eq!(a, b);
    assert_eq!(ra, rb);
  }

  #[test]
  fn unreachable_target_exhausts_budget() {
    // Two neighbors can never produce an entropy of ln(10)
    let d = array![[0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
    let (cond, rows) = PerplexitySearch::builder()
      .distances(d.view())
      .perplexity(10.0)
      .n_iter(50)
      .build()
      .exec();
    for row in &rows {
      assert!(!row.converged);
      assert_eq!(row.iterations, 50);
    }
    assert_abs_diff_eq!(cond[(0, 1)], 0.5, epsilon = 1e-12);
  }

  #[test]
  fn entropy_skips_negligible_probabilities() {
    let d = array![[0.0, 1.0, 30.0], [1.0, 0.0, 1.0], [30.0, 1.0, 0.0]];
    let (cond, rows) = PerplexitySearch::builder()
      .distances(d.view())
      .perplexity(2.0)
      .n_iter(1)
      .build()
      .exec();

    // One evaluation at beta = 1; p_{2|0} is about 2.5e-13
    let near = cond[(0, 1)];
    let far = cond[(0, 2)];
    assert!(far > 0.0 && far < 1e-7);
    let truncated = -near * near.ln();
    let full = truncated - far * far.ln();
    assert_eq!(rows[0].beta, 1.0);
    assert_abs_diff_eq!(rows[0].entropy, truncated, epsilon = 1e-15);
    assert!(full - rows[0].entropy > 1e-12);
  }
}
