use ndarray::ArrayView1;
use std::fmt::Debug;

/// A dissimilarity measure for the input space.
///
/// The affinity kernel is `exp(-beta * d)`, so implementations should return
/// squared-distance-like values (non-negative, zero for identical points).
/// Thread-safety (Send + Sync) is required for the parallel distance pass.
pub trait Metric: Debug + Send + Sync {
  /// Compute the dissimilarity between two points.
  ///
  /// # Arguments
  ///
  /// * `a` - First point
  /// * `b` - Second point
  ///
  /// Must be symmetric in its arguments and non-negative.
  fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64;
}
