use super::constants::PROBABILITY_FLOOR;
use ndarray::Array2;
use ndarray::ArrayView2;

/*
  Symmetrize conditional probabilities into the joint distribution P.

  P[i, j] = max((p_{j|i} + p_{i|j}) / 2n, PROBABILITY_FLOOR)

  The sum is commutative, so P is exactly symmetric regardless of any
  asymmetry in the conditional matrix. Every entry, the diagonal included,
  is strictly positive.

  Parameters
  ----------
  conditional: array of shape (n_samples, n_samples)
      Row i holds p_{j|i}.

  Returns
  -------
  joint: array of shape (n_samples, n_samples)
*/
pub fn joint_probabilities(conditional: ArrayView2<f64>) -> Array2<f64> {
  let n = conditional.nrows();
  let n2 = (2 * n) as f64;
  Array2::from_shape_fn((n, n), |(i, j)| {
    f64::max(
      (conditional[(i, j)] + conditional[(j, i)]) / n2,
      PROBABILITY_FLOOR,
    )
  })
}
