use super::student_t::StudentTKernel;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut1;
use ndarray::Axis;
use rayon::prelude::*;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct KlGradient<'a> {
  p: ArrayView2<'a, f64>,
  embedding: ArrayView2<'a, f64>,
  kernel: &'a StudentTKernel,
  #[builder(default = 1.0)]
  exaggeration: f64,
  #[builder(default = true)]
  parallel: bool,
}

impl<'a> KlGradient<'a> {
  /*
    Kullback-Leibler divergence KL(P || Q) and its gradient with respect to
    the embedding.

    cost = sum_{i != j} m*P[i,j] * ln(m*P[i,j] / Q[i,j])
    grad[i, d] = 4 * sum_j (m*P[i,j] - Q[i,j]) * q_unnorm[i,j] * (y[i,d] - y[j,d])

    where m is the early exaggeration multiplier. P itself is not modified.

    Parameters
    ----------
    p: array of shape (n_samples, n_samples)
        Joint probabilities in the input space.

    embedding: array of shape (n_samples, n_components)
        Current embedding the kernel was computed from.

    kernel: StudentTKernel
        Similarities of `embedding`.

    exaggeration: float (optional, default 1.0)
        Multiplier applied to P.

    Returns
    -------
    cost: float

    grad: array of shape (n_samples, n_components)
  */
  pub fn exec(self) -> (f64, Array2<f64>) {
    let KlGradient {
      p,
      embedding,
      kernel,
      exaggeration,
      parallel,
    } = self;

    let n = embedding.nrows();
    let dim = embedding.ncols();
    let mut grad = Array2::<f64>::zeros((n, dim));

    let row_pass = |i: usize, mut grad_row: ArrayViewMut1<f64>| -> f64 {
      let yi = embedding.row(i);
      let mut cost = 0.0;
      for j in 0..n {
        if i == j {
          continue;
        }
        let pij = exaggeration * p[(i, j)];
        let qij = kernel.q(i, j);
        cost += pij * (pij / qij).ln();

        let premult = 4.0 * (pij - qij) * kernel.unnormalized[(i, j)];
        let yj = embedding.row(j);
        for d in 0..dim {
          grad_row[d] += premult * (yi[d] - yj[d]);
        }
      }
      cost
    };

    let row_costs: Vec<f64> = if parallel {
      grad
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(i, row)| row_pass(i, row))
        .collect()
    } else {
      grad
        .axis_iter_mut(Axis(0))
        .enumerate()
        .map(|(i, row)| row_pass(i, row))
        .collect()
    };

    (row_costs.iter().sum(), grad)
  }
}
