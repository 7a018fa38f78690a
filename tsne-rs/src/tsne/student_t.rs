use super::constants::PROBABILITY_FLOOR;
use crate::distances::rdist;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut1;
use ndarray::Axis;
use rayon::prelude::*;

/// Unnormalized Student-t similarities of an embedding, with their total.
///
/// `unnormalized[i, j] = 1 / (1 + ||y_i - y_j||^2)` for i != j and zero on the
/// diagonal. `sum` runs over all ordered pairs.
#[derive(Debug, Clone)]
pub struct StudentTKernel {
  pub unnormalized: Array2<f64>,
  pub sum: f64,
}

impl StudentTKernel {
  /// Evaluate the kernel (one degree of freedom) for every pair of rows.
  pub fn compute(embedding: ArrayView2<f64>, parallel: bool) -> Self {
    let n = embedding.nrows();
    let mut unnormalized = Array2::<f64>::zeros((n, n));

    let fill_row = |i: usize, mut row: ArrayViewMut1<f64>| {
      let yi = embedding.row(i);
      for j in (i + 1)..n {
        row[j] = 1.0 / (1.0 + rdist(&yi, &embedding.row(j)));
      }
    };

    if parallel {
      unnormalized
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, row)| fill_row(i, row));
    } else {
      for (i, row) in unnormalized.axis_iter_mut(Axis(0)).enumerate() {
        fill_row(i, row);
      }
    }

    // Mirror and total in a fixed order so both paths agree bitwise
    let mut sum = 0.0;
    for i in 0..n {
      for j in (i + 1)..n {
        let q = unnormalized[(i, j)];
        unnormalized[(j, i)] = q;
        sum += 2.0 * q;
      }
    }

    Self { unnormalized, sum }
  }

  /// Normalized, floored probability for one pair.
  #[inline(always)]
  pub fn q(&self, i: usize, j: usize) -> f64 {
    f64::max(self.unnormalized[(i, j)] / self.sum, PROBABILITY_FLOOR)
  }

  /// The full normalized distribution Q.
  ///
  /// Diagonal entries carry the floor value only.
  pub fn normalized(&self) -> Array2<f64> {
    let sum = self.sum;
    self
      .unnormalized
      .mapv(|q| f64::max(q / sum, PROBABILITY_FLOOR))
  }
}
