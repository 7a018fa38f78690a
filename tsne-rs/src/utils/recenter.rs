use ndarray::ArrayViewMut2;
use ndarray::Axis;

/// Subtract the column-wise mean from every row so the embedding stays zero-mean.
pub fn recenter(mut embedding: ArrayViewMut2<f64>) {
  if let Some(mean) = embedding.mean_axis(Axis(0)) {
    embedding -= &mean;
  }
}
