use crate::error::Result;
use crate::error::TsneError;
use ndarray::Array2;

/// Pack row vectors into a points matrix (n_points × n_features).
///
/// # Errors
///
/// [`TsneError::InvalidInput`] if there are no rows, the first row is empty,
/// or the rows do not all have the same length.
pub fn points_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
  let Some(first) = rows.first() else {
    return Err(TsneError::InvalidInput("point set is empty".to_string()));
  };
  let width = first.len();
  if width == 0 {
    return Err(TsneError::InvalidInput(
      "points have zero dimensions".to_string(),
    ));
  }
  if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
    return Err(TsneError::InvalidInput(format!(
      "point {i} has {} dimensions, expected {width}",
      row.len()
    )));
  }

  let flat: Vec<f64> = rows.iter().flatten().copied().collect();
  Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
}
