//! Error types for affinity construction and embedding sessions.

use thiserror::Error;

/// Result type for t-SNE operations.
pub type Result<T> = std::result::Result<T, TsneError>;

/// Errors that can occur while building affinities or driving a session.
///
/// Numeric degeneracies (all-zero affinity rows, coincident points) are not
/// errors: they are absorbed by the probability floor and reported through
/// `tracing` instead.
#[derive(Debug, Error)]
pub enum TsneError {
  /// Input data is empty, ragged, wrongly shaped or contains invalid values.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// A configuration parameter is out of range.
  #[error("invalid config: {0}")]
  InvalidConfig(String),

  /// A session operation was called before `init_from_points` or
  /// `init_from_distances`.
  #[error("session not initialized: call init_from_points or init_from_distances first")]
  NotInitialized,

  /// Building an array from row data failed.
  #[error("shape error: {0}")]
  Shape(#[from] ndarray::ShapeError),
}
