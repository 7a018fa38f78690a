//! Exact t-SNE (t-distributed Stochastic Neighbor Embedding) for Rust.
//!
//! This library embeds N points from a high-dimensional space (or a
//! precomputed distance matrix) into a low-dimensional space, typically 2 or 3
//! dimensions, keeping nearby points together and pushing distant points
//! apart. It implements the exact O(N²) algorithm: per-point Gaussian
//! affinities calibrated to a target perplexity, and gradient descent on the
//! KL divergence to a Student-t similarity distribution with adaptive gains,
//! momentum and early exaggeration.
//!
//! # Example
//!
//! ```ignore
//! use tsne_rs::{Tsne, TsneConfig};
//!
//! let mut tsne = Tsne::new(TsneConfig::default());
//! tsne.init_from_points(data.view())?;
//!
//! // Step in batches, e.g. once per rendered frame
//! for _ in 0..100 {
//!     let cost = tsne.step(10)?;
//!     render(tsne.solution_view()?);
//! }
//! ```
//!
//! # Features
//!
//! - **Stepwise sessions**: initialize once, step any number of times, reset
//!   cheaply without recomputing affinities
//! - **Checkpointing**: [`Optimizer`] and [`Affinities`] are serde-serializable
//! - **Deterministic**: a fixed seed gives bit-identical embeddings, with or
//!   without the rayon-parallel kernels
//! - **Extensible metrics**: custom input-space distances via the [`Metric`] trait
//!
//! # Public API
//!
//! * [`Tsne`] - Embedding session
//! * [`FittedTsne`] - Final embedding with its affinities
//! * [`TsneConfig`] - Configuration parameters
//! * [`Affinities`] - Joint probabilities of the input space
//! * [`Optimizer`] - Resumable gradient descent state
//! * [`Metric`] - Input-space distance trait
//! * [`TsneError`] - Error type

// Public modules
pub mod config;
pub mod error;
pub mod metric;

// Public re-exports (primary API)
pub use affinities::Affinities;
pub use config::AffinityParams;
pub use config::OptimizationParams;
pub use config::TsneConfig;
pub use engine::FittedTsne;
pub use engine::Tsne;
pub use error::Result;
pub use error::TsneError;
pub use metric::Metric;
pub use optimizer::Optimizer;
pub use tsne::perplexity_search::RowCalibration;
pub use utils::rows::points_from_rows;

// Internal modules (not exposed)
mod distances;
mod engine;
mod tsne;
mod utils;

// Public modules (for advanced users)
pub mod affinities;
pub mod optimizer;

// Re-export distances for convenience
pub use distances::pairwise_distances;
pub use distances::SqEuclideanMetric;

// Tests
#[cfg(test)]
mod tests;
